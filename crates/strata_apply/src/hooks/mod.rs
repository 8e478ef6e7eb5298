//! Lifecycle hooks for evaluations.
//!
//! Hooks let callers observe an evaluation without changing it: progress
//! reporting, audit trails, metrics. Every hook receives an
//! [`EvaluationEvent`] and runs synchronously on the evaluating task, in
//! registration order.
//!
//! # Architecture
//!
//! - **Schedules** ([`Schedule`]): lifecycle points a hook can attach to
//! - **Events** ([`events`]): `EvaluationEvent` enum carrying context to hooks
//! - **API** ([`api`]): registration and invocation
//! - **Observers** ([`observer`]): ready-made hooks, such as structured logging

pub mod api;
pub mod events;
pub mod observer;

pub use api::{EvaluationHooks, HookRegistrationError};
pub use events::{EvaluationEvent, Schedule};
pub use observer::{TRACING_OBSERVER, install_tracing_observer};
