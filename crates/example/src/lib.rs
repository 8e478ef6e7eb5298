//! Face-recognition API stack provisioned with Strata.
//!
//! This example declares a serverless face search service as a resource
//! graph and applies it against a simulated cloud account.
//!
//! # Architecture
//!
//! Arrows point from a resource to what it depends on.
//!
//! ```text
//! ┌────────────────┐   ┌──────────────────────┐   ┌──────────────────┐
//! │ function.index │──▶│ table / collection   │◀──│ function.search  │
//! └───────┬────────┘   └──────────────────────┘   └────────▲─────────┘
//!         ▼                                                │
//! ┌────────────────┐                             ┌─────────┴────────┐
//! │ storage.images │                             │ api_route.search │
//! └────────────────┘                             └─────────┬────────┘
//!                                                          ▼
//!                                                   ┌────────────┐
//!                                                   │  api.rest  │
//!                                                   └────────────┘
//! ```

/// Simulated provider for applying the stack locally.
pub mod cloud;

/// Terminal rendering of outputs.
pub mod report;

/// Declarations of the face search stack.
pub mod stack;

pub use cloud::SimulatedCloud;
pub use stack::{FaceStack, face_stack};
