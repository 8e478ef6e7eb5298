//! Unified event enum for evaluation hooks.
//!
//! All hooks receive `&EvaluationEvent` and match on the variants they care
//! about.
//!
//! # Example
//!
//! ```
//! use strata_apply::hooks::EvaluationEvent;
//!
//! fn handle_event(event: &EvaluationEvent) {
//!     match event {
//!         EvaluationEvent::ResourceStart { resource, position } => {
//!             println!("#{position}: {resource}");
//!         }
//!         EvaluationEvent::ResourceMaterialized { duration, .. } => {
//!             println!("done in {duration:?}");
//!         }
//!         _ => {}
//!     }
//! }
//! ```

use core::fmt;
use core::time::Duration;

use strata_graph::ResourceId;

/// Lifecycle point a hook can be registered on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Schedule {
    /// Before the first resource.
    OnEvaluationStart,
    /// Before a resource is resolved and materialized.
    OnResourceStart,
    /// Before a transient failure is retried.
    OnResourceRetry,
    /// After a resource is materialized.
    OnResourceMaterialized,
    /// After a resource fails for good.
    OnResourceFailed,
    /// When cancellation is observed between resources.
    OnEvaluationCancelled,
    /// After the last resource is materialized.
    OnEvaluationComplete,
    /// After a resource failure ends the evaluation.
    OnEvaluationFailed,
}

impl Schedule {
    /// Every schedule, in lifecycle order.
    pub const ALL: [Schedule; 8] = [
        Schedule::OnEvaluationStart,
        Schedule::OnResourceStart,
        Schedule::OnResourceRetry,
        Schedule::OnResourceMaterialized,
        Schedule::OnResourceFailed,
        Schedule::OnEvaluationCancelled,
        Schedule::OnEvaluationComplete,
        Schedule::OnEvaluationFailed,
    ];

    /// Returns the schedule's name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Schedule::OnEvaluationStart => "OnEvaluationStart",
            Schedule::OnResourceStart => "OnResourceStart",
            Schedule::OnResourceRetry => "OnResourceRetry",
            Schedule::OnResourceMaterialized => "OnResourceMaterialized",
            Schedule::OnResourceFailed => "OnResourceFailed",
            Schedule::OnEvaluationCancelled => "OnEvaluationCancelled",
            Schedule::OnEvaluationComplete => "OnEvaluationComplete",
            Schedule::OnEvaluationFailed => "OnEvaluationFailed",
        }
    }
}

impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unified event enum for all evaluation hooks.
#[derive(Debug, Clone, PartialEq)]
pub enum EvaluationEvent {
    // ─────────────────────────────────────────────────────────────────────────
    // Evaluation-Level Events
    // ─────────────────────────────────────────────────────────────────────────
    /// Fired before the first resource.
    EvaluationStart {
        /// Number of resources in the graph.
        resource_count: usize,
    },

    /// Fired when cancellation is observed.
    EvaluationCancelled {
        /// Resources materialized before cancellation.
        materialized: usize,
        /// Resources left untouched.
        pending: usize,
    },

    /// Fired after every resource was materialized.
    EvaluationComplete {
        /// Resources materialized.
        materialized: usize,
        /// Total duration.
        duration: Duration,
    },

    /// Fired when a resource failure ends the evaluation.
    EvaluationFailed {
        /// Resources materialized before the failure.
        materialized: usize,
        /// The error message.
        error: String,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // Resource Events
    // ─────────────────────────────────────────────────────────────────────────
    /// Fired before a resource is resolved.
    ResourceStart {
        /// The resource.
        resource: ResourceId,
        /// Zero-based position in the evaluation order.
        position: usize,
    },

    /// Fired before a retry.
    ResourceRetry {
        /// The resource.
        resource: ResourceId,
        /// The attempt that just failed, starting at 1.
        attempt: usize,
        /// How long the evaluator waits before the next attempt.
        delay: Duration,
        /// The failure being retried.
        error: String,
    },

    /// Fired after the provisioner succeeded.
    ResourceMaterialized {
        /// The resource.
        resource: ResourceId,
        /// Provisioner calls it took.
        attempts: usize,
        /// Time spent, retries included.
        duration: Duration,
    },

    /// Fired when a resource cannot be resolved or materialized.
    ResourceFailed {
        /// The resource.
        resource: ResourceId,
        /// The error message.
        error: String,
    },
}

impl EvaluationEvent {
    /// Returns the schedule this event is delivered on.
    #[must_use]
    pub fn schedule(&self) -> Schedule {
        match self {
            EvaluationEvent::EvaluationStart { .. } => Schedule::OnEvaluationStart,
            EvaluationEvent::EvaluationCancelled { .. } => Schedule::OnEvaluationCancelled,
            EvaluationEvent::EvaluationComplete { .. } => Schedule::OnEvaluationComplete,
            EvaluationEvent::EvaluationFailed { .. } => Schedule::OnEvaluationFailed,
            EvaluationEvent::ResourceStart { .. } => Schedule::OnResourceStart,
            EvaluationEvent::ResourceRetry { .. } => Schedule::OnResourceRetry,
            EvaluationEvent::ResourceMaterialized { .. } => Schedule::OnResourceMaterialized,
            EvaluationEvent::ResourceFailed { .. } => Schedule::OnResourceFailed,
        }
    }

    /// Returns the resource the event is about, if any.
    #[must_use]
    pub fn resource(&self) -> Option<&ResourceId> {
        match self {
            EvaluationEvent::ResourceStart { resource, .. }
            | EvaluationEvent::ResourceRetry { resource, .. }
            | EvaluationEvent::ResourceMaterialized { resource, .. }
            | EvaluationEvent::ResourceFailed { resource, .. } => Some(resource),
            EvaluationEvent::EvaluationStart { .. }
            | EvaluationEvent::EvaluationCancelled { .. }
            | EvaluationEvent::EvaluationComplete { .. }
            | EvaluationEvent::EvaluationFailed { .. } => None,
        }
    }
}
