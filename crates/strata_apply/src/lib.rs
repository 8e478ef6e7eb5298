//! Evaluation, provisioning and output export for Strata (Layer 2).
//!
//! `strata_apply` takes a [`BuiltGraph`](strata_graph::BuiltGraph) and makes it
//! real: the [`Evaluator`] walks the topological order, resolves references
//! against what has already been materialized, and calls a [`Provisioner`]
//! for each resource. The [`OutputExporter`] then picks named values out of
//! the resulting [`ResultSet`].
//!
//! # Core Concepts
//!
//! - [`Provisioner`] - The external collaborator that materializes resources
//! - [`Evaluator`] - Sequential, retrying, cancellable graph walker
//! - [`ResultSet`] - Materialized resources in materialization order
//! - [`OutputExporter`] - Named, optionally sensitive, stack outputs
//! - [`hooks`] - Lifecycle observers
//! - [`dev`] - In-memory provisioner for tests and demos

/// In-memory provisioner for tests and demos.
pub mod dev;

/// Evaluation errors.
pub mod error;

/// Graph evaluation engine.
pub mod evaluator;

/// Lifecycle hooks for evaluations.
pub mod hooks;

/// Named stack outputs.
pub mod output;

/// Dry-run plans.
pub mod plan;

/// The provisioner boundary.
pub mod provisioner;

/// Materialized resources.
pub mod result;

/// Backoff schedule for transient provisioning failures.
pub mod retry;

mod resolve;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use crate::error::{EvaluationError, EvaluationFailure};
    pub use crate::evaluator::Evaluator;
    pub use crate::hooks::{EvaluationEvent, EvaluationHooks, Schedule};
    pub use crate::output::{OutputDeclaration, OutputExporter, OutputMap, OutputValue};
    pub use crate::plan::Plan;
    pub use crate::provisioner::{
        Attributes, Outputs, Provisioner, ProvisioningError, ProvisioningErrorKind,
    };
    pub use crate::result::{ResolvedResource, ResultSet};
}

pub use error::{EvaluationError, EvaluationFailure};
pub use evaluator::Evaluator;
pub use output::{OutputDeclaration, OutputError, OutputExporter, OutputMap, OutputValue};
pub use plan::{Plan, PlannedAction};
pub use provisioner::{Attributes, Outputs, Provisioner, ProvisioningError, ProvisioningErrorKind};
pub use result::{ResolvedResource, ResultSet};
pub use tokio_util::sync::CancellationToken;
