//! Evaluation errors.

use strata_graph::{AttributePath, AttributeReference, ResourceId};

use crate::provisioner::ProvisioningError;
use crate::result::ResultSet;

/// Why an evaluation stopped.
#[derive(Debug, thiserror::Error)]
pub enum EvaluationError {
    /// The provisioner failed, after any retries the policy allowed.
    #[error("failed to materialize {resource} after {attempts} attempt(s)")]
    Provisioning {
        /// The resource being materialized.
        resource: ResourceId,
        /// Calls made, the first attempt included.
        attempts: usize,
        /// The last failure reported.
        #[source]
        source: ProvisioningError,
    },
    /// A reference points at a resource that has not been materialized.
    #[error("{resource} references {target} at {path}, which has not been materialized")]
    UnresolvedReference {
        /// The resource being resolved.
        resource: ResourceId,
        /// Location of the reference.
        path: AttributePath,
        /// The missing target.
        target: ResourceId,
    },
    /// The target was materialized but has no such attribute.
    #[error("{resource} references {reference} at {path}, which does not exist")]
    MissingAttribute {
        /// The resource being resolved.
        resource: ResourceId,
        /// Location of the reference.
        path: AttributePath,
        /// The unresolvable reference.
        reference: AttributeReference,
    },
    /// A float attribute is NaN or infinite.
    #[error("{resource} has a non-finite number at {path}")]
    InvalidNumber {
        /// The resource being resolved.
        resource: ResourceId,
        /// Location of the number.
        path: AttributePath,
    },
    /// The cancellation token fired between two resources.
    #[error("evaluation cancelled with {} resource(s) pending", .pending.len())]
    Cancelled {
        /// Resources not yet materialized, in evaluation order.
        pending: Vec<ResourceId>,
    },
}

impl EvaluationError {
    /// Returns the resource the error is about, if any.
    #[must_use]
    pub fn resource(&self) -> Option<&ResourceId> {
        match self {
            Self::Provisioning { resource, .. }
            | Self::UnresolvedReference { resource, .. }
            | Self::MissingAttribute { resource, .. }
            | Self::InvalidNumber { resource, .. } => Some(resource),
            Self::Cancelled { .. } => None,
        }
    }

    /// Returns true if the evaluation was cancelled rather than failed.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}

/// An evaluation error together with the last known good state.
///
/// Resources materialized before the failure are left in place and
/// returned in `applied`.
#[derive(Debug, thiserror::Error)]
#[error("evaluation stopped after {} materialized resource(s): {error}", .applied.len())]
pub struct EvaluationFailure {
    /// What went wrong.
    #[source]
    pub error: EvaluationError,
    /// Resources materialized before the failure.
    pub applied: ResultSet,
}

impl EvaluationFailure {
    /// Pairs an error with the results gathered so far.
    #[must_use]
    pub fn new(error: EvaluationError, applied: ResultSet) -> Self {
        Self { error, applied }
    }
}
