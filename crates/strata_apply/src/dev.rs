//! Development tools for evaluation.
//!
//! [`RecordingProvisioner`] is an in-memory [`Provisioner`] that records every
//! call and can be scripted to fail, which makes evaluation behavior easy to
//! assert on without a cloud account.
//!
//! # Example
//!
//! ```
//! use strata_apply::dev::RecordingProvisioner;
//! use strata_apply::ProvisioningErrorKind;
//! use strata_graph::ResourceId;
//!
//! let policy = ResourceId::new("permission", "policy");
//! let provisioner = RecordingProvisioner::new()
//!     .fail_times(policy.clone(), ProvisioningErrorKind::Throttled, 2);
//! assert_eq!(provisioner.call_count(&policy), 0);
//! ```
//!
//! # Default Outputs
//!
//! Every successful call echoes the input attributes and adds `id`, `arn` and
//! `name`, derived from the resource identity. Outputs configured with
//! [`with_outputs`](RecordingProvisioner::with_outputs) override them.

use async_trait::async_trait;
use hashbrown::HashMap;
use parking_lot::Mutex;
use serde_json::Value;
use strata_graph::ResourceId;
use tokio_util::sync::CancellationToken;

use crate::provisioner::{
    Attributes, Outputs, Provisioner, ProvisioningError, ProvisioningErrorKind,
};

/// One recorded `materialize` call.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterializeCall {
    /// The resource.
    pub resource: ResourceId,
    /// The resolved attributes it received.
    pub attributes: Attributes,
    /// Whether the call succeeded.
    pub succeeded: bool,
}

#[derive(Debug, Clone, Copy)]
struct FailureScript {
    kind: ProvisioningErrorKind,
    /// `None` fails forever.
    remaining: Option<usize>,
}

#[derive(Debug, Default)]
struct RecorderState {
    calls: Vec<MaterializeCall>,
    failures: HashMap<ResourceId, FailureScript>,
    outputs: HashMap<ResourceId, Outputs>,
    cancel_after: HashMap<ResourceId, CancellationToken>,
}

/// A scriptable in-memory provisioner.
#[derive(Debug, Default)]
pub struct RecordingProvisioner {
    state: Mutex<RecorderState>,
}

impl RecordingProvisioner {
    /// Creates a provisioner where every call succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails the first `times` calls for `resource` with `kind`, then succeeds.
    #[must_use]
    pub fn fail_times(self, resource: ResourceId, kind: ProvisioningErrorKind, times: usize) -> Self {
        self.state.lock().failures.insert(
            resource,
            FailureScript {
                kind,
                remaining: Some(times),
            },
        );
        self
    }

    /// Fails every call for `resource` with `kind`.
    #[must_use]
    pub fn fail_always(self, resource: ResourceId, kind: ProvisioningErrorKind) -> Self {
        self.state.lock().failures.insert(
            resource,
            FailureScript {
                kind,
                remaining: None,
            },
        );
        self
    }

    /// Adds fixed outputs for `resource`.
    #[must_use]
    pub fn with_outputs(self, resource: ResourceId, outputs: Outputs) -> Self {
        self.state.lock().outputs.insert(resource, outputs);
        self
    }

    /// Cancels `token` right after `resource` is materialized.
    #[must_use]
    pub fn cancel_after(self, resource: ResourceId, token: CancellationToken) -> Self {
        self.state.lock().cancel_after.insert(resource, token);
        self
    }

    /// Returns every call, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<MaterializeCall> {
        self.state.lock().calls.clone()
    }

    /// Returns the number of calls made for `resource`.
    #[must_use]
    pub fn call_count(&self, resource: &ResourceId) -> usize {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|call| &call.resource == resource)
            .count()
    }

    /// Returns the resources that were materialized successfully, in order.
    #[must_use]
    pub fn materialized(&self) -> Vec<ResourceId> {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|call| call.succeeded)
            .map(|call| call.resource.clone())
            .collect()
    }
}

#[async_trait]
impl Provisioner for RecordingProvisioner {
    async fn materialize(
        &self,
        resource_type: &str,
        name: &str,
        attributes: &Attributes,
    ) -> Result<Outputs, ProvisioningError> {
        let resource = ResourceId::new(resource_type, name);
        let mut state = self.state.lock();

        let failure = match state.failures.get_mut(&resource) {
            Some(script) => match &mut script.remaining {
                None => Some(script.kind),
                Some(0) => None,
                Some(remaining) => {
                    *remaining -= 1;
                    Some(script.kind)
                }
            },
            None => None,
        };

        state.calls.push(MaterializeCall {
            resource: resource.clone(),
            attributes: attributes.clone(),
            succeeded: failure.is_none(),
        });

        if let Some(kind) = failure {
            return Err(ProvisioningError::new(
                kind,
                format!("scripted {kind} failure for {resource}"),
            ));
        }

        let mut outputs = attributes.clone();
        outputs.insert("id".into(), Value::from(format!("{resource_type}-{name}")));
        outputs.insert(
            "arn".into(),
            Value::from(format!("arn:strata:{resource_type}:::{name}")),
        );
        outputs.insert("name".into(), Value::from(name));
        if let Some(fixed) = state.outputs.get(&resource) {
            outputs.extend(fixed.iter().map(|(k, v)| (k.clone(), v.clone())));
        }

        if let Some(token) = state.cancel_after.get(&resource) {
            token.cancel();
        }

        Ok(outputs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn scripted_failures_then_success() {
        let bucket = ResourceId::new("storage", "bucket");
        let provisioner =
            RecordingProvisioner::new().fail_times(bucket.clone(), ProvisioningErrorKind::Transient, 1);

        let first = provisioner
            .materialize("storage", "bucket", &Attributes::new())
            .await;
        assert!(first.is_err_and(|err| err.kind() == ProvisioningErrorKind::Transient));

        let second = provisioner
            .materialize("storage", "bucket", &Attributes::new())
            .await
            .unwrap();
        assert_eq!(second["arn"], json!("arn:strata:storage:::bucket"));
        assert_eq!(provisioner.call_count(&bucket), 2);
        assert_eq!(provisioner.materialized(), vec![bucket]);
    }

    #[tokio::test]
    async fn fixed_outputs_override_defaults() {
        let key = ResourceId::new("api", "key");
        let provisioner = RecordingProvisioner::new().with_outputs(
            key,
            Outputs::from([("id".to_string(), json!("k-1"))]),
        );
        let outputs = provisioner
            .materialize("api", "key", &Attributes::new())
            .await
            .unwrap();
        assert_eq!(outputs["id"], json!("k-1"));
        assert_eq!(outputs["name"], json!("key"));
    }
}
