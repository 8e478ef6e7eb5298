//! A simulated cloud account.
//!
//! [`SimulatedCloud`] answers `materialize` calls with the outputs a real
//! provider would return for each resource type, so the stack can be applied
//! end to end without credentials.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use serde_json::{Value, json};
use strata_apply::{Attributes, Outputs, Provisioner, ProvisioningError};
use strata_graph::ResourceId;

use crate::stack::API_STAGE;

/// An in-process stand-in for a cloud provider.
#[derive(Debug)]
pub struct SimulatedCloud {
    region: String,
    account_id: String,
    fail_at: Option<ResourceId>,
    flaky: AtomicBool,
    sequence: AtomicU64,
}

impl SimulatedCloud {
    /// Creates a cloud for `account_id` in `region`.
    #[must_use]
    pub fn new(region: impl Into<String>, account_id: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            account_id: account_id.into(),
            fail_at: None,
            flaky: AtomicBool::new(false),
            sequence: AtomicU64::new(0),
        }
    }

    /// Rejects `resource` with a permanent error.
    #[must_use]
    pub fn with_failure_at(mut self, resource: ResourceId) -> Self {
        self.fail_at = Some(resource);
        self
    }

    /// Throttles the first call made to the account.
    #[must_use]
    pub fn with_flaky_start(self) -> Self {
        self.flaky.store(true, Ordering::Relaxed);
        self
    }

    fn arn(&self, service: &str, resource: &str) -> String {
        format!(
            "arn:aws:{service}:{}:{}:{resource}",
            self.region, self.account_id
        )
    }

    fn next_id(&self, prefix: &str) -> String {
        let n = self.sequence.fetch_add(1, Ordering::Relaxed);
        format!("{prefix}{:08x}", 0x5eed_0000_u64 + n)
    }

    fn text<'a>(attributes: &'a Attributes, key: &str, fallback: &'a str) -> &'a str {
        attributes.get(key).and_then(Value::as_str).unwrap_or(fallback)
    }

    fn outputs_for(&self, resource_type: &str, name: &str, attributes: &Attributes) -> Outputs {
        let mut outputs = Outputs::new();
        match resource_type {
            "storage" => {
                let bucket = Self::text(attributes, "bucket_name", name);
                outputs.insert("arn".into(), json!(format!("arn:aws:s3:::{bucket}")));
                outputs.insert("id".into(), json!(bucket));
            }
            "table" => {
                let table = Self::text(attributes, "name", name);
                let arn = self.arn("dynamodb", &format!("table/{table}"));
                outputs.insert("stream_arn".into(), json!(format!("{arn}/stream/latest")));
                outputs.insert("arn".into(), json!(arn));
            }
            "collection" => {
                let collection = Self::text(attributes, "collection_id", name);
                outputs.insert(
                    "arn".into(),
                    json!(self.arn("rekognition", &format!("collection/{collection}"))),
                );
            }
            "permission" => {
                outputs.insert("id".into(), json!(self.next_id("ANPA")));
                outputs.insert(
                    "arn".into(),
                    json!(format!("arn:aws:iam::{}:policy/{name}", self.account_id)),
                );
            }
            "identity" => {
                let role = Self::text(attributes, "name", name);
                outputs.insert(
                    "arn".into(),
                    json!(format!("arn:aws:iam::{}:role/{role}", self.account_id)),
                );
            }
            "function" => {
                let function = Self::text(attributes, "function_name", name);
                let arn = self.arn("lambda", &format!("function:{function}"));
                outputs.insert(
                    "invoke_arn".into(),
                    json!(format!(
                        "arn:aws:apigateway:{}:lambda:path/2015-03-31/functions/{arn}/invocations",
                        self.region
                    )),
                );
                outputs.insert("arn".into(), json!(arn));
            }
            "api" => {
                outputs.insert("id".into(), json!(self.next_id("api")));
            }
            "api_deployment" => {
                let api = Self::text(attributes, "rest_api_id", name);
                let stage = Self::text(attributes, "stage_name", API_STAGE);
                outputs.insert(
                    "invoke_url".into(),
                    json!(format!(
                        "https://{api}.execute-api.{}.amazonaws.com/{stage}",
                        self.region
                    )),
                );
            }
            "api_key" => {
                outputs.insert("id".into(), json!(self.next_id("key")));
                outputs.insert("value".into(), json!(self.next_id("sk-")));
            }
            _ => {
                outputs.insert("id".into(), json!(self.next_id(&format!("{resource_type}-"))));
            }
        }
        outputs
    }
}

#[async_trait]
impl Provisioner for SimulatedCloud {
    async fn materialize(
        &self,
        resource_type: &str,
        name: &str,
        attributes: &Attributes,
    ) -> Result<Outputs, ProvisioningError> {
        if self.flaky.swap(false, Ordering::Relaxed) {
            return Err(ProvisioningError::throttled("rate exceeded"));
        }
        if self
            .fail_at
            .as_ref()
            .is_some_and(|id| id.resource_type() == resource_type && id.name() == name)
        {
            return Err(ProvisioningError::permanent(format!(
                "{resource_type}.{name} was rejected by the provider"
            )));
        }

        let mut outputs = attributes.clone();
        outputs.extend(self.outputs_for(resource_type, name, attributes));
        Ok(outputs)
    }
}
