//! Graph evaluation engine.
//!
//! The [`Evaluator`] walks a [`BuiltGraph`] in topological order. For each
//! resource it checks for cancellation, resolves the attributes against the
//! resources materialized so far, and hands them to a [`Provisioner`].
//! Transient failures are retried with exponential backoff; any other failure
//! stops the walk and returns what was applied so far.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use strata_apply::dev::RecordingProvisioner;
//! use strata_apply::Evaluator;
//! use strata_core::StackConfig;
//! use strata_graph::{AttributeValue, ResourceGraph, ResourceNode};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let bucket = ResourceNode::new("storage", "bucket");
//! let policy = ResourceNode::new("permission", "policy")
//!     .with_attribute("resource", AttributeValue::reference(bucket.id(), "arn"));
//!
//! let mut graph = ResourceGraph::new();
//! graph.add_node(bucket)?.add_node(policy)?;
//! let graph = graph.build()?;
//!
//! let provisioner = RecordingProvisioner::new();
//! let evaluator = Evaluator::new(Arc::new(StackConfig::new()));
//! let results = evaluator.evaluate(&graph, &provisioner).await?;
//! assert_eq!(results.len(), 2);
//! # Ok(())
//! # }
//! ```

use core::time::Duration;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use backon::Retryable;
use strata_core::StackConfig;
use strata_graph::{BuiltGraph, ResourceNode};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::error::{EvaluationError, EvaluationFailure};
use crate::hooks::{EvaluationEvent, EvaluationHooks};
use crate::plan::Plan;
use crate::provisioner::{Provisioner, ProvisioningError};
use crate::resolve;
use crate::result::{ResolvedResource, ResultSet};
use crate::retry;

/// Sequential, cancellable graph evaluator.
///
/// Holds only immutable configuration, so one evaluator can run many
/// evaluations. Each evaluation is strictly sequential: a resource is
/// materialized, retries included, before the next one starts.
#[derive(Debug, Clone)]
pub struct Evaluator {
    config: Arc<StackConfig>,
    hooks: Arc<EvaluationHooks>,
    cancellation: CancellationToken,
}

impl Evaluator {
    /// Creates an evaluator with no hooks and a token that is never cancelled.
    #[must_use]
    pub fn new(config: Arc<StackConfig>) -> Self {
        Self {
            config,
            hooks: Arc::new(EvaluationHooks::new()),
            cancellation: CancellationToken::new(),
        }
    }

    /// Sets the hook registry notified during evaluation.
    #[must_use]
    pub fn with_hooks(mut self, hooks: Arc<EvaluationHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    /// Sets the token checked between resources.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &StackConfig {
        &self.config
    }

    /// Returns the hook registry.
    #[must_use]
    pub fn hooks(&self) -> &EvaluationHooks {
        &self.hooks
    }

    /// Returns the cancellation token.
    #[must_use]
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Returns what [`evaluate`](Self::evaluate) would do, without calling
    /// any provisioner.
    #[must_use]
    pub fn plan(&self, graph: &BuiltGraph) -> Plan {
        Plan::for_graph(graph)
    }

    /// Materializes every resource of the graph, in topological order.
    ///
    /// # Errors
    ///
    /// Returns an [`EvaluationFailure`] holding the error and every resource
    /// materialized before it:
    /// - [`EvaluationError::Provisioning`] when the provisioner fails with a
    ///   non-retryable error, or keeps failing after the last retry
    /// - [`EvaluationError::UnresolvedReference`],
    ///   [`EvaluationError::MissingAttribute`] or
    ///   [`EvaluationError::InvalidNumber`] when an attribute cannot be resolved
    /// - [`EvaluationError::Cancelled`] when the token fires; the resource in
    ///   flight at that moment still completes
    pub async fn evaluate<P>(
        &self,
        graph: &BuiltGraph,
        provisioner: &P,
    ) -> Result<ResultSet, EvaluationFailure>
    where
        P: Provisioner + ?Sized,
    {
        let span = tracing::info_span!(
            "evaluate",
            stack = self.config.shared_resource_identifier(),
            region = self.config.region(),
            resources = graph.node_count(),
        );
        self.run(graph, provisioner).instrument(span).await
    }

    async fn run<P>(&self, graph: &BuiltGraph, provisioner: &P) -> Result<ResultSet, EvaluationFailure>
    where
        P: Provisioner + ?Sized,
    {
        let start = Instant::now();
        let mut results = ResultSet::new();

        self.hooks.invoke(&EvaluationEvent::EvaluationStart {
            resource_count: graph.node_count(),
        });

        for (position, node) in graph.ordered_nodes().enumerate() {
            if self.cancellation.is_cancelled() {
                let pending = graph.topological_order()[position..].to_vec();
                tracing::warn!(
                    materialized = results.len(),
                    pending = pending.len(),
                    "cancellation requested, stopping before {}",
                    node.id()
                );
                self.hooks.invoke(&EvaluationEvent::EvaluationCancelled {
                    materialized: results.len(),
                    pending: pending.len(),
                });
                return Err(EvaluationFailure::new(
                    EvaluationError::Cancelled { pending },
                    results,
                ));
            }

            self.hooks.invoke(&EvaluationEvent::ResourceStart {
                resource: node.id().clone(),
                position,
            });

            match self.apply(node, &results, provisioner).await {
                Ok(resolved) => results.insert(resolved),
                Err(error) => {
                    tracing::error!(resource = %node.id(), %error, "evaluation halted");
                    self.hooks.invoke(&EvaluationEvent::ResourceFailed {
                        resource: node.id().clone(),
                        error: error.to_string(),
                    });
                    self.hooks.invoke(&EvaluationEvent::EvaluationFailed {
                        materialized: results.len(),
                        error: error.to_string(),
                    });
                    return Err(EvaluationFailure::new(error, results));
                }
            }
        }

        let duration = start.elapsed();
        tracing::info!(
            materialized = results.len(),
            duration_ms = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
            "evaluation complete"
        );
        self.hooks.invoke(&EvaluationEvent::EvaluationComplete {
            materialized: results.len(),
            duration,
        });
        Ok(results)
    }

    /// Resolves and materializes one resource.
    async fn apply<P>(
        &self,
        node: &ResourceNode,
        results: &ResultSet,
        provisioner: &P,
    ) -> Result<ResolvedResource, EvaluationError>
    where
        P: Provisioner + ?Sized,
    {
        let id = node.id();
        let inputs = resolve::resolve_attributes(node, results)
            .map_err(|error| error.for_resource(id))?;
        tracing::debug!(resource = %id, attributes = inputs.len(), "attributes resolved");

        let start = Instant::now();
        let counter = AtomicUsize::new(0);
        let (calls, attributes) = (&counter, &inputs);
        let outcome = (|| async move {
            calls.fetch_add(1, Ordering::Relaxed);
            provisioner
                .materialize(node.resource_type(), node.name(), attributes)
                .await
        })
        .retry(retry::backoff(&self.config.retry()))
        .sleep(tokio::time::sleep)
        .when(|error: &ProvisioningError| error.is_retryable())
        .notify(|error: &ProvisioningError, delay: Duration| {
            let attempt = calls.load(Ordering::Relaxed);
            tracing::warn!(
                resource = %id,
                attempt,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                %error,
                "transient provisioning failure, retrying"
            );
            self.hooks.invoke(&EvaluationEvent::ResourceRetry {
                resource: id.clone(),
                attempt,
                delay,
                error: error.to_string(),
            });
        })
        .await;
        let attempts = counter.load(Ordering::Relaxed);

        match outcome {
            Ok(outputs) => {
                let duration = start.elapsed();
                tracing::info!(resource = %id, attempts, outputs = outputs.len(), "materialized");
                self.hooks.invoke(&EvaluationEvent::ResourceMaterialized {
                    resource: id.clone(),
                    attempts,
                    duration,
                });
                Ok(ResolvedResource::new(id.clone(), inputs, outputs, attempts))
            }
            Err(source) => Err(EvaluationError::Provisioning {
                resource: id.clone(),
                attempts,
                source,
            }),
        }
    }
}
