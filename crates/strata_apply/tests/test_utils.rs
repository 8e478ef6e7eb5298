//! Shared test utilities for `strata_apply` integration tests.
//!
//! Import via `mod test_utils;` in test files.

#![allow(
    dead_code,
    missing_docs,
    reason = "shared test utilities, not all items used in every test binary"
)]

use core::time::Duration;
use std::sync::{Arc, Mutex};

use strata_apply::Evaluator;
use strata_apply::hooks::{EvaluationEvent, EvaluationHooks, Schedule};
use strata_core::{RetryPolicy, StackConfig};
use strata_graph::{AttributeValue, BuiltGraph, ResourceGraph, ResourceId, ResourceNode};

// ═══════════════════════════════════════════════════════════════════════════════
// IDENTITIES
// ═══════════════════════════════════════════════════════════════════════════════

pub fn bucket_id() -> ResourceId {
    ResourceId::new("storage", "bucket")
}

pub fn policy_id() -> ResourceId {
    ResourceId::new("permission", "policy")
}

pub fn role_id() -> ResourceId {
    ResourceId::new("identity", "role")
}

// ═══════════════════════════════════════════════════════════════════════════════
// GRAPHS
// ═══════════════════════════════════════════════════════════════════════════════

/// bucket → policy(bucket.arn) → role(policy.id), declared in reverse.
pub fn chain_graph() -> BuiltGraph {
    let role = ResourceNode::with_id(role_id())
        .with_attribute("assumed_by", "lambda.amazonaws.com")
        .with_attribute("policy_id", AttributeValue::reference(&policy_id(), "id"));
    let policy = ResourceNode::with_id(policy_id()).with_attribute(
        "document",
        AttributeValue::map([
            ("Version", AttributeValue::from("2012-10-17")),
            (
                "Statement",
                AttributeValue::list([AttributeValue::map([
                    ("Effect", AttributeValue::from("Allow")),
                    ("Action", AttributeValue::list(["s3:GetObject", "s3:PutObject"])),
                    ("Resource", AttributeValue::reference(&bucket_id(), "arn")),
                ])]),
            ),
        ]),
    );
    let bucket = ResourceNode::with_id(bucket_id())
        .with_attribute("bucket_name", "123456789012-rekognition_api")
        .with_attribute("force_destroy", true);

    let mut graph = ResourceGraph::new();
    graph
        .add_node(role)
        .and_then(|g| g.add_node(policy))
        .and_then(|g| g.add_node(bucket))
        .expect("chain identities are unique");
    graph.build().expect("chain graph is valid")
}

// ═══════════════════════════════════════════════════════════════════════════════
// EVALUATORS
// ═══════════════════════════════════════════════════════════════════════════════

/// A config with millisecond retries so tests stay fast.
pub fn fast_config(max_retries: usize) -> Arc<StackConfig> {
    Arc::new(
        StackConfig::new().with_retry(
            RetryPolicy::default()
                .with_max_retries(max_retries)
                .with_delays(Duration::from_millis(1), Duration::from_millis(4))
                .with_jitter(false),
        ),
    )
}

pub fn evaluator(max_retries: usize) -> Evaluator {
    Evaluator::new(fast_config(max_retries))
}

// ═══════════════════════════════════════════════════════════════════════════════
// EVENT LOG
// ═══════════════════════════════════════════════════════════════════════════════

/// Collects every lifecycle event delivered to it.
#[derive(Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<EvaluationEvent>>>);

impl EventLog {
    /// Registers the log on every schedule of a fresh registry.
    pub fn install() -> (Self, Arc<EvaluationHooks>) {
        let log = Self::default();
        let hooks = Arc::new(EvaluationHooks::new());
        let sink = log.clone();
        hooks
            .register_observer(Schedule::ALL, "event_log", move |event: &EvaluationEvent| {
                sink.0.lock().unwrap().push(event.clone());
            })
            .expect("fresh registry");
        (log, hooks)
    }

    pub fn events(&self) -> Vec<EvaluationEvent> {
        self.0.lock().unwrap().clone()
    }

    pub fn schedules(&self) -> Vec<Schedule> {
        self.events().iter().map(EvaluationEvent::schedule).collect()
    }
}
