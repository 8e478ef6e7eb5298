//! Shared test utilities for `strata_graph` integration tests.
//!
//! Import via `mod test_utils;` in test files.

#![allow(
    dead_code,
    missing_docs,
    reason = "shared test utilities, not all items used in every test binary"
)]

use strata_graph::{AttributeValue, BuiltGraph, ResourceGraph, ResourceId, ResourceNode};

// ═══════════════════════════════════════════════════════════════════════════════
// IDENTITIES
// ═══════════════════════════════════════════════════════════════════════════════

/// Identity of a resource of type `test`.
pub fn id(name: &str) -> ResourceId {
    ResourceId::new("test", name)
}

/// Renders an order as `type.name` strings for compact assertions.
pub fn names(order: &[ResourceId]) -> Vec<String> {
    order.iter().map(ToString::to_string).collect()
}

// ═══════════════════════════════════════════════════════════════════════════════
// NODE BUILDERS
// ═══════════════════════════════════════════════════════════════════════════════

/// A `test` node whose attribute `ref_<i>` references `targets[i].out`.
pub fn node_referencing(name: &str, targets: &[&str]) -> ResourceNode {
    let mut node = ResourceNode::new("test", name);
    for (i, target) in targets.iter().enumerate() {
        node.set_attribute(
            format!("ref_{i}"),
            AttributeValue::reference(&id(target), "out"),
        );
    }
    node
}

/// The storage → permission → identity chain used across the suite.
pub fn face_stack() -> ResourceGraph {
    let bucket = ResourceNode::new("storage", "bucket")
        .with_attribute("bucket_name", "123456789012-rekognition_api")
        .with_attribute("versioned", false);
    let bucket_id = bucket.id().clone();

    let policy = ResourceNode::new("permission", "policy").with_attribute(
        "document",
        AttributeValue::map([
            ("Version", AttributeValue::from("2012-10-17")),
            (
                "Statement",
                AttributeValue::list([AttributeValue::map([
                    ("Effect", AttributeValue::from("Allow")),
                    ("Action", AttributeValue::list(["s3:GetObject"])),
                    ("Resource", AttributeValue::reference(&bucket_id, "arn")),
                ])]),
            ),
        ]),
    );
    let policy_id = policy.id().clone();

    let role = ResourceNode::new("identity", "role")
        .with_attribute("assumed_by", "lambda.amazonaws.com")
        .with_attribute("policy", AttributeValue::reference(&policy_id, "arn"));

    let mut graph = ResourceGraph::new();
    graph
        .add_node(bucket)
        .and_then(|g| g.add_node(policy))
        .and_then(|g| g.add_node(role))
        .expect("face stack identities are unique");
    graph
}

/// Builds a graph from `(name, dependencies)` pairs in declaration order.
pub fn build_from(layout: &[(&str, &[&str])]) -> Result<BuiltGraph, strata_graph::BuildError> {
    let mut graph = ResourceGraph::new();
    for (name, targets) in layout {
        graph.add_node(node_referencing(name, targets))?;
    }
    graph.build()
}
