//! End-to-end evaluation tests.
//!
//! These tests verify:
//! - Materialization follows the dependency order
//! - References are substituted with exactly the referenced value
//! - A failure leaves earlier resources applied and later ones untouched
//! - Resolution errors surface with their location

mod test_utils;

use serde_json::json;
use strata_apply::dev::RecordingProvisioner;
use strata_apply::hooks::Schedule;
use strata_apply::{EvaluationError, Outputs, ProvisioningErrorKind};
use strata_graph::{AttributeValue, Fragment, ResourceGraph, ResourceNode};
use test_utils::{EventLog, bucket_id, chain_graph, evaluator, policy_id, role_id};

// ─────────────────────────────────────────────────────────────────────────────
// Happy Path
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn chain_materializes_in_dependency_order() {
    let graph = chain_graph();
    let provisioner = RecordingProvisioner::new();

    let results = evaluator(0).evaluate(&graph, &provisioner).await.unwrap();

    assert_eq!(
        provisioner.materialized(),
        vec![bucket_id(), policy_id(), role_id()]
    );
    assert_eq!(results.ids(), vec![&bucket_id(), &policy_id(), &role_id()]);
    assert!(results.iter().all(|resource| resource.attempts() == 1));
}

#[tokio::test]
async fn reference_resolves_to_exact_output() {
    let graph = chain_graph();
    let provisioner = RecordingProvisioner::new().with_outputs(
        bucket_id(),
        Outputs::from([("arn".to_string(), json!("arn:aws:s3:::123456789012-rekognition_api"))]),
    );

    let results = evaluator(0).evaluate(&graph, &provisioner).await.unwrap();

    let policy = results.get(&policy_id()).unwrap();
    assert_eq!(
        policy.inputs()["document"]["Statement"][0]["Resource"],
        json!("arn:aws:s3:::123456789012-rekognition_api")
    );
    let role = results.get(&role_id()).unwrap();
    assert_eq!(role.inputs()["policy_id"], json!("permission-policy"));
}

#[tokio::test]
async fn structured_outputs_are_substituted_whole() {
    let table = ResourceNode::new("table", "faces");
    let function = ResourceNode::new("function", "index")
        .with_attribute("stream", AttributeValue::reference(table.id(), "stream"))
        .with_attribute(
            "log_group",
            AttributeValue::interpolate([
                Fragment::from("/aws/lambda/"),
                Fragment::Reference(table.id().attribute("name")),
            ]),
        );
    let table_id = table.id().clone();
    let function_id = function.id().clone();
    let mut graph = ResourceGraph::new();
    graph.add_node(function).unwrap().add_node(table).unwrap();
    let graph = graph.build().unwrap();

    let stream = json!({ "arn": "arn:aws:dynamodb:stream/1", "view": ["NEW_IMAGE"] });
    let provisioner = RecordingProvisioner::new()
        .with_outputs(table_id, Outputs::from([("stream".to_string(), stream.clone())]));

    let results = evaluator(0).evaluate(&graph, &provisioner).await.unwrap();
    let inputs = results.get(&function_id).unwrap().inputs();
    assert_eq!(inputs["stream"], stream);
    assert_eq!(inputs["log_group"], json!("/aws/lambda/faces"));
}

#[tokio::test]
async fn literal_attributes_of_a_dependency_can_be_referenced() {
    // `bucket_name` is an input, not an output of the provisioner.
    let bucket = ResourceNode::new("storage", "bucket").with_attribute("bucket_name", "faces");
    let notify = ResourceNode::new("notification", "upload")
        .with_attribute("bucket", AttributeValue::reference(bucket.id(), "bucket_name"));
    let notify_id = notify.id().clone();
    let mut graph = ResourceGraph::new();
    graph.add_node(bucket).unwrap().add_node(notify).unwrap();

    let results = evaluator(0)
        .evaluate(&graph.build().unwrap(), &RecordingProvisioner::new())
        .await
        .unwrap();
    assert_eq!(
        results.get(&notify_id).unwrap().inputs()["bucket"],
        json!("faces")
    );
}

#[tokio::test]
async fn empty_graph_completes_immediately() {
    let graph = ResourceGraph::new().build().unwrap();
    let (log, hooks) = EventLog::install();
    let results = evaluator(0)
        .with_hooks(hooks)
        .evaluate(&graph, &RecordingProvisioner::new())
        .await
        .unwrap();

    assert!(results.is_empty());
    assert_eq!(
        log.schedules(),
        [Schedule::OnEvaluationStart, Schedule::OnEvaluationComplete]
    );
}

// ─────────────────────────────────────────────────────────────────────────────
// Failures
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn failure_at_policy_keeps_bucket_and_skips_role() {
    let graph = chain_graph();
    let provisioner =
        RecordingProvisioner::new().fail_always(policy_id(), ProvisioningErrorKind::Permanent);

    let failure = evaluator(3)
        .evaluate(&graph, &provisioner)
        .await
        .unwrap_err();

    assert_eq!(failure.applied.ids(), vec![&bucket_id()]);
    assert_eq!(provisioner.call_count(&role_id()), 0);
    assert_eq!(provisioner.call_count(&policy_id()), 1);

    let EvaluationError::Provisioning {
        resource,
        attempts,
        source,
    } = &failure.error
    else {
        panic!("expected a provisioning error, got {:?}", failure.error);
    };
    assert_eq!(resource, &policy_id());
    assert_eq!(*attempts, 1);
    assert_eq!(source.kind(), ProvisioningErrorKind::Permanent);
    assert_eq!(
        failure.to_string(),
        "evaluation stopped after 1 materialized resource(s): \
         failed to materialize permission.policy after 1 attempt(s)"
    );
}

#[tokio::test]
async fn failure_emits_lifecycle_events() {
    let graph = chain_graph();
    let provisioner =
        RecordingProvisioner::new().fail_always(policy_id(), ProvisioningErrorKind::Unauthorized);
    let (log, hooks) = EventLog::install();

    let _ = evaluator(0)
        .with_hooks(hooks)
        .evaluate(&graph, &provisioner)
        .await;

    assert_eq!(
        log.schedules(),
        [
            Schedule::OnEvaluationStart,
            Schedule::OnResourceStart,
            Schedule::OnResourceMaterialized,
            Schedule::OnResourceStart,
            Schedule::OnResourceFailed,
            Schedule::OnEvaluationFailed,
        ]
    );
}

#[tokio::test]
async fn missing_attribute_names_the_reference_location() {
    let bucket = ResourceNode::new("storage", "bucket");
    let policy = ResourceNode::new("permission", "policy").with_attribute(
        "statement",
        AttributeValue::list([AttributeValue::reference(bucket.id(), "website_endpoint")]),
    );
    let mut graph = ResourceGraph::new();
    graph.add_node(bucket).unwrap().add_node(policy).unwrap();

    let failure = evaluator(0)
        .evaluate(&graph.build().unwrap(), &RecordingProvisioner::new())
        .await
        .unwrap_err();

    let EvaluationError::MissingAttribute {
        resource,
        path,
        reference,
    } = &failure.error
    else {
        panic!("expected MissingAttribute, got {:?}", failure.error);
    };
    assert_eq!(resource, &policy_id());
    assert_eq!(path.to_string(), "statement[0]");
    assert_eq!(reference.to_string(), "storage.bucket.website_endpoint");
    assert_eq!(failure.applied.len(), 1);
}

#[tokio::test]
async fn non_finite_float_fails_before_materializing() {
    let node = ResourceNode::new("alarm", "latency").with_attribute("threshold", f64::INFINITY);
    let mut graph = ResourceGraph::new();
    graph.add_node(node).unwrap();
    let provisioner = RecordingProvisioner::new();

    let failure = evaluator(0)
        .evaluate(&graph.build().unwrap(), &provisioner)
        .await
        .unwrap_err();

    assert!(matches!(failure.error, EvaluationError::InvalidNumber { .. }));
    assert!(provisioner.calls().is_empty());
}

#[tokio::test]
async fn plan_does_not_materialize() {
    let graph = chain_graph();
    let plan = evaluator(0).plan(&graph);
    let steps: Vec<String> = plan
        .actions()
        .iter()
        .map(|action| action.resource.to_string())
        .collect();
    assert_eq!(
        steps,
        ["storage.bucket", "permission.policy", "identity.role"]
    );
    assert_eq!(plan.actions()[2].after, vec![policy_id()]);
}
