//! Tests for cancellation.
//!
//! The token is checked between resources only: the resource in flight
//! finishes, nothing after it starts.

mod test_utils;

use strata_apply::dev::RecordingProvisioner;
use strata_apply::hooks::EvaluationEvent;
use strata_apply::{CancellationToken, EvaluationError};
use test_utils::{EventLog, bucket_id, chain_graph, evaluator, policy_id, role_id};

#[tokio::test]
async fn cancelled_before_start_materializes_nothing() {
    let graph = chain_graph();
    let provisioner = RecordingProvisioner::new();
    let token = CancellationToken::new();
    token.cancel();

    let failure = evaluator(0)
        .with_cancellation(token)
        .evaluate(&graph, &provisioner)
        .await
        .unwrap_err();

    assert!(provisioner.calls().is_empty());
    assert!(failure.applied.is_empty());
    assert!(failure.error.is_cancelled());
}

#[tokio::test]
async fn cancellation_stops_before_the_next_resource() {
    let graph = chain_graph();
    let token = CancellationToken::new();
    let provisioner = RecordingProvisioner::new().cancel_after(bucket_id(), token.clone());
    let (log, hooks) = EventLog::install();

    let failure = evaluator(0)
        .with_hooks(hooks)
        .with_cancellation(token)
        .evaluate(&graph, &provisioner)
        .await
        .unwrap_err();

    assert_eq!(provisioner.materialized(), vec![bucket_id()]);
    assert_eq!(failure.applied.ids(), vec![&bucket_id()]);
    let EvaluationError::Cancelled { pending } = &failure.error else {
        panic!("expected Cancelled, got {:?}", failure.error);
    };
    assert_eq!(pending, &vec![policy_id(), role_id()]);
    assert_eq!(failure.error.resource(), None);

    assert!(log.events().contains(&EvaluationEvent::EvaluationCancelled {
        materialized: 1,
        pending: 2,
    }));
}

#[tokio::test]
async fn cancellation_during_last_resource_still_completes() {
    let graph = chain_graph();
    let token = CancellationToken::new();
    let provisioner = RecordingProvisioner::new().cancel_after(role_id(), token.clone());

    let results = evaluator(0)
        .with_cancellation(token.clone())
        .evaluate(&graph, &provisioner)
        .await
        .unwrap();

    assert_eq!(results.len(), 3);
    assert!(token.is_cancelled());
}
