//! Ready-made observers.

use strata_core::LIFECYCLE_TARGET;

use super::api::{EvaluationHooks, HookRegistrationError};
use super::events::{EvaluationEvent, Schedule};

/// Name under which [`install_tracing_observer`] registers itself.
pub const TRACING_OBSERVER: &str = "tracing";

/// Registers an observer that turns every lifecycle event into a `tracing`
/// event on [`LIFECYCLE_TARGET`].
///
/// # Errors
///
/// Returns [`HookRegistrationError::DuplicateName`] if it is already installed.
pub fn install_tracing_observer(hooks: &EvaluationHooks) -> Result<(), HookRegistrationError> {
    hooks.register_observer(Schedule::ALL, TRACING_OBSERVER, log_event)?;
    Ok(())
}

fn log_event(event: &EvaluationEvent) {
    match event {
        EvaluationEvent::EvaluationStart { resource_count } => {
            tracing::info!(target: LIFECYCLE_TARGET, resource_count, "evaluation started");
        }
        EvaluationEvent::ResourceStart { resource, position } => {
            tracing::debug!(target: LIFECYCLE_TARGET, %resource, position, "resource started");
        }
        EvaluationEvent::ResourceRetry {
            resource,
            attempt,
            delay,
            error,
        } => {
            tracing::warn!(
                target: LIFECYCLE_TARGET,
                %resource,
                attempt,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                %error,
                "retrying resource"
            );
        }
        EvaluationEvent::ResourceMaterialized {
            resource,
            attempts,
            duration,
        } => {
            tracing::info!(
                target: LIFECYCLE_TARGET,
                %resource,
                attempts,
                duration_ms = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
                "resource materialized"
            );
        }
        EvaluationEvent::ResourceFailed { resource, error } => {
            tracing::error!(target: LIFECYCLE_TARGET, %resource, %error, "resource failed");
        }
        EvaluationEvent::EvaluationCancelled {
            materialized,
            pending,
        } => {
            tracing::warn!(target: LIFECYCLE_TARGET, materialized, pending, "evaluation cancelled");
        }
        EvaluationEvent::EvaluationComplete {
            materialized,
            duration,
        } => {
            tracing::info!(
                target: LIFECYCLE_TARGET,
                materialized,
                duration_ms = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
                "evaluation complete"
            );
        }
        EvaluationEvent::EvaluationFailed {
            materialized,
            error,
        } => {
            tracing::error!(target: LIFECYCLE_TARGET, materialized, %error, "evaluation failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use core::time::Duration;
    use std::sync::Arc;

    use parking_lot::Mutex;
    use strata_graph::ResourceId;
    use tracing::span::{Attributes, Id, Record};
    use tracing::{Event, Metadata, Subscriber};

    use super::*;

    /// Collects the target of every event it sees.
    #[derive(Default, Clone)]
    struct TargetRecorder {
        targets: Arc<Mutex<Vec<String>>>,
    }

    impl Subscriber for TargetRecorder {
        fn enabled(&self, _: &Metadata<'_>) -> bool {
            true
        }
        fn new_span(&self, _: &Attributes<'_>) -> Id {
            Id::from_u64(1)
        }
        fn record(&self, _: &Id, _: &Record<'_>) {}
        fn record_follows_from(&self, _: &Id, _: &Id) {}
        fn event(&self, event: &Event<'_>) {
            self.targets.lock().push(event.metadata().target().to_owned());
        }
        fn enter(&self, _: &Id) {}
        fn exit(&self, _: &Id) {}
    }

    #[test]
    fn every_event_logs_on_the_lifecycle_target() {
        let recorder = TargetRecorder::default();
        let hooks = EvaluationHooks::new();
        install_tracing_observer(&hooks).unwrap();
        let bucket = ResourceId::new("storage", "bucket");
        let events = [
            EvaluationEvent::EvaluationStart { resource_count: 1 },
            EvaluationEvent::ResourceStart {
                resource: bucket.clone(),
                position: 0,
            },
            EvaluationEvent::ResourceRetry {
                resource: bucket.clone(),
                attempt: 1,
                delay: Duration::from_millis(5),
                error: "throttled: slow down".into(),
            },
            EvaluationEvent::ResourceMaterialized {
                resource: bucket.clone(),
                attempts: 2,
                duration: Duration::from_millis(9),
            },
            EvaluationEvent::ResourceFailed {
                resource: bucket,
                error: "permanent: no".into(),
            },
            EvaluationEvent::EvaluationCancelled {
                materialized: 1,
                pending: 0,
            },
            EvaluationEvent::EvaluationComplete {
                materialized: 1,
                duration: Duration::from_millis(9),
            },
            EvaluationEvent::EvaluationFailed {
                materialized: 0,
                error: "permanent: no".into(),
            },
        ];

        tracing::subscriber::with_default(recorder.clone(), || {
            for event in &events {
                hooks.invoke(event);
            }
        });

        let targets = recorder.targets.lock();
        assert_eq!(targets.len(), events.len());
        assert!(targets.iter().all(|target| target == LIFECYCLE_TARGET));
    }

    #[test]
    fn installs_on_every_schedule_once() {
        let hooks = EvaluationHooks::new();
        install_tracing_observer(&hooks).unwrap();

        for schedule in Schedule::ALL {
            assert_eq!(hooks.hook_count(schedule), 1);
        }
        assert!(install_tracing_observer(&hooks).is_err());
    }
}
