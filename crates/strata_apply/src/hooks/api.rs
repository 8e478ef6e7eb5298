//! Hook registration API for evaluations.
//!
//! [`EvaluationHooks`] is a registry of observers keyed by [`Schedule`]. The
//! evaluator invokes it at each lifecycle point; observers react to the event
//! without influencing the evaluation.
//!
//! # Registering on Several Schedules
//!
//! ```
//! use strata_apply::hooks::{EvaluationEvent, EvaluationHooks, Schedule};
//!
//! let hooks = EvaluationHooks::new();
//! hooks
//!     .register_observer(
//!         [Schedule::OnResourceStart, Schedule::OnResourceFailed],
//!         "tracker",
//!         |event: &EvaluationEvent| {
//!             if let Some(resource) = event.resource() {
//!                 println!("{:?}: {resource}", event.schedule());
//!             }
//!         },
//!     )
//!     .unwrap();
//!
//! assert!(hooks.contains_hook(Schedule::OnResourceStart, "tracker@OnResourceStart"));
//! ```

use std::sync::Arc;

use hashbrown::HashMap;
use parking_lot::RwLock;

use super::events::{EvaluationEvent, Schedule};

type BoxedHook = Arc<dyn Fn(&EvaluationEvent) + Send + Sync>;

/// Why a hook could not be registered.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HookRegistrationError {
    /// A hook with this name already exists on the schedule.
    #[error("hook '{name}' already registered for schedule '{schedule}'")]
    DuplicateName {
        /// The schedule where the duplicate was found.
        schedule: Schedule,
        /// The duplicate hook name.
        name: String,
    },
}

struct HookEntry {
    name: String,
    hook: BoxedHook,
}

/// Registry of evaluation observers.
///
/// Uses interior mutability so observers can be added through a shared
/// reference, including while an evaluator holds the registry.
#[derive(Default)]
pub struct EvaluationHooks {
    hooks: RwLock<HashMap<Schedule, Vec<HookEntry>>>,
}

impl EvaluationHooks {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an observer on one or more schedules.
    ///
    /// With more than one schedule the hook is stored once per schedule under
    /// `name@Schedule`. Registration is all or nothing.
    ///
    /// # Errors
    ///
    /// Returns [`HookRegistrationError::DuplicateName`] if a hook with the
    /// same name already exists on any of the schedules; nothing is
    /// registered in that case.
    pub fn register_observer<F>(
        &self,
        schedules: impl IntoIterator<Item = Schedule>,
        name: impl Into<String>,
        hook: F,
    ) -> Result<&Self, HookRegistrationError>
    where
        F: Fn(&EvaluationEvent) + Send + Sync + 'static,
    {
        let name = name.into();
        let mut targets: Vec<Schedule> = Vec::new();
        for schedule in schedules {
            if !targets.contains(&schedule) {
                targets.push(schedule);
            }
        }
        let suffixed = targets.len() > 1;
        let hook: BoxedHook = Arc::new(hook);

        let mut registry = self.hooks.write();
        let entry_name = |schedule: Schedule| {
            if suffixed {
                format!("{name}@{schedule}")
            } else {
                name.clone()
            }
        };

        if let Some(&schedule) = targets.iter().find(|&&schedule| {
            let wanted = entry_name(schedule);
            registry
                .get(&schedule)
                .is_some_and(|entries| entries.iter().any(|entry| entry.name == wanted))
        }) {
            return Err(HookRegistrationError::DuplicateName {
                schedule,
                name: entry_name(schedule),
            });
        }

        for schedule in targets {
            registry.entry(schedule).or_default().push(HookEntry {
                name: entry_name(schedule),
                hook: Arc::clone(&hook),
            });
        }
        Ok(self)
    }

    /// Delivers an event to every hook on its schedule, in registration order.
    ///
    /// The registry is not locked while hooks run, so a hook may register
    /// further hooks; those see the next event.
    pub fn invoke(&self, event: &EvaluationEvent) {
        let hooks: Vec<BoxedHook> = match self.hooks.read().get(&event.schedule()) {
            Some(entries) => entries.iter().map(|entry| Arc::clone(&entry.hook)).collect(),
            None => return,
        };
        for hook in hooks {
            hook(event);
        }
    }

    /// Returns the number of hooks registered for the schedule.
    #[must_use]
    pub fn hook_count(&self, schedule: Schedule) -> usize {
        self.hooks.read().get(&schedule).map_or(0, Vec::len)
    }

    /// Returns whether `name` is registered on `schedule`.
    #[must_use]
    pub fn contains_hook(&self, schedule: Schedule, name: &str) -> bool {
        self.hooks
            .read()
            .get(&schedule)
            .is_some_and(|entries| entries.iter().any(|entry| entry.name == name))
    }
}

impl core::fmt::Debug for EvaluationHooks {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let hooks = self.hooks.read();
        let mut map = f.debug_map();
        for (schedule, entries) in hooks.iter() {
            let names: Vec<&str> = entries.iter().map(|entry| entry.name.as_str()).collect();
            map.entry(schedule, &names);
        }
        map.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn register_increments_count() {
        let hooks = EvaluationHooks::new();
        hooks
            .register_observer([Schedule::OnResourceStart], "a", |_| {})
            .expect("registration should succeed");
        hooks
            .register_observer([Schedule::OnResourceStart], "b", |_| {})
            .expect("registration should succeed");

        assert_eq!(hooks.hook_count(Schedule::OnResourceStart), 2);
        assert_eq!(hooks.hook_count(Schedule::OnResourceFailed), 0);
    }

    #[test]
    fn duplicate_name_is_rejected() {
        let hooks = EvaluationHooks::new();
        hooks
            .register_observer([Schedule::OnEvaluationStart], "logger", |_| {})
            .unwrap();
        let err = hooks
            .register_observer([Schedule::OnEvaluationStart], "logger", |_| {})
            .unwrap_err();

        assert_eq!(
            err.to_string(),
            "hook 'logger' already registered for schedule 'OnEvaluationStart'"
        );
    }

    #[test]
    fn multi_schedule_names_are_suffixed() {
        let hooks = EvaluationHooks::new();
        hooks
            .register_observer(
                [Schedule::OnEvaluationStart, Schedule::OnEvaluationComplete],
                "tracker",
                |_| {},
            )
            .unwrap();

        assert!(hooks.contains_hook(Schedule::OnEvaluationStart, "tracker@OnEvaluationStart"));
        assert!(hooks.contains_hook(
            Schedule::OnEvaluationComplete,
            "tracker@OnEvaluationComplete"
        ));
        assert!(!hooks.contains_hook(Schedule::OnEvaluationStart, "tracker"));
    }

    #[test]
    fn invoke_only_reaches_matching_schedule_in_order() {
        let hooks = EvaluationHooks::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let other = Arc::new(AtomicUsize::new(0));

        for label in ["first", "second"] {
            let seen = Arc::clone(&seen);
            hooks
                .register_observer([Schedule::OnEvaluationStart], label, move |_| {
                    seen.lock().unwrap().push(label);
                })
                .unwrap();
        }
        let counter = Arc::clone(&other);
        hooks
            .register_observer([Schedule::OnEvaluationFailed], "other", move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();

        hooks.invoke(&EvaluationEvent::EvaluationStart { resource_count: 3 });

        assert_eq!(*seen.lock().unwrap(), ["first", "second"]);
        assert_eq!(other.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn failed_registration_registers_nothing() {
        let hooks = EvaluationHooks::new();
        hooks
            .register_observer([Schedule::OnResourceFailed], "audit@OnResourceFailed", |_| {})
            .unwrap();

        let err = hooks
            .register_observer(
                [Schedule::OnResourceStart, Schedule::OnResourceFailed],
                "audit",
                |_| {},
            )
            .unwrap_err();

        assert_eq!(
            err,
            HookRegistrationError::DuplicateName {
                schedule: Schedule::OnResourceFailed,
                name: "audit@OnResourceFailed".into(),
            }
        );
        assert_eq!(hooks.hook_count(Schedule::OnResourceStart), 0);
    }

    #[test]
    fn repeated_schedule_registers_once_without_suffix() {
        let hooks = EvaluationHooks::new();
        hooks
            .register_observer(
                [Schedule::OnResourceRetry, Schedule::OnResourceRetry],
                "retries",
                |_| {},
            )
            .unwrap();

        assert_eq!(hooks.hook_count(Schedule::OnResourceRetry), 1);
        assert!(hooks.contains_hook(Schedule::OnResourceRetry, "retries"));
    }

    #[test]
    fn hook_may_register_hooks() {
        let hooks = Arc::new(EvaluationHooks::new());
        let registry = Arc::clone(&hooks);
        hooks
            .register_observer([Schedule::OnEvaluationStart], "installer", move |_| {
                let _ = registry.register_observer([Schedule::OnEvaluationComplete], "late", |_| {});
            })
            .unwrap();

        hooks.invoke(&EvaluationEvent::EvaluationStart { resource_count: 0 });

        assert!(hooks.contains_hook(Schedule::OnEvaluationComplete, "late"));
    }
}
