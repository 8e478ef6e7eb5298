//! Backoff schedule for transient provisioning failures.

use backon::ExponentialBuilder;
use strata_core::RetryPolicy;

/// Converts a [`RetryPolicy`] into the exponential backoff used per resource.
///
/// `max_retries` counts retries, not attempts: a policy with three retries
/// allows up to four calls to the provisioner.
#[must_use]
pub fn backoff(policy: &RetryPolicy) -> ExponentialBuilder {
    let builder = ExponentialBuilder::default()
        .with_min_delay(policy.min_delay)
        .with_max_delay(policy.max_delay)
        .with_factor(policy.factor)
        .with_max_times(policy.max_retries);
    if policy.jitter {
        builder.with_jitter()
    } else {
        builder
    }
}
