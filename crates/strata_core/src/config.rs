//! Immutable stack configuration.
//!
//! A [`StackConfig`] is built once, validated, and then passed by reference
//! (usually behind an `Arc`) into the evaluator and into provisioners at
//! construction. Region, credentials and naming never come from ambient
//! process state after that point.
//!
//! # Environment
//!
//! [`StackConfig::from_env`] reads the following variables. Empty values fall
//! back to the defaults.
//!
//! | Variable | Field | Default |
//! |----------|-------|---------|
//! | `STRATA_SHARED_RESOURCE_IDENTIFIER` | shared resource identifier | `rekognition_api` |
//! | `STRATA_REGION` | region | `us-east-1` |
//! | `STRATA_PROFILE` | credentials profile | none |
//! | `STRATA_ACCESS_KEY_ID` / `STRATA_SECRET_ACCESS_KEY` | static keys | none |
//! | `STRATA_DEBUG_MODE` | debug mode | `false` |
//! | `STRATA_MAX_RETRIES` | retry bound | `3` |

use core::fmt;
use core::time::Duration;

use serde_json::{Value, json};

use crate::build_info::BuildInfo;

/// Default shared resource identifier used to derive resource names.
pub const DEFAULT_SHARED_RESOURCE_IDENTIFIER: &str = "rekognition_api";

/// Default region.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Prefix of every environment variable read by [`StackConfig::from_env`].
pub const ENV_PREFIX: &str = "STRATA_";

// ─────────────────────────────────────────────────────────────────────────────
// Secret
// ─────────────────────────────────────────────────────────────────────────────

/// A string that never appears in `Debug` or `Display` output.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    /// Wraps a secret value.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the underlying value.
    ///
    /// Callers are responsible for keeping the result out of logs.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(<redacted>)")
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<redacted>")
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Credentials
// ─────────────────────────────────────────────────────────────────────────────

/// How a provisioner should authenticate against its control plane.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Credentials {
    /// Use whatever the runtime environment provides (instance role, etc).
    #[default]
    Ambient,
    /// A named credentials profile.
    Profile(String),
    /// An explicit key pair.
    StaticKeys {
        /// Access key identifier.
        access_key_id: String,
        /// Secret access key.
        secret_access_key: Secret,
    },
}

impl Credentials {
    /// Short label describing where the credentials come from.
    #[must_use]
    pub fn source(&self) -> &'static str {
        match self {
            Credentials::Ambient => "ambient",
            Credentials::Profile(_) => "profile",
            Credentials::StaticKeys { .. } => "static_keys",
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// RetryPolicy
// ─────────────────────────────────────────────────────────────────────────────

/// Bounded exponential backoff for transient provisioning failures.
///
/// The delay before retry `n` is `min_delay * factor^(n-1)`, capped at
/// `max_delay`, optionally jittered.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of retries after the first attempt.
    pub max_retries: usize,
    /// Delay before the first retry.
    pub min_delay: Duration,
    /// Upper bound for any single delay.
    pub max_delay: Duration,
    /// Multiplier applied to the delay after each retry.
    pub factor: f32,
    /// Whether to add random jitter to each delay.
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            min_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(10),
            factor: 2.0,
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    #[must_use]
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Sets the maximum number of retries.
    #[must_use]
    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Sets the first and maximum delays.
    #[must_use]
    pub fn with_delays(mut self, min_delay: Duration, max_delay: Duration) -> Self {
        self.min_delay = min_delay;
        self.max_delay = max_delay;
        self
    }

    /// Sets the backoff multiplier.
    #[must_use]
    pub fn with_factor(mut self, factor: f32) -> Self {
        self.factor = factor;
        self
    }

    /// Enables or disables jitter.
    #[must_use]
    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Returns the un-jittered delay that precedes retry number `retry` (1-based).
    #[must_use]
    pub fn delay_for(&self, retry: usize) -> Duration {
        let exponent = i32::try_from(retry.saturating_sub(1)).unwrap_or(i32::MAX);
        let scaled = self.min_delay.as_secs_f64() * f64::from(self.factor).powi(exponent);
        if !scaled.is_finite() || scaled >= self.max_delay.as_secs_f64() {
            self.max_delay
        } else {
            Duration::from_secs_f64(scaled)
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ConfigError
// ─────────────────────────────────────────────────────────────────────────────

/// Errors produced while loading or validating a [`StackConfig`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// A setting holds a value that cannot be used.
    #[error("invalid value '{value}' for {key}: {reason}")]
    InvalidValue {
        /// Setting name.
        key: &'static str,
        /// The rejected value.
        value: String,
        /// Why it was rejected.
        reason: &'static str,
    },
    /// Only one half of a static key pair was supplied.
    #[error("static credentials require both an access key id and a secret access key")]
    IncompleteKeyPair,
}

// ─────────────────────────────────────────────────────────────────────────────
// StackConfig
// ─────────────────────────────────────────────────────────────────────────────

/// Immutable configuration for one stack evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct StackConfig {
    shared_resource_identifier: String,
    region: String,
    credentials: Credentials,
    debug_mode: bool,
    retry: RetryPolicy,
}

impl Default for StackConfig {
    fn default() -> Self {
        Self {
            shared_resource_identifier: DEFAULT_SHARED_RESOURCE_IDENTIFIER.to_string(),
            region: DEFAULT_REGION.to_string(),
            credentials: Credentials::Ambient,
            debug_mode: false,
            retry: RetryPolicy::default(),
        }
    }
}

impl StackConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if a variable holds an unusable value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through an arbitrary key lookup.
    ///
    /// `lookup` receives full variable names (including [`ENV_PREFIX`]).
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if a value is unusable or the result fails
    /// [`validate`](Self::validate).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| {
            lookup(&format!("{ENV_PREFIX}{name}")).filter(|value| !value.trim().is_empty())
        };

        let mut config = Self::default();

        if let Some(identifier) = read("SHARED_RESOURCE_IDENTIFIER") {
            config.shared_resource_identifier = identifier;
        }
        if let Some(region) = read("REGION") {
            config.region = region;
        }
        if let Some(debug) = read("DEBUG_MODE") {
            config.debug_mode = parse_flag(&debug);
        }
        if let Some(retries) = read("MAX_RETRIES") {
            let max_retries = retries
                .trim()
                .parse::<usize>()
                .map_err(|_| ConfigError::InvalidValue {
                    key: "max_retries",
                    value: retries.clone(),
                    reason: "expected a non-negative integer",
                })?;
            config.retry = config.retry.with_max_retries(max_retries);
        }

        let profile = read("PROFILE");
        let access_key_id = read("ACCESS_KEY_ID");
        let secret_access_key = read("SECRET_ACCESS_KEY");

        config.credentials = match (profile, access_key_id, secret_access_key) {
            (Some(profile), keys_id, keys_secret) => {
                if keys_id.is_some() || keys_secret.is_some() {
                    tracing::warn!(
                        profile = %profile,
                        "static keys are ignored because a profile is configured"
                    );
                }
                Credentials::Profile(profile)
            }
            (None, Some(access_key_id), Some(secret)) => Credentials::StaticKeys {
                access_key_id,
                secret_access_key: Secret::new(secret),
            },
            (None, Some(_), None) | (None, None, Some(_)) => {
                return Err(ConfigError::IncompleteKeyPair);
            }
            (None, None, None) => Credentials::Ambient,
        };

        config.validate()?;

        tracing::debug!(
            region = %config.region,
            credentials = config.credentials.source(),
            "loaded stack configuration"
        );
        Ok(config)
    }

    /// Sets the shared resource identifier.
    #[must_use]
    pub fn with_shared_resource_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.shared_resource_identifier = identifier.into();
        self
    }

    /// Sets the region.
    #[must_use]
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    /// Sets the credentials.
    #[must_use]
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    /// Enables or disables debug mode.
    #[must_use]
    pub fn with_debug_mode(mut self, debug_mode: bool) -> Self {
        self.debug_mode = debug_mode;
        self
    }

    /// Sets the retry policy for provisioning calls.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Returns the shared resource identifier.
    #[must_use]
    pub fn shared_resource_identifier(&self) -> &str {
        &self.shared_resource_identifier
    }

    /// Returns the region.
    #[must_use]
    pub fn region(&self) -> &str {
        &self.region
    }

    /// Returns the credentials.
    #[must_use]
    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Returns whether debug mode is enabled.
    #[must_use]
    pub fn debug_mode(&self) -> bool {
        self.debug_mode
    }

    /// Returns the retry policy.
    #[must_use]
    pub fn retry(&self) -> RetryPolicy {
        self.retry
    }

    /// Name of the storage bucket for the given account.
    #[must_use]
    pub fn bucket_name(&self, account_id: &str) -> String {
        format!("{account_id}-{}", self.shared_resource_identifier)
    }

    /// Name of the HTTP API.
    #[must_use]
    pub fn api_name(&self) -> String {
        format!("{}-api", self.shared_resource_identifier)
    }

    /// Checks that every field holds a usable value.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !is_valid_identifier(&self.shared_resource_identifier) {
            return Err(ConfigError::InvalidValue {
                key: "shared_resource_identifier",
                value: self.shared_resource_identifier.clone(),
                reason: "expected ASCII letters, digits, '_' or '-'",
            });
        }
        if !is_valid_region(&self.region) {
            return Err(ConfigError::InvalidValue {
                key: "region",
                value: self.region.clone(),
                reason: "expected a region code such as 'us-east-1'",
            });
        }
        if let Credentials::Profile(profile) = &self.credentials
            && profile.trim().is_empty()
        {
            return Err(ConfigError::InvalidValue {
                key: "profile",
                value: profile.clone(),
                reason: "profile name is empty",
            });
        }
        if !self.retry.factor.is_finite() || self.retry.factor < 1.0 {
            return Err(ConfigError::InvalidValue {
                key: "retry.factor",
                value: self.retry.factor.to_string(),
                reason: "backoff factor must be a finite number of at least 1.0",
            });
        }
        if self.retry.min_delay > self.retry.max_delay {
            return Err(ConfigError::InvalidValue {
                key: "retry.min_delay",
                value: format!("{:?}", self.retry.min_delay),
                reason: "minimum delay exceeds maximum delay",
            });
        }
        Ok(())
    }

    /// Returns a key-sorted snapshot of the configuration with secrets redacted.
    #[must_use]
    pub fn dump(&self) -> Value {
        let credentials = match &self.credentials {
            Credentials::Ambient => json!({ "source": "ambient" }),
            Credentials::Profile(profile) => json!({ "source": "profile", "profile": profile }),
            Credentials::StaticKeys {
                access_key_id,
                secret_access_key,
            } => json!({
                "source": "static_keys",
                "access_key_id": access_key_id,
                "secret_access_key": secret_access_key.to_string(),
            }),
        };

        sort_keys(json!({
            "build": BuildInfo::current(),
            "credentials": credentials,
            "debug_mode": self.debug_mode,
            "region": self.region,
            "retry": {
                "factor": self.retry.factor,
                "jitter": self.retry.jitter,
                "max_delay_ms": u64::try_from(self.retry.max_delay.as_millis()).unwrap_or(u64::MAX),
                "max_retries": self.retry.max_retries,
                "min_delay_ms": u64::try_from(self.retry.min_delay.as_millis()).unwrap_or(u64::MAX),
            },
            "shared_resource_identifier": self.shared_resource_identifier,
        }))
    }
}

/// Rebuilds every object with its keys in ascending order, whatever the
/// `serde_json` map ordering in effect.
fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|(a, _), (b, _)| a.cmp(b));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(key, value)| (key, sort_keys(value)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}

/// Interprets a loosely typed boolean flag.
fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "t" | "y" | "yes"
    )
}

fn is_valid_identifier(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Region codes look like `us-east-1` or `ap-southeast-2`.
fn is_valid_region(value: &str) -> bool {
    let parts: Vec<&str> = value.split('-').collect();
    let Some((last, rest)) = parts.split_last() else {
        return false;
    };
    parts.len() >= 3
        && !last.is_empty()
        && last.chars().all(|c| c.is_ascii_digit())
        && rest
            .iter()
            .all(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_lowercase()))
}
