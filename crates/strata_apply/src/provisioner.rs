//! The boundary to whatever actually creates resources.
//!
//! The evaluator never talks to a cloud control plane itself. It hands fully
//! resolved attributes to a [`Provisioner`] and records the outputs it gets
//! back.

use core::error::Error;
use core::fmt;

use async_trait::async_trait;
use indexmap::IndexMap;
use serde_json::Value;

/// Resolved input attributes, in declaration order.
pub type Attributes = IndexMap<String, Value>;

/// Attributes reported by the provisioner after materialization.
pub type Outputs = IndexMap<String, Value>;

/// Materializes one resource at a time.
///
/// Implementations must be safe to share across tasks. The evaluator awaits
/// every call before starting the next one, so a provisioner never sees two
/// concurrent calls from the same evaluation.
///
/// # Example
///
/// ```
/// use async_trait::async_trait;
/// use strata_apply::{Attributes, Outputs, Provisioner, ProvisioningError};
///
/// struct Echo;
///
/// #[async_trait]
/// impl Provisioner for Echo {
///     async fn materialize(
///         &self,
///         resource_type: &str,
///         name: &str,
///         attributes: &Attributes,
///     ) -> Result<Outputs, ProvisioningError> {
///         let mut outputs = attributes.clone();
///         outputs.insert("id".into(), format!("{resource_type}-{name}").into());
///         Ok(outputs)
///     }
/// }
/// ```
#[async_trait]
pub trait Provisioner: Send + Sync {
    /// Creates or updates the resource and returns its outputs.
    ///
    /// # Errors
    ///
    /// Returns a [`ProvisioningError`] whose kind decides whether the
    /// evaluator retries the call.
    async fn materialize(
        &self,
        resource_type: &str,
        name: &str,
        attributes: &Attributes,
    ) -> Result<Outputs, ProvisioningError>;
}

// ─────────────────────────────────────────────────────────────────────────────
// ProvisioningError
// ─────────────────────────────────────────────────────────────────────────────

/// Classification of a provisioning failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProvisioningErrorKind {
    /// The control plane asked the caller to slow down.
    Throttled,
    /// Timeouts, unavailability and other failures expected to clear up.
    Transient,
    /// The caller lacks permission. Never retried.
    Unauthorized,
    /// The request can never succeed as written. Never retried.
    Permanent,
}

impl ProvisioningErrorKind {
    /// Returns true for kinds the evaluator retries.
    #[must_use]
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::Throttled | Self::Transient)
    }

    /// Returns a short lowercase label.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Throttled => "throttled",
            Self::Transient => "transient",
            Self::Unauthorized => "unauthorized",
            Self::Permanent => "permanent",
        }
    }
}

impl fmt::Display for ProvisioningErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure reported by a [`Provisioner`].
#[derive(Debug, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct ProvisioningError {
    kind: ProvisioningErrorKind,
    message: String,
    #[source]
    source: Option<Box<dyn Error + Send + Sync>>,
}

impl ProvisioningError {
    /// Creates an error of the given kind.
    #[must_use]
    pub fn new(kind: ProvisioningErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Creates a [`Throttled`](ProvisioningErrorKind::Throttled) error.
    #[must_use]
    pub fn throttled(message: impl Into<String>) -> Self {
        Self::new(ProvisioningErrorKind::Throttled, message)
    }

    /// Creates a [`Transient`](ProvisioningErrorKind::Transient) error.
    #[must_use]
    pub fn transient(message: impl Into<String>) -> Self {
        Self::new(ProvisioningErrorKind::Transient, message)
    }

    /// Creates an [`Unauthorized`](ProvisioningErrorKind::Unauthorized) error.
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ProvisioningErrorKind::Unauthorized, message)
    }

    /// Creates a [`Permanent`](ProvisioningErrorKind::Permanent) error.
    #[must_use]
    pub fn permanent(message: impl Into<String>) -> Self {
        Self::new(ProvisioningErrorKind::Permanent, message)
    }

    /// Attaches the underlying cause.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<Box<dyn Error + Send + Sync>>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Returns the failure classification.
    #[must_use]
    pub fn kind(&self) -> ProvisioningErrorKind {
        self.kind
    }

    /// Returns the message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns true if the evaluator should try again.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_throttled_and_transient_are_retryable() {
        assert!(ProvisioningError::throttled("slow down").is_retryable());
        assert!(ProvisioningError::transient("timeout").is_retryable());
        assert!(!ProvisioningError::unauthorized("denied").is_retryable());
        assert!(!ProvisioningError::permanent("bad name").is_retryable());
    }

    #[test]
    fn display_and_source_chain() {
        let io = std::io::Error::new(std::io::ErrorKind::TimedOut, "socket timed out");
        let err = ProvisioningError::transient("create bucket timed out").with_source(io);
        assert_eq!(err.to_string(), "transient: create bucket timed out");
        let source = err.source().map(ToString::to_string);
        assert_eq!(source.as_deref(), Some("socket timed out"));
    }
}
