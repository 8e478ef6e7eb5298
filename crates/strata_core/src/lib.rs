//! Ambient foundations for Strata (Layer 0).
//!
//! `strata_core` holds the pieces every other crate needs but none of them
//! owns: the immutable [`StackConfig`] handed to evaluators and provisioners,
//! the retry policy for remote calls, tracing subscriber setup, and build
//! metadata.
//!
//! # Example
//!
//! ```
//! use strata_core::{RetryPolicy, StackConfig};
//!
//! let config = StackConfig::new()
//!     .with_region("eu-west-1")
//!     .with_shared_resource_identifier("faces")
//!     .with_retry(RetryPolicy::default().with_max_retries(5));
//!
//! assert!(config.validate().is_ok());
//! assert_eq!(config.api_name(), "faces-api");
//! ```

/// Build metadata.
pub mod build_info;

/// Immutable stack configuration.
pub mod config;

/// Tracing subscriber setup.
pub mod tracing_setup;

pub use build_info::BuildInfo;
pub use config::{ConfigError, Credentials, RetryPolicy, Secret, StackConfig};
pub use tracing_setup::{LIFECYCLE_TARGET, TracingFormat, TracingSetup, UnknownFormat};
