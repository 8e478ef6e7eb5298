//! # Strata Internal Library
//!
//! Re-exports the core Strata crates for convenience.

/// Layer 0: configuration, retry policy, tracing setup.
pub use strata_core;

/// Layer 1: resource graph primitives.
pub use strata_graph;

/// Layer 2: evaluation, provisioning and outputs.
pub use strata_apply;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use strata_apply::prelude::*;
    pub use strata_core::{Credentials, RetryPolicy, StackConfig, TracingSetup};
    pub use strata_graph::prelude::*;
}
