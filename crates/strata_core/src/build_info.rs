//! Build metadata.
//!
//! [`BuildInfo`] reports the crate version and whether the binary was compiled
//! with debug assertions. It is embedded in configuration dumps so a log line
//! can be traced back to the build that produced it.

use serde::Serialize;

/// Build-time information about the running Strata library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BuildInfo {
    /// Library version string.
    pub version: &'static str,
    /// Whether compiled in debug mode.
    pub debug: bool,
}

impl Default for BuildInfo {
    fn default() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION"),
            debug: cfg!(debug_assertions),
        }
    }
}

impl BuildInfo {
    /// Returns the metadata of the current build.
    #[must_use]
    pub fn current() -> Self {
        Self::default()
    }
}
