//! Terminal rendering of an applied stack.

use strata_apply::OutputMap;

/// How outputs are printed after an apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// `name = value` lines, sensitive values redacted.
    Text,
    /// A JSON object, sensitive values redacted.
    Json,
    /// A JSON object with sensitive values in full.
    RevealedJson,
}

/// Renders the outputs of an apply that materialized `materialized` resources.
#[must_use]
pub fn render_outputs(outputs: &OutputMap, materialized: usize, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => {
            format!("Apply complete! Resources: {materialized} added.\n\nOutputs:\n{outputs}")
        }
        OutputFormat::Json => format!("{:#}", outputs.to_json()),
        OutputFormat::RevealedJson => format!("{:#}", outputs.to_revealed_json()),
    }
}
