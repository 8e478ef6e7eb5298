//! Named stack outputs.
//!
//! An [`OutputExporter`] holds the output declarations of a stack and turns a
//! [`ResultSet`] into an [`OutputMap`]. Sensitive outputs are stored in full
//! but never shown by `Display`, `Debug` or `Serialize`; the value is only
//! available through [`OutputValue::reveal`].

use core::fmt;

use indexmap::IndexMap;
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use serde_json::Value;
use strata_graph::{AttributePath, AttributeReference, AttributeValue, ResourceId};

use crate::resolve::{self, ResolveError};
use crate::result::ResultSet;

/// Placeholder shown instead of a sensitive value.
pub const REDACTED: &str = "<sensitive>";

// ─────────────────────────────────────────────────────────────────────────────
// OutputError
// ─────────────────────────────────────────────────────────────────────────────

/// Errors produced while exporting outputs.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OutputError {
    /// The source references a resource absent from the result set.
    #[error("output '{output}' references {target}, which was not materialized")]
    UnresolvedOutput {
        /// The output name.
        output: String,
        /// The resource that was never evaluated.
        target: ResourceId,
    },
    /// The resource was materialized but lacks the attribute.
    #[error("output '{output}' references {reference}, which does not exist")]
    MissingAttribute {
        /// The output name.
        output: String,
        /// The unresolvable reference.
        reference: AttributeReference,
    },
    /// Two declarations share a name.
    #[error("output '{output}' is declared more than once")]
    DuplicateOutput {
        /// The repeated name.
        output: String,
    },
    /// The name is not an identifier.
    #[error("output name '{output}' must match [A-Za-z_][A-Za-z0-9_]*")]
    InvalidOutputName {
        /// The rejected name.
        output: String,
    },
    /// A literal float in the source is NaN or infinite.
    #[error("output '{output}' has a non-finite number at {path}")]
    InvalidNumber {
        /// The output name.
        output: String,
        /// Location inside the source value.
        path: AttributePath,
    },
}

impl OutputError {
    fn from_resolve(output: &str, error: ResolveError) -> Self {
        let output = output.to_string();
        match error {
            ResolveError::Unresolved { target, .. } => Self::UnresolvedOutput { output, target },
            ResolveError::MissingAttribute { reference, .. } => {
                Self::MissingAttribute { output, reference }
            }
            ResolveError::InvalidNumber { path } => Self::InvalidNumber { output, path },
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// OutputDeclaration
// ─────────────────────────────────────────────────────────────────────────────

/// A named value to export after evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputDeclaration {
    name: String,
    source: AttributeValue,
    sensitive: bool,
    description: Option<String>,
}

impl OutputDeclaration {
    /// Declares an output from any value; usually a reference.
    #[must_use]
    pub fn new(name: impl Into<String>, source: impl Into<AttributeValue>) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
            sensitive: false,
            description: None,
        }
    }

    /// Declares an output reading `attribute` of `target`.
    #[must_use]
    pub fn reference(
        name: impl Into<String>,
        target: &ResourceId,
        attribute: impl Into<String>,
    ) -> Self {
        Self::new(name, AttributeValue::reference(target, attribute))
    }

    /// Marks the output as sensitive.
    #[must_use]
    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    /// Sets a human-readable description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Returns the output name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the source value.
    #[must_use]
    pub fn source(&self) -> &AttributeValue {
        &self.source
    }

    /// Returns true if the output is sensitive.
    #[must_use]
    pub fn is_sensitive(&self) -> bool {
        self.sensitive
    }

    /// Returns the description, if any.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// OutputValue / OutputMap
// ─────────────────────────────────────────────────────────────────────────────

/// An exported value.
#[derive(Clone, PartialEq)]
pub struct OutputValue {
    value: Value,
    sensitive: bool,
    description: Option<String>,
}

impl OutputValue {
    /// Returns the value, sensitive or not.
    #[must_use]
    pub fn reveal(&self) -> &Value {
        &self.value
    }

    /// Returns true if the value is sensitive.
    #[must_use]
    pub fn is_sensitive(&self) -> bool {
        self.sensitive
    }

    /// Returns the description, if any.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns the value, or the redaction placeholder if sensitive.
    #[must_use]
    pub fn display_value(&self) -> Value {
        if self.sensitive {
            Value::String(REDACTED.to_string())
        } else {
            self.value.clone()
        }
    }
}

impl fmt::Debug for OutputValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutputValue")
            .field("value", &self.display_value())
            .field("sensitive", &self.sensitive)
            .field("description", &self.description)
            .finish()
    }
}

impl fmt::Display for OutputValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.display_value() {
            Value::String(s) => f.write_str(s),
            other => write!(f, "{other}"),
        }
    }
}

impl Serialize for OutputValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let fields = if self.description.is_some() { 3 } else { 2 };
        let mut state = serializer.serialize_struct("OutputValue", fields)?;
        state.serialize_field("value", &self.display_value())?;
        state.serialize_field("sensitive", &self.sensitive)?;
        if let Some(description) = &self.description {
            state.serialize_field("description", description)?;
        }
        state.end()
    }
}

/// Exported outputs in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct OutputMap {
    values: IndexMap<String, OutputValue>,
}

impl OutputMap {
    /// Gets an output.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&OutputValue> {
        self.values.get(name)
    }

    /// Returns an output's value, sensitive or not.
    #[must_use]
    pub fn reveal(&self, name: &str) -> Option<&Value> {
        self.get(name).map(OutputValue::reveal)
    }

    /// Returns the number of outputs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if there are no outputs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterates outputs in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &OutputValue)> {
        self.values.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Returns the values as a JSON object, sensitive ones redacted.
    #[must_use]
    pub fn to_json(&self) -> Value {
        Value::Object(
            self.values
                .iter()
                .map(|(name, value)| (name.clone(), value.display_value()))
                .collect(),
        )
    }

    /// Returns every value in full as a JSON object, sensitive ones included.
    #[must_use]
    pub fn to_revealed_json(&self) -> Value {
        Value::Object(
            self.values
                .iter()
                .map(|(name, value)| (name.clone(), value.value.clone()))
                .collect(),
        )
    }
}

impl fmt::Display for OutputMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (name, value)) in self.values.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{name} = {value}")?;
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// OutputExporter
// ─────────────────────────────────────────────────────────────────────────────

/// The output declarations of a stack.
///
/// # Example
///
/// ```
/// use strata_apply::{OutputDeclaration, OutputExporter, ResultSet};
/// use strata_graph::ResourceId;
///
/// let api = ResourceId::new("api", "rest");
/// let exporter = OutputExporter::new()
///     .with_output(OutputDeclaration::reference("api_url", &api, "invoke_url"));
///
/// // Nothing was materialized, so the reference cannot be resolved.
/// assert!(exporter.export(&ResultSet::new()).is_err());
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutputExporter {
    declarations: Vec<OutputDeclaration>,
}

impl OutputExporter {
    /// Creates an exporter with no declarations.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a declaration and returns self for chaining.
    #[must_use]
    pub fn with_output(mut self, declaration: OutputDeclaration) -> Self {
        self.declarations.push(declaration);
        self
    }

    /// Adds a declaration.
    pub fn declare(&mut self, declaration: OutputDeclaration) {
        self.declarations.push(declaration);
    }

    /// Returns the declarations in order.
    #[must_use]
    pub fn declarations(&self) -> &[OutputDeclaration] {
        &self.declarations
    }

    /// Resolves every declaration against `results`.
    ///
    /// # Errors
    ///
    /// See [`export`].
    pub fn export(&self, results: &ResultSet) -> Result<OutputMap, OutputError> {
        export(results, &self.declarations)
    }
}

/// Resolves `declarations` against `results`, in order.
///
/// # Errors
///
/// Stops at the first declaration that fails:
/// - [`OutputError::InvalidOutputName`] for names that are not identifiers
/// - [`OutputError::DuplicateOutput`] for a name seen earlier
/// - [`OutputError::UnresolvedOutput`] when a referenced resource is not in
///   `results`, even if it exists in the graph
/// - [`OutputError::MissingAttribute`] when the resource lacks the attribute
/// - [`OutputError::InvalidNumber`] for a non-finite literal float
pub fn export(
    results: &ResultSet,
    declarations: &[OutputDeclaration],
) -> Result<OutputMap, OutputError> {
    let mut values = IndexMap::with_capacity(declarations.len());

    for declaration in declarations {
        let name = declaration.name();
        if !is_identifier(name) {
            return Err(OutputError::InvalidOutputName {
                output: name.to_string(),
            });
        }
        if values.contains_key(name) {
            return Err(OutputError::DuplicateOutput {
                output: name.to_string(),
            });
        }

        let mut path = AttributePath::root(name);
        let value = resolve::resolve_value(declaration.source(), &mut path, results)
            .map_err(|error| OutputError::from_resolve(name, error))?;

        tracing::debug!(output = name, sensitive = declaration.is_sensitive(), "output exported");
        values.insert(
            name.to_string(),
            OutputValue {
                value,
                sensitive: declaration.is_sensitive(),
                description: declaration.description.clone(),
            },
        );
    }

    Ok(OutputMap { values })
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|first| first.is_ascii_alphabetic() || first == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
