//! Attribute values, references and paths.
//!
//! Declarative sources are loosely typed; here every attribute value is one
//! variant of the closed [`AttributeValue`] enum. References and
//! interpolations are the only variants that depend on other resources, and
//! they are what the graph build step scans to derive edges.

use core::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::node::ResourceId;

// ─────────────────────────────────────────────────────────────────────────────
// AttributeReference
// ─────────────────────────────────────────────────────────────────────────────

/// Pointer to an output attribute of another resource.
///
/// A reference is resolved lazily, only after its target has been
/// materialized. The target must be declared in the same graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttributeReference {
    target: ResourceId,
    attribute: String,
}

impl AttributeReference {
    /// Creates a reference to `target`'s `attribute`.
    #[must_use]
    pub fn new(target: ResourceId, attribute: impl Into<String>) -> Self {
        Self {
            target,
            attribute: attribute.into(),
        }
    }

    /// Returns the referenced resource.
    #[must_use]
    pub fn target(&self) -> &ResourceId {
        &self.target
    }

    /// Returns the referenced attribute name.
    #[must_use]
    pub fn attribute(&self) -> &str {
        &self.attribute
    }
}

impl fmt::Display for AttributeReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.target, self.attribute)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// AttributePath
// ─────────────────────────────────────────────────────────────────────────────

/// One step of an [`AttributePath`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    /// A named attribute or map key.
    Key(String),
    /// A list element or interpolation fragment index.
    Index(usize),
}

/// Location of a value inside a resource's attributes.
///
/// Rendered as `statement[0].resource`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct AttributePath {
    segments: Vec<PathSegment>,
}

impl AttributePath {
    /// Creates a path starting at a top-level attribute.
    #[must_use]
    pub fn root(attribute: impl Into<String>) -> Self {
        Self {
            segments: vec![PathSegment::Key(attribute.into())],
        }
    }

    /// Appends a segment.
    pub fn push(&mut self, segment: PathSegment) {
        self.segments.push(segment);
    }

    /// Removes the last segment.
    pub fn pop(&mut self) -> Option<PathSegment> {
        self.segments.pop()
    }

    /// Returns the segments.
    #[must_use]
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Returns true if the path has no segments.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

impl fmt::Display for AttributePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                PathSegment::Key(key) if i == 0 => write!(f, "{key}")?,
                PathSegment::Key(key) => write!(f, ".{key}")?,
                PathSegment::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// AttributeValue
// ─────────────────────────────────────────────────────────────────────────────

/// A piece of an interpolated string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Fragment {
    /// Text copied verbatim.
    Literal(String),
    /// A reference whose resolved value is rendered into the string.
    Reference(AttributeReference),
}

impl From<&str> for Fragment {
    fn from(text: &str) -> Self {
        Fragment::Literal(text.to_string())
    }
}

impl From<AttributeReference> for Fragment {
    fn from(reference: AttributeReference) -> Self {
        Fragment::Reference(reference)
    }
}

/// Value of a resource attribute.
///
/// Literals resolve to themselves. A [`Reference`](AttributeValue::Reference)
/// resolves to exactly the referenced output value. An
/// [`Interpolation`](AttributeValue::Interpolation) resolves to a string with
/// every referenced value rendered in place.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum AttributeValue {
    /// Absent value.
    #[default]
    Null,
    /// UTF-8 string.
    String(String),
    /// Signed integer.
    Integer(i64),
    /// Floating point number. Must be finite to be materialized.
    Float(f64),
    /// Boolean.
    Bool(bool),
    /// Ordered list.
    List(Vec<AttributeValue>),
    /// Ordered mapping.
    Map(IndexMap<String, AttributeValue>),
    /// Another resource's output attribute.
    Reference(AttributeReference),
    /// String template mixing literal text and references.
    Interpolation(Vec<Fragment>),
}

impl AttributeValue {
    /// Creates a reference to `target`'s `attribute`.
    #[must_use]
    pub fn reference(target: &ResourceId, attribute: impl Into<String>) -> Self {
        AttributeValue::Reference(target.attribute(attribute))
    }

    /// Creates a list.
    #[must_use]
    pub fn list<I, V>(items: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<AttributeValue>,
    {
        AttributeValue::List(items.into_iter().map(Into::into).collect())
    }

    /// Creates a map, keeping entry order.
    #[must_use]
    pub fn map<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<AttributeValue>,
    {
        AttributeValue::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Creates an interpolated string.
    ///
    /// ```
    /// use strata_graph::{AttributeValue, Fragment, ResourceId};
    ///
    /// let bucket = ResourceId::new("storage", "bucket");
    /// let objects = AttributeValue::interpolate([
    ///     Fragment::Reference(bucket.attribute("arn")),
    ///     Fragment::from("/*"),
    /// ]);
    /// assert!(objects.has_references());
    /// ```
    #[must_use]
    pub fn interpolate<I, F>(fragments: I) -> Self
    where
        I: IntoIterator<Item = F>,
        F: Into<Fragment>,
    {
        AttributeValue::Interpolation(fragments.into_iter().map(Into::into).collect())
    }

    /// Converts a JSON document into a literal value.
    ///
    /// JSON numbers become [`Integer`](AttributeValue::Integer) when they fit
    /// an `i64`, otherwise [`Float`](AttributeValue::Float). Unsigned
    /// integers above `i64::MAX` therefore lose precision; pass them as
    /// strings when the exact digits matter.
    #[must_use]
    pub fn from_json(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => AttributeValue::Null,
            serde_json::Value::Bool(b) => AttributeValue::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => AttributeValue::Integer(i),
                None => AttributeValue::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => AttributeValue::String(s),
            serde_json::Value::Array(items) => {
                AttributeValue::List(items.into_iter().map(AttributeValue::from_json).collect())
            }
            serde_json::Value::Object(entries) => AttributeValue::Map(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, AttributeValue::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Returns true if the value contains a reference anywhere.
    #[must_use]
    pub fn has_references(&self) -> bool {
        let mut found = false;
        self.visit_references(&mut AttributePath::default(), &mut |_, _| found = true);
        found
    }

    /// Calls `visitor` for every reference inside the value, depth first.
    ///
    /// `path` is the location of `self`; it is extended while descending and
    /// restored before returning.
    pub fn visit_references<'a>(
        &'a self,
        path: &mut AttributePath,
        visitor: &mut dyn FnMut(&AttributePath, &'a AttributeReference),
    ) {
        match self {
            AttributeValue::Reference(reference) => visitor(path, reference),
            AttributeValue::Interpolation(fragments) => {
                for (index, fragment) in fragments.iter().enumerate() {
                    if let Fragment::Reference(reference) = fragment {
                        path.push(PathSegment::Index(index));
                        visitor(path, reference);
                        path.pop();
                    }
                }
            }
            AttributeValue::List(items) => {
                for (index, item) in items.iter().enumerate() {
                    path.push(PathSegment::Index(index));
                    item.visit_references(path, visitor);
                    path.pop();
                }
            }
            AttributeValue::Map(entries) => {
                for (key, item) in entries {
                    path.push(PathSegment::Key(key.clone()));
                    item.visit_references(path, visitor);
                    path.pop();
                }
            }
            AttributeValue::Null
            | AttributeValue::String(_)
            | AttributeValue::Integer(_)
            | AttributeValue::Float(_)
            | AttributeValue::Bool(_) => {}
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::String(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::String(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        AttributeValue::Integer(value)
    }
}

impl From<i32> for AttributeValue {
    fn from(value: i32) -> Self {
        AttributeValue::Integer(i64::from(value))
    }
}

impl From<u32> for AttributeValue {
    fn from(value: u32) -> Self {
        AttributeValue::Integer(i64::from(value))
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        AttributeValue::Float(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        AttributeValue::Bool(value)
    }
}

impl From<AttributeReference> for AttributeValue {
    fn from(reference: AttributeReference) -> Self {
        AttributeValue::Reference(reference)
    }
}

impl From<Vec<AttributeValue>> for AttributeValue {
    fn from(items: Vec<AttributeValue>) -> Self {
        AttributeValue::List(items)
    }
}

impl From<IndexMap<String, AttributeValue>> for AttributeValue {
    fn from(entries: IndexMap<String, AttributeValue>) -> Self {
        AttributeValue::Map(entries)
    }
}

impl From<serde_json::Value> for AttributeValue {
    fn from(value: serde_json::Value) -> Self {
        AttributeValue::from_json(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn path_display() {
        let mut path = AttributePath::root("statement");
        path.push(PathSegment::Index(0));
        path.push(PathSegment::Key("resource".to_string()));
        assert_eq!(path.to_string(), "statement[0].resource");
        path.pop();
        assert_eq!(path.to_string(), "statement[0]");
    }

    #[test]
    fn reference_display() {
        let bucket = ResourceId::new("storage", "bucket");
        assert_eq!(bucket.attribute("arn").to_string(), "storage.bucket.arn");
    }

    #[test]
    fn literals_have_no_references() {
        let value = AttributeValue::map([
            ("name", AttributeValue::from("faces")),
            ("count", AttributeValue::from(3)),
            ("tags", AttributeValue::list(["a", "b"])),
        ]);
        assert!(!value.has_references());
    }

    #[test]
    fn interpolation_references_are_indexed_by_fragment() {
        let bucket = ResourceId::new("storage", "bucket");
        let value = AttributeValue::interpolate([
            Fragment::from("prefix:"),
            Fragment::Reference(bucket.attribute("arn")),
        ]);

        let mut seen = Vec::new();
        value.visit_references(&mut AttributePath::root("resource"), &mut |path, r| {
            seen.push((path.to_string(), r.to_string()));
        });
        assert_eq!(
            seen,
            vec![("resource[1]".to_string(), "storage.bucket.arn".to_string())]
        );
    }

    #[test]
    fn from_json_keeps_shape_and_order() {
        let value = AttributeValue::from_json(json!({
            "Version": "2012-10-17",
            "Statement": [{ "Effect": "Allow", "Action": ["s3:GetObject"] }],
            "Limit": 10,
            "Ratio": 0.5,
        }));
        let AttributeValue::Map(entries) = value else {
            panic!("expected a map");
        };
        let keys: Vec<&str> = entries.keys().map(String::as_str).collect();
        assert_eq!(keys, ["Version", "Statement", "Limit", "Ratio"]);
        assert_eq!(entries["Limit"], AttributeValue::Integer(10));
        assert_eq!(entries["Ratio"], AttributeValue::Float(0.5));
    }

    #[test]
    fn from_json_widens_large_unsigned_to_float() {
        assert_eq!(
            AttributeValue::from_json(json!(i64::MAX)),
            AttributeValue::Integer(i64::MAX)
        );
        assert_eq!(
            AttributeValue::from_json(json!(u64::MAX)),
            AttributeValue::Float(u64::MAX as f64)
        );
    }

    #[test]
    fn serde_round_trip_of_reference() {
        let bucket = ResourceId::new("storage", "bucket");
        let value = AttributeValue::reference(&bucket, "arn");
        let text = serde_json::to_string(&value).unwrap();
        let back: AttributeValue = serde_json::from_str(&text).unwrap();
        assert_eq!(back, value);
    }
}
