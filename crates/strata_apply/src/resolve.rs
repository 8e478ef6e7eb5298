//! Substitution of references with materialized values.
//!
//! Resolution turns an [`AttributeValue`] tree into plain JSON. A
//! `Reference` becomes exactly the referenced value, whatever its shape. An
//! `Interpolation` becomes a string: string values are inserted as-is, other
//! values as their JSON text.

use serde_json::{Number, Value};
use strata_graph::{
    AttributePath, AttributeReference, AttributeValue, Fragment, PathSegment, ResourceId,
    ResourceNode,
};

use crate::error::EvaluationError;
use crate::provisioner::Attributes;
use crate::result::ResultSet;

/// Resolution failure, before it is attributed to a resource or output.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ResolveError {
    Unresolved {
        path: AttributePath,
        target: ResourceId,
    },
    MissingAttribute {
        path: AttributePath,
        reference: AttributeReference,
    },
    InvalidNumber {
        path: AttributePath,
    },
}

impl ResolveError {
    pub(crate) fn for_resource(self, resource: &ResourceId) -> EvaluationError {
        let resource = resource.clone();
        match self {
            Self::Unresolved { path, target } => EvaluationError::UnresolvedReference {
                resource,
                path,
                target,
            },
            Self::MissingAttribute { path, reference } => EvaluationError::MissingAttribute {
                resource,
                path,
                reference,
            },
            Self::InvalidNumber { path } => EvaluationError::InvalidNumber { resource, path },
        }
    }
}

/// Resolves every attribute of a node, keeping declaration order.
pub(crate) fn resolve_attributes(
    node: &ResourceNode,
    results: &ResultSet,
) -> Result<Attributes, ResolveError> {
    node.attributes()
        .iter()
        .map(|(name, value)| {
            let mut path = AttributePath::root(name.clone());
            resolve_value(value, &mut path, results).map(|resolved| (name.clone(), resolved))
        })
        .collect()
}

/// Resolves one value. `path` is the value's location and is restored
/// before returning.
pub(crate) fn resolve_value(
    value: &AttributeValue,
    path: &mut AttributePath,
    results: &ResultSet,
) -> Result<Value, ResolveError> {
    match value {
        AttributeValue::Null => Ok(Value::Null),
        AttributeValue::String(s) => Ok(Value::String(s.clone())),
        AttributeValue::Integer(i) => Ok(Value::from(*i)),
        AttributeValue::Float(f) => Number::from_f64(*f)
            .map(Value::Number)
            .ok_or_else(|| ResolveError::InvalidNumber { path: path.clone() }),
        AttributeValue::Bool(b) => Ok(Value::Bool(*b)),
        AttributeValue::List(items) => {
            let mut resolved = Vec::with_capacity(items.len());
            for (index, item) in items.iter().enumerate() {
                path.push(PathSegment::Index(index));
                let value = resolve_value(item, path, results);
                path.pop();
                resolved.push(value?);
            }
            Ok(Value::Array(resolved))
        }
        AttributeValue::Map(entries) => {
            let mut resolved = serde_json::Map::with_capacity(entries.len());
            for (key, item) in entries {
                path.push(PathSegment::Key(key.clone()));
                let value = resolve_value(item, path, results);
                path.pop();
                resolved.insert(key.clone(), value?);
            }
            Ok(Value::Object(resolved))
        }
        AttributeValue::Reference(reference) => lookup(reference, path, results).cloned(),
        AttributeValue::Interpolation(fragments) => {
            let mut rendered = String::new();
            for (index, fragment) in fragments.iter().enumerate() {
                match fragment {
                    Fragment::Literal(text) => rendered.push_str(text),
                    Fragment::Reference(reference) => {
                        path.push(PathSegment::Index(index));
                        let value = lookup(reference, path, results);
                        path.pop();
                        match value? {
                            Value::String(s) => rendered.push_str(s),
                            other => rendered.push_str(&other.to_string()),
                        }
                    }
                }
            }
            Ok(Value::String(rendered))
        }
    }
}

fn lookup<'r>(
    reference: &AttributeReference,
    path: &AttributePath,
    results: &'r ResultSet,
) -> Result<&'r Value, ResolveError> {
    let resource = results
        .get(reference.target())
        .ok_or_else(|| ResolveError::Unresolved {
            path: path.clone(),
            target: reference.target().clone(),
        })?;
    resource
        .get(reference.attribute())
        .ok_or_else(|| ResolveError::MissingAttribute {
            path: path.clone(),
            reference: reference.clone(),
        })
}
