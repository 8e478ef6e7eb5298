//! Dependency edges.
//!
//! Edges point in evaluation order: `from` is materialized before `to`.
//! They are never declared directly; the build step derives them from
//! attribute references and explicit `depends_on` entries.

use core::fmt;

use crate::node::ResourceId;
use crate::value::AttributePath;

/// Why an edge exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EdgeKind {
    /// `to` reads `attribute` of `from` at `path`.
    Reference {
        /// Location of the reference inside the dependent's attributes.
        path: AttributePath,
        /// The attribute read from the dependency.
        attribute: String,
    },
    /// `to` lists `from` in its explicit dependencies.
    Explicit,
}

/// A dependency between two resources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyEdge {
    /// The dependency (evaluated first).
    pub from: ResourceId,
    /// The dependent (evaluated after `from`).
    pub to: ResourceId,
    /// What contributed the edge.
    pub kind: EdgeKind,
}

impl DependencyEdge {
    /// Creates an edge contributed by an attribute reference.
    #[must_use]
    pub fn reference(
        from: ResourceId,
        to: ResourceId,
        path: AttributePath,
        attribute: impl Into<String>,
    ) -> Self {
        Self {
            from,
            to,
            kind: EdgeKind::Reference {
                path,
                attribute: attribute.into(),
            },
        }
    }

    /// Creates an edge contributed by an explicit dependency.
    #[must_use]
    pub fn explicit(from: ResourceId, to: ResourceId) -> Self {
        Self {
            from,
            to,
            kind: EdgeKind::Explicit,
        }
    }

    /// Returns true if the edge came from an attribute reference.
    #[must_use]
    pub fn is_reference(&self) -> bool {
        matches!(self.kind, EdgeKind::Reference { .. })
    }
}

impl fmt::Display for DependencyEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            EdgeKind::Reference { path, attribute } => {
                write!(f, "{} -> {} (via {}.{attribute} at {path})", self.from, self.to, self.from)
            }
            EdgeKind::Explicit => write!(f, "{} -> {} (depends_on)", self.from, self.to),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_edge_display() {
        let bucket = ResourceId::new("storage", "bucket");
        let policy = ResourceId::new("permission", "policy");
        let edge = DependencyEdge::reference(
            bucket,
            policy,
            AttributePath::root("resource"),
            "arn",
        );
        assert!(edge.is_reference());
        assert_eq!(
            edge.to_string(),
            "storage.bucket -> permission.policy (via storage.bucket.arn at resource)"
        );
    }

    #[test]
    fn explicit_edge_display() {
        let table = ResourceId::new("table", "faces");
        let function = ResourceId::new("function", "index");
        let edge = DependencyEdge::explicit(table, function);
        assert!(!edge.is_reference());
        assert_eq!(edge.to_string(), "table.faces -> function.index (depends_on)");
    }
}
