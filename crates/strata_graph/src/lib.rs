//! Resource graph primitives for Strata (Layer 1).
//!
//! `strata_graph` models a stack of infrastructure as typed declarations
//! whose attributes may point at other declarations' outputs. Building the
//! graph derives dependency edges from those pointers, rejects unknown
//! targets and cycles, and fixes a deterministic evaluation order.
//!
//! # Core Concepts
//!
//! - [`AttributeValue`] - Closed set of literal, composite and reference values
//! - [`AttributeReference`] - Pointer to another resource's output attribute
//! - [`ResourceNode`] - A typed, named declaration with ordered attributes
//! - [`ResourceGraph`] - Mutable set of declarations
//! - [`BuiltGraph`] - Validated, read-only graph with a topological order
//!
//! # Example
//!
//! ```
//! use strata_graph::{AttributeValue, ResourceGraph, ResourceNode};
//!
//! let bucket = ResourceNode::new("storage", "bucket").with_attribute("versioned", true);
//! let policy = ResourceNode::new("permission", "policy")
//!     .with_attribute("resource", AttributeValue::reference(bucket.id(), "arn"));
//!
//! let mut graph = ResourceGraph::new();
//! graph.add_node(bucket)?;
//! graph.add_node(policy)?;
//!
//! let built = graph.build()?;
//! let order: Vec<String> = built.topological_order().iter().map(ToString::to_string).collect();
//! assert_eq!(order, ["storage.bucket", "permission.policy"]);
//! # Ok::<(), strata_graph::BuildError>(())
//! ```

/// Dependency edges between resources.
pub mod edge;

/// Graph structure, build step and ordering.
pub mod graph;

/// Resource declarations and identities.
pub mod node;

/// Attribute values, references and paths.
pub mod value;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use crate::edge::{DependencyEdge, EdgeKind};
    pub use crate::graph::{BuildError, BuiltGraph, ResourceGraph};
    pub use crate::node::{ResourceId, ResourceNode};
    pub use crate::value::{AttributePath, AttributeReference, AttributeValue, Fragment, PathSegment};
}

pub use edge::{DependencyEdge, EdgeKind};
pub use graph::{BuildError, BuiltGraph, ResourceGraph};
pub use node::{ResourceId, ResourceNode};
pub use value::{AttributePath, AttributeReference, AttributeValue, Fragment, PathSegment};
