//! Graph structure, build step and ordering.
//!
//! A [`ResourceGraph`] collects declarations. [`ResourceGraph::build`]
//! consumes it, derives the dependency edges, rejects unknown references and
//! cycles, and returns a read-only [`BuiltGraph`] carrying a deterministic
//! topological order.

use core::cmp::Reverse;
use std::collections::BinaryHeap;

use hashbrown::HashMap;

use crate::edge::DependencyEdge;
use crate::node::{ResourceId, ResourceNode};
use crate::value::AttributePath;

// ─────────────────────────────────────────────────────────────────────────────
// BuildError
// ─────────────────────────────────────────────────────────────────────────────

/// Errors detected while assembling a graph.
///
/// All of them are raised before anything is materialized, so no partial
/// state can exist when one is returned.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BuildError {
    /// Two declarations share the same `(type, name)`.
    #[error("resource {id} is declared more than once")]
    DuplicateIdentity {
        /// The repeated identity.
        id: ResourceId,
    },
    /// A reference or explicit dependency names an undeclared resource.
    #[error("{resource} references unknown resource {target} at {path}")]
    UnknownReference {
        /// The declaring resource.
        resource: ResourceId,
        /// Location of the reference inside `resource`.
        path: AttributePath,
        /// The missing target.
        target: ResourceId,
    },
    /// The dependency graph contains a cycle.
    #[error("cyclic dependency through {resource}: {}", render_cycle(.cycle))]
    CyclicDependency {
        /// The first resource revisited while still on the traversal stack.
        resource: ResourceId,
        /// The cycle, each entry depending on the next; starts and ends with `resource`.
        cycle: Vec<ResourceId>,
    },
}

fn render_cycle(cycle: &[ResourceId]) -> String {
    cycle
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" -> ")
}

// ─────────────────────────────────────────────────────────────────────────────
// ResourceGraph
// ─────────────────────────────────────────────────────────────────────────────

/// A mutable collection of resource declarations.
///
/// The graph owns its nodes exclusively. Declaration order is remembered and
/// used to break ties in the evaluation order.
///
/// # Example
///
/// ```
/// use strata_graph::{AttributeValue, ResourceGraph, ResourceNode};
///
/// let bucket = ResourceNode::new("storage", "bucket");
/// let bucket_id = bucket.id().clone();
///
/// let mut graph = ResourceGraph::new();
/// graph
///     .add_node(bucket)?
///     .add_node(
///         ResourceNode::new("permission", "policy")
///             .with_attribute("resource", AttributeValue::reference(&bucket_id, "arn")),
///     )?;
///
/// let built = graph.build()?;
/// assert_eq!(built.edges().len(), 1);
/// # Ok::<(), strata_graph::BuildError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct ResourceGraph {
    /// Nodes in declaration order.
    nodes: Vec<ResourceNode>,
    /// Identity to declaration index.
    index: HashMap<ResourceId, usize>,
}

impl ResourceGraph {
    /// Creates an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a declaration.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::DuplicateIdentity`] if a node with the same
    /// `(type, name)` is already present. The graph is left unchanged.
    pub fn add_node(&mut self, node: ResourceNode) -> Result<&mut Self, BuildError> {
        if self.index.contains_key(node.id()) {
            return Err(BuildError::DuplicateIdentity {
                id: node.id().clone(),
            });
        }
        self.index.insert(node.id().clone(), self.nodes.len());
        self.nodes.push(node);
        Ok(self)
    }

    /// Returns all nodes in declaration order.
    #[must_use]
    pub fn nodes(&self) -> &[ResourceNode] {
        &self.nodes
    }

    /// Gets a node by identity.
    #[must_use]
    pub fn node(&self, id: &ResourceId) -> Option<&ResourceNode> {
        self.index.get(id).map(|&position| &self.nodes[position])
    }

    /// Returns true if a node with this identity is declared.
    #[must_use]
    pub fn contains(&self, id: &ResourceId) -> bool {
        self.index.contains_key(id)
    }

    /// Returns the number of nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if the graph has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Derives edges, validates the graph and fixes the evaluation order.
    ///
    /// Edges come from two contributors: attribute references (scanned
    /// recursively through lists, maps and interpolations) and explicit
    /// `depends_on` entries.
    ///
    /// # Errors
    ///
    /// - [`BuildError::UnknownReference`] for the first reference, in
    ///   declaration order, whose target is not declared
    /// - [`BuildError::CyclicDependency`] if the derived graph has a cycle
    pub fn build(self) -> Result<BuiltGraph, BuildError> {
        let count = self.nodes.len();
        let mut edges = Vec::new();
        let mut dependencies: Vec<Vec<usize>> = vec![Vec::new(); count];

        for (position, node) in self.nodes.iter().enumerate() {
            for (path, reference) in node.references() {
                let Some(&target) = self.index.get(reference.target()) else {
                    return Err(BuildError::UnknownReference {
                        resource: node.id().clone(),
                        path,
                        target: reference.target().clone(),
                    });
                };
                edges.push(DependencyEdge::reference(
                    reference.target().clone(),
                    node.id().clone(),
                    path,
                    reference.attribute(),
                ));
                dependencies[position].push(target);
            }

            for (i, dependency) in node.explicit_dependencies().iter().enumerate() {
                let Some(&target) = self.index.get(dependency) else {
                    return Err(BuildError::UnknownReference {
                        resource: node.id().clone(),
                        path: ResourceNode::dependency_path(i),
                        target: dependency.clone(),
                    });
                };
                edges.push(DependencyEdge::explicit(
                    dependency.clone(),
                    node.id().clone(),
                ));
                dependencies[position].push(target);
            }
        }

        for deps in &mut dependencies {
            deps.sort_unstable();
            deps.dedup();
        }

        detect_cycle(&self.nodes, &dependencies)?;

        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); count];
        for (position, deps) in dependencies.iter().enumerate() {
            for &dependency in deps {
                dependents[dependency].push(position);
            }
        }

        let order = topological_sort(&dependencies, &dependents);
        let order_ids = order
            .iter()
            .map(|&position| self.nodes[position].id().clone())
            .collect();

        Ok(BuiltGraph {
            nodes: self.nodes,
            index: self.index,
            edges,
            dependencies,
            dependents,
            order,
            order_ids,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    OnStack,
    Done,
}

/// Depth-first search with a recursion-stack marker.
///
/// Walks from each node towards its dependencies. The first dependency found
/// still on the stack closes a cycle.
fn detect_cycle(nodes: &[ResourceNode], dependencies: &[Vec<usize>]) -> Result<(), BuildError> {
    let mut marks = vec![Mark::Unvisited; nodes.len()];
    // (node, index of the next dependency to visit)
    let mut stack: Vec<(usize, usize)> = Vec::new();

    for root in 0..nodes.len() {
        if marks[root] != Mark::Unvisited {
            continue;
        }
        marks[root] = Mark::OnStack;
        stack.push((root, 0));

        while let Some(frame) = stack.last_mut() {
            let (current, cursor) = *frame;
            let Some(&dependency) = dependencies[current].get(cursor) else {
                marks[current] = Mark::Done;
                stack.pop();
                continue;
            };
            frame.1 += 1;

            match marks[dependency] {
                Mark::Unvisited => {
                    marks[dependency] = Mark::OnStack;
                    stack.push((dependency, 0));
                }
                Mark::OnStack => {
                    let start = stack
                        .iter()
                        .position(|&(position, _)| position == dependency)
                        .unwrap_or(0);
                    let mut cycle: Vec<ResourceId> = stack[start..]
                        .iter()
                        .map(|&(position, _)| nodes[position].id().clone())
                        .collect();
                    cycle.push(nodes[dependency].id().clone());
                    return Err(BuildError::CyclicDependency {
                        resource: nodes[dependency].id().clone(),
                        cycle,
                    });
                }
                Mark::Done => {}
            }
        }
    }

    Ok(())
}

/// Kahn's algorithm; among ready nodes the earliest declared goes first.
fn topological_sort(dependencies: &[Vec<usize>], dependents: &[Vec<usize>]) -> Vec<usize> {
    let mut remaining: Vec<usize> = dependencies.iter().map(Vec::len).collect();
    let mut ready: BinaryHeap<Reverse<usize>> = remaining
        .iter()
        .enumerate()
        .filter(|&(_, &count)| count == 0)
        .map(|(position, _)| Reverse(position))
        .collect();

    let mut order = Vec::with_capacity(dependencies.len());
    while let Some(Reverse(position)) = ready.pop() {
        order.push(position);
        for &dependent in &dependents[position] {
            remaining[dependent] -= 1;
            if remaining[dependent] == 0 {
                ready.push(Reverse(dependent));
            }
        }
    }
    order
}

// ─────────────────────────────────────────────────────────────────────────────
// BuiltGraph
// ─────────────────────────────────────────────────────────────────────────────

/// A validated, acyclic, read-only resource graph.
///
/// Produced by [`ResourceGraph::build`]; consumed by evaluators as input.
#[derive(Debug, Clone)]
pub struct BuiltGraph {
    nodes: Vec<ResourceNode>,
    index: HashMap<ResourceId, usize>,
    edges: Vec<DependencyEdge>,
    /// Unique dependency positions per node, ascending.
    dependencies: Vec<Vec<usize>>,
    /// Unique dependent positions per node, ascending.
    dependents: Vec<Vec<usize>>,
    /// Evaluation order as declaration positions.
    order: Vec<usize>,
    order_ids: Vec<ResourceId>,
}

impl BuiltGraph {
    /// Returns all nodes in declaration order.
    #[must_use]
    pub fn nodes(&self) -> &[ResourceNode] {
        &self.nodes
    }

    /// Gets a node by identity.
    #[must_use]
    pub fn node(&self, id: &ResourceId) -> Option<&ResourceNode> {
        self.index.get(id).map(|&position| &self.nodes[position])
    }

    /// Returns true if a node with this identity is declared.
    #[must_use]
    pub fn contains(&self, id: &ResourceId) -> bool {
        self.index.contains_key(id)
    }

    /// Returns the number of nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if the graph has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns every derived edge, in the order it was discovered.
    #[must_use]
    pub fn edges(&self) -> &[DependencyEdge] {
        &self.edges
    }

    /// Returns the evaluation order.
    ///
    /// Every resource appears strictly after all resources it depends on.
    /// Among resources whose dependencies are all satisfied, the one declared
    /// first comes first.
    #[must_use]
    pub fn topological_order(&self) -> &[ResourceId] {
        &self.order_ids
    }

    /// Iterates nodes in evaluation order.
    pub fn ordered_nodes(&self) -> impl Iterator<Item = &ResourceNode> {
        self.order.iter().map(|&position| &self.nodes[position])
    }

    /// Returns the direct dependencies of a resource, in declaration order.
    ///
    /// Returns an empty list for unknown identities.
    #[must_use]
    pub fn dependencies_of(&self, id: &ResourceId) -> Vec<&ResourceId> {
        self.neighbours(id, &self.dependencies)
    }

    /// Returns the direct dependents of a resource, in declaration order.
    ///
    /// Returns an empty list for unknown identities.
    #[must_use]
    pub fn dependents_of(&self, id: &ResourceId) -> Vec<&ResourceId> {
        self.neighbours(id, &self.dependents)
    }

    fn neighbours<'a>(&'a self, id: &ResourceId, adjacency: &'a [Vec<usize>]) -> Vec<&'a ResourceId> {
        self.index
            .get(id)
            .map(|&position| {
                adjacency[position]
                    .iter()
                    .map(|&other| self.nodes[other].id())
                    .collect()
            })
            .unwrap_or_default()
    }
}
