//! Dry-run plans.

use core::fmt;

use serde::Serialize;
use strata_graph::{BuiltGraph, ResourceId};

/// One resource the evaluator would materialize.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedAction {
    /// One-based step number.
    pub step: usize,
    /// The resource.
    pub resource: ResourceId,
    /// Direct dependencies, all planned at earlier steps.
    pub after: Vec<ResourceId>,
    /// Number of references that will be substituted at evaluation time.
    pub references: usize,
}

/// The ordered list of actions an evaluation would take.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Plan {
    actions: Vec<PlannedAction>,
}

impl Plan {
    /// Derives the plan for a built graph without materializing anything.
    #[must_use]
    pub fn for_graph(graph: &BuiltGraph) -> Self {
        let actions = graph
            .ordered_nodes()
            .enumerate()
            .map(|(index, node)| PlannedAction {
                step: index + 1,
                resource: node.id().clone(),
                after: graph
                    .dependencies_of(node.id())
                    .into_iter()
                    .cloned()
                    .collect(),
                references: node.references().len(),
            })
            .collect();
        Self { actions }
    }

    /// Returns the actions in evaluation order.
    #[must_use]
    pub fn actions(&self) -> &[PlannedAction] {
        &self.actions
    }

    /// Returns the number of actions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Returns true if there is nothing to do.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for action in &self.actions {
            write!(f, "{:>3}. + {}", action.step, action.resource)?;
            if !action.after.is_empty() {
                let after: Vec<String> = action.after.iter().map(ToString::to_string).collect();
                write!(f, " (after {})", after.join(", "))?;
            }
            writeln!(f)?;
        }
        write!(f, "Plan: {} to add.", self.actions.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_graph::{AttributeValue, ResourceGraph, ResourceNode};

    #[test]
    fn plan_lists_steps_with_dependencies() {
        let bucket = ResourceNode::new("storage", "bucket");
        let policy = ResourceNode::new("permission", "policy")
            .with_attribute("resource", AttributeValue::reference(bucket.id(), "arn"));
        let mut graph = ResourceGraph::new();
        graph.add_node(policy).unwrap().add_node(bucket).unwrap();

        let plan = Plan::for_graph(&graph.build().unwrap());
        assert_eq!(plan.len(), 2);
        assert_eq!(plan.actions()[1].references, 1);
        assert_eq!(
            plan.to_string(),
            "  1. + storage.bucket\n  2. + permission.policy (after storage.bucket)\nPlan: 2 to add."
        );
    }
}
