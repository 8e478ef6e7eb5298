//! Materialized resources.

use indexmap::IndexMap;
use serde_json::Value;
use strata_graph::{AttributeReference, ResourceId};

use crate::provisioner::{Attributes, Outputs};

/// A resource after successful materialization.
///
/// Holds the inputs that were sent to the provisioner and the outputs it
/// returned. Lookups check outputs first, then inputs, so a resource can
/// reference a literal attribute of another resource as well as a
/// provider-computed one.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedResource {
    id: ResourceId,
    inputs: Attributes,
    outputs: Outputs,
    attempts: usize,
}

impl ResolvedResource {
    /// Creates a resolved resource.
    #[must_use]
    pub fn new(id: ResourceId, inputs: Attributes, outputs: Outputs, attempts: usize) -> Self {
        Self {
            id,
            inputs,
            outputs,
            attempts,
        }
    }

    /// Returns the identity.
    #[must_use]
    pub fn id(&self) -> &ResourceId {
        &self.id
    }

    /// Returns the resolved input attributes.
    #[must_use]
    pub fn inputs(&self) -> &Attributes {
        &self.inputs
    }

    /// Returns the provisioner's outputs.
    #[must_use]
    pub fn outputs(&self) -> &Outputs {
        &self.outputs
    }

    /// Returns how many provisioner calls it took, retries included.
    #[must_use]
    pub fn attempts(&self) -> usize {
        self.attempts
    }

    /// Gets an attribute, preferring outputs over inputs.
    #[must_use]
    pub fn get(&self, attribute: &str) -> Option<&Value> {
        self.outputs
            .get(attribute)
            .or_else(|| self.inputs.get(attribute))
    }
}

/// Resources materialized by one evaluation, in materialization order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    resources: IndexMap<ResourceId, ResolvedResource>,
}

impl ResultSet {
    /// Creates an empty result set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a materialized resource.
    ///
    /// Recording the same identity twice replaces the earlier entry in place.
    pub fn insert(&mut self, resource: ResolvedResource) {
        self.resources.insert(resource.id.clone(), resource);
    }

    /// Gets a resource by identity.
    #[must_use]
    pub fn get(&self, id: &ResourceId) -> Option<&ResolvedResource> {
        self.resources.get(id)
    }

    /// Returns true if the resource was materialized.
    #[must_use]
    pub fn contains(&self, id: &ResourceId) -> bool {
        self.resources.contains_key(id)
    }

    /// Looks up the value a reference points at.
    #[must_use]
    pub fn lookup(&self, reference: &AttributeReference) -> Option<&Value> {
        self.get(reference.target())
            .and_then(|resource| resource.get(reference.attribute()))
    }

    /// Returns the number of materialized resources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Returns true if nothing was materialized.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Iterates resources in materialization order.
    pub fn iter(&self) -> impl Iterator<Item = &ResolvedResource> {
        self.resources.values()
    }

    /// Returns identities in materialization order.
    #[must_use]
    pub fn ids(&self) -> Vec<&ResourceId> {
        self.resources.keys().collect()
    }
}

impl<'a> IntoIterator for &'a ResultSet {
    type Item = &'a ResolvedResource;
    type IntoIter = indexmap::map::Values<'a, ResourceId, ResolvedResource>;

    fn into_iter(self) -> Self::IntoIter {
        self.resources.values()
    }
}
