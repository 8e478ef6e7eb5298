//! Resource declarations.
//!
//! A [`ResourceNode`] is one unit of infrastructure: a type such as `storage`
//! or `permission`, a logical name unique per type, and an ordered mapping of
//! attribute names to [`AttributeValue`]s.

use core::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::value::{AttributePath, AttributeReference, AttributeValue, PathSegment};

/// Identity of a resource: `(type, logical name)`.
///
/// Internally uses `Arc<str>` for cheap cloning (reference count bump only).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceId {
    resource_type: Arc<str>,
    name: Arc<str>,
}

impl ResourceId {
    /// Creates a resource identity.
    #[must_use]
    pub fn new(resource_type: impl Into<Arc<str>>, name: impl Into<Arc<str>>) -> Self {
        Self {
            resource_type: resource_type.into(),
            name: name.into(),
        }
    }

    /// Returns the resource type.
    #[must_use]
    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    /// Returns the logical name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Builds a reference to one of this resource's attributes.
    #[must_use]
    pub fn attribute(&self, attribute: impl Into<String>) -> AttributeReference {
        AttributeReference::new(self.clone(), attribute)
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.resource_type, self.name)
    }
}

/// A typed, named resource declaration.
///
/// Attributes keep their declaration order. References inside attribute
/// values are the primary source of ordering; `depends_on` adds explicit
/// edges for dependencies that no attribute expresses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceNode {
    id: ResourceId,
    attributes: IndexMap<String, AttributeValue>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    depends_on: Vec<ResourceId>,
}

impl ResourceNode {
    /// Creates a node with no attributes.
    #[must_use]
    pub fn new(resource_type: impl Into<Arc<str>>, name: impl Into<Arc<str>>) -> Self {
        Self::with_id(ResourceId::new(resource_type, name))
    }

    /// Creates a node for an existing identity.
    #[must_use]
    pub fn with_id(id: ResourceId) -> Self {
        Self {
            id,
            attributes: IndexMap::new(),
            depends_on: Vec::new(),
        }
    }

    /// Adds or replaces an attribute and returns self for chaining.
    #[must_use]
    pub fn with_attribute(
        mut self,
        name: impl Into<String>,
        value: impl Into<AttributeValue>,
    ) -> Self {
        self.set_attribute(name, value);
        self
    }

    /// Adds an explicit dependency and returns self for chaining.
    #[must_use]
    pub fn depends_on(mut self, dependency: ResourceId) -> Self {
        self.add_dependency(dependency);
        self
    }

    /// Adds or replaces an attribute.
    ///
    /// Replacing keeps the attribute's original position.
    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<AttributeValue>) {
        self.attributes.insert(name.into(), value.into());
    }

    /// Adds an explicit dependency. Duplicates are ignored.
    pub fn add_dependency(&mut self, dependency: ResourceId) {
        if !self.depends_on.contains(&dependency) {
            self.depends_on.push(dependency);
        }
    }

    /// Returns the node's identity.
    #[must_use]
    pub fn id(&self) -> &ResourceId {
        &self.id
    }

    /// Returns the resource type.
    #[must_use]
    pub fn resource_type(&self) -> &str {
        self.id.resource_type()
    }

    /// Returns the logical name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.id.name()
    }

    /// Returns the attributes in declaration order.
    #[must_use]
    pub fn attributes(&self) -> &IndexMap<String, AttributeValue> {
        &self.attributes
    }

    /// Gets an attribute by name.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes.get(name)
    }

    /// Returns the explicit dependencies in declaration order.
    #[must_use]
    pub fn explicit_dependencies(&self) -> &[ResourceId] {
        &self.depends_on
    }

    /// Collects every reference in the node's attributes with its location.
    #[must_use]
    pub fn references(&self) -> Vec<(AttributePath, &AttributeReference)> {
        let mut found = Vec::new();
        for (name, value) in &self.attributes {
            let mut path = AttributePath::root(name.clone());
            value.visit_references(&mut path, &mut |path, reference| {
                found.push((path.clone(), reference));
            });
        }
        found
    }

    /// Location used to report an explicit dependency.
    pub(crate) fn dependency_path(index: usize) -> AttributePath {
        let mut path = AttributePath::root("depends_on");
        path.push(PathSegment::Index(index));
        path
    }
}
