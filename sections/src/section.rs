use serde::{Deserialize, Serialize};

use crate::component::{ComponentType, ContentComponent};

/// A titled, ordered collection of content components.
/// Component order is display order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Section {
    pub id: String,
    pub title: String,
    pub components: Vec<ContentComponent>,
}

impl Section {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Section {
            id: id.into(),
            title: title.into(),
            components: Vec::new(),
        }
    }

    pub fn with_component(mut self, component: ContentComponent) -> Self {
        self.components.push(component);
        self
    }

    pub fn push(&mut self, component: ContentComponent) {
        self.components.push(component);
    }

    /// First component with the given id.
    pub fn component(&self, id: &str) -> Option<&ContentComponent> {
        self.components.iter().find(|c| c.id == id)
    }

    pub fn components_of(&self, kind: ComponentType) -> impl Iterator<Item = &ContentComponent> + '_ {
        self.components.iter().filter(move |c| c.component_type() == kind)
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}
