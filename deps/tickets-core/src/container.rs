use std::sync::Arc;

use crate::{Components, event::ComponentEventDispatcher, Component};

/// # The component container
///
/// Stores the components before handing them over to the client.
#[derive(Clone, Default)]
pub struct ComponentContainer(Components);

impl ComponentContainer {
    pub fn new() -> ComponentContainer {
        ComponentContainer(Vec::new())
    }
    /// Create a [`ComponentEventDispatcher`] from the components in the container.
    /// Components added afterward are not part of the dispatcher.
    pub fn get_event_dispatcher(&self) -> ComponentEventDispatcher {
        ComponentEventDispatcher::new(self.0.clone())
    }
    /// Add a component to the container.
    /// The component is wrapped in an [`Arc`] and a handle to it is returned.
    pub fn add_component<T: 'static + Component>(&mut self, comp: T) -> Arc<T> {
        let arc = Arc::new(comp);
        self.add_shared(Arc::clone(&arc));
        arc
    }
    /// Add a component that is already shared with another owner (a background task for example).
    pub fn add_shared<T: 'static + Component>(&mut self, comp: Arc<T>) {
        self.0.push(comp);
    }
    pub fn len(&self) -> usize {
        self.0.len()
    }
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
impl AsRef<Components> for ComponentContainer {
    fn as_ref(&self) -> &Components {
        &self.0
    }
}
