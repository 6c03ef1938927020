//! Element handles issued by a session.

use dashmap::DashMap;

use crate::ids::ElementId;
use crate::session::ElementQuery;

/// Maps issued [`ElementId`]s to driver handles. Each query keeps only its
/// latest handle, so repeating a query does not grow the registry.
pub struct ElementRegistry<E> {
    elements: DashMap<ElementId, E>,
    latest: DashMap<String, ElementId>,
}

impl<E: Clone> ElementRegistry<E> {
    pub fn new() -> Self {
        Self {
            elements: DashMap::new(),
            latest: DashMap::new(),
        }
    }

    pub fn register(&self, query: &ElementQuery, element: E) -> ElementId {
        let id = ElementId::new();
        self.elements.insert(id, element);
        if let Some(previous) = self.latest.insert(query.to_string(), id) {
            self.elements.remove(&previous);
        }
        id
    }

    pub fn get(&self, id: &ElementId) -> Option<E> {
        self.elements.get(id).map(|entry| entry.value().clone())
    }

    pub fn clear(&self) {
        self.latest.clear();
        self.elements.clear();
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

impl<E: Clone> Default for ElementRegistry<E> {
    fn default() -> Self {
        Self::new()
    }
}
