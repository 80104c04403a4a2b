//! Lock-guarded `id -> object` map.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::provider::Object;

/// Thread-safe cache of built objects keyed by id.
///
/// Backs the container's shared cache, the parameter cache and every
/// contextual bag.
#[derive(Default)]
pub(crate) struct SafeMap {
    entries: RwLock<HashMap<String, Object>>,
}

impl SafeMap {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn get(&self, id: &str) -> Option<Object> {
        self.entries.read().get(id).cloned()
    }

    pub(crate) fn set(&self, id: &str, value: Object) {
        self.entries.write().insert(id.to_string(), value);
    }

    pub(crate) fn delete(&self, id: &str) {
        self.entries.write().remove(id);
    }

    pub(crate) fn clear(&self) {
        self.entries.write().clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.read().len()
    }
}
