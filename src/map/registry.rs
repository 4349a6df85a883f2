//! Owns the live map instances, keyed by container identifier.

use std::collections::HashMap;
use std::sync::Mutex;

use tracing::debug;

use super::instance::MapInstance;

/// Keyed store of live [`MapInstance`]s. At most one instance is alive per
/// container at any time; a redraw destroys and replaces, never patches.
#[derive(Debug, Default)]
pub struct MapRegistry {
    maps: Mutex<HashMap<String, MapInstance>>,
}

impl MapRegistry {
    pub fn new() -> MapRegistry {
        MapRegistry::default()
    }

    /// Removes the instance for `container`, markers and layers included.
    pub fn destroy(&self, container: &str) -> bool {
        let removed = self.maps.lock().unwrap().remove(container).is_some();
        if removed {
            debug!("destroyed map instance for {container}");
        }
        removed
    }

    /// Installs `instance`, replacing whatever was live for `container`.
    pub fn insert(&self, container: &str, instance: MapInstance) {
        self.maps
            .lock()
            .unwrap()
            .insert(container.to_string(), instance);
    }

    /// Runs `f` against the live instance, if there is one.
    pub fn with_map<T>(
        &self,
        container: &str,
        f: impl FnOnce(&mut MapInstance) -> T,
    ) -> Option<T> {
        self.maps.lock().unwrap().get_mut(container).map(f)
    }

    /// A point-in-time copy, for export and inspection.
    pub fn snapshot(&self, container: &str) -> Option<MapInstance> {
        self.maps.lock().unwrap().get(container).cloned()
    }

    pub fn contains(&self, container: &str) -> bool {
        self.maps.lock().unwrap().contains_key(container)
    }

    pub fn len(&self) -> usize {
        self.maps.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
