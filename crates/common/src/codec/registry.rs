use std::{collections::HashMap, sync::Arc};

use parking_lot::RwLock;
use tracing::debug;

use super::{bincode::Bincode, json::Json, Codec};

/// Codecs by content subtype.
#[derive(Default)]
pub struct Registry {
    codecs: RwLock<HashMap<String, Arc<dyn Codec>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the [`Bincode`] and [`Json`] fallbacks.
    pub fn with_defaults() -> Self {
        let registry = Self::new();
        registry.register(Arc::new(Bincode));
        registry.register(Arc::new(Json));
        registry
    }

    /// Registers `codec` under its own name, returning the codec it replaced.
    pub fn register(&self, codec: Arc<dyn Codec>) -> Option<Arc<dyn Codec>> {
        let name = codec.name().to_owned();
        let prev = self.codecs.write().insert(name.clone(), codec);
        debug!(name = name.as_str(), replaced = prev.is_some(), "codec registered");
        prev
    }

    /// Builds a codec around the one registered under `name` and registers it
    /// under that same `name` in a single step, whatever the new codec calls
    /// itself. Returns the wrapped codec, or `None` (registering nothing) when
    /// `name` is unknown. `f` runs under the registry's write lock.
    pub fn wrap<F>(&self, name: &str, f: F) -> Option<Arc<dyn Codec>>
    where
        F: FnOnce(Arc<dyn Codec>) -> Arc<dyn Codec>,
    {
        let mut codecs = self.codecs.write();
        let inner = codecs.get(name)?.clone();
        let outer = f(inner.clone());
        debug!(name, outer = outer.name(), "codec wrapped");
        codecs.insert(name.to_owned(), outer);
        Some(inner)
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Codec>> {
        self.codecs.read().get(name).cloned()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.codecs.read().keys().cloned().collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{bincode, json};

    #[test]
    fn defaults_are_registered() {
        let registry = Registry::with_defaults();
        assert_eq!(registry.names(), vec![bincode::NAME, json::NAME]);
        assert_eq!(registry.get(json::NAME).unwrap().name(), json::NAME);
        assert!(registry.get("proto").is_none());
    }

    #[test]
    fn register_replaces_same_name() {
        let registry = Registry::new();
        assert!(registry.register(Arc::new(Bincode)).is_none());
        let first = registry.get(bincode::NAME).unwrap();
        let prev = registry.register(Arc::new(Bincode)).unwrap();
        assert!(Arc::ptr_eq(&first, &prev));
        assert!(!Arc::ptr_eq(&first, &registry.get(bincode::NAME).unwrap()));
    }

    #[test]
    fn wrap_unknown_name_registers_nothing() {
        let registry = Registry::new();
        let wrapped = registry.wrap(json::NAME, |inner| inner);
        assert!(wrapped.is_none());
        assert!(registry.names().is_empty());
    }

    #[test]
    fn wrap_hands_current_codec_to_builder() {
        let registry = Registry::with_defaults();
        let before = registry.get(json::NAME).unwrap();
        let inner = registry
            .wrap(json::NAME, |inner| {
                assert!(Arc::ptr_eq(&inner, &before));
                Arc::new(Json)
            })
            .unwrap();
        assert!(Arc::ptr_eq(&inner, &before));
        assert!(!Arc::ptr_eq(&registry.get(json::NAME).unwrap(), &before));
    }

    #[test]
    fn wrap_replaces_under_original_name() {
        let registry = Registry::with_defaults();
        let before = registry.get(bincode::NAME).unwrap();
        let inner = registry.wrap(bincode::NAME, |_| Arc::new(Json)).unwrap();
        assert!(Arc::ptr_eq(&inner, &before));

        let current = registry.get(bincode::NAME).unwrap();
        assert!(!Arc::ptr_eq(&current, &before));
        assert_eq!(current.name(), json::NAME);
        assert_eq!(registry.names(), vec![bincode::NAME, json::NAME]);
    }
}
