//! Assembles layers, routes source updates into `KeyOwnership`, and binds
//! props (§4.8).

use std::sync::{Arc, Weak};

use dashmap::DashMap;

use crate::converter::Converter;
use crate::error::PropsError;
use crate::key::Key;
use crate::layer::{Layer, Operation};
use crate::ownership::KeyOwnership;
use crate::prop::{ErasedProp, Prop};
use crate::source::Source;

/// The registry's internal state. Held behind `Arc` so the layer-update
/// closures each source is given can hold a `Weak` back-reference (§9:
/// Prop/Layer <-> Registry relationships are back-references, not
/// ownership) instead of creating a reference cycle with the sources they
/// are registered against.
struct Inner {
    layers: Vec<Layer>,
    ownership: KeyOwnership,
    bound: DashMap<Key, Arc<dyn ErasedProp>>,
}

impl Inner {
    /// Applies one layer's diffed delta into `KeyOwnership`, re-notifying
    /// any bound prop whose key's effective value changed.
    fn handle_delta(&self, layer_index: usize, delta_key: String, delta_value: Option<String>) {
        let key = Key::new(delta_key);
        let update = self.ownership.apply(&key, delta_value, layer_index, |i| {
            self.layers[i].cached_value(key.as_str())
        });
        if let Some(update) = update {
            if let Some(prop) = self.bound.get(&update.key) {
                prop.set_raw(update.value);
            }
        }
    }
}

/// Assembled layers, the key-ownership resolver, and every prop bound
/// against this registry.
#[derive(Clone)]
pub struct Registry(Arc<Inner>);

impl Registry {
    /// The current effective value for `key`, or `None` if absent.
    pub fn get_raw(&self, key: &Key) -> Option<String> {
        self.0.ownership.get(key)
    }

    /// Converts the current effective value for `key` through `converter`.
    pub fn get<T>(&self, key: &Key, converter: &dyn Converter<T>) -> Result<Option<T>, PropsError> {
        converter.decode(self.0.ownership.get(key).as_deref())
    }

    /// Binds `prop` to this registry: registers it under its key and
    /// immediately initializes it from the key's current effective value.
    /// Subsequent ownership transitions for that key call `prop.set_raw`
    /// automatically.
    pub fn bind<T>(&self, prop: Arc<Prop<T>>)
    where
        T: Clone + Send + Sync + 'static,
    {
        let key = prop.key().clone();
        let initial = self.0.ownership.get(&key);
        self.0.bound.insert(key, prop.clone());
        prop.set_raw(initial);
    }

    /// The value `index` would define for `key` if it were the owner (§4.3
    /// `get(key, layer)`): the current effective value when `index` is in
    /// fact the owner, otherwise that layer's cached snapshot value for
    /// `key`. Returns `None` if `index` is out of range.
    pub fn get_in_layer(&self, key: &Key, index: usize) -> Option<String> {
        let layer = self.0.layers.get(index)?;
        self.0
            .ownership
            .get_for_layer(key, index, |_| layer.cached_value(key.as_str()))
    }

    /// The number of layers in priority order (index 0 is lowest).
    pub fn layer_count(&self) -> usize {
        self.0.layers.len()
    }

    /// The stable id of the source backing layer `index`.
    pub fn layer_source_id(&self, index: usize) -> Option<&str> {
        self.0.layers.get(index).map(Layer::source_id)
    }

    /// The source backing layer `index`, for callers (scheduler,
    /// file-watcher) that need to drive refreshes directly.
    pub fn layer_source(&self, index: usize) -> Option<Arc<dyn Source>> {
        self.0.layers.get(index).map(|l| l.source().clone())
    }
}

/// Builds a `Registry` from an ordered list of sources, lowest priority
/// first.
pub struct RegistryBuilder {
    sources: Vec<Arc<dyn Source>>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self { sources: Vec::new() }
    }

    /// Appends a source; its priority is its position in the final chain
    /// (first-added = lowest, §3).
    pub fn add_source(mut self, source: Arc<dyn Source>) -> Self {
        self.sources.push(source);
        self
    }

    /// Assembles the registry: assigns priorities `0..N` in add order,
    /// registers each layer as a subscriber of its source, then pulls one
    /// initial snapshot from every source so the registry starts populated
    /// rather than waiting on the first external refresh.
    pub fn build(self) -> Registry {
        let layers: Vec<Layer> = self
            .sources
            .iter()
            .enumerate()
            .map(|(priority, source)| Layer::new(source.clone(), priority))
            .collect();

        let inner = Arc::new(Inner {
            layers,
            ownership: KeyOwnership::new(),
            bound: DashMap::new(),
        });

        for (index, source) in self.sources.iter().enumerate() {
            let weak: Weak<Inner> = Arc::downgrade(&inner);
            source.register(Box::new(move |snapshot| {
                if let Some(inner) = weak.upgrade() {
                    let deltas = inner.layers[index].diff_and_replace(snapshot.clone());
                    for delta in deltas {
                        let value = match delta.op {
                            Operation::Set => delta.value,
                            Operation::Unset => None,
                        };
                        inner.handle_delta(index, delta.key, value);
                    }
                }
            }));
        }

        for source in &self.sources {
            source.push_update();
        }

        Registry(inner)
    }
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}
