//! The key-ownership resolver (§4.3): for every known key, which layer
//! currently owns its effective value, and what that value is.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use crate::key::Key;
use crate::value::RawValue;

/// The current winning assignment for one key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EffectiveValue {
    pub value: String,
    pub owning_layer: usize,
}

/// Emitted whenever `KeyOwnership::apply` changes what a key resolves to.
/// `value == None` means the key became (or remained, on the way to
/// removal) absent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OwnershipUpdate {
    pub key: Key,
    pub value: RawValue,
    pub layer: usize,
}

/// `map<key, EffectiveValue>` behind a `DashMap`, whose `entry` API gives us
/// the per-key atomic region §4.3 calls for via that key's shard
/// lock, without a single registry-wide mutex.
#[derive(Default)]
pub struct KeyOwnership {
    table: DashMap<Key, EffectiveValue>,
}

impl KeyOwnership {
    pub fn new() -> Self {
        Self {
            table: DashMap::new(),
        }
    }

    /// The key's current effective value, or `None` if absent.
    pub fn get(&self, key: &Key) -> Option<String> {
        self.table.get(key).map(|entry| entry.value.clone())
    }

    /// The index of the layer that currently owns `key`, if any.
    pub fn owning_layer(&self, key: &Key) -> Option<usize> {
        self.table.get(key).map(|entry| entry.owning_layer)
    }

    /// The value `layer` would define for `key` if it were the owner: the
    /// current effective value when `layer` is in fact the owner, otherwise
    /// whatever `layer_value(layer)` reports (the chain's cached snapshot
    /// for that layer — §9, array chain replaces "walk to that node").
    pub fn get_for_layer(
        &self,
        key: &Key,
        layer: usize,
        layer_value: impl FnOnce(usize) -> RawValue,
    ) -> RawValue {
        if let Some(entry) = self.table.get(key) {
            if entry.owning_layer == layer {
                return Some(entry.value.clone());
            }
        }
        layer_value(layer)
    }

    /// Applies one `(operation, key, value, layer)` transition from a
    /// `Layer`'s diff. `lower_layer_value(i)` must return what layer `i`'s
    /// most recently pushed snapshot maps `key` to; it is only called for
    /// indices strictly below `origin_layer` during the owner-relinquish
    /// walk (§4.3 case 3). Returns the update to publish, if any.
    pub fn apply(
        &self,
        key: &Key,
        value: RawValue,
        origin_layer: usize,
        lower_layer_value: impl Fn(usize) -> RawValue,
    ) -> Option<OwnershipUpdate> {
        match self.table.entry(key.clone()) {
            Entry::Vacant(slot) => {
                let value = value?;
                slot.insert(EffectiveValue {
                    value: value.clone(),
                    owning_layer: origin_layer,
                });
                Some(OwnershipUpdate {
                    key: key.clone(),
                    value: Some(value),
                    layer: origin_layer,
                })
            }
            Entry::Occupied(mut slot) => {
                let current = slot.get().clone();

                // Lower-priority layers never shadow the current owner.
                if origin_layer < current.owning_layer {
                    return None;
                }

                if origin_layer == current.owning_layer {
                    match value {
                        None => {
                            // The owner relinquishes; find the nearest
                            // strictly-lower layer that still maps the key.
                            let mut found = None;
                            for i in (0..current.owning_layer).rev() {
                                if let Some(v) = lower_layer_value(i) {
                                    found = Some((v, i));
                                    break;
                                }
                            }
                            match found {
                                Some((v, i)) => {
                                    slot.insert(EffectiveValue {
                                        value: v.clone(),
                                        owning_layer: i,
                                    });
                                    Some(OwnershipUpdate {
                                        key: key.clone(),
                                        value: Some(v),
                                        layer: i,
                                    })
                                }
                                None => {
                                    slot.remove();
                                    Some(OwnershipUpdate {
                                        key: key.clone(),
                                        value: None,
                                        layer: origin_layer,
                                    })
                                }
                            }
                        }
                        Some(v) if v == current.value => None,
                        Some(v) => {
                            slot.insert(EffectiveValue {
                                value: v.clone(),
                                owning_layer: origin_layer,
                            });
                            Some(OwnershipUpdate {
                                key: key.clone(),
                                value: Some(v),
                                layer: origin_layer,
                            })
                        }
                    }
                } else {
                    // origin_layer has strictly higher priority than the
                    // current owner.
                    match value {
                        None => None,
                        Some(v) => {
                            slot.insert(EffectiveValue {
                                value: v.clone(),
                                owning_layer: origin_layer,
                            });
                            Some(OwnershipUpdate {
                                key: key.clone(),
                                value: Some(v),
                                layer: origin_layer,
                            })
                        }
                    }
                }
            }
        }
    }
}
