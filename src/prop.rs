//! A typed, named view over the registry (§4.5).

use std::sync::Arc;

use parking_lot::RwLock;

use crate::converter::Converter;
use crate::error::PropsError;
use crate::key::Key;
use crate::subscriber::SubscriberProxy;

/// A prop-specific pre-set validator, run after conversion and before
/// commit. Its failure is reported identically to a conversion failure
/// (§7, `ValidationFailed`).
pub type Validator<T> = Arc<dyn Fn(&T) -> Result<(), PropsError> + Send + Sync>;

enum PropState<T> {
    /// Never had `set_value` called — e.g. a prop constructed but not yet
    /// bound to a registry.
    Unbound,
    Value(Option<T>),
    Error(PropsError),
}

/// The registry-erased surface used to store heterogeneously-typed props in
/// one `bound: DashMap<Key, Arc<dyn ErasedProp>>` table.
pub trait ErasedProp: Send + Sync {
    fn key(&self) -> &Key;
    /// Feeds a freshly-resolved raw value through this prop's converter and
    /// validator, updating its state and notifying subscribers.
    fn set_raw(&self, raw: Option<String>);
}

/// Holds `(key, typed-value, epoch, error-state)` plus an embedded
/// `SubscriberProxy`. Bound to a `Registry` via `Registry::bind`.
pub struct Prop<T> {
    key: Key,
    converter: Arc<dyn Converter<T>>,
    validator: Option<Validator<T>>,
    state: RwLock<PropState<T>>,
    proxy: SubscriberProxy<Option<T>>,
}

impl<T> Prop<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(key: impl Into<Key>, converter: Arc<dyn Converter<T>>) -> Self {
        Self {
            key: key.into(),
            converter,
            validator: None,
            state: RwLock::new(PropState::Unbound),
            proxy: SubscriberProxy::new(),
        }
    }

    pub fn with_validator(mut self, validator: Validator<T>) -> Self {
        self.validator = Some(validator);
        self
    }

    pub fn key(&self) -> &Key {
        &self.key
    }

    /// The current epoch of this prop's notification stream.
    pub fn epoch(&self) -> u64 {
        self.proxy.current_epoch()
    }

    /// The last successfully-stored typed value (`Ok(None)` if the key is
    /// legitimately absent), or the most recent cause if the prop is in an
    /// error state.
    pub fn get(&self) -> Result<Option<T>, PropsError> {
        match &*self.state.read() {
            PropState::Unbound => Ok(None),
            PropState::Value(value) => Ok(value.clone()),
            PropState::Error(err) => Err(err.clone()),
        }
    }

    /// The converter-encoded string form of the current value, or `None`
    /// when unbound, absent, or in an error state — used by `PropGroup`'s
    /// template rendering, which substitutes the literal `"null"` for
    /// `None` slots.
    pub fn encoded_string(&self) -> Option<String> {
        match &*self.state.read() {
            PropState::Value(Some(value)) => Some(self.converter.encode(value)),
            _ => None,
        }
    }

    /// Runs the converter (and validator, if any) over `raw` and commits
    /// the result, notifying subscribers either way.
    pub fn set_value(&self, raw: Option<String>) {
        match self.converter.decode(raw.as_deref()) {
            Ok(value) => {
                if let (Some(validator), Some(checked)) = (&self.validator, &value) {
                    if let Err(err) = validator(checked) {
                        *self.state.write() = PropState::Error(err.clone());
                        self.proxy.handle_error(err);
                        return;
                    }
                }
                *self.state.write() = PropState::Value(value.clone());
                self.proxy.send_update(value);
            }
            Err(err) => {
                *self.state.write() = PropState::Error(err.clone());
                self.proxy.handle_error(err);
            }
        }
    }

    /// Subscribes to every future value/error event. Forwards directly to
    /// the embedded `SubscriberProxy`, inheriting its monotonicity,
    /// last-writer-wins, and panic-isolation guarantees.
    pub fn subscribe(
        &self,
        on_update: impl Fn(Option<T>) + Send + Sync + 'static,
        on_error: impl Fn(PropsError) + Send + Sync + 'static,
    ) {
        self.proxy.subscribe(on_update, on_error);
    }
}

impl<T> ErasedProp for Prop<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn key(&self) -> &Key {
        &self.key
    }

    fn set_raw(&self, raw: Option<String>) {
        self.set_value(raw);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::IntConverter;
    use std::sync::Mutex;

    #[test]
    fn successful_conversion_updates_and_notifies() {
        let prop = Prop::new("port", Arc::new(IntConverter) as Arc<dyn Converter<i64>>);
        let seen: Arc<Mutex<Vec<Option<i64>>>> = Arc::new(Mutex::new(Vec::new()));
        let seen2 = seen.clone();
        prop.subscribe(move |v| seen2.lock().unwrap().push(v), |_| {});

        prop.set_value(Some("8080".to_string()));
        assert_eq!(prop.get().unwrap(), Some(8080));
        assert_eq!(*seen.lock().unwrap(), vec![Some(8080)]);
    }

    #[test]
    fn conversion_failure_enters_error_state() {
        let prop = Prop::new("port", Arc::new(IntConverter) as Arc<dyn Converter<i64>>);
        prop.set_value(Some("not-a-number".to_string()));
        assert!(prop.get().is_err());
    }

    #[test]
    fn validator_rejection_behaves_like_conversion_failure() {
        let validator: Validator<i64> = Arc::new(|v| {
            if *v > 0 {
                Ok(())
            } else {
                Err(PropsError::validation_failed("port", "must be positive"))
            }
        });
        let prop =
            Prop::new("port", Arc::new(IntConverter) as Arc<dyn Converter<i64>>).with_validator(validator);
        prop.set_value(Some("-1".to_string()));
        assert!(prop.get().is_err());
        prop.set_value(Some("5".to_string()));
        assert_eq!(prop.get().unwrap(), Some(5));
    }
}
