//! A process-wide map for hosts that have no scene at all.
//!
//! Unlike [`DataRegistry`](crate::DataRegistry), every `set` notifies, the
//! first write of a key included (with no old value). The store is an explicit
//! object: create one, share it by cloning, and call [`GlobalStore::clear`]
//! between tests.

use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::emitter::{EventEmitter, Listener, ListenerId, Value};
use crate::error::{Component, Result};
use crate::host::StateHost;
use crate::registry::{Registry, RegistryScope};
use crate::state::{StateHandle, StateOptions};

#[derive(Clone, Default)]
pub struct GlobalStore {
    inner: Rc<StoreInner>,
}

#[derive(Default)]
struct StoreInner {
    values: RefCell<HashMap<String, Value>>,
    // keyed by the raw key
    listeners: EventEmitter,
}

impl GlobalStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.inner.values.borrow().get(key).cloned()
    }

    pub fn get_as<T: Clone + 'static>(&self, key: &str) -> Option<T> {
        self.get(key)?.downcast_ref::<T>().cloned()
    }

    /// The stored value, or `default` when absent or of another type.
    pub fn get_or<T: Clone + 'static>(&self, key: &str, default: T) -> T {
        self.get_as(key).unwrap_or(default)
    }

    pub fn set<V: Any>(&self, key: &str, value: V) {
        self.set_value(key, Rc::new(value));
    }

    /// Overwrites and notifies every listener of `key` with `(new, old)`.
    pub fn set_value(&self, key: &str, value: Value) {
        let old = self
            .inner
            .values
            .borrow_mut()
            .insert(key.to_string(), value.clone());
        self.inner.listeners.emit(key, &value, old.as_ref());
    }

    pub fn has(&self, key: &str) -> bool {
        self.inner.values.borrow().contains_key(key)
    }

    pub fn remove(&self, key: &str) -> Option<Value> {
        self.inner.values.borrow_mut().remove(key)
    }

    pub fn on_change(
        &self,
        key: &str,
        callback: impl Fn(&Value, Option<&Value>) + 'static,
    ) -> ListenerId {
        self.inner.listeners.on(key, Rc::new(callback))
    }

    pub fn off_change(&self, key: &str, id: ListenerId) -> bool {
        self.inner.listeners.off(key, id)
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.inner.values.borrow().keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.inner.values.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.values.borrow().is_empty()
    }

    /// Wipes values and listeners.
    pub fn clear(&self) {
        self.inner.values.borrow_mut().clear();
        self.inner.listeners.clear();
    }
}

impl Registry for GlobalStore {
    fn get(&self, key: &str) -> Option<Value> {
        GlobalStore::get(self, key)
    }

    fn set(&self, key: &str, value: Value) {
        self.set_value(key, value);
    }

    fn has(&self, key: &str) -> bool {
        GlobalStore::has(self, key)
    }

    fn on(&self, key: &str, listener: Listener) -> ListenerId {
        self.inner.listeners.on(key, listener)
    }

    fn once(&self, key: &str, listener: Listener) -> ListenerId {
        self.inner.listeners.once(key, listener)
    }

    fn off(&self, key: &str, id: ListenerId) -> bool {
        self.inner.listeners.off(key, id)
    }

    fn remove_all(&self, key: &str) {
        self.inner.listeners.remove_all(key);
    }

    fn listener_count(&self, key: &str) -> usize {
        self.inner.listeners.listener_count(key)
    }
}

impl StateHost for GlobalStore {
    fn registry(&self, scope: RegistryScope) -> Option<Rc<dyn Registry>> {
        match scope {
            RegistryScope::Global => Some(Rc::new(self.clone())),
            RegistryScope::Scene => None,
        }
    }
}

/// Typed handle over a [`GlobalStore`] key.
///
/// The key is used as-is (no namespace prefix). It behaves like any other
/// [`StateHandle`], so callers cannot tell which store backs it.
pub fn with_global_store_state<T: Clone + 'static>(
    store: &GlobalStore,
    key: &str,
    initial: T,
    options: StateOptions<T>,
) -> Result<StateHandle<T>> {
    StateHandle::bind(
        Component::GlobalStore,
        store,
        key,
        Some(initial),
        options.global(),
    )
}
