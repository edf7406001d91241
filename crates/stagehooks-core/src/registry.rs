//! # Registries
//!
//! A [`Registry`] is the key-value store a state handle reads and writes
//! through. It owns both the values and the change listeners; handles are
//! views that never cache.
//!
//! - [`DataRegistry`] mirrors an engine data manager. A scene owns one for
//!   scoped state and the [`Game`](crate::Game) owns one for global state.
//! - [`GlobalStore`](crate::GlobalStore) is a standalone map for hosts
//!   without any scene.
//!
//! Change notifications travel on the `changedata-<key>` channel of the
//! registry's [`EventEmitter`].

use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use crate::emitter::{EventEmitter, Listener, ListenerId, Value};

pub const CHANGE_EVENT_PREFIX: &str = "changedata-";

/// Name of the change channel for `key`.
pub fn change_event(key: &str) -> String {
    format!("{CHANGE_EVENT_PREFIX}{key}")
}

/// Which backing store of a host a handle binds to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RegistryScope {
    /// Lives as long as one scene instance.
    #[default]
    Scene,
    /// Lives as long as the process context.
    Global,
}

pub trait Registry {
    fn get(&self, key: &str) -> Option<Value>;
    /// Stores `value`, notifying the key's change listeners per the store's
    /// own semantics.
    fn set(&self, key: &str, value: Value);
    fn has(&self, key: &str) -> bool;
    fn on(&self, key: &str, listener: Listener) -> ListenerId;
    fn once(&self, key: &str, listener: Listener) -> ListenerId;
    fn off(&self, key: &str, id: ListenerId) -> bool;
    fn remove_all(&self, key: &str);
    fn listener_count(&self, key: &str) -> usize;

    /// `false` once the store refuses writes.
    fn is_open(&self) -> bool {
        true
    }
}

/// Engine-style data manager.
///
/// Writing a key that does not exist yet stores it silently; every later write
/// emits `changedata-<key>` with `(new, Some(old))`, even when the value is
/// unchanged.
#[derive(Default)]
pub struct DataRegistry {
    values: RefCell<HashMap<String, Value>>,
    events: EventEmitter,
    closed: Cell<bool>,
}

impl DataRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn remove(&self, key: &str) -> Option<Value> {
        self.values.borrow_mut().remove(key)
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.values.borrow().keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.values.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.borrow().is_empty()
    }

    /// Drops every value and every listener.
    pub fn clear(&self) {
        self.values.borrow_mut().clear();
        self.events.clear();
    }

    /// Clears the registry and refuses every later write. Used when the owner
    /// goes away while handles may still point here.
    pub fn close(&self) {
        self.clear();
        self.closed.set(true);
    }
}

impl Registry for DataRegistry {
    fn get(&self, key: &str) -> Option<Value> {
        self.values.borrow().get(key).cloned()
    }

    fn set(&self, key: &str, value: Value) {
        if self.closed.get() {
            log::warn!(target: "stagehooks", "write to '{key}' after its registry was closed, dropped");
            return;
        }
        let old = self
            .values
            .borrow_mut()
            .insert(key.to_string(), value.clone());
        if let Some(old) = old {
            self.events.emit(&change_event(key), &value, Some(&old));
        }
    }

    fn has(&self, key: &str) -> bool {
        self.values.borrow().contains_key(key)
    }

    fn on(&self, key: &str, listener: Listener) -> ListenerId {
        self.events.on(&change_event(key), listener)
    }

    fn once(&self, key: &str, listener: Listener) -> ListenerId {
        self.events.once(&change_event(key), listener)
    }

    fn off(&self, key: &str, id: ListenerId) -> bool {
        self.events.off(&change_event(key), id)
    }

    fn remove_all(&self, key: &str) {
        self.events.remove_all(&change_event(key));
    }

    fn listener_count(&self, key: &str) -> usize {
        self.events.listener_count(&change_event(key))
    }

    fn is_open(&self) -> bool {
        !self.closed.get()
    }
}
