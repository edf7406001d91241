//! # State handles
//!
//! A [`StateHandle<T>`] binds one key of one registry to a typed
//! get / set / subscribe API. The value lives in the registry; the handle
//! never caches it, so every handle bound to the same key observes the same
//! value.
//!
//! ```rust
//! use stagehooks_core::*;
//!
//! let game = Game::new(GameConfig::default());
//! let scene = game.add_scene("Level1");
//!
//! let lives = with_state_def(&scene, "lives", Some(3u32), StateOptions::new()).unwrap();
//! lives.on(StateEvent::Change, |new: &u32, old: &u32| println!("lives {old} -> {new}"));
//! lives.update(|l| l - 1).unwrap();
//! assert_eq!(lives.get(), Some(2));
//! ```
//!
//! All wrappers ([`ComputedState`](crate::ComputedState),
//! [`DebouncedState`](crate::DebouncedState),
//! [`PersistentState`](crate::PersistentState),
//! [`UndoableState`](crate::UndoableState)) implement [`HookState`] by
//! composing a `StateHandle`.

use std::any::type_name;
use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;
use std::str::FromStr;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value as Json;

use crate::emitter::{Listener, ListenerId, Value};
use crate::error::{Component, Result, StateError};
use crate::host::StateHost;
use crate::merge::merge_onto;
use crate::registry::{Registry, RegistryScope};
use crate::subscription::Subscription;

/// Accepts a value with `Ok(())` or rejects it with a reason.
pub type Validator<T> = Rc<dyn Fn(&T) -> std::result::Result<(), String>>;

/// The only event a handle emits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StateEvent {
    Change,
}

impl fmt::Display for StateEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateEvent::Change => f.write_str("change"),
        }
    }
}

impl FromStr for StateEvent {
    type Err = StateError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "change" => Ok(StateEvent::Change),
            other => Err(StateError::UnsupportedEvent {
                component: Component::StateDef,
                event: other.to_string(),
            }),
        }
    }
}

pub struct StateOptions<T> {
    pub(crate) validator: Option<Validator<T>>,
    pub(crate) debug: Option<bool>,
    pub(crate) scope: RegistryScope,
}

impl<T> StateOptions<T> {
    pub fn new() -> Self {
        Self {
            validator: None,
            debug: None,
            scope: RegistryScope::Scene,
        }
    }

    pub fn validator(
        mut self,
        f: impl Fn(&T) -> std::result::Result<(), String> + 'static,
    ) -> Self {
        self.validator = Some(Rc::new(f));
        self
    }

    /// Overrides the host's debug default for this handle.
    pub fn debug(mut self, on: bool) -> Self {
        self.debug = Some(on);
        self
    }

    pub fn scope(mut self, scope: RegistryScope) -> Self {
        self.scope = scope;
        self
    }

    pub fn global(self) -> Self {
        self.scope(RegistryScope::Global)
    }
}

impl<T> Default for StateOptions<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for StateOptions<T> {
    fn clone(&self) -> Self {
        Self {
            validator: self.validator.clone(),
            debug: self.debug,
            scope: self.scope,
        }
    }
}

/// The get / set / subscribe surface shared by every kind of handle.
pub trait HookState<T: Clone + 'static> {
    /// Fully namespaced registry key.
    fn key(&self) -> &str;

    /// Tag used for errors raised by this handle.
    fn component(&self) -> Component;

    /// Reads through to the registry. `None` while the key holds no value.
    fn get(&self) -> Option<T>;

    fn set(&self, value: T) -> Result<()>;

    /// Computes the next value from the current one, then behaves like `set`.
    fn update(&self, f: impl FnOnce(&T) -> T) -> Result<()> {
        let current = self.get().ok_or_else(|| StateError::Uninitialized {
            component: self.component(),
            key: self.key().to_string(),
        })?;
        self.set(f(&current))
    }

    /// Deep-merges `partial` onto the current value, which must serialize to
    /// a JSON object, then behaves like `set`.
    fn patch(&self, partial: Json) -> Result<()>
    where
        T: Serialize + DeserializeOwned,
    {
        self.patch_with(move |_| partial)
    }

    fn patch_with(&self, f: impl FnOnce(&T) -> Json) -> Result<()>
    where
        T: Serialize + DeserializeOwned,
    {
        let current = self.get();
        let partial = match &current {
            Some(v) => f(v),
            None => Json::Null,
        };
        let merged = merge_onto(self.component(), self.key(), current.as_ref(), partial)?;
        self.set(merged)
    }

    /// Subscribes to `(new, old)` change notifications, delivered in
    /// subscription order.
    fn on(&self, event: StateEvent, callback: impl Fn(&T, &T) + 'static) -> Subscription;

    /// Like `on`, but the callback runs for the next change only.
    fn once(&self, event: StateEvent, callback: impl Fn(&T, &T) + 'static) -> Subscription;

    /// Removes one listener. No-op (returns `false`) if it is not registered.
    fn off(&self, event: StateEvent, id: ListenerId) -> bool;

    /// Removes every listener on this key, however it was added.
    fn clear_listeners(&self);

    #[deprecated(note = "use `on(StateEvent::Change, ..)` instead")]
    fn on_change(&self, callback: impl Fn(&T, &T) + 'static) -> Subscription {
        log::warn!(
            target: "stagehooks",
            "{} on_change() is deprecated and will be removed; use on(StateEvent::Change, ..) for '{}'",
            self.component(),
            self.key()
        );
        self.on(StateEvent::Change, callback)
    }
}

/// Base handle: one key in one registry.
pub struct StateHandle<T> {
    key: Rc<str>,
    registry: Rc<dyn Registry>,
    validator: Option<Validator<T>>,
    debug: bool,
    component: Component,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for StateHandle<T> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            registry: self.registry.clone(),
            validator: self.validator.clone(),
            debug: self.debug,
            component: self.component,
            _marker: PhantomData,
        }
    }
}

/// Binds `key` in the registry `options` selects on `host`.
///
/// If the key is absent and `initial` is given, it is validated and written.
/// If the key already exists, `initial` is ignored and the handle views the
/// stored value.
pub fn with_state_def<T: Clone + 'static>(
    host: &dyn StateHost,
    key: &str,
    initial: Option<T>,
    options: StateOptions<T>,
) -> Result<StateHandle<T>> {
    StateHandle::bind(Component::StateDef, host, key, initial, options)
}

pub(crate) fn check_key(component: Component, key: &str) -> Result<()> {
    if key.trim().is_empty() {
        return Err(StateError::EmptyKey { component });
    }
    Ok(())
}

impl<T: Clone + 'static> StateHandle<T> {
    pub(crate) fn bind(
        component: Component,
        host: &dyn StateHost,
        key: &str,
        initial: Option<T>,
        options: StateOptions<T>,
    ) -> Result<Self> {
        check_key(component, key)?;
        let registry = host
            .registry(options.scope)
            .ok_or(StateError::MissingRegistry { component })?;

        let handle = Self {
            key: Rc::from(key),
            registry,
            validator: options.validator,
            debug: options.debug.unwrap_or_else(|| host.debug_default()),
            component,
            _marker: PhantomData,
        };

        if let Some(existing) = handle.registry.get(key) {
            if !existing.is::<T>() {
                return Err(StateError::TypeMismatch {
                    component,
                    key: key.to_string(),
                    expected: type_name::<T>(),
                });
            }
            if initial.is_some() {
                log::trace!(
                    target: "stagehooks",
                    "{component} '{key}' already exists, initial value ignored"
                );
            }
        } else if let Some(initial) = initial {
            handle.validate(&initial)?;
            handle.registry.set(key, Rc::new(initial));
        }

        if handle.debug {
            log::debug!(
                target: "stagehooks",
                "{component} init '{key}' ({:?}, exists: {})",
                options.scope,
                handle.exists()
            );
        }
        Ok(handle)
    }

    pub fn exists(&self) -> bool {
        self.registry.has(&self.key)
    }

    pub fn is_debug(&self) -> bool {
        self.debug
    }

    pub fn listener_count(&self) -> usize {
        self.registry.listener_count(&self.key)
    }

    /// Fails once the backing registry was closed by its owner.
    pub(crate) fn ensure_open(&self) -> Result<()> {
        if self.registry.is_open() {
            Ok(())
        } else {
            Err(StateError::MissingRegistry {
                component: self.component,
            })
        }
    }

    pub(crate) fn validate(&self, value: &T) -> Result<()> {
        if let Some(validator) = &self.validator
            && let Err(message) = validator(value)
        {
            if self.debug {
                log::debug!(
                    target: "stagehooks",
                    "{} rejected value for '{}': {message}",
                    self.component,
                    self.key
                );
            }
            return Err(StateError::Validation {
                component: self.component,
                key: self.key.to_string(),
                message,
            });
        }
        Ok(())
    }

    /// Writes without validating. Callers validate first.
    pub(crate) fn commit(&self, value: T) {
        if self.debug {
            log::debug!(target: "stagehooks", "{} set '{}'", self.component, self.key);
        }
        self.registry.set(&self.key, Rc::new(value));
    }

    fn subscribe(&self, callback: impl Fn(&T, &T) + 'static, once: bool) -> Subscription {
        let key = self.key.clone();
        let listener: Listener = Rc::new(move |new: &Value, old: Option<&Value>| {
            // first write through a store that notifies on insert
            let Some(old) = old else {
                return;
            };
            match (new.downcast_ref::<T>(), old.downcast_ref::<T>()) {
                (Some(new), Some(old)) => callback(new, old),
                _ => log::warn!(
                    target: "stagehooks",
                    "change on '{key}' skipped: value is not a {}",
                    type_name::<T>()
                ),
            }
        });
        let id = if once {
            self.registry.once(&self.key, listener)
        } else {
            self.registry.on(&self.key, listener)
        };
        if self.debug {
            log::debug!(
                target: "stagehooks",
                "{} listener added on '{}' ({} total)",
                self.component,
                self.key,
                self.listener_count()
            );
        }

        let registry = self.registry.clone();
        let key = self.key.clone();
        let debug = self.debug;
        Subscription::new(id, move || {
            if registry.off(&key, id) && debug {
                log::debug!(target: "stagehooks", "listener removed from '{key}'");
            }
        })
    }
}

impl<T: Clone + 'static> HookState<T> for StateHandle<T> {
    fn key(&self) -> &str {
        &self.key
    }

    fn component(&self) -> Component {
        self.component
    }

    fn get(&self) -> Option<T> {
        let value = self.registry.get(&self.key)?;
        let typed = value.downcast_ref::<T>().cloned();
        if typed.is_none() {
            log::warn!(
                target: "stagehooks",
                "{} '{}' holds a value that is not a {}",
                self.component,
                self.key,
                type_name::<T>()
            );
        }
        if self.debug {
            log::debug!(target: "stagehooks", "{} get '{}'", self.component, self.key);
        }
        typed
    }

    fn set(&self, value: T) -> Result<()> {
        self.ensure_open()?;
        self.validate(&value)?;
        self.commit(value);
        Ok(())
    }

    fn on(&self, event: StateEvent, callback: impl Fn(&T, &T) + 'static) -> Subscription {
        let StateEvent::Change = event;
        self.subscribe(callback, false)
    }

    fn once(&self, event: StateEvent, callback: impl Fn(&T, &T) + 'static) -> Subscription {
        let StateEvent::Change = event;
        self.subscribe(callback, true)
    }

    fn off(&self, event: StateEvent, id: ListenerId) -> bool {
        let StateEvent::Change = event;
        let removed = self.registry.off(&self.key, id);
        if removed && self.debug {
            log::debug!(target: "stagehooks", "{} listener removed from '{}'", self.component, self.key);
        }
        removed
    }

    fn clear_listeners(&self) {
        if self.debug {
            log::debug!(
                target: "stagehooks",
                "{} clearing {} listeners on '{}'",
                self.component,
                self.listener_count(),
                self.key
            );
        }
        self.registry.remove_all(&self.key);
    }
}

impl<T> fmt::Debug for StateHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateHandle")
            .field("key", &self.key)
            .field("component", &self.component)
            .field("debug", &self.debug)
            .finish_non_exhaustive()
    }
}
