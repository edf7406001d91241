use std::rc::Rc;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::emitter::ListenerId;
use crate::error::{Component, Result, StorageError};
use crate::host::{Game, MirrorKey, Scene};
use crate::scoping::global_handle;
use crate::state::{HookState, StateEvent, StateHandle, StateOptions};
use crate::storage::{BlobStorage, StorageKind};
use crate::subscription::Subscription;

pub struct PersistOptions<T> {
    storage_key: Option<String>,
    kind: StorageKind,
    state: StateOptions<T>,
}

impl<T> PersistOptions<T> {
    pub fn new() -> Self {
        Self {
            storage_key: None,
            kind: StorageKind::Durable,
            state: StateOptions::new(),
        }
    }

    /// Key in the blob store. Defaults to the state key.
    pub fn storage_key(mut self, key: impl Into<String>) -> Self {
        self.storage_key = Some(key.into());
        self
    }

    pub fn storage(mut self, kind: StorageKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn session(self) -> Self {
        self.storage(StorageKind::Session)
    }

    pub fn state(mut self, options: StateOptions<T>) -> Self {
        self.state = options;
        self
    }
}

impl<T> Default for PersistOptions<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Global state mirrored into a blob store as JSON text.
///
/// The mirror belongs to the [`Game`], not to the scene that acquired the
/// handle: every change to the global value is written, whichever scene or
/// handle made it, until [`PersistentState::detach`] or [`Game::reset`].
/// Acquiring the same key again reuses the existing mirror.
///
/// Storage is best-effort: read and write failures are logged and never
/// reach the caller.
pub struct PersistentState<T> {
    inner: StateHandle<T>,
    game: Game,
    storage: Rc<dyn BlobStorage>,
    storage_key: Rc<str>,
    mirror_key: MirrorKey,
}

pub fn with_persistent_state<T>(
    scene: &Scene,
    key: &str,
    initial: T,
    options: PersistOptions<T>,
) -> Result<PersistentState<T>>
where
    T: Clone + Serialize + DeserializeOwned + 'static,
{
    let storage_key: Rc<str> = Rc::from(options.storage_key.as_deref().unwrap_or(key));
    let game = scene.game().clone();
    let storage = game.storage(options.kind);

    let stored = load::<T>(storage.as_ref(), &storage_key);
    let seeded = stored.is_some();
    let inner = global_handle(
        Component::PersistentState,
        scene,
        key,
        stored.unwrap_or(initial),
        options.state,
    )?;
    if !seeded && let Some(current) = inner.get() {
        store(storage.as_ref(), &storage_key, &current);
    }

    let mirror_key: MirrorKey = (options.kind, storage_key.to_string(), inner.key().to_string());
    game.mirror(mirror_key.clone(), || {
        attach_mirror(&inner, storage.clone(), storage_key.clone())
    });

    Ok(PersistentState {
        inner,
        game,
        storage,
        storage_key,
        mirror_key,
    })
}

fn attach_mirror<T>(
    inner: &StateHandle<T>,
    storage: Rc<dyn BlobStorage>,
    storage_key: Rc<str>,
) -> Subscription
where
    T: Clone + Serialize + 'static,
{
    inner.on(StateEvent::Change, move |new: &T, _old: &T| {
        store(storage.as_ref(), &storage_key, new);
    })
}

fn load<T: DeserializeOwned>(storage: &dyn BlobStorage, key: &str) -> Option<T> {
    let text = match storage.get_item(key) {
        Ok(text) => text?,
        Err(e) => {
            log::warn!(target: "stagehooks", "[persistent_state] failed to read '{key}': {e}");
            return None;
        }
    };
    match serde_json::from_str(&text) {
        Ok(value) => Some(value),
        Err(e) => {
            log::warn!(target: "stagehooks", "[persistent_state] ignoring unreadable '{key}': {e}");
            None
        }
    }
}

fn store<T: Serialize>(storage: &dyn BlobStorage, key: &str, value: &T) {
    let result = serde_json::to_string(value)
        .map_err(StorageError::from)
        .and_then(|text| storage.set_item(key, &text));
    if let Err(e) = result {
        log::warn!(target: "stagehooks", "[persistent_state] failed to save '{key}': {e}");
    }
}

impl<T> PersistentState<T>
where
    T: Clone + Serialize + DeserializeOwned + 'static,
{
    pub fn storage_key(&self) -> &str {
        &self.storage_key
    }

    /// Listeners on the key, the storage mirror included.
    pub fn listener_count(&self) -> usize {
        self.inner.listener_count()
    }

    /// Reads the mirrored copy back from storage.
    pub fn stored(&self) -> Option<T> {
        load(self.storage.as_ref(), &self.storage_key)
    }

    /// Stops mirroring for every handle of this key until it is acquired
    /// again.
    pub fn detach(&self) {
        self.game.detach_mirror(&self.mirror_key);
    }
}

impl<T> HookState<T> for PersistentState<T>
where
    T: Clone + Serialize + DeserializeOwned + 'static,
{
    fn key(&self) -> &str {
        self.inner.key()
    }

    fn component(&self) -> Component {
        Component::PersistentState
    }

    fn get(&self) -> Option<T> {
        self.inner.get()
    }

    fn set(&self, value: T) -> Result<()> {
        self.inner.set(value)
    }

    fn on(&self, event: StateEvent, callback: impl Fn(&T, &T) + 'static) -> Subscription {
        self.inner.on(event, callback)
    }

    fn once(&self, event: StateEvent, callback: impl Fn(&T, &T) + 'static) -> Subscription {
        self.inner.once(event, callback)
    }

    fn off(&self, event: StateEvent, id: ListenerId) -> bool {
        self.inner.off(event, id)
    }

    /// Removes every listener on the key; storage mirroring keeps going.
    fn clear_listeners(&self) {
        self.inner.clear_listeners();
        let mirror = attach_mirror(&self.inner, self.storage.clone(), self.storage_key.clone());
        self.game.replace_mirror(self.mirror_key.clone(), mirror);
    }
}
