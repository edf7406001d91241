//! # Hosts
//!
//! State always lives in a host-provided registry:
//!
//! - [`Game`] is the explicit process-wide context. It owns the global
//!   registry, the timer queue used for debouncing, and the blob stores used
//!   for persistence. Pass it by reference to whatever needs it.
//! - [`Scene`] owns a registry that lives exactly as long as the scene, plus a
//!   [`Scope`] of teardown callbacks. `destroy()` clears both.
//!
//! ```rust
//! use stagehooks_core::*;
//!
//! let game = Game::new(GameConfig::default());
//! let menu = game.add_scene("Menu");
//! let volume = with_global_state(&menu, "volume", 0.8f32, StateOptions::new()).unwrap();
//! volume.set(0.5).unwrap();
//!
//! let level = game.add_scene("Level");
//! let same = with_global_state(&level, "volume", 1.0f32, StateOptions::new()).unwrap();
//! assert_eq!(same.get(), Some(0.5));
//! ```

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::config::GameConfig;
use crate::registry::{DataRegistry, Registry, RegistryScope};
use crate::scope::Scope;
use crate::storage::{BlobStorage, FileStorage, MemoryStorage, StorageKind};
use crate::subscription::Subscription;
use crate::time::{Clock, SystemClock, TimerHost, TimerQueue};

/// Anything that can hand out a registry for a [`RegistryScope`].
pub trait StateHost {
    /// `None` when the host has no usable registry for `scope`.
    fn registry(&self, scope: RegistryScope) -> Option<Rc<dyn Registry>>;

    /// Teardown list for listeners and timers created on behalf of this host.
    fn scope(&self) -> Option<Scope> {
        None
    }

    fn debug_default(&self) -> bool {
        false
    }
}

#[derive(Clone)]
pub struct Game {
    inner: Rc<GameInner>,
}

struct GameInner {
    config: GameConfig,
    registry: Rc<DataRegistry>,
    timers: Rc<TimerQueue>,
    session: Rc<dyn BlobStorage>,
    durable: Rc<dyn BlobStorage>,
    // (store, storage key, state key) -> listener writing the state to the store
    mirrors: RefCell<HashMap<MirrorKey, Subscription>>,
}

pub(crate) type MirrorKey = (StorageKind, String, String);

pub struct GameBuilder {
    config: GameConfig,
    clock: Option<Box<dyn Clock>>,
    session: Option<Rc<dyn BlobStorage>>,
    durable: Option<Rc<dyn BlobStorage>>,
}

impl GameBuilder {
    pub fn config(mut self, config: GameConfig) -> Self {
        self.config = config;
        self
    }

    pub fn clock(mut self, clock: impl Clock) -> Self {
        self.clock = Some(Box::new(clock));
        self
    }

    pub fn session_storage(mut self, storage: Rc<dyn BlobStorage>) -> Self {
        self.session = Some(storage);
        self
    }

    pub fn durable_storage(mut self, storage: Rc<dyn BlobStorage>) -> Self {
        self.durable = Some(storage);
        self
    }

    pub fn build(self) -> Game {
        let durable = self.durable.unwrap_or_else(|| match &self.config.storage_dir {
            Some(dir) => Rc::new(FileStorage::in_dir(dir)),
            None => Rc::new(MemoryStorage::new()),
        });
        let clock = self.clock.unwrap_or_else(|| Box::new(SystemClock));
        Game {
            inner: Rc::new(GameInner {
                config: self.config,
                registry: Rc::new(DataRegistry::new()),
                timers: Rc::new(TimerQueue::new(clock)),
                session: self
                    .session
                    .unwrap_or_else(|| Rc::new(MemoryStorage::new())),
                durable,
                mirrors: RefCell::new(HashMap::new()),
            }),
        }
    }
}

impl Game {
    pub fn new(config: GameConfig) -> Self {
        Self::builder().config(config).build()
    }

    pub fn builder() -> GameBuilder {
        GameBuilder {
            config: GameConfig::default(),
            clock: None,
            session: None,
            durable: None,
        }
    }

    pub fn config(&self) -> &GameConfig {
        &self.inner.config
    }

    /// The process-scoped registry.
    pub fn registry(&self) -> Rc<DataRegistry> {
        self.inner.registry.clone()
    }

    pub fn timers(&self) -> Rc<TimerQueue> {
        self.inner.timers.clone()
    }

    pub fn timer_host(&self) -> Rc<dyn TimerHost> {
        self.inner.timers.clone()
    }

    pub fn storage(&self, kind: StorageKind) -> Rc<dyn BlobStorage> {
        match kind {
            StorageKind::Session => self.inner.session.clone(),
            StorageKind::Durable => self.inner.durable.clone(),
        }
    }

    pub fn add_scene(&self, id: impl Into<String>) -> Scene {
        Scene::new(self, id)
    }

    /// Per-frame tick: fires due timers. Returns how many fired.
    pub fn update(&self) -> usize {
        self.inner.timers.update()
    }

    /// Wipes global values, global listeners, storage mirrors and pending
    /// timers. Meant for test isolation.
    pub fn reset(&self) {
        self.inner.registry.clear();
        self.inner.timers.clear();
        self.inner.mirrors.borrow_mut().clear();
    }

    /// Registers the mirror `attach` creates, unless `key` already has one.
    pub(crate) fn mirror(&self, key: MirrorKey, attach: impl FnOnce() -> Subscription) {
        if self.inner.mirrors.borrow().contains_key(&key) {
            return;
        }
        let sub = attach();
        self.inner.mirrors.borrow_mut().insert(key, sub);
    }

    /// Installs `sub` under `key`, unsubscribing whatever was there.
    pub(crate) fn replace_mirror(&self, key: MirrorKey, sub: Subscription) {
        let old = self.inner.mirrors.borrow_mut().insert(key, sub);
        if let Some(old) = old {
            old.unsubscribe();
        }
    }

    pub(crate) fn detach_mirror(&self, key: &MirrorKey) {
        let old = self.inner.mirrors.borrow_mut().remove(key);
        if let Some(old) = old {
            old.unsubscribe();
        }
    }
}

impl StateHost for Game {
    fn registry(&self, scope: RegistryScope) -> Option<Rc<dyn Registry>> {
        match scope {
            RegistryScope::Global => Some(self.inner.registry.clone()),
            RegistryScope::Scene => None,
        }
    }

    fn debug_default(&self) -> bool {
        self.inner.config.debug
    }
}

#[derive(Clone)]
pub struct Scene {
    inner: Rc<SceneInner>,
}

struct SceneInner {
    id: String,
    game: Game,
    registry: RefCell<Option<Rc<DataRegistry>>>,
    scope: Scope,
}

impl Scene {
    pub fn new(game: &Game, id: impl Into<String>) -> Self {
        Self {
            inner: Rc::new(SceneInner {
                id: id.into(),
                game: game.clone(),
                registry: RefCell::new(Some(Rc::new(DataRegistry::new()))),
                scope: Scope::new(),
            }),
        }
    }

    pub fn id(&self) -> &str {
        &self.inner.id
    }

    pub fn game(&self) -> &Game {
        &self.inner.game
    }

    /// The scene-scoped registry, or `None` once destroyed.
    pub fn data(&self) -> Option<Rc<DataRegistry>> {
        self.inner.registry.borrow().clone()
    }

    pub fn is_destroyed(&self) -> bool {
        self.inner.registry.borrow().is_none()
    }

    /// Runs scope disposers, then drops every scoped value and listener.
    /// Later acquisitions on this scene fail, and so do writes through handles
    /// acquired before.
    pub fn destroy(&self) {
        self.inner.scope.dispose();
        let registry = self.inner.registry.borrow_mut().take();
        if let Some(registry) = registry {
            log::debug!(
                target: "stagehooks",
                "scene '{}' destroyed, dropping {} scoped keys",
                self.inner.id,
                registry.len()
            );
            registry.close();
        }
    }
}

impl StateHost for Scene {
    fn registry(&self, scope: RegistryScope) -> Option<Rc<dyn Registry>> {
        if self.is_destroyed() {
            return None;
        }
        match scope {
            RegistryScope::Scene => self.data().map(|r| r as Rc<dyn Registry>),
            RegistryScope::Global => Some(self.inner.game.inner.registry.clone()),
        }
    }

    fn scope(&self) -> Option<Scope> {
        Some(self.inner.scope.clone())
    }

    fn debug_default(&self) -> bool {
        self.inner.game.config().debug
    }
}
