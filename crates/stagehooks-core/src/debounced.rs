use std::cell::RefCell;
use std::rc::Rc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value as Json;
use web_time::Duration;

use crate::emitter::ListenerId;
use crate::error::{Component, Result};
use crate::host::{Scene, StateHost};
use crate::merge::merge_onto;
use crate::scoping::local_handle;
use crate::state::{HookState, StateEvent, StateHandle, StateOptions};
use crate::subscription::Subscription;
use crate::time::{TimerHost, TimerId};

/// Scene state whose writes are coalesced.
///
/// `set` validates immediately, then (re)starts the quiet window; only the
/// last value requested inside the window is committed, once, when it
/// elapses. `get` keeps returning the last committed value until then.
///
/// [`Game::reset`](crate::Game::reset) drops the queued timer; the handle
/// then forgets its pending value.
pub struct DebouncedState<T> {
    inner: StateHandle<T>,
    timers: Rc<dyn TimerHost>,
    delay: Duration,
    pending: Rc<Pending<T>>,
}

struct Pending<T> {
    timer: RefCell<Option<TimerId>>,
    value: RefCell<Option<T>>,
}

impl<T> Clone for DebouncedState<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            timers: self.timers.clone(),
            delay: self.delay,
            pending: self.pending.clone(),
        }
    }
}

/// `delay` falls back to [`GameConfig::debounce_ms`](crate::GameConfig).
pub fn with_debounced_state<T: Clone + 'static>(
    scene: &Scene,
    key: &str,
    initial: T,
    delay: Option<Duration>,
    options: StateOptions<T>,
) -> Result<DebouncedState<T>> {
    let inner = local_handle(Component::DebouncedState, scene, key, initial, options)?;
    let state = DebouncedState {
        inner,
        timers: scene.game().timer_host(),
        delay: delay.unwrap_or_else(|| scene.game().config().debounce_delay()),
        pending: Rc::new(Pending {
            timer: RefCell::new(None),
            value: RefCell::new(None),
        }),
    };

    if let Some(scope) = scene.scope() {
        let on_teardown = state.clone();
        scope.add_disposer(move || on_teardown.cancel());
    }
    Ok(state)
}

impl<T: Clone + 'static> DebouncedState<T> {
    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn is_pending(&self) -> bool {
        self.sync_pending()
    }

    /// The value waiting to be committed, if any.
    pub fn pending_value(&self) -> Option<T> {
        if !self.sync_pending() {
            return None;
        }
        self.pending.value.borrow().clone()
    }

    /// Commits the pending value now.
    pub fn flush(&self) {
        if !self.sync_pending() {
            return;
        }
        self.cancel_timer();
        let value = self.pending.value.borrow_mut().take();
        if let Some(value) = value {
            self.inner.commit(value);
        }
    }

    /// Drops the pending value without committing it.
    pub fn cancel(&self) {
        self.cancel_timer();
        self.pending.value.borrow_mut().take();
    }

    /// Drops a pending value whose timer was removed behind our back.
    fn sync_pending(&self) -> bool {
        let timer = *self.pending.timer.borrow();
        match timer {
            Some(id) if self.timers.is_scheduled(id) => true,
            Some(_) => {
                self.pending.timer.borrow_mut().take();
                self.pending.value.borrow_mut().take();
                false
            }
            None => false,
        }
    }

    /// Pending value if one is queued, the committed one otherwise.
    fn latest(&self) -> Option<T> {
        self.pending_value().or_else(|| self.inner.get())
    }

    fn cancel_timer(&self) {
        let timer = self.pending.timer.borrow_mut().take();
        if let Some(id) = timer {
            self.timers.cancel(id);
        }
    }
}

impl<T: Clone + 'static> HookState<T> for DebouncedState<T> {
    fn key(&self) -> &str {
        self.inner.key()
    }

    fn component(&self) -> Component {
        Component::DebouncedState
    }

    fn get(&self) -> Option<T> {
        self.inner.get()
    }

    fn set(&self, value: T) -> Result<()> {
        self.inner.ensure_open()?;
        self.inner.validate(&value)?;
        self.cancel_timer();
        *self.pending.value.borrow_mut() = Some(value);

        let pending = self.pending.clone();
        let inner = self.inner.clone();
        let id = self.timers.schedule(
            self.delay,
            Box::new(move || {
                pending.timer.borrow_mut().take();
                let value = pending.value.borrow_mut().take();
                if let Some(value) = value {
                    inner.commit(value);
                }
            }),
        );
        *self.pending.timer.borrow_mut() = Some(id);
        Ok(())
    }

    /// Builds on the pending value when one is queued, so consecutive
    /// updates inside one window compose.
    fn update(&self, f: impl FnOnce(&T) -> T) -> Result<()> {
        match self.latest() {
            Some(current) => self.set(f(&current)),
            None => self.inner.update(f),
        }
    }

    /// Merges onto the pending value when one is queued, like `update`.
    fn patch_with(&self, f: impl FnOnce(&T) -> Json) -> Result<()>
    where
        T: Serialize + DeserializeOwned,
    {
        let current = self.latest();
        let partial = match &current {
            Some(v) => f(v),
            None => Json::Null,
        };
        let merged = merge_onto(self.component(), self.key(), current.as_ref(), partial)?;
        self.set(merged)
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

    fn clear_listeners(&self) {
        self.inner.clear_listeners();
    }
}
