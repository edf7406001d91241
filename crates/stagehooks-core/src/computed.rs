use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value as Json;

use crate::emitter::ListenerId;
use crate::error::{Component, Result, StateError};
use crate::host::{Scene, StateHost};
use crate::scoping::local_handle;
use crate::state::{HookState, StateEvent, StateHandle, StateOptions};
use crate::subscription::Subscription;

/// Read-only state derived from another handle.
///
/// The derived value is recomputed on every source change and committed only
/// when it differs from the stored one, so downstream listeners never see a
/// no-op change.
pub struct ComputedState<T> {
    inner: StateHandle<T>,
    source: Subscription,
}

pub fn with_computed_state<S, T, H>(
    scene: &Scene,
    key: &str,
    source: &H,
    selector: impl Fn(&S) -> T + 'static,
) -> Result<ComputedState<T>>
where
    S: Clone + 'static,
    T: Clone + PartialEq + 'static,
    H: HookState<S>,
{
    let current = source.get().ok_or_else(|| StateError::Uninitialized {
        component: Component::ComputedState,
        key: source.key().to_string(),
    })?;
    let initial = selector(&current);
    let inner = local_handle(
        Component::ComputedState,
        scene,
        key,
        initial.clone(),
        StateOptions::new(),
    )?;
    // re-acquired key: bring the stored value up to date
    if inner.get().as_ref() != Some(&initial) {
        inner.commit(initial);
    }

    let target = inner.clone();
    let subscription = source.on(StateEvent::Change, move |new: &S, _old: &S| {
        let next = selector(new);
        if target.get().as_ref() != Some(&next) {
            target.commit(next);
        }
    });

    if let Some(scope) = scene.scope() {
        let sub = subscription.clone();
        scope.add_disposer(move || sub.unsubscribe());
    }

    Ok(ComputedState {
        inner,
        source: subscription,
    })
}

impl<T: Clone + 'static> ComputedState<T> {
    /// Stops tracking the source. Runs automatically when the scene is
    /// destroyed.
    pub fn dispose(&self) {
        self.source.unsubscribe();
    }

    pub fn is_tracking(&self) -> bool {
        self.source.is_active()
    }

    fn read_only(&self) -> StateError {
        StateError::ReadOnly {
            component: Component::ComputedState,
            key: self.inner.key().to_string(),
        }
    }
}

impl<T: Clone + 'static> HookState<T> for ComputedState<T> {
    fn key(&self) -> &str {
        self.inner.key()
    }

    fn component(&self) -> Component {
        Component::ComputedState
    }

    fn get(&self) -> Option<T> {
        self.inner.get()
    }

    fn set(&self, _value: T) -> Result<()> {
        Err(self.read_only())
    }

    fn update(&self, _f: impl FnOnce(&T) -> T) -> Result<()> {
        Err(self.read_only())
    }

    fn patch_with(&self, _f: impl FnOnce(&T) -> Json) -> Result<()>
    where
        T: Serialize + DeserializeOwned,
    {
        Err(self.read_only())
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
