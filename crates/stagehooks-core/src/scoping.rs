use crate::error::{Component, Result};
use crate::host::{Scene, StateHost};
use crate::registry::RegistryScope;
use crate::state::{StateHandle, StateOptions, check_key};

/// `scoped:<scene-id>:<key>`
pub fn scoped_key(scene_id: &str, key: &str) -> String {
    format!("scoped:{scene_id}:{key}")
}

/// `global:<key>`
pub fn global_key(key: &str) -> String {
    format!("global:{key}")
}

/// State private to one scene instance.
///
/// Acquiring the same key twice in one scene views the same value; the same
/// key in another scene is a separate value.
pub fn with_local_state<T: Clone + 'static>(
    scene: &Scene,
    key: &str,
    initial: T,
    options: StateOptions<T>,
) -> Result<StateHandle<T>> {
    local_handle(Component::LocalState, scene, key, initial, options)
}

pub(crate) fn local_handle<T: Clone + 'static>(
    component: Component,
    scene: &Scene,
    key: &str,
    initial: T,
    options: StateOptions<T>,
) -> Result<StateHandle<T>> {
    check_key(component, key)?;
    StateHandle::bind(
        component,
        scene,
        &scoped_key(scene.id(), key),
        Some(initial),
        options.scope(RegistryScope::Scene),
    )
}

/// State shared by every scene of the process. `host` is a [`Scene`] or the
/// [`Game`](crate::Game) itself.
pub fn with_global_state<T: Clone + 'static>(
    host: &dyn StateHost,
    key: &str,
    initial: T,
    options: StateOptions<T>,
) -> Result<StateHandle<T>> {
    global_handle(Component::GlobalState, host, key, initial, options)
}

pub(crate) fn global_handle<T: Clone + 'static>(
    component: Component,
    host: &dyn StateHost,
    key: &str,
    initial: T,
    options: StateOptions<T>,
) -> Result<StateHandle<T>> {
    check_key(component, key)?;
    StateHandle::bind(
        component,
        host,
        &global_key(key),
        Some(initial),
        options.global(),
    )
}
