pub use crate::computed::{ComputedState, with_computed_state};
pub use crate::config::GameConfig;
pub use crate::debounced::{DebouncedState, with_debounced_state};
pub use crate::emitter::ListenerId;
pub use crate::error::{Result, StateError};
pub use crate::global_store::{GlobalStore, with_global_store_state};
pub use crate::host::{Game, Scene, StateHost};
pub use crate::persistent::{PersistOptions, PersistentState, with_persistent_state};
pub use crate::registry::RegistryScope;
pub use crate::scoping::{with_global_state, with_local_state};
pub use crate::state::{HookState, StateEvent, StateHandle, StateOptions, with_state_def};
pub use crate::storage::StorageKind;
pub use crate::subscription::Subscription;
pub use crate::undoable::{UndoableState, with_undoable_state};
