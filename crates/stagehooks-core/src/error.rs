use std::fmt;

/// The primitive that raised an error. Rendered as the bracketed tag that
/// prefixes every [`StateError`] message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Component {
    StateDef,
    LocalState,
    GlobalState,
    GlobalStore,
    ComputedState,
    DebouncedState,
    PersistentState,
    UndoableState,
}

impl Component {
    pub fn tag(self) -> &'static str {
        match self {
            Component::StateDef => "state_def",
            Component::LocalState => "local_state",
            Component::GlobalState => "global_state",
            Component::GlobalStore => "global_store",
            Component::ComputedState => "computed_state",
            Component::DebouncedState => "debounced_state",
            Component::PersistentState => "persistent_state",
            Component::UndoableState => "undoable_state",
        }
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.tag())
    }
}

#[derive(thiserror::Error, Debug)]
pub enum StateError {
    #[error("{component} no usable registry: the host is missing or has been destroyed")]
    MissingRegistry { component: Component },

    #[error("{component} key must be a non-empty string")]
    EmptyKey { component: Component },

    #[error("{component} invalid value for key '{key}': {message}")]
    Validation {
        component: Component,
        key: String,
        message: String,
    },

    #[error("{component} cannot patch '{key}': current value is not an object")]
    NotAnObject { component: Component, key: String },

    #[error("{component} unsupported event '{event}', only 'change' is supported")]
    UnsupportedEvent { component: Component, event: String },

    #[error("{component} key '{key}' holds a value that is not a {expected}")]
    TypeMismatch {
        component: Component,
        key: String,
        expected: &'static str,
    },

    #[error("{component} key '{key}' has no value yet")]
    Uninitialized { component: Component, key: String },

    #[error(
        "{component} cannot directly set computed state '{key}', update the source state instead"
    )]
    ReadOnly { component: Component, key: String },

    #[error("{component} failed to merge patch for '{key}': {source}")]
    Serde {
        component: Component,
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

impl StateError {
    pub fn component(&self) -> Component {
        match self {
            StateError::MissingRegistry { component }
            | StateError::EmptyKey { component }
            | StateError::Validation { component, .. }
            | StateError::NotAnObject { component, .. }
            | StateError::UnsupportedEvent { component, .. }
            | StateError::TypeMismatch { component, .. }
            | StateError::Uninitialized { component, .. }
            | StateError::ReadOnly { component, .. }
            | StateError::Serde { component, .. } => *component,
        }
    }
}

pub type Result<T, E = StateError> = std::result::Result<T, E>;

/// Failures of a [`BlobStorage`](crate::storage::BlobStorage). These never
/// reach callers of a state handle; persistence logs and drops them.
#[derive(thiserror::Error, Debug)]
pub enum StorageError {
    #[error("storage i/o failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage payload could not be (de)serialized: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("storage quota exceeded: {needed} bytes needed, {limit} allowed")]
    Quota { needed: usize, limit: usize },
}

/// Turns a panic payload into a printable message.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "Unknown panic".to_string()
    }
}
