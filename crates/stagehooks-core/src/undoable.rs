//! # Undo / redo
//!
//! [`UndoableState`] keeps a linear, bounded timeline of past values next to
//! the value itself. The timeline and its cursor are ordinary scene state
//! (`<key>:history` and `<key>:historyIndex`), so they share the value's
//! namespacing and die with the scene.
//!
//! - The entry at the cursor always equals the current value.
//! - Writing after an undo drops every entry past the cursor.
//! - When the bound is exceeded the oldest entry is evicted, never the newest.
//!
//! ```rust
//! use stagehooks_core::*;
//!
//! let game = Game::new(GameConfig::default());
//! let scene = game.add_scene("Editor");
//! let brush = with_undoable_state(&scene, "brush", 1u8, Some(10), StateOptions::new()).unwrap();
//!
//! brush.set(4).unwrap();
//! assert!(brush.undo());
//! assert_eq!(brush.get(), Some(1));
//! assert!(brush.redo());
//! assert_eq!(brush.get(), Some(4));
//! ```

use crate::emitter::ListenerId;
use crate::error::{Component, Result, StateError};
use crate::host::Scene;
use crate::scoping::local_handle;
use crate::state::{HookState, StateEvent, StateHandle, StateOptions};
use crate::subscription::Subscription;

pub struct UndoableState<T> {
    value: StateHandle<T>,
    history: StateHandle<Vec<T>>,
    cursor: StateHandle<usize>,
    max_history: usize,
}

impl<T> Clone for UndoableState<T> {
    fn clone(&self) -> Self {
        Self {
            value: self.value.clone(),
            history: self.history.clone(),
            cursor: self.cursor.clone(),
            max_history: self.max_history,
        }
    }
}

/// `max_history_size` falls back to [`GameConfig::history_size`](crate::GameConfig).
pub fn with_undoable_state<T: Clone + 'static>(
    scene: &Scene,
    key: &str,
    initial: T,
    max_history_size: Option<usize>,
    options: StateOptions<T>,
) -> Result<UndoableState<T>> {
    let debug = options.debug;
    let value = local_handle(Component::UndoableState, scene, key, initial, options)?;
    let current = value.get().ok_or_else(|| StateError::Uninitialized {
        component: Component::UndoableState,
        key: value.key().to_string(),
    })?;

    let history = local_handle(
        Component::UndoableState,
        scene,
        &format!("{key}:history"),
        vec![current],
        aux_options(debug),
    )?;
    let cursor = local_handle(
        Component::UndoableState,
        scene,
        &format!("{key}:historyIndex"),
        0usize,
        aux_options(debug),
    )?;

    let requested = max_history_size.unwrap_or(scene.game().config().history_size);
    if requested == 0 {
        log::warn!(
            target: "stagehooks",
            "[undoable_state] history size 0 for '{key}' is not usable, keeping 1 entry"
        );
    }

    Ok(UndoableState {
        value,
        history,
        cursor,
        max_history: requested.max(1),
    })
}

// timeline handles follow the value's debug setting, never its validator
fn aux_options<U>(debug: Option<bool>) -> StateOptions<U> {
    match debug {
        Some(on) => StateOptions::new().debug(on),
        None => StateOptions::new(),
    }
}

impl<T: Clone + 'static> UndoableState<T> {
    pub fn max_history_size(&self) -> usize {
        self.max_history
    }

    /// The timeline and a cursor within it. A timeline that was cleared from
    /// outside is rebuilt from the current value.
    fn timeline(&self) -> (Vec<T>, usize) {
        let mut seq = self.history.get().unwrap_or_default();
        if seq.is_empty()
            && let Some(current) = self.value.get()
        {
            seq.push(current);
        }
        let cursor = self
            .cursor
            .get()
            .unwrap_or(0)
            .min(seq.len().saturating_sub(1));
        (seq, cursor)
    }

    /// Steps back one entry. `false` (and no change) at the oldest entry.
    pub fn undo(&self) -> bool {
        let (seq, cursor) = self.timeline();
        if cursor == 0 {
            return false;
        }
        self.move_to(seq, cursor - 1);
        true
    }

    /// Steps forward one entry. `false` (and no change) at the newest entry.
    pub fn redo(&self) -> bool {
        let (seq, cursor) = self.timeline();
        if cursor + 1 >= seq.len() {
            return false;
        }
        self.move_to(seq, cursor + 1);
        true
    }

    fn move_to(&self, mut seq: Vec<T>, cursor: usize) {
        let value = seq.swap_remove(cursor);
        self.cursor.commit(cursor);
        self.value.commit(value);
    }

    pub fn can_undo(&self) -> bool {
        self.timeline().1 > 0
    }

    pub fn can_redo(&self) -> bool {
        let (seq, cursor) = self.timeline();
        cursor + 1 < seq.len()
    }

    /// Keeps only the current value; past and future entries are dropped.
    pub fn clear_history(&self) {
        let seq = match self.value.get() {
            Some(current) => vec![current],
            None => Vec::new(),
        };
        self.history.commit(seq);
        self.cursor.commit(0);
    }

    pub fn history(&self) -> Vec<T> {
        self.timeline().0
    }

    pub fn cursor(&self) -> usize {
        self.timeline().1
    }
}

impl<T: Clone + 'static> HookState<T> for UndoableState<T> {
    fn key(&self) -> &str {
        self.value.key()
    }

    fn component(&self) -> Component {
        Component::UndoableState
    }

    fn get(&self) -> Option<T> {
        self.value.get()
    }

    /// Records `value` as a new history step, pruning any redo branch.
    fn set(&self, value: T) -> Result<()> {
        self.value.ensure_open()?;
        self.value.validate(&value)?;

        let (mut seq, cursor) = self.timeline();
        seq.truncate(cursor + 1);
        seq.push(value.clone());
        if seq.len() > self.max_history {
            let excess = seq.len() - self.max_history;
            seq.drain(..excess);
        }
        let cursor = seq.len() - 1;

        self.history.commit(seq);
        self.cursor.commit(cursor);
        self.value.commit(value);
        Ok(())
    }

    fn on(&self, event: StateEvent, callback: impl Fn(&T, &T) + 'static) -> Subscription {
        self.value.on(event, callback)
    }

    fn once(&self, event: StateEvent, callback: impl Fn(&T, &T) + 'static) -> Subscription {
        self.value.once(event, callback)
    }

    fn off(&self, event: StateEvent, id: ListenerId) -> bool {
        self.value.off(event, id)
    }

    fn clear_listeners(&self) {
        self.value.clear_listeners();
    }
}
