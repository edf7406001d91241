//! # Scene state, change events, and history
//!
//! `stagehooks-core` gives scene-based games a small hooks-style state layer
//! on top of a key-value registry with per-key change events. There are three
//! main pieces:
//!
//! - [`Registry`]: where values and listeners live. A [`Scene`] owns one,
//!   the [`Game`] owns a process-wide one, and [`GlobalStore`] is a standalone
//!   map for hosts without scenes.
//! - [`StateHandle<T>`]: a typed, non-caching view of one registry key.
//! - Wrappers implementing [`HookState`] by composing a handle:
//!   [`ComputedState`], [`DebouncedState`], [`PersistentState`] and
//!   [`UndoableState`].
//!
//! ## Scoped and global state
//!
//! ```rust
//! use stagehooks_core::*;
//!
//! let game = Game::new(GameConfig::default());
//! let scene = game.add_scene("Level1");
//!
//! let score = with_local_state(&scene, "score", 0u32, StateOptions::new()).unwrap();
//! score.on(StateEvent::Change, |new: &u32, old: &u32| println!("score {old} -> {new}"));
//! score.update(|s| s + 10).unwrap();
//! assert_eq!(score.get(), Some(10));
//!
//! // Same key, same scene: same value.
//! let again = with_local_state(&scene, "score", 999u32, StateOptions::new()).unwrap();
//! assert_eq!(again.get(), Some(10));
//! ```
//!
//! Change listeners run synchronously, in subscription order, before `set`
//! returns. The base handle notifies on every write, even when the value is
//! unchanged; only computed state suppresses no-op changes.
//!
//! ## Validation
//!
//! ```rust
//! use stagehooks_core::*;
//!
//! let game = Game::new(GameConfig::default());
//! let scene = game.add_scene("Shop");
//! let gold = with_local_state(
//!     &scene,
//!     "gold",
//!     50i64,
//!     StateOptions::new().validator(|g: &i64| if *g < 0 { Err("gold cannot be negative".into()) } else { Ok(()) }),
//! )
//! .unwrap();
//!
//! assert!(gold.set(-1).is_err());
//! assert_eq!(gold.get(), Some(50));
//! ```
//!
//! ## Lifetimes
//!
//! Scoped values, their listeners, and every listener or timer a wrapper
//! created for the scene go away in [`Scene::destroy`]. Global values live as
//! long as the [`Game`]; [`Game::reset`] wipes them for test isolation.

pub mod computed;
pub mod config;
pub mod debounced;
pub mod emitter;
pub mod error;
pub mod global_store;
pub mod host;
pub mod merge;
pub mod persistent;
pub mod prelude;
pub mod registry;
pub mod scope;
pub mod scoping;
pub mod state;
pub mod storage;
pub mod subscription;
pub mod time;
pub mod undoable;

pub use computed::*;
pub use config::*;
pub use debounced::*;
pub use emitter::*;
pub use error::*;
pub use global_store::*;
pub use host::*;
pub use persistent::*;
pub use registry::*;
pub use scope::*;
pub use scoping::*;
pub use state::*;
pub use storage::*;
pub use subscription::*;
pub use time::*;
pub use undoable::*;
