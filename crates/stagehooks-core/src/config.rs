use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use web_time::Duration;

/// Process-wide defaults consumed by [`Game::new`](crate::Game::new).
///
/// ```rust
/// use stagehooks_core::GameConfig;
///
/// let cfg = GameConfig::from_json(r#"{ "history_size": 25 }"#).unwrap();
/// assert_eq!(cfg.history_size, 25);
/// assert_eq!(cfg.debounce_ms, 300);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Default bound on undoable history entries.
    pub history_size: usize,
    /// Default quiet window for debounced state, in milliseconds.
    pub debounce_ms: u64,
    /// Directory for the durable blob store. `None` keeps durable data in
    /// memory.
    pub storage_dir: Option<PathBuf>,
    /// Starts every handle in debug mode unless its options say otherwise.
    pub debug: bool,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            history_size: 10,
            debounce_ms: 300,
            storage_dir: None,
            debug: false,
        }
    }
}

impl GameConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn debounce_delay(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}
