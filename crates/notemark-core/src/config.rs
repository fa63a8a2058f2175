//! Editor configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::block::EncodeOptions;
use crate::error::{ConfigError, NoteError};
use crate::history::DEFAULT_CAPACITY;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Snapshots kept by the history stack.
    pub history_capacity: usize,
    /// Typing within this window of the previous keystroke extends the
    /// current snapshot. 0 disables.
    pub coalesce_window_ms: u64,
    /// Quiet period before a changed note is handed to storage.
    pub autosave_debounce_ms: u64,
    /// Marker written for bullet items.
    pub unordered_marker: char,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            history_capacity: DEFAULT_CAPACITY,
            coalesce_window_ms: 500,
            autosave_debounce_ms: 500,
            unordered_marker: '-',
        }
    }
}

impl EditorConfig {
    pub fn from_json_str(text: &str) -> Result<Self, NoteError> {
        Self::parse_named("config", text)
    }

    /// Load from a JSON file. Missing fields take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, NoteError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        Self::parse_named(&path.display().to_string(), &text)
    }

    fn parse_named(name: &str, text: &str) -> Result<Self, NoteError> {
        let config: Self = serde_json::from_str(text)
            .map_err(|e| ConfigError::from_json(name, text, e))?;
        Ok(config.sanitized())
    }

    /// Replace values that cannot be honoured with the nearest valid ones.
    fn sanitized(mut self) -> Self {
        self.history_capacity = self.history_capacity.max(1);
        if !matches!(self.unordered_marker, '-' | '*' | '+') {
            tracing::warn!(
                marker = %self.unordered_marker,
                "unsupported bullet marker, using '-'"
            );
            self.unordered_marker = '-';
        }
        self
    }

    pub fn coalesce_window(&self) -> Duration {
        Duration::from_millis(self.coalesce_window_ms)
    }

    pub fn autosave_debounce(&self) -> Duration {
        Duration::from_millis(self.autosave_debounce_ms)
    }

    pub fn encode_options(&self) -> EncodeOptions {
        EncodeOptions {
            bullet_marker: self.unordered_marker,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EditorConfig::default();
        assert_eq!(config.history_capacity, 50);
        assert_eq!(config.autosave_debounce(), Duration::from_millis(500));
        assert_eq!(config.coalesce_window(), Duration::from_millis(500));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = EditorConfig::from_json_str(r#"{ "history_capacity": 10 }"#).unwrap();
        assert_eq!(config.history_capacity, 10);
        assert_eq!(config.unordered_marker, '-');
    }

    #[test]
    fn test_coalescing_can_be_disabled() {
        let config = EditorConfig::from_json_str(r#"{ "coalesce_window_ms": 0 }"#).unwrap();
        assert!(config.coalesce_window().is_zero());
    }

    #[test]
    fn test_sanitizes_values() {
        let config =
            EditorConfig::from_json_str(r#"{ "history_capacity": 0, "unordered_marker": "x" }"#)
                .unwrap();
        assert_eq!(config.history_capacity, 1);
        assert_eq!(config.encode_options().bullet_marker, '-');
    }

    #[test]
    fn test_bad_json_is_config_error() {
        let err = EditorConfig::from_json_str("{ nope").unwrap_err();
        assert!(matches!(err, NoteError::Config(_)));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = EditorConfig::load("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, NoteError::Io(_)));
    }
}
