//! Error types for the fallible edges: storage and configuration.
//!
//! The codecs, the session and history never fail; malformed markdown
//! degrades to literal text instead.

use miette::{Diagnostic, NamedSource, SourceOffset, SourceSpan};

/// Main error type for notemark operations
#[derive(thiserror::Error, Debug, Diagnostic)]
pub enum NoteError {
    /// IO error
    #[error(transparent)]
    #[diagnostic(code(notemark::io))]
    Io(#[from] std::io::Error),

    /// No note with this id in the store
    #[error("note not found: {0}")]
    #[diagnostic(code(notemark::not_found))]
    NoteNotFound(String),

    /// Note ids must be a single path component
    #[error("invalid note id: {0:?}")]
    #[diagnostic(
        code(notemark::invalid_id),
        help("note ids are file stems and cannot contain path separators")
    )]
    InvalidNoteId(String),

    /// Config could not be parsed
    #[error(transparent)]
    #[diagnostic_source]
    Config(#[from] ConfigError),
}

/// Config parse error with source location information
#[derive(thiserror::Error, Debug, Diagnostic)]
#[error("invalid config: {message}")]
#[diagnostic(code(notemark::config))]
pub struct ConfigError {
    message: String,
    #[source_code]
    src: NamedSource<String>,
    #[label("here")]
    location: SourceSpan,
    #[source]
    source: serde_json::Error,
}

impl ConfigError {
    /// Wrap a serde_json error, pointing at the line and column it reports.
    pub fn from_json(name: impl AsRef<str>, text: &str, source: serde_json::Error) -> Self {
        // serde_json lines and columns are 1-based; a line of 0 means EOF.
        let offset = match source.line() {
            0 => SourceOffset::from(text.len()),
            line => SourceOffset::from_location(text, line, source.column().max(1)),
        };
        Self {
            message: source.to_string(),
            src: NamedSource::new(name, text.to_string()),
            location: SourceSpan::new(offset, 0),
            source,
        }
    }

    pub fn location(&self) -> SourceSpan {
        self.location
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_points_at_location() {
        let text = "{\n  \"a\": }";
        let source = serde_json::from_str::<serde_json::Value>(text)
            .err()
            .expect("invalid json");
        let err = ConfigError::from_json("config.json", text, source);
        assert!(err.to_string().starts_with("invalid config"));
        // Line 2, somewhere after the key.
        assert!(err.location().offset() > 2);
    }

    #[test]
    fn test_invalid_id_message() {
        let err = NoteError::InvalidNoteId("../x".into());
        assert_eq!(err.to_string(), "invalid note id: \"../x\"");
    }
}
