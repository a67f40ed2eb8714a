//! Error types surfaced by the core.
//!
//! The core never presents errors itself. Highlighting failures are swallowed inside the
//! engine; everything else is reported to the caller as one of these values.

use crate::workspace::TabId;
use thiserror::Error;

/// A lexer failed to produce a highlight tree.
///
/// Never propagated past [`crate::HighlightEngine`]; it only appears in logs and stats.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("lexer failed: {message}")]
pub struct LexError {
    /// Human-readable failure description.
    pub message: String,
}

impl LexError {
    /// Create a new lexer error.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Errors produced when loading [`crate::EditorSettings`].
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The settings document was not valid JSON for the settings schema.
    #[error("invalid settings: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Workspace-level errors.
#[derive(Debug, Error)]
pub enum WorkspaceError {
    /// A tab id was not found (already closed or never opened).
    #[error("tab {0} not found")]
    TabNotFound(TabId),
    /// Another tab already holds this path.
    #[error("{0} is already open")]
    PathAlreadyOpen(String),
    /// The document has no path to save to.
    #[error("tab {0} has no file path")]
    NoPath(TabId),
    /// The persistence collaborator reported a failure.
    #[error("failed to save {path}: {source}")]
    Persist {
        /// Target path.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Search errors.
#[derive(Debug, Error)]
pub enum SearchError {
    /// The query was used as a regular expression and failed to compile.
    #[error("invalid search pattern: {0}")]
    InvalidRegex(#[from] regex::Error),
}
