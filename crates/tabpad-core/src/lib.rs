#![warn(missing_docs)]
//! Tabpad Core - headless document engine for a multi-tab text editor
//!
//! # Overview
//!
//! `tabpad-core` holds the per-tab editing state of a plain-text editor and everything derived
//! from it. It does no rendering and no file I/O: the host feeds edits in, calls `poll` from its
//! event loop, and reads back metrics, highlight results and a styled render tree.
//!
//! # Core Features
//!
//! - **Debounced highlighting**: lexing is delayed until typing pauses, optionally runs on a
//!   background thread, and late results for superseded text are discarded
//! - **Span caching**: the styled render tree is memoized on text, highlight result, style,
//!   whitespace mode and theme
//! - **Coalesced undo/redo**: bursts of typing become one history entry; undo/redo write-back
//!   and IME composition never pollute the history
//! - **Multi-tab workspace**: duplicate-path rejection, an unsaved-changes gate on close, and
//!   settings broadcast
//!
//! # Architecture Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  Workspace (tabs, save/close/settings)      │  ← Public API
//! ├─────────────────────────────────────────────┤
//! │  EditorDocument (edit flow, observers)      │  ← Per-tab state
//! ├──────────────┬──────────────┬───────────────┤
//! │ Highlight    │ SpanBuilder  │ HistoryStack  │  ← Derived state
//! ├──────────────┴──────────────┴───────────────┤
//! │  Text metrics (rope) + deadline timers      │  ← Foundations
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use std::time::{Duration, Instant};
//! use tabpad_core::{
//!     EditInput, HighlightNode, HighlightResult, LexError, Lexer, TextSelection, Workspace,
//! };
//!
//! let lexer: Arc<dyn Lexer> = Arc::new(|text: &str, _lang: &str| -> Result<HighlightResult, LexError> {
//!     Ok(HighlightResult::new(vec![HighlightNode::plain(text)]))
//! });
//! let mut workspace = Workspace::new(lexer);
//!
//! let t0 = Instant::now();
//! let tab = workspace.open_tab(None, "ab\ncd", t0).unwrap();
//! let doc = workspace.document_mut(tab).unwrap();
//! doc.apply_edit(EditInput::user("ab\ncd\nef", Some(TextSelection::collapsed(8))), t0);
//!
//! assert_eq!(doc.line_count(), 3);
//! assert_eq!((doc.cursor().line, doc.cursor().column), (3, 3));
//! assert!(doc.is_dirty());
//!
//! // Let the history window elapse.
//! workspace.poll(t0 + Duration::from_millis(500));
//! assert_eq!(workspace.document(tab).unwrap().history().undo_depth(), 1);
//! ```
//!
//! # Module Description
//!
//! - [`text`] - metrics and cursor derivation
//! - [`timer`] - deadline-based debounce timers
//! - [`highlight`] - lexer trait and highlight scheduling
//! - [`spans`] - theme table and render tree building
//! - [`history`] - coalescing undo/redo stack
//! - [`document`] - per-tab document state
//! - [`settings`] - editor settings
//! - [`search`] - find-in-document
//! - [`workspace`] - open tabs

pub mod document;
pub mod error;
pub mod highlight;
pub mod history;
pub mod search;
pub mod settings;
pub mod spans;
pub mod text;
pub mod timer;
pub mod workspace;

pub use document::{
    Composition, DocumentChange, DocumentChangeKind, DocumentContext, DocumentLifecycle,
    DocumentObserver, DocumentStats, EditInput, EditOrigin, EditorDocument, TextSelection,
};
pub use error::{LexError, SearchError, SettingsError, WorkspaceError};
pub use highlight::{
    DEFAULT_HIGHLIGHT_DEBOUNCE, HighlightConfig, HighlightEngine, HighlightMode, HighlightNode,
    HighlightResult, HighlightStats, Lexer, RequestDisposition,
};
pub use history::{DEFAULT_COALESCE_WINDOW, HistoryConfig, HistoryEntry, HistoryStack};
pub use search::{SearchMatch, SearchOptions, SearchQuery};
pub use settings::{EditorSettings, SettingsDiff};
pub use spans::{
    Color, FontSlant, FontWeight, RenderNode, RenderTree, RunStyle, SpanBuilder, SpanCacheStats,
    StyledRun, TextStyle, Theme, ThemeVariant,
};
pub use tabpad_lang::Language;
pub use text::{CursorPosition, LineIndex, TextMetrics};
pub use timer::Debouncer;
pub use workspace::{CloseOutcome, TabId, Workspace};
