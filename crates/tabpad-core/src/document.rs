//! Per-tab document state.
//!
//! [`EditorDocument`] owns the authoritative text of one tab and keeps every derived value in
//! sync with it: metrics, cursor, dirty flag, highlight result, undo history, and the cached
//! render tree.
//!
//! # Edit flow
//!
//! All text changes go through [`EditorDocument::apply_edit`] with an explicit [`EditInput`]:
//!
//! 1. metrics and the line index are rebuilt from the new text;
//! 2. the cursor is recomputed from the selection extent (an absent selection keeps the old
//!    cursor);
//! 3. the document becomes dirty;
//! 4. the highlight result is dropped and a debounced recompute is requested;
//! 5. finalized user edits feed the history coalescer; composing edits and programmatic edits
//!    (including undo/redo write-back) never do.
//!
//! Timers are driven by the host through [`EditorDocument::poll`].
//!
//! # Observers
//!
//! [`EditorDocument::subscribe`] registers callbacks that receive a [`DocumentChange`] after
//! each mutation. Callbacks only see the change record, never the document, so they cannot
//! re-enter it.

use crate::error::SearchError;
use crate::highlight::{
    HighlightConfig, HighlightEngine, HighlightResult, HighlightStats, Lexer, RequestDisposition,
};
use crate::history::{HistoryConfig, HistoryStack};
use crate::search::{SearchMatch, SearchOptions, SearchQuery};
use crate::settings::EditorSettings;
use crate::spans::{RenderTree, SpanBuilder, SpanCacheStats, TextStyle};
use crate::text::{CursorPosition, LineIndex, TextMetrics};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tabpad_lang::Language;
use tracing::{debug, trace, warn};

/// A selection as two character offsets. `extent` is the moving end and drives the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextSelection {
    /// Anchor offset.
    pub base: usize,
    /// Active offset.
    pub extent: usize,
}

impl TextSelection {
    /// A selection spanning `base..extent` (in either direction).
    pub fn new(base: usize, extent: usize) -> Self {
        Self { base, extent }
    }

    /// A caret at `offset`.
    pub fn collapsed(offset: usize) -> Self {
        Self {
            base: offset,
            extent: offset,
        }
    }

    /// Lower offset.
    pub fn start(&self) -> usize {
        self.base.min(self.extent)
    }

    /// Upper offset.
    pub fn end(&self) -> usize {
        self.base.max(self.extent)
    }

    /// Returns `true` if nothing is selected.
    pub fn is_collapsed(&self) -> bool {
        self.base == self.extent
    }

    fn clamped(self, char_count: usize) -> Self {
        Self {
            base: self.base.min(char_count),
            extent: self.extent.min(char_count),
        }
    }
}

/// Who caused an edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EditOrigin {
    /// Typed or pasted by the user. Finalized user edits are recorded in history.
    User,
    /// Written by the core or host (undo/redo restore, reload). Never recorded.
    Programmatic,
}

/// Input-method composition state of an edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Composition {
    /// No composition in progress.
    Finalized,
    /// An IME composition is in progress; the text is provisional.
    Active,
}

/// One edit delivered to [`EditorDocument::apply_edit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditInput {
    /// Full new text.
    pub text: String,
    /// New selection, or `None` if the host has no valid selection.
    pub selection: Option<TextSelection>,
    /// Who caused the edit.
    pub origin: EditOrigin,
    /// IME state.
    pub composition: Composition,
}

impl EditInput {
    /// A finalized user edit.
    pub fn user(text: impl Into<String>, selection: Option<TextSelection>) -> Self {
        Self {
            text: text.into(),
            selection,
            origin: EditOrigin::User,
            composition: Composition::Finalized,
        }
    }

    /// A user edit while an IME composition is active.
    pub fn composing(text: impl Into<String>, selection: Option<TextSelection>) -> Self {
        Self {
            text: text.into(),
            selection,
            origin: EditOrigin::User,
            composition: Composition::Active,
        }
    }

    /// A programmatic edit.
    pub fn programmatic(text: impl Into<String>, selection: Option<TextSelection>) -> Self {
        Self {
            text: text.into(),
            selection,
            origin: EditOrigin::Programmatic,
            composition: Composition::Finalized,
        }
    }
}

/// Document lifecycle.
///
/// `Created` only exists until the initial highlight pass has been dispatched; a loaded
/// document is `Clean`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentLifecycle {
    /// Constructed, initial highlight pass not yet issued.
    Created,
    /// Text matches what was last loaded or saved.
    Clean,
    /// Edited since load or the last save.
    Dirty,
    /// Torn down; all further mutations are ignored.
    Disposed,
}

/// What a [`DocumentChange`] notification is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentChangeKind {
    /// The text changed.
    TextChanged,
    /// Only the selection/cursor changed.
    SelectionChanged,
    /// A new highlight result was applied, or the result was cleared.
    HighlightChanged,
    /// A history entry was committed.
    HistoryCommitted,
    /// The document was marked saved.
    Saved,
    /// The file path (and possibly language) changed.
    PathChanged,
    /// New settings were applied.
    SettingsChanged,
    /// The document was disposed.
    Disposed,
}

/// Change notification delivered to observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentChange {
    /// What changed.
    pub kind: DocumentChangeKind,
    /// Text version after the change.
    pub version: u64,
    /// Dirty flag after the change.
    pub dirty: bool,
}

/// Observer callback type.
pub type DocumentObserver = Box<dyn FnMut(&DocumentChange) + Send>;

/// Shared collaborators and tuning used to create documents.
#[derive(Clone)]
pub struct DocumentContext {
    /// Lexer capability.
    pub lexer: Arc<dyn Lexer>,
    /// Current settings.
    pub settings: EditorSettings,
    /// Highlight scheduling.
    pub highlight: HighlightConfig,
    /// History coalescing.
    pub history: HistoryConfig,
}

impl std::fmt::Debug for DocumentContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentContext")
            .field("settings", &self.settings)
            .field("highlight", &self.highlight)
            .field("history", &self.history)
            .finish_non_exhaustive()
    }
}

impl DocumentContext {
    /// Default settings and timings around `lexer`.
    pub fn new(lexer: Arc<dyn Lexer>) -> Self {
        Self {
            lexer,
            settings: EditorSettings::default(),
            highlight: HighlightConfig::default(),
            history: HistoryConfig::default(),
        }
    }

    /// Replace the settings.
    pub fn with_settings(mut self, settings: EditorSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Replace the highlight configuration.
    pub fn with_highlight_config(mut self, config: HighlightConfig) -> Self {
        self.highlight = config;
        self
    }

    /// Replace the history configuration.
    pub fn with_history_config(mut self, config: HistoryConfig) -> Self {
        self.history = config;
        self
    }
}

/// Snapshot of derived document statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentStats {
    /// Text metrics.
    pub metrics: TextMetrics,
    /// Text version.
    pub version: u64,
    /// Undoable entries.
    pub undo_depth: usize,
    /// Redoable entries.
    pub redo_depth: usize,
}

/// The editable state of one tab.
pub struct EditorDocument {
    path: Option<String>,
    language: Language,
    text: Arc<str>,
    line_index: LineIndex,
    metrics: TextMetrics,
    selection: Option<TextSelection>,
    cursor: CursorPosition,
    lifecycle: DocumentLifecycle,
    version: u64,
    settings: EditorSettings,
    text_style: TextStyle,
    highlight: Option<Arc<HighlightResult>>,
    engine: HighlightEngine,
    history: HistoryStack,
    /// Text at the last finalized state, i.e. the "before" of the next recorded user edit.
    history_anchor: Arc<str>,
    spans: SpanBuilder,
    observers: Vec<DocumentObserver>,
}

impl std::fmt::Debug for EditorDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditorDocument")
            .field("path", &self.path)
            .field("language", &self.language)
            .field("lifecycle", &self.lifecycle)
            .field("version", &self.version)
            .field("metrics", &self.metrics)
            .field("cursor", &self.cursor)
            .field("highlighted", &self.highlight.is_some())
            .field("observers", &self.observers.len())
            .finish_non_exhaustive()
    }
}

impl EditorDocument {
    /// Load a document, classifying its language from `path` (plain text without a path).
    ///
    /// The initial highlight pass is issued immediately and the document starts `Clean`.
    pub fn load(
        path: Option<String>,
        text: impl Into<String>,
        context: &DocumentContext,
        now: Instant,
    ) -> Self {
        let language = path
            .as_deref()
            .map(Language::from_path)
            .unwrap_or_default();
        Self::load_with_language(path, language, text, context, now)
    }

    /// Load a document with an explicit language.
    pub fn load_with_language(
        path: Option<String>,
        language: Language,
        text: impl Into<String>,
        context: &DocumentContext,
        now: Instant,
    ) -> Self {
        let text: Arc<str> = Arc::from(text.into());
        let line_index = LineIndex::from_text(&text);
        let metrics = TextMetrics::from_text(&text);

        let mut doc = Self {
            path,
            language,
            text: text.clone(),
            line_index,
            metrics,
            selection: None,
            cursor: CursorPosition::default(),
            lifecycle: DocumentLifecycle::Created,
            version: 0,
            settings: context.settings.clone(),
            text_style: context.settings.text_style(),
            highlight: None,
            engine: HighlightEngine::new(context.lexer.clone(), context.highlight),
            history: HistoryStack::new(context.history),
            history_anchor: text,
            spans: SpanBuilder::new(),
            observers: Vec::new(),
        };

        debug!(
            path = doc.path.as_deref().unwrap_or("<untitled>"),
            language = language.id(),
            chars = doc.metrics.char_count,
            "document loaded"
        );
        doc.request_highlight(true, now);
        doc.lifecycle = DocumentLifecycle::Clean;
        doc
    }

    /// Current text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Current text as a shared snapshot (what a persistence collaborator should write).
    pub fn text_snapshot(&self) -> Arc<str> {
        self.text.clone()
    }

    /// File path, if any.
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// Language classification.
    pub fn language(&self) -> Language {
        self.language
    }

    /// Lifecycle state.
    pub fn lifecycle(&self) -> DocumentLifecycle {
        self.lifecycle
    }

    /// Returns `true` if the document has unsaved changes.
    pub fn is_dirty(&self) -> bool {
        self.lifecycle == DocumentLifecycle::Dirty
    }

    /// Returns `true` once [`dispose`](Self::dispose) has run.
    pub fn is_disposed(&self) -> bool {
        self.lifecycle == DocumentLifecycle::Disposed
    }

    /// Number of lines.
    pub fn line_count(&self) -> usize {
        self.metrics.line_count
    }

    /// Number of characters.
    pub fn char_count(&self) -> usize {
        self.metrics.char_count
    }

    /// 1-indexed cursor position.
    pub fn cursor(&self) -> CursorPosition {
        self.cursor
    }

    /// Current selection, if valid.
    pub fn selection(&self) -> Option<TextSelection> {
        self.selection
    }

    /// Text version, bumped on every text change.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Derived statistics.
    pub fn stats(&self) -> DocumentStats {
        DocumentStats {
            metrics: self.metrics,
            version: self.version,
            undo_depth: self.history.undo_depth(),
            redo_depth: self.history.redo_depth(),
        }
    }

    /// Current settings.
    pub fn settings(&self) -> &EditorSettings {
        &self.settings
    }

    /// Current highlight result. Always `None` between a text change and the next accepted
    /// recompute.
    pub fn highlight(&self) -> Option<&Arc<HighlightResult>> {
        self.highlight.as_ref()
    }

    /// Highlight engine counters.
    pub fn highlight_stats(&self) -> HighlightStats {
        self.engine.stats()
    }

    /// Span cache counters.
    pub fn span_cache_stats(&self) -> SpanCacheStats {
        self.spans.cache_stats()
    }

    /// Returns `true` if [`undo`](Self::undo) would change the text.
    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    /// Returns `true` if [`redo`](Self::redo) would change the text.
    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Read-only access to the history.
    pub fn history(&self) -> &HistoryStack {
        &self.history
    }

    /// Register a change observer.
    pub fn subscribe<F>(&mut self, callback: F)
    where
        F: FnMut(&DocumentChange) + Send + 'static,
    {
        self.observers.push(Box::new(callback));
    }

    /// Apply one edit. Returns `true` if the text changed.
    pub fn apply_edit(&mut self, input: EditInput, now: Instant) -> bool {
        if self.is_disposed() {
            warn!("edit ignored on disposed document");
            return false;
        }

        let EditInput {
            text,
            selection,
            origin,
            composition,
        } = input;

        let text_changed = *self.text != *text;
        if text_changed {
            self.replace_text(text);
        }

        let selection_changed = match selection {
            Some(selection) => self.set_selection_internal(selection),
            None => false,
        };

        if text_changed {
            self.lifecycle = DocumentLifecycle::Dirty;
            self.set_highlight(None);
            self.request_highlight(false, now);
        }

        match (origin, composition) {
            (EditOrigin::User, Composition::Finalized) => {
                if *self.history_anchor != *self.text {
                    self.history.observe(&self.history_anchor, &self.text, now);
                    self.history_anchor = self.text.clone();
                }
            }
            (EditOrigin::User, Composition::Active) => {
                trace!(version = self.version, "composing edit not recorded");
            }
            (EditOrigin::Programmatic, _) => {
                // A user burst must not span text the user never typed.
                if self.history.flush() {
                    self.notify(DocumentChangeKind::HistoryCommitted);
                }
                self.history_anchor = self.text.clone();
            }
        }

        if text_changed {
            self.notify(DocumentChangeKind::TextChanged);
        } else if selection_changed {
            self.notify(DocumentChangeKind::SelectionChanged);
        }
        text_changed
    }

    /// Move the selection without changing the text.
    pub fn set_selection(&mut self, selection: TextSelection) {
        if self.is_disposed() {
            return;
        }
        if self.set_selection_internal(selection) {
            self.notify(DocumentChangeKind::SelectionChanged);
        }
    }

    /// Undo the newest history entry. Returns `true` if the text changed.
    ///
    /// Any pending burst is committed first, so the most recent typing is what gets undone.
    pub fn undo(&mut self, now: Instant) -> bool {
        if self.is_disposed() {
            return false;
        }
        match self.history.undo() {
            Some(text) => self.restore(text, now),
            None => false,
        }
    }

    /// Redo the most recently undone entry. Returns `true` if the text changed.
    pub fn redo(&mut self, now: Instant) -> bool {
        if self.is_disposed() {
            return false;
        }
        match self.history.redo() {
            Some(text) => self.restore(text, now),
            None => false,
        }
    }

    fn restore(&mut self, text: String, now: Instant) -> bool {
        let char_count = text.chars().count();
        let selection = self
            .selection
            .map(|selection| selection.clamped(char_count))
            .unwrap_or_else(|| TextSelection::collapsed(char_count));
        self.apply_edit(EditInput::programmatic(text, Some(selection)), now)
    }

    /// Drive both timers and collect finished highlight work.
    ///
    /// Returns `true` if anything observable changed.
    pub fn poll(&mut self, now: Instant) -> bool {
        if self.is_disposed() {
            return false;
        }

        let mut changed = false;
        if self.history.poll(now) {
            self.notify(DocumentChangeKind::HistoryCommitted);
            changed = true;
        }
        if let Some(result) = self.engine.poll(&self.text, now) {
            self.set_highlight(Some(result));
            changed = true;
        }
        changed
    }

    /// Block until in-flight background highlighting finishes (or `timeout` elapses) and apply
    /// the result. Pending debounce timers are not fired.
    pub fn settle_highlight(&mut self, timeout: Duration) -> bool {
        if self.is_disposed() {
            return false;
        }
        match self.engine.settle(&self.text, timeout) {
            Some(result) => {
                self.set_highlight(Some(result));
                true
            }
            None => false,
        }
    }

    /// Earliest pending timer deadline, for hosts that sleep between polls.
    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.history.next_deadline(), self.engine.next_deadline()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Returns `true` if highlight work is scheduled or running.
    pub fn is_highlight_pending(&self) -> bool {
        self.engine.is_scheduled() || self.engine.has_in_flight()
    }

    /// Build (or reuse) the render tree for the current state.
    pub fn render_tree(&mut self) -> Arc<RenderTree> {
        self.spans.build(
            &self.text,
            self.highlight.as_ref(),
            &self.text_style,
            self.settings.whitespace_visible,
            self.settings.theme_variant,
        )
    }

    /// Apply new settings.
    ///
    /// Toggling highlighting or switching theme invalidates the span cache right away; toggling
    /// highlighting also issues an immediate (non-debounced) recompute, or clears the result
    /// when it was switched off.
    pub fn apply_settings(&mut self, settings: EditorSettings, now: Instant) {
        if self.is_disposed() {
            return;
        }
        let diff = self.settings.diff(&settings);
        if diff.is_empty() {
            return;
        }

        self.text_style = settings.text_style();
        self.settings = settings;
        if diff.invalidates_spans() {
            self.spans.invalidate();
        }
        if diff.requires_reparse() {
            self.set_highlight(None);
            self.request_highlight(true, now);
        }
        self.notify(DocumentChangeKind::SettingsChanged);
    }

    /// Find the next occurrence of `query` after the selection end, wrapping to the start, and
    /// select it.
    pub fn find_next(
        &mut self,
        query: &str,
        options: SearchOptions,
    ) -> Result<Option<SearchMatch>, SearchError> {
        let Some(query) = SearchQuery::new(query, options)? else {
            return Ok(None);
        };
        let from = self.selection.map_or(0, |selection| selection.end());
        let found = query.find_next_wrapping(&self.text, from);
        if let Some(found) = found {
            self.set_selection(TextSelection::new(found.start, found.end));
        }
        Ok(found)
    }

    /// Commit any pending history burst now. Returns `true` if an entry was added.
    pub fn commit_history(&mut self) -> bool {
        if self.is_disposed() || !self.history.flush() {
            return false;
        }
        self.notify(DocumentChangeKind::HistoryCommitted);
        true
    }

    /// Acknowledge a successful save: pending history is committed and the document is clean.
    pub fn mark_saved(&mut self) {
        if self.is_disposed() {
            return;
        }
        self.history.flush();
        self.lifecycle = DocumentLifecycle::Clean;
        debug!(
            path = self.path.as_deref().unwrap_or("<untitled>"),
            "document saved"
        );
        self.notify(DocumentChangeKind::Saved);
    }

    /// Assign a new path. A language change triggers an immediate highlight recompute.
    ///
    /// Only [`Workspace::rename_tab`](crate::Workspace::rename_tab) may call this, since the
    /// workspace keys its path index on it.
    pub(crate) fn set_path(&mut self, path: impl Into<String>, now: Instant) {
        if self.is_disposed() {
            return;
        }
        let path = path.into();
        let language = Language::from_path(&path);
        self.path = Some(path);
        if language != self.language {
            debug!(
                from = self.language.id(),
                to = language.id(),
                "language reclassified"
            );
            self.language = language;
            self.set_highlight(None);
            self.request_highlight(true, now);
        }
        self.notify(DocumentChangeKind::PathChanged);
    }

    /// Tear the document down: commit pending history, cancel timers and in-flight highlighting,
    /// and drop observers. Idempotent. Reached through [`crate::Workspace::close_tab`].
    pub(crate) fn dispose(&mut self) {
        if self.is_disposed() {
            return;
        }
        self.history.flush();
        self.engine.dispose();
        self.highlight = None;
        self.spans.invalidate();
        self.lifecycle = DocumentLifecycle::Disposed;
        self.notify(DocumentChangeKind::Disposed);
        self.observers.clear();
        trace!(
            path = self.path.as_deref().unwrap_or("<untitled>"),
            "document disposed"
        );
    }

    fn replace_text(&mut self, text: String) {
        self.text = Arc::from(text);
        self.line_index = LineIndex::from_text(&self.text);
        self.metrics = TextMetrics::from_text(&self.text);
        self.version += 1;
    }

    fn set_selection_internal(&mut self, selection: TextSelection) -> bool {
        let selection = selection.clamped(self.metrics.char_count);
        let cursor = self.line_index.cursor_at(selection.extent);
        let changed = self.selection != Some(selection) || self.cursor != cursor;
        self.selection = Some(selection);
        self.cursor = cursor;
        changed
    }

    fn request_highlight(&mut self, immediate: bool, now: Instant) {
        let disposition = self.engine.request(
            self.text.clone(),
            self.language,
            self.settings.highlight_enabled,
            immediate,
            now,
        );
        match disposition {
            RequestDisposition::Cleared => self.set_highlight(None),
            RequestDisposition::Dispatched => {
                // Inline parses complete synchronously; pick them up now.
                if let Some(result) = self.engine.poll(&self.text, now) {
                    self.set_highlight(Some(result));
                }
            }
            RequestDisposition::Scheduled => {}
        }
    }

    fn set_highlight(&mut self, result: Option<Arc<HighlightResult>>) {
        if self.highlight.is_none() && result.is_none() {
            return;
        }
        self.highlight = result;
        self.notify(DocumentChangeKind::HighlightChanged);
    }

    fn notify(&mut self, kind: DocumentChangeKind) {
        let change = DocumentChange {
            kind,
            version: self.version,
            dirty: self.is_dirty(),
        };
        for observer in &mut self.observers {
            observer(&change);
        }
    }
}
