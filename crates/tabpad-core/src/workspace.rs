//! Multi-tab workspace.
//!
//! A [`Workspace`] owns every open [`EditorDocument`], keyed by [`TabId`], together with the
//! shared [`DocumentContext`] (lexer, settings, timings) that new tabs are created from. It
//! tracks the active tab, rejects opening the same path twice, and routes the three outward
//! flows through caller-supplied collaborators:
//!
//! - **close**: an unsaved-changes gate consulted only for dirty documents;
//! - **save**: a persistence callback receiving `(path, text)`;
//! - **settings**: a broadcast to every open document.

use crate::document::{DocumentContext, EditorDocument};
use crate::error::WorkspaceError;
use crate::highlight::Lexer;
use crate::settings::EditorSettings;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::io;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Opaque identifier of an open tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TabId(u64);

impl TabId {
    /// The underlying numeric id.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Result of [`Workspace::close_tab`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseOutcome {
    /// The tab was disposed and removed.
    Closed,
    /// The unsaved-changes gate declined; the tab is still open.
    Kept,
}

/// The set of open tabs.
pub struct Workspace {
    context: DocumentContext,
    next_tab_id: u64,
    tabs: BTreeMap<TabId, EditorDocument>,
    path_to_tab: HashMap<String, TabId>,
    active: Option<TabId>,
}

impl fmt::Debug for Workspace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Workspace")
            .field("tab_count", &self.tabs.len())
            .field("path_count", &self.path_to_tab.len())
            .field("active", &self.active)
            .field("settings", &self.context.settings)
            .finish()
    }
}

impl Workspace {
    /// Create an empty workspace with default settings around `lexer`.
    pub fn new(lexer: Arc<dyn Lexer>) -> Self {
        Self::with_context(DocumentContext::new(lexer))
    }

    /// Create an empty workspace from an explicit context.
    pub fn with_context(context: DocumentContext) -> Self {
        Self {
            context,
            next_tab_id: 0,
            tabs: BTreeMap::new(),
            path_to_tab: HashMap::new(),
            active: None,
        }
    }

    /// Number of open tabs.
    pub fn len(&self) -> usize {
        self.tabs.len()
    }

    /// Returns `true` if no tab is open.
    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }

    /// Tab ids in opening order.
    pub fn tab_ids(&self) -> Vec<TabId> {
        self.tabs.keys().copied().collect()
    }

    /// Current settings.
    pub fn settings(&self) -> &EditorSettings {
        &self.context.settings
    }

    /// The active tab, if any.
    pub fn active_tab(&self) -> Option<TabId> {
        self.active
    }

    /// Make `id` the active tab.
    pub fn set_active_tab(&mut self, id: TabId) -> Result<(), WorkspaceError> {
        if !self.tabs.contains_key(&id) {
            return Err(WorkspaceError::TabNotFound(id));
        }
        self.active = Some(id);
        Ok(())
    }

    /// Tab holding `path`, if open.
    pub fn tab_for_path(&self, path: &str) -> Option<TabId> {
        self.path_to_tab.get(path).copied()
    }

    /// Borrow a document.
    pub fn document(&self, id: TabId) -> Option<&EditorDocument> {
        self.tabs.get(&id)
    }

    /// Mutably borrow a document (for edits, undo/redo, find).
    pub fn document_mut(&mut self, id: TabId) -> Option<&mut EditorDocument> {
        self.tabs.get_mut(&id)
    }

    /// Tabs with unsaved changes.
    pub fn dirty_tabs(&self) -> Vec<TabId> {
        self.tabs
            .iter()
            .filter(|(_, doc)| doc.is_dirty())
            .map(|(id, _)| *id)
            .collect()
    }

    /// Open a new tab and make it active.
    ///
    /// Fails with [`WorkspaceError::PathAlreadyOpen`] if another tab holds `path`.
    pub fn open_tab(
        &mut self,
        path: Option<String>,
        text: impl Into<String>,
        now: Instant,
    ) -> Result<TabId, WorkspaceError> {
        if let Some(path) = path.as_ref()
            && self.path_to_tab.contains_key(path)
        {
            return Err(WorkspaceError::PathAlreadyOpen(path.clone()));
        }

        let id = TabId(self.next_tab_id);
        self.next_tab_id = self.next_tab_id.saturating_add(1);

        let doc = EditorDocument::load(path.clone(), text, &self.context, now);
        debug!(tab = %id, language = doc.language().id(), "tab opened");
        self.tabs.insert(id, doc);
        if let Some(path) = path {
            self.path_to_tab.insert(path, id);
        }
        self.active = Some(id);
        Ok(id)
    }

    /// Close a tab.
    ///
    /// `confirm` is the unsaved-changes gate: it runs only if the document is dirty, and a
    /// `false` answer keeps the tab open. Once confirmed the document is disposed (timers and
    /// in-flight highlighting cancelled) before it is dropped.
    pub fn close_tab<F>(&mut self, id: TabId, confirm: F) -> Result<CloseOutcome, WorkspaceError>
    where
        F: FnOnce(&EditorDocument) -> bool,
    {
        let Some(doc) = self.tabs.get(&id) else {
            return Err(WorkspaceError::TabNotFound(id));
        };
        if doc.is_dirty() && !confirm(doc) {
            debug!(tab = %id, "close cancelled");
            return Ok(CloseOutcome::Kept);
        }

        let Some(mut doc) = self.tabs.remove(&id) else {
            return Err(WorkspaceError::TabNotFound(id));
        };
        if let Some(path) = doc.path() {
            self.path_to_tab.remove(path);
        }
        doc.dispose();

        if self.active == Some(id) {
            self.active = self
                .tabs
                .range(..id)
                .next_back()
                .or_else(|| self.tabs.range(id..).next())
                .map(|(next, _)| *next);
        }
        debug!(tab = %id, "tab closed");
        Ok(CloseOutcome::Closed)
    }

    /// Save a tab through `persist(path, text)`.
    ///
    /// Pending history is committed first. On success the document is marked clean; on failure
    /// it stays dirty and the I/O error is returned.
    pub fn save_tab<F>(&mut self, id: TabId, persist: F) -> Result<(), WorkspaceError>
    where
        F: FnOnce(&str, &str) -> io::Result<()>,
    {
        let Some(doc) = self.tabs.get_mut(&id) else {
            return Err(WorkspaceError::TabNotFound(id));
        };
        let Some(path) = doc.path().map(str::to_string) else {
            return Err(WorkspaceError::NoPath(id));
        };

        doc.commit_history();
        let text = doc.text_snapshot();
        match persist(path.as_str(), &*text) {
            Ok(()) => {
                doc.mark_saved();
                Ok(())
            }
            Err(source) => {
                warn!(tab = %id, path = %path, error = %source, "save failed");
                Err(WorkspaceError::Persist { path, source })
            }
        }
    }

    /// Assign a new path to a tab (reclassifying its language).
    pub fn rename_tab(
        &mut self,
        id: TabId,
        path: impl Into<String>,
        now: Instant,
    ) -> Result<(), WorkspaceError> {
        let path = path.into();
        let Some(doc) = self.tabs.get_mut(&id) else {
            return Err(WorkspaceError::TabNotFound(id));
        };
        if doc.path() == Some(path.as_str()) {
            return Ok(());
        }
        if self.path_to_tab.contains_key(&path) {
            return Err(WorkspaceError::PathAlreadyOpen(path));
        }

        if let Some(previous) = doc.path() {
            self.path_to_tab.remove(previous);
        }
        self.path_to_tab.insert(path.clone(), id);
        doc.set_path(path, now);
        Ok(())
    }

    /// Rename then save, the "save as" flow.
    pub fn save_tab_as<F>(
        &mut self,
        id: TabId,
        path: impl Into<String>,
        persist: F,
        now: Instant,
    ) -> Result<(), WorkspaceError>
    where
        F: FnOnce(&str, &str) -> io::Result<()>,
    {
        self.rename_tab(id, path, now)?;
        self.save_tab(id, persist)
    }

    /// Broadcast new settings to every open document and keep them for new tabs.
    pub fn apply_settings(&mut self, settings: EditorSettings, now: Instant) {
        let diff = self.context.settings.diff(&settings);
        if diff.is_empty() {
            return;
        }
        debug!(?diff, tabs = self.tabs.len(), "applying settings");
        for doc in self.tabs.values_mut() {
            doc.apply_settings(settings.clone(), now);
        }
        self.context.settings = settings;
    }

    /// Tick every document. Returns the tabs whose observable state changed.
    pub fn poll(&mut self, now: Instant) -> Vec<TabId> {
        self.tabs
            .iter_mut()
            .filter_map(|(id, doc)| doc.poll(now).then_some(*id))
            .collect()
    }

    /// Earliest pending timer deadline across all tabs.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.tabs
            .values()
            .filter_map(EditorDocument::next_deadline)
            .min()
    }
}
