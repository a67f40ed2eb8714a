//! Debounced, cancellable syntax highlighting.
//!
//! # Overview
//!
//! The actual lexing is an external capability behind the [`Lexer`] trait: a synchronous, pure
//! `parse(text, language)` that returns a [`HighlightResult`] tree. [`HighlightEngine`] wraps it
//! with the scheduling rules a live editor needs:
//!
//! - **Debounce**: non-immediate requests wait for a quiet period (200 ms by default); every new
//!   request resets the timer and only the last one is parsed.
//! - **Offload**: in [`HighlightMode::Worker`] parsing runs on a background thread. Requests that
//!   pile up while the worker is busy are coalesced so only the newest one is parsed.
//! - **Stale-result rejection**: every dispatched job carries a generation number and the exact
//!   text it was given. A completion is dropped unless it belongs to the latest dispatch *and*
//!   its text still equals the document text.
//! - **Best effort**: lexer errors and lexer panics are swallowed. The previous (or absent)
//!   result stays in place and nothing is surfaced to the user.
//!
//! The engine never owns the document text. Callers pass the current text to
//! [`HighlightEngine::poll`], which is where completed results are validated.

use crate::error::LexError;
use crate::timer::Debouncer;
use std::collections::VecDeque;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};
use tabpad_lang::Language;
use tracing::{debug, trace, warn};

/// Default quiet period before a debounced highlight request is parsed.
pub const DEFAULT_HIGHLIGHT_DEBOUNCE: Duration = Duration::from_millis(200);

/// One node of a highlight tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HighlightNode {
    /// A literal substring of the source, optionally tagged with a semantic class.
    Leaf {
        /// The source text covered by this leaf.
        text: String,
        /// Semantic class tag (e.g. `"keyword"`), or `None` for untagged text.
        class: Option<String>,
    },
    /// A tagged group of child nodes (e.g. a `comment` containing a `doctag`).
    Node {
        /// Semantic class tag applied to all children unless they override it.
        class: Option<String>,
        /// Ordered children.
        children: Vec<HighlightNode>,
    },
}

impl HighlightNode {
    /// An untagged leaf.
    pub fn plain(text: impl Into<String>) -> Self {
        HighlightNode::Leaf {
            text: text.into(),
            class: None,
        }
    }

    /// A tagged leaf.
    pub fn tagged(class: impl Into<String>, text: impl Into<String>) -> Self {
        HighlightNode::Leaf {
            text: text.into(),
            class: Some(class.into()),
        }
    }

    /// A tagged group.
    pub fn group(class: impl Into<String>, children: Vec<HighlightNode>) -> Self {
        HighlightNode::Node {
            class: Some(class.into()),
            children,
        }
    }

    /// The semantic class tag of this node.
    pub fn class(&self) -> Option<&str> {
        match self {
            HighlightNode::Leaf { class, .. } | HighlightNode::Node { class, .. } => {
                class.as_deref()
            }
        }
    }

    fn push_text(&self, out: &mut String) {
        match self {
            HighlightNode::Leaf { text, .. } => out.push_str(text),
            HighlightNode::Node { children, .. } => {
                for child in children {
                    child.push_text(out);
                }
            }
        }
    }
}

/// A highlight tree produced by a [`Lexer`] for one `(text, language)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HighlightResult {
    /// Top-level nodes, in source order.
    pub nodes: Vec<HighlightNode>,
}

impl HighlightResult {
    /// Wrap a list of top-level nodes.
    pub fn new(nodes: Vec<HighlightNode>) -> Self {
        Self { nodes }
    }

    /// Concatenated text of every leaf, in order.
    ///
    /// For a well-behaved lexer this equals the parsed source.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for node in &self.nodes {
            node.push_text(&mut out);
        }
        out
    }
}

/// The external lexer capability.
///
/// Implementations must be pure: the same `(text, language)` always yields the same tree.
/// `parse` may be called from a worker thread.
pub trait Lexer: Send + Sync {
    /// Parse `text` as `language` (a [`Language::id`] string).
    fn parse(&self, text: &str, language: &str) -> Result<HighlightResult, LexError>;
}

impl<F> Lexer for F
where
    F: Fn(&str, &str) -> Result<HighlightResult, LexError> + Send + Sync,
{
    fn parse(&self, text: &str, language: &str) -> Result<HighlightResult, LexError> {
        self(text, language)
    }
}

/// Where highlight computation runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HighlightMode {
    /// Parse on the calling thread when the request is dispatched.
    Inline,
    /// Parse on a dedicated background thread (one per engine).
    #[default]
    Worker,
}

/// Highlight scheduling configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HighlightConfig {
    /// Quiet period for non-immediate requests.
    pub debounce: Duration,
    /// Inline or worker-thread parsing.
    pub mode: HighlightMode,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_HIGHLIGHT_DEBOUNCE,
            mode: HighlightMode::default(),
        }
    }
}

/// Counters describing what the engine has done so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HighlightStats {
    /// Jobs handed to the lexer (inline or worker).
    pub dispatched: u64,
    /// Results accepted by [`HighlightEngine::poll`].
    pub applied: u64,
    /// Results dropped because newer input superseded them.
    pub discarded_stale: u64,
    /// Lexer errors and panics.
    pub failures: u64,
}

/// What [`HighlightEngine::request`] did with a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestDisposition {
    /// Highlighting does not apply (disabled or plain text). Any in-flight work was cancelled
    /// and the caller should drop its current result.
    Cleared,
    /// The debounce timer was (re)armed.
    Scheduled,
    /// The request was dispatched to the lexer right away.
    Dispatched,
}

#[derive(Debug)]
struct PendingRequest {
    text: Arc<str>,
    language: Language,
}

struct HighlightJob {
    generation: u64,
    text: Arc<str>,
    language: Language,
}

struct Completed {
    generation: u64,
    text: Arc<str>,
    outcome: Result<HighlightResult, LexError>,
}

struct HighlightWorker {
    tx: mpsc::Sender<HighlightJob>,
    rx: mpsc::Receiver<Completed>,
}

/// Debounced, cancellable highlight scheduler for a single document.
pub struct HighlightEngine {
    lexer: Arc<dyn Lexer>,
    config: HighlightConfig,
    timer: Debouncer,
    pending: Option<PendingRequest>,
    generation: u64,
    in_flight: Option<u64>,
    inline_done: VecDeque<Completed>,
    worker: Option<HighlightWorker>,
    stats: HighlightStats,
}

impl std::fmt::Debug for HighlightEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HighlightEngine")
            .field("config", &self.config)
            .field("generation", &self.generation)
            .field("in_flight", &self.in_flight)
            .field("pending", &self.pending.is_some())
            .field("stats", &self.stats)
            .finish()
    }
}

impl HighlightEngine {
    /// Create an engine around a lexer.
    pub fn new(lexer: Arc<dyn Lexer>, config: HighlightConfig) -> Self {
        Self {
            lexer,
            config,
            timer: Debouncer::new(config.debounce),
            pending: None,
            generation: 0,
            in_flight: None,
            inline_done: VecDeque::new(),
            worker: None,
            stats: HighlightStats::default(),
        }
    }

    /// The active configuration.
    pub fn config(&self) -> HighlightConfig {
        self.config
    }

    /// Counters for observability and tests.
    pub fn stats(&self) -> HighlightStats {
        self.stats
    }

    /// Returns `true` if a debounced request is waiting for its timer.
    pub fn is_scheduled(&self) -> bool {
        self.timer.is_armed()
    }

    /// Deadline of the pending debounced request, if any.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.timer.deadline()
    }

    /// Returns `true` if a dispatched job has not completed yet.
    pub fn has_in_flight(&self) -> bool {
        self.in_flight.is_some() || !self.inline_done.is_empty()
    }

    /// Submit a highlight request for `text`.
    ///
    /// - Disabled highlighting or plain text cancels everything and returns
    ///   [`RequestDisposition::Cleared`].
    /// - `immediate` dispatches now; otherwise the debounce timer is reset and only the last
    ///   request inside the quiet period is parsed.
    pub fn request(
        &mut self,
        text: Arc<str>,
        language: Language,
        enabled: bool,
        immediate: bool,
        now: Instant,
    ) -> RequestDisposition {
        if !enabled || language.is_plain_text() {
            self.cancel();
            return RequestDisposition::Cleared;
        }

        self.pending = Some(PendingRequest { text, language });
        if immediate {
            self.timer.cancel();
            self.dispatch();
            RequestDisposition::Dispatched
        } else {
            self.timer.schedule(now);
            RequestDisposition::Scheduled
        }
    }

    /// Cancel the pending timer and invalidate any in-flight job.
    ///
    /// A job already running on the worker thread still finishes, but its result is discarded.
    pub fn cancel(&mut self) {
        self.timer.cancel();
        self.pending = None;
        self.inline_done.clear();
        if self.in_flight.take().is_some() {
            trace!(generation = self.generation, "highlight job cancelled");
        }
        self.generation = self.generation.wrapping_add(1);
    }

    /// Cancel everything and stop the worker thread.
    pub fn dispose(&mut self) {
        self.cancel();
        self.worker = None;
    }

    /// Fire the debounce timer if due and collect completed jobs.
    ///
    /// Returns the newest result that is still valid for `current_text`, or `None` if nothing
    /// new is available. Stale completions and lexer failures are dropped here.
    pub fn poll(&mut self, current_text: &str, now: Instant) -> Option<Arc<HighlightResult>> {
        if self.timer.fire_if_due(now) {
            self.dispatch();
        }

        let mut completed: Vec<Completed> = self.inline_done.drain(..).collect();
        if let Some(worker) = &self.worker {
            while let Ok(done) = worker.rx.try_recv() {
                completed.push(done);
            }
        }

        let mut latest = None;
        for done in completed {
            if let Some(result) = self.accept(done, current_text) {
                latest = Some(result);
            }
        }
        latest
    }

    /// Block until the in-flight job (if any) completes or `timeout` elapses, then validate it
    /// like [`poll`](Self::poll). Does not fire the debounce timer.
    ///
    /// Intended for headless hosts and tests that need a settled highlight state.
    pub fn settle(
        &mut self,
        current_text: &str,
        timeout: Duration,
    ) -> Option<Arc<HighlightResult>> {
        let mut latest = None;
        let completed: Vec<Completed> = self.inline_done.drain(..).collect();
        for done in completed {
            if let Some(result) = self.accept(done, current_text) {
                latest = Some(result);
            }
        }

        let deadline = Instant::now() + timeout;
        while self.in_flight.is_some() {
            let Some(worker) = &self.worker else {
                break;
            };
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            match worker.rx.recv_timeout(remaining) {
                Ok(done) => {
                    if let Some(result) = self.accept(done, current_text) {
                        latest = Some(result);
                    }
                }
                Err(_) => break,
            }
        }
        latest
    }

    fn accept(&mut self, done: Completed, current_text: &str) -> Option<Arc<HighlightResult>> {
        if self.in_flight == Some(done.generation) {
            self.in_flight = None;
        }

        if done.generation != self.generation || *done.text != *current_text {
            self.stats.discarded_stale += 1;
            debug!(
                generation = done.generation,
                current = self.generation,
                "discarding stale highlight result"
            );
            return None;
        }

        match done.outcome {
            Ok(result) => {
                self.stats.applied += 1;
                Some(Arc::new(result))
            }
            Err(err) => {
                self.stats.failures += 1;
                debug!(generation = done.generation, error = %err, "highlighting failed");
                None
            }
        }
    }

    fn dispatch(&mut self) {
        let Some(PendingRequest { text, language }) = self.pending.take() else {
            return;
        };

        self.generation = self.generation.wrapping_add(1);
        self.stats.dispatched += 1;
        let job = HighlightJob {
            generation: self.generation,
            text,
            language,
        };
        trace!(
            generation = job.generation,
            language = job.language.id(),
            len = job.text.len(),
            "dispatching highlight job"
        );

        let job = match self.config.mode {
            HighlightMode::Inline => job,
            HighlightMode::Worker => match self.send_to_worker(job) {
                Ok(()) => return,
                Err(job) => job,
            },
        };

        let done = run_lexer(self.lexer.as_ref(), job);
        self.inline_done.push_back(done);
    }

    /// Hand a job to the worker thread, spawning it on first use.
    ///
    /// Gives the job back if no worker is available so the caller can parse inline.
    fn send_to_worker(&mut self, job: HighlightJob) -> Result<(), HighlightJob> {
        if self.worker.is_none() {
            match spawn_worker(self.lexer.clone()) {
                Ok(worker) => self.worker = Some(worker),
                Err(err) => {
                    warn!(error = %err, "failed to spawn highlight worker; parsing inline");
                    return Err(job);
                }
            }
        }

        let Some(worker) = &self.worker else {
            return Err(job);
        };
        let generation = job.generation;
        match worker.tx.send(job) {
            Ok(()) => {
                self.in_flight = Some(generation);
                Ok(())
            }
            Err(mpsc::SendError(job)) => {
                warn!("highlight worker stopped; parsing inline");
                self.worker = None;
                Err(job)
            }
        }
    }
}

impl Drop for HighlightEngine {
    fn drop(&mut self) {
        self.dispose();
    }
}

fn run_lexer(lexer: &dyn Lexer, job: HighlightJob) -> Completed {
    let outcome = match catch_unwind(AssertUnwindSafe(|| {
        lexer.parse(&job.text, job.language.id())
    })) {
        Ok(outcome) => outcome,
        Err(_) => {
            warn!(language = job.language.id(), "lexer panicked");
            Err(LexError::new("lexer panicked"))
        }
    };

    Completed {
        generation: job.generation,
        text: job.text,
        outcome,
    }
}

fn spawn_worker(lexer: Arc<dyn Lexer>) -> std::io::Result<HighlightWorker> {
    let (tx_job, rx_job) = mpsc::channel::<HighlightJob>();
    let (tx_done, rx_done) = mpsc::channel::<Completed>();

    thread::Builder::new()
        .name("tabpad-highlight".to_string())
        .spawn(move || {
            for job in rx_job.iter() {
                // Coalesce backlog so superseded jobs are never parsed.
                let mut latest = job;
                while let Ok(next) = rx_job.try_recv() {
                    latest = next;
                }
                if tx_done.send(run_lexer(lexer.as_ref(), latest)).is_err() {
                    break;
                }
            }
        })?;

    Ok(HighlightWorker {
        tx: tx_job,
        rx: rx_done,
    })
}
