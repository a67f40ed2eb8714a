use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};
use tabpad_core::{
    CloseOutcome, DocumentChangeKind, DocumentContext, EditInput, EditorDocument, HighlightConfig,
    HighlightMode, HighlightNode, HighlightResult, LexError, Lexer, Workspace,
};

/// A lexer that blocks while parsing `blocked_text` until released.
struct GatedLexer {
    blocked_text: String,
    entered: Mutex<bool>,
    entered_signal: Condvar,
    released: Mutex<bool>,
    signal: Condvar,
}

impl GatedLexer {
    fn new(blocked_text: &str) -> Self {
        Self {
            blocked_text: blocked_text.to_string(),
            entered: Mutex::new(false),
            entered_signal: Condvar::new(),
            released: Mutex::new(false),
            signal: Condvar::new(),
        }
    }

    /// Block until the worker is parsing `blocked_text`.
    fn wait_until_entered(&self) {
        let entered = self.entered.lock().unwrap();
        let (entered, timeout) = self
            .entered_signal
            .wait_timeout_while(entered, Duration::from_secs(5), |entered| !*entered)
            .unwrap();
        assert!(!timeout.timed_out(), "worker never started parsing");
        assert!(*entered);
    }

    fn release(&self) {
        *self.released.lock().unwrap() = true;
        self.signal.notify_all();
    }
}

impl Lexer for GatedLexer {
    fn parse(&self, text: &str, _language: &str) -> Result<HighlightResult, LexError> {
        if text == self.blocked_text {
            *self.entered.lock().unwrap() = true;
            self.entered_signal.notify_all();
            let mut released = self.released.lock().unwrap();
            while !*released {
                released = self.signal.wait(released).unwrap();
            }
        }
        Ok(HighlightResult::new(vec![HighlightNode::tagged("string", text)]))
    }
}

fn worker_context(lexer: Arc<dyn Lexer>) -> DocumentContext {
    DocumentContext::new(lexer).with_highlight_config(HighlightConfig {
        mode: HighlightMode::Worker,
        ..HighlightConfig::default()
    })
}

#[test]
fn test_late_result_for_old_text_is_never_applied() {
    let t0 = Instant::now();
    let gate = Arc::new(GatedLexer::new("foo"));
    let lexer: Arc<dyn Lexer> = gate.clone();

    // Request A ("foo") is dispatched on load and blocks in the worker.
    let context = worker_context(lexer);
    let mut doc = EditorDocument::load(Some("a.js".into()), "foo", &context, t0);
    assert!(doc.highlight().is_none());
    gate.wait_until_entered();

    let applied = Arc::new(Mutex::new(Vec::new()));
    let sink = applied.clone();
    doc.subscribe(move |change| {
        if change.kind == DocumentChangeKind::HighlightChanged {
            sink.lock().unwrap().push(change.version);
        }
    });

    // Text changes and request B ("foobar") is issued while A is still running.
    doc.apply_edit(EditInput::user("foobar", None), t0);
    doc.poll(t0 + Duration::from_millis(200));
    assert_eq!(doc.highlight_stats().dispatched, 2);

    // A completes after B was requested but before B's result.
    gate.release();
    doc.settle_highlight(Duration::from_secs(5));

    let highlight = doc.highlight().expect("B must be applied");
    assert_eq!(highlight.text(), "foobar");
    assert_eq!(doc.highlight_stats().applied, 1);
    assert_eq!(doc.highlight_stats().discarded_stale, 1);
    assert_eq!(*applied.lock().unwrap(), vec![1]);
}

#[test]
fn test_closing_tab_cancels_in_flight_work() {
    let t0 = Instant::now();
    let gate = Arc::new(GatedLexer::new("slow"));
    let lexer: Arc<dyn Lexer> = gate.clone();
    let mut ws = Workspace::with_context(worker_context(lexer));

    let id = ws.open_tab(Some("a.py".into()), "slow", t0).unwrap();
    let doc = ws.document_mut(id).unwrap();
    assert!(doc.is_highlight_pending());
    gate.wait_until_entered();

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    doc.subscribe(move |change| sink.lock().unwrap().push(change.kind));

    assert_eq!(ws.close_tab(id, |_| true).unwrap(), CloseOutcome::Closed);
    assert!(ws.document(id).is_none());
    assert_eq!(ws.tab_for_path("a.py"), None);

    // The worker finishes after the tab is gone; nothing is delivered.
    gate.release();
    assert!(ws.poll(t0 + Duration::from_secs(1)).is_empty());
    assert_eq!(*seen.lock().unwrap(), vec![DocumentChangeKind::Disposed]);
}

#[test]
fn test_failing_lexer_leaves_edit_unhighlighted() {
    let t0 = Instant::now();
    let lexer: Arc<dyn Lexer> =
        Arc::new(|text: &str, _lang: &str| -> Result<HighlightResult, LexError> {
            if text.contains('!') {
                Err(LexError::new("unbalanced"))
            } else {
                Ok(HighlightResult::new(vec![HighlightNode::plain(text)]))
            }
        });
    let context = DocumentContext::new(lexer).with_highlight_config(HighlightConfig {
        mode: HighlightMode::Inline,
        ..HighlightConfig::default()
    });
    let mut doc = EditorDocument::load(Some("a.rs".into()), "ok", &context, t0);
    assert!(doc.highlight().is_some());

    doc.apply_edit(EditInput::user("ok!", None), t0);
    doc.poll(t0 + Duration::from_millis(200));
    assert!(doc.highlight().is_none());
    assert_eq!(doc.highlight_stats().failures, 1);
    assert_eq!(doc.text(), "ok!");
}
