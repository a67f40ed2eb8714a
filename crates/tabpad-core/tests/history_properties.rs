use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tabpad_core::{
    DocumentContext, EditInput, EditorDocument, HighlightConfig, HighlightMode, HighlightNode,
    HighlightResult, HistoryStack, LexError, Lexer, LineIndex, TextMetrics,
};

const ALPHABET: &[char] = &['a', 'b', ' ', '\n', 'é', '\t', '中'];

fn random_text(rng: &mut StdRng, max_len: usize) -> String {
    let len = rng.gen_range(0..=max_len);
    (0..len)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())])
        .collect()
}

fn mutate(rng: &mut StdRng, text: &str) -> String {
    let mut chars: Vec<char> = text.chars().collect();
    if chars.is_empty() || rng.gen_bool(0.6) {
        let at = rng.gen_range(0..=chars.len());
        chars.insert(at, ALPHABET[rng.gen_range(0..ALPHABET.len())]);
    } else {
        let at = rng.gen_range(0..chars.len());
        chars.remove(at);
    }
    chars.into_iter().collect()
}

#[test]
fn test_undo_all_then_redo_all_restores_both_ends() {
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..50 {
        let mut history = HistoryStack::default();
        let initial = random_text(&mut rng, 20);
        let mut current = initial.clone();
        for _ in 0..rng.gen_range(1..30) {
            let next = mutate(&mut rng, &current);
            history.record(current.clone(), next.clone());
            current = next;
        }
        let last = current.clone();

        while let Some(restored) = history.undo() {
            current = restored;
        }
        assert_eq!(current, initial);
        assert!(!history.can_undo());

        while let Some(restored) = history.redo() {
            current = restored;
        }
        assert_eq!(current, last);
        assert!(!history.can_redo());
    }
}

#[test]
fn test_undo_then_redo_is_identity_on_documents() {
    let lexer: Arc<dyn Lexer> =
        Arc::new(|text: &str, _lang: &str| -> Result<HighlightResult, LexError> {
            Ok(HighlightResult::new(vec![HighlightNode::plain(text)]))
        });
    let context = DocumentContext::new(lexer).with_highlight_config(HighlightConfig {
        mode: HighlightMode::Inline,
        ..HighlightConfig::default()
    });

    let mut rng = StdRng::seed_from_u64(42);
    let t0 = Instant::now();
    let mut doc = EditorDocument::load(None, "", &context, t0);
    let mut now = t0;
    for _ in 0..200 {
        now += Duration::from_millis(rng.gen_range(10..900));
        let next = mutate(&mut rng, doc.text());
        doc.apply_edit(EditInput::user(next, None), now);
        doc.poll(now);

        if rng.gen_bool(0.1) && doc.can_undo() {
            let before = doc.text().to_string();
            assert!(doc.undo(now));
            assert!(doc.redo(now));
            assert_eq!(doc.text(), before);
        }
    }
}

#[test]
fn test_line_count_matches_newline_count() {
    let mut rng = StdRng::seed_from_u64(3);
    for _ in 0..200 {
        let text = random_text(&mut rng, 64);
        let expected = text.matches('\n').count() + 1;
        assert_eq!(TextMetrics::from_text(&text).line_count, expected);
        assert_eq!(LineIndex::from_text(&text).line_count(), expected);
    }
}

#[test]
fn test_cursor_round_trips_through_offsets() {
    let mut rng = StdRng::seed_from_u64(11);
    for _ in 0..100 {
        let text = random_text(&mut rng, 40);
        let index = LineIndex::from_text(&text);
        for offset in 0..=index.char_count() {
            let cursor = index.cursor_at(offset);
            assert_eq!(
                index.offset_of(cursor),
                offset,
                "text {text:?} offset {offset}"
            );
        }
    }
}
