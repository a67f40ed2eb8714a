use std::sync::Arc;
use std::time::{Duration, Instant};
use tabpad_core::{
    DocumentContext, EditInput, EditorDocument, HighlightConfig, HighlightMode, Language, Lexer,
    ThemeVariant,
};
use tabpad_highlight_simple::RegexLexer;

fn context(mode: HighlightMode) -> DocumentContext {
    let lexer: Arc<dyn Lexer> = Arc::new(RegexLexer::with_defaults().unwrap());
    DocumentContext::new(lexer).with_highlight_config(HighlightConfig {
        mode,
        ..HighlightConfig::default()
    })
}

#[test]
fn test_every_language_with_a_grammar_round_trips() {
    let lexer = RegexLexer::with_defaults().unwrap();
    let sample = "x = \"s\" # TODO 1\n// c\n'q' true null fn f() {}\n";
    for id in lexer.languages() {
        assert!(
            Language::from_id(id).is_some(),
            "{id} must be a known language id"
        );
        let result = lexer.parse(sample, id).unwrap();
        assert_eq!(result.text(), sample, "{id} must cover the whole text");
    }
}

#[test]
fn test_rust_document_renders_keyword_style() {
    let t0 = Instant::now();
    let mut doc = EditorDocument::load(
        Some("src/main.rs".into()),
        "fn main() {}",
        &context(HighlightMode::Inline),
        t0,
    );
    assert_eq!(doc.language(), Language::Rust);
    assert!(doc.highlight().is_some());

    let tree = doc.render_tree();
    let runs = tree.runs();
    assert_eq!(runs[0].text, "fn");
    assert_ne!(runs[0].style, runs[1].style);
    assert_eq!(tree.display_text(), "fn main() {}");
}

#[test]
fn test_worker_mode_delivers_after_debounce() {
    let t0 = Instant::now();
    let mut doc = EditorDocument::load(
        Some("app.py".into()),
        "",
        &context(HighlightMode::Worker),
        t0,
    );
    doc.settle_highlight(Duration::from_secs(5));

    doc.apply_edit(EditInput::user("def f():\n    return None", None), t0);
    assert!(doc.highlight().is_none());

    // Fire the debounce timer, then wait for the worker.
    doc.poll(t0 + Duration::from_millis(200));
    doc.settle_highlight(Duration::from_secs(5));
    let highlight = doc.highlight().expect("worker result applied");
    assert_eq!(highlight.text(), "def f():\n    return None");
}

#[test]
fn test_theme_flip_changes_colors_not_text() {
    let t0 = Instant::now();
    let mut doc = EditorDocument::load(
        Some("data.json".into()),
        r#"{"k": 1}"#,
        &context(HighlightMode::Inline),
        t0,
    );
    let light = doc.render_tree();

    let mut settings = doc.settings().clone();
    settings.theme_variant = ThemeVariant::Dark;
    doc.apply_settings(settings, t0);
    let dark = doc.render_tree();

    assert!(!Arc::ptr_eq(&light, &dark));
    assert_eq!(light.display_text(), dark.display_text());
    assert_ne!(light.runs()[1].style.color, dark.runs()[1].style.color);
}
