use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tabpad_core::{
    HighlightResult, HistoryStack, Language, Lexer, LineIndex, SpanBuilder, TextMetrics, TextStyle,
    ThemeVariant,
};
use tabpad_highlight_simple::RegexLexer;

fn large_text(line_count: usize) -> String {
    let mut out = String::with_capacity(line_count * 64);
    for i in 0..line_count {
        out.push_str(&format!(
            "let line_{i:06} = \"quick brown fox\"; // tabpad benchmark line\n"
        ));
    }
    // Drop the final '\n' so there is no trailing empty line.
    out.pop();
    out
}

fn bench_metrics(c: &mut Criterion) {
    let text = large_text(50_000);
    c.bench_function("metrics/50k_lines", |b| {
        b.iter(|| black_box(TextMetrics::from_text(black_box(&text))))
    });

    let index = LineIndex::from_text(&text);
    let middle = index.char_count() / 2;
    c.bench_function("line_index/cursor_at_middle", |b| {
        b.iter(|| black_box(index.cursor_at(black_box(middle))))
    });
}

fn bench_highlight_and_spans(c: &mut Criterion) {
    let lexer = RegexLexer::with_defaults().unwrap();
    let text: Arc<str> = Arc::from(large_text(2_000));

    c.bench_function("lexer/rust_2k_lines", |b| {
        b.iter(|| black_box(lexer.parse(black_box(&text), Language::Rust.id()).unwrap()))
    });

    let highlight: Arc<HighlightResult> =
        Arc::new(lexer.parse(&text, Language::Rust.id()).unwrap());
    let style = TextStyle::default();
    c.bench_function("spans/build_2k_lines", |b| {
        b.iter_batched(
            SpanBuilder::new,
            |mut spans| {
                black_box(spans.build(&text, Some(&highlight), &style, true, ThemeVariant::Dark))
            },
            BatchSize::SmallInput,
        )
    });

    let mut cached = SpanBuilder::new();
    cached.build(&text, Some(&highlight), &style, false, ThemeVariant::Light);
    c.bench_function("spans/cache_hit", |b| {
        b.iter(|| {
            black_box(cached.build(&text, Some(&highlight), &style, false, ThemeVariant::Light))
        })
    });
}

fn bench_history_typing(c: &mut Criterion) {
    let text = large_text(5_000);
    c.bench_function("history/observe_100_keystrokes", |b| {
        b.iter_batched(
            || (HistoryStack::default(), text.clone()),
            |(mut history, mut current)| {
                let t0 = Instant::now();
                for i in 0..100u64 {
                    let before = current.clone();
                    current.push('x');
                    history.observe(&before, &current, t0 + Duration::from_millis(i * 50));
                }
                history.flush();
                black_box(history.undo_depth());
            },
            BatchSize::LargeInput,
        )
    });
}

criterion_group!(
    benches,
    bench_metrics,
    bench_highlight_and_spans,
    bench_history_typing
);
criterion_main!(benches);
