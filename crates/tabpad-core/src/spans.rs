//! Styled span building with a single-slot cache.
//!
//! [`SpanBuilder`] turns the document text plus an optional [`HighlightResult`] into a
//! renderer-agnostic [`RenderTree`]: nested groups of [`StyledRun`]s, each carrying a resolved
//! [`RunStyle`]. Class tags from the highlight tree are resolved against a fixed [`Theme`] table
//! for the current [`ThemeVariant`]; unknown tags inherit their parent's style.
//!
//! Whitespace visualization composes with highlighting: when enabled, every literal run is
//! further split so that spaces render as `·` and tabs as `→`, at reduced opacity.
//!
//! The builder memoizes exactly one result. Any change to the text, the highlight result, the
//! base style, the whitespace flag, or the theme variant forces a rebuild before the next read.

use crate::highlight::{HighlightNode, HighlightResult};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Glyph substituted for a space when whitespace is visible.
pub const SPACE_GLYPH: char = '\u{00B7}';
/// Glyph substituted for a tab when whitespace is visible.
pub const TAB_GLYPH: char = '\u{2192}';
/// Opacity applied to whitespace glyph runs.
pub const WHITESPACE_OPACITY: f32 = 0.35;

/// Light or dark theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeVariant {
    /// Light background.
    #[default]
    Light,
    /// Dark background.
    Dark,
}

/// A packed `0xAARRGGBB` color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color(pub u32);

impl Color {
    /// An opaque color from a `0xRRGGBB` value.
    pub const fn rgb(rgb: u32) -> Self {
        Self(0xFF00_0000 | (rgb & 0x00FF_FFFF))
    }
}

/// Font weight of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FontWeight {
    /// Regular weight.
    #[default]
    Normal,
    /// Bold weight.
    Bold,
}

/// Font slant of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FontSlant {
    /// Upright.
    #[default]
    Normal,
    /// Italic.
    Italic,
}

/// Base text style supplied by the host (usually derived from settings).
#[derive(Debug, Clone, PartialEq)]
pub struct TextStyle {
    /// Font family name.
    pub font_family: String,
    /// Font size in logical pixels.
    pub font_size: f32,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            font_family: "monospace".to_string(),
            font_size: 14.0,
        }
    }
}

/// Fully resolved style of a run or group.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunStyle {
    /// Foreground color.
    pub color: Color,
    /// Weight.
    pub weight: FontWeight,
    /// Slant.
    pub slant: FontSlant,
    /// Opacity in `0.0..=1.0`.
    pub opacity: f32,
}

/// A contiguous run of text with a single style.
#[derive(Debug, Clone, PartialEq)]
pub struct StyledRun {
    /// Display text (whitespace already replaced by glyphs for glyph runs).
    pub text: String,
    /// Resolved style.
    pub style: RunStyle,
    /// `true` if this run visualizes whitespace.
    pub is_whitespace_glyph: bool,
}

/// One node of a [`RenderTree`].
#[derive(Debug, Clone, PartialEq)]
pub enum RenderNode {
    /// A leaf run.
    Run(StyledRun),
    /// A styled group of children.
    Group {
        /// Style shared by the group (children carry their own resolved style).
        style: RunStyle,
        /// Ordered children.
        children: Vec<RenderNode>,
    },
}

impl RenderNode {
    fn collect_runs<'a>(&'a self, out: &mut Vec<&'a StyledRun>) {
        match self {
            RenderNode::Run(run) => out.push(run),
            RenderNode::Group { children, .. } => {
                for child in children {
                    child.collect_runs(out);
                }
            }
        }
    }
}

/// A renderable styled-text tree.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderTree {
    /// Font family/size shared by every run.
    pub base: TextStyle,
    /// Root group.
    pub root: RenderNode,
}

impl RenderTree {
    /// All leaf runs in display order.
    pub fn runs(&self) -> Vec<&StyledRun> {
        let mut out = Vec::new();
        self.root.collect_runs(&mut out);
        out
    }

    /// Concatenated display text (with whitespace glyphs if they were requested).
    pub fn display_text(&self) -> String {
        self.runs().iter().map(|run| run.text.as_str()).collect()
    }
}

/// Theme table mapping highlight class tags to styles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Theme {
    variant: ThemeVariant,
}

impl Theme {
    /// The theme for a variant.
    pub fn new(variant: ThemeVariant) -> Self {
        Self { variant }
    }

    /// The variant this theme renders.
    pub fn variant(self) -> ThemeVariant {
        self.variant
    }

    /// Style of untagged text.
    pub fn base_style(self) -> RunStyle {
        let color = match self.variant {
            ThemeVariant::Light => Color::rgb(0x333333),
            ThemeVariant::Dark => Color::rgb(0xABB2BF),
        };
        RunStyle {
            color,
            weight: FontWeight::Normal,
            slant: FontSlant::Normal,
            opacity: 1.0,
        }
    }

    /// Resolve a class tag on top of `parent`. Unknown tags return `parent` unchanged.
    ///
    /// Compound tags such as `"title.function"` or `"title function_"` fall back to their first
    /// segment when the full tag is not in the table.
    pub fn resolve(self, parent: RunStyle, class: &str) -> RunStyle {
        let entry = self.lookup(class).or_else(|| {
            class
                .split(['.', ' '])
                .next()
                .filter(|head| *head != class)
                .and_then(|head| self.lookup(head))
        });

        match entry {
            Some(ClassStyle::Full(color, weight, slant)) => RunStyle {
                color,
                weight,
                slant,
                opacity: parent.opacity,
            },
            Some(ClassStyle::Weight(weight)) => RunStyle { weight, ..parent },
            Some(ClassStyle::Slant(slant)) => RunStyle { slant, ..parent },
            None => parent,
        }
    }

    fn lookup(self, class: &str) -> Option<ClassStyle> {
        use FontSlant::{Italic, Normal as Upright};
        use FontWeight::{Bold, Normal};

        // Shared modifiers.
        match class {
            "emphasis" => return Some(ClassStyle::Slant(Italic)),
            "strong" => return Some(ClassStyle::Weight(Bold)),
            _ => {}
        }

        let full = |rgb: u32, weight: FontWeight, slant: FontSlant| {
            Some(ClassStyle::Full(Color::rgb(rgb), weight, slant))
        };

        match self.variant {
            ThemeVariant::Light => match class {
                "comment" | "quote" => full(0x999988, Normal, Italic),
                "keyword" | "selector-tag" | "subst" => full(0x333333, Bold, Upright),
                "number" | "literal" | "variable" | "template-variable" | "tag.attr" => {
                    full(0x008080, Normal, Upright)
                }
                "string" | "doctag" => full(0xDD1144, Normal, Upright),
                "title" | "section" | "selector-id" | "function" => full(0x990000, Bold, Upright),
                "type" | "class" => full(0x445588, Bold, Upright),
                "tag" | "name" | "attribute" | "attr" => full(0x000080, Normal, Upright),
                "regexp" | "link" => full(0x009926, Normal, Upright),
                "symbol" | "bullet" => full(0x990073, Normal, Upright),
                "built_in" | "builtin-name" => full(0x0086B3, Normal, Upright),
                "meta" => full(0x999999, Bold, Upright),
                "params" => full(0x333333, Normal, Upright),
                "deletion" => full(0xBD2C00, Normal, Upright),
                "addition" => full(0x55A532, Normal, Upright),
                _ => None,
            },
            ThemeVariant::Dark => match class {
                "comment" | "quote" => full(0x5C6370, Normal, Italic),
                "doctag" | "keyword" | "formula" => full(0xC678DD, Normal, Upright),
                "section" | "name" | "selector-tag" | "deletion" | "subst" | "tag" => {
                    full(0xE06C75, Normal, Upright)
                }
                "literal" => full(0x56B6C2, Normal, Upright),
                "string" | "regexp" | "addition" | "attribute" | "meta-string" => {
                    full(0x98C379, Normal, Upright)
                }
                "built_in" | "class" => full(0xE6C07B, Normal, Upright),
                "attr" | "variable" | "template-variable" | "type" | "number" => {
                    full(0xD19A66, Normal, Upright)
                }
                "symbol" | "bullet" | "link" | "meta" | "selector-id" | "title" | "function" => {
                    full(0x61AEEE, Normal, Upright)
                }
                "params" => full(0xABB2BF, Normal, Upright),
                _ => None,
            },
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum ClassStyle {
    Full(Color, FontWeight, FontSlant),
    Weight(FontWeight),
    Slant(FontSlant),
}

/// Build a render tree without caching.
pub fn build_render_tree(
    text: &str,
    highlight: Option<&HighlightResult>,
    style: &TextStyle,
    whitespace_visible: bool,
    variant: ThemeVariant,
) -> RenderTree {
    let theme = Theme::new(variant);
    let base = theme.base_style();

    let children = match highlight {
        None => {
            let mut children = Vec::new();
            push_text_runs(&mut children, text, base, whitespace_visible);
            children
        }
        Some(result) => {
            let mut children = Vec::with_capacity(result.nodes.len());
            for node in &result.nodes {
                push_highlight_node(&mut children, node, base, theme, whitespace_visible);
            }
            children
        }
    };

    RenderTree {
        base: style.clone(),
        root: RenderNode::Group {
            style: base,
            children,
        },
    }
}

fn push_highlight_node(
    out: &mut Vec<RenderNode>,
    node: &HighlightNode,
    parent: RunStyle,
    theme: Theme,
    whitespace_visible: bool,
) {
    let style = match node.class() {
        Some(class) => theme.resolve(parent, class),
        None => parent,
    };

    match node {
        HighlightNode::Leaf { text, .. } => {
            push_text_runs(out, text, style, whitespace_visible);
        }
        HighlightNode::Node { children, .. } => {
            let mut group = Vec::with_capacity(children.len());
            for child in children {
                push_highlight_node(&mut group, child, style, theme, whitespace_visible);
            }
            out.push(RenderNode::Group {
                style,
                children: group,
            });
        }
    }
}

/// Emit `text` as one run, or as alternating literal/glyph runs when whitespace is visible.
fn push_text_runs(
    out: &mut Vec<RenderNode>,
    text: &str,
    style: RunStyle,
    whitespace_visible: bool,
) {
    if text.is_empty() {
        return;
    }

    if !whitespace_visible {
        out.push(RenderNode::Run(StyledRun {
            text: text.to_string(),
            style,
            is_whitespace_glyph: false,
        }));
        return;
    }

    let glyph_style = RunStyle {
        opacity: style.opacity * WHITESPACE_OPACITY,
        ..style
    };

    let mut current = String::new();
    let mut current_is_glyph = false;
    for ch in text.chars() {
        let glyph = match ch {
            ' ' => Some(SPACE_GLYPH),
            '\t' => Some(TAB_GLYPH),
            _ => None,
        };
        let is_glyph = glyph.is_some();

        if is_glyph != current_is_glyph && !current.is_empty() {
            out.push(RenderNode::Run(StyledRun {
                text: std::mem::take(&mut current),
                style: if current_is_glyph { glyph_style } else { style },
                is_whitespace_glyph: current_is_glyph,
            }));
        }
        current_is_glyph = is_glyph;
        current.push(glyph.unwrap_or(ch));
    }

    if !current.is_empty() {
        out.push(RenderNode::Run(StyledRun {
            text: current,
            style: if current_is_glyph { glyph_style } else { style },
            is_whitespace_glyph: current_is_glyph,
        }));
    }
}

struct CacheKey {
    text: Arc<str>,
    highlight: Option<Arc<HighlightResult>>,
    style: TextStyle,
    whitespace_visible: bool,
    variant: ThemeVariant,
}

impl CacheKey {
    fn matches(
        &self,
        text: &Arc<str>,
        highlight: Option<&Arc<HighlightResult>>,
        style: &TextStyle,
        whitespace_visible: bool,
        variant: ThemeVariant,
    ) -> bool {
        let same_text = Arc::ptr_eq(&self.text, text) || *self.text == **text;
        let same_highlight = match (&self.highlight, highlight) {
            (None, None) => true,
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        };
        same_text
            && same_highlight
            && self.whitespace_visible == whitespace_visible
            && self.variant == variant
            && self.style == *style
    }
}

/// Cache counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SpanCacheStats {
    /// Builds served from the cache.
    pub hits: u64,
    /// Builds that had to rebuild the tree.
    pub misses: u64,
}

/// Memoizing render tree builder (single-entry cache).
#[derive(Default)]
pub struct SpanBuilder {
    cache: Option<(CacheKey, Arc<RenderTree>)>,
    stats: SpanCacheStats,
}

impl std::fmt::Debug for SpanBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpanBuilder")
            .field("cached", &self.cache.is_some())
            .field("stats", &self.stats)
            .finish()
    }
}

impl SpanBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache hit/miss counters.
    pub fn cache_stats(&self) -> SpanCacheStats {
        self.stats
    }

    /// Drop the cached tree.
    pub fn invalidate(&mut self) {
        self.cache = None;
    }

    /// Build (or reuse) the render tree for the given inputs.
    ///
    /// Identical inputs return the same `Arc`. The highlight result is compared by identity,
    /// everything else by value.
    pub fn build(
        &mut self,
        text: &Arc<str>,
        highlight: Option<&Arc<HighlightResult>>,
        style: &TextStyle,
        whitespace_visible: bool,
        variant: ThemeVariant,
    ) -> Arc<RenderTree> {
        if let Some((key, tree)) = &self.cache
            && key.matches(text, highlight, style, whitespace_visible, variant)
        {
            self.stats.hits += 1;
            return tree.clone();
        }

        self.stats.misses += 1;
        let tree = Arc::new(build_render_tree(
            text,
            highlight.map(|h| h.as_ref()),
            style,
            whitespace_visible,
            variant,
        ));
        let key = CacheKey {
            text: text.clone(),
            highlight: highlight.cloned(),
            style: style.clone(),
            whitespace_visible,
            variant,
        };
        self.cache = Some((key, tree.clone()));
        tree
    }
}
