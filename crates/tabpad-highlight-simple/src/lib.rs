//! `tabpad-highlight-simple` - Regex-based lexer for `tabpad-core`.
//!
//! This crate implements [`tabpad_core::Lexer`] with small per-language [`Grammar`]s made of
//! ordered [`RegexRule`]s. It is meant for quick, good-enough coloring, not real parsing.
//!
//! Tokenization is leftmost-first over the whole text (so block comments and triple-quoted
//! strings may span lines). When two rules match at the same position the earlier rule wins.
//! A rule may carry child rules that are applied inside its match, which is how comments get
//! nested `doctag` nodes for `TODO`/`FIXME` markers.

use regex::Regex;
use std::collections::HashMap;
use tabpad_core::{HighlightNode, HighlightResult, LexError, Lexer};
use tracing::trace;

/// A single regex highlighting rule.
#[derive(Debug, Clone)]
pub struct RegexRule {
    regex: Regex,
    class: String,
    capture_group: Option<usize>,
    children: Vec<RegexRule>,
}

impl RegexRule {
    /// A rule tagging every match of `pattern` with `class`.
    pub fn new(pattern: &str, class: impl Into<String>) -> Result<Self, regex::Error> {
        Ok(Self {
            regex: Regex::new(pattern)?,
            class: class.into(),
            capture_group: None,
            children: Vec::new(),
        })
    }

    /// Tag only a capture group of each match.
    ///
    /// Example (JSON key): pattern `("(?:\\.|[^"\\])*")\s*:`, group `1`.
    pub fn with_capture_group(mut self, group: usize) -> Self {
        self.capture_group = Some(group);
        self
    }

    /// Rules applied inside each match, producing a nested node.
    pub fn with_children(mut self, children: Vec<RegexRule>) -> Self {
        self.children = children;
        self
    }

    /// The class tag.
    pub fn class(&self) -> &str {
        &self.class
    }

    /// First non-empty token span at or after byte `from`.
    fn find_from(&self, text: &str, mut from: usize) -> Option<(usize, usize)> {
        while from <= text.len() {
            let (whole_start, span) = match self.capture_group {
                None => {
                    let m = self.regex.find_at(text, from)?;
                    (m.start(), Some((m.start(), m.end())))
                }
                Some(group) => {
                    let caps = self.regex.captures_at(text, from)?;
                    let whole = caps.get(0)?;
                    (whole.start(), caps.get(group).map(|m| (m.start(), m.end())))
                }
            };
            if let Some((start, end)) = span
                && start < end
            {
                return Some((start, end));
            }
            let step = text[whole_start..].chars().next().map_or(1, char::len_utf8);
            from = whole_start + step;
        }
        None
    }

    fn node(&self, text: &str) -> HighlightNode {
        if self.children.is_empty() {
            HighlightNode::tagged(self.class.as_str(), text)
        } else {
            HighlightNode::group(self.class.as_str(), tokenize(text, &self.children))
        }
    }
}

fn tokenize(text: &str, rules: &[RegexRule]) -> Vec<HighlightNode> {
    let mut nodes = Vec::new();
    let mut next: Vec<Option<(usize, usize)>> =
        rules.iter().map(|rule| rule.find_from(text, 0)).collect();
    let mut pos = 0;

    loop {
        let mut best: Option<(usize, usize, usize)> = None;
        for (i, rule) in rules.iter().enumerate() {
            if let Some((start, _)) = next[i]
                && start < pos
            {
                next[i] = rule.find_from(text, pos);
            }
            if let Some((start, end)) = next[i]
                && best.is_none_or(|(best_start, _, _)| start < best_start)
            {
                best = Some((start, end, i));
            }
        }

        let Some((start, end, i)) = best else {
            break;
        };
        if start > pos {
            nodes.push(HighlightNode::plain(&text[pos..start]));
        }
        nodes.push(rules[i].node(&text[start..end]));
        pos = end;
    }

    if pos < text.len() {
        nodes.push(HighlightNode::plain(&text[pos..]));
    }
    nodes
}

fn words(class: &str, list: &[&str]) -> Result<RegexRule, regex::Error> {
    RegexRule::new(&format!(r"\b(?:{})\b", list.join("|")), class)
}

fn doctag() -> Result<RegexRule, regex::Error> {
    RegexRule::new(r"\b(?:TODO|FIXME|XXX|HACK|NOTE|SAFETY)\b", "doctag")
}

const NUMBER: &str = concat!(
    r"\b(?:0[xX][0-9a-fA-F_]+|0[bB][01_]+|0[oO][0-7_]+|\d[\d_]*(?:\.\d[\d_]*)?(?:[eE][+-]?\d+)?)",
    r"(?:[iuf](?:8|16|32|64|128|size))?\b",
);
const DOUBLE_QUOTED: &str = r#""(?:\\.|[^"\\])*""#;
const SINGLE_QUOTED: &str = r"'(?:\\.|[^'\\\n])*'";
const CALL: &str = r"\b([A-Za-z_][A-Za-z0-9_]*)\s*\(";

/// An ordered set of rules for one language.
#[derive(Debug, Clone)]
pub struct Grammar {
    rules: Vec<RegexRule>,
}

impl Grammar {
    /// A grammar from explicit rules (earlier rules win ties).
    pub fn new(rules: Vec<RegexRule>) -> Self {
        Self { rules }
    }

    /// The rules.
    pub fn rules(&self) -> &[RegexRule] {
        &self.rules
    }

    /// Tokenize `text` into a highlight tree. Leaves always concatenate back to `text`.
    pub fn highlight(&self, text: &str) -> HighlightResult {
        HighlightResult::new(tokenize(text, &self.rules))
    }

    /// Rust: comments with doctags, strings, chars, attributes, keywords, literals, types,
    /// numbers, macro and function calls.
    pub fn rust() -> Result<Self, regex::Error> {
        Ok(Self::new(vec![
            RegexRule::new(r"//[^\n]*", "comment")?.with_children(vec![doctag()?]),
            RegexRule::new(r"/\*[\s\S]*?\*/", "comment")?.with_children(vec![doctag()?]),
            RegexRule::new(r##"b?r#*"(?:[^"]|"[^#])*?"#*"##, "string")?,
            RegexRule::new(&format!("b?{DOUBLE_QUOTED}"), "string")?,
            RegexRule::new(r"b?'(?:\\.|[^'\\])'", "string")?,
            RegexRule::new(r"'[A-Za-z_][A-Za-z0-9_]*\b", "symbol")?,
            RegexRule::new(r"#!?\[[^\]\n]*\]", "meta")?,
            words(
                "keyword",
                &[
                    "as", "async", "await", "break", "const", "continue", "crate", "dyn", "else",
                    "enum", "extern", "fn", "for", "if", "impl", "in", "let", "loop", "match",
                    "mod", "move", "mut", "pub", "ref", "return", "static", "struct", "super",
                    "trait", "type", "unsafe", "use", "where", "while",
                ],
            )?,
            words(
                "literal",
                &["true", "false", "self", "Self", "Some", "None", "Ok", "Err"],
            )?,
            words(
                "type",
                &[
                    "i8", "i16", "i32", "i64", "i128", "isize", "u8", "u16", "u32", "u64", "u128",
                    "usize", "f32", "f64", "bool", "char", "str", "String", "Vec", "Option",
                    "Result", "Box",
                ],
            )?,
            RegexRule::new(r"\b[A-Z][A-Za-z0-9_]*\b", "type")?,
            RegexRule::new(NUMBER, "number")?,
            RegexRule::new(r"\b[A-Za-z_][A-Za-z0-9_]*!", "built_in")?,
            RegexRule::new(CALL, "title.function")?.with_capture_group(1),
        ]))
    }

    /// Python: comments, (triple-)quoted strings, decorators, keywords, literals, builtins,
    /// numbers, calls.
    pub fn python() -> Result<Self, regex::Error> {
        Ok(Self::new(vec![
            RegexRule::new(r"#[^\n]*", "comment")?.with_children(vec![doctag()?]),
            RegexRule::new(r#"[rRbBfFuU]{0,2}"""[\s\S]*?""""#, "string")?,
            RegexRule::new(r"[rRbBfFuU]{0,2}'''[\s\S]*?'''", "string")?,
            RegexRule::new(&format!("[rRbBfFuU]{{0,2}}{DOUBLE_QUOTED}"), "string")?,
            RegexRule::new(&format!("[rRbBfFuU]{{0,2}}{SINGLE_QUOTED}"), "string")?,
            RegexRule::new(r"@[A-Za-z_][A-Za-z0-9_.]*", "meta")?,
            words(
                "keyword",
                &[
                    "and", "as", "assert", "async", "await", "break", "class", "continue", "def",
                    "del", "elif", "else", "except", "finally", "for", "from", "global", "if",
                    "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise",
                    "return", "try", "while", "with", "yield",
                ],
            )?,
            words("literal", &["True", "False", "None"])?,
            words(
                "built_in",
                &[
                    "print",
                    "len",
                    "range",
                    "open",
                    "int",
                    "str",
                    "float",
                    "list",
                    "dict",
                    "set",
                    "tuple",
                    "isinstance",
                    "super",
                    "self",
                    "enumerate",
                    "zip",
                ],
            )?,
            RegexRule::new(NUMBER, "number")?,
            RegexRule::new(CALL, "title.function")?.with_capture_group(1),
        ]))
    }

    /// JavaScript: comments, strings and template literals, keywords, literals, numbers, calls.
    pub fn javascript() -> Result<Self, regex::Error> {
        Ok(Self::new(js_like_rules(&[])?))
    }

    /// TypeScript: JavaScript plus type-level keywords and primitive types.
    pub fn typescript() -> Result<Self, regex::Error> {
        let mut rules = js_like_rules(&[
            "interface",
            "type",
            "enum",
            "implements",
            "declare",
            "readonly",
            "namespace",
            "abstract",
            "private",
            "protected",
            "public",
            "keyof",
            "as",
        ])?;
        rules.insert(
            rules.len() - 2,
            words(
                "type",
                &[
                    "string", "number", "boolean", "any", "unknown", "never", "void", "object",
                ],
            )?,
        );
        Ok(Self::new(rules))
    }

    /// JSON: keys, strings, numbers, `true`/`false`/`null`.
    pub fn json() -> Result<Self, regex::Error> {
        Ok(Self::new(vec![
            RegexRule::new(&format!(r"({DOUBLE_QUOTED})\s*:"), "attr")?.with_capture_group(1),
            RegexRule::new(DOUBLE_QUOTED, "string")?,
            RegexRule::new(r"-?(?:0|[1-9]\d*)(?:\.\d+)?(?:[eE][+-]?\d+)?", "number")?,
            words("literal", &["true", "false", "null"])?,
        ]))
    }

    /// Shell: comments, strings, variables, keywords, common builtins.
    pub fn shell() -> Result<Self, regex::Error> {
        Ok(Self::new(vec![
            RegexRule::new(r"#![^\n]*", "meta")?,
            RegexRule::new(r"(?:^|[ \t;])(#[^\n]*)", "comment")?
                .with_capture_group(1)
                .with_children(vec![doctag()?]),
            RegexRule::new(DOUBLE_QUOTED, "string")?,
            RegexRule::new(r"'[^']*'", "string")?,
            RegexRule::new(
                r"\$(?:\{[^}\n]*\}|[A-Za-z_][A-Za-z0-9_]*|[0-9@#?$!*-])",
                "variable",
            )?,
            words(
                "keyword",
                &[
                    "if", "then", "else", "elif", "fi", "for", "while", "until", "do", "done",
                    "case", "esac", "in", "function", "return", "local", "export",
                ],
            )?,
            words(
                "built_in",
                &[
                    "echo", "cd", "exit", "set", "unset", "source", "read", "printf", "test",
                    "shift",
                ],
            )?,
            RegexRule::new(r"\b\d+\b", "number")?,
        ]))
    }

    /// INI: section headers, keys, comments.
    pub fn ini() -> Result<Self, regex::Error> {
        Ok(Self::new(vec![
            RegexRule::new(r"(?m)^[ \t]*[;#][^\n]*", "comment")?,
            RegexRule::new(r"(?m)^[ \t]*(\[[^\]\n]+\])", "section")?.with_capture_group(1),
            RegexRule::new(r"(?m)^[ \t]*([^=\s\[;#][^=\n]*?)[ \t]*=", "attr")?
                .with_capture_group(1),
            RegexRule::new(DOUBLE_QUOTED, "string")?,
        ]))
    }
}

fn js_like_rules(extra_keywords: &[&str]) -> Result<Vec<RegexRule>, regex::Error> {
    let mut keywords = vec![
        "async",
        "await",
        "break",
        "case",
        "catch",
        "class",
        "const",
        "continue",
        "default",
        "delete",
        "do",
        "else",
        "export",
        "extends",
        "finally",
        "for",
        "from",
        "function",
        "if",
        "import",
        "in",
        "instanceof",
        "let",
        "new",
        "of",
        "return",
        "static",
        "switch",
        "throw",
        "try",
        "typeof",
        "var",
        "void",
        "while",
        "yield",
    ];
    for extra in extra_keywords {
        if !keywords.contains(extra) {
            keywords.push(*extra);
        }
    }

    Ok(vec![
        RegexRule::new(r"//[^\n]*", "comment")?.with_children(vec![doctag()?]),
        RegexRule::new(r"/\*[\s\S]*?\*/", "comment")?.with_children(vec![doctag()?]),
        RegexRule::new(DOUBLE_QUOTED, "string")?,
        RegexRule::new(SINGLE_QUOTED, "string")?,
        RegexRule::new(r"`(?:\\[\s\S]|[^`\\])*`", "string")?,
        words("keyword", &keywords)?,
        words(
            "literal",
            &["true", "false", "null", "undefined", "this", "NaN"],
        )?,
        RegexRule::new(NUMBER, "number")?,
        RegexRule::new(CALL, "title.function")?.with_capture_group(1),
    ])
}

/// A [`Lexer`] dispatching on language id to registered [`Grammar`]s.
#[derive(Debug, Clone, Default)]
pub struct RegexLexer {
    grammars: HashMap<String, Grammar>,
}

impl RegexLexer {
    /// A lexer with no grammars.
    pub fn new() -> Self {
        Self::default()
    }

    /// A lexer with the built-in grammars registered under their language ids.
    pub fn with_defaults() -> Result<Self, regex::Error> {
        let mut lexer = Self::new();
        lexer.register("rust", Grammar::rust()?);
        lexer.register("python", Grammar::python()?);
        lexer.register("javascript", Grammar::javascript()?);
        lexer.register("typescript", Grammar::typescript()?);
        lexer.register("json", Grammar::json()?);
        lexer.register("bash", Grammar::shell()?);
        lexer.register("ini", Grammar::ini()?);
        Ok(lexer)
    }

    /// Register (or replace) the grammar for `language`.
    pub fn register(&mut self, language: impl Into<String>, grammar: Grammar) {
        self.grammars.insert(language.into(), grammar);
    }

    /// The grammar for `language`, if registered.
    pub fn grammar(&self, language: &str) -> Option<&Grammar> {
        self.grammars.get(language)
    }

    /// Registered language ids, sorted.
    pub fn languages(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.grammars.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }
}

impl Lexer for RegexLexer {
    fn parse(&self, text: &str, language: &str) -> Result<HighlightResult, LexError> {
        let grammar = self
            .grammars
            .get(language)
            .ok_or_else(|| LexError::new(format!("no grammar for language `{language}`")))?;
        let result = grammar.highlight(text);
        trace!(language, nodes = result.nodes.len(), "regex lexer finished");
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn classes(result: &HighlightResult) -> Vec<(Option<&str>, String)> {
        result
            .nodes
            .iter()
            .map(|node| {
                let text = HighlightResult::new(vec![node.clone()]).text();
                (node.class(), text)
            })
            .collect()
    }

    #[test]
    fn test_rust_tokens() {
        let result = Grammar::rust()
            .unwrap()
            .highlight("fn main() { let x = 42; }");
        assert_eq!(
            classes(&result),
            vec![
                (Some("keyword"), "fn".to_string()),
                (None, " ".to_string()),
                (Some("title.function"), "main".to_string()),
                (None, "() { ".to_string()),
                (Some("keyword"), "let".to_string()),
                (None, " x = ".to_string()),
                (Some("number"), "42".to_string()),
                (None, "; }".to_string()),
            ]
        );
    }

    #[test]
    fn test_comment_nests_doctag() {
        let result = Grammar::rust().unwrap().highlight("// TODO: fix\nx");
        assert_eq!(
            result.nodes[0],
            HighlightNode::group(
                "comment",
                vec![
                    HighlightNode::plain("// "),
                    HighlightNode::tagged("doctag", "TODO"),
                    HighlightNode::plain(": fix"),
                ]
            )
        );
        assert_eq!(result.text(), "// TODO: fix\nx");
    }

    #[test]
    fn test_keywords_inside_strings_are_not_tagged() {
        let result = Grammar::python().unwrap().highlight("print('if else')");
        assert_eq!(
            classes(&result),
            vec![
                (Some("built_in"), "print".to_string()),
                (None, "(".to_string()),
                (Some("string"), "'if else'".to_string()),
                (None, ")".to_string()),
            ]
        );
    }

    #[test]
    fn test_block_comment_spans_lines() {
        let source = "/* a\nb */ const y = 1;";
        let result = Grammar::javascript().unwrap().highlight(source);
        assert_eq!(result.nodes[0].class(), Some("comment"));
        assert_eq!(
            HighlightResult::new(vec![result.nodes[0].clone()]).text(),
            "/* a\nb */"
        );
        assert_eq!(result.text(), source);
    }

    #[test]
    fn test_json_keys_and_values() {
        let result = Grammar::json()
            .unwrap()
            .highlight(r#"{"a": "b", "n": -1.5, "t": null}"#);
        let tagged: Vec<_> = classes(&result)
            .into_iter()
            .filter(|(class, _)| class.is_some())
            .collect();
        assert_eq!(
            tagged,
            vec![
                (Some("attr"), r#""a""#.to_string()),
                (Some("string"), r#""b""#.to_string()),
                (Some("attr"), r#""n""#.to_string()),
                (Some("number"), "-1.5".to_string()),
                (Some("attr"), r#""t""#.to_string()),
                (Some("literal"), "null".to_string()),
            ]
        );
    }

    #[test]
    fn test_shell_comment_and_variable() {
        let result = Grammar::shell().unwrap().highlight("echo $HOME # TODO\n");
        let tagged: Vec<_> = result
            .nodes
            .iter()
            .filter_map(HighlightNode::class)
            .collect();
        assert_eq!(tagged, vec!["built_in", "variable", "comment"]);
        assert_eq!(result.text(), "echo $HOME # TODO\n");
    }

    #[test]
    fn test_typescript_types() {
        let result = Grammar::typescript()
            .unwrap()
            .highlight("interface A { n: number }");
        let tagged: Vec<_> = result
            .nodes
            .iter()
            .filter_map(HighlightNode::class)
            .collect();
        assert_eq!(tagged, vec!["keyword", "type"]);
    }

    #[test]
    fn test_unicode_text_round_trips() {
        let source = "let s = \"héllo 世界\"; // ✓";
        let result = Grammar::rust().unwrap().highlight(source);
        assert_eq!(result.text(), source);
    }

    #[test]
    fn test_unknown_language_is_an_error() {
        let lexer = RegexLexer::with_defaults().unwrap();
        let err = lexer.parse("x", "cobol").unwrap_err();
        assert!(err.to_string().contains("cobol"));
    }

    #[test]
    fn test_registered_languages() {
        let lexer = RegexLexer::with_defaults().unwrap();
        assert_eq!(
            lexer.languages(),
            vec![
                "bash",
                "ini",
                "javascript",
                "json",
                "python",
                "rust",
                "typescript",
            ]
        );
        assert!(lexer.grammar("rust").is_some());
    }
}
