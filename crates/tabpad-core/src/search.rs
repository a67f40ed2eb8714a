//! Find-in-document.
//!
//! All positions are **character offsets** into the document text, and matches are half-open
//! `[start, end)` ranges. The default options give exact, case-sensitive substring search; a
//! regex mode and whole-word filtering are available for hosts that expose them.

use crate::error::SearchError;
use regex::{Regex, RegexBuilder};
use ropey::str_utils::{byte_to_char_idx, char_to_byte_idx};

/// Options that control how search is performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchOptions {
    /// Match case exactly.
    pub case_sensitive: bool,
    /// Only accept matches not bordered by word characters.
    pub whole_word: bool,
    /// Treat the query as a regular expression.
    pub regex: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            case_sensitive: true,
            whole_word: false,
            regex: false,
        }
    }
}

/// A match as a half-open character range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchMatch {
    /// First character of the match.
    pub start: usize,
    /// One past the last character of the match.
    pub end: usize,
}

impl SearchMatch {
    /// Length in characters.
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Returns `true` for a zero-length match.
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }
}

/// A compiled query, reusable across calls.
#[derive(Debug, Clone)]
pub struct SearchQuery {
    regex: Regex,
    whole_word: bool,
}

impl SearchQuery {
    /// Compile `query` with `options`. Returns `Ok(None)` for an empty query.
    pub fn new(query: &str, options: SearchOptions) -> Result<Option<Self>, SearchError> {
        if query.is_empty() {
            return Ok(None);
        }

        let pattern = if options.regex {
            query.to_string()
        } else {
            regex::escape(query)
        };
        let regex = RegexBuilder::new(&pattern)
            .case_insensitive(!options.case_sensitive)
            .multi_line(true)
            .build()?;

        Ok(Some(Self {
            regex,
            whole_word: options.whole_word,
        }))
    }

    /// First acceptable match starting at or after byte `from` (must be a char boundary).
    fn find_from_byte(&self, text: &str, mut from: usize) -> Option<(usize, usize)> {
        while from <= text.len() {
            let m = self.regex.find_at(text, from)?;
            if m.start() < m.end() && (!self.whole_word || is_whole_word(text, m.start(), m.end()))
            {
                return Some((m.start(), m.end()));
            }
            // Step one character past the rejected match start.
            let step = text[m.start()..].chars().next().map_or(1, char::len_utf8);
            from = m.start() + step;
        }
        None
    }

    /// First match at or after `from_char`.
    pub fn find_next(&self, text: &str, from_char: usize) -> Option<SearchMatch> {
        let from = char_to_byte_idx(text, from_char);
        self.find_from_byte(text, from)
            .map(|(start, end)| to_char_match(text, start, end))
    }

    /// First match at or after `from_char`, else the first match from the start of the text.
    pub fn find_next_wrapping(&self, text: &str, from_char: usize) -> Option<SearchMatch> {
        self.find_next(text, from_char).or_else(|| {
            if from_char == 0 {
                None
            } else {
                self.find_next(text, 0)
            }
        })
    }

    /// Every non-overlapping match in order.
    pub fn find_all(&self, text: &str) -> Vec<SearchMatch> {
        let mut out = Vec::new();
        let mut from = 0;
        while let Some((start, end)) = self.find_from_byte(text, from) {
            out.push(to_char_match(text, start, end));
            from = end;
        }
        out
    }
}

fn to_char_match(text: &str, start: usize, end: usize) -> SearchMatch {
    SearchMatch {
        start: byte_to_char_idx(text, start),
        end: byte_to_char_idx(text, end),
    }
}

fn is_word_char(ch: char) -> bool {
    ch == '_' || ch.is_alphanumeric()
}

fn is_whole_word(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].chars().next_back();
    let after = text[end..].chars().next();
    !before.is_some_and(is_word_char) && !after.is_some_and(is_word_char)
}

/// Find the next occurrence of `query` at or after `from_char`.
pub fn find_next(
    text: &str,
    query: &str,
    options: SearchOptions,
    from_char: usize,
) -> Result<Option<SearchMatch>, SearchError> {
    let compiled = SearchQuery::new(query, options)?;
    Ok(compiled.and_then(|q| q.find_next(text, from_char)))
}

/// Find the next occurrence at or after `from_char`, wrapping around to the start of the text.
pub fn find_next_wrapping(
    text: &str,
    query: &str,
    options: SearchOptions,
    from_char: usize,
) -> Result<Option<SearchMatch>, SearchError> {
    let compiled = SearchQuery::new(query, options)?;
    Ok(compiled.and_then(|q| q.find_next_wrapping(text, from_char)))
}

/// Find all occurrences of `query`.
pub fn find_all(
    text: &str,
    query: &str,
    options: SearchOptions,
) -> Result<Vec<SearchMatch>, SearchError> {
    Ok(SearchQuery::new(query, options)?
        .map(|q| q.find_all(text))
        .unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn m(start: usize, end: usize) -> SearchMatch {
        SearchMatch { start, end }
    }

    #[test]
    fn test_exact_case_sensitive_by_default() {
        let text = "Foo foo FOO";
        let hits = find_all(text, "foo", SearchOptions::default()).unwrap();
        assert_eq!(hits, vec![m(4, 7)]);
    }

    #[test]
    fn test_case_insensitive_option() {
        let options = SearchOptions {
            case_sensitive: false,
            ..SearchOptions::default()
        };
        assert_eq!(find_all("Foo foo FOO", "foo", options).unwrap().len(), 3);
    }

    #[test]
    fn test_query_is_literal_unless_regex() {
        assert_eq!(
            find_next("a.b axb", "a.b", SearchOptions::default(), 1).unwrap(),
            None
        );
        let regex = SearchOptions {
            regex: true,
            ..SearchOptions::default()
        };
        assert_eq!(
            find_next("a.b axb", "a.b", regex, 1).unwrap(),
            Some(m(4, 7))
        );
    }

    #[test]
    fn test_wraps_to_start() {
        let text = "needle hay hay";
        let options = SearchOptions::default();
        assert_eq!(find_next(text, "needle", options, 3).unwrap(), None);
        assert_eq!(
            find_next_wrapping(text, "needle", options, 3).unwrap(),
            Some(m(0, 6))
        );
        assert_eq!(find_next_wrapping(text, "nope", options, 3).unwrap(), None);
    }

    #[test]
    fn test_offsets_are_chars() {
        let text = "日本語 text 日本語";
        assert_eq!(
            find_next(text, "日本", SearchOptions::default(), 1).unwrap(),
            Some(m(9, 11))
        );
    }

    #[test]
    fn test_whole_word() {
        let options = SearchOptions {
            whole_word: true,
            ..SearchOptions::default()
        };
        assert_eq!(
            find_all("cat concat cat_ cat.", "cat", options).unwrap(),
            vec![m(0, 3), m(16, 19)]
        );
    }

    #[test]
    fn test_empty_query_finds_nothing() {
        assert_eq!(
            find_next("abc", "", SearchOptions::default(), 0).unwrap(),
            None
        );
        assert!(
            find_all("abc", "", SearchOptions::default())
                .unwrap()
                .is_empty()
        );
    }

    #[test]
    fn test_invalid_regex_is_an_error() {
        let regex = SearchOptions {
            regex: true,
            ..SearchOptions::default()
        };
        let err = find_next("abc", "(", regex, 0).unwrap_err();
        assert!(err.to_string().starts_with("invalid search pattern"));
    }

    #[test]
    fn test_from_past_end_is_clamped() {
        assert_eq!(
            find_next_wrapping("abc", "a", SearchOptions::default(), 99).unwrap(),
            Some(m(0, 1))
        );
    }
}
