#![warn(missing_docs)]
//! `tabpad-lang` - language classification for `tabpad` documents.
//!
//! This crate intentionally stays lightweight and does **not** depend on any parsing or
//! highlighting system. It maps a file name (or path) to a [`Language`], which the document
//! model uses to decide whether highlighting applies and which grammar a lexer should use.

use std::fmt;
use std::path::Path;

/// Language classification of a document.
///
/// The classification is derived once from the file name when a document is created and only
/// changes if the document is assigned a new path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Language {
    /// Plain text. Never highlighted.
    #[default]
    PlainText,
    /// Rust (`.rs`).
    Rust,
    /// Python (`.py`, `.pyw`).
    Python,
    /// JavaScript (`.js`, `.mjs`, `.cjs`, `.jsx`).
    JavaScript,
    /// TypeScript (`.ts`, `.tsx`, `.mts`, `.cts`).
    TypeScript,
    /// JSON (`.json`, `.jsonc`).
    Json,
    /// YAML (`.yaml`, `.yml`).
    Yaml,
    /// TOML (`.toml`).
    Toml,
    /// Markdown (`.md`, `.markdown`).
    Markdown,
    /// C (`.c`, `.h`).
    C,
    /// C++ (`.cpp`, `.cc`, `.cxx`, `.hpp`, `.hh`).
    Cpp,
    /// Java (`.java`).
    Java,
    /// Kotlin (`.kt`, `.kts`).
    Kotlin,
    /// Go (`.go`).
    Go,
    /// Dart (`.dart`).
    Dart,
    /// HTML (`.html`, `.htm`).
    Html,
    /// XML (`.xml`, `.svg`).
    Xml,
    /// CSS (`.css`).
    Css,
    /// SQL (`.sql`).
    Sql,
    /// Shell scripts (`.sh`, `.bash`, `.zsh`, dotfiles such as `.bashrc`).
    Shell,
    /// Makefiles.
    Makefile,
    /// Dockerfiles.
    Dockerfile,
    /// INI-style configuration (`.ini`, `.cfg`, `.conf`).
    Ini,
}

impl Language {
    /// Every known language, in declaration order.
    pub const ALL: [Language; 23] = [
        Language::PlainText,
        Language::Rust,
        Language::Python,
        Language::JavaScript,
        Language::TypeScript,
        Language::Json,
        Language::Yaml,
        Language::Toml,
        Language::Markdown,
        Language::C,
        Language::Cpp,
        Language::Java,
        Language::Kotlin,
        Language::Go,
        Language::Dart,
        Language::Html,
        Language::Xml,
        Language::Css,
        Language::Sql,
        Language::Shell,
        Language::Makefile,
        Language::Dockerfile,
        Language::Ini,
    ];

    /// Stable identifier passed to lexers (highlight.js-style names, e.g. `"rust"`, `"bash"`).
    pub fn id(self) -> &'static str {
        match self {
            Language::PlainText => "plaintext",
            Language::Rust => "rust",
            Language::Python => "python",
            Language::JavaScript => "javascript",
            Language::TypeScript => "typescript",
            Language::Json => "json",
            Language::Yaml => "yaml",
            Language::Toml => "toml",
            Language::Markdown => "markdown",
            Language::C => "c",
            Language::Cpp => "cpp",
            Language::Java => "java",
            Language::Kotlin => "kotlin",
            Language::Go => "go",
            Language::Dart => "dart",
            Language::Html => "html",
            Language::Xml => "xml",
            Language::Css => "css",
            Language::Sql => "sql",
            Language::Shell => "bash",
            Language::Makefile => "makefile",
            Language::Dockerfile => "dockerfile",
            Language::Ini => "ini",
        }
    }

    /// Look a language up by its [`id`](Self::id).
    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|lang| lang.id() == id)
    }

    /// Returns `true` for [`Language::PlainText`].
    pub fn is_plain_text(self) -> bool {
        matches!(self, Language::PlainText)
    }

    /// Classify a file path by its file name.
    ///
    /// Well-known file names (`Makefile`, `Dockerfile`, `.bashrc`, ...) are checked first, then
    /// the extension (case-insensitive). Anything unrecognized is [`Language::PlainText`].
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let Some(file_name) = path.file_name().and_then(|name| name.to_str()) else {
            return Language::PlainText;
        };

        if let Some(lang) = Self::from_file_name(file_name) {
            return lang;
        }

        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
            .unwrap_or_default()
    }

    /// Classify a bare extension (without the leading dot, case-insensitive).
    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.to_ascii_lowercase();
        let lang = match ext.as_str() {
            "txt" | "text" | "log" => Language::PlainText,
            "rs" => Language::Rust,
            "py" | "pyw" => Language::Python,
            "js" | "mjs" | "cjs" | "jsx" => Language::JavaScript,
            "ts" | "tsx" | "mts" | "cts" => Language::TypeScript,
            "json" | "jsonc" => Language::Json,
            "yaml" | "yml" => Language::Yaml,
            "toml" => Language::Toml,
            "md" | "markdown" => Language::Markdown,
            "c" | "h" => Language::C,
            "cpp" | "cc" | "cxx" | "hpp" | "hh" | "hxx" => Language::Cpp,
            "java" => Language::Java,
            "kt" | "kts" => Language::Kotlin,
            "go" => Language::Go,
            "dart" => Language::Dart,
            "html" | "htm" => Language::Html,
            "xml" | "svg" => Language::Xml,
            "css" => Language::Css,
            "sql" => Language::Sql,
            "sh" | "bash" | "zsh" => Language::Shell,
            "mk" => Language::Makefile,
            "ini" | "cfg" | "conf" => Language::Ini,
            _ => return None,
        };
        Some(lang)
    }

    fn from_file_name(file_name: &str) -> Option<Self> {
        let lang = match file_name {
            "Makefile" | "makefile" | "GNUmakefile" => Language::Makefile,
            "Dockerfile" | "dockerfile" | "Containerfile" => Language::Dockerfile,
            ".bashrc" | ".bash_profile" | ".zshrc" | ".profile" => Language::Shell,
            "Cargo.lock" => Language::Toml,
            _ => return None,
        };
        Some(lang)
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_path_uses_extension_case_insensitively() {
        assert_eq!(Language::from_path("src/main.rs"), Language::Rust);
        assert_eq!(Language::from_path("/tmp/SCRIPT.PY"), Language::Python);
        assert_eq!(Language::from_path("notes.txt"), Language::PlainText);
        assert_eq!(Language::from_path("data.JSON"), Language::Json);
    }

    #[test]
    fn test_from_path_well_known_file_names() {
        assert_eq!(Language::from_path("project/Makefile"), Language::Makefile);
        assert_eq!(Language::from_path("Dockerfile"), Language::Dockerfile);
        assert_eq!(Language::from_path("/home/me/.bashrc"), Language::Shell);
    }

    #[test]
    fn test_unknown_or_missing_extension_is_plain_text() {
        assert_eq!(Language::from_path("README"), Language::PlainText);
        assert_eq!(Language::from_path("archive.xyz"), Language::PlainText);
        assert_eq!(Language::from_path(""), Language::PlainText);
    }

    #[test]
    fn test_id_round_trips_through_from_id() {
        for lang in Language::ALL {
            assert_eq!(Language::from_id(lang.id()), Some(lang));
        }
        assert_eq!(Language::from_id("cobol"), None);
        assert_eq!(Language::Shell.to_string(), "bash");
    }
}
