//! Editor settings shared by every open document.
//!
//! Settings are a plain value passed explicitly to the workspace and its documents. They load
//! from JSON; every field is optional and falls back to its default.

use crate::error::SettingsError;
use crate::spans::{TextStyle, ThemeVariant};
use serde::{Deserialize, Serialize};

/// User-facing editor options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorSettings {
    /// Syntax highlighting on/off.
    pub highlight_enabled: bool,
    /// Render spaces and tabs as visible glyphs.
    pub whitespace_visible: bool,
    /// Font family of the text area.
    pub font_family: String,
    /// Font size in logical pixels.
    pub font_size: f32,
    /// Soft wrap long lines (consumed by the host renderer).
    pub word_wrap: bool,
    /// Show the line-number gutter (consumed by the host renderer).
    pub show_line_numbers: bool,
    /// Light or dark theme.
    pub theme_variant: ThemeVariant,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            highlight_enabled: true,
            whitespace_visible: false,
            font_family: "monospace".to_string(),
            font_size: 14.0,
            word_wrap: false,
            show_line_numbers: true,
            theme_variant: ThemeVariant::Light,
        }
    }
}

impl EditorSettings {
    /// Parse settings from JSON. Missing fields take their defaults; unknown fields are ignored.
    pub fn from_json_str(json: &str) -> Result<Self, SettingsError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize to pretty-printed JSON.
    pub fn to_json_string(&self) -> Result<String, SettingsError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Base text style derived from the font options.
    pub fn text_style(&self) -> TextStyle {
        TextStyle {
            font_family: self.font_family.clone(),
            font_size: self.font_size,
        }
    }

    /// What changed going from `self` to `next`.
    pub fn diff(&self, next: &EditorSettings) -> SettingsDiff {
        SettingsDiff {
            highlight_enabled: self.highlight_enabled != next.highlight_enabled,
            whitespace_visible: self.whitespace_visible != next.whitespace_visible,
            text_style: self.font_family != next.font_family || self.font_size != next.font_size,
            theme_variant: self.theme_variant != next.theme_variant,
            layout: self.word_wrap != next.word_wrap
                || self.show_line_numbers != next.show_line_numbers,
        }
    }
}

/// Which groups of settings differ between two [`EditorSettings`] values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SettingsDiff {
    /// `highlight_enabled` changed.
    pub highlight_enabled: bool,
    /// `whitespace_visible` changed.
    pub whitespace_visible: bool,
    /// Font family or size changed.
    pub text_style: bool,
    /// `theme_variant` changed.
    pub theme_variant: bool,
    /// Wrap or gutter options changed.
    pub layout: bool,
}

impl SettingsDiff {
    /// Returns `true` if nothing changed.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// The highlight tree must be recomputed immediately (no debounce).
    ///
    /// A theme flip only restyles; the tree itself is theme-independent.
    pub fn requires_reparse(&self) -> bool {
        self.highlight_enabled
    }

    /// The cached render tree can no longer be reused.
    pub fn invalidates_spans(&self) -> bool {
        self.highlight_enabled || self.whitespace_visible || self.text_style || self.theme_variant
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_json_yields_defaults() {
        let settings = EditorSettings::from_json_str("{}").unwrap();
        assert_eq!(settings, EditorSettings::default());
        assert!(settings.highlight_enabled);
        assert_eq!(settings.font_family, "monospace");
        assert_eq!(settings.font_size, 14.0);
    }

    #[test]
    fn test_partial_json_overrides_fields() {
        let settings =
            EditorSettings::from_json_str(r#"{"theme_variant":"dark","whitespace_visible":true}"#)
                .unwrap();
        assert_eq!(settings.theme_variant, ThemeVariant::Dark);
        assert!(settings.whitespace_visible);
        assert!(!settings.word_wrap);
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        let err = EditorSettings::from_json_str(r#"{"font_size":"big"}"#).unwrap_err();
        assert!(matches!(err, SettingsError::Parse(_)));
        assert!(err.to_string().starts_with("invalid settings"));
    }

    #[test]
    fn test_json_round_trip() {
        let settings = EditorSettings {
            word_wrap: true,
            theme_variant: ThemeVariant::Dark,
            ..EditorSettings::default()
        };
        let json = settings.to_json_string().unwrap();
        assert_eq!(EditorSettings::from_json_str(&json).unwrap(), settings);
    }

    #[test]
    fn test_diff_classification() {
        let base = EditorSettings::default();
        assert!(base.diff(&base).is_empty());

        let dark = EditorSettings {
            theme_variant: ThemeVariant::Dark,
            ..base.clone()
        };
        let diff = base.diff(&dark);
        assert!(diff.theme_variant);
        assert!(!diff.requires_reparse());
        assert!(diff.invalidates_spans());

        let wrapped = EditorSettings {
            word_wrap: true,
            ..base.clone()
        };
        let diff = base.diff(&wrapped);
        assert!(diff.layout);
        assert!(!diff.requires_reparse());
        assert!(!diff.invalidates_spans());

        let spaced = EditorSettings {
            whitespace_visible: true,
            ..base.clone()
        };
        let diff = base.diff(&spaced);
        assert!(!diff.requires_reparse());
        assert!(diff.invalidates_spans());

        let plain = EditorSettings {
            highlight_enabled: false,
            ..base.clone()
        };
        assert!(base.diff(&plain).requires_reparse());
    }
}
