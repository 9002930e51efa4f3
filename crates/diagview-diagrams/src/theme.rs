//! Theme palette and per-render theme variables
//!
//! [`ThemeConfiguration`] is the static palette. [`ThemeVariables`] is the
//! map handed to an engine for one render call: the palette, the per-call
//! defaults, then any host overrides, later entries winning.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Font stack used when the host does not provide one
pub const DEFAULT_FONT_FAMILY: &str = "'Segoe UI', Tahoma, Geneva, Verdana, sans-serif";

/// Font size applied to every render
pub const DEFAULT_FONT_SIZE: &str = "16px";

/// Dark palette matching the host editor
const DARK_PALETTE: &[(&str, &str)] = &[
    ("background", "#1e1e1e"),
    ("textColor", "#ffffff"),
    ("mainBkg", "#2d2d2d"),
    ("nodeBorder", "#888888"),
    ("lineColor", "#cccccc"),
    ("primaryColor", "#3c3c3c"),
    ("primaryTextColor", "#ffffff"),
    ("primaryBorderColor", "#888888"),
    ("secondaryColor", "#2d2d2d"),
    ("tertiaryColor", "#454545"),
    // Class diagrams
    ("classText", "#ffffff"),
    // State diagrams
    ("labelColor", "#ffffff"),
    // Sequence diagrams
    ("actorLineColor", "#cccccc"),
    ("actorBkg", "#2d2d2d"),
    ("actorBorder", "#888888"),
    ("actorTextColor", "#ffffff"),
    // Flowcharts
    ("fillType0", "#2d2d2d"),
    ("fillType1", "#3c3c3c"),
    ("fillType2", "#454545"),
];

/// Variables set on every render call on top of the palette
const CALL_DEFAULTS: &[(&str, &str)] = &[
    ("noteTextColor", "#ffffff"),
    ("noteBkgColor", "#454545"),
    ("noteBorderColor", "#888888"),
    ("critBorderColor", "#ff9580"),
    ("critBkgColor", "#803d36"),
    ("taskTextColor", "#ffffff"),
    ("taskTextOutsideColor", "#ffffff"),
    ("taskTextLightColor", "#ffffff"),
    ("sectionBkgColor", "#2d2d2d"),
    ("sectionBkgColor2", "#3c3c3c"),
    ("altBackground", "#2d2d2d"),
    ("linkColor", "#6cb6ff"),
    ("compositeBackground", "#2d2d2d"),
    ("compositeBorder", "#888888"),
    ("titleColor", "#ffffff"),
];

/// Static style palette consumed by the engines
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThemeConfiguration {
    /// Engine base theme name
    pub base_theme: &'static str,
    palette: &'static [(&'static str, &'static str)],
}

impl Default for ThemeConfiguration {
    fn default() -> Self {
        Self::dark()
    }
}

impl ThemeConfiguration {
    /// The dark palette
    pub fn dark() -> Self {
        Self {
            base_theme: "dark",
            palette: DARK_PALETTE,
        }
    }

    /// Look up a palette entry
    pub fn get(&self, name: &str) -> Option<&'static str> {
        self.palette
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| *value)
    }

    /// Background color used behind exported images
    pub fn background(&self) -> &'static str {
        self.get("background").unwrap_or("#1e1e1e")
    }

    /// Iterate palette entries
    pub fn entries(&self) -> impl Iterator<Item = (&'static str, &'static str)> + '_ {
        self.palette.iter().copied()
    }
}

/// Host-provided adjustments for one render call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThemeOverrides {
    /// Font family inherited from the host environment
    pub font_family: Option<String>,
    /// Font size (CSS length)
    pub font_size: Option<String>,
    /// Arbitrary variable overrides
    pub variables: BTreeMap<String, String>,
}

/// Theme variables handed to an engine for one render call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThemeVariables {
    /// Engine base theme name
    pub base_theme: String,
    /// Variable name to value
    pub variables: BTreeMap<String, String>,
}

impl ThemeVariables {
    /// Merge the palette with per-call defaults and host overrides
    pub fn merged(config: &ThemeConfiguration, overrides: &ThemeOverrides) -> Self {
        let mut variables: BTreeMap<String, String> = config
            .entries()
            .chain(CALL_DEFAULTS.iter().copied())
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        variables.insert(
            "fontSize".to_string(),
            overrides
                .font_size
                .clone()
                .unwrap_or_else(|| DEFAULT_FONT_SIZE.to_string()),
        );
        variables.insert(
            "fontFamily".to_string(),
            overrides
                .font_family
                .clone()
                .unwrap_or_else(|| DEFAULT_FONT_FAMILY.to_string()),
        );

        for (name, value) in &overrides.variables {
            variables.insert(name.clone(), value.clone());
        }

        Self {
            base_theme: config.base_theme.to_string(),
            variables,
        }
    }

    /// Look up a variable
    pub fn get(&self, name: &str) -> Option<&str> {
        self.variables.get(name).map(String::as_str)
    }

    /// Background color, if set
    pub fn background(&self) -> Option<&str> {
        self.get("background")
    }
}

/// Parse a CSS color string to tiny_skia::Color
pub fn parse_color(color: &str) -> Option<tiny_skia::Color> {
    let color = color.trim().to_lowercase();

    // Named colors
    match color.as_str() {
        "white" => return Some(tiny_skia::Color::WHITE),
        "black" => return Some(tiny_skia::Color::BLACK),
        "transparent" => return Some(tiny_skia::Color::TRANSPARENT),
        _ => {}
    }

    let hex = color.strip_prefix('#')?;
    if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    match hex.len() {
        3 => {
            // #RGB -> #RRGGBB
            let r = u8::from_str_radix(&hex[0..1].repeat(2), 16).ok()?;
            let g = u8::from_str_radix(&hex[1..2].repeat(2), 16).ok()?;
            let b = u8::from_str_radix(&hex[2..3].repeat(2), 16).ok()?;
            Some(tiny_skia::Color::from_rgba8(r, g, b, 255))
        }
        6 => {
            let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
            let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
            let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
            Some(tiny_skia::Color::from_rgba8(r, g, b, 255))
        }
        8 => {
            let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
            let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
            let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
            let a = u8::from_str_radix(&hex[6..8], 16).ok()?;
            Some(tiny_skia::Color::from_rgba8(r, g, b, a))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dark_palette() {
        let theme = ThemeConfiguration::dark();
        assert_eq!(theme.base_theme, "dark");
        assert_eq!(theme.background(), "#1e1e1e");
        assert_eq!(theme.get("lineColor"), Some("#cccccc"));
        assert_eq!(theme.get("noSuchColor"), None);
    }

    #[test]
    fn test_merged_defaults() {
        let vars = ThemeVariables::merged(&ThemeConfiguration::dark(), &ThemeOverrides::default());
        assert_eq!(vars.base_theme, "dark");
        assert_eq!(vars.get("fontSize"), Some("16px"));
        assert_eq!(vars.get("fontFamily"), Some(DEFAULT_FONT_FAMILY));
        assert_eq!(vars.get("linkColor"), Some("#6cb6ff"));
        assert_eq!(vars.get("mainBkg"), Some("#2d2d2d"));
        assert_eq!(vars.background(), Some("#1e1e1e"));
    }

    #[test]
    fn test_overrides_win() {
        let mut overrides = ThemeOverrides {
            font_family: Some("Fira Sans".to_string()),
            ..Default::default()
        };
        overrides
            .variables
            .insert("background".to_string(), "#000000".to_string());

        let vars = ThemeVariables::merged(&ThemeConfiguration::dark(), &overrides);
        assert_eq!(vars.get("fontFamily"), Some("Fira Sans"));
        assert_eq!(vars.background(), Some("#000000"));
        // Untouched entries survive the merge
        assert_eq!(vars.get("textColor"), Some("#ffffff"));
    }

    #[test]
    fn test_parse_color() {
        assert_eq!(parse_color("white"), Some(tiny_skia::Color::WHITE));
        assert_eq!(
            parse_color("#1e1e1e"),
            Some(tiny_skia::Color::from_rgba8(0x1e, 0x1e, 0x1e, 255))
        );
        assert!(parse_color("#fff").is_some());
        assert!(parse_color("#ffffffff").is_some());
        assert!(parse_color("#ff").is_none());
        assert!(parse_color("invalid").is_none());
    }

    #[test]
    fn test_parse_color_rejects_non_hex_digits() {
        assert!(parse_color("#é1").is_none());
        assert!(parse_color("#ffé").is_none());
        assert!(parse_color("#12345é").is_none());
        assert!(parse_color("#+1f").is_none());
    }
}
