//! Settings structures

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::raster::{RasterExporter, DEFAULT_TARGET_WIDTH};
use crate::theme::{parse_color, ThemeConfiguration, ThemeOverrides, ThemeVariables};
use crate::types::DiagramType;

/// File name looked up next to diagram sources
pub const CONFIG_FILE_NAME: &str = "diagview.toml";

/// Top-level settings structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    /// Engine selection
    pub engine: EngineSettings,
    /// Host theme overrides
    pub theme: ThemeOverrides,
    /// Raster export settings
    pub export: ExportSettings,
}

impl Settings {
    /// Parse settings from a TOML string
    pub fn from_toml_str(toml_str: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(toml_str)
    }

    /// Load settings from a file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let settings = Self::from_toml_str(&text)?;
        log::debug!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Load `diagview.toml` from a directory, falling back to defaults
    pub fn discover(dir: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = dir.as_ref().join(CONFIG_FILE_NAME);
        if path.is_file() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Theme variables for a render call
    pub fn theme_variables(&self) -> ThemeVariables {
        ThemeVariables::merged(&ThemeConfiguration::dark(), &self.theme)
    }

    /// Exporter configured from these settings
    ///
    /// Without a usable `[export] background`, the PNG is filled with the
    /// merged theme's `background`, host overrides included.
    pub fn exporter(&self) -> RasterExporter {
        let background = match &self.export.background {
            Some(color) => parse_color(color).unwrap_or_else(|| {
                log::warn!("Unrecognized export background '{}', using theme", color);
                self.theme_background()
            }),
            None => self.theme_background(),
        };
        RasterExporter::new(self.export.width, background)
    }

    fn theme_background(&self) -> tiny_skia::Color {
        let variables = self.theme_variables();
        variables
            .background()
            .and_then(parse_color)
            .or_else(|| parse_color(ThemeConfiguration::dark().background()))
            .unwrap_or(tiny_skia::Color::BLACK)
    }
}

/// Which engine renders diagrams
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    /// Offline svgbob engine
    #[default]
    Native,
    /// Kroki HTTP service
    Kroki,
}

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Engine to use
    pub kind: EngineKind,
    /// Kroki server URL
    pub kroki_url: String,
    /// Diagram type sent to Kroki
    pub diagram_type: DiagramType,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl EngineSettings {
    /// Request timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            kind: EngineKind::Native,
            kroki_url: "https://kroki.io".to_string(),
            diagram_type: DiagramType::Mermaid,
            timeout_secs: 30,
        }
    }
}

/// Raster export configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportSettings {
    /// Output width in pixels
    pub width: u32,
    /// Background color; the theme background when unset
    pub background: Option<String>,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            width: DEFAULT_TARGET_WIDTH,
            background: None,
        }
    }
}
