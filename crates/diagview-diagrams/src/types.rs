//! Type definitions for diagram sources
//!
//! This module defines the diagram source value and the diagram types
//! an engine can be asked to render.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Diagram description text
///
/// Opaque to the core; two sources are the same diagram iff their text is
/// equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct DiagramSource(String);

impl DiagramSource {
    /// Wrap diagram text
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    /// The raw diagram text
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True if the text is empty or whitespace only
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// SHA-256 of the text, used to tag log lines
    pub fn content_hash(&self) -> String {
        let digest = Sha256::digest(self.0.as_bytes());
        let hex: String = digest.iter().map(|b| format!("{:02x}", b)).collect();
        format!("sha256:{}", hex)
    }
}

impl From<&str> for DiagramSource {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl From<String> for DiagramSource {
    fn from(text: String) -> Self {
        Self(text)
    }
}

impl fmt::Display for DiagramSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Diagram language, used to pick the Kroki endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DiagramType {
    #[default]
    Mermaid,
    PlantUml,
    /// DOT
    GraphViz,
    D2,
    Nomnoml,
    Pikchr,
    /// ASCII art; also what the native engine draws
    Svgbob,
}

/// Endpoint name and source file extensions of a diagram type
struct Route {
    endpoint: &'static str,
    extensions: &'static [&'static str],
}

static ALL_TYPES: [DiagramType; 7] = [
    DiagramType::Mermaid,
    DiagramType::PlantUml,
    DiagramType::GraphViz,
    DiagramType::D2,
    DiagramType::Nomnoml,
    DiagramType::Pikchr,
    DiagramType::Svgbob,
];

impl DiagramType {

    fn route(self) -> Route {
        let (endpoint, extensions): (&'static str, &'static [&'static str]) = match self {
            Self::Mermaid => ("mermaid", &["mmd", "mermaid"]),
            Self::PlantUml => ("plantuml", &["puml", "plantuml", "pu"]),
            Self::GraphViz => ("graphviz", &["dot", "gv"]),
            Self::D2 => ("d2", &["d2"]),
            Self::Nomnoml => ("nomnoml", &["nomnoml"]),
            Self::Pikchr => ("pikchr", &["pikchr"]),
            Self::Svgbob => ("svgbob", &["svgbob", "bob"]),
        };
        Route {
            endpoint,
            extensions,
        }
    }

    /// Path segment of the Kroki endpoint
    pub fn kroki_name(&self) -> &'static str {
        self.route().endpoint
    }

    /// Source file extensions, without the dot
    pub fn file_extensions(&self) -> &'static [&'static str] {
        self.route().extensions
    }

    /// Look up a type by file extension, case-insensitively
    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.trim_start_matches('.').to_ascii_lowercase();
        ALL_TYPES
            .iter()
            .copied()
            .find(|kind| kind.file_extensions().contains(&ext.as_str()))
    }

    /// Every known type
    pub fn all() -> &'static [DiagramType] {
        &ALL_TYPES
    }
}

impl fmt::Display for DiagramType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kroki_name())
    }
}

/// Error returned when a diagram type name is not recognised
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unsupported diagram type: {0}")]
pub struct UnknownDiagramType(pub String);

impl FromStr for DiagramType {
    type Err = UnknownDiagramType;

    /// Accepts endpoint names and file extensions
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();
        ALL_TYPES
            .iter()
            .copied()
            .find(|kind| kind.kroki_name() == name)
            .or_else(|| Self::from_extension(&name))
            .ok_or_else(|| UnknownDiagramType(s.to_string()))
    }
}
