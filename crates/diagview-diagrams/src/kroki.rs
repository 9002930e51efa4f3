//! Kroki rendering engine
//!
//! This module renders diagrams through the [Kroki](https://kroki.io)
//! HTTP service, which supports Mermaid and many other diagram types.
//!
//! Mermaid sources get the engine's current theme prepended as an
//! `%%{init: ...}%%` directive. The theme lives on the engine and is
//! replaced by every `initialize` call.

use std::io::Write;
use std::sync::Mutex;
use std::time::Duration;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use reqwest::Client;

use crate::engine::{RenderedMarkup, RenderingEngine};
use crate::error::{RenderError, RenderResult};
use crate::theme::ThemeVariables;
use crate::types::DiagramType;

/// Default Kroki server URL
pub const DEFAULT_KROKI_URL: &str = "https://kroki.io";

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Keywords that open a Mermaid diagram
const MERMAID_KEYWORDS: &[&str] = &[
    "graph",
    "flowchart",
    "sequenceDiagram",
    "classDiagram",
    "stateDiagram",
    "stateDiagram-v2",
    "erDiagram",
    "journey",
    "gantt",
    "pie",
    "quadrantChart",
    "requirementDiagram",
    "gitGraph",
    "C4Context",
    "C4Container",
    "C4Component",
    "C4Dynamic",
    "C4Deployment",
    "mindmap",
    "timeline",
    "sankey-beta",
    "xychart-beta",
    "block-beta",
];

/// Engine that renders through a Kroki server
#[derive(Debug)]
pub struct KrokiEngine {
    /// Base URL of the Kroki server
    base_url: String,
    /// HTTP client
    client: Client,
    /// Diagram type sent to Kroki
    diagram_type: DiagramType,
    /// Theme from the most recent `initialize`
    theme: Mutex<Option<ThemeVariables>>,
}

impl KrokiEngine {
    /// Create an engine for Mermaid diagrams on the default Kroki server
    pub fn new() -> RenderResult<Self> {
        Self::with_url(DEFAULT_KROKI_URL, DiagramType::Mermaid, DEFAULT_TIMEOUT)
    }

    /// Create an engine for a custom server, diagram type and timeout
    pub fn with_url(
        base_url: impl Into<String>,
        diagram_type: DiagramType,
        timeout: Duration,
    ) -> RenderResult<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            base_url,
            client,
            diagram_type,
            theme: Mutex::new(None),
        })
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Get the diagram type this engine renders
    pub fn diagram_type(&self) -> DiagramType {
        self.diagram_type
    }

    /// Body sent to Kroki for a source, theme directive included
    pub fn request_body(&self, source: &str) -> String {
        let theme = self.theme.lock().ok().and_then(|theme| theme.clone());
        match (self.diagram_type, theme) {
            (DiagramType::Mermaid, Some(theme)) => {
                format!("{}\n{}", init_directive(&theme), source)
            }
            _ => source.to_string(),
        }
    }

    /// Encode diagram source for use in URLs (zlib + base64)
    pub fn encode_source(source: &str) -> RenderResult<String> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder
            .write_all(source.as_bytes())
            .map_err(|e| RenderError::Engine(e.to_string()))?;
        let compressed = encoder
            .finish()
            .map_err(|e| RenderError::Engine(e.to_string()))?;

        Ok(URL_SAFE_NO_PAD.encode(compressed))
    }

    /// Generate a shareable SVG URL for a diagram (without rendering)
    pub fn diagram_url(&self, source: &str) -> RenderResult<String> {
        let encoded = Self::encode_source(source)?;
        Ok(format!(
            "{}/{}/svg/{}",
            self.base_url,
            self.diagram_type.kroki_name(),
            encoded
        ))
    }

    /// Check if the Kroki server is available
    pub async fn health_check(&self) -> RenderResult<bool> {
        let url = format!("{}/health", self.base_url);
        let response = self.client.get(&url).send().await?;
        Ok(response.status().is_success())
    }
}

/// Build the Mermaid init directive for a theme
fn init_directive(theme: &ThemeVariables) -> String {
    let config = serde_json::json!({
        "startOnLoad": false,
        "securityLevel": "loose",
        "theme": theme.base_theme,
        "themeVariables": theme.variables,
    });
    format!("%%{{init: {}}}%%", config)
}

/// True if the first meaningful line opens a Mermaid diagram
fn looks_like_mermaid(source: &str) -> bool {
    let first = source
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty() && !line.starts_with("%%") && *line != "---");

    let Some(line) = first else {
        return false;
    };
    let keyword = line
        .split(|c: char| c.is_whitespace() || c == ';')
        .next()
        .unwrap_or_default();
    MERMAID_KEYWORDS.contains(&keyword)
}

impl RenderingEngine for KrokiEngine {
    fn name(&self) -> &'static str {
        "kroki"
    }

    fn initialize(&self, theme: &ThemeVariables) {
        if let Ok(mut current) = self.theme.lock() {
            *current = Some(theme.clone());
        }
    }

    async fn check_valid(&self, source: &str) -> bool {
        match self.diagram_type {
            DiagramType::Mermaid => looks_like_mermaid(source),
            _ => !source.trim().is_empty(),
        }
    }

    async fn render(&self, _id: &str, source: &str) -> RenderResult<RenderedMarkup> {
        let url = format!("{}/{}/svg", self.base_url, self.diagram_type.kroki_name());

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "text/plain")
            .body(self.request_body(source))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(RenderError::Engine(format!(
                "Kroki returned {}: {}",
                status.as_u16(),
                message.trim()
            )));
        }

        Ok(RenderedMarkup::new(response.text().await?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::theme::{ThemeConfiguration, ThemeOverrides};

    fn engine() -> KrokiEngine {
        KrokiEngine::new().unwrap()
    }

    #[test]
    fn test_engine_default() {
        let engine = engine();
        assert_eq!(engine.base_url(), DEFAULT_KROKI_URL);
        assert_eq!(engine.diagram_type(), DiagramType::Mermaid);
    }

    #[test]
    fn test_engine_custom_url() {
        let engine =
            KrokiEngine::with_url("http://localhost:8000/", DiagramType::GraphViz, DEFAULT_TIMEOUT)
                .unwrap();
        assert_eq!(engine.base_url(), "http://localhost:8000");
    }

    #[test]
    fn test_mermaid_detection() {
        assert!(looks_like_mermaid("graph TD; A-->B"));
        assert!(looks_like_mermaid("%% comment\n  sequenceDiagram\n A->>B: hi"));
        assert!(looks_like_mermaid("graph;A-->B"));
        assert!(!looks_like_mermaid("not a diagram"));
        assert!(!looks_like_mermaid(""));
    }

    #[tokio::test]
    async fn test_check_valid_by_type() {
        assert!(engine().check_valid("flowchart LR\n A --> B").await);
        assert!(!engine().check_valid("<b>oops</b>").await);

        let dot = KrokiEngine::with_url(DEFAULT_KROKI_URL, DiagramType::GraphViz, DEFAULT_TIMEOUT)
            .unwrap();
        assert!(dot.check_valid("digraph { a -> b }").await);
        assert!(!dot.check_valid("   ").await);
    }

    #[test]
    fn test_request_body_carries_latest_theme() {
        let engine = engine();
        assert_eq!(engine.request_body("graph TD; A-->B"), "graph TD; A-->B");

        let mut overrides = ThemeOverrides::default();
        overrides
            .variables
            .insert("lineColor".to_string(), "#123456".to_string());
        engine.initialize(&ThemeVariables::merged(&ThemeConfiguration::dark(), &overrides));

        let body = engine.request_body("graph TD; A-->B");
        assert!(body.starts_with("%%{init: {"));
        assert!(body.contains("\"theme\":\"dark\""));
        assert!(body.contains("#123456"));
        assert!(body.ends_with("\ngraph TD; A-->B"));
    }

    #[test]
    fn test_encode_source() {
        let encoded = KrokiEngine::encode_source("graph TD; A-->B;").unwrap();

        // Should be URL-safe base64
        assert!(!encoded.contains('+'));
        assert!(!encoded.contains('/'));
        assert!(!encoded.is_empty());
    }

    #[test]
    fn test_diagram_url() {
        let url = engine().diagram_url("graph TD; A-->B;").unwrap();
        assert!(url.starts_with("https://kroki.io/mermaid/svg/"));
    }

    #[tokio::test]
    #[ignore] // Requires network access
    async fn test_render_mermaid_svg() {
        let engine = engine();
        match engine.render("diagram-net", "graph TD; A-->B; B-->C;").await {
            Ok(rendered) => assert!(rendered.markup.contains("<svg")),
            Err(e) => eprintln!("Kroki test skipped (network error): {}", e),
        }
    }

    #[tokio::test]
    #[ignore] // Requires network access
    async fn test_health_check() {
        match engine().health_check().await {
            Ok(healthy) => println!("Kroki health: {}", healthy),
            Err(e) => eprintln!("Kroki health check skipped: {}", e),
        }
    }
}
