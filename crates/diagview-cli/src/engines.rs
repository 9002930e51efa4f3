//! Engine selection
//!
//! Wraps the concrete engines so one renderer type serves every
//! configured engine.

use diagview_diagrams::config::{EngineKind, EngineSettings};
use diagview_diagrams::error::RenderResult;
use diagview_diagrams::{
    KrokiEngine, NativeEngine, RenderedMarkup, RenderingEngine, ThemeVariables,
};

/// Engine chosen at runtime from settings
#[derive(Debug)]
pub enum AnyEngine {
    /// Offline svgbob engine
    Native(NativeEngine),
    /// Kroki HTTP engine
    Kroki(KrokiEngine),
}

impl AnyEngine {
    /// Build the engine described by `settings`
    pub fn from_settings(settings: &EngineSettings) -> RenderResult<Self> {
        match settings.kind {
            EngineKind::Native => Ok(Self::Native(NativeEngine::new())),
            EngineKind::Kroki => Ok(Self::Kroki(KrokiEngine::with_url(
                settings.kroki_url.as_str(),
                settings.diagram_type,
                settings.timeout(),
            )?)),
        }
    }
}

impl RenderingEngine for AnyEngine {
    fn name(&self) -> &'static str {
        match self {
            Self::Native(engine) => engine.name(),
            Self::Kroki(engine) => engine.name(),
        }
    }

    fn initialize(&self, theme: &ThemeVariables) {
        match self {
            Self::Native(engine) => engine.initialize(theme),
            Self::Kroki(engine) => engine.initialize(theme),
        }
    }

    async fn check_valid(&self, source: &str) -> bool {
        match self {
            Self::Native(engine) => engine.check_valid(source).await,
            Self::Kroki(engine) => engine.check_valid(source).await,
        }
    }

    async fn render(&self, id: &str, source: &str) -> RenderResult<RenderedMarkup> {
        match self {
            Self::Native(engine) => engine.render(id, source).await,
            Self::Kroki(engine) => engine.render(id, source).await,
        }
    }
}
