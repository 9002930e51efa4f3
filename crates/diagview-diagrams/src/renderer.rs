//! Render lifecycle of one diagram instance
//!
//! A [`DiagramRenderer`] turns a [`DiagramSource`] into displayed markup or
//! into an escaped text fallback, and hands the rendered graphic to the
//! raster exporter when clicked.
//!
//! # Lifecycle
//!
//! ```text
//! render(A) ─▶ Loading ─┬─ engine ok ──────────▶ Rendered(markup)
//!                       └─ invalid / error ────▶ Failed(escaped A)
//! render(B) while A is pending: A's completion is discarded
//! teardown(): every pending completion is discarded
//! ```
//!
//! Pending engine calls are never aborted. Each render holds a
//! [`Liveness`] token and checks it before touching state or surface.

use std::cell::{Cell, Ref, RefCell};
use std::future::Future;
use std::rc::Rc;

use uuid::Uuid;

use crate::engine::{EngineLoader, RenderingEngine};
use crate::error::{RenderError, RenderResult};
use crate::host::{HostChannel, HostMessage};
use crate::liveness::{Generation, Liveness};
use crate::raster::{RasterExporter, VectorGraphic};
use crate::state::{escape_source, RenderState};
use crate::surface::{DisplaySurface, SurfaceStyle};
use crate::theme::ThemeVariables;
use crate::types::DiagramSource;

/// How a render call ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderOutcome {
    /// The result was written to state and surface
    Applied(RenderState),
    /// A newer render or a teardown made the result irrelevant
    Discarded,
}

/// How a click ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickOutcome {
    /// Nothing rendered yet, or the render failed
    Inert,
    /// An image was exported and posted to the host
    Exported { width: u32, height: u32 },
    /// Export failed; nothing was posted
    Failed,
    /// The renderer was torn down during export; nothing was posted
    Discarded,
}

struct Inner<S> {
    generation: Generation,
    torn_down: Cell<bool>,
    state: RefCell<RenderState>,
    source: RefCell<Option<DiagramSource>>,
    surface: RefCell<S>,
}

impl<S: DisplaySurface> Inner<S> {
    fn begin(&self, source: &DiagramSource) -> Option<Liveness> {
        if self.torn_down.get() {
            return None;
        }

        let token = self.generation.advance();
        *self.state.borrow_mut() = RenderState::Loading;
        *self.source.borrow_mut() = Some(source.clone());
        self.surface.borrow_mut().set_style(SurfaceStyle::loading());

        log::debug!(
            "Render #{} started for {}",
            token.generation(),
            source.content_hash()
        );
        Some(token)
    }

    fn clear_if_live(&self, token: &Liveness) -> bool {
        if !token.is_live() {
            return false;
        }
        self.surface.borrow_mut().clear();
        true
    }

    fn settle(
        &self,
        token: &Liveness,
        source: &DiagramSource,
        result: Option<RenderResult<String>>,
    ) -> RenderOutcome {
        let result = match result {
            Some(result) if token.is_live() => result,
            _ => {
                log::debug!("Render #{} discarded", token.generation());
                return RenderOutcome::Discarded;
            }
        };

        let state = match result {
            Ok(markup) => RenderState::Rendered(markup),
            Err(e) => {
                log::warn!("Diagram parse/render failed: {}", e);
                RenderState::Failed(escape_source(source.as_str()))
            }
        };

        {
            let mut surface = self.surface.borrow_mut();
            match &state {
                RenderState::Rendered(content) | RenderState::Failed(content) => {
                    surface.set_content(content)
                }
                RenderState::Loading => {}
            }
            surface.set_style(SurfaceStyle::settled());
        }
        *self.state.borrow_mut() = state.clone();

        log::debug!("Render #{} settled: {}", token.generation(), state.label());
        RenderOutcome::Applied(state)
    }
}

/// Owns the render lifecycle and display surface of one diagram
///
/// Dropping the renderer tears it down.
pub struct DiagramRenderer<E, S> {
    engine: Rc<EngineLoader<E>>,
    inner: Rc<Inner<S>>,
}

impl<E, S> DiagramRenderer<E, S>
where
    E: RenderingEngine + 'static,
    S: DisplaySurface + 'static,
{
    /// Create a renderer writing into `surface`
    pub fn new(engine: Rc<EngineLoader<E>>, surface: S) -> Self {
        Self {
            engine,
            inner: Rc::new(Inner {
                generation: Generation::new(),
                torn_down: Cell::new(false),
                state: RefCell::new(RenderState::Loading),
                source: RefCell::new(None),
                surface: RefCell::new(surface),
            }),
        }
    }

    /// Start rendering `source`
    ///
    /// The state moves to `Loading` immediately and any earlier render is
    /// superseded. The returned future drives the engine and resolves once
    /// the result has been applied or discarded; the host awaits it or
    /// spawns it on a local task set.
    ///
    /// Dropping the future before it resolves abandons the render: the
    /// state stays `Loading` and clicks stay inert until another call to
    /// `render` settles. `set_source` with the abandoned source is a no-op,
    /// so recovery goes through `render`.
    pub fn render(
        &self,
        source: DiagramSource,
        theme: ThemeVariables,
    ) -> impl Future<Output = RenderOutcome> + 'static {
        let token = self.inner.begin(&source);
        let engine = Rc::clone(&self.engine);
        let inner = Rc::clone(&self.inner);

        async move {
            let Some(token) = token else {
                return RenderOutcome::Discarded;
            };
            let result = produce_markup(&engine, &inner, &token, &source, &theme).await;
            inner.settle(&token, &source, result)
        }
    }

    /// Start rendering only if `source` differs from the current source
    pub fn set_source(
        &self,
        source: DiagramSource,
        theme: ThemeVariables,
    ) -> Option<impl Future<Output = RenderOutcome> + 'static> {
        if self.inner.source.borrow().as_ref() == Some(&source) {
            return None;
        }
        Some(self.render(source, theme))
    }

    /// Export the rendered graphic and post it to the host
    ///
    /// Inert unless the state is `Rendered`. Conversion failures are
    /// logged and swallowed.
    pub async fn handle_click<H: HostChannel>(
        &self,
        exporter: &RasterExporter,
        host: &H,
    ) -> ClickOutcome {
        let graphic = {
            let state = self.inner.state.borrow();
            let Some(markup) = state.markup() else {
                return ClickOutcome::Inert;
            };
            VectorGraphic::new(markup).with_fallback_size(self.inner.surface.borrow().client_size())
        };

        match exporter.export(graphic).await {
            Ok(image) => {
                if self.inner.torn_down.get() {
                    log::debug!("Renderer torn down during export, image dropped");
                    return ClickOutcome::Discarded;
                }
                host.post(HostMessage::OpenImage {
                    payload: image.to_data_url(),
                });
                ClickOutcome::Exported {
                    width: image.width,
                    height: image.height,
                }
            }
            Err(e) => {
                log::error!("Error converting SVG to PNG: {}", e);
                ClickOutcome::Failed
            }
        }
    }

    /// Discard every pending render
    pub fn teardown(&self) {
        if !self.inner.torn_down.replace(true) {
            self.inner.generation.invalidate();
            log::debug!("Renderer torn down");
        }
    }

    /// True after `teardown` or drop
    pub fn is_torn_down(&self) -> bool {
        self.inner.torn_down.get()
    }

    /// Snapshot of the current state
    pub fn state(&self) -> RenderState {
        self.inner.state.borrow().clone()
    }

    /// The most recently requested source
    pub fn source(&self) -> Option<DiagramSource> {
        self.inner.source.borrow().clone()
    }

    /// Borrow the display surface
    pub fn surface(&self) -> Ref<'_, S> {
        self.inner.surface.borrow()
    }
}

impl<E, S> Drop for DiagramRenderer<E, S> {
    fn drop(&mut self) {
        if !self.inner.torn_down.replace(true) {
            self.inner.generation.invalidate();
        }
    }
}

/// Drive the engine; `None` means the token went stale before validation
async fn produce_markup<E, S>(
    loader: &EngineLoader<E>,
    inner: &Inner<S>,
    token: &Liveness,
    source: &DiagramSource,
    theme: &ThemeVariables,
) -> Option<RenderResult<String>>
where
    E: RenderingEngine + 'static,
    S: DisplaySurface,
{
    let engine = match loader.acquire().await {
        Ok(engine) => engine,
        Err(e) => return Some(Err(e)),
    };

    // Global to the engine: the last theme applied before a render wins
    engine.initialize(theme);

    if !inner.clear_if_live(token) {
        return None;
    }

    if !engine.check_valid(source.as_str()).await {
        return Some(Err(RenderError::Validation(
            "Invalid or incomplete diagram source".to_string(),
        )));
    }

    let id = format!("diagram-{}", Uuid::new_v4().simple());
    let result = match engine.render(&id, source.as_str()).await {
        Ok(rendered) => validate_markup(rendered.markup),
        Err(e) => Err(e),
    };
    Some(result)
}

/// Reject engine output that cannot be vector markup
fn validate_markup(markup: String) -> RenderResult<String> {
    let trimmed = markup.trim();
    if trimmed.is_empty() {
        return Err(RenderError::Malformed("engine returned no markup".to_string()));
    }
    if !trimmed.contains("<svg") {
        return Err(RenderError::Malformed(
            "engine output has no <svg> element".to_string(),
        ));
    }
    Ok(markup)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::RenderedMarkup;
    use crate::surface::{MemorySurface, LOADING_OPACITY, SETTLED_OPACITY};
    use crate::theme::{ThemeConfiguration, ThemeOverrides};

    struct EchoEngine;

    impl RenderingEngine for EchoEngine {
        fn name(&self) -> &'static str {
            "echo"
        }

        fn initialize(&self, _theme: &ThemeVariables) {}

        async fn check_valid(&self, source: &str) -> bool {
            source.starts_with("graph")
        }

        async fn render(&self, id: &str, _source: &str) -> RenderResult<RenderedMarkup> {
            Ok(RenderedMarkup::new(format!(r#"<svg id="{}"></svg>"#, id)))
        }
    }

    fn theme() -> ThemeVariables {
        ThemeVariables::merged(&ThemeConfiguration::dark(), &ThemeOverrides::default())
    }

    fn renderer() -> DiagramRenderer<EchoEngine, MemorySurface> {
        DiagramRenderer::new(Rc::new(EngineLoader::ready(EchoEngine)), MemorySurface::new())
    }

    #[test]
    fn test_validate_markup() {
        assert!(validate_markup("<svg></svg>".to_string()).is_ok());
        assert!(matches!(
            validate_markup("  ".to_string()),
            Err(RenderError::Malformed(_))
        ));
        assert!(matches!(
            validate_markup("<div></div>".to_string()),
            Err(RenderError::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn test_render_dims_then_settles() {
        let renderer = renderer();
        let pending = renderer.render("graph TD; A-->B".into(), theme());

        assert_eq!(renderer.state(), RenderState::Loading);
        assert_eq!(renderer.surface().style().opacity, LOADING_OPACITY);

        let outcome = pending.await;
        assert!(matches!(outcome, RenderOutcome::Applied(RenderState::Rendered(_))));
        assert_eq!(renderer.surface().style().opacity, SETTLED_OPACITY);
        assert!(renderer.surface().content().starts_with(r#"<svg id="diagram-"#));
    }

    #[tokio::test]
    async fn test_render_ids_are_unique() {
        let renderer = renderer();
        renderer.render("graph A".into(), theme()).await;
        let first = renderer.surface().content().to_string();
        renderer.render("graph B".into(), theme()).await;
        assert_ne!(first, renderer.surface().content());
    }

    #[tokio::test]
    async fn test_render_after_teardown_is_discarded() {
        let renderer = renderer();
        renderer.teardown();
        assert!(renderer.is_torn_down());

        let outcome = renderer.render("graph TD".into(), theme()).await;
        assert_eq!(outcome, RenderOutcome::Discarded);
        assert_eq!(renderer.surface().writes(), 0);
    }

    #[tokio::test]
    async fn test_set_source_skips_equal_value() {
        let renderer = renderer();
        renderer
            .set_source("graph TD".into(), theme())
            .expect("first source renders")
            .await;
        assert!(renderer.set_source("graph TD".into(), theme()).is_none());
        assert!(renderer.set_source("graph LR".into(), theme()).is_some());
    }
}
