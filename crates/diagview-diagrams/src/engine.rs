//! Rendering engine capability and lazy engine acquisition
//!
//! The core only ever talks to an engine through [`RenderingEngine`]:
//! configure it, ask whether a source is valid, ask it for markup.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  EngineLoader<E>  (one per process)          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  acquire() ── first call ──▶ factory().await ──▶ Rc<E>      │
//! │            ── later calls ─▶ cached Rc<E>                   │
//! └─────────────────────────────────────────────────────────────┘
//!            ▲                 ▲                 ▲
//!     DiagramRenderer   DiagramRenderer   DiagramRenderer
//! ```
//!
//! Engine configuration is global to the engine instance. Renders that
//! interleave with different themes race, and the last `initialize`
//! before a `render` wins.

use std::cell::Cell;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;

use tokio::sync::OnceCell;

use crate::error::{RenderError, RenderResult};
use crate::theme::ThemeVariables;

/// Vector markup produced by an engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMarkup {
    /// SVG document text
    pub markup: String,
}

impl RenderedMarkup {
    /// Wrap markup text
    pub fn new(markup: impl Into<String>) -> Self {
        Self {
            markup: markup.into(),
        }
    }
}

/// Capability that turns diagram source into vector markup
///
/// Implementations are driven from a single-threaded event loop, so the
/// returned futures need not be `Send`.
pub trait RenderingEngine {
    /// Human-readable name of this engine
    fn name(&self) -> &'static str;

    /// Apply theme variables to the engine
    ///
    /// This configuration is shared by every subsequent render.
    fn initialize(&self, theme: &ThemeVariables);

    /// Check whether the engine accepts the source
    fn check_valid(&self, source: &str) -> impl Future<Output = bool>;

    /// Generate vector markup for the source
    ///
    /// `id` is unique per call and may be embedded in the output.
    fn render(&self, id: &str, source: &str) -> impl Future<Output = RenderResult<RenderedMarkup>>;
}

type LoadFuture<E> = Pin<Box<dyn Future<Output = RenderResult<E>>>>;

/// Initialize-once-on-first-use holder for an engine
///
/// The factory runs at most once successfully; a failed load leaves the
/// cell empty so the next render tries again.
pub struct EngineLoader<E> {
    cell: OnceCell<Rc<E>>,
    factory: Box<dyn Fn() -> LoadFuture<E>>,
    loads: Cell<usize>,
}

impl<E: RenderingEngine + 'static> EngineLoader<E> {
    /// Create a loader around an async factory
    pub fn new<F, Fut>(factory: F) -> Self
    where
        F: Fn() -> Fut + 'static,
        Fut: Future<Output = RenderResult<E>> + 'static,
    {
        Self {
            cell: OnceCell::new(),
            factory: Box::new(move || Box::pin(factory())),
            loads: Cell::new(0),
        }
    }

    /// Create a loader that already holds an engine
    pub fn ready(engine: E) -> Self {
        Self {
            cell: OnceCell::new_with(Some(Rc::new(engine))),
            factory: Box::new(|| {
                Box::pin(async {
                    Err(RenderError::Unavailable(
                        "engine was provided up front".to_string(),
                    ))
                })
            }),
            loads: Cell::new(0),
        }
    }

    /// Get the engine, loading it on first use
    pub async fn acquire(&self) -> RenderResult<Rc<E>> {
        let engine = self
            .cell
            .get_or_try_init(|| {
                self.loads.set(self.loads.get() + 1);
                let load = (self.factory)();
                async move {
                    let engine = load.await?;
                    log::debug!("Loaded rendering engine: {}", engine.name());
                    Ok::<_, RenderError>(Rc::new(engine))
                }
            })
            .await?;
        Ok(Rc::clone(engine))
    }

    /// True once an engine has been loaded
    pub fn is_loaded(&self) -> bool {
        self.cell.initialized()
    }

    /// Number of times the factory has been invoked
    pub fn load_attempts(&self) -> usize {
        self.loads.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NullEngine;

    impl RenderingEngine for NullEngine {
        fn name(&self) -> &'static str {
            "null"
        }

        fn initialize(&self, _theme: &ThemeVariables) {}

        async fn check_valid(&self, _source: &str) -> bool {
            true
        }

        async fn render(&self, _id: &str, _source: &str) -> RenderResult<RenderedMarkup> {
            Ok(RenderedMarkup::new("<svg/>"))
        }
    }

    #[tokio::test]
    async fn test_loader_runs_factory_once() {
        let loader = EngineLoader::new(|| async { Ok(NullEngine) });
        assert!(!loader.is_loaded());

        let first = loader.acquire().await.unwrap();
        let second = loader.acquire().await.unwrap();

        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(loader.load_attempts(), 1);
        assert!(loader.is_loaded());
    }

    #[tokio::test]
    async fn test_concurrent_acquire_shares_one_load() {
        let loader = EngineLoader::new(|| async {
            tokio::task::yield_now().await;
            Ok(NullEngine)
        });

        let (a, b) = tokio::join!(loader.acquire(), loader.acquire());
        assert!(Rc::ptr_eq(&a.unwrap(), &b.unwrap()));
        assert_eq!(loader.load_attempts(), 1);
    }

    #[tokio::test]
    async fn test_failed_load_is_retried() {
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        let loader = EngineLoader::new(move || {
            let attempt = counter.get();
            counter.set(attempt + 1);
            async move {
                if attempt == 0 {
                    Err(RenderError::Unavailable("not yet".to_string()))
                } else {
                    Ok(NullEngine)
                }
            }
        });

        assert!(matches!(
            loader.acquire().await,
            Err(RenderError::Unavailable(_))
        ));
        assert!(!loader.is_loaded());
        assert!(loader.acquire().await.is_ok());
        assert_eq!(calls.get(), 2);
    }

    #[tokio::test]
    async fn test_ready_loader_skips_factory() {
        let loader = EngineLoader::ready(NullEngine);
        assert!(loader.is_loaded());
        assert!(loader.acquire().await.is_ok());
        assert_eq!(loader.load_attempts(), 0);
    }
}
