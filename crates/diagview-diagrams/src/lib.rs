//! # diagview-diagrams
//!
//! Deferred diagram rendering for document previews.
//!
//! A [`DiagramRenderer`] takes diagram source text, asks a
//! [`RenderingEngine`] for SVG markup and writes it into a
//! [`DisplaySurface`]. When the engine rejects the source, the source is
//! shown as escaped text instead. Clicking a rendered diagram exports it
//! as a PNG at a fixed width and posts it to the host.
//!
//! ## Engines
//!
//! - `NativeEngine` (feature `native`): offline, svgbob ASCII art
//! - `KrokiEngine` (feature `kroki`): Mermaid and friends via Kroki
//!
//! ## Example
//!
//! ```no_run
//! # #[cfg(feature = "native")]
//! # async fn demo() {
//! use std::rc::Rc;
//! use diagview_diagrams::{
//!     DiagramRenderer, EngineLoader, MemorySurface, NativeEngine, Settings,
//! };
//!
//! let settings = Settings::default();
//! let engine = Rc::new(EngineLoader::new(|| async { Ok(NativeEngine::new()) }));
//! let renderer = DiagramRenderer::new(engine, MemorySurface::new());
//!
//! renderer
//!     .render("+--+\n|A |\n+--+".into(), settings.theme_variables())
//!     .await;
//!
//! let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
//! renderer.handle_click(&settings.exporter(), &tx).await;
//! let message = rx.recv().await;
//! # }
//! ```
//!
//! Render futures are not `Send`; drive them on a current-thread runtime
//! or a `LocalSet`.

pub mod config;
pub mod engine;
pub mod error;
pub mod gate;
pub mod host;
pub mod liveness;
pub mod raster;
pub mod renderer;
pub mod state;
pub mod surface;
pub mod theme;
pub mod types;

#[cfg(feature = "kroki")]
pub mod kroki;
#[cfg(feature = "native")]
pub mod native;

pub use config::{EngineKind, Settings};
pub use engine::{EngineLoader, RenderedMarkup, RenderingEngine};
pub use error::{ConfigError, ConversionError, RenderError};
pub use gate::{GateView, LazyRenderGate};
pub use host::{HostChannel, HostMessage};
pub use raster::{RasterExporter, RasterImage, Size, VectorGraphic};
pub use renderer::{ClickOutcome, DiagramRenderer, RenderOutcome};
pub use state::RenderState;
pub use surface::{DisplaySurface, MemorySurface, SurfaceStyle};
pub use theme::{ThemeConfiguration, ThemeOverrides, ThemeVariables};
pub use types::{DiagramSource, DiagramType};

#[cfg(feature = "kroki")]
pub use kroki::KrokiEngine;
#[cfg(feature = "native")]
pub use native::NativeEngine;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
