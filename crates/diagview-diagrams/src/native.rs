//! Offline rendering engine
//!
//! Draws svgbob ASCII art without network access. Enabled by the `native`
//! feature, which is on by default.

use std::panic::catch_unwind;
use std::sync::Mutex;

use crate::engine::{RenderedMarkup, RenderingEngine};
use crate::error::{RenderError, RenderResult};
use crate::theme::ThemeVariables;

/// Offline engine backed by svgbob
///
/// svgbob draws with its own stylesheet, so the theme is recorded but not
/// applied to the output.
#[derive(Debug, Default)]
pub struct NativeEngine {
    theme: Mutex<Option<ThemeVariables>>,
}

impl NativeEngine {
    /// Create a new native engine
    pub fn new() -> Self {
        Self::default()
    }

    /// Theme most recently passed to `initialize`
    pub fn current_theme(&self) -> Option<ThemeVariables> {
        self.theme.lock().ok().and_then(|theme| theme.clone())
    }

    /// svgbob panics on some malformed input; that becomes an engine error
    fn draw(source: &str) -> RenderResult<String> {
        let source = source.to_string();
        match catch_unwind(move || svgbob::to_svg(&source)) {
            Ok(svg) if svg.is_empty() => Err(RenderError::Malformed(
                "Svgbob produced empty output".to_string(),
            )),
            Ok(svg) => Ok(svg),
            Err(_) => Err(RenderError::Engine(
                "Svgbob panicked while parsing input".to_string(),
            )),
        }
    }
}

impl RenderingEngine for NativeEngine {
    fn name(&self) -> &'static str {
        "native"
    }

    fn initialize(&self, theme: &ThemeVariables) {
        if let Ok(mut current) = self.theme.lock() {
            *current = Some(theme.clone());
        }
    }

    async fn check_valid(&self, source: &str) -> bool {
        !source.trim().is_empty()
    }

    async fn render(&self, _id: &str, source: &str) -> RenderResult<RenderedMarkup> {
        let source = source.trim_matches('\n');
        if source.trim().is_empty() {
            return Err(RenderError::Validation("Empty diagram source".to_string()));
        }
        Self::draw(source).map(RenderedMarkup::new)
    }
}
