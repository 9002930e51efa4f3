//! Lazy activation gate
//!
//! Shows a placeholder until the user activates the diagram, then builds
//! exactly one renderer for the source. Used by hosts that do not want to
//! load a rendering engine for diagrams nobody looks at.

use crate::types::DiagramSource;

/// Placeholder shown before activation
pub const PLACEHOLDER_LABEL: &str = "Click to generate diagram";

/// Label shown while the first render is in flight
pub const LOADING_LABEL: &str = "Generating diagram...";

/// What the gate currently displays
#[derive(Debug, PartialEq, Eq)]
pub enum GateView<'a, R> {
    /// Not yet activated; show the placeholder label
    Placeholder(&'static str),
    /// Activated; the renderer owns the display
    Active(&'a R),
}

/// Defers renderer construction until activation
pub struct LazyRenderGate<R, F> {
    source: DiagramSource,
    factory: Option<F>,
    renderer: Option<R>,
}

impl<R, F> LazyRenderGate<R, F>
where
    F: FnOnce(&DiagramSource) -> R,
{
    /// Create an inactive gate
    pub fn new(source: impl Into<DiagramSource>, factory: F) -> Self {
        Self {
            source: source.into(),
            factory: Some(factory),
            renderer: None,
        }
    }

    /// Create a gate that activates right away
    pub fn immediate(source: impl Into<DiagramSource>, factory: F) -> Self {
        let mut gate = Self::new(source, factory);
        gate.activate();
        gate
    }

    /// Activate the gate
    ///
    /// Returns true only for the call that built the renderer; later calls
    /// are no-ops.
    pub fn activate(&mut self) -> bool {
        let Some(factory) = self.factory.take() else {
            return false;
        };
        log::debug!("Activating diagram {}", self.source.content_hash());
        self.renderer = Some(factory(&self.source));
        true
    }

    /// True once activated
    pub fn is_active(&self) -> bool {
        self.renderer.is_some()
    }

    /// The renderer, once activated
    pub fn renderer(&self) -> Option<&R> {
        self.renderer.as_ref()
    }

    /// Take the renderer out of the gate, once activated
    pub fn into_renderer(self) -> Option<R> {
        self.renderer
    }

    /// Current source
    pub fn source(&self) -> &DiagramSource {
        &self.source
    }

    /// Replace the source
    ///
    /// Returns the active renderer, if any, so the caller can forward the
    /// new source to it.
    pub fn set_source(&mut self, source: impl Into<DiagramSource>) -> Option<&R> {
        self.source = source.into();
        self.renderer.as_ref()
    }

    /// What to display
    pub fn view(&self) -> GateView<'_, R> {
        match &self.renderer {
            Some(renderer) => GateView::Active(renderer),
            None => GateView::Placeholder(PLACEHOLDER_LABEL),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_placeholder_until_activated() {
        let gate = LazyRenderGate::new("graph TD", |s: &DiagramSource| s.as_str().len());
        assert!(!gate.is_active());
        assert_eq!(gate.view(), GateView::Placeholder(PLACEHOLDER_LABEL));
        assert!(gate.renderer().is_none());
    }

    #[test]
    fn test_activation_builds_one_renderer() {
        let built = Cell::new(0);
        let mut gate = LazyRenderGate::new("graph TD", |s: &DiagramSource| {
            built.set(built.get() + 1);
            s.as_str().to_string()
        });

        assert!(gate.activate());
        assert!(!gate.activate());
        assert!(!gate.activate());

        assert_eq!(built.get(), 1);
        assert_eq!(gate.renderer().map(String::as_str), Some("graph TD"));
        assert!(matches!(gate.view(), GateView::Active(_)));
    }

    #[test]
    fn test_immediate_gate() {
        let gate = LazyRenderGate::immediate("graph LR", |_: &DiagramSource| 7);
        assert!(gate.is_active());
        assert_eq!(gate.into_renderer(), Some(7));
    }

    #[test]
    fn test_set_source_before_activation() {
        let mut gate = LazyRenderGate::new("a", |s: &DiagramSource| s.clone());
        assert!(gate.set_source("b").is_none());
        gate.activate();
        assert_eq!(gate.renderer(), Some(&DiagramSource::from("b")));

        assert!(gate.set_source("c").is_some());
        assert_eq!(gate.source().as_str(), "c");
    }
}
