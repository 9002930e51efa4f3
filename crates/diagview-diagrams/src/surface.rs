//! Display surface the renderer writes into
//!
//! The renderer owns the surface content outright. It only ever clears it
//! or overwrites it, and never reads the previous content back.

use std::time::Duration;

use crate::raster::{declared_size, Size};

/// Opacity while a render is in flight
pub const LOADING_OPACITY: f32 = 0.3;

/// Opacity once the render has settled
pub const SETTLED_OPACITY: f32 = 1.0;

/// Opacity fade duration
pub const OPACITY_TRANSITION: Duration = Duration::from_millis(200);

/// Minimum height of the container in pixels
pub const MIN_HEIGHT_PX: u32 = 20;

/// Cosmetic style of the surface container
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceStyle {
    /// Container opacity, 0.0 to 1.0
    pub opacity: f32,
    /// Fade duration between opacities
    pub transition: Duration,
}

impl SurfaceStyle {
    /// Dimmed placeholder style
    pub fn loading() -> Self {
        Self {
            opacity: LOADING_OPACITY,
            transition: OPACITY_TRANSITION,
        }
    }

    /// Full-opacity style
    pub fn settled() -> Self {
        Self {
            opacity: SETTLED_OPACITY,
            transition: OPACITY_TRANSITION,
        }
    }

    /// Render as an inline CSS declaration list
    pub fn to_css(&self) -> String {
        format!(
            "opacity: {}; transition: opacity {}s ease; cursor: pointer; \
             display: flex; justify-content: center; min-height: {}px",
            self.opacity,
            self.transition.as_secs_f32(),
            MIN_HEIGHT_PX
        )
    }
}

impl Default for SurfaceStyle {
    fn default() -> Self {
        Self::loading()
    }
}

/// Addressable container whose inner content the renderer owns
pub trait DisplaySurface {
    /// Remove all content
    fn clear(&mut self);

    /// Replace the content with the given markup or text
    fn set_content(&mut self, content: &str);

    /// Apply a container style
    fn set_style(&mut self, style: SurfaceStyle);

    /// On-screen size of the displayed graphic, if laid out
    fn client_size(&self) -> Option<Size>;
}

/// In-memory surface for headless hosts and tests
#[derive(Debug, Clone, Default)]
pub struct MemorySurface {
    content: String,
    style: SurfaceStyle,
    writes: usize,
    layout_size: Option<Size>,
}

impl MemorySurface {
    /// Create an empty surface
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a surface with existing content
    pub fn with_content(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }

    /// Pin the reported on-screen size
    pub fn with_layout_size(mut self, size: Size) -> Self {
        self.layout_size = Some(size);
        self
    }

    /// Current content
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Current style
    pub fn style(&self) -> SurfaceStyle {
        self.style
    }

    /// Number of content writes, clears included
    pub fn writes(&self) -> usize {
        self.writes
    }
}

impl DisplaySurface for MemorySurface {
    fn clear(&mut self) {
        self.content.clear();
        self.writes += 1;
    }

    fn set_content(&mut self, content: &str) {
        self.content = content.to_string();
        self.writes += 1;
    }

    fn set_style(&mut self, style: SurfaceStyle) {
        self.style = style;
    }

    fn client_size(&self) -> Option<Size> {
        // Without a layout engine the declared size stands in for the
        // laid-out one.
        self.layout_size.or_else(|| declared_size(&self.content))
    }
}
