//! Render state of a single diagram instance

/// Where a diagram currently stands
///
/// `Failed` holds the escaped source that is shown in place of the
/// diagram. It only changes when a new source arrives.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RenderState {
    /// A render is in flight
    #[default]
    Loading,
    /// The engine produced this markup
    Rendered(String),
    /// Rendering failed; the escaped source is displayed instead
    Failed(String),
}

impl RenderState {
    /// True once the state is `Rendered` or `Failed`
    pub fn is_settled(&self) -> bool {
        !matches!(self, Self::Loading)
    }

    /// Markup for a rendered diagram
    pub fn markup(&self) -> Option<&str> {
        match self {
            Self::Rendered(markup) => Some(markup),
            _ => None,
        }
    }

    /// Escaped fallback text for a failed diagram
    pub fn fallback(&self) -> Option<&str> {
        match self {
            Self::Failed(text) => Some(text),
            _ => None,
        }
    }

    /// Short name for logs
    pub fn label(&self) -> &'static str {
        match self {
            Self::Loading => "loading",
            Self::Rendered(_) => "rendered",
            Self::Failed(_) => "failed",
        }
    }
}

/// Escape angle brackets so source text cannot be read as markup
pub fn escape_source(source: &str) -> String {
    source.replace('<', "&lt;").replace('>', "&gt;")
}
