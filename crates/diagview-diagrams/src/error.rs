//! Error types for diagram operations

use thiserror::Error;

/// Errors raised while turning diagram source into vector markup
///
/// Every variant collapses into the `Failed` render state; none of them
/// reaches the host.
#[derive(Error, Debug)]
pub enum RenderError {
    /// The engine rejected the source before any render attempt
    #[error("Invalid diagram source: {0}")]
    Validation(String),

    /// The engine failed while generating markup
    #[error("Rendering failed: {0}")]
    Engine(String),

    /// The engine returned something that is not vector markup
    #[error("Malformed engine output: {0}")]
    Malformed(String),

    /// The engine could not be acquired
    #[error("Engine unavailable: {0}")]
    Unavailable(String),

    /// HTTP request error
    #[cfg(feature = "kroki")]
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type for render operations
pub type RenderResult<T> = std::result::Result<T, RenderError>;

/// Errors raised while exporting a rendered graphic to a raster image
#[derive(Error, Debug)]
pub enum ConversionError {
    /// Neither a view box nor a fallback size is available
    #[error("Vector graphic has no intrinsic dimensions")]
    MissingDimensions,

    /// The markup could not be read as XML
    #[error("Invalid vector markup: {0}")]
    InvalidMarkup(String),

    /// The duplicated graphic could not be written back out
    #[error("Failed to serialize vector graphic: {0}")]
    Serialize(String),

    /// The serialized graphic could not be decoded into an image
    #[error("Failed to decode vector graphic: {0}")]
    Decode(String),

    /// The raster surface could not be allocated
    #[error("Failed to allocate raster surface ({width}x{height})")]
    Surface { width: u32, height: u32 },

    /// PNG encoding failed
    #[error("PNG encoding failed: {0}")]
    Encode(String),

    /// The background conversion task did not complete
    #[error("Raster task aborted: {0}")]
    Aborted(String),
}

/// Result type for raster export
pub type ConversionResult<T> = std::result::Result<T, ConversionError>;

/// Errors raised while loading settings
#[derive(Error, Debug)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parse error
    #[error("Invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),
}
