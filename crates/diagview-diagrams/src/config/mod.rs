//! Renderer settings
//!
//! Settings are loaded from `diagview.toml`:
//!
//! ```toml
//! [engine]
//! kind = "kroki"
//! kroki_url = "http://localhost:8000"
//! diagram_type = "mermaid"
//! timeout_secs = 10
//!
//! [theme]
//! font_family = "Inter, sans-serif"
//!
//! [theme.variables]
//! lineColor = "#ff9580"
//!
//! [export]
//! width = 1800
//! background = "#000000"
//! ```
//!
//! Every section and key is optional.

mod settings;


pub use settings::{EngineKind, EngineSettings, ExportSettings, Settings, CONFIG_FILE_NAME};
