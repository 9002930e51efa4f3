//! diagview CLI - Command-line interface library
//!
//! This library provides the CLI functionality for diagview:
//! - Render: diagram source to SVG, or escaped source on failure
//! - Export: render, then rasterize to a fixed-width PNG
//! - Check: report whether the engine accepts a source
//!
//! # Binary Usage
//!
//! ```bash
//! # Render an ASCII-art diagram offline
//! diagview render boxes.bob
//!
//! # Render Mermaid through Kroki and export a 3600px PNG
//! diagview export flow.mmd --engine kroki
//!
//! # Print the host message instead of writing the PNG
//! diagview export flow.mmd --engine kroki --emit-message
//! ```
//!
//! Settings are read from `diagview.toml` next to the input file, or from
//! `--config`.

pub mod app;
pub mod engines;

pub use app::{check_command, export_command, render_command, run_cli, EngineArg, RenderOptions};
pub use engines::AnyEngine;
