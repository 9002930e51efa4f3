//! CLI Application logic
//!
//! Contains the command-line interface implementation.

use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::{debug, info};

use diagview_diagrams::gate::LOADING_LABEL;
use diagview_diagrams::raster::decode_data_url;
use diagview_diagrams::{
    ClickOutcome, DiagramRenderer, DiagramSource, DiagramType, EngineKind, EngineLoader,
    HostMessage, LazyRenderGate, MemorySurface, RenderState, RenderingEngine, Settings,
};

use crate::engines::AnyEngine;

/// Engine selectable on the command line
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum EngineArg {
    /// Offline svgbob engine
    Native,
    /// Kroki HTTP service
    Kroki,
}

impl From<EngineArg> for EngineKind {
    fn from(arg: EngineArg) -> Self {
        match arg {
            EngineArg::Native => EngineKind::Native,
            EngineArg::Kroki => EngineKind::Kroki,
        }
    }
}

/// Options shared by every command
#[derive(Debug, Clone, Default, Args)]
pub struct RenderOptions {
    /// Rendering engine (overrides the config file)
    #[arg(short, long, value_enum)]
    pub engine: Option<EngineArg>,

    /// Diagram type sent to Kroki (default: from file extension)
    #[arg(short = 't', long = "type")]
    pub diagram_type: Option<DiagramType>,

    /// Settings file (default: diagview.toml next to the input)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

#[derive(Parser)]
#[command(name = "diagview")]
#[command(author, version, about = "Render diagrams to SVG and export them as PNG", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a diagram to SVG
    Render {
        /// Input diagram source file
        input: PathBuf,

        /// Output SVG file (default: input with .svg extension)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        options: RenderOptions,
    },
    /// Render a diagram and export it as PNG
    Export {
        /// Input diagram source file
        input: PathBuf,

        /// Output PNG file (default: input with .png extension)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output width in pixels
        #[arg(short, long)]
        width: Option<u32>,

        /// Background color (e.g. "#1e1e1e")
        #[arg(short, long)]
        background: Option<String>,

        /// Print the host message as JSON instead of writing the PNG
        #[arg(long)]
        emit_message: bool,

        #[command(flatten)]
        options: RenderOptions,
    },
    /// Check whether the engine accepts a diagram source
    Check {
        /// Input diagram source file
        input: PathBuf,

        #[command(flatten)]
        options: RenderOptions,
    },
}

/// Run the CLI application
pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // Render futures are not Send; everything runs on one thread
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    runtime.block_on(async {
        match cli.command {
            Commands::Render {
                input,
                output,
                options,
            } => render_command(&input, output.as_deref(), &options).await,
            Commands::Export {
                input,
                output,
                width,
                background,
                emit_message,
                options,
            } => {
                export_command(
                    &input,
                    output.as_deref(),
                    width,
                    background,
                    emit_message,
                    &options,
                )
                .await
            }
            Commands::Check { input, options } => check_command(&input, &options).await,
        }
    })
}

fn init_tracing(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Execute the render command
pub async fn render_command(
    input: &Path,
    output: Option<&Path>,
    options: &RenderOptions,
) -> Result<()> {
    let settings = load_settings(input, options)?;
    let renderer = render_file(input, &settings).await?;
    let state = renderer.state();
    if !state.is_settled() {
        anyhow::bail!("Render did not settle: {}", input.display());
    }

    // Rendered markup or escaped fallback, whichever the surface shows
    let output_path = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| input.with_extension("svg"));
    fs::write(&output_path, renderer.surface().content())
        .with_context(|| format!("Failed to write: {}", output_path.display()))?;

    if let RenderState::Failed(_) = state {
        anyhow::bail!(
            "Diagram could not be rendered, source written to {}",
            output_path.display()
        );
    }
    info!("Rendered: {}", output_path.display());
    Ok(())
}

/// Execute the export command
pub async fn export_command(
    input: &Path,
    output: Option<&Path>,
    width: Option<u32>,
    background: Option<String>,
    emit_message: bool,
    options: &RenderOptions,
) -> Result<()> {
    let mut settings = load_settings(input, options)?;
    if let Some(width) = width {
        settings.export.width = width;
    }
    if background.is_some() {
        settings.export.background = background;
    }

    let renderer = render_file(input, &settings).await?;
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

    match renderer.handle_click(&settings.exporter(), &tx).await {
        ClickOutcome::Exported { width, height } => {
            debug!("Exported {}x{} image", width, height);
        }
        ClickOutcome::Inert => {
            anyhow::bail!("Diagram could not be rendered: {}", input.display())
        }
        ClickOutcome::Failed => anyhow::bail!("PNG export failed: {}", input.display()),
        ClickOutcome::Discarded => anyhow::bail!("Export was discarded"),
    }
    drop(tx);

    let message = rx
        .recv()
        .await
        .context("Renderer posted no image message")?;

    if emit_message {
        println!("{}", message.to_json()?);
        return Ok(());
    }

    let HostMessage::OpenImage { payload } = message;
    let png = decode_data_url(&payload, "image/png").context("Invalid image payload")?;
    let output_path = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| input.with_extension("png"));
    fs::write(&output_path, png)
        .with_context(|| format!("Failed to write: {}", output_path.display()))?;
    info!("Exported: {}", output_path.display());

    Ok(())
}

/// Execute the check command
///
/// Asks the engine whether it accepts the source; nothing is rendered.
pub async fn check_command(input: &Path, options: &RenderOptions) -> Result<()> {
    let settings = load_settings(input, options)?;
    let source = read_source(input)?;

    let engine = AnyEngine::from_settings(&settings.engine)
        .with_context(|| format!("Failed to start {:?} engine", settings.engine.kind))?;
    engine.initialize(&settings.theme_variables());

    if engine.check_valid(&source).await {
        println!("OK: {}", input.display());
        Ok(())
    } else {
        anyhow::bail!("Invalid diagram source: {}", input.display())
    }
}

/// Resolve settings from the config file and command-line overrides
fn load_settings(input: &Path, options: &RenderOptions) -> Result<Settings> {
    let mut settings = match &options.config {
        Some(path) => Settings::load(path)
            .with_context(|| format!("Failed to load config: {}", path.display()))?,
        None => {
            let dir = input.parent().unwrap_or_else(|| Path::new("."));
            Settings::discover(dir).context("Failed to load diagview.toml")?
        }
    };

    if let Some(engine) = options.engine {
        settings.engine.kind = engine.into();
    }

    let from_extension = input
        .extension()
        .and_then(|ext| ext.to_str())
        .and_then(DiagramType::from_extension);
    if let Some(diagram_type) = options.diagram_type.or(from_extension) {
        settings.engine.diagram_type = diagram_type;
    }

    Ok(settings)
}

fn read_source(input: &Path) -> Result<String> {
    if !input.exists() {
        anyhow::bail!("Input file not found: {}", input.display());
    }
    fs::read_to_string(input).with_context(|| format!("Failed to read: {}", input.display()))
}

/// Read a source file and render it to completion
async fn render_file(
    input: &Path,
    settings: &Settings,
) -> Result<DiagramRenderer<AnyEngine, MemorySurface>> {
    let source = read_source(input)?;

    let engine_settings = settings.engine.clone();
    let loader = Rc::new(EngineLoader::new(move || {
        let engine = AnyEngine::from_settings(&engine_settings);
        async move { engine }
    }));

    // A command-line render is always visible, so the gate opens at once
    let gate = LazyRenderGate::immediate(source, move |_: &DiagramSource| {
        DiagramRenderer::new(loader, MemorySurface::new())
    });
    let source = gate.source().clone();
    let renderer = gate
        .into_renderer()
        .context("Render gate did not activate")?;

    info!(
        "{} ({} via {:?} engine)",
        LOADING_LABEL,
        input.display(),
        settings.engine.kind
    );
    renderer.render(source, settings.theme_variables()).await;

    Ok(renderer)
}
