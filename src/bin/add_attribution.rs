//! CLI binary `add-attribution`.
//!
//! Maps flags onto an [`AttributionSpec`] and a backend, then runs both
//! attribution passes over a file or every supported file in a directory.

use anyhow::{Context, Result};
use clap::Parser;
use siteworks::attribution::{AttributionBackend, Attributor, MagickBackend, NativeBackend};
use siteworks::cli::{bold, cyan, green, init_logging, red, CliProgress};
use siteworks::config::{MagickConfig, DEFAULT_ATTRIBUTION_TEXT, DEFAULT_PDF_DPI};
use siteworks::{AttributionSpec, ProgressCallback};
use std::path::{Path, PathBuf};
use std::sync::Arc;

const AFTER_HELP: &str = r#"EXAMPLES:
  # One image → photo_pass1.jpg, photo_pass2.jpg next to it
  add-attribution photo.jpg

  # A PDF, custom text and output base
  add-attribution -t "Jane Doe" scan.pdf -o stamped/scan

  # Every JPEG/PNG/PDF in a folder → folder/attributed/
  add-attribution assets/img/

  # Use ImageMagick instead of the built-in renderer
  add-attribution --backend magick photo.png

PASSES:
  pass 1  rotate 90° counter-clockwise, stamp
  pass 2  rotate the pass-1 image a further 250° (340° total), stamp

ENVIRONMENT VARIABLES:
  PDFIUM_LIB_PATH   libpdfium file or directory (native backend, PDFs)
  RUST_LOG          Overrides the log filter
"#;

/// Stamp an attribution onto images and PDFs in two rotated passes.
#[derive(Parser, Debug)]
#[command(
    name = "add-attribution",
    version,
    about = "Stamp an attribution onto images and PDFs in two rotated passes",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Image, PDF or directory to process.
    input: PathBuf,

    /// Output base path (file input) or output directory (directory input).
    #[arg(short, long, env = "SITEWORKS_OUTPUT")]
    output: Option<PathBuf>,

    /// Attribution text.
    #[arg(short, long, env = "SITEWORKS_TEXT", default_value = DEFAULT_ATTRIBUTION_TEXT)]
    text: String,

    /// Font size in pixels.
    #[arg(short, long, env = "SITEWORKS_FONT_SIZE", default_value_t = 20,
          value_parser = clap::value_parser!(u32).range(1..=1000))]
    size: u32,

    /// Rendering backend.
    #[arg(long, env = "SITEWORKS_BACKEND", value_enum, default_value = "native")]
    backend: BackendArg,

    /// PDF rasterisation DPI.
    #[arg(long, env = "SITEWORKS_DPI", default_value_t = DEFAULT_PDF_DPI,
          value_parser = clap::value_parser!(u32).range(36..=1200))]
    dpi: u32,

    /// ImageMagick converter executable (magick backend).
    #[arg(long, env = "SITEWORKS_MAGICK_BIN", default_value = "convert")]
    magick_bin: String,

    /// ImageMagick inspector executable (magick backend).
    #[arg(long, env = "SITEWORKS_IDENTIFY_BIN", default_value = "identify")]
    identify_bin: String,

    /// Disable the progress bar for directory runs.
    #[arg(long, env = "SITEWORKS_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "SITEWORKS_VERBOSE")]
    verbose: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum BackendArg {
    Native,
    Magick,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let show_progress = cli.input.is_dir() && !cli.no_progress && !cli.verbose;
    init_logging(cli.verbose, show_progress);

    let spec = AttributionSpec::builder()
        .text(cli.text.clone())
        .font_size(cli.size)
        .build()
        .context("Invalid attribution settings")?;

    let progress: Option<Arc<CliProgress>> = show_progress.then(|| CliProgress::new("files"));

    match cli.backend {
        BackendArg::Native => run(NativeBackend::new(), spec, &cli, progress).await,
        BackendArg::Magick => {
            let config = MagickConfig {
                convert_bin: cli.magick_bin.clone(),
                identify_bin: cli.identify_bin.clone(),
                ..MagickConfig::default()
            };
            run(MagickBackend::new(config), spec, &cli, progress).await
        }
    }
}

async fn run<B: AttributionBackend>(
    backend: B,
    spec: AttributionSpec,
    cli: &Cli,
    progress: Option<Arc<CliProgress>>,
) -> Result<()> {
    let mut attributor = Attributor::new(backend, spec).with_dpi(cli.dpi);
    if let Some(cb) = &progress {
        attributor = attributor.with_progress(cb.clone() as ProgressCallback);
    }

    let outcome = attributor
        .process_path(&cli.input, cli.output.as_deref())
        .await
        .with_context(|| format!("Failed to process {}", cli.input.display()))?;

    if progress.is_none() {
        for path in &outcome.outputs {
            eprintln!("{} {}", green("✓"), display(path));
        }
    }
    if !outcome.failures.is_empty() {
        eprintln!(
            "{} {} file(s) failed:",
            cyan("⚠"),
            bold(&outcome.failures.len().to_string())
        );
        for failure in &outcome.failures {
            eprintln!("  {} {}: {}", red("✗"), display(&failure.path), failure.error);
        }
    }
    Ok(())
}

fn display(path: &Path) -> String {
    path.display().to_string()
}
