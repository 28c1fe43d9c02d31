//! # siteworks
//!
//! Maintenance utilities for a static (Jekyll) website: stamp an attribution
//! onto images and PDFs, check the site's external links, and scrape the
//! county and directory pages the site summarises (judges, elected
//! officials, notaries).
//!
//! ## Attribution pipeline
//!
//! ```text
//! input (JPEG / PNG / PDF, or a directory of them)
//!  │
//!  ├─ load      decode, flatten alpha onto white   (PDF: explode pages at 300 DPI)
//!  ├─ pass 1    rotate 90° CCW, stamp, persist     → <base>_pass1.<ext>
//!  └─ pass 2    rotate pass-1 raster 250° more,    → <base>_pass2.<ext>
//!               stamp, persist                       (PDF: re-assemble pages)
//! ```
//!
//! Two interchangeable backends implement the raster steps:
//! [`NativeBackend`](attribution::NativeBackend) (in-process, `image` +
//! `pdfium-render` + `lopdf`) and
//! [`MagickBackend`](attribution::MagickBackend) (ImageMagick subprocesses
//! over a private scratch directory).
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use siteworks::attribution::{Attributor, NativeBackend};
//! use siteworks::AttributionSpec;
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let attributor = Attributor::new(NativeBackend::new(), AttributionSpec::default());
//!     let outcome = attributor.process_path(Path::new("photo.jpg"), None).await?;
//!     for path in outcome.outputs {
//!         println!("{}", path.display());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Link pipeline
//!
//! See [`links`]: scan → extract → filter → dedup → check → report.
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the binaries (clap + anyhow + tracing-subscriber + indicatif) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod attribution;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod error;
pub mod http;
pub mod judges;
pub mod links;
pub mod notaries;
pub mod officials;
pub mod persist;
pub mod progress;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{AttributionSpec, AttributionSpecBuilder, CheckerConfig, MagickConfig, ScraperConfig, SiteConfig};
pub use error::{AttributionError, LinkCheckError, ScrapeError};
pub use progress::{BatchProgressCallback, ProgressCallback};
