//! Error types for the siteworks library.
//!
//! Each pipeline gets its own error enum because each has its own failure
//! vocabulary:
//!
//! * [`AttributionError`]: a single input file (or a single backend step on
//!   it) could not be processed. In directory mode the orchestrator logs it
//!   and moves on to the next file; for a single file it is fatal.
//!
//! * [`LinkCheckError`]: the link-check run itself cannot proceed (site root
//!   missing, report not writable). Per-URL network failures are *not*
//!   errors: they are downgraded to an `Unknown` check result.
//!
//! * [`ScrapeError`]: a scraped page could not be fetched or the data files
//!   could not be written. Heuristic misses are `None` fields, never errors.

use std::path::PathBuf;
use thiserror::Error;

/// Failures of the attribution pipeline.
#[derive(Debug, Error)]
pub enum AttributionError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Input not found: '{path}'")]
    InputNotFound { path: PathBuf },

    /// A directory was expected.
    #[error("Not a directory: '{path}'")]
    NotADirectory { path: PathBuf },

    /// The file extension is not one of jpg/jpeg/png/pdf.
    #[error("Unsupported file format: '{path}' (expected .jpg, .jpeg, .png or .pdf)")]
    UnsupportedFormat { path: PathBuf },

    // ── Raster errors ─────────────────────────────────────────────────────
    /// The image could not be decoded.
    #[error("Failed to decode image '{path}': {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// The image could not be encoded to its output format.
    #[error("Failed to encode image '{path}': {detail}")]
    Encode { path: PathBuf, detail: String },

    /// No usable font face could be loaded.
    #[error("Font error: {0}")]
    Font(String),

    // ── PDF errors ────────────────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium or install pdfium system-wide."
    )]
    PdfiumBindingFailed(String),

    /// pdfium could not open or render the document.
    #[error("Failed to rasterise '{path}' page {page}: {detail}")]
    PdfRender {
        path: PathBuf,
        page: usize,
        detail: String,
    },

    /// The PDF contains no pages to process.
    #[error("PDF '{path}' has no pages")]
    EmptyDocument { path: PathBuf },

    /// The assembled PDF could not be written.
    #[error("Failed to write PDF '{path}': {detail}")]
    PdfWrite { path: PathBuf, detail: String },

    // ── External tool errors ──────────────────────────────────────────────
    /// The external image tool is not installed or not on PATH.
    #[error(
        "'{program}' is not available.\n\
Install ImageMagick: brew install imagemagick (macOS) or apt-get install imagemagick (Linux)"
    )]
    ToolUnavailable { program: String },

    /// The external tool exited with a nonzero status.
    #[error("{program} failed ({status}): {stderr}")]
    SubprocessFailed {
        program: String,
        status: String,
        stderr: String,
    },

    /// The external tool did not finish within its time limit.
    #[error("{program} timed out after {secs}s")]
    SubprocessTimeout { program: String, secs: u64 },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Generic file-system failure with the path it happened on.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error (e.g. a blocking task panicked).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AttributionError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        AttributionError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Fatal failures of a link-check run.
#[derive(Debug, Error)]
pub enum LinkCheckError {
    /// The HTTP client could not be constructed.
    #[error("Failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    /// File-system failure while scanning or writing the report.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The report could not be serialised.
    #[error("Failed to serialise report: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Invalid site URL or checker settings.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Failures of the judge, officials and notary scrapers.
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// The HTTP client could not be built.
    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    /// A page could not be fetched or answered with an error status.
    #[error("Failed to fetch '{url}': {detail}")]
    Fetch { url: String, detail: String },

    /// The base URL and page path do not form a valid URL.
    #[error("Invalid URL '{0}'")]
    InvalidUrl(String),

    /// A listing page loaded but linked nothing to scrape.
    #[error("No results found on '{url}'")]
    NoResults { url: String },

    /// File-system failure while writing data files.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialisation failed.
    #[error("Failed to serialise JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML serialisation failed.
    #[error("Failed to serialise YAML: {0}")]
    Yaml(#[from] serde_yml::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subprocess_failed_display() {
        let e = AttributionError::SubprocessFailed {
            program: "convert".into(),
            status: "exit status: 1".into(),
            stderr: "no decode delegate".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("convert"), "got: {msg}");
        assert!(msg.contains("no decode delegate"), "got: {msg}");
    }

    #[test]
    fn subprocess_timeout_display() {
        let e = AttributionError::SubprocessTimeout {
            program: "convert".into(),
            secs: 60,
        };
        assert!(e.to_string().contains("60s"));
    }

    #[test]
    fn unsupported_format_names_path() {
        let e = AttributionError::UnsupportedFormat {
            path: PathBuf::from("notes.txt"),
        };
        assert!(e.to_string().contains("notes.txt"));
    }

    #[test]
    fn tool_unavailable_has_install_hint() {
        let e = AttributionError::ToolUnavailable {
            program: "convert".into(),
        };
        assert!(e.to_string().contains("imagemagick"));
    }
}
