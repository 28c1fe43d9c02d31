//! Attribution pipeline: rotate, stamp and persist two passes per input.
//!
//! ```text
//! input (jpg/png/pdf)
//!  │
//!  ├─ load / explode   decode the image, or render every PDF page
//!  ├─ pass 1           rotate 90°, stamp, persist <base>_pass1.<ext>
//!  ├─ pass 2           rotate the pass-1 raster a further 250°, stamp,
//!  │                   persist <base>_pass2.<ext>
//!  └─ assemble         (PDF only) pass pages → <base>_passN.pdf
//! ```
//!
//! The pixel work is delegated to an [`AttributionBackend`]: either the
//! in-process [`NativeBackend`] or the [`MagickBackend`], which drives the
//! ImageMagick CLI over scratch files. The [`Attributor`] is generic over the
//! backend and owns naming, routing and batch isolation.

pub mod bitmap_font;
pub mod magick;
pub mod native;
pub mod orchestrator;
pub mod pdf;
pub mod raster;
pub mod text;

pub use magick::{MagickBackend, MagickSession};
pub use native::{NativeBackend, NativeSession};
pub use orchestrator::{Attributor, BatchOutcome, FileFailure};

use crate::config::AttributionSpec;
use crate::error::AttributionError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Name of the directory created next to the inputs in directory mode.
pub const DEFAULT_OUTPUT_DIR: &str = "attributed";

/// One rotate + stamp + persist cycle. Exactly two per input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pass {
    First,
    Second,
}

impl Pass {
    pub const ALL: [Pass; 2] = [Pass::First, Pass::Second];

    pub fn ordinal(self) -> u8 {
        match self {
            Pass::First => 1,
            Pass::Second => 2,
        }
    }

    /// Rotation applied on top of the previous pass's rotated raster.
    pub fn rotation_delta(self) -> f64 {
        match self {
            Pass::First => 90.0,
            Pass::Second => 250.0,
        }
    }

    /// Total rotation relative to the input.
    pub fn cumulative_angle(self) -> f64 {
        match self {
            Pass::First => 90.0,
            Pass::Second => 340.0,
        }
    }

    pub fn suffix(self) -> &'static str {
        match self {
            Pass::First => "_pass1",
            Pass::Second => "_pass2",
        }
    }
}

/// How an input file is routed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Image,
    Pdf,
}

impl InputKind {
    /// Classify by extension (case-insensitive). `None` for anything else.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "jpg" | "jpeg" | "png" => Some(InputKind::Image),
            "pdf" => Some(InputKind::Pdf),
            _ => None,
        }
    }
}

/// Resolve the output base (path without extension) for one input.
///
/// Without an explicit output the base sits next to the input. A supplied
/// output has its extension stripped.
pub fn output_base(input: &Path, output: Option<&Path>) -> PathBuf {
    match output {
        Some(out) => out.with_extension(""),
        None => {
            let stem = input.file_stem().unwrap_or(input.as_os_str());
            input.with_file_name(stem)
        }
    }
}

/// Output path of one pass: `<base><suffix>.<ext>`.
///
/// Images keep the input's extension verbatim; PDFs always end in `.pdf`.
pub fn pass_output_path(base: &Path, pass: Pass, kind: InputKind, input: &Path) -> PathBuf {
    let ext = match kind {
        InputKind::Pdf => "pdf".to_string(),
        InputKind::Image => input
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_else(|| "png".to_string()),
    };
    let mut name = base
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(pass.suffix());
    name.push(".");
    name.push(ext);
    base.with_file_name(name)
}

/// Factory for per-file working contexts.
#[async_trait]
pub trait AttributionBackend: Send + Sync {
    type Session: BackendSession;

    /// Short name used in logs (`native`, `magick`).
    fn name(&self) -> &'static str;

    /// Verify external prerequisites before any file is touched.
    async fn preflight(&self) -> Result<(), AttributionError> {
        Ok(())
    }

    /// Open a working context for a single input file.
    fn open_session(&self) -> Result<Self::Session, AttributionError>;
}

/// Rotator, stamper and page converter bound to one input file.
///
/// Every operation returns a fresh raster; inputs are never mutated.
#[async_trait]
pub trait BackendSession: Send {
    type Raster: Send + Sync;

    /// Decode an image and flatten any alpha onto white.
    async fn load(&mut self, path: &Path) -> Result<Self::Raster, AttributionError>;

    /// Rotate counter-clockwise by `angle` degrees on an expanded white canvas.
    async fn rotate(
        &mut self,
        raster: &Self::Raster,
        angle: f64,
    ) -> Result<Self::Raster, AttributionError>;

    /// Draw the attribution text (black, then white at the shadow offset).
    async fn stamp(
        &mut self,
        raster: &Self::Raster,
        spec: &AttributionSpec,
    ) -> Result<Self::Raster, AttributionError>;

    /// Encode to `path`, format chosen by its extension.
    async fn save(&mut self, raster: &Self::Raster, path: &Path) -> Result<(), AttributionError>;

    /// Render every page of a PDF, in order.
    async fn explode(&mut self, pdf: &Path, dpi: u32) -> Result<Vec<Self::Raster>, AttributionError>;

    /// Write `pages` as a multi-page PDF at `out`.
    async fn assemble(
        &mut self,
        pages: &[Self::Raster],
        out: &Path,
        dpi: u32,
    ) -> Result<(), AttributionError>;

    /// Release session resources. Called after every file, success or not.
    fn close(self) -> Result<(), AttributionError>
    where
        Self: Sized;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pass_constants() {
        assert_eq!(Pass::First.cumulative_angle(), Pass::First.rotation_delta());
        assert_eq!(
            Pass::Second.cumulative_angle(),
            Pass::First.rotation_delta() + Pass::Second.rotation_delta()
        );
        assert_eq!(Pass::Second.ordinal(), 2);
    }

    #[test]
    fn input_kind_is_case_insensitive() {
        assert_eq!(InputKind::from_path(Path::new("a.JPG")), Some(InputKind::Image));
        assert_eq!(InputKind::from_path(Path::new("a.jpeg")), Some(InputKind::Image));
        assert_eq!(InputKind::from_path(Path::new("a.Pdf")), Some(InputKind::Pdf));
        assert_eq!(InputKind::from_path(Path::new("a.gif")), None);
        assert_eq!(InputKind::from_path(Path::new("README")), None);
    }

    #[test]
    fn default_base_sits_next_to_input() {
        let base = output_base(Path::new("/photos/cat.JPG"), None);
        assert_eq!(base, PathBuf::from("/photos/cat"));
        let p = pass_output_path(&base, Pass::First, InputKind::Image, Path::new("/photos/cat.JPG"));
        assert_eq!(p, PathBuf::from("/photos/cat_pass1.JPG"));
    }

    #[test]
    fn user_output_extension_is_stripped() {
        let input = Path::new("scan.pdf");
        let base = output_base(input, Some(Path::new("/out/result.png")));
        assert_eq!(base, PathBuf::from("/out/result"));
        let p = pass_output_path(&base, Pass::Second, InputKind::Pdf, input);
        assert_eq!(p, PathBuf::from("/out/result_pass2.pdf"));
    }

    #[test]
    fn image_keeps_input_extension_not_output_extension() {
        let input = Path::new("a.jpeg");
        let base = output_base(input, Some(Path::new("b.png")));
        let p = pass_output_path(&base, Pass::First, InputKind::Image, input);
        assert_eq!(p, PathBuf::from("b_pass1.jpeg"));
    }
}
