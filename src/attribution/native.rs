//! In-process backend: `image` for rasters, pdfium + lopdf for PDFs.
//!
//! All pixel work is CPU-bound and runs on the blocking pool so the Tokio
//! workers stay free. Each step clones what it needs into the blocking task
//! and returns a new raster.

use super::text::{self, TextRenderer};
use super::{pdf, raster, AttributionBackend, BackendSession};
use crate::config::AttributionSpec;
use crate::error::AttributionError;
use async_trait::async_trait;
use image::RgbImage;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Backend that processes everything in this process.
#[derive(Debug, Clone)]
pub struct NativeBackend {
    renderer: Arc<TextRenderer>,
}

impl NativeBackend {
    /// Resolve the stamping font from the system font database.
    pub fn new() -> Self {
        Self::with_renderer(TextRenderer::from_system_fonts())
    }

    pub fn with_renderer(renderer: TextRenderer) -> Self {
        debug!("Native backend font: {}", renderer.family());
        Self {
            renderer: Arc::new(renderer),
        }
    }
}

impl Default for NativeBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AttributionBackend for NativeBackend {
    type Session = NativeSession;

    fn name(&self) -> &'static str {
        "native"
    }

    fn open_session(&self) -> Result<NativeSession, AttributionError> {
        Ok(NativeSession {
            renderer: Arc::clone(&self.renderer),
        })
    }
}

/// Per-file context of the in-process backend. Holds no resources.
#[derive(Debug)]
pub struct NativeSession {
    renderer: Arc<TextRenderer>,
}

async fn blocking<T, F>(what: &str, f: F) -> Result<T, AttributionError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, AttributionError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AttributionError::Internal(format!("{what} task panicked: {e}")))?
}

#[async_trait]
impl BackendSession for NativeSession {
    type Raster = RgbImage;

    async fn load(&mut self, path: &Path) -> Result<RgbImage, AttributionError> {
        let path = path.to_path_buf();
        blocking("load", move || raster::load_image(&path)).await
    }

    async fn rotate(&mut self, img: &RgbImage, angle: f64) -> Result<RgbImage, AttributionError> {
        let img = img.clone();
        let out = blocking("rotate", move || Ok(raster::rotate(&img, angle))).await?;
        debug!("Rotated {}° → {}x{} px", angle, out.width(), out.height());
        Ok(out)
    }

    async fn stamp(
        &mut self,
        img: &RgbImage,
        spec: &AttributionSpec,
    ) -> Result<RgbImage, AttributionError> {
        let img = img.clone();
        let spec = spec.clone();
        let renderer = Arc::clone(&self.renderer);
        blocking("stamp", move || Ok(text::stamp(&img, &spec, &renderer))).await
    }

    async fn save(&mut self, img: &RgbImage, path: &Path) -> Result<(), AttributionError> {
        let img = img.clone();
        let path = path.to_path_buf();
        blocking("save", move || raster::save_image(&img, &path)).await
    }

    async fn explode(&mut self, pdf_path: &Path, dpi: u32) -> Result<Vec<RgbImage>, AttributionError> {
        let path = pdf_path.to_path_buf();
        blocking("render", move || pdf::explode_blocking(&path, dpi)).await
    }

    async fn assemble(
        &mut self,
        pages: &[RgbImage],
        out: &Path,
        dpi: u32,
    ) -> Result<(), AttributionError> {
        let pages = pages.to_vec();
        let out = out.to_path_buf();
        blocking("assemble", move || pdf::assemble_blocking(&pages, &out, dpi)).await
    }

    fn close(self) -> Result<(), AttributionError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[tokio::test]
    async fn session_steps_return_fresh_rasters() {
        let backend = NativeBackend::with_renderer(TextRenderer::Bitmap);
        let mut session = backend.open_session().unwrap();

        let img = RgbImage::from_pixel(120, 80, Rgb([90, 90, 90]));
        let rotated = session.rotate(&img, 90.0).await.unwrap();
        assert_eq!(rotated.dimensions(), (80, 120));

        let stamped = session
            .stamp(&rotated, &AttributionSpec::default())
            .await
            .unwrap();
        assert_ne!(stamped, rotated);
        assert!(img.pixels().all(|p| *p == Rgb([90, 90, 90])));
        session.close().unwrap();
    }
}
