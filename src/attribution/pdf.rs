//! PDF page conversion for the in-process backend.
//!
//! Exploding renders every page through pdfium at `points × dpi / 72`
//! pixels. Assembling writes one full-page JPEG image per page with lopdf,
//! sizing the MediaBox so that the raster maps back to its physical size at
//! the same DPI.
//!
//! Both directions are blocking and are expected to run inside
//! `spawn_blocking`.

use super::raster::{encode_jpeg, normalize, JPEG_QUALITY};
use crate::error::AttributionError;
use crate::persist::write_atomic;
use image::RgbImage;
use lopdf::{dictionary, Document, Object, Stream};
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Environment variable naming a pdfium library file or its directory.
pub const PDFIUM_LIB_ENV: &str = "PDFIUM_LIB_PATH";

/// Bind to pdfium: `PDFIUM_LIB_PATH` first, then the system library.
pub fn bind_pdfium() -> Result<Pdfium, AttributionError> {
    let bindings = match std::env::var(PDFIUM_LIB_ENV) {
        Ok(raw) if !raw.is_empty() => {
            let path = PathBuf::from(&raw);
            let lib = if path.is_dir() {
                Pdfium::pdfium_platform_library_name_at_path(raw.as_str())
            } else {
                path
            };
            debug!("Binding pdfium from {}", lib.display());
            Pdfium::bind_to_library(lib)
        }
        _ => Pdfium::bind_to_system_library(),
    }
    .map_err(|e| AttributionError::PdfiumBindingFailed(e.to_string()))?;

    Ok(Pdfium::new(bindings))
}

/// Render every page of `pdf_path` at `dpi`, in document order.
pub fn explode_blocking(pdf_path: &Path, dpi: u32) -> Result<Vec<RgbImage>, AttributionError> {
    let pdfium = bind_pdfium()?;
    let render_err = |page: usize, e: PdfiumError| AttributionError::PdfRender {
        path: pdf_path.to_path_buf(),
        page,
        detail: e.to_string(),
    };

    let document = pdfium
        .load_pdf_from_file(pdf_path, None)
        .map_err(|e| render_err(0, e))?;

    let pages = document.pages();
    let total = pages.len() as usize;
    if total == 0 {
        return Err(AttributionError::EmptyDocument {
            path: pdf_path.to_path_buf(),
        });
    }
    info!("PDF loaded: {} pages", total);

    let mut out = Vec::with_capacity(total);
    for (idx, page) in pages.iter().enumerate() {
        let width_px = (page.width().value * dpi as f32 / 72.0).round() as i32;
        let height_px = (page.height().value * dpi as f32 / 72.0).round() as i32;

        let config = PdfRenderConfig::new()
            .set_target_width(width_px.max(1))
            .set_target_height(height_px.max(1));

        let bitmap = page
            .render_with_config(&config)
            .map_err(|e| render_err(idx + 1, e))?;
        let image = normalize(bitmap.as_image());
        debug!(
            "Rendered page {} → {}x{} px",
            idx + 1,
            image.width(),
            image.height()
        );
        out.push(image);
    }

    Ok(out)
}

/// Build a PDF with one full-page JPEG per raster.
pub fn assemble_bytes(pages: &[RgbImage], dpi: u32) -> Result<Vec<u8>, String> {
    if pages.is_empty() {
        return Err("no pages to assemble".to_string());
    }
    let dpi = dpi.max(1) as f32;

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let mut kids: Vec<Object> = Vec::with_capacity(pages.len());

    for page in pages {
        let (w_px, h_px) = page.dimensions();
        let w_pt = w_px as f32 * 72.0 / dpi;
        let h_pt = h_px as f32 * 72.0 / dpi;

        let jpeg = encode_jpeg(page, JPEG_QUALITY).map_err(|e| e.to_string())?;
        let image_id = doc.add_object(Object::Stream(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => w_px as i64,
                "Height" => h_px as i64,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
                "Filter" => "DCTDecode",
            },
            jpeg,
        )));

        let content = format!("q {w_pt:.4} 0 0 {h_pt:.4} 0 0 cm /Im0 Do Q").into_bytes();
        let content_id = doc.add_object(Object::Stream(Stream::new(dictionary! {}, content)));

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Real(w_pt),
                Object::Real(h_pt),
            ],
            "Resources" => dictionary! {
                "XObject" => dictionary! { "Im0" => image_id },
            },
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf).map_err(|e| e.to_string())?;
    Ok(buf)
}

/// Assemble `pages` and write the PDF atomically to `out`.
pub fn assemble_blocking(pages: &[RgbImage], out: &Path, dpi: u32) -> Result<(), AttributionError> {
    let bytes = assemble_bytes(pages, dpi).map_err(|detail| AttributionError::PdfWrite {
        path: out.to_path_buf(),
        detail,
    })?;
    write_atomic(out, &bytes).map_err(|e| AttributionError::io(out, e))?;
    info!("Wrote {} pages → {}", pages.len(), out.display());
    Ok(())
}
