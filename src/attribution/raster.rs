//! In-process raster primitives: decode, flatten, rotate, encode.
//!
//! ## Rotation
//!
//! An angle is split into whole quarter turns plus a residual in `[0°, 90°)`.
//! Quarter turns are exact pixel permutations (`imageops::rotate*`); the
//! residual is applied with nearest-neighbour inverse mapping onto a canvas
//! just large enough for the rotated source, exposed area white. Because the
//! quarter-turn part composes losslessly, rotating by 90° and then by 250°
//! yields the same pixels as rotating by 340° once.

use crate::error::AttributionError;
use crate::persist::write_atomic;
use image::codecs::jpeg::JpegEncoder;
use image::{imageops, DynamicImage, ImageFormat, Rgb, RgbImage};
use std::io::Cursor;
use std::path::Path;
use tracing::debug;

/// JPEG quality of every lossy output (images and PDF pages).
pub const JPEG_QUALITY: u8 = 95;

const WHITE: Rgb<u8> = Rgb([255, 255, 255]);

/// Decode an image file and flatten it onto white.
pub fn load_image(path: &Path) -> Result<RgbImage, AttributionError> {
    let reader = image::ImageReader::open(path)
        .map_err(|e| AttributionError::io(path, e))?
        .with_guessed_format()
        .map_err(|e| AttributionError::io(path, e))?;
    let img = reader.decode().map_err(|source| AttributionError::Decode {
        path: path.to_path_buf(),
        source,
    })?;
    debug!("Loaded {} → {}x{} px", path.display(), img.width(), img.height());
    Ok(normalize(img))
}

/// Convert any colour mode to 8-bit RGB, compositing alpha onto white.
pub fn normalize(img: DynamicImage) -> RgbImage {
    if !img.color().has_alpha() {
        return img.into_rgb8();
    }
    let rgba = img.into_rgba8();
    let mut out = RgbImage::new(rgba.width(), rgba.height());
    for (x, y, px) in rgba.enumerate_pixels() {
        let a = px[3] as u32;
        let blend = |c: u8| ((c as u32 * a + 255 * (255 - a) + 127) / 255) as u8;
        out.put_pixel(x, y, Rgb([blend(px[0]), blend(px[1]), blend(px[2])]));
    }
    out
}

/// Rotate counter-clockwise by `angle` degrees, expanding the canvas.
pub fn rotate(img: &RgbImage, angle: f64) -> RgbImage {
    let turns = (angle / 90.0).floor();
    let residual = angle - turns * 90.0;

    let quarter = match (turns as i64).rem_euclid(4) {
        0 => img.clone(),
        1 => imageops::rotate270(img),
        2 => imageops::rotate180(img),
        _ => imageops::rotate90(img),
    };

    if residual.abs() < 1e-9 {
        return quarter;
    }
    rotate_residual(&quarter, residual)
}

/// Nearest-neighbour rotation for `0 < angle < 90`.
fn rotate_residual(img: &RgbImage, angle: f64) -> RgbImage {
    let (w, h) = (img.width() as f64, img.height() as f64);
    let (sin, cos) = angle.to_radians().sin_cos();

    let out_w = (w * cos + h * sin - 1e-9).ceil().max(1.0) as u32;
    let out_h = (w * sin + h * cos - 1e-9).ceil().max(1.0) as u32;

    let (cx, cy) = (w / 2.0, h / 2.0);
    let (ocx, ocy) = (out_w as f64 / 2.0, out_h as f64 / 2.0);

    let mut out = RgbImage::from_pixel(out_w, out_h, WHITE);
    for oy in 0..out_h {
        let dy = oy as f64 + 0.5 - ocy;
        for ox in 0..out_w {
            let dx = ox as f64 + 0.5 - ocx;
            let sx = (cx + dx * cos - dy * sin).floor();
            let sy = (cy + dx * sin + dy * cos).floor();
            if sx >= 0.0 && sy >= 0.0 && sx < w && sy < h {
                out.put_pixel(ox, oy, *img.get_pixel(sx as u32, sy as u32));
            }
        }
    }
    out
}

/// Encode as JPEG at the given quality.
pub fn encode_jpeg(img: &RgbImage, quality: u8) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, quality).encode_image(img)?;
    Ok(buf)
}

/// Encode to the format implied by `path`'s extension and write it atomically.
pub fn save_image(img: &RgbImage, path: &Path) -> Result<(), AttributionError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    let encode_err = |e: image::ImageError| AttributionError::Encode {
        path: path.to_path_buf(),
        detail: e.to_string(),
    };

    let bytes = match ext.as_str() {
        "jpg" | "jpeg" => encode_jpeg(img, JPEG_QUALITY).map_err(encode_err)?,
        "png" => {
            let mut buf = Vec::new();
            img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
                .map_err(encode_err)?;
            buf
        }
        _ => {
            return Err(AttributionError::UnsupportedFormat {
                path: path.to_path_buf(),
            })
        }
    };

    write_atomic(path, &bytes).map_err(|e| AttributionError::io(path, e))?;
    debug!(
        "Saved {}x{} px → {} ({} bytes)",
        img.width(),
        img.height(),
        path.display(),
        bytes.len()
    );
    Ok(())
}
