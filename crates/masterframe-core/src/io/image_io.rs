use std::path::Path;

use image::{DynamicImage, GrayImage, ImageFormat, Luma};
use ndarray::Array2;
use tracing::debug;

use crate::consts::{PREVIEW_HIGH_PERCENTILE, PREVIEW_LOW_PERCENTILE};
use crate::error::{MasterFrameError, Result};
use crate::stats::percentile_sorted;

/// Decode a raster image (TIFF, PNG, JPEG, ...) into a single plane.
///
/// 8-bit and 16-bit grayscale keep their stored integer counts; every other
/// layout is reduced to floating-point luminance.
pub fn load_raster(path: &Path) -> Result<Array2<f32>> {
    let img = image::open(path).map_err(|e| MasterFrameError::invalid_frame(path, e.to_string()))?;
    let (w, h) = (img.width() as usize, img.height() as usize);

    let samples: Vec<f32> = match img {
        DynamicImage::ImageLuma8(buf) => buf.into_raw().into_iter().map(f32::from).collect(),
        DynamicImage::ImageLuma16(buf) => buf.into_raw().into_iter().map(f32::from).collect(),
        other => {
            debug!(path = %path.display(), "Converting color raster to luminance");
            other.to_luma32f().into_raw()
        }
    };

    Array2::from_shape_vec((h, w), samples)
        .map_err(|e| MasterFrameError::invalid_frame(path, e.to_string()))
}

/// Stretch a frame to 8 bits between its 1st and 99th percentile.
///
/// A frame with no spread renders as mid-grey.
pub fn stretch_for_display(data: &Array2<f32>) -> GrayImage {
    let (h, w) = data.dim();
    let mut sorted: Vec<f32> = data.iter().copied().filter(|v| v.is_finite()).collect();
    sorted.sort_unstable_by(|a, b| a.total_cmp(b));
    let lo = percentile_sorted(&sorted, PREVIEW_LOW_PERCENTILE);
    let hi = percentile_sorted(&sorted, PREVIEW_HIGH_PERCENTILE);
    let span = hi - lo;

    let mut img = GrayImage::new(w as u32, h as u32);
    for ((row, col), &v) in data.indexed_iter() {
        let level = if span > 0.0 && v.is_finite() {
            ((v.clamp(lo, hi) - lo) / span * 255.0).round() as u8
        } else {
            128
        };
        img.put_pixel(col as u32, row as u32, Luma([level]));
    }
    img
}

/// Render a frame for a display surface as an 8-bit PNG.
///
/// `display_name` is only used for logging; the caller decides where it shows.
pub fn render_preview(data: &Array2<f32>, display_name: &str, path: &Path) -> Result<()> {
    let img = stretch_for_display(data);
    img.save_with_format(path, ImageFormat::Png)
        .map_err(|e| std::io::Error::other(e.to_string()))?;
    debug!(name = display_name, path = %path.display(), "Preview rendered");
    Ok(())
}
