//! Image Utilities: orientation detection, trim, resize/compress, and
//! aspect-ratio-based tiling applied to rasterized page images before OCR.

pub mod dpi;
pub mod orientation;
pub mod resize;
pub mod tesseract_pool;

use image::ImageFormat;
use std::io::Cursor;
use std::path::Path;

use crate::error::{DocMarkError, Result};
use tesseract_pool::TesseractPool;

/// Upper bound on a decoded page image's longer edge before tiling/encoding,
/// independent of the DPI the page was rendered at.
const MAX_DECODED_DIMENSION_PX: u32 = 6000;

/// Options controlling image cleanup before a page is sent to the vision
/// model.
#[derive(Debug, Clone)]
pub struct CleanupOptions {
    pub correct_orientation: bool,
    pub trim_edges: bool,
    pub max_image_size_bytes: u64,
}

/// Reads, orients, trims, and size-bounds an image on disk, returning one or
/// more PNG buffers (more than one only when the image is split on aspect
/// ratio).
pub fn cleanup_image(path: &Path, options: &CleanupOptions, pool: Option<&TesseractPool>) -> Result<Vec<Vec<u8>>> {
    let mut image = image::open(path).map_err(|e| DocMarkError::rasterization(format!("failed to decode {}: {e}", path.display())))?;

    if options.correct_orientation {
        if let Some(pool) = pool {
            image = orientation::correct_orientation(&image, pool)?;
        }
    }
    if options.trim_edges {
        image = resize::trim_uniform_border(&image, 8);
    }
    image = resize::resize_to_max_dimension(&image, MAX_DECODED_DIMENSION_PX);

    let tiles = resize::split_on_aspect_ratio(&image);

    tiles.iter().map(|tile| encode_within_budget(tile, options.max_image_size_bytes)).collect()
}

/// Encodes `image` as PNG, downscaling repeatedly until it fits within
/// `max_bytes` (or 0, meaning unbounded).
fn encode_within_budget(image: &image::DynamicImage, max_bytes: u64) -> Result<Vec<u8>> {
    let mut current = image.clone();
    loop {
        let mut buffer = Cursor::new(Vec::new());
        current
            .write_to(&mut buffer, ImageFormat::Png)
            .map_err(|e| DocMarkError::rasterization(format!("failed to encode image: {e}")))?;
        let bytes = buffer.into_inner();
        if max_bytes == 0 || (bytes.len() as u64) <= max_bytes {
            return Ok(bytes);
        }
        let (width, height) = image::GenericImageView::dimensions(&current);
        if width <= 256 || height <= 256 {
            return Ok(bytes);
        }
        current = current.resize(width * 9 / 10, height * 9 / 10, image::imageops::FilterType::Lanczos3);
    }
}
