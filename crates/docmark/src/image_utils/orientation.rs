//! Orientation correction: detect via Tesseract OSD, rotate the decoded
//! image counter to the reported rotation.

use image::DynamicImage;

use super::tesseract_pool::TesseractPool;
use crate::error::Result;

/// Detects and corrects a page's orientation. Returns the image unrotated if
/// Tesseract reports 0 degrees or detection is inconclusive.
pub fn correct_orientation(image: &DynamicImage, pool: &TesseractPool) -> Result<DynamicImage> {
    let rgb = image.to_rgb8();
    let (width, height) = (rgb.width() as i32, rgb.height() as i32);
    let rotation = pool.detect_orientation(rgb.as_raw(), width, height)?;

    let rotated = match rotation {
        90 => image.rotate270(),
        180 => image.rotate180(),
        270 => image.rotate90(),
        _ => image.clone(),
    };
    Ok(rotated)
}
