//! Image resize, trim, and aspect-ratio-based splitting.

use image::{DynamicImage, GenericImageView};

/// Guideline aspect-ratio threshold beyond which a page is split into
/// multiple tiles before being handed to the vision model. Implementation
/// defined (Open Question): treated as a tuning constant, not a contract.
pub const ASPECT_SPLIT_RATIO: f64 = 5.0;

/// Resizes `image` so its longer edge is at most `max_dimension` pixels,
/// preserving aspect ratio. Returns the original image unchanged if it
/// already fits.
pub fn resize_to_max_dimension(image: &DynamicImage, max_dimension: u32) -> DynamicImage {
    let (width, height) = image.dimensions();
    if width <= max_dimension && height <= max_dimension {
        return image.clone();
    }
    image.resize(max_dimension, max_dimension, image::imageops::FilterType::Lanczos3)
}

/// Splits `image` into horizontal tiles when its aspect ratio exceeds
/// [`ASPECT_SPLIT_RATIO`]. Otherwise returns a single-element vector holding
/// the original image, cloned.
pub fn split_on_aspect_ratio(image: &DynamicImage) -> Vec<DynamicImage> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return vec![image.clone()];
    }

    let ratio = width.max(height) as f64 / width.min(height) as f64;
    if ratio <= ASPECT_SPLIT_RATIO {
        return vec![image.clone()];
    }

    let is_landscape = width > height;
    let tile_count = ratio.ceil() as u32;
    let mut tiles = Vec::with_capacity(tile_count as usize);

    if is_landscape {
        let tile_width = width.div_ceil(tile_count);
        for i in 0..tile_count {
            let x = i * tile_width;
            let w = tile_width.min(width - x);
            if w == 0 {
                continue;
            }
            tiles.push(image.crop_imm(x, 0, w, height));
        }
    } else {
        let tile_height = height.div_ceil(tile_count);
        for i in 0..tile_count {
            let y = i * tile_height;
            let h = tile_height.min(height - y);
            if h == 0 {
                continue;
            }
            tiles.push(image.crop_imm(0, y, width, h));
        }
    }
    tiles
}

/// Trims uniform-color borders from `image` using a simple row/column scan
/// against the corner pixel's color, within `tolerance`.
pub fn trim_uniform_border(image: &DynamicImage, tolerance: u8) -> DynamicImage {
    let rgb = image.to_rgb8();
    let (width, height) = rgb.dimensions();
    if width == 0 || height == 0 {
        return image.clone();
    }
    let background = *rgb.get_pixel(0, 0);

    let is_background_row = |y: u32| -> bool {
        (0..width).all(|x| pixel_close(rgb.get_pixel(x, y).0, background.0, tolerance))
    };
    let is_background_col = |x: u32| -> bool {
        (0..height).all(|y| pixel_close(rgb.get_pixel(x, y).0, background.0, tolerance))
    };

    let mut top = 0;
    while top < height && is_background_row(top) {
        top += 1;
    }
    let mut bottom = height;
    while bottom > top + 1 && is_background_row(bottom - 1) {
        bottom -= 1;
    }
    let mut left = 0;
    while left < width && is_background_col(left) {
        left += 1;
    }
    let mut right = width;
    while right > left + 1 && is_background_col(right - 1) {
        right -= 1;
    }

    if top == 0 && left == 0 && bottom == height && right == width {
        return image.clone();
    }
    image.crop_imm(left, top, right - left, bottom - top)
}

fn pixel_close(a: [u8; 3], b: [u8; 3], tolerance: u8) -> bool {
    a.iter().zip(b.iter()).all(|(x, y)| x.abs_diff(*y) <= tolerance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn solid(width: u32, height: u32, color: [u8; 3]) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb(color)))
    }

    #[test]
    fn resize_leaves_small_images_untouched() {
        let image = solid(100, 100, [255, 255, 255]);
        let resized = resize_to_max_dimension(&image, 200);
        assert_eq!(resized.dimensions(), (100, 100));
    }

    #[test]
    fn resize_shrinks_large_images() {
        let image = solid(4000, 2000, [255, 255, 255]);
        let resized = resize_to_max_dimension(&image, 1000);
        let (w, h) = resized.dimensions();
        assert!(w <= 1000 && h <= 1000);
    }

    #[test]
    fn normal_aspect_ratio_is_not_split() {
        let image = solid(1000, 800, [255, 255, 255]);
        let tiles = split_on_aspect_ratio(&image);
        assert_eq!(tiles.len(), 1);
    }

    #[test]
    fn wide_image_is_split_into_tiles() {
        let image = solid(6000, 500, [255, 255, 255]);
        let tiles = split_on_aspect_ratio(&image);
        assert!(tiles.len() > 1);
        let total_width: u32 = tiles.iter().map(|t| t.dimensions().0).sum();
        assert_eq!(total_width, 6000);
    }
}
