//! Rasterizer: converts any supported input into an ordered list of PNG page
//! images.
//!
//! Office and non-image, non-PDF inputs are converted to PDF first (via an
//! external tool), then rasterized page-by-page; PDF pages are rasterized
//! directly; HEIC images convert straight to JPEG; PNG/JPEG pass through
//! unchanged.

pub mod heic;
pub mod office;
pub mod pdf;

use std::path::{Path, PathBuf};

use crate::error::Result;

/// Selects which pages to rasterize.
#[derive(Debug, Clone)]
pub enum PageSelection {
    All,
    Single(usize),
    Subset(Vec<usize>),
}

impl PageSelection {
    /// Filters `1..=total_pages` down to the selected, ascending, in-range
    /// page numbers.
    pub fn resolve(&self, total_pages: usize) -> Vec<usize> {
        match self {
            PageSelection::All => (1..=total_pages).collect(),
            PageSelection::Single(page) => if *page >= 1 && *page <= total_pages { vec![*page] } else { vec![] },
            PageSelection::Subset(pages) => {
                let mut selected: Vec<usize> =
                    pages.iter().copied().filter(|&p| p >= 1 && p <= total_pages).collect();
                selected.sort_unstable();
                selected.dedup();
                selected
            }
        }
    }
}

/// Raster parameters.
#[derive(Debug, Clone)]
pub struct RasterOptions {
    pub image_density: i32,
    pub image_height: Option<u32>,
    pub pages: PageSelection,
}

/// Rasterizes `extension`-typed input at `local_path` into an ordered list
/// of PNG page paths under `output_dir`.
pub async fn rasterize(
    local_path: &Path,
    extension: &str,
    is_compound_binary: bool,
    output_dir: &Path,
    options: &RasterOptions,
) -> Result<Vec<PathBuf>> {
    match extension {
        "png" | "jpg" | "jpeg" => Ok(vec![local_path.to_path_buf()]),
        "heic" | "heif" => {
            let jpeg = heic::convert_to_jpeg(local_path, output_dir).await?;
            Ok(vec![jpeg])
        }
        "pdf" if !is_compound_binary => pdf::rasterize_pdf(local_path, output_dir, options).await,
        _ => {
            let pdf_path = office::convert_to_pdf(local_path, output_dir).await?;
            pdf::rasterize_pdf(&pdf_path, output_dir, options).await
        }
    }
}
