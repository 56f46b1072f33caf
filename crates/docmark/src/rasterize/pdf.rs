//! PDF-to-image rasterization via the external `pdftoppm` tool (poppler).
//!
//! The PDF engine itself is out of scope for this crate (spec.md §1(b)); we
//! only specify the operation it must perform and invoke it as a subprocess,
//! the same boundary the teacher draws around office/PDF conversion tools.

use std::path::{Path, PathBuf};
use tokio::process::Command;

use super::RasterOptions;
use crate::error::{DocMarkError, Result};
use crate::image_utils::dpi::calculate_optimal_dpi;

/// Upper bound on a rasterized page's longer pixel dimension, independent of
/// the caller's requested DPI. Guards against runaway `pdftoppm` output for
/// oversized physical page sizes.
const MAX_PAGE_DIMENSION_PX: i32 = 6000;

/// `pdfinfo`'s reported page count and, when parseable, the first page's
/// size in PDF points (used to pick a memory/dimension-bounded DPI).
struct PdfInfo {
    pages: usize,
    page_size: Option<(f64, f64)>,
}

/// Runs `pdfinfo` once and extracts both the page count and page size.
async fn read_pdf_info(pdf_path: &Path) -> Result<PdfInfo> {
    let output = Command::new("pdfinfo")
        .arg(pdf_path)
        .output()
        .await
        .map_err(|e| DocMarkError::rasterization(format!("failed to invoke pdfinfo: {e}")))?;
    if !output.status.success() {
        return Err(DocMarkError::rasterization("pdfinfo exited with a non-zero status"));
    }
    let stdout = String::from_utf8_lossy(&output.stdout);
    let pages = stdout
        .lines()
        .find_map(|line| line.strip_prefix("Pages:"))
        .and_then(|count| count.trim().parse::<usize>().ok())
        .ok_or_else(|| DocMarkError::rasterization("pdfinfo output did not contain a page count"))?;
    let page_size = stdout.lines().find_map(|line| line.strip_prefix("Page size:")).and_then(parse_page_size);
    Ok(PdfInfo { pages, page_size })
}

/// Parses a "612 x 792 pts (letter)"-shaped `pdfinfo` page-size line.
fn parse_page_size(line: &str) -> Option<(f64, f64)> {
    let mut fields = line.split_whitespace();
    let width = fields.next()?.parse::<f64>().ok()?;
    let separator = fields.next()?;
    if separator != "x" {
        return None;
    }
    let height = fields.next()?.parse::<f64>().ok()?;
    Some((width, height))
}

/// Picks the DPI to hand `pdftoppm`: the caller's requested density, bounded
/// by [`calculate_optimal_dpi`]'s memory/dimension limits when the page size
/// is known.
fn resolve_density(page_size: Option<(f64, f64)>, requested_density: i32) -> i32 {
    match page_size {
        Some((width, height)) => {
            calculate_optimal_dpi(width, height, requested_density, MAX_PAGE_DIMENSION_PX, 72, requested_density)
        }
        None => requested_density,
    }
}

/// Rasterizes the pages selected by `options.pages` into PNG files under
/// `output_dir`, named `page-{n}.png`, returned in ascending page order.
pub async fn rasterize_pdf(pdf_path: &Path, output_dir: &Path, options: &RasterOptions) -> Result<Vec<PathBuf>> {
    let info = read_pdf_info(pdf_path).await?;
    let pages = options.pages.resolve(info.pages);
    if pages.is_empty() {
        return Ok(vec![]);
    }
    let density = resolve_density(info.page_size, options.image_density);

    let mut outputs = Vec::with_capacity(pages.len());
    for page in pages {
        let prefix = output_dir.join(format!("page-{page}"));
        let mut command = Command::new("pdftoppm");
        command
            .arg("-png")
            .arg("-r")
            .arg(density.to_string())
            .arg("-f")
            .arg(page.to_string())
            .arg("-l")
            .arg(page.to_string())
            .arg("-singlefile");
        if let Some(height) = options.image_height {
            command.arg("-scale-to-y").arg(height.to_string()).arg("-scale-to-x").arg("-1");
        }
        command.arg(pdf_path).arg(&prefix);

        let status = command
            .status()
            .await
            .map_err(|e| DocMarkError::rasterization(format!("failed to invoke pdftoppm: {e}")))?;
        if !status.success() {
            return Err(DocMarkError::rasterization(format!("pdftoppm failed for page {page}")));
        }
        outputs.push(prefix.with_extension("png"));
    }
    Ok(outputs)
}
