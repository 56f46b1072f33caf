//! HEIC/HEIF-to-JPEG conversion via the external `heif-convert` tool. Out of
//! scope to reimplement (spec.md §1(b)).

use std::path::{Path, PathBuf};
use tokio::process::Command;

use crate::error::{DocMarkError, Result};

/// Converts a HEIC/HEIF image at `input` to JPEG under `output_dir`.
pub async fn convert_to_jpeg(input: &Path, output_dir: &Path) -> Result<PathBuf> {
    let stem = input.file_stem().ok_or_else(|| DocMarkError::conversion("input has no file stem"))?;
    let destination = output_dir.join(stem).with_extension("jpg");

    let status = Command::new("heif-convert")
        .arg(input)
        .arg(&destination)
        .status()
        .await
        .map_err(|e| DocMarkError::conversion(format!("failed to invoke heif-convert: {e}")))?;

    if !status.success() {
        return Err(DocMarkError::conversion(format!("heif-convert failed for {}", input.display())));
    }
    Ok(destination)
}
