//! Office-document-to-PDF conversion via the external LibreOffice headless
//! CLI. Out of scope to reimplement (spec.md §1(b)); specified by the
//! operation it must perform.

use std::path::{Path, PathBuf};
use tokio::process::Command;

use crate::error::{DocMarkError, Result};

/// Converts `input` (docx/pptx/xlsx/odt/... or a legacy OLE/CFB office file)
/// into a PDF under `output_dir`, returning its path.
pub async fn convert_to_pdf(input: &Path, output_dir: &Path) -> Result<PathBuf> {
    let status = Command::new("soffice")
        .arg("--headless")
        .arg("--convert-to")
        .arg("pdf")
        .arg("--outdir")
        .arg(output_dir)
        .arg(input)
        .status()
        .await
        .map_err(|e| DocMarkError::conversion(format!("failed to invoke soffice: {e}")))?;

    if !status.success() {
        return Err(DocMarkError::conversion(format!("soffice conversion failed for {}", input.display())));
    }

    let stem = input.file_stem().ok_or_else(|| DocMarkError::conversion("input has no file stem"))?;
    Ok(output_dir.join(stem).with_extension("pdf"))
}
