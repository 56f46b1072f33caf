//! File Acquisition: resolve a local path or remote URL into bytes on disk,
//! detect the effective extension, and flag compound-binary office files
//! misnamed with a `.pdf` extension.

use std::path::{Path, PathBuf};

use crate::error::{DocMarkError, Result};

/// Magic bytes for the legacy OLE/CFB container format used by pre-2007
/// Office documents (`.doc`, `.ppt`, `.xls`).
const OLE_CFB_MAGIC: [u8; 8] = [0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

/// Result of acquiring an input document.
#[derive(Debug, Clone)]
pub struct AcquiredFile {
    pub local_path: PathBuf,
    pub extension: String,
    pub is_compound_binary: bool,
}

/// Materializes `file_path` (a local path or an `http(s)://` URL) into
/// `temp_dir`, returning its effective extension and a compound-binary flag.
pub async fn acquire(file_path: &str, temp_dir: &Path) -> Result<AcquiredFile> {
    let local_path = if file_path.starts_with("http://") || file_path.starts_with("https://") {
        download(file_path, temp_dir).await?
    } else {
        let source = Path::new(file_path);
        if !tokio::fs::try_exists(source).await.unwrap_or(false) {
            return Err(DocMarkError::acquisition(format!("file not found: {file_path}")));
        }
        let destination = temp_dir.join(source.file_name().ok_or_else(|| {
            DocMarkError::acquisition(format!("file path has no file name: {file_path}"))
        })?);
        tokio::fs::copy(source, &destination).await?;
        destination
    };

    let extension = local_path
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    let header = read_header(&local_path).await?;
    let is_compound_binary = header.starts_with(&OLE_CFB_MAGIC);

    Ok(AcquiredFile { local_path, extension, is_compound_binary })
}

async fn download(url: &str, temp_dir: &Path) -> Result<PathBuf> {
    let response = reqwest::get(url).await?;
    if !response.status().is_success() {
        return Err(DocMarkError::acquisition(format!("failed to download {url}: HTTP {}", response.status())));
    }
    let file_name = url.rsplit('/').next().filter(|s| !s.is_empty()).unwrap_or("download");
    let destination = temp_dir.join(file_name);
    let bytes = response.bytes().await?;
    tokio::fs::write(&destination, &bytes).await?;
    Ok(destination)
}

async fn read_header(path: &Path) -> Result<Vec<u8>> {
    use tokio::io::AsyncReadExt;
    let mut file = tokio::fs::File::open(path).await?;
    let mut header = vec![0u8; 8];
    let read = file.read(&mut header).await?;
    header.truncate(read);
    Ok(header)
}

/// Spreadsheet/workbook extensions that bypass rasterization entirely (see
/// the Structured-Data Reader).
pub fn is_structured_data_extension(extension: &str) -> bool {
    matches!(extension, "xlsx" | "xlsm" | "xls" | "xlsb" | "ods")
}
