//! `PipelineArgs`: the configuration bundle accepted by [`crate::zerox`].
//!
//! Loadable from TOML/YAML/JSON, the same convention as the teacher's
//! `ExtractionConfig`, including a directory-walk discovery helper and a
//! small file-modification-time-keyed cache.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};
use std::time::SystemTime;

use crate::error::{DocMarkError, Result};
use crate::model::ModelProviderKind;
use crate::types::Credentials;

static CONFIG_CACHE: LazyLock<DashMap<PathBuf, (SystemTime, Arc<PipelineArgs>)>> = LazyLock::new(DashMap::new);

fn default_model() -> String {
    "gpt-4o".to_string()
}
fn default_provider() -> ModelProviderKind {
    ModelProviderKind::OpenAi
}
fn default_true() -> bool {
    true
}
fn default_concurrency() -> usize {
    10
}
fn default_max_retries() -> u32 {
    1
}
fn default_max_tesseract_workers() -> i64 {
    -1
}
fn default_max_image_size() -> u64 {
    15 * 1024 * 1024
}
fn default_image_density() -> i32 {
    300
}

/// Controls how an OCR failure, after retries, is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ErrorMode {
    #[default]
    Ignore,
    Throw,
}

/// The full `zerox(args)` argument bundle (see SPEC_FULL.md §6).
#[derive(Clone, Serialize, Deserialize)]
pub struct PipelineArgs {
    pub file_path: String,
    pub credentials: Credentials,

    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_provider")]
    pub model_provider: ModelProviderKind,

    #[serde(default = "default_true")]
    pub cleanup: bool,
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default = "default_true")]
    pub correct_orientation: bool,
    #[serde(default)]
    pub error_mode: ErrorMode,
    #[serde(default)]
    pub maintain_format: bool,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_max_tesseract_workers")]
    pub max_tesseract_workers: i64,

    #[serde(default = "default_image_density")]
    pub image_density: i32,
    #[serde(default)]
    pub image_height: Option<u32>,
    #[serde(default = "default_max_image_size")]
    pub max_image_size: u64,
    #[serde(default = "default_true")]
    pub trim_edges: bool,
    #[serde(default)]
    pub pages_to_convert_as_images: PageSpec,
    #[serde(default)]
    pub temp_dir: Option<PathBuf>,
    #[serde(default)]
    pub output_dir: Option<PathBuf>,

    #[serde(default)]
    pub llm_params: serde_json::Value,
    #[serde(default)]
    pub prompt: Option<String>,

    #[serde(default)]
    pub schema: Option<serde_json::Value>,
    #[serde(default)]
    pub extract_per_page: Vec<String>,
    #[serde(default)]
    pub extract_only: bool,
    #[serde(default)]
    pub direct_image_extraction: bool,
    #[serde(default)]
    pub enable_hybrid_extraction: bool,
    #[serde(default)]
    pub extraction_model: Option<String>,
    #[serde(default)]
    pub extraction_model_provider: Option<ModelProviderKind>,
    #[serde(default)]
    pub extraction_credentials: Option<Credentials>,
    #[serde(default)]
    pub extraction_prompt: Option<String>,
    #[serde(default)]
    pub extraction_llm_params: Option<serde_json::Value>,

    #[serde(default)]
    pub want_logprobs: bool,

    /// Caller-supplied OCR replacement (see [`crate::model::CustomModelFunction`]).
    /// Never present in a serialized config file.
    #[serde(skip)]
    pub custom_model_function: Option<crate::model::CustomModelFunction>,
}

impl std::fmt::Debug for PipelineArgs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineArgs")
            .field("file_path", &self.file_path)
            .field("model", &self.model)
            .field("model_provider", &self.model_provider)
            .field("cleanup", &self.cleanup)
            .field("concurrency", &self.concurrency)
            .field("error_mode", &self.error_mode)
            .field("maintain_format", &self.maintain_format)
            .field("max_retries", &self.max_retries)
            .field("schema", &self.schema)
            .field("extract_per_page", &self.extract_per_page)
            .field("extract_only", &self.extract_only)
            .field("custom_model_function", &self.custom_model_function.is_some())
            .finish_non_exhaustive()
    }
}

/// Serializable form of [`crate::rasterize::PageSelection`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PageSpec {
    All(i32),
    Single(usize),
    Subset(Vec<usize>),
}

impl Default for PageSpec {
    fn default() -> Self {
        PageSpec::All(-1)
    }
}

impl From<&PageSpec> for crate::rasterize::PageSelection {
    fn from(spec: &PageSpec) -> Self {
        match spec {
            PageSpec::All(_) => crate::rasterize::PageSelection::All,
            PageSpec::Single(page) => crate::rasterize::PageSelection::Single(*page),
            PageSpec::Subset(pages) => crate::rasterize::PageSelection::Subset(pages.clone()),
        }
    }
}

impl PipelineArgs {
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        toml::from_str(&contents).map_err(|e| DocMarkError::config(format!("invalid TOML config: {e}")))
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        serde_json::from_str(&contents).map_err(DocMarkError::from)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        serde_yaml_ng::from_str(&contents).map_err(|e| DocMarkError::config(format!("invalid YAML config: {e}")))
    }

    /// Loads and caches `path`, reusing the cached value while the file's
    /// modification time is unchanged.
    pub fn load_cached(path: impl AsRef<Path>) -> Result<Arc<Self>> {
        let path = path.as_ref().to_path_buf();
        let modified = std::fs::metadata(&path)?.modified()?;

        if let Some(entry) = CONFIG_CACHE.get(&path) {
            if entry.0 == modified {
                return Ok(Arc::clone(&entry.1));
            }
        }

        let loaded = Arc::new(Self::from_toml_file(&path)?);
        CONFIG_CACHE.insert(path, (modified, Arc::clone(&loaded)));
        Ok(loaded)
    }
}

/// Walks up from `start` looking for `docmark.toml`, `docmark.yaml`, or
/// `docmark.json`, returning the first match.
pub fn discover_config_file(start: &Path) -> Option<PathBuf> {
    let mut dir = Some(start);
    while let Some(current) = dir {
        for name in ["docmark.toml", "docmark.yaml", "docmark.json"] {
            let candidate = current.join(name);
            if candidate.is_file() {
                return Some(candidate);
            }
        }
        dir = current.parent();
    }
    None
}
