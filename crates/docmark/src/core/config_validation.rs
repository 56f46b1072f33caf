//! Field-level validation for [`super::config::PipelineArgs`].
//!
//! Pure, centrally testable functions, the same shape as the teacher's
//! `core/config_validation` module.

use crate::core::config::PipelineArgs;
use crate::error::{DocMarkError, Result};

pub fn validate_concurrency(concurrency: usize) -> Result<()> {
    if concurrency == 0 {
        return Err(DocMarkError::config("concurrency must be at least 1"));
    }
    Ok(())
}

pub fn validate_max_retries(max_retries: u32) -> Result<()> {
    if max_retries > 10 {
        return Err(DocMarkError::config("max_retries must not exceed 10"));
    }
    Ok(())
}

pub fn validate_max_image_size(max_image_size: u64) -> Result<()> {
    if max_image_size > 0 && max_image_size < 1024 {
        return Err(DocMarkError::config("max_image_size must be 0 (unbounded) or at least 1024 bytes"));
    }
    Ok(())
}

pub fn validate_image_density(image_density: i32) -> Result<()> {
    if !(36..=1200).contains(&image_density) {
        return Err(DocMarkError::config("image_density must be between 36 and 1200 dpi"));
    }
    Ok(())
}

/// Validates argument mutual-exclusion rules and cross-field requirements
/// from SPEC_FULL.md §4.1.
pub fn validate_args(args: &PipelineArgs) -> Result<()> {
    if args.credentials.is_empty() {
        return Err(DocMarkError::config("credentials must not be empty"));
    }
    if args.file_path.trim().is_empty() {
        return Err(DocMarkError::config("file_path is required"));
    }
    if args.enable_hybrid_extraction && (args.direct_image_extraction || args.extract_only) {
        return Err(DocMarkError::config(
            "enable_hybrid_extraction cannot be combined with direct_image_extraction or extract_only",
        ));
    }
    if (args.enable_hybrid_extraction || args.extract_only) && args.schema.is_none() {
        return Err(DocMarkError::config("hybrid extraction and extract_only both require a schema"));
    }
    if args.extract_only && args.maintain_format {
        return Err(DocMarkError::config("extract_only cannot be combined with maintain_format"));
    }

    validate_concurrency(args.concurrency)?;
    validate_max_retries(args.max_retries)?;
    validate_max_image_size(args.max_image_size)?;
    validate_image_density(args.image_density)?;
    Ok(())
}
