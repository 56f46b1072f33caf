//! Orchestration: validated configuration, argument validation, and the
//! stage-sequencing entrypoint.

pub mod config;
pub mod config_validation;
pub mod orchestrator;

pub use config::PipelineArgs;
pub use orchestrator::zerox;
