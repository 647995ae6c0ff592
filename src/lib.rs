//! amdcheck - Find and remove unused AMD dependencies
//!
//! This crate provides a file-transform stage for build pipelines that
//! checks AMD modules (`define`/`require` calls) for dependencies whose
//! factory parameter is never used, strips them, and can fail the batch
//! when any are found.

pub mod analysis;
pub mod file;
pub mod options;
pub mod pipeline;
pub mod processor;

pub use analysis::{AmdAnalyzer, AnalysisOutput, Analyzer, ModuleAnalysis};
pub use file::{Contents, FileRecord};
pub use options::CheckOptions;
pub use pipeline::{run_batch, PipelineError};
pub use processor::{BatchSummary, FileProcessor, PluginError};
