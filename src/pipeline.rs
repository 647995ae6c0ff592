//! Driving a processor over a stream of files.
//!
//! [`run_batch`] plays the role of the host pipeline: it pulls files from an
//! upstream iterator, hands each forwarded file to a downstream sink and
//! finalizes the processor once the upstream is exhausted. The first error
//! stops the batch.

use std::io;

use thiserror::Error;
use tracing::debug;

use crate::analysis::Analyzer;
use crate::file::FileRecord;
use crate::processor::{BatchSummary, FileProcessor, PluginError};

/// Errors that end a batch run.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Plugin(#[from] PluginError),

    #[error("Failed to forward {path}: {source}")]
    Sink {
        path: String,
        #[source]
        source: io::Error,
    },
}

impl PipelineError {
    /// Whether user-facing output should include the full error chain.
    pub fn show_stack(&self) -> bool {
        match self {
            PipelineError::Plugin(err) => err.show_stack(),
            PipelineError::Sink { .. } => true,
        }
    }
}

/// Run one batch: process every file in order, forward it, then finalize.
///
/// # Example
///
/// ```
/// use amdcheck::file::FileRecord;
/// use amdcheck::options::CheckOptions;
/// use amdcheck::pipeline::run_batch;
/// use amdcheck::processor::FileProcessor;
///
/// let processor = FileProcessor::new(CheckOptions::default()).unwrap();
/// let files = vec![FileRecord::buffer("", "a.js", "define(['x'], function (x) {});")];
///
/// let mut out = Vec::new();
/// let summary = run_batch(processor, files, |file| {
///     out.push(file);
///     Ok(())
/// })
/// .unwrap();
///
/// assert_eq!(summary.unused_dependencies, 1);
/// assert_eq!(out[0].bytes(), Some(&b"define([], function () {});"[..]));
/// ```
pub fn run_batch<A, I, S>(
    mut processor: FileProcessor<A>,
    files: I,
    mut sink: S,
) -> Result<BatchSummary, PipelineError>
where
    A: Analyzer,
    I: IntoIterator<Item = FileRecord>,
    S: FnMut(FileRecord) -> io::Result<()>,
{
    for file in files {
        let forwarded = processor.process(file)?;
        let path = forwarded.relative();
        sink(forwarded).map_err(|source| PipelineError::Sink {
            path: path.clone(),
            source,
        })?;
        debug!("Forwarded {}", path);
    }

    Ok(processor.finalize()?)
}
