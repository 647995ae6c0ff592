//! Per-file processing and end-of-batch error aggregation.
//!
//! A [`FileProcessor`] handles one batch: every file goes through
//! [`FileProcessor::process`] in arrival order and the batch ends with a
//! single call to [`FileProcessor::finalize`], which consumes the processor.
//!
//! ```text
//! upstream → process(file) → downstream
//!                ↓
//!           BatchState (counters, queued messages)
//!                ↓
//!           finalize() → Ok(summary) | Err(UnusedDependencies)
//! ```

use thiserror::Error;
use tracing::{debug, info};

use crate::analysis::{AmdAnalyzer, AnalysisError, AnalysisOutput, Analyzer, ModuleAnalysis};
use crate::file::{Contents, FileRecord};
use crate::options::CheckOptions;

/// Name attached to every error this crate reports.
pub const PLUGIN_NAME: &str = "amdcheck";

/// Errors raised while processing a batch.
#[derive(Error, Debug)]
pub enum PluginError {
    /// A file arrived with streaming contents.
    #[error("Streams are not supported!")]
    UnsupportedContent { path: String },

    /// One or more files declared unused dependencies.
    #[error("{message}")]
    UnusedDependencies { message: String },

    /// The analyzer rejected a file.
    #[error("Failed to analyze {path}")]
    Analyzer {
        path: String,
        #[source]
        source: AnalysisError,
    },
}

impl PluginError {
    /// The plugin the error originates from.
    pub fn plugin(&self) -> &'static str {
        PLUGIN_NAME
    }

    /// Whether user-facing output should include the full error chain.
    ///
    /// Unused dependency reports are plain messages, everything else is not.
    pub fn show_stack(&self) -> bool {
        !matches!(self, PluginError::UnusedDependencies { .. })
    }
}

/// Running totals for one batch.
#[derive(Debug, Clone, Default)]
pub struct BatchState {
    unused_dependencies: usize,
    files_processed: usize,
    files_with_unused: usize,
    errors: Vec<String>,
}

impl BatchState {
    /// Total unused dependencies seen so far.
    pub fn unused_dependencies(&self) -> usize {
        self.unused_dependencies
    }

    /// Number of buffered files analyzed so far.
    pub fn files_processed(&self) -> usize {
        self.files_processed
    }

    /// Number of files that had at least one unused dependency.
    pub fn files_with_unused(&self) -> usize {
        self.files_with_unused
    }

    /// Messages queued for the end-of-batch error, in arrival order.
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    fn summary(&self) -> BatchSummary {
        BatchSummary {
            files_processed: self.files_processed,
            files_with_unused: self.files_with_unused,
            unused_dependencies: self.unused_dependencies,
        }
    }
}

/// Counters of a completed batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BatchSummary {
    pub files_processed: usize,
    pub files_with_unused: usize,
    pub unused_dependencies: usize,
}

/// Checks files for unused AMD dependencies, one batch per instance.
pub struct FileProcessor<A = AmdAnalyzer> {
    options: CheckOptions,
    analyzer: A,
    state: BatchState,
}

impl FileProcessor<AmdAnalyzer> {
    /// Create a processor backed by the tree-sitter analyzer.
    pub fn new(options: CheckOptions) -> Result<Self, AnalysisError> {
        Ok(Self::with_analyzer(options, AmdAnalyzer::new()?))
    }
}

impl<A: Analyzer> FileProcessor<A> {
    /// Create a processor backed by a custom analyzer.
    pub fn with_analyzer(options: CheckOptions, analyzer: A) -> Self {
        Self {
            options,
            analyzer,
            state: BatchState::default(),
        }
    }

    pub fn options(&self) -> &CheckOptions {
        &self.options
    }

    pub fn state(&self) -> &BatchState {
        &self.state
    }

    /// Process one file and return it for forwarding downstream.
    ///
    /// Files without contents pass through untouched. Streaming files are
    /// rejected with [`PluginError::UnsupportedContent`] and not forwarded.
    pub fn process(&mut self, mut file: FileRecord) -> Result<FileRecord, PluginError> {
        let output = match &file.contents {
            Contents::Null => {
                debug!("Skipping {} (no contents)", file.relative());
                return Ok(file);
            }
            Contents::Stream(_) => {
                return Err(PluginError::UnsupportedContent {
                    path: file.relative(),
                });
            }
            Contents::Buffer(bytes) => {
                let source = String::from_utf8_lossy(bytes);
                self.analyzer
                    .analyze(&source, &self.options)
                    .map_err(|source| PluginError::Analyzer {
                        path: file.relative(),
                        source,
                    })?
            }
        };

        let path = file.relative();
        debug!("Analyzed {}: {} module(s)", path, output.results.len());

        for line in file_report(&path, &output, &self.options) {
            info!("{}", line);
        }

        self.state.files_processed += 1;
        let unused: usize = output
            .results
            .iter()
            .map(|r| r.unused_dependencies.len())
            .sum();
        if unused > 0 {
            self.state.unused_dependencies += unused;
            self.state.files_with_unused += 1;
        }

        if self.options.error_on_unused_dependencies {
            let names = output.unused_dependencies();
            if !names.is_empty() {
                self.state.errors.push(format_error(&path, &names));
            }
        }

        if self.options.remove_unused_dependencies {
            file.contents = Contents::Buffer(output.optimized_content.into_bytes());
        }

        Ok(file)
    }

    /// End the batch, failing if any file queued an unused dependency error.
    pub fn finalize(self) -> Result<BatchSummary, PluginError> {
        if !self.state.errors.is_empty() {
            return Err(PluginError::UnusedDependencies {
                message: self.state.errors.join("\n\n"),
            });
        }

        Ok(self.state.summary())
    }
}

/// Message queued for a file with unused dependencies.
///
/// # Example
///
/// ```
/// use amdcheck::processor::format_error;
///
/// let message = format_error("foo.js", &["b".to_string()]);
/// assert_eq!(message, r#"The file "foo.js" contains the unused dependencies ["b"]."#);
/// ```
pub fn format_error(path: &str, unused: &[String]) -> String {
    let list = serde_json::to_string(unused).unwrap_or_default();
    format!(
        "The file \"{}\" contains the unused dependencies {}.",
        path, list
    )
}

/// Module count line, e.g. `(2 modules)`.
pub fn module_count_line(count: usize) -> String {
    match count {
        0 => "(no modules)".to_string(),
        1 => "(1 module)".to_string(),
        n => format!("({} modules)", n),
    }
}

/// Log lines for a single module, each gated by its option.
pub fn module_report(result: &ModuleAnalysis, options: &CheckOptions) -> Vec<String> {
    let mut lines = Vec::new();

    if options.log_module_id {
        if let Some(id) = result.module_id.as_deref().filter(|id| !id.is_empty()) {
            lines.push(format!("module id: {}", id));
        }
    }

    if options.log_dependency_paths && !result.paths.is_empty() {
        lines.push(format!("paths: {}", result.paths.join(", ")));
    }

    if options.log_dependency_names && !result.dependencies.is_empty() {
        lines.push(format!("dependencies: {}", result.dependencies.join(", ")));
    }

    if options.log_unused_dependency_paths && !result.unused_paths.is_empty() {
        lines.push(format!("Unused paths: {}", result.unused_paths.join(", ")));
    }

    if options.log_unused_dependency_names && !result.unused_dependencies.is_empty() {
        lines.push(format!(
            "Unused dependencies: {}",
            result.unused_dependencies.join(", ")
        ));
    }

    lines
}

/// All log lines for one file, in emission order.
pub fn file_report(path: &str, output: &AnalysisOutput, options: &CheckOptions) -> Vec<String> {
    let mut lines = Vec::new();

    if options.log_number_of_modules {
        lines.push(module_count_line(output.results.len()));
    }

    let module_lines: Vec<String> = output
        .results
        .iter()
        .flat_map(|r| module_report(r, options))
        .collect();

    if options.should_log_file_path() && !module_lines.is_empty() {
        lines.insert(0, format!("file: {}", path));
    }

    lines.extend(module_lines);
    lines
}
