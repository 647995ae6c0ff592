//! AMD dependency analysis.
//!
//! The processor talks to analyzers through the [`Analyzer`] trait, which
//! turns a file's source text into one [`ModuleAnalysis`] per `define` or
//! `require` call plus an optimized copy of the text with unused
//! dependencies removed.
//!
//! [`AmdAnalyzer`] is the tree-sitter backed implementation.
//!
//! # Example
//!
//! ```
//! use amdcheck::analysis::{AmdAnalyzer, Analyzer};
//! use amdcheck::options::CheckOptions;
//!
//! let mut analyzer = AmdAnalyzer::new().unwrap();
//! let source = "define(['a', 'b'], function (a, b) { return a; });";
//! let output = analyzer.analyze(source, &CheckOptions::default()).unwrap();
//!
//! assert_eq!(output.results.len(), 1);
//! assert_eq!(output.results[0].unused_paths, vec!["b"]);
//! assert_eq!(output.optimized_content, "define(['a'], function (a) { return a; });");
//! ```

pub mod amd;

use thiserror::Error;

use crate::options::CheckOptions;

pub use amd::AmdAnalyzer;

/// Errors that can occur during dependency analysis.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Tree-sitter language initialization failed")]
    LanguageInit,

    #[error("Failed to parse source")]
    ParseFailed,

    #[error("Syntax error at line {line}, column {column}")]
    Syntax { line: usize, column: usize },

    #[error("Invalid excepted path pattern {pattern}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Result type for analysis operations.
pub type AnalysisResult<T> = Result<T, AnalysisError>;

/// Dependency usage of a single AMD module.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleAnalysis {
    /// Module id from `define('id', ...)`, if named.
    pub module_id: Option<String>,
    /// Dependency paths in declaration order.
    pub paths: Vec<String>,
    /// Factory parameter names in declaration order.
    pub dependencies: Vec<String>,
    /// Paths whose parameter is never referenced.
    pub unused_paths: Vec<String>,
    /// Parameter names that are never referenced.
    pub unused_dependencies: Vec<String>,
    /// Line of the `define`/`require` call (1-indexed).
    pub line: usize,
}

impl ModuleAnalysis {
    /// Returns true if the module has any unused dependencies.
    pub fn has_unused(&self) -> bool {
        !self.unused_dependencies.is_empty()
    }
}

/// Everything an analyzer reports for one file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnalysisOutput {
    /// One entry per module, in source order.
    pub results: Vec<ModuleAnalysis>,
    /// The full file text with every module's unused dependencies removed.
    pub optimized_content: String,
}

impl AnalysisOutput {
    /// All unused dependency names, in module order then declaration order.
    pub fn unused_dependencies(&self) -> Vec<String> {
        self.results
            .iter()
            .flat_map(|r| r.unused_dependencies.iter().cloned())
            .collect()
    }
}

/// Source of per-file dependency analysis.
pub trait Analyzer {
    /// Analyze `source`, returning per-module results and optimized text.
    fn analyze(&mut self, source: &str, options: &CheckOptions) -> AnalysisResult<AnalysisOutput>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unused_dependencies_flattened_in_order() {
        let output = AnalysisOutput {
            results: vec![
                ModuleAnalysis {
                    unused_dependencies: vec!["b".to_string(), "c".to_string()],
                    ..Default::default()
                },
                ModuleAnalysis::default(),
                ModuleAnalysis {
                    unused_dependencies: vec!["a".to_string()],
                    ..Default::default()
                },
            ],
            optimized_content: String::new(),
        };

        assert_eq!(output.unused_dependencies(), vec!["b", "c", "a"]);
        assert!(output.results[0].has_unused());
        assert!(!output.results[1].has_unused());
    }
}
