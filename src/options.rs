//! Configuration for an amdcheck batch.
//!
//! Options mirror the camelCase keys accepted in a JSON options file, so a
//! file like `{"errorOnUnusedDependencies": true}` maps directly onto
//! [`CheckOptions`]. Every field is optional and falls back to the defaults
//! documented on the struct.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Errors that can occur while loading options.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the options file from disk.
    #[error("Failed to read options file: {0}")]
    IoError(#[from] std::io::Error),

    /// The options file is not valid JSON or contains unknown keys.
    #[error("Failed to parse options: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Result type alias for option loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Options controlling logging and how unused dependencies are handled.
///
/// # Example
///
/// ```
/// use amdcheck::options::CheckOptions;
///
/// let opts = CheckOptions::from_json(r#"{"logModuleId": true}"#).unwrap();
/// assert!(opts.log_module_id);
/// assert!(opts.log_unused_dependency_paths);
/// assert!(opts.remove_unused_dependencies);
/// assert!(!opts.error_on_unused_dependencies);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct CheckOptions {
    /// Log each module's identifier. Default: `false`.
    pub log_module_id: bool,

    /// Log each module's dependency paths. Default: `false`.
    pub log_dependency_paths: bool,

    /// Log each module's dependency names. Default: `false`.
    pub log_dependency_names: bool,

    /// Log each module's unused dependency paths. Default: `true`.
    pub log_unused_dependency_paths: bool,

    /// Log each module's unused dependency names. Default: `false`.
    pub log_unused_dependency_names: bool,

    /// Log the number of modules found in each file. Default: `false`.
    pub log_number_of_modules: bool,

    /// Replace file contents with the optimized output. Default: `true`.
    pub remove_unused_dependencies: bool,

    /// Fail the batch when any unused dependency is found. Default: `false`.
    pub error_on_unused_dependencies: bool,

    /// Log the file path before its module report.
    ///
    /// When unset, enabled whenever any path or name log option is on.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_file_path: Option<bool>,

    /// Dependency paths that are never reported or removed.
    ///
    /// An entry wrapped in slashes (`/^css!/`) is a regular expression,
    /// anything else must match the path exactly.
    pub excepts_paths: Vec<String>,
}

impl Default for CheckOptions {
    fn default() -> Self {
        Self {
            log_module_id: false,
            log_dependency_paths: false,
            log_dependency_names: false,
            log_unused_dependency_paths: true,
            log_unused_dependency_names: false,
            log_number_of_modules: false,
            remove_unused_dependencies: true,
            error_on_unused_dependencies: false,
            log_file_path: None,
            excepts_paths: Vec::new(),
        }
    }
}

impl CheckOptions {
    /// Loads options from a JSON file.
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Parses options from a JSON string. Missing keys take their defaults.
    pub fn from_json(content: &str) -> ConfigResult<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Whether the file path is logged ahead of each file's report.
    pub fn should_log_file_path(&self) -> bool {
        self.log_file_path.unwrap_or(
            self.log_dependency_paths
                || self.log_dependency_names
                || self.log_unused_dependency_paths
                || self.log_unused_dependency_names,
        )
    }
}
