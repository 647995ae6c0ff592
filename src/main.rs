use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use amdcheck::file::FileRecord;
use amdcheck::options::CheckOptions;
use amdcheck::pipeline::{run_batch, PipelineError};
use amdcheck::processor::{FileProcessor, PLUGIN_NAME};
use anyhow::{Context, Result};
use clap::Parser;
use tracing::debug;
use walkdir::WalkDir;

#[derive(Parser)]
#[command(name = "amdcheck")]
#[command(version)]
#[command(about = "Find and remove unused AMD dependencies", long_about = None)]
struct Cli {
    /// Files or directories to check (defaults to current directory)
    #[arg(default_value = ".")]
    paths: Vec<PathBuf>,

    /// JSON options file (camelCase keys)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log each module's id
    #[arg(long)]
    log_module_id: bool,

    /// Log each module's dependency paths
    #[arg(long)]
    log_dependency_paths: bool,

    /// Log each module's dependency names
    #[arg(long)]
    log_dependency_names: bool,

    /// Do not log unused dependency paths
    #[arg(long)]
    no_log_unused_paths: bool,

    /// Log unused dependency names
    #[arg(long)]
    log_unused_names: bool,

    /// Log the number of modules in each file
    #[arg(long)]
    log_number_of_modules: bool,

    /// Leave unused dependencies in the output
    #[arg(long)]
    keep_unused: bool,

    /// Fail if any unused dependency is found
    #[arg(long)]
    error_on_unused: bool,

    /// Dependency path to never report (`/regex/` allowed, repeatable)
    #[arg(long = "except", value_name = "PATH")]
    excepts: Vec<String>,

    /// Write processed files to this directory
    #[arg(short, long, conflicts_with = "write")]
    out_dir: Option<PathBuf>,

    /// Rewrite processed files in place
    #[arg(short, long)]
    write: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Only print errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report_error(&err);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool, quiet: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    fmt().with_env_filter(filter).with_target(false).init();
}

fn report_error(err: &anyhow::Error) {
    match err.downcast_ref::<PipelineError>() {
        Some(pipeline) if !pipeline.show_stack() => eprintln!("[{}] {}", PLUGIN_NAME, pipeline),
        _ => eprintln!("[{}] {:?}", PLUGIN_NAME, err),
    }
}

fn load_options(cli: &Cli) -> Result<CheckOptions> {
    let mut options = match &cli.config {
        Some(path) => CheckOptions::from_file(path)
            .with_context(|| format!("Failed to load options from {}", path.display()))?,
        None => CheckOptions::default(),
    };

    // Flags only ever move options away from their defaults
    if cli.log_module_id {
        options.log_module_id = true;
    }
    if cli.log_dependency_paths {
        options.log_dependency_paths = true;
    }
    if cli.log_dependency_names {
        options.log_dependency_names = true;
    }
    if cli.no_log_unused_paths {
        options.log_unused_dependency_paths = false;
    }
    if cli.log_unused_names {
        options.log_unused_dependency_names = true;
    }
    if cli.log_number_of_modules {
        options.log_number_of_modules = true;
    }
    if cli.keep_unused {
        options.remove_unused_dependencies = false;
    }
    if cli.error_on_unused {
        options.error_on_unused_dependencies = true;
    }
    options.excepts_paths.extend(cli.excepts.iter().cloned());

    Ok(options)
}

fn run(cli: &Cli) -> Result<()> {
    let options = load_options(cli)?;
    let files = collect_files(&cli.paths)?;
    debug!("Checking {} files", files.len());

    let processor = FileProcessor::new(options)?;
    let summary = run_batch(processor, files, |file| write_file(cli, &file))?;

    debug!(
        "Found {} unused dependencies in {} of {} files",
        summary.unused_dependencies, summary.files_with_unused, summary.files_processed
    );
    Ok(())
}

/// Write a forwarded file according to the output mode.
fn write_file(cli: &Cli, file: &FileRecord) -> io::Result<()> {
    let Some(bytes) = file.bytes() else {
        return Ok(());
    };

    let target = match (&cli.out_dir, cli.write) {
        (Some(dir), _) => dir.join(file.relative_path()),
        (None, true) => file.path.clone(),
        (None, false) => return Ok(()),
    };

    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&target, bytes)?;
    debug!("Wrote {}", target.display());
    Ok(())
}

/// Read every JavaScript file under the given paths into buffered records.
fn collect_files(paths: &[PathBuf]) -> Result<Vec<FileRecord>> {
    let mut files = Vec::new();

    for root in paths {
        if root.is_file() {
            let base = root.parent().unwrap_or(Path::new("")).to_path_buf();
            files.push(read_file(&base, root)?);
            continue;
        }

        for entry in WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !is_ignored_dir(e))
        {
            let entry = entry.with_context(|| format!("Failed to walk {}", root.display()))?;
            let path = entry.path();

            if !entry.file_type().is_file() || !is_javascript(path) {
                continue;
            }

            files.push(read_file(root, path)?);
        }
    }

    Ok(files)
}

fn read_file(base: &Path, path: &Path) -> Result<FileRecord> {
    let contents =
        fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(FileRecord::buffer(base, path, contents))
}

fn is_javascript(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("js") | Some("mjs") | Some("cjs")
    )
}

/// Check if a directory should be ignored during traversal.
fn is_ignored_dir(entry: &walkdir::DirEntry) -> bool {
    if !entry.file_type().is_dir() || entry.depth() == 0 {
        return false;
    }

    let name = entry.file_name().to_string_lossy();
    matches!(
        name.as_ref(),
        "node_modules" | ".git" | "dist" | "build" | "coverage" | "bower_components"
    )
}
