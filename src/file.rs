//! Files in transit through the pipeline.

use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};

/// The payload carried by a [`FileRecord`].
pub enum Contents {
    /// No contents (directories, or files read with contents disabled).
    Null,
    /// Fully buffered file contents.
    Buffer(Vec<u8>),
    /// Contents still being streamed. Not supported by the processor.
    Stream(Box<dyn Read + Send>),
}

impl Contents {
    /// Short label used in traces.
    pub fn kind(&self) -> &'static str {
        match self {
            Contents::Null => "null",
            Contents::Buffer(_) => "buffer",
            Contents::Stream(_) => "stream",
        }
    }
}

impl fmt::Debug for Contents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Contents::Null => write!(f, "Null"),
            Contents::Buffer(bytes) => write!(f, "Buffer({} bytes)", bytes.len()),
            Contents::Stream(_) => write!(f, "Stream"),
        }
    }
}

/// A single source file moving through a batch.
#[derive(Debug)]
pub struct FileRecord {
    /// Base directory the file was discovered under.
    pub base: PathBuf,
    /// Full path of the file.
    pub path: PathBuf,
    /// The file's payload.
    pub contents: Contents,
}

impl FileRecord {
    /// Creates a file with buffered contents.
    ///
    /// # Example
    ///
    /// ```
    /// use amdcheck::file::FileRecord;
    ///
    /// let file = FileRecord::buffer("src", "src/app/main.js", "define([], function () {});");
    /// assert_eq!(file.relative(), "app/main.js");
    /// assert!(file.is_buffer());
    /// ```
    pub fn buffer(
        base: impl Into<PathBuf>,
        path: impl Into<PathBuf>,
        contents: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            base: base.into(),
            path: path.into(),
            contents: Contents::Buffer(contents.into()),
        }
    }

    /// Creates a file without contents.
    pub fn null(base: impl Into<PathBuf>, path: impl Into<PathBuf>) -> Self {
        Self {
            base: base.into(),
            path: path.into(),
            contents: Contents::Null,
        }
    }

    /// Creates a file whose contents are a stream.
    pub fn stream(
        base: impl Into<PathBuf>,
        path: impl Into<PathBuf>,
        reader: impl Read + Send + 'static,
    ) -> Self {
        Self {
            base: base.into(),
            path: path.into(),
            contents: Contents::Stream(Box::new(reader)),
        }
    }

    /// Path relative to the base directory, used in messages.
    ///
    /// Falls back to the full path when the file is not under its base.
    pub fn relative(&self) -> String {
        self.relative_path().display().to_string()
    }

    /// Path relative to the base directory.
    pub fn relative_path(&self) -> &Path {
        self.path.strip_prefix(&self.base).unwrap_or(&self.path)
    }

    /// Returns true if the file has no contents.
    pub fn is_null(&self) -> bool {
        matches!(self.contents, Contents::Null)
    }

    /// Returns true if the contents are buffered.
    pub fn is_buffer(&self) -> bool {
        matches!(self.contents, Contents::Buffer(_))
    }

    /// Returns true if the contents are a stream.
    pub fn is_stream(&self) -> bool {
        matches!(self.contents, Contents::Stream(_))
    }

    /// The buffered bytes, if any.
    pub fn bytes(&self) -> Option<&[u8]> {
        match &self.contents {
            Contents::Buffer(bytes) => Some(bytes),
            _ => None,
        }
    }
}
