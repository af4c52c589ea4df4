use crate::chunker::Window;
use crate::error::{Error, Result};
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

/// The source file being documented, held as an ordered sequence of lines.
#[derive(Debug, Clone)]
pub struct Document {
    /// Path the document was read from
    pub path: PathBuf,

    /// Base file name (no directories)
    pub name: String,

    lines: Vec<String>,
}

impl Document {
    /// Creates a document from in-memory text.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, text: &str) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        Self {
            path,
            name,
            lines: text.lines().map(str::to_owned).collect(),
        }
    }

    /// Reads a document from disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the file can't be read or isn't valid UTF-8.
    pub fn read(path: &Path) -> Result<Self> {
        let bytes = fs::read(path).map_err(|e| Error::io(path, e))?;
        let text = String::from_utf8(bytes).map_err(|_| Error::invalid_utf8(path))?;
        Ok(Self::new(path, &text))
    }

    /// Returns the number of lines.
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Returns true if the document has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Returns the file name with every `.` replaced by `-`.
    #[must_use]
    pub fn sanitized_name(&self) -> String {
        sanitize_name(&self.name)
    }

    /// Renders the lines of a window, each prefixed with its 1-based line number.
    #[must_use]
    pub fn numbered(&self, window: Window) -> String {
        let end = window.end.min(self.lines.len());
        let start = window.start.min(end);

        let mut out = String::new();
        for (offset, line) in self.lines[start..end].iter().enumerate() {
            if offset > 0 {
                out.push('\n');
            }
            let _ = write!(out, "{}: {}", start + offset + 1, line);
        }
        out
    }
}

/// Replaces `.` with `-` so the name can carry its own extension.
#[must_use]
pub fn sanitize_name(name: &str) -> String {
    name.replace('.', "-")
}
