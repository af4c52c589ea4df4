use std::path::PathBuf;
use thiserror::Error;

/// Public reference for the error codes returned by the chat completion API.
pub const API_ERROR_CODES_URL: &str = "https://platform.openai.com/docs/guides/error-codes";

/// Result type alias using the library's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Comprehensive error types for the bimbus library.
#[derive(Error, Debug, Clone)]
#[non_exhaustive]
pub enum Error {
    /// IO error with context about the file path.
    #[error("IO error accessing '{path}': {message}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// Error message
        message: String,
    },

    /// User supplied an invalid flag, path or setting.
    #[error("{message}")]
    Validation {
        /// Detailed error message
        message: String,
    },

    /// Invalid UTF-8 encountered in the input file.
    #[error("Invalid UTF-8 encoding in file '{path}'. File may be binary or use unsupported encoding.")]
    InvalidUtf8 {
        /// Path to file with encoding issues
        path: PathBuf,
    },

    /// Input file has no lines to document.
    #[error("Input file '{path}' is empty, nothing to document")]
    EmptyDocument {
        /// Path to the empty file
        path: PathBuf,
    },

    /// A single chat completion call failed.
    #[error("Chat completion request failed: {message}")]
    Request {
        /// Error message
        message: String,
    },

    /// Every attempt of a chat completion failed.
    #[error(
        "Chat completion failed after {attempts} attempts: {message}. \
         See {} for the meaning of API error codes.",
        API_ERROR_CODES_URL
    )]
    Completion {
        /// Number of attempts made
        attempts: u32,
        /// Message of the last failure
        message: String,
    },

    /// Template rendering error.
    #[error("Failed to render template '{template}': {message}")]
    Template {
        /// Template name
        template: String,
        /// Error message
        message: String,
    },

    /// Output document could not be produced.
    #[error("Failed to render {format} document: {message}")]
    Render {
        /// Output format name
        format: String,
        /// Error message
        message: String,
    },
}

impl Error {
    /// Creates an IO error with path context.
    #[must_use]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            message: source.to_string(),
        }
    }

    /// Creates a validation error.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Creates a request error for a single failed call.
    #[must_use]
    pub fn request(message: impl Into<String>) -> Self {
        Self::Request {
            message: message.into(),
        }
    }

    /// Creates a template error.
    #[must_use]
    pub fn template(template: impl Into<String>, source: tera::Error) -> Self {
        Self::Template {
            template: template.into(),
            message: source.to_string(),
        }
    }

    /// Creates a render error.
    #[must_use]
    pub fn render(format: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Render {
            format: format.into(),
            message: message.into(),
        }
    }

    /// Creates an invalid UTF-8 error.
    #[must_use]
    pub fn invalid_utf8(path: impl Into<PathBuf>) -> Self {
        Self::InvalidUtf8 { path: path.into() }
    }

    /// Creates an empty document error.
    #[must_use]
    pub fn empty_document(path: impl Into<PathBuf>) -> Self {
        Self::EmptyDocument { path: path.into() }
    }

    /// Returns true if this is an IO error.
    #[must_use]
    pub const fn is_io(&self) -> bool {
        matches!(self, Self::Io { .. })
    }

    /// Returns true if this is a validation error.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    /// Returns true if the chat completion retries were exhausted.
    #[must_use]
    pub const fn is_completion(&self) -> bool {
        matches!(self, Self::Completion { .. })
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Self::Request {
            message: e.to_string(),
        }
    }
}
