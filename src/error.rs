//! Error handling for instrument file discovery and loading.
//!
//! Directory listing failures during traversal are recovered locally and
//! reported as diagnostics; everything else here propagates to the caller.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReaderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("Invalid filter pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error("Invalid input path: {path} - {reason}")]
    InvalidInput { path: PathBuf, reason: String },

    #[error("Could not list directory: {path}")]
    List {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not read file: {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Header parsing failed for file: {path} - {reason}")]
    HeaderParse { path: PathBuf, reason: String },

    #[error("Body parsing failed for file: {path} at line {line} - {reason}")]
    BodyParse {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

impl ReaderError {
    pub fn invalid_input(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn header(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::HeaderParse {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn body(path: impl Into<PathBuf>, line: usize, reason: impl Into<String>) -> Self {
        Self::BodyParse {
            path: path.into(),
            line,
            reason: reason.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// File the error is attributed to, when there is one
    pub fn path(&self) -> Option<&std::path::Path> {
        match self {
            Self::InvalidInput { path, .. }
            | Self::List { path, .. }
            | Self::Read { path, .. }
            | Self::HeaderParse { path, .. }
            | Self::BodyParse { path, .. } => Some(path),
            _ => None,
        }
    }

    /// True for the errors raised while reading a selected file's content
    pub fn is_parse_error(&self) -> bool {
        matches!(
            self,
            Self::Read { .. } | Self::HeaderParse { .. } | Self::BodyParse { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, ReaderError>;
