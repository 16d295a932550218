//! Global error handling for treedoc
//!
//! Fatal, run-terminating failures are represented by [`TreeDocError`].
//! Non-fatal, per-entry problems are not errors at this level: they travel as
//! [`crate::types::PipelineError`] records on the error channel.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Global error type for treedoc operations
#[derive(Error, Debug)]
pub enum TreeDocError {
    /// File system errors without a more specific classification
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// The scan root is missing, unreadable or not a directory
    #[error("Cannot read root directory {}: {source}", .path.display())]
    RootUnreadable {
        /// Root path as given by the caller
        path: PathBuf,
        /// Underlying cause
        #[source]
        source: io::Error,
    },

    /// The output artifact could not be written
    #[error("Cannot write output document {}: {source}", .path.display())]
    DestinationUnwritable {
        /// Destination path of the artifact
        path: PathBuf,
        /// Underlying cause
        #[source]
        source: io::Error,
    },

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// The run was stopped through its cancellation token
    #[error("Operation was cancelled")]
    Cancelled,

    /// A pipeline worker thread failed
    #[error("Worker error: {0}")]
    Worker(String),

    /// Unexpected error
    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

/// Specialized Result type for treedoc operations
pub type Result<T> = std::result::Result<T, TreeDocError>;

impl TreeDocError {
    /// Wrap an I/O failure on the scan root
    pub fn root(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::RootUnreadable {
            path: path.into(),
            source,
        }
    }

    /// Wrap an I/O failure on the output artifact
    pub fn destination(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::DestinationUnwritable {
            path: path.into(),
            source,
        }
    }

    /// Whether this error was caused by cancellation rather than a failure
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Creates a TreeDocError with a formatted message
#[macro_export]
macro_rules! error {
    ($error_type:ident, $($arg:tt)*) => {
        $crate::error::TreeDocError::$error_type(format!($($arg)*))
    };
}

/// Returns an error result with a formatted message
#[macro_export]
macro_rules! bail {
    ($error_type:ident, $($arg:tt)*) => {
        return Err($crate::error!($error_type, $($arg)*))
    };
}

/// Ensures a condition is true, otherwise returns an error
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $error_type:ident, $($arg:tt)*) => {
        if !($cond) {
            $crate::bail!($error_type, $($arg)*)
        }
    };
}

/// Extension trait for adding context to errors
pub trait ResultExt<T, E> {
    /// Add additional context to an error
    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: std::fmt::Display;
}

impl<T, E: std::error::Error + 'static> ResultExt<T, E> for std::result::Result<T, E> {
    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: std::fmt::Display,
    {
        self.map_err(|e| {
            let context = f();
            TreeDocError::Unexpected(format!("{}: {}", context, e))
        })
    }
}

// main() reports through io::Result
impl From<TreeDocError> for io::Error {
    fn from(err: TreeDocError) -> Self {
        match err {
            TreeDocError::Io(e) => e,
            other => io::Error::new(io::ErrorKind::Other, other.to_string()),
        }
    }
}
