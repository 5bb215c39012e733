//! Shared error types for cleanup operations

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for codesweep operations
#[derive(Debug, Error)]
pub enum Error {
    /// Input path does not exist
    #[error("File not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    /// Dialect syntax error in a source file
    #[error("Parse error in {}:{line}: {message}", file.display())]
    Parse {
        file: PathBuf,
        line: usize,
        message: String,
    },

    /// A modification plan references a nonexistent file or requests an
    /// operation the target dialect does not support
    #[error("Validation error: {0}")]
    Validation(String),

    /// A removal candidate matched a high-risk dynamic usage signature
    #[error("Dynamic usage risk for {element}: {pattern}")]
    DynamicUsageRisk { element: String, pattern: String },

    /// Rollback attempted against a dirty working tree or outside a session
    #[error("Git state error: {0}")]
    GitState(String),

    /// Unknown backup id
    #[error("Backup not found: {0}")]
    BackupNotFound(String),

    /// Unknown checkpoint id
    #[error("Checkpoint not found: {0}")]
    CheckpointNotFound(String),

    /// Backup manager constructed outside a version-controlled directory
    #[error("Not a git repository: {}", path.display())]
    NotAGitRepository { path: PathBuf },

    /// Test suite regression after cleanup
    #[error("Test failure: {0}")]
    TestFailure(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Generic errors with context
    #[error("{context}: {message}")]
    WithContext { context: String, message: String },

    /// Wrapped external errors
    #[error(transparent)]
    External(#[from] anyhow::Error),

    /// IO errors
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON errors
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// Git library errors
    #[error(transparent)]
    Git(#[from] git2::Error),

    /// Pattern errors
    #[error(transparent)]
    Pattern(#[from] glob::PatternError),
}

impl Error {
    /// Create a file-not-found error
    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    /// Create a parse error with location
    pub fn parse(file: impl Into<PathBuf>, line: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            file: file.into(),
            line,
            message: message.into(),
        }
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Self::WithContext {
            context: context.into(),
            message: self.to_string(),
        }
    }
}

/// Result type alias using our error type
pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}
