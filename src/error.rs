//! Error types for musdex
//!
//! Every fallible operation in the crate returns [`Result`], whose error side
//! is [`MusdexError`]. Some variants only affect a single archive (an `add`
//! of a file that is not a zip, an archive that is already configured); the
//! rest abort the running command.

use std::path::PathBuf;
use thiserror::Error;

/// Type alias for Results in the musdex library
pub type Result<T> = std::result::Result<T, MusdexError>;

/// Main error type for all musdex operations
#[derive(Debug, Error)]
pub enum MusdexError {
    /// I/O errors during file operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// I/O error tied to a specific path
    #[error("Cannot access {path:?}: {source}")]
    FileAccess {
        /// Path that failed
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Errors reading or writing YAML documents
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Errors raised by the zip reader or writer
    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// A post-extract regular expression failed to compile
    #[error("Invalid post-extract pattern: {0}")]
    InvalidPattern(String),

    /// The file is not readable by the selected handler
    #[error("Not an archive supported by handler '{handler}': {path:?}")]
    NotAnArchive {
        /// Archive path
        path: PathBuf,
        /// Handler that rejected it
        handler: String,
    },

    /// `add` was asked to track an archive that is already tracked
    #[error("Archive already configured: {0:?}")]
    ArchiveAlreadyConfigured(PathBuf),

    /// `remove` was asked to drop an archive that is not tracked
    #[error("Archive not configured: {0:?}")]
    ArchiveNotConfigured(PathBuf),

    /// `remove` ran against an empty configuration
    #[error("No archives have been configured")]
    NoArchivesConfigured,

    /// An external version-control command exited unsuccessfully
    #[error("VCS command failed: `{command}` (exit code: {code:?}){}", format_stderr(.stderr))]
    VcsCommandFailed {
        /// Full command line that was run
        command: String,
        /// Exit code, if the process exited normally
        code: Option<i32>,
        /// Captured standard error
        stderr: String,
    },

    /// A VCS command template has no program in it
    #[error("VCS command template for '{0}' is empty")]
    VcsCommandEmpty(&'static str),

    /// No handler registered under the requested name
    #[error("Archive handler not found: {0}")]
    HandlerNotFound(String),

    /// No formatter registered under the requested name
    #[error("Formatter not found: {0}")]
    FormatterNotFound(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// An absolute path given on the command line lies outside the working tree
    #[error("Path {path:?} is outside of the working tree {root:?}")]
    PathOutsideRoot {
        /// Offending path
        path: PathBuf,
        /// Working tree root
        root: PathBuf,
    },

    /// Generic error for unexpected conditions
    #[error("Internal error: {0}")]
    Internal(String),
}

fn format_stderr(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(": {}", trimmed)
    }
}

impl From<regex::Error> for MusdexError {
    fn from(err: regex::Error) -> Self {
        MusdexError::InvalidPattern(err.to_string())
    }
}

impl MusdexError {
    /// Wrap an I/O error with the path it concerns
    pub fn file_access(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        MusdexError::FileAccess {
            path: path.into(),
            source,
        }
    }

    /// Create an internal error with a custom message
    pub fn internal(msg: impl Into<String>) -> Self {
        MusdexError::Internal(msg.into())
    }

    /// Create a configuration error with a custom message
    pub fn invalid_configuration(msg: impl Into<String>) -> Self {
        MusdexError::InvalidConfiguration(msg.into())
    }

    /// Whether this error must abort the whole command
    ///
    /// Per-archive problems during `add`/`remove` are reported and the
    /// command moves on to the next archive.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            MusdexError::NotAnArchive { .. }
                | MusdexError::ArchiveAlreadyConfigured(_)
                | MusdexError::ArchiveNotConfigured(_)
        )
    }

    /// Get a user-friendly error message with suggestions
    pub fn user_message(&self) -> String {
        match self {
            MusdexError::HandlerNotFound(name) => {
                format!(
                    "No archive handler named '{}'. The built-in handler is 'zip'.",
                    name
                )
            }
            MusdexError::FormatterNotFound(name) => {
                format!(
                    "No formatter named '{}'. Built-in formatters are 'xmllint' and 'removecrs'.",
                    name
                )
            }
            MusdexError::VcsCommandFailed { command, .. } => {
                format!(
                    "{}\nCheck the vcs_add / vcs_remove / vcs_show_files settings if `{}` is not right for your repository.",
                    self, command
                )
            }
            MusdexError::NoArchivesConfigured => {
                "No archives have been configured. Use 'musdex add <archive>' first.".to_string()
            }
            _ => self.to_string(),
        }
    }
}
