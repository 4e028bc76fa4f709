use std::path::PathBuf;

/// BinaryRTS error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Configuration or input-format error (fatal at the CLI boundary).
    #[error("config error: {0}")]
    Config(String),

    /// File I/O error
    #[error("io error: {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A covered line falls outside every function of a loaded file.
    #[error("covered line outside of defined functions: {file}:{line}")]
    UncoveredLine { file: String, line: u32 },

    /// The tag extractor subprocess failed or timed out.
    #[error("tag extractor failed: {0}")]
    Extractor(String),

    /// The cross-reference search failed or timed out.
    #[error("cross-reference search failed: {0}")]
    Search(String),

    /// A git diff or show invocation failed.
    #[error("vcs error: {0}")]
    Vcs(String),

    /// Trace or lookup deserialization failed.
    #[error("serialization error: {path}: {message}")]
    Serialize { path: PathBuf, message: String },

    /// Uncaught failure during selection; callers fall back to retest-all.
    #[error("selection failure: {0}")]
    Selection(String),
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type using BinaryRTS Error
pub type Result<T> = std::result::Result<T, Error>;

/// Exit codes per CLI contract.
///
/// A selection that internally fell back to retest-all still exits 0; the
/// fallback is only visible in `selection-causes.txt`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitCode {
    /// Command completed.
    Success = 0,
    /// Compared artifacts differ (`utils compare-traces`).
    Different = 1,
    /// Configuration or argument error
    ConfigError = 2,
    /// Internal error
    InternalError = 3,
}

impl From<&Error> for ExitCode {
    fn from(err: &Error) -> Self {
        match err {
            Error::Config(_) | Error::Serialize { .. } => ExitCode::ConfigError,
            _ => ExitCode::InternalError,
        }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
