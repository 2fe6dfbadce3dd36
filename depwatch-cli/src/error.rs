//! CLI-specific error types and exit code mapping

use depwatch_core::error::DepwatchError;
use depwatch_lookup::LookupError;

/// CLI-specific error type.
///
/// Each variant carries enough context for a user-friendly message.
/// The `exit_code()` method maps errors to standard Unix exit codes.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration loading or validation failure.
    #[error("configuration error: {0}")]
    Config(String),

    /// A subcommand-specific operation failed.
    #[error("{0}")]
    Command(String),

    /// A repeat lookup was rejected inside the debounce window.
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// The check found vulnerabilities (non-zero exit for CI gating).
    #[error("{0}")]
    Findings(String),

    /// JSON serialisation failed during output rendering.
    #[error("json output error: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    /// IO error (file read, stdout write, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrapped domain error from depwatch-core.
    #[error("{0}")]
    Core(#[from] DepwatchError),

    /// Lookup pipeline domain error.
    #[error("lookup error: {0}")]
    Lookup(String),
}

impl CliError {
    /// Map the error to a process exit code.
    ///
    /// | Code | Meaning                                |
    /// |------|----------------------------------------|
    /// | 0    | Success                                |
    /// | 1    | General / command error                |
    /// | 2    | Configuration error                    |
    /// | 3    | Lookup rejected by the debounce window |
    /// | 4    | Check found vulnerabilities            |
    /// | 10   | IO error                               |
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Core(DepwatchError::Config(_)) => 2,
            Self::RateLimited(_) => 3,
            Self::Findings(_) => 4,
            Self::Io(_) => 10,
            Self::JsonSerialize(_) | Self::Command(_) | Self::Core(_) | Self::Lookup(_) => 1,
        }
    }
}

impl From<LookupError> for CliError {
    fn from(e: LookupError) -> Self {
        match e {
            LookupError::Debounced { .. } => Self::RateLimited(e.to_string()),
            LookupError::Config { .. } => Self::Config(e.to_string()),
            _ => Self::Lookup(e.to_string()),
        }
    }
}
