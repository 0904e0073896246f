//! Error types for syncstat-cli

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

/// Errors that end the process with a non-zero status
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Failure reported by syncstat-core
    #[error(transparent)]
    Core(#[from] syncstat_core::Error),

    /// Bad invocation or a run that must be reported as failed
    #[error("{message}")]
    User { message: String },
}

impl CliError {
    pub fn user(message: impl Into<String>) -> Self {
        Self::User {
            message: message.into(),
        }
    }
}
