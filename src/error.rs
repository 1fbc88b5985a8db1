//! Error types for pgaudit

use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Process exit code for a successful run.
pub const EXIT_SUCCESS: i32 = 0;

/// Process exit code for usage/argument errors (matches clap).
pub const EXIT_USAGE: i32 = 2;

/// Process exit code for connectivity or authentication failures.
pub const EXIT_CONNECTIVITY: i32 = 3;

/// Process exit code for responses the tool could not interpret.
pub const EXIT_RESPONSE: i32 = 4;

/// Process exit code for anything else.
pub const EXIT_INTERNAL: i32 = 1;

/// Errors that can occur while auditing an array
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid or incomplete command-line input
    #[error("{0}")]
    Usage(String),

    /// Transport failure talking to the array
    #[error("Unable to reach array: {0}")]
    Connection(#[source] reqwest::Error),

    /// The array rejected the supplied credentials
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// The array answered with an unexpected HTTP status
    #[error("Array returned {status} for {endpoint}")]
    ApiStatus { endpoint: String, status: u16 },

    /// The array answered, but the body did not have the expected shape
    #[error("Unexpected response from {endpoint}: {reason}")]
    ResponseShape { endpoint: String, reason: String },

    /// Reading the password from the terminal failed
    #[error("Failed to read password: {0}")]
    PasswordPrompt(#[source] std::io::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// True for failures caused by the network path or the credentials,
    /// as opposed to data the array sent back.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, Error::Connection(_) | Error::Authentication(_))
    }

    /// Exit code the binary reports for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Usage(_) | Error::Config(_) => EXIT_USAGE,
            Error::Connection(_) | Error::Authentication(_) => EXIT_CONNECTIVITY,
            Error::ApiStatus { .. } | Error::ResponseShape { .. } => EXIT_RESPONSE,
            Error::PasswordPrompt(_) | Error::Io(_) | Error::Internal(_) => EXIT_INTERNAL,
        }
    }
}
