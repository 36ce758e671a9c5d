//! Error taxonomy for submissions and the remote spreadsheet backend

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Why a submission (or a supporting command) failed.
///
/// A duplicate student id is not an error; it is reported through
/// [`crate::models::Outcome::RejectedDuplicate`].
#[derive(Debug, Error)]
pub enum Error {
    /// Credentials could not be read, were rejected, or lack access to the document
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// The spreadsheet or the selected worksheet does not exist
    #[error("Worksheet not found: {0}")]
    WorksheetNotFound(String),

    /// Transport failure or timeout on a remote call
    #[error("Network error: {0}")]
    Network(String),

    /// Remote API answered with an unexpected status
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    /// A cell write failed after earlier cells of the same row were written
    #[error("Row {row} partially written ({written} of 4 cells): {source}")]
    PartialWrite {
        row: u32,
        written: u32,
        #[source]
        source: Box<Error>,
    },

    /// Local audit log could not be written
    #[error("Failed to write audit log: {0}")]
    LogWrite(#[source] std::io::Error),

    /// Local audit log exists but could not be read back
    #[error("Failed to read audit log: {0}")]
    LogRead(#[source] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// True for failures where the same call might succeed later. Nothing retries on this;
    /// it only informs the message shown to the operator.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Network(_) => true,
            Error::Api { status, .. } => *status == 429 || *status >= 500,
            Error::PartialWrite { source, .. } => source.is_transient(),
            _ => false,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Network(err.to_string())
    }
}
