use thiserror::Error;

/// Application-wide error types for Folio.
#[derive(Error, Debug)]
pub enum AppError {
    /// Server answered with a non-success status.
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// Network/connection error.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Request or element wait timed out.
    #[error("Timed out after {0} seconds")]
    Timeout(u64),

    /// One item (or one page) did not have the expected shape.
    #[error("Extraction error: {0}")]
    ExtractionError(String),

    /// The browser session could not be started or driven.
    #[error("Browser error: {0}")]
    BrowserError(String),

    /// JSON serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Writing the output file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error.
    #[error("{0}")]
    Generic(String),
}

impl AppError {
    /// Returns true if the failure happened before any content was obtained.
    ///
    /// Used to pick the log level: fetch failures are expected on flaky
    /// sites, while extraction failures point at a layout change.
    pub fn is_fetch_failure(&self) -> bool {
        matches!(
            self,
            AppError::HttpError(_)
                | AppError::NetworkError(_)
                | AppError::Timeout(_)
                | AppError::BrowserError(_)
        )
    }
}
