use thiserror::Error;

/// Application-wide error types for matchday.
#[derive(Error, Debug)]
pub enum AppError {
    /// The page did not finish loading within the page-load timeout.
    #[error("Navigation to {url} timed out after {secs} seconds")]
    NavigationTimeout { url: String, secs: u64 },

    /// A structural anchor was still absent once the page had loaded.
    #[error("Element not found: {selector}")]
    ElementNotFound { selector: String },

    /// A single table row could not be turned into a record.
    #[error("Row parse error: {0}")]
    RowParse(String),

    /// Every pooled session is leased out.
    #[error("Session pool exhausted")]
    PoolExhausted,

    /// The pool has been shut down.
    #[error("Session pool is shut down")]
    PoolClosed,

    /// The rendering engine reported a failure (launch, CDP, crashed tab).
    #[error("Browser error: {0}")]
    Browser(String),

    /// A CSS selector failed to compile.
    #[error("Invalid selector: {0}")]
    InvalidSelector(String),

    /// A date string did not match the configured format.
    #[error("Invalid date: {0}")]
    InvalidDate(String),

    /// Range start lies after range end.
    #[error("Invalid date range: start {start} is after end {end}")]
    InvalidDateRange { start: String, end: String },

    /// Invalid or missing configuration value.
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic error.
    #[error("{0}")]
    Generic(String),
}

impl AppError {
    /// Returns true if the caller may reasonably retry the same request later.
    ///
    /// Nothing inside the core retries on its own; this only classifies.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AppError::NavigationTimeout { .. } | AppError::Browser(_) | AppError::PoolExhausted
        )
    }
}
