use thiserror::Error;

/// Storage-specific error types for the measurement log.
#[derive(Debug, Error)]
pub enum StorageError {
    /// File system operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Record encoding or decoding failed
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A file does not carry the expected header row
    #[error("Unexpected log header: {0}")]
    InvalidHeader(String),

    /// A record field could not be interpreted
    #[error("Invalid record at line {line}: {message}")]
    InvalidRecord { line: u64, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Specialized result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
