use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    // Input validation errors
    #[error("Invalid axis index: {0} (expected 0-3)")]
    InvalidAxisIndex(String),

    #[error("Axis selection must not be empty")]
    EmptyAxisSelection,

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    // Wire format errors
    #[error("Invalid message format: {0}")]
    InvalidMessageFormat(String),

    #[error("Invalid command code: 0x{0:04X}")]
    InvalidCommandCode(u16),

    #[error("Invalid header magic: expected 0x{expected:04X}, got 0x{actual:04X}")]
    InvalidMagic { expected: u16, actual: u16 },

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;
