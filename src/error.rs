use std::io;
use thiserror::Error;

/// Error type for dialect detection and tokenization.
#[derive(Error, Debug)]
pub enum SnifferError {
    /// IO error while pulling characters from the source.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// The reader was asked to rewind after its replay history was dropped.
    #[error("Cannot rewind: {discarded} buffered characters were already discarded")]
    RewindUnavailable {
        /// Number of characters that were read and then released.
        discarded: usize,
    },

    /// Empty file or no data.
    #[error("Empty file or no data to analyze")]
    EmptyData,

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Tokenization was cancelled by the caller.
    #[error("Operation cancelled")]
    Cancelled,
}

/// Result type alias for sniffing operations.
pub type Result<T> = std::result::Result<T, SnifferError>;
