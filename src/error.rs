use std::io;
use thiserror::Error;

/// Errors produced while loading or evaluating a RecSplit index or XorFilter8.
#[derive(Error, Debug)]
pub enum RecSplitError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// The `alternative` header bit was set, an MSML `len` exceeded `MAX_SIZE`,
    /// or a residual bit-count field was out of its valid range.
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// A read would require bits beyond the end of the buffer.
    #[error("truncated input: need bit {needed}, buffer holds {available} bits")]
    Truncated { needed: u64, available: u64 },

    /// `readEliasDelta` hit end of buffer before finding a terminating unary
    /// bit, or the decoded value would be zero.
    #[error("invalid encoding: {0}")]
    InvalidEncoding(String),
}

pub type Result<T> = std::result::Result<T, RecSplitError>;
