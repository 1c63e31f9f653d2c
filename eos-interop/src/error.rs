//! Error type for conditions this layer reports itself.
//!
//! Failures reported by the native SDK are not errors here: they come back as
//! [`ResultCode`](crate::ResultCode) values and the caller branches on them.
//! Contract violations (encoding a released handle, text with an interior
//! NUL) panic instead of returning.

use thiserror::Error;

/// Result type alias for eos-interop operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// The tracked native allocator could not satisfy a request while
    /// building a native structure.
    #[error("native allocation of {size} bytes failed")]
    OutOfMemory { size: usize },

    /// The EOS shared library could not be opened.
    #[error("failed to load native library: {0}")]
    Load(#[from] libloading::Error),

    /// The EOS shared library does not export an expected entry point.
    #[error("native library is missing symbol {symbol}: {source}")]
    MissingSymbol {
        symbol: &'static str,
        source: libloading::Error,
    },

    /// A configuration file parsed but holds unusable values.
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("config I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Check if this is an allocation failure.
    pub fn is_out_of_memory(&self) -> bool {
        matches!(self, Error::OutOfMemory { .. })
    }
}
