use thiserror::Error;

use crate::constants::{
    MECAB_BRIDGE_ERR_INITIALIZATION, MECAB_BRIDGE_ERR_INVALID_ARGUMENT,
    MECAB_BRIDGE_ERR_INVALID_HANDLE, MECAB_BRIDGE_ERR_IO, MECAB_BRIDGE_ERR_LIBRARY,
    MECAB_BRIDGE_ERR_PARSE,
};

/// Error type returned by mecab-bridge public APIs.
#[derive(Debug, Error)]
pub enum MecabError {
    /// Dynamic library could not be loaded.
    #[error("failed to load library: {0}")]
    LibraryLoad(String),
    /// Required symbol could not be resolved from the library.
    #[error("failed to load symbol: {0}")]
    SymbolLoad(String),
    /// Rust string contained an interior `NUL` byte for C interop.
    #[error("string contains NUL byte: {0}")]
    NulByte(#[from] std::ffi::NulError),
    /// User-provided arguments were invalid.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// Dictionary or runtime configuration was rejected while creating a tagger.
    #[error("initialization error: {0}")]
    Initialization(String),
    /// Operation attempted on a null, never-issued, or disposed handle.
    #[error("invalid handle: {0}")]
    InvalidHandle(String),
    /// The tagger reported a failure while tokenizing.
    #[error("parse error: {0}")]
    Parse(String),
    /// A serialized result line did not match `<surface>: <feature>`.
    #[error("malformed result line: {0}")]
    MalformedLine(String),
    /// Filesystem error while preparing a dictionary directory.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl MecabError {
    /// Status code reported across the C boundary for this error.
    pub fn status_code(&self) -> i32 {
        match self {
            MecabError::LibraryLoad(_) | MecabError::SymbolLoad(_) => MECAB_BRIDGE_ERR_LIBRARY,
            MecabError::NulByte(_) | MecabError::InvalidArgument(_) => {
                MECAB_BRIDGE_ERR_INVALID_ARGUMENT
            }
            MecabError::Initialization(_) => MECAB_BRIDGE_ERR_INITIALIZATION,
            MecabError::InvalidHandle(_) => MECAB_BRIDGE_ERR_INVALID_HANDLE,
            MecabError::Parse(_) | MecabError::MalformedLine(_) => MECAB_BRIDGE_ERR_PARSE,
            MecabError::Io(_) => MECAB_BRIDGE_ERR_IO,
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, MecabError>;
