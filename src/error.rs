use std::fmt;
use std::time::Duration;

/// Error type for compression operations
#[derive(Debug)]
pub enum CompressError {
    /// Missing/empty source file, unreadable bounds or a zero byte budget
    InvalidInput(String),
    /// The bitmap could not be decoded or re-encoded
    Decode(String),
    /// The compress cache root could not be created
    CacheDir(std::io::Error),
    /// The blocking bridge gave up waiting for the worker
    Timeout(Duration),
}

impl fmt::Display for CompressError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompressError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            CompressError::Decode(msg) => write!(f, "Decode error: {}", msg),
            CompressError::CacheDir(e) => write!(f, "Compress cache unavailable: {}", e),
            CompressError::Timeout(d) => write!(f, "Compression timed out after {:?}", d),
        }
    }
}

impl std::error::Error for CompressError {}

/// Error type for media store operations
#[derive(Debug)]
pub enum StoreError {
    Query(rusqlite::Error),
    Io(std::io::Error),
    Unavailable(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Query(e) => write!(f, "Store query error: {}", e),
            StoreError::Io(e) => write!(f, "Store IO error: {}", e),
            StoreError::Unavailable(msg) => write!(f, "Store unavailable: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Query(err)
    }
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Io(err)
    }
}

/// Error type for media entity construction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaError {
    MissingId,
    MissingPath,
}

impl fmt::Display for MediaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaError::MissingId => write!(f, "media item requires a non-empty id"),
            MediaError::MissingPath => write!(f, "media item requires a non-empty path"),
        }
    }
}

impl std::error::Error for MediaError {}
