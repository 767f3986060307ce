//! Cache error types.

use thiserror::Error;

/// Errors returned by cache backends.
///
/// Callers on the read path treat every variant as a miss.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The Redis client reported an error.
    #[error("Redis error: {0}")]
    Backend(#[from] redis::RedisError),

    /// A cached value could not be encoded or decoded.
    #[error("Cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The backend cannot be reached.
    #[error("Cache unavailable: {0}")]
    Unavailable(String),
}

/// Result type for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;
