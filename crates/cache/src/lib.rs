//! Key-value caching for the order read path.
//!
//! This crate provides:
//! - [`Cache`] trait for string values with a time-to-live
//! - [`CacheExt`] for storing JSON-encoded values
//! - [`OrderCacheKeys`] naming the entries kept per order
//! - Three backends: [`RedisCache`], [`InMemoryCache`] and [`NullCache`]

pub mod cache;
pub mod error;
pub mod keys;
pub mod memory;
pub mod null;
pub mod redis_cache;

pub use cache::{Cache, CacheExt};
pub use error::{CacheError, Result};
pub use keys::OrderCacheKeys;
pub use memory::InMemoryCache;
pub use null::NullCache;
pub use redis_cache::RedisCache;
