//! Data layer
//!
//! - `cache` - cache store, read-through caching, invalidation and rate limiting
//! - `store` - in-process repository implementations
//! - `traits` - repository traits the domain services depend on
//! - `types` - row and insert types
//! - `error` - repository error type

pub mod cache;
pub mod error;
pub mod store;
pub mod traits;
pub mod types;

pub use error::DataError;
pub use store::MemoryStore;
