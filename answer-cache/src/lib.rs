pub mod keys;
pub mod service;
pub mod store;

pub use service::{CacheService, CacheServiceStats, ResponseHit};
pub use store::{CacheStats, TtlLruCache};
