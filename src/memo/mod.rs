pub mod lru;

pub use lru::{CacheStats, LruCache};
