//! In-memory result cache bounded by memory pressure.
//!
//! - `store` - the keyed [`ResultCache`] with LRU compaction
//! - `pressure` - the [`MemoryPressure`] signal the cache subscribes to

mod pressure;
mod store;

pub use pressure::{MemoryPressure, PressureLevel, PressureListener, Subscription};
pub use store::{CacheOptions, CacheStats, ResultCache, DEFAULT_COMPACTION_RATIO};
