//! Cache Module
//!
//! Provides the expiring, versioned cache of remote reads.

mod entry;
mod stats;
mod store;


// Re-export public types
pub use entry::CacheEntry;
pub use stats::CacheStats;
pub use store::{CacheStore, SharedCache, INITIAL_VERSION};

// == Public Constants ==
/// Default freshness window of a cached read (15 minutes)
pub const DEFAULT_TTL_SECS: u64 = 15 * 60;
