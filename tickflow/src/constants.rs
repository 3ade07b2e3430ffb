//! Tickflow performance constants.
//!
//! Core constants shared by the queues, the object pool and the metrics
//! bundle.

/// Cache line size for alignment (64 bytes on current x86-64 and most ARM)
pub const CACHE_LINE_SIZE: usize = 64;

/// Default SPSC ring capacity (must be power of 2)
pub const DEFAULT_RING_CAPACITY: usize = 1024 * 1024; // 1M events

/// Default MPMC node arena size
pub const DEFAULT_QUEUE_NODES: usize = 1024 * 1024;

/// Default object pool slot count
pub const DEFAULT_POOL_SLOTS: usize = 1024 * 1024;

/// Huge page size used for large-page pool backing (2MB)
pub const HUGE_PAGE_SIZE: usize = 2 * 1024 * 1024;

/// CAS backoff doubles up to 2^MAX_BACKOFF_EXP pause iterations, then yields
pub const MAX_BACKOFF_EXP: u32 = 10;

/// Ring high watermark default: 90% of capacity
pub const HIGH_WATERMARK_PCT: usize = 90;

/// Ring low watermark default: 10% of capacity
pub const LOW_WATERMARK_PCT: usize = 10;

/// Pads its contents out to a dedicated cache line so that unrelated
/// atomics never share coherence traffic.
#[repr(align(64))]
#[derive(Debug, Default)]
pub struct CacheAligned<T>(pub T);
