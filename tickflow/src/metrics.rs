//! Metrics bundle for the feed handler.
//!
//! Atomic counters plus the three stage histograms, each counter on its
//! own cache line. Snapshots are independent relaxed loads and are not
//! atomic across counters.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::constants::CacheAligned;
use crate::hist::LatencyHistogram;

pub struct FeedMetrics {
    pub messages_received: CacheAligned<AtomicU64>,
    pub messages_processed: CacheAligned<AtomicU64>,
    pub messages_dropped: CacheAligned<AtomicU64>,
    pub parse_errors: CacheAligned<AtomicU64>,
    pub sequence_gaps: CacheAligned<AtomicU64>,
    pub queue_full_events: CacheAligned<AtomicU64>,

    pub end_to_end_latency: LatencyHistogram,
    pub parse_latency: LatencyHistogram,
    pub queue_latency: LatencyHistogram,
}

impl FeedMetrics {
    pub const fn new() -> Self {
        Self {
            messages_received: CacheAligned(AtomicU64::new(0)),
            messages_processed: CacheAligned(AtomicU64::new(0)),
            messages_dropped: CacheAligned(AtomicU64::new(0)),
            parse_errors: CacheAligned(AtomicU64::new(0)),
            sequence_gaps: CacheAligned(AtomicU64::new(0)),
            queue_full_events: CacheAligned(AtomicU64::new(0)),
            end_to_end_latency: LatencyHistogram::new(),
            parse_latency: LatencyHistogram::new(),
            queue_latency: LatencyHistogram::new(),
        }
    }

    #[inline]
    pub fn record_message_received(&self) {
        self.messages_received.0.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_message_processed(&self) {
        self.messages_processed.0.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_message_dropped(&self) {
        self.messages_dropped.0.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_parse_error(&self) {
        self.parse_errors.0.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_sequence_gap(&self) {
        self.sequence_gaps.0.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_queue_full(&self) {
        self.queue_full_events.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            messages_received: self.messages_received.0.load(Ordering::Relaxed),
            messages_processed: self.messages_processed.0.load(Ordering::Relaxed),
            messages_dropped: self.messages_dropped.0.load(Ordering::Relaxed),
            parse_errors: self.parse_errors.0.load(Ordering::Relaxed),
            sequence_gaps: self.sequence_gaps.0.load(Ordering::Relaxed),
            queue_full_events: self.queue_full_events.0.load(Ordering::Relaxed),
        }
    }

    /// Zero counters and histograms. Idempotent; meant for tests and
    /// between measurement windows, not for concurrent hot use.
    pub fn reset(&self) {
        self.messages_received.0.store(0, Ordering::Relaxed);
        self.messages_processed.0.store(0, Ordering::Relaxed);
        self.messages_dropped.0.store(0, Ordering::Relaxed);
        self.parse_errors.0.store(0, Ordering::Relaxed);
        self.sequence_gaps.0.store(0, Ordering::Relaxed);
        self.queue_full_events.0.store(0, Ordering::Relaxed);

        self.end_to_end_latency.reset();
        self.parse_latency.reset();
        self.queue_latency.reset();
    }
}

impl Default for FeedMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub messages_received: u64,
    pub messages_processed: u64,
    pub messages_dropped: u64,
    pub parse_errors: u64,
    pub sequence_gaps: u64,
    pub queue_full_events: u64,
}

impl std::fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "rx={} proc={} drop={} parse_err={} gaps={} q_full={}",
            self.messages_received,
            self.messages_processed,
            self.messages_dropped,
            self.parse_errors,
            self.sequence_gaps,
            self.queue_full_events
        )
    }
}
