//! Observability shims. Zero-cost when the `tracing` feature is off.
//!
//! The data plane itself never logs; these hooks are for the edges
//! (ingest loops, reporters) that want spans without paying for them
//! in default builds. Enable with:
//!
//! ```toml
//! tickflow = { version = "0.1", features = ["tracing"] }
//! ```
//!
//! and install a subscriber in the binary
//! (`tracing_subscriber::fmt::init()`).

/// Record a published event batch.
#[cfg(feature = "tracing")]
#[inline]
pub fn record_publish(count: u64) {
    let _span = tracing::trace_span!("publish", count).entered();
}

#[cfg(not(feature = "tracing"))]
#[inline(always)]
pub fn record_publish(_count: u64) {}

/// Record a consumed event batch.
#[cfg(feature = "tracing")]
#[inline]
pub fn record_consume(count: u64) {
    let _span = tracing::trace_span!("consume", count).entered();
}

#[cfg(not(feature = "tracing"))]
#[inline(always)]
pub fn record_consume(_count: u64) {}

/// Record backpressure (ring or arena full).
#[cfg(feature = "tracing")]
#[inline]
pub fn record_backpressure() {
    let _span = tracing::warn_span!("backpressure").entered();
}

#[cfg(not(feature = "tracing"))]
#[inline(always)]
pub fn record_backpressure() {}

/// Record a detected sequence gap.
#[cfg(feature = "tracing")]
#[inline]
pub fn record_gap(expected: u64, observed: u64) {
    let _span = tracing::warn_span!("sequence_gap", expected, observed).entered();
}

#[cfg(not(feature = "tracing"))]
#[inline(always)]
pub fn record_gap(_expected: u64, _observed: u64) {}
