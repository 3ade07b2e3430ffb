//! Tickflow - lock-free market data feed handler core.
//!
//! The in-process data plane that moves normalized market events from
//! feed ingesters to strategy callbacks with bounded, measurable tail
//! latency. Nothing on the hot path blocks, allocates, or takes a lock.
//!
//! ## Subsystems
//!
//! | Module | Responsibility | Progress guarantee |
//! |--------|----------------|--------------------|
//! | `event` | 64-byte normalized `MarketEvent` record | — |
//! | `queue::spsc` | Bounded ring, one producer / one consumer | wait-free |
//! | `queue::mpmc` | Michael–Scott queue over a bounded node arena | lock-free |
//! | `pool` | Fixed slab of cache-line slots | lock-free |
//! | `hist` | Logarithmic latency histogram with percentiles | lock-free |
//! | `metrics` | Counter + histogram bundle | wait-free |
//! | `cpu` | Core pinning, SCHED_FIFO, isolated-core discovery | — |
//! | `time` | Cycle counter and one-time TSC calibration | — |
//! | `parser` | Demonstration wire-format parsers | — |
//!
//! ## Failure model
//!
//! Hot-path operations are total: `try_push`/`try_enqueue` return `false`
//! on capacity exhaustion, `try_pop`/`try_dequeue`/`allocate` return
//! `None` when empty or exhausted. Construction may fail loudly with
//! [`FeedError`]; after that, errors are counters, not exceptions.
//!
//! Call [`time::calibrate`] once at startup, before recording latencies
//! and before spawning data-plane threads.

pub mod config;
pub mod constants;
pub mod cpu;
pub mod error;
pub mod event;
pub mod hist;
pub mod metrics;
pub mod observe;
pub mod parser;
pub mod pool;
pub mod queue;
pub mod time;

pub use config::FeedConfig;
pub use constants::CACHE_LINE_SIZE;
pub use error::{FeedError, Result};
pub use event::{EventType, MarketEvent, Side, Symbol, PRICE_SCALE};
pub use hist::LatencyHistogram;
pub use metrics::{FeedMetrics, MetricsSnapshot};
pub use parser::{BinaryParser, FixParser, ParseError, Parser};
pub use pool::ObjectPool;
pub use queue::{mpmc::MpmcQueue, spsc::SpscRing, Backoff};
