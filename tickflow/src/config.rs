//! Feed handler configuration.
//!
//! Validated builder for the sizes and placement knobs a launcher
//! needs. Validation happens at construction so the data plane can
//! assume power-of-two capacities.

use crate::constants::{DEFAULT_POOL_SLOTS, DEFAULT_QUEUE_NODES, DEFAULT_RING_CAPACITY};
use crate::error::{FeedError, Result};

#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// SPSC ring capacity (power of 2)
    pub ring_capacity: usize,
    /// MPMC node arena size
    pub queue_nodes: usize,
    /// Object pool slot count
    pub pool_slots: usize,
    /// Back the pool with huge pages when available
    pub use_large_pages: bool,
    /// Pin the producer to this CPU
    pub producer_cpu: Option<usize>,
    /// Pin the consumer to this CPU
    pub consumer_cpu: Option<usize>,
    /// SCHED_FIFO priority for data-plane threads (1..=99)
    pub rt_priority: Option<i32>,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            ring_capacity: DEFAULT_RING_CAPACITY,
            queue_nodes: DEFAULT_QUEUE_NODES,
            pool_slots: DEFAULT_POOL_SLOTS,
            use_large_pages: false,
            producer_cpu: None,
            consumer_cpu: None,
            rt_priority: None,
        }
    }
}

impl FeedConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ring_capacity(mut self, capacity: usize) -> Result<Self> {
        if !capacity.is_power_of_two() || capacity < 2 {
            return Err(FeedError::config("ring capacity must be a power of 2, at least 2"));
        }
        self.ring_capacity = capacity;
        Ok(self)
    }

    pub fn with_queue_nodes(mut self, nodes: usize) -> Result<Self> {
        if nodes < 2 {
            return Err(FeedError::config("queue needs at least 2 nodes"));
        }
        self.queue_nodes = nodes;
        Ok(self)
    }

    pub fn with_pool_slots(mut self, slots: usize) -> Result<Self> {
        if slots == 0 {
            return Err(FeedError::config("pool needs at least one slot"));
        }
        self.pool_slots = slots;
        Ok(self)
    }

    pub fn with_large_pages(mut self, enable: bool) -> Self {
        self.use_large_pages = enable;
        self
    }

    pub fn with_placement(mut self, producer_cpu: usize, consumer_cpu: usize) -> Self {
        self.producer_cpu = Some(producer_cpu);
        self.consumer_cpu = Some(consumer_cpu);
        self
    }

    pub fn with_rt_priority(mut self, priority: i32) -> Result<Self> {
        if !(1..=99).contains(&priority) {
            return Err(FeedError::config("realtime priority outside 1..=99"));
        }
        self.rt_priority = Some(priority);
        Ok(self)
    }
}
