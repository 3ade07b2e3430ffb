//! Lock-free latency histogram.
//!
//! 32 logarithmic buckets: bucket 0 covers [0, 1) µs, bucket `i > 0`
//! covers [2^(i-1), 2^i) µs, capped at bucket 31 (~35 minutes).
//! Recording is a handful of relaxed fetch-adds plus CAS loops for
//! min/max; queries are point-in-time approximations whose precision
//! is the bucket width. Percentiles report the upper bound of the
//! bucket that crosses the target rank.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::constants::CacheAligned;

pub const NUM_BUCKETS: usize = 32;

pub struct LatencyHistogram {
    buckets: CacheAligned<[AtomicU64; NUM_BUCKETS]>,
    total_count: CacheAligned<AtomicU64>,
    min: CacheAligned<AtomicU64>,
    max: CacheAligned<AtomicU64>,
    sum: CacheAligned<AtomicU64>,
}

impl LatencyHistogram {
    pub const fn new() -> Self {
        #[allow(clippy::declare_interior_mutable_const)]
        const ZERO: AtomicU64 = AtomicU64::new(0);
        Self {
            buckets: CacheAligned([ZERO; NUM_BUCKETS]),
            total_count: CacheAligned(AtomicU64::new(0)),
            min: CacheAligned(AtomicU64::new(u64::MAX)),
            max: CacheAligned(AtomicU64::new(0)),
            sum: CacheAligned(AtomicU64::new(0)),
        }
    }

    /// Record one latency sample in nanoseconds. Lock-free.
    #[inline]
    pub fn record(&self, latency_ns: u64) {
        let bucket = Self::bucket_index(latency_ns);
        self.buckets.0[bucket].fetch_add(1, Ordering::Relaxed);
        self.total_count.0.fetch_add(1, Ordering::Relaxed);
        self.sum.0.fetch_add(latency_ns, Ordering::Relaxed);

        self.update_min(latency_ns);
        self.update_max(latency_ns);
    }

    /// Percentile in nanoseconds for `p` in [0.0, 1.0]. Returns the
    /// upper bound of the bucket holding the target rank; 0 when empty.
    pub fn percentile(&self, p: f64) -> u64 {
        let total = self.total_count.0.load(Ordering::Relaxed);
        if total == 0 {
            return 0;
        }

        // Rank is at least 1 so percentile(0.0) lands on the first
        // occupied bucket, keeping min <= percentile(0).
        let target = ((p * total as f64).ceil() as u64).clamp(1, total);

        let mut cumulative = 0u64;
        for i in 0..NUM_BUCKETS {
            cumulative += self.buckets.0[i].load(Ordering::Relaxed);
            if cumulative >= target {
                return Self::bucket_upper_bound(i);
            }
        }
        Self::bucket_upper_bound(NUM_BUCKETS - 1)
    }

    #[inline]
    pub fn p50(&self) -> u64 {
        self.percentile(0.50)
    }

    #[inline]
    pub fn p99(&self) -> u64 {
        self.percentile(0.99)
    }

    #[inline]
    pub fn p999(&self) -> u64 {
        self.percentile(0.999)
    }

    #[inline]
    pub fn p9999(&self) -> u64 {
        self.percentile(0.9999)
    }

    /// Smallest recorded sample; `u64::MAX` before the first record.
    #[inline]
    pub fn min(&self) -> u64 {
        self.min.0.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn max(&self) -> u64 {
        self.max.0.load(Ordering::Relaxed)
    }

    /// Arithmetic mean in nanoseconds; 0 when empty.
    pub fn mean(&self) -> u64 {
        let total = self.total_count.0.load(Ordering::Relaxed);
        if total == 0 {
            return 0;
        }
        self.sum.0.load(Ordering::Relaxed) / total
    }

    /// Coarse spread estimate, (max - min) / 4. Not a real second
    /// moment; good enough to flag a fat tail in a status line.
    pub fn stddev_approx(&self) -> u64 {
        let min = self.min();
        let max = self.max();
        if min > max {
            return 0;
        }
        (max - min) / 4
    }

    #[inline]
    pub fn count(&self) -> u64 {
        self.total_count.0.load(Ordering::Relaxed)
    }

    /// Zero everything. Safe to call concurrently but samples racing
    /// the reset may land on either side.
    pub fn reset(&self) {
        for bucket in &self.buckets.0 {
            bucket.store(0, Ordering::Relaxed);
        }
        self.total_count.0.store(0, Ordering::Relaxed);
        self.min.0.store(u64::MAX, Ordering::Relaxed);
        self.max.0.store(0, Ordering::Relaxed);
        self.sum.0.store(0, Ordering::Relaxed);
    }

    #[inline]
    fn bucket_index(latency_ns: u64) -> usize {
        let latency_us = latency_ns / 1000;
        if latency_us == 0 {
            return 0;
        }
        // floor(log2(us)) + 1, saturated at the last bucket.
        ((64 - latency_us.leading_zeros()) as usize).min(NUM_BUCKETS - 1)
    }

    /// Upper bound of a bucket in nanoseconds: 1 µs for bucket 0,
    /// 2^i µs for bucket i.
    #[inline]
    pub fn bucket_upper_bound(bucket: usize) -> u64 {
        if bucket == 0 {
            return 1_000;
        }
        (1u64 << bucket) * 1_000
    }

    fn update_min(&self, value: u64) {
        let mut current = self.min.0.load(Ordering::Relaxed);
        while value < current {
            match self.min.0.compare_exchange_weak(
                current,
                value,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(observed) => current = observed,
            }
        }
    }

    fn update_max(&self, value: u64) {
        let mut current = self.max.0.load(Ordering::Relaxed);
        while value > current {
            match self.max.0.compare_exchange_weak(
                current,
                value,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(observed) => current = observed,
            }
        }
    }
}

impl Default for LatencyHistogram {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_boundaries() {
        assert_eq!(LatencyHistogram::bucket_index(0), 0);
        assert_eq!(LatencyHistogram::bucket_index(999), 0);
        assert_eq!(LatencyHistogram::bucket_index(1_000), 1); // 1us -> [1,2)
        assert_eq!(LatencyHistogram::bucket_index(1_999), 1);
        assert_eq!(LatencyHistogram::bucket_index(2_000), 2); // 2us -> [2,4)
        assert_eq!(LatencyHistogram::bucket_index(3_999), 2);
        assert_eq!(LatencyHistogram::bucket_index(4_000), 3);
        assert_eq!(LatencyHistogram::bucket_index(u64::MAX), NUM_BUCKETS - 1);

        assert_eq!(LatencyHistogram::bucket_upper_bound(0), 1_000);
        assert_eq!(LatencyHistogram::bucket_upper_bound(1), 2_000);
        assert_eq!(LatencyHistogram::bucket_upper_bound(5), 32_000);
    }

    #[test]
    fn test_min_max_mean_count() {
        let hist = LatencyHistogram::new();
        assert_eq!(hist.count(), 0);
        assert_eq!(hist.mean(), 0);

        hist.record(1_000);
        hist.record(3_000);
        hist.record(5_000);

        assert_eq!(hist.count(), 3);
        assert_eq!(hist.min(), 1_000);
        assert_eq!(hist.max(), 5_000);
        assert_eq!(hist.mean(), 3_000);
        assert!(hist.min() <= hist.mean() && hist.mean() <= hist.max());
    }

    #[test]
    fn test_bucket_sum_equals_count() {
        let hist = LatencyHistogram::new();
        for i in 0..10_000u64 {
            hist.record(i * 37 % 2_000_000);
        }
        let bucket_sum: u64 = (0..NUM_BUCKETS)
            .map(|i| hist.buckets.0[i].load(Ordering::Relaxed))
            .sum();
        assert_eq!(bucket_sum, hist.count());
    }

    #[test]
    fn test_uniform_percentiles() {
        let hist = LatencyHistogram::new();
        // 1_000_000 samples uniform over 1..=100 us.
        for i in 0..1_000_000u64 {
            let us = (i % 100) + 1;
            hist.record(us * 1_000);
        }

        assert_eq!(hist.count(), 1_000_000);
        assert_eq!(hist.min(), 1_000);

        // Median of uniform 1..100us sits in bucket [32,64) or [64,128);
        // report is the bucket upper bound.
        let p50 = hist.p50();
        assert!(
            p50 == 64_000 || p50 == 128_000,
            "p50 upper bound out of range: {p50}"
        );

        let p99 = hist.p99();
        assert_eq!(p99, 128_000);
    }

    #[test]
    fn test_percentile_monotonicity() {
        let hist = LatencyHistogram::new();
        for i in 1..=1_000u64 {
            hist.record(i * 773);
        }

        let ps = [0.0, 0.1, 0.25, 0.5, 0.75, 0.9, 0.99, 0.999, 1.0];
        for pair in ps.windows(2) {
            assert!(
                hist.percentile(pair[0]) <= hist.percentile(pair[1]),
                "percentile({}) > percentile({})",
                pair[0],
                pair[1]
            );
        }
        assert!(hist.min() <= hist.percentile(0.0));
        assert!(hist.percentile(1.0) >= hist.max() || {
            // Upper bound of the max's bucket is >= max by construction.
            let b = LatencyHistogram::bucket_index(hist.max());
            hist.percentile(1.0) == LatencyHistogram::bucket_upper_bound(b)
        });
    }

    #[test]
    fn test_reset() {
        let hist = LatencyHistogram::new();
        hist.record(5_000);
        hist.reset();
        assert_eq!(hist.count(), 0);
        assert_eq!(hist.min(), u64::MAX);
        assert_eq!(hist.max(), 0);
        assert_eq!(hist.mean(), 0);
        assert_eq!(hist.percentile(0.5), 0);
    }

    #[test]
    fn test_stddev_approx() {
        let hist = LatencyHistogram::new();
        assert_eq!(hist.stddev_approx(), 0);
        hist.record(1_000);
        hist.record(9_000);
        assert_eq!(hist.stddev_approx(), 2_000);
    }

    #[test]
    fn test_concurrent_record() {
        use std::sync::Arc;
        let hist = Arc::new(LatencyHistogram::new());
        let mut handles = vec![];
        for t in 0..4u64 {
            let hist = hist.clone();
            handles.push(std::thread::spawn(move || {
                for i in 0..50_000u64 {
                    hist.record((t * 50_000 + i) % 1_000_000);
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(hist.count(), 200_000);
        let bucket_sum: u64 = (0..NUM_BUCKETS)
            .map(|i| hist.buckets.0[i].load(Ordering::Relaxed))
            .sum();
        assert_eq!(bucket_sum, hist.count());
    }
}
