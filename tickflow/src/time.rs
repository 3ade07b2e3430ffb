//! Cycle counter and TSC calibration.
//!
//! `cycles_now()` reads the per-core cycle counter (`rdtscp` on x86-64,
//! the virtual counter on aarch64). [`calibrate`] measures the counter
//! frequency once against a monotonic 100 ms window; the result is a
//! process-wide value that is immutable after init. Calibrate before
//! recording any latency and before spawning data-plane threads.

use std::sync::OnceLock;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

static CYCLES_PER_SEC: OnceLock<u64> = OnceLock::new();

/// Used when conversions run before calibration; precision is degraded
/// but nothing panics.
const FALLBACK_CYCLES_PER_SEC: u64 = 3_000_000_000;

const CALIBRATION_WINDOW: Duration = Duration::from_millis(100);

/// Read the cycle counter.
#[inline(always)]
pub fn cycles_now() -> u64 {
    #[cfg(target_arch = "x86_64")]
    unsafe {
        let mut aux = 0u32;
        core::arch::x86_64::__rdtscp(&mut aux as *mut u32)
    }

    #[cfg(target_arch = "aarch64")]
    unsafe {
        let v: u64;
        core::arch::asm!("mrs {v}, cntvct_el0", v = out(reg) v, options(nomem, nostack));
        v
    }

    #[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
    {
        // Monotonic nanoseconds double as "cycles" at 1 GHz.
        monotonic_ns()
    }
}

#[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
fn monotonic_ns() -> u64 {
    static EPOCH: OnceLock<Instant> = OnceLock::new();
    EPOCH.get_or_init(Instant::now).elapsed().as_nanos() as u64
}

/// Calibrate the counter frequency. Idempotent; the first caller pays
/// the ~100 ms sleep, later callers get the stored value.
pub fn calibrate() -> u64 {
    *CYCLES_PER_SEC.get_or_init(|| {
        let start_wall = Instant::now();
        let start_cycles = cycles_now();

        std::thread::sleep(CALIBRATION_WINDOW);

        let elapsed_ns = start_wall.elapsed().as_nanos() as u64;
        let cycle_delta = cycles_now().wrapping_sub(start_cycles);

        // An interrupted sleep shortens the window; the measured ratio
        // is still used as-is.
        if elapsed_ns == 0 {
            return FALLBACK_CYCLES_PER_SEC;
        }
        ((cycle_delta as u128 * 1_000_000_000) / elapsed_ns as u128) as u64
    })
}

/// Counter frequency in Hz (fallback value if [`calibrate`] never ran).
#[inline]
pub fn cycles_per_second() -> u64 {
    *CYCLES_PER_SEC.get().unwrap_or(&FALLBACK_CYCLES_PER_SEC)
}

/// Convert a cycle delta to nanoseconds.
#[inline]
pub fn cycles_to_ns(cycles: u64) -> u64 {
    ((cycles as u128 * 1_000_000_000) / cycles_per_second() as u128) as u64
}

/// Convert a cycle delta to microseconds.
#[inline]
pub fn cycles_to_us(cycles: u64) -> u64 {
    ((cycles as u128 * 1_000_000) / cycles_per_second() as u128) as u64
}

/// Convert nanoseconds to a cycle count.
#[inline]
pub fn ns_to_cycles(ns: u64) -> u64 {
    ((ns as u128 * cycles_per_second() as u128) / 1_000_000_000) as u64
}

/// Wall-clock nanoseconds since the Unix epoch.
#[inline]
pub fn now_ns() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}
