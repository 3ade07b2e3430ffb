//! Thread placement and CPU primitives.
//!
//! Core pinning, real-time FIFO scheduling, thread naming and
//! isolated-core discovery for data-plane workers. Everything here is
//! best-effort: a caller without the capability gets an `Err` and
//! decides its own policy; nothing aborts.

use crate::error::{FeedError, Result};

/// Path parsed by [`isolated_cpus`].
#[cfg(target_os = "linux")]
const ISOLATED_CPUS_PATH: &str = "/sys/devices/system/cpu/isolated";

/// Pin the calling thread to one logical CPU.
#[cfg(target_os = "linux")]
pub fn pin_to_cpu(cpu_id: usize) -> Result<()> {
    use libc::{cpu_set_t, sched_setaffinity, CPU_SET, CPU_ZERO};
    use std::mem;

    if cpu_id >= num_cpus() {
        return Err(FeedError::config(format!("cpu {cpu_id} is not online")));
    }

    unsafe {
        let mut cpu_set: cpu_set_t = mem::zeroed();
        CPU_ZERO(&mut cpu_set);
        CPU_SET(cpu_id, &mut cpu_set);

        if sched_setaffinity(0, mem::size_of::<cpu_set_t>(), &cpu_set) != 0 {
            return Err(FeedError::system_resource("sched_setaffinity failed"));
        }
    }
    Ok(())
}

#[cfg(not(target_os = "linux"))]
pub fn pin_to_cpu(_cpu_id: usize) -> Result<()> {
    Err(FeedError::system_resource(
        "CPU pinning not supported on this platform",
    ))
}

/// Switch the calling thread to SCHED_FIFO at `priority` (1..=99).
/// Requires CAP_SYS_NICE or an rtprio rlimit.
#[cfg(target_os = "linux")]
pub fn set_realtime_fifo(priority: i32) -> Result<()> {
    if !(1..=99).contains(&priority) {
        return Err(FeedError::config(format!(
            "realtime priority {priority} outside 1..=99"
        )));
    }

    let param = libc::sched_param { sched_priority: priority };
    let rc = unsafe { libc::sched_setscheduler(0, libc::SCHED_FIFO, &param) };
    if rc != 0 {
        return Err(FeedError::system_resource(
            "sched_setscheduler(SCHED_FIFO) failed (missing capability?)",
        ));
    }
    Ok(())
}

#[cfg(not(target_os = "linux"))]
pub fn set_realtime_fifo(_priority: i32) -> Result<()> {
    Err(FeedError::system_resource(
        "SCHED_FIFO not supported on this platform",
    ))
}

/// Name the calling thread; the kernel limit is 15 bytes plus NUL.
#[cfg(target_os = "linux")]
pub fn set_thread_name(name: &str) -> Result<()> {
    let truncated: Vec<u8> = name.bytes().take(15).collect();
    let cname = std::ffi::CString::new(truncated)
        .map_err(|_| FeedError::config("thread name contains NUL"))?;

    let rc = unsafe { libc::prctl(libc::PR_SET_NAME, cname.as_ptr()) };
    if rc != 0 {
        return Err(FeedError::system_resource("prctl(PR_SET_NAME) failed"));
    }
    Ok(())
}

#[cfg(not(target_os = "linux"))]
pub fn set_thread_name(_name: &str) -> Result<()> {
    Err(FeedError::system_resource(
        "thread naming not supported on this platform",
    ))
}

/// True when the calling thread is currently under SCHED_FIFO.
pub fn is_realtime() -> bool {
    #[cfg(target_os = "linux")]
    {
        unsafe { libc::sched_getscheduler(0) == libc::SCHED_FIFO }
    }
    #[cfg(not(target_os = "linux"))]
    {
        false
    }
}

/// Number of online logical CPUs.
pub fn num_cpus() -> usize {
    #[cfg(unix)]
    {
        let n = unsafe { libc::sysconf(libc::_SC_NPROCESSORS_ONLN) };
        if n > 0 {
            return n as usize;
        }
    }
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// CPUs isolated from the scheduler (`isolcpus=` boot parameter).
/// Returns an empty list when the file is missing or unparsable.
pub fn isolated_cpus() -> Vec<usize> {
    #[cfg(target_os = "linux")]
    {
        match std::fs::read_to_string(ISOLATED_CPUS_PATH) {
            Ok(contents) => parse_cpu_list(contents.trim()),
            Err(_) => Vec::new(),
        }
    }
    #[cfg(not(target_os = "linux"))]
    {
        Vec::new()
    }
}

/// Parse a kernel CPU list such as `"2-7,10-15"` into ids.
/// Malformed tokens are skipped rather than failing the whole list.
pub fn parse_cpu_list(list: &str) -> Vec<usize> {
    let mut cpus = Vec::new();
    for token in list.split(',') {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        match token.split_once('-') {
            Some((lo, hi)) => {
                if let (Ok(lo), Ok(hi)) = (lo.trim().parse::<usize>(), hi.trim().parse::<usize>())
                {
                    if lo <= hi {
                        cpus.extend(lo..=hi);
                    }
                }
            }
            None => {
                if let Ok(cpu) = token.parse::<usize>() {
                    cpus.push(cpu);
                }
            }
        }
    }
    cpus
}

/// Architecture pause hint for spin loops.
#[inline(always)]
pub fn cpu_pause() {
    std::hint::spin_loop();
}

#[cold]
#[inline(never)]
fn cold() {}

/// Branch hint: `b` is expected to be true. Semantically a no-op.
#[inline(always)]
pub fn likely(b: bool) -> bool {
    if !b {
        cold();
    }
    b
}

/// Branch hint: `b` is expected to be false. Semantically a no-op.
#[inline(always)]
pub fn unlikely(b: bool) -> bool {
    if b {
        cold();
    }
    b
}

/// Busy-wait for `iterations` pause hints.
#[inline]
pub fn spin_wait(iterations: u32) {
    for _ in 0..iterations {
        std::hint::spin_loop();
    }
}

/// Prefetch `addr` for reading.
#[inline(always)]
pub fn prefetch_read<T>(addr: *const T) {
    #[cfg(target_arch = "x86_64")]
    unsafe {
        std::arch::x86_64::_mm_prefetch(addr as *const i8, std::arch::x86_64::_MM_HINT_T0);
    }
    #[cfg(target_arch = "aarch64")]
    unsafe {
        std::arch::asm!("prfm pldl1keep, [{ptr}]", ptr = in(reg) addr, options(nostack));
    }
    #[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
    {
        let _ = addr;
    }
}

/// Prefetch `addr` for writing.
#[inline(always)]
pub fn prefetch_write<T>(addr: *const T) {
    #[cfg(target_arch = "x86_64")]
    unsafe {
        std::arch::x86_64::_mm_prefetch(addr as *const i8, std::arch::x86_64::_MM_HINT_T0);
    }
    #[cfg(target_arch = "aarch64")]
    unsafe {
        std::arch::asm!("prfm pstl1keep, [{ptr}]", ptr = in(reg) addr, options(nostack));
    }
    #[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
    {
        let _ = addr;
    }
}
