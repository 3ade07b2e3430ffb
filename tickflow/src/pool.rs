//! Lock-free fixed-size object pool.
//!
//! A contiguous slab of cache-line-multiple slots, reserved once and
//! never grown or moved. A Treiber-stack free list threads through the
//! free slots themselves (each free slot's first bytes hold the next
//! pointer), so the pool carries no side-table.
//!
//! Backing storage is a cache-line-aligned heap allocation, or a 2 MB
//! huge-page mapping when requested. Huge-page mapping failure falls
//! back to the heap silently; [`ObjectPool::using_large_pages`] reports
//! which one is live.

use std::marker::PhantomData;
use std::ptr::{self, NonNull};
use std::sync::atomic::{AtomicPtr, Ordering};

use crate::constants::{CacheAligned, CACHE_LINE_SIZE, HUGE_PAGE_SIZE};
use crate::error::{FeedError, Result};
use crate::queue::Backoff;

struct FreeNode {
    next: AtomicPtr<FreeNode>,
}

#[derive(Clone, Copy)]
enum Backing {
    Heap(std::alloc::Layout),
    #[cfg_attr(not(target_os = "linux"), allow(dead_code))]
    HugePages { map_size: usize },
}

pub struct ObjectPool<T> {
    memory: *mut u8,
    backing: Backing,
    slot_size: usize,
    capacity: usize,
    free: CacheAligned<AtomicPtr<FreeNode>>,
    _marker: PhantomData<T>,
}

impl<T> ObjectPool<T> {
    /// Reserve a pool of `slots` slots. With `use_large_pages` the slab
    /// is backed by a huge-page mapping when the system grants one.
    pub fn new(slots: usize, use_large_pages: bool) -> Result<Self> {
        if slots == 0 {
            return Err(FeedError::config("pool needs at least one slot"));
        }
        if std::mem::align_of::<T>() > CACHE_LINE_SIZE {
            return Err(FeedError::config("slot alignment above a cache line"));
        }

        let slot_size = Self::slot_size_for();
        let total_size = slots * slot_size;

        let (memory, backing) = Self::reserve(total_size, use_large_pages)?;

        let pool = Self {
            memory,
            backing,
            slot_size,
            capacity: slots,
            free: CacheAligned(AtomicPtr::new(ptr::null_mut())),
            _marker: PhantomData,
        };

        // Thread every slot onto the free list; no other thread can
        // see the pool yet.
        let mut head: *mut FreeNode = ptr::null_mut();
        for i in 0..slots {
            let node = unsafe { pool.memory.add(i * slot_size) } as *mut FreeNode;
            unsafe {
                (*node).next.store(head, Ordering::Relaxed);
            }
            head = node;
        }
        pool.free.0.store(head, Ordering::Release);

        Ok(pool)
    }

    /// Slots are cache-line multiples so no object straddles a line.
    const fn slot_size_for() -> usize {
        let raw = std::mem::size_of::<T>();
        let raw = if raw == 0 { 1 } else { raw };
        (raw + CACHE_LINE_SIZE - 1) / CACHE_LINE_SIZE * CACHE_LINE_SIZE
    }

    #[cfg(target_os = "linux")]
    fn reserve(total_size: usize, use_large_pages: bool) -> Result<(*mut u8, Backing)> {
        if use_large_pages {
            let map_size = (total_size + HUGE_PAGE_SIZE - 1) / HUGE_PAGE_SIZE * HUGE_PAGE_SIZE;
            let p = unsafe {
                libc::mmap(
                    ptr::null_mut(),
                    map_size,
                    libc::PROT_READ | libc::PROT_WRITE,
                    libc::MAP_PRIVATE | libc::MAP_ANONYMOUS | libc::MAP_HUGETLB,
                    -1,
                    0,
                )
            };
            if p != libc::MAP_FAILED {
                // Pin the mapping; failure here only costs page faults.
                unsafe {
                    let _ = libc::mlock(p, map_size);
                }
                return Ok((p as *mut u8, Backing::HugePages { map_size }));
            }
            // No huge pages available: fall through to the heap.
        }
        Self::reserve_heap(total_size)
    }

    #[cfg(not(target_os = "linux"))]
    fn reserve(total_size: usize, _use_large_pages: bool) -> Result<(*mut u8, Backing)> {
        Self::reserve_heap(total_size)
    }

    fn reserve_heap(total_size: usize) -> Result<(*mut u8, Backing)> {
        let layout = std::alloc::Layout::from_size_align(total_size, CACHE_LINE_SIZE)
            .map_err(|_| FeedError::memory("invalid pool layout"))?;
        let p = unsafe { std::alloc::alloc_zeroed(layout) };
        if p.is_null() {
            return Err(FeedError::memory(format!(
                "pool reservation of {total_size} bytes failed"
            )));
        }
        Ok((p, Backing::Heap(layout)))
    }

    /// Take a slot and move `value` into it. Returns `None` when the
    /// pool is exhausted. Lock-free.
    pub fn allocate(&self, value: T) -> Option<NonNull<T>> {
        let node = self.pop_free()?;
        let slot = node as *mut T;
        unsafe {
            ptr::write(slot, value);
        }
        NonNull::new(slot)
    }

    /// Return a slot to the pool, dropping the value in place.
    ///
    /// # Safety
    ///
    /// `ptr` must have come from [`allocate`](Self::allocate) on this
    /// pool and must not be used afterwards.
    pub unsafe fn deallocate(&self, ptr: NonNull<T>) {
        if std::mem::needs_drop::<T>() {
            ptr::drop_in_place(ptr.as_ptr());
        }
        self.push_free(ptr.as_ptr() as *mut FreeNode);
    }

    /// Count the free slots. O(free); monitoring only.
    pub fn available(&self) -> usize {
        let mut count = 0;
        let mut node = self.free.0.load(Ordering::Acquire);
        while !node.is_null() && count < self.capacity {
            count += 1;
            node = unsafe { (*node).next.load(Ordering::Relaxed) };
        }
        count
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn slot_size(&self) -> usize {
        self.slot_size
    }

    /// Whether the slab ended up on huge pages (the request may have
    /// silently fallen back to the heap).
    #[inline]
    pub fn using_large_pages(&self) -> bool {
        matches!(self.backing, Backing::HugePages { .. })
    }

    fn pop_free(&self) -> Option<*mut FreeNode> {
        let mut backoff = Backoff::new();
        loop {
            let node = self.free.0.load(Ordering::Acquire);
            if node.is_null() {
                return None;
            }

            let next = unsafe { (*node).next.load(Ordering::Relaxed) };
            if self
                .free
                .0
                .compare_exchange_weak(node, next, Ordering::Release, Ordering::Relaxed)
                .is_ok()
            {
                return Some(node);
            }
            backoff.spin();
        }
    }

    fn push_free(&self, node: *mut FreeNode) {
        let mut backoff = Backoff::new();
        loop {
            let old_head = self.free.0.load(Ordering::Acquire);
            unsafe {
                (*node).next.store(old_head, Ordering::Relaxed);
            }
            if self
                .free
                .0
                .compare_exchange_weak(old_head, node, Ordering::Release, Ordering::Relaxed)
                .is_ok()
            {
                return;
            }
            backoff.spin();
        }
    }
}

impl<T> Drop for ObjectPool<T> {
    fn drop(&mut self) {
        // Outstanding allocations are not dropped; the slab goes away
        // wholesale.
        match self.backing {
            Backing::Heap(layout) => unsafe {
                std::alloc::dealloc(self.memory, layout);
            },
            #[cfg(target_os = "linux")]
            Backing::HugePages { map_size } => unsafe {
                libc::munmap(self.memory as *mut libc::c_void, map_size);
            },
            #[cfg(not(target_os = "linux"))]
            Backing::HugePages { .. } => unreachable!(),
        }
    }
}

unsafe impl<T: Send> Send for ObjectPool<T> {}
unsafe impl<T: Send> Sync for ObjectPool<T> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::MarketEvent;

    #[test]
    fn test_slot_geometry() {
        let pool = ObjectPool::<MarketEvent>::new(16, false).unwrap();
        assert_eq!(pool.slot_size(), 64);
        assert_eq!(pool.slot_size() % CACHE_LINE_SIZE, 0);

        let small = ObjectPool::<u32>::new(16, false).unwrap();
        assert_eq!(small.slot_size(), 64);

        let wide = ObjectPool::<[u8; 100]>::new(16, false).unwrap();
        assert_eq!(wide.slot_size(), 128);
    }

    #[test]
    fn test_allocate_round_trip() {
        let pool = ObjectPool::<u64>::new(8, false).unwrap();
        let p = pool.allocate(0xDEAD_BEEF).unwrap();
        assert_eq!(unsafe { *p.as_ref() }, 0xDEAD_BEEF);
        assert_eq!(p.as_ptr() as usize % CACHE_LINE_SIZE, 0, "slot must be line aligned");
        unsafe { pool.deallocate(p) };
    }

    #[test]
    fn test_exhaustion_and_reuse() {
        let pool = ObjectPool::<u64>::new(100, false).unwrap();
        let mut held = Vec::new();
        for i in 0..100 {
            held.push(pool.allocate(i).expect("pool should have room"));
        }
        assert!(pool.allocate(100).is_none(), "101st allocation must fail");

        let p = held.pop().unwrap();
        unsafe { pool.deallocate(p) };
        assert!(pool.allocate(100).is_some(), "freed slot must be reusable");

        for p in held {
            unsafe { pool.deallocate(p) };
        }
    }

    #[test]
    fn test_conservation() {
        let pool = ObjectPool::<u64>::new(32, false).unwrap();
        assert_eq!(pool.available(), pool.capacity());

        let a = pool.allocate(1).unwrap();
        let b = pool.allocate(2).unwrap();
        assert_eq!(pool.available() + 2, pool.capacity());

        unsafe {
            pool.deallocate(a);
            pool.deallocate(b);
        }
        assert_eq!(pool.available(), pool.capacity());
    }

    #[test]
    fn test_large_page_request_falls_back() {
        // Most CI hosts have no hugetlb reservation; either outcome is
        // valid as long as the pool works.
        let pool = ObjectPool::<MarketEvent>::new(64, true).unwrap();
        let ev = MarketEvent::default();
        let p = pool.allocate(ev).unwrap();
        unsafe { pool.deallocate(p) };
        let _ = pool.using_large_pages();
    }
}
