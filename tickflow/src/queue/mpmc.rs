//! Lock-free multi-producer multi-consumer queue.
//!
//! Michael–Scott linked queue over a bounded node arena. Nodes are
//! recycled through a Treiber-stack free list living in the same arena,
//! so the queue never allocates after construction and enqueue fails
//! only when the arena is exhausted.
//!
//! A dummy node is always present: `head == tail` with a null
//! `tail.next` means empty. Enqueue links after the observed tail with
//! a release CAS and then helps swing `tail`; dequeue swings `head` and
//! returns the old head to the free list. CAS retries back off
//! exponentially ([`Backoff`]) before yielding.
//!
//! Nodes carry no version tags. Reuse is disambiguated by the bounded
//! arena plus the Michael–Scott discipline: a node returns to the free
//! list only after the `head` CAS that removed it succeeded, and every
//! loop re-reads `head`/`tail` before acting on a stale snapshot.

use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::ptr;
use std::sync::atomic::{AtomicPtr, Ordering};

use crate::constants::CacheAligned;
use crate::error::{FeedError, Result};
use crate::queue::Backoff;

struct Node<T> {
    data: UnsafeCell<MaybeUninit<T>>,
    next: AtomicPtr<Node<T>>,
}

impl<T> Node<T> {
    fn new() -> Self {
        Self {
            data: UnsafeCell::new(MaybeUninit::uninit()),
            next: AtomicPtr::new(ptr::null_mut()),
        }
    }
}

pub struct MpmcQueue<T> {
    head: CacheAligned<AtomicPtr<Node<T>>>,
    tail: CacheAligned<AtomicPtr<Node<T>>>,
    /// Treiber stack of recycled nodes, inside the same arena.
    free: CacheAligned<AtomicPtr<Node<T>>>,
    arena: Box<[Node<T>]>,
}

impl<T: Copy> MpmcQueue<T> {
    /// Create a queue backed by `nodes` arena slots. One slot is the
    /// permanent dummy, so up to `nodes - 1` items can be in flight.
    pub fn new(nodes: usize) -> Result<Self> {
        if nodes < 2 {
            return Err(FeedError::config("queue needs at least 2 nodes"));
        }

        let arena: Box<[Node<T>]> = (0..nodes).map(|_| Node::new()).collect();
        let base = arena.as_ptr() as *mut Node<T>;

        // Slot 0 becomes the dummy; the rest thread onto the free list.
        let mut free_head = ptr::null_mut();
        for i in 1..nodes {
            let node = unsafe { base.add(i) };
            unsafe {
                (*node).next.store(free_head, Ordering::Relaxed);
            }
            free_head = node;
        }

        Ok(Self {
            head: CacheAligned(AtomicPtr::new(base)),
            tail: CacheAligned(AtomicPtr::new(base)),
            free: CacheAligned(AtomicPtr::new(free_head)),
            arena,
        })
    }

    /// Enqueue one item. Returns `false` iff the node arena is
    /// exhausted. Lock-free; never blocks or allocates.
    pub fn try_enqueue(&self, item: T) -> bool {
        let node = match self.alloc_node() {
            Some(node) => node,
            None => return false,
        };

        unsafe {
            (*node).data.get().write(MaybeUninit::new(item));
            (*node).next.store(ptr::null_mut(), Ordering::Relaxed);
        }

        let mut backoff = Backoff::new();
        loop {
            let tail = self.tail.0.load(Ordering::Acquire);
            let next = unsafe { (*tail).next.load(Ordering::Acquire) };

            if tail != self.tail.0.load(Ordering::Acquire) {
                backoff.spin();
                continue;
            }

            if next.is_null() {
                if unsafe {
                    (*tail)
                        .next
                        .compare_exchange_weak(
                            ptr::null_mut(),
                            node,
                            Ordering::Release,
                            Ordering::Relaxed,
                        )
                        .is_ok()
                } {
                    // Linked; swing tail best-effort.
                    let _ = self.tail.0.compare_exchange(
                        tail,
                        node,
                        Ordering::Release,
                        Ordering::Relaxed,
                    );
                    return true;
                }
            } else {
                // Tail is lagging; help it forward.
                let _ = self.tail.0.compare_exchange(
                    tail,
                    next,
                    Ordering::Release,
                    Ordering::Relaxed,
                );
            }
            backoff.spin();
        }
    }

    /// Dequeue one item. Returns `None` iff the queue is empty.
    pub fn try_dequeue(&self) -> Option<T> {
        let mut backoff = Backoff::new();
        loop {
            let head = self.head.0.load(Ordering::Acquire);
            let tail = self.tail.0.load(Ordering::Acquire);
            let next = unsafe { (*head).next.load(Ordering::Acquire) };

            if head != self.head.0.load(Ordering::Acquire) {
                backoff.spin();
                continue;
            }

            if head == tail {
                if next.is_null() {
                    return None;
                }
                // Tail is lagging; help it forward.
                let _ = self.tail.0.compare_exchange(
                    tail,
                    next,
                    Ordering::Release,
                    Ordering::Relaxed,
                );
            } else {
                if next.is_null() {
                    backoff.spin();
                    continue;
                }

                // Read before the CAS; a lost race discards the copy.
                let item = unsafe { ptr::read((*next).data.get()).assume_init() };

                if self
                    .head
                    .0
                    .compare_exchange_weak(head, next, Ordering::Release, Ordering::Relaxed)
                    .is_ok()
                {
                    self.free_node(head);
                    return Some(item);
                }
            }
            backoff.spin();
        }
    }

    /// Dequeue up to `out.len()` items; returns the count actually
    /// dequeued. No ordering is promised beyond repeated single
    /// dequeues.
    pub fn try_dequeue_bulk(&self, out: &mut [T]) -> usize {
        let mut count = 0;
        while count < out.len() {
            match self.try_dequeue() {
                Some(item) => {
                    out[count] = item;
                    count += 1;
                }
                None => break,
            }
        }
        count
    }

    /// Approximate emptiness snapshot.
    #[inline]
    pub fn empty(&self) -> bool {
        let head = self.head.0.load(Ordering::Acquire);
        unsafe { (*head).next.load(Ordering::Acquire).is_null() }
    }

    /// Walk the live list. O(live nodes); monitoring only.
    pub fn size(&self) -> usize {
        let mut count = 0;
        let mut current = self.head.0.load(Ordering::Acquire);
        let mut next = unsafe { (*current).next.load(Ordering::Acquire) };

        while !next.is_null() && count < self.arena.len() {
            count += 1;
            current = next;
            next = unsafe { (*current).next.load(Ordering::Acquire) };
        }
        count
    }

    /// Maximum number of items that can be in flight.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.arena.len() - 1
    }

    fn alloc_node(&self) -> Option<*mut Node<T>> {
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

    fn free_node(&self, node: *mut Node<T>) {
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

unsafe impl<T: Copy + Send> Send for MpmcQueue<T> {}
unsafe impl<T: Copy + Send> Sync for MpmcQueue<T> {}
