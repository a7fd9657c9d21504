//! A fixed-capacity, lock-free LIFO pool of pre-initialized elements.
//!
//! Unlike [`crate::request_state`]'s plain ownership (one `RequestState` per
//! connection thread, no sharing), `available` here is genuinely shared
//! across threads and coordinated with atomic compare-and-swap only, no
//! mutex. Slot storage uses `UnsafeCell` the way this codebase's other
//! hand-rolled pools do (see DESIGN.md); the safety argument is that a
//! slot at index `< available` is only ever touched by the thread that
//! currently owns the `available` decrement granting it access.
//!
//! As specified, `release` stores into the slot after the CAS that makes
//! it resident succeeds, which a concurrent `acquire` could in principle
//! race with. See DESIGN.md for the ordering chosen here.

use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicUsize, Ordering};

/// A bounded LIFO stack of pre-initialized `T`, growing past capacity via
/// plain heap allocation (and shrinking back by simply dropping the
/// overflow element on release) rather than ever blocking.
pub struct Pool<T> {
    items: Box<[UnsafeCell<Option<T>>]>,
    available: AtomicUsize,
    init: Box<dyn Fn() -> T + Send + Sync>,
}

// SAFETY: access to `items[i]` for `i < available` is gated by the CAS on
// `available` in `acquire`/`release`; only the thread that wins the CAS
// touches that slot, so concurrent `&Pool<T>` access never aliases a
// mutable borrow of the same cell. `T` itself must be `Send` to cross
// threads, which is required below.
unsafe impl<T: Send> Sync for Pool<T> {}

impl<T: Send> Pool<T> {
    /// Create a pool of `capacity` elements, each built by calling `init`.
    /// `init` is retained so the pool can also build overflow elements on
    /// exhaustion.
    pub fn new<F>(capacity: usize, init: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        let items: Box<[UnsafeCell<Option<T>>]> = (0..capacity)
            .map(|_| UnsafeCell::new(Some(init())))
            .collect();
        Pool {
            items,
            available: AtomicUsize::new(capacity),
            init: Box::new(init),
        }
    }

    pub fn capacity(&self) -> usize {
        self.items.len()
    }

    /// Number of elements currently resident in the pool's backing array.
    pub fn available(&self) -> usize {
        self.available.load(Ordering::SeqCst)
    }

    /// Take an element. Allocates a fresh overflow element (never placed
    /// back into the array) when the pool is exhausted.
    pub fn acquire(&self) -> T {
        loop {
            let current = self.available.load(Ordering::SeqCst);
            if current == 0 {
                return (self.init)();
            }
            let new = current - 1;
            if self
                .available
                .compare_exchange(current, new, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
            {
                // SAFETY: we just won the CAS that reserves index `new`,
                // so no other thread can also claim it before we take it.
                let slot = unsafe { &mut *self.items[new].get() };
                return slot.take().expect("reserved pool slot was empty");
            }
        }
    }

    /// Return an element. Drops it instead of storing it when the pool is
    /// already at capacity (overflow path).
    pub fn release(&self, item: T) {
        loop {
            let current = self.available.load(Ordering::SeqCst);
            if current == self.items.len() {
                drop(item);
                return;
            }
            let new = current + 1;
            if self
                .available
                .compare_exchange(current, new, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
            {
                // SAFETY: the CAS above reserved index `current` for this
                // store; see DESIGN.md for the store-after-CAS race this
                // still leaves open under concurrent acquire/release.
                let slot = unsafe { &mut *self.items[current].get() };
                *slot = Some(item);
                return;
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::atomic::AtomicU32;
    use std::sync::Arc;

    #[test]
    fn test_acquire_drains_to_zero_then_overflows() {
        let pool = Pool::new(2, || 0u32);
        assert_eq!(pool.available(), 2);
        let a = pool.acquire();
        let b = pool.acquire();
        assert_eq!(pool.available(), 0);
        let c = pool.acquire(); // overflow allocation, not drawn from array
        assert_eq!(pool.available(), 0);
        let _ = (a, b, c);
    }

    #[test]
    fn test_release_restores_availability_then_destroys_overflow() {
        let pool = Pool::new(1, || 0u32);
        let a = pool.acquire();
        assert_eq!(pool.available(), 0);
        pool.release(a);
        assert_eq!(pool.available(), 1);

        let b = pool.acquire();
        let c = pool.acquire(); // overflow
        pool.release(b);
        assert_eq!(pool.available(), 1);
        pool.release(c); // pool already at capacity, c is destroyed
        assert_eq!(pool.available(), 1);
    }

    #[test]
    fn test_concurrent_acquire_release_preserves_capacity() {
        let capacity = 8;
        let counter = Arc::new(AtomicU32::new(0));
        let pool = Arc::new(Pool::new(capacity, {
            let counter = Arc::clone(&counter);
            move || counter.fetch_add(1, Ordering::SeqCst)
        }));

        let mut handles = Vec::new();
        for _ in 0..capacity {
            let pool = Arc::clone(&pool);
            handles.push(std::thread::spawn(move || {
                for _ in 0..200 {
                    let item = pool.acquire();
                    pool.release(item);
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }

        // Sequentially drain: exactly `capacity` elements should be resident.
        let mut drained = 0;
        while pool.available() > 0 {
            pool.acquire();
            drained += 1;
        }
        assert_eq!(drained, capacity);
    }
}
