use core::sync::atomic::{fence, AtomicUsize, Ordering};
use std::process::abort;

use super::{Counter, Owns, RefCounterUpdate};

// Same headroom as `std::sync::Arc`: racing increments can't wrap around.
const MAX_COUNT: usize = isize::MAX as usize;

#[repr(transparent)]
#[derive(Debug)]
pub struct AtomicCounter {
    counter: AtomicUsize,
}

impl Default for AtomicCounter {
    #[inline(always)]
    fn default() -> Self {
        Self::with_count(0)
    }
}

impl Counter for AtomicCounter {
    #[inline(always)]
    fn with_count(count: usize) -> Self {
        Self {
            counter: AtomicUsize::new(count),
        }
    }
    #[inline(always)]
    unsafe fn ref_counter_update(&self, i: RefCounterUpdate) -> usize {
        match i {
            RefCounterUpdate::Read => self.counter.load(Ordering::Acquire),
            RefCounterUpdate::AddRef => {
                let result = self.counter.fetch_add(1, Ordering::Relaxed);
                if result > MAX_COUNT {
                    abort();
                }
                result
            }
            RefCounterUpdate::Release => {
                let result = self.counter.fetch_sub(1, Ordering::Release);
                debug_assert_ne!(result, 0);
                if result == 1 {
                    // whoever destroys must see every write made through other owners.
                    fence(Ordering::Acquire);
                }
                result
            }
        }
    }
    #[inline(always)]
    unsafe fn add_ref_if_live(&self) -> bool {
        self.counter
            .fetch_update(Ordering::Acquire, Ordering::Relaxed, |n| {
                if n == 0 {
                    return None;
                }
                if n > MAX_COUNT {
                    abort();
                }
                Some(n + 1)
            })
            .is_ok()
    }
}

unsafe impl<X: ?Sized + Send + Sync> Owns<X> for AtomicCounter {}

#[cfg(test)]
mod test {
    use core::sync::atomic::Ordering;
    use std::{sync::Arc, thread};

    use wasm_bindgen_test::wasm_bindgen_test;

    use crate::mem::counter::{Counter, RefCounterUpdate};

    use super::AtomicCounter;

    #[test]
    #[wasm_bindgen_test]
    fn test() {
        let x = AtomicCounter::default();
        assert_eq!(x.counter.load(Ordering::Relaxed), 0);
        assert_eq!(unsafe { x.ref_counter_update(RefCounterUpdate::AddRef) }, 0);
        assert_eq!(unsafe { x.ref_counter_update(RefCounterUpdate::Read) }, 1);
        assert_eq!(
            unsafe { x.ref_counter_update(RefCounterUpdate::Release) },
            1
        );
        assert_eq!(x.count(), 0);
        assert!(!unsafe { x.add_ref_if_live() });
        assert_eq!(x.count(), 0);
    }

    #[test]
    fn test_concurrent_updates() {
        let x = Arc::new(AtomicCounter::with_count(1));
        let threads: Vec<_> = (0..4)
            .map(|_| {
                let x = x.clone();
                thread::spawn(move || {
                    for _ in 0..1000 {
                        assert!(unsafe { x.add_ref_if_live() });
                        assert!(unsafe { x.ref_counter_update(RefCounterUpdate::Release) } > 1);
                    }
                })
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }
        assert_eq!(x.count(), 1);
    }
}
