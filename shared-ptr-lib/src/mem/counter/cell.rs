use core::cell::Cell;
use std::process::abort;

use super::{Counter, Owns, RefCounterUpdate};

impl Counter for Cell<usize> {
    #[inline(always)]
    fn with_count(count: usize) -> Self {
        Cell::new(count)
    }
    #[inline(always)]
    unsafe fn ref_counter_update(&self, i: RefCounterUpdate) -> usize {
        let result = self.get();
        match i {
            RefCounterUpdate::AddRef if result == usize::MAX => abort(),
            RefCounterUpdate::Release => debug_assert_ne!(result, 0),
            _ => {}
        }
        self.set(result.wrapping_add_signed(i as isize));
        result
    }
    #[inline(always)]
    unsafe fn add_ref_if_live(&self) -> bool {
        if self.get() == 0 {
            return false;
        }
        self.ref_counter_update(RefCounterUpdate::AddRef);
        true
    }
}

// `Cell` handles never leave their thread.
unsafe impl<X: ?Sized> Owns<X> for Cell<usize> {}
