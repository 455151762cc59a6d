use core::{cell::UnsafeCell, mem::ManuallyDrop};

use crate::mem::counter::Counter;

use super::{ControlBlock, Header};

/// A control block owning a separately allocated object through a deleter.
pub struct PtrBlock<E: ?Sized, F, C: Counter> {
    header: Header<C>,
    ptr: *mut E,
    deleter: UnsafeCell<ManuallyDrop<F>>,
}

impl<E: ?Sized, F: FnOnce(*mut E), C: Counter> PtrBlock<E, F, C> {
    #[inline(always)]
    pub fn new(ptr: *mut E, deleter: F) -> Self {
        Self {
            header: Header::default(),
            ptr,
            deleter: UnsafeCell::new(ManuallyDrop::new(deleter)),
        }
    }
}

impl<E: ?Sized, F: FnOnce(*mut E), C: Counter> ControlBlock<C> for PtrBlock<E, F, C> {
    #[inline(always)]
    fn header(&self) -> &Header<C> {
        &self.header
    }
    unsafe fn release(&self) {
        let deleter = ManuallyDrop::take(&mut *self.deleter.get());
        deleter(self.ptr)
    }
}

/// The default deleter: the pointer came from `Box::into_raw`.
pub(crate) fn box_deleter<E: ?Sized>(ptr: *mut E) {
    drop(unsafe { Box::from_raw(ptr) })
}
