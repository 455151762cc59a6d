use core::{cell::UnsafeCell, mem::MaybeUninit, ptr::drop_in_place};

use crate::mem::counter::Counter;

use super::{ControlBlock, Header};

/// A control block with the managed object embedded after the header.
pub struct ObjBlock<T, C: Counter> {
    header: Header<C>,
    storage: UnsafeCell<MaybeUninit<T>>,
}

impl<T, C: Counter> ObjBlock<T, C> {
    /// The storage is uninitialized until something is written to `data_ptr()`.
    #[inline(always)]
    pub fn uninit() -> Self {
        Self {
            header: Header::default(),
            storage: UnsafeCell::new(MaybeUninit::uninit()),
        }
    }
    #[inline(always)]
    pub fn data_ptr(&self) -> *mut T {
        self.storage.get() as *mut T
    }
}

impl<T, C: Counter> ControlBlock<C> for ObjBlock<T, C> {
    #[inline(always)]
    fn header(&self) -> &Header<C> {
        &self.header
    }
    unsafe fn release(&self) {
        drop_in_place(self.data_ptr())
    }
}
