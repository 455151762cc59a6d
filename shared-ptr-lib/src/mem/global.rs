use core::{alloc::Layout, cell::Cell};
use std::alloc::{alloc, dealloc};

use super::{
    counter::AtomicCounter,
    manager::{Dealloc, Manager},
};

/// The process allocator with plain counters. Handles stay on their thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct Global();

pub const GLOBAL: Global = Global();

impl Dealloc for Global {
    type Counter = Cell<usize>;
    #[inline(always)]
    unsafe fn dealloc(ptr: *mut u8, layout: Layout) {
        dealloc(ptr, layout)
    }
}

impl Manager for Global {
    type Dealloc = Global;
    #[inline(always)]
    unsafe fn alloc(self, layout: Layout) -> *mut u8 {
        alloc(layout)
    }
}

/// The process allocator with atomic counters. Handles are `Send + Sync`.
#[derive(Debug, Clone, Copy, Default)]
pub struct AtomicGlobal();

pub const ATOMIC_GLOBAL: AtomicGlobal = AtomicGlobal();

impl Dealloc for AtomicGlobal {
    type Counter = AtomicCounter;
    #[inline(always)]
    unsafe fn dealloc(ptr: *mut u8, layout: Layout) {
        dealloc(ptr, layout)
    }
}

impl Manager for AtomicGlobal {
    type Dealloc = AtomicGlobal;
    #[inline(always)]
    unsafe fn alloc(self, layout: Layout) -> *mut u8 {
        alloc(layout)
    }
}
