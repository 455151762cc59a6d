pub mod obj_block;
pub mod ptr_block;

use core::{alloc::Layout, fmt, marker::PhantomData, ptr::NonNull};

use log::trace;

use super::{
    counter::{Counter, RefCounterUpdate},
    manager::Dealloc,
};

/// Reference counters of a control block.
///
/// Strong owners collectively hold one extra weak unit, so the block storage
/// is freed by exactly one `Release` that brings `weak` to zero.
#[derive(Debug)]
pub struct Header<C: Counter> {
    strong: C,
    weak: C,
}

impl<C: Counter> Default for Header<C> {
    /// One strong owner plus the implicit weak unit.
    #[inline(always)]
    fn default() -> Self {
        Self {
            strong: C::with_count(1),
            weak: C::with_count(1),
        }
    }
}

/// Block = (Header, managed object)
pub trait ControlBlock<C: Counter> {
    fn header(&self) -> &Header<C>;
    /// Destroys the managed object. The block storage stays allocated.
    ///
    /// Called once, when the strong counter drops to zero.
    unsafe fn release(&self);
}

/// A type-erased pointer to a control block allocated by a `D` manager.
pub struct BlockRef<D: Dealloc> {
    ptr: NonNull<dyn ControlBlock<D::Counter>>,
    _0: PhantomData<D>,
}

impl<D: Dealloc> Clone for BlockRef<D> {
    #[inline(always)]
    fn clone(&self) -> Self {
        *self
    }
}

impl<D: Dealloc> Copy for BlockRef<D> {}

impl<D: Dealloc> fmt::Debug for BlockRef<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlockRef({:p})", self.ptr)
    }
}

impl<D: Dealloc> BlockRef<D> {
    /// `ptr` must come from a `D` allocation of exactly `Layout::for_value(ptr)`.
    #[inline(always)]
    pub unsafe fn new(ptr: NonNull<dyn ControlBlock<D::Counter>>) -> Self {
        Self {
            ptr,
            _0: PhantomData,
        }
    }
    #[inline(always)]
    fn header(&self) -> &Header<D::Counter> {
        unsafe { self.ptr.as_ref().header() }
    }
    #[inline(always)]
    pub fn addr(self) -> *const u8 {
        self.ptr.as_ptr() as *const u8
    }
    #[inline(always)]
    pub fn strong_count(self) -> usize {
        self.header().strong.count()
    }
    /// The number of weak handles. While the last strong owner is releasing the
    /// object the implicit unit is still counted.
    pub fn weak_count(self) -> usize {
        let header = self.header();
        let weak = header.weak.count();
        if header.strong.count() > 0 {
            weak.saturating_sub(1)
        } else {
            weak
        }
    }
    #[inline(always)]
    pub unsafe fn increment_strong(self) {
        self.header().strong.ref_counter_update(RefCounterUpdate::AddRef);
    }
    #[inline(always)]
    pub unsafe fn try_increment_strong(self) -> bool {
        self.header().strong.add_ref_if_live()
    }
    #[inline(always)]
    pub unsafe fn increment_weak(self) {
        self.header().weak.ref_counter_update(RefCounterUpdate::AddRef);
    }
    pub unsafe fn decrement_strong(self) {
        if self.header().strong.ref_counter_update(RefCounterUpdate::Release) != 1 {
            return;
        }
        trace!("block {:p}: release", self.ptr);
        self.ptr.as_ref().release();
        self.decrement_weak();
    }
    pub unsafe fn decrement_weak(self) {
        if self.header().weak.ref_counter_update(RefCounterUpdate::Release) != 1 {
            return;
        }
        let layout = Layout::for_value(self.ptr.as_ref());
        trace!("block {:p}: free {} bytes", self.ptr, layout.size());
        D::dealloc(self.ptr.as_ptr() as *mut u8, layout);
    }
}
