use core::{
    fmt,
    marker::PhantomData,
    mem::{replace, swap},
    ptr::NonNull,
};

use super::{block::BlockRef, global::Global, manager::Dealloc, shared::Shared};

/// A non-owning observer of a control block.
pub struct Weak<T: ?Sized, D: Dealloc = Global> {
    block: Option<BlockRef<D>>,
    ptr: Option<NonNull<T>>,
    _0: PhantomData<T>,
}

unsafe impl<T: ?Sized + Send + Sync, D: Dealloc> Send for Weak<T, D> where D::Counter: Sync {}

unsafe impl<T: ?Sized + Send + Sync, D: Dealloc> Sync for Weak<T, D> where D::Counter: Sync {}

impl<T: ?Sized, D: Dealloc> Weak<T, D> {
    #[inline(always)]
    pub const fn new() -> Self {
        Self {
            block: None,
            ptr: None,
            _0: PhantomData,
        }
    }
    pub fn use_count(&self) -> usize {
        self.block.map_or(0, BlockRef::strong_count)
    }
    pub fn weak_count(&self) -> usize {
        self.block.map_or(0, BlockRef::weak_count)
    }
    #[inline(always)]
    pub fn expired(&self) -> bool {
        self.use_count() == 0
    }
    /// A strong handle to the object, or an empty one if it's already released.
    pub fn lock(&self) -> Shared<T, D> {
        match self.block {
            Some(block) if unsafe { block.try_increment_strong() } => unsafe {
                Shared::from_parts(Some(block), self.ptr)
            },
            _ => Shared::null(),
        }
    }
    /// Compares the observed element addresses.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        self.ptr.map(|p| p.cast::<u8>()) == other.ptr.map(|p| p.cast::<u8>())
    }
    pub fn swap(&mut self, other: &mut Self) {
        swap(&mut self.block, &mut other.block);
        swap(&mut self.ptr, &mut other.ptr);
    }
    pub fn take(&mut self) -> Self {
        replace(self, Self::new())
    }
    pub fn reset(&mut self) {
        let mut old = Self::new();
        old.swap(self);
    }
}

impl<T: ?Sized, D: Dealloc> Default for Weak<T, D> {
    #[inline(always)]
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized, D: Dealloc> From<&Shared<T, D>> for Weak<T, D> {
    fn from(shared: &Shared<T, D>) -> Self {
        let (block, ptr) = shared.parts();
        if let Some(block) = block {
            unsafe { block.increment_weak() };
        }
        Self {
            block,
            ptr,
            _0: PhantomData,
        }
    }
}

impl<T: ?Sized, D: Dealloc> Clone for Weak<T, D> {
    fn clone(&self) -> Self {
        if let Some(block) = self.block {
            unsafe { block.increment_weak() };
        }
        Self {
            block: self.block,
            ptr: self.ptr,
            _0: PhantomData,
        }
    }
}

impl<T: ?Sized, D: Dealloc> Drop for Weak<T, D> {
    fn drop(&mut self) {
        if let Some(block) = self.block {
            unsafe { block.decrement_weak() }
        }
    }
}

impl<T: ?Sized, D: Dealloc> fmt::Debug for Weak<T, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Weak")
            .field("use_count", &self.use_count())
            .finish()
    }
}
