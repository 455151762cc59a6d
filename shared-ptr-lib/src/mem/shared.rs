use core::{
    fmt,
    marker::PhantomData,
    mem::{replace, swap, ManuallyDrop},
    ops::Deref,
    ptr::{null, NonNull},
};

use super::{
    block::BlockRef,
    counter::Owns,
    error::AllocError,
    global::{Global, GLOBAL},
    manager::{Dealloc, Manager},
    weak::Weak,
};

/// A strong reference to an object managed by a control block.
///
/// The block (what keeps the object alive) and the element pointer (what the
/// handle exposes) are independent. `project` and `alias` create handles which
/// pin the whole block while exposing something else. Handles compare by
/// element address only.
pub struct Shared<T: ?Sized, D: Dealloc = Global> {
    block: Option<BlockRef<D>>,
    ptr: Option<NonNull<T>>,
    _0: PhantomData<T>,
}

unsafe impl<T: ?Sized + Send + Sync, D: Dealloc> Send for Shared<T, D> where D::Counter: Sync {}

unsafe impl<T: ?Sized + Send + Sync, D: Dealloc> Sync for Shared<T, D> where D::Counter: Sync {}

impl<T: 'static> Shared<T> {
    /// Allocates `value` together with its control block.
    pub fn new(value: T) -> Result<Self, AllocError> {
        GLOBAL.make_shared(value)
    }
}

impl<T: ?Sized + 'static> Shared<T> {
    pub fn from_box(value: Box<T>) -> Result<Self, AllocError> {
        GLOBAL.shared_from_box(value)
    }
    /// See [`Manager::shared_from_raw`].
    pub unsafe fn from_raw<F: FnOnce(*mut T) + 'static>(
        ptr: *mut T,
        deleter: F,
    ) -> Result<Self, AllocError> {
        GLOBAL.shared_from_raw(ptr, deleter)
    }
}

impl<T: ?Sized, D: Dealloc> Shared<T, D> {
    #[inline(always)]
    pub const fn null() -> Self {
        Self {
            block: None,
            ptr: None,
            _0: PhantomData,
        }
    }
    /// Adopts one strong unit of `block`.
    #[inline(always)]
    pub(crate) unsafe fn from_parts(block: Option<BlockRef<D>>, ptr: Option<NonNull<T>>) -> Self {
        Self {
            block,
            ptr,
            _0: PhantomData,
        }
    }
    #[inline(always)]
    pub(crate) fn parts(&self) -> (Option<BlockRef<D>>, Option<NonNull<T>>) {
        (self.block, self.ptr)
    }
    #[inline(always)]
    pub fn get(&self) -> Option<&T> {
        self.ptr.as_ref().map(|p| unsafe { p.as_ref() })
    }
    #[inline(always)]
    pub fn as_ptr(&self) -> Option<NonNull<T>> {
        self.ptr
    }
    #[inline(always)]
    pub fn is_null(&self) -> bool {
        self.ptr.is_none()
    }
    /// The element address, null for an empty handle.
    #[inline(always)]
    pub fn addr(&self) -> *const u8 {
        self.ptr.map_or(null(), |p| p.as_ptr() as *const u8)
    }
    pub fn use_count(&self) -> usize {
        self.block.map_or(0, BlockRef::strong_count)
    }
    pub fn weak_count(&self) -> usize {
        self.block.map_or(0, BlockRef::weak_count)
    }
    /// `true` if both handles share ownership of the same block, whatever they expose.
    pub fn owner_eq<U: ?Sized>(&self, other: &Shared<U, D>) -> bool {
        self.block.map(BlockRef::addr) == other.block.map(BlockRef::addr)
    }
    pub fn downgrade(&self) -> Weak<T, D> {
        Weak::from(self)
    }
    pub fn swap(&mut self, other: &mut Self) {
        swap(&mut self.block, &mut other.block);
        swap(&mut self.ptr, &mut other.ptr);
    }
    /// Moves the contents out, leaving an empty handle.
    pub fn take(&mut self) -> Self {
        replace(self, Self::null())
    }
    pub fn reset(&mut self) {
        let mut old = Self::null();
        old.swap(self);
    }
    fn share<U: ?Sized>(&self, ptr: Option<NonNull<U>>) -> Shared<U, D> {
        if let Some(block) = self.block {
            unsafe { block.increment_strong() };
        }
        unsafe { Shared::from_parts(self.block, ptr) }
    }
    /// Shares the block and exposes a part of the object, or the object as
    /// another type (`s.project::<dyn Trait, _>(|x| x)`).
    ///
    /// Panics if the handle is empty.
    pub fn project<U: ?Sized, F: FnOnce(&T) -> &U>(&self, f: F) -> Shared<U, D> {
        let ptr = NonNull::from(f(&**self));
        self.share(Some(ptr))
    }
    /// `project` without touching the counters.
    pub fn map<U: ?Sized, F: FnOnce(&T) -> &U>(self, f: F) -> Shared<U, D> {
        let ptr = NonNull::from(f(&*self));
        let this = ManuallyDrop::new(self);
        unsafe { Shared::from_parts(this.block, Some(ptr)) }
    }
    /// Shares the block while exposing an arbitrary pointer, which may be null.
    /// Aliasing an empty handle gives a handle that owns nothing.
    ///
    /// # Safety
    ///
    /// `ptr` must be valid for as long as the block keeps the owned object alive.
    pub unsafe fn alias<U: ?Sized>(&self, ptr: *const U) -> Shared<U, D> {
        self.share(NonNull::new(ptr as *mut U))
    }
    /// Shares the block without exposing anything.
    pub fn alias_null<U: ?Sized>(&self) -> Shared<U, D> {
        self.share(None)
    }
}

impl<T: ?Sized + 'static, D: Dealloc> Shared<T, D> {
    /// # Safety
    ///
    /// See [`Manager::shared_from_raw`].
    pub unsafe fn from_raw_in<M, F>(manager: M, ptr: *mut T, deleter: F) -> Result<Self, AllocError>
    where
        M: Manager<Dealloc = D>,
        F: FnOnce(*mut T) + 'static,
        D::Counter: Owns<T> + Owns<F>,
    {
        manager.shared_from_raw(ptr, deleter)
    }
    pub fn from_box_in<M: Manager<Dealloc = D>>(manager: M, value: Box<T>) -> Result<Self, AllocError>
    where
        D::Counter: Owns<T> + Owns<fn(*mut T)>,
    {
        manager.shared_from_box(value)
    }
    /// Replaces the contents with a new block owning `ptr`. On failure the
    /// deleter has run and `self` is unchanged.
    ///
    /// # Safety
    ///
    /// See [`Manager::shared_from_raw`].
    pub unsafe fn reset_from_raw_in<M, F>(
        &mut self,
        manager: M,
        ptr: *mut T,
        deleter: F,
    ) -> Result<(), AllocError>
    where
        M: Manager<Dealloc = D>,
        F: FnOnce(*mut T) + 'static,
        D::Counter: Owns<T> + Owns<F>,
    {
        Self::from_raw_in(manager, ptr, deleter)?.swap(self);
        Ok(())
    }
    pub fn reset_from_box_in<M: Manager<Dealloc = D>>(
        &mut self,
        manager: M,
        value: Box<T>,
    ) -> Result<(), AllocError>
    where
        D::Counter: Owns<T> + Owns<fn(*mut T)>,
    {
        Self::from_box_in(manager, value)?.swap(self);
        Ok(())
    }
}

impl<T: ?Sized + 'static> Shared<T> {
    pub unsafe fn reset_from_raw<F: FnOnce(*mut T) + 'static>(
        &mut self,
        ptr: *mut T,
        deleter: F,
    ) -> Result<(), AllocError> {
        self.reset_from_raw_in(GLOBAL, ptr, deleter)
    }
    pub fn reset_from_box(&mut self, value: Box<T>) -> Result<(), AllocError> {
        self.reset_from_box_in(GLOBAL, value)
    }
}

impl<T: ?Sized, D: Dealloc> Default for Shared<T, D> {
    #[inline(always)]
    fn default() -> Self {
        Self::null()
    }
}

impl<T: ?Sized, D: Dealloc> Clone for Shared<T, D> {
    #[inline(always)]
    fn clone(&self) -> Self {
        self.share(self.ptr)
    }
    fn clone_from(&mut self, source: &Self) {
        if *self == *source {
            return;
        }
        let mut other = source.clone();
        other.swap(self);
    }
}

impl<T: ?Sized, D: Dealloc> Drop for Shared<T, D> {
    fn drop(&mut self) {
        if let Some(block) = self.block {
            unsafe { block.decrement_strong() }
        }
    }
}

impl<T: ?Sized, D: Dealloc> Deref for Shared<T, D> {
    type Target = T;
    #[inline(always)]
    fn deref(&self) -> &T {
        match self.get() {
            Some(value) => value,
            None => panic!("dereferencing an empty shared handle"),
        }
    }
}

impl<T: ?Sized, U: ?Sized, D: Dealloc, E: Dealloc> PartialEq<Shared<U, E>> for Shared<T, D> {
    #[inline(always)]
    fn eq(&self, other: &Shared<U, E>) -> bool {
        self.addr() == other.addr()
    }
}

impl<T: ?Sized, D: Dealloc> Eq for Shared<T, D> {}

impl<T: ?Sized, D: Dealloc> fmt::Debug for Shared<T, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shared")
            .field("ptr", &self.addr())
            .field("use_count", &self.use_count())
            .finish()
    }
}
