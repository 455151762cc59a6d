mod atomic;
mod cell;

pub use self::atomic::AtomicCounter;

/// Update a reference count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefCounterUpdate {
    AddRef = 1,
    Read = 0,
    Release = -1,
}

/// A strong or weak reference counter stored in a control block header.
pub trait Counter: Sized + 'static {
    // required
    fn with_count(count: usize) -> Self;
    /// Applies `i` and returns the value before the update.
    unsafe fn ref_counter_update(&self, i: RefCounterUpdate) -> usize;
    /// Increments the counter unless it's zero. Returns `false` if it was zero.
    unsafe fn add_ref_if_live(&self) -> bool;
    //
    #[inline(always)]
    fn count(&self) -> usize {
        unsafe { self.ref_counter_update(RefCounterUpdate::Read) }
    }
}

/// Declares which block contents a counter can carry.
///
/// A block is reachable from every thread its handles can be sent to, so a
/// counter that makes handles `Send` may only own `Send + Sync` contents.
///
/// # Safety
///
/// `Counter: Sync` implementations must only implement `Owns<X>` for
/// `X: Send + Sync`.
pub unsafe trait Owns<X: ?Sized> {}
