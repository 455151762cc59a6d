use core::{alloc::Layout, marker::PhantomData, mem::forget, ptr::NonNull};

use log::{trace, warn};

use super::{
    block::{
        obj_block::ObjBlock,
        ptr_block::{box_deleter, PtrBlock},
        BlockRef,
    },
    counter::{Counter, Owns},
    error::AllocError,
    new_in_place::{Fixed, Init, NewInPlace},
    shared::Shared,
};

/// Frees control blocks. It's the type parameter of `Shared` and `Weak`, so it
/// also fixes the counter flavour of their blocks.
pub trait Dealloc: 'static {
    type Counter: Counter;
    unsafe fn dealloc(ptr: *mut u8, layout: Layout);
}

/// The counter type of the blocks `M` allocates.
pub type CounterOf<M> = <<M as Manager>::Dealloc as Dealloc>::Counter;

/// Allocates control blocks.
pub trait Manager: Sized {
    // required:
    type Dealloc: Dealloc;
    /// Returns null if the allocation fails.
    unsafe fn alloc(self, layout: Layout) -> *mut u8;
    // optional:
    fn try_alloc(self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        match NonNull::new(unsafe { self.alloc(layout) }) {
            Some(p) => {
                trace!("block {:p}: alloc {} bytes", p, layout.size());
                Ok(p)
            }
            None => {
                warn!("control block allocation of {} bytes failed", layout.size());
                Err(AllocError::new(layout))
            }
        }
    }
    /// Allocate a block for a new object and initialize the object with `new_in_place`.
    fn new_shared<N: NewInPlace>(
        self,
        new_in_place: N,
    ) -> Result<Shared<N::Result, Self::Dealloc>, AllocError>
    where
        N::Result: 'static,
        CounterOf<Self>: Owns<N::Result>,
    {
        let layout = Layout::new::<ObjBlock<N::Result, CounterOf<Self>>>();
        let p = self
            .try_alloc(layout)?
            .cast::<ObjBlock<N::Result, CounterOf<Self>>>();
        unsafe {
            p.as_ptr().write(ObjBlock::uninit());
            let data = p.as_ref().data_ptr();
            let guard = DeallocGuard::<Self::Dealloc> {
                ptr: p.as_ptr() as *mut u8,
                layout,
                _0: PhantomData,
            };
            new_in_place.new_in_place(data);
            forget(guard);
            Ok(Shared::from_parts(
                Some(BlockRef::new(p)),
                Some(NonNull::new_unchecked(data)),
            ))
        }
    }
    fn make_shared<T: 'static>(self, value: T) -> Result<Shared<T, Self::Dealloc>, AllocError>
    where
        CounterOf<Self>: Owns<T>,
    {
        self.new_shared(Fixed(value))
    }
    fn make_shared_with<T: 'static, F: FnOnce() -> T>(
        self,
        f: F,
    ) -> Result<Shared<T, Self::Dealloc>, AllocError>
    where
        CounterOf<Self>: Owns<T>,
    {
        self.new_shared(Init(f))
    }
    /// Takes ownership of `ptr`. `deleter(ptr)` runs exactly once: when the last
    /// strong handle goes away, or right away if the block can't be allocated.
    ///
    /// # Safety
    ///
    /// `ptr` must stay valid (or be null) until `deleter` is called.
    unsafe fn shared_from_raw<E: ?Sized + 'static, F: FnOnce(*mut E) + 'static>(
        self,
        ptr: *mut E,
        deleter: F,
    ) -> Result<Shared<E, Self::Dealloc>, AllocError>
    where
        CounterOf<Self>: Owns<E> + Owns<F>,
    {
        let layout = Layout::new::<PtrBlock<E, F, CounterOf<Self>>>();
        match self.try_alloc(layout) {
            Ok(p) => {
                let p = p.cast::<PtrBlock<E, F, CounterOf<Self>>>();
                p.as_ptr().write(PtrBlock::new(ptr, deleter));
                Ok(Shared::from_parts(
                    Some(BlockRef::new(p)),
                    NonNull::new(ptr),
                ))
            }
            Err(e) => {
                deleter(ptr);
                Err(e)
            }
        }
    }
    fn shared_from_box<E: ?Sized + 'static>(
        self,
        value: Box<E>,
    ) -> Result<Shared<E, Self::Dealloc>, AllocError>
    where
        CounterOf<Self>: Owns<E> + Owns<fn(*mut E)>,
    {
        unsafe { self.shared_from_raw::<E, fn(*mut E)>(Box::into_raw(value), box_deleter::<E>) }
    }
}

/// Frees the block if the object constructor unwinds.
struct DeallocGuard<D: Dealloc> {
    ptr: *mut u8,
    layout: Layout,
    _0: PhantomData<D>,
}

impl<D: Dealloc> Drop for DeallocGuard<D> {
    fn drop(&mut self) {
        unsafe { D::dealloc(self.ptr, self.layout) }
    }
}

#[cfg(test)]
mod test {
    use core::cell::Cell;
    use std::{
        panic::{catch_unwind, AssertUnwindSafe},
        rc::Rc,
    };

    use wasm_bindgen_test::wasm_bindgen_test;

    use crate::mem::metered::Metered;

    use super::Manager;

    struct X(Rc<Cell<i32>>);

    impl Drop for X {
        fn drop(&mut self) {
            self.0.set(self.0.get() + 1);
        }
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_make_shared() {
        let metered = Metered::default();
        let i = Rc::new(Cell::new(0));
        {
            let x = metered.make_shared(X(i.clone())).unwrap();
            assert_eq!(x.use_count(), 1);
            assert_eq!(metered.blocks(), 1);
            let y = x.clone();
            drop(x);
            assert_eq!(i.get(), 0);
            assert_eq!(y.0.get(), 0);
        }
        assert_eq!(i.get(), 1);
        assert_eq!(metered.blocks(), 0);
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_make_shared_failure_drops_value() {
        let metered = Metered::with_budget(0);
        let i = Rc::new(Cell::new(0));
        let e = metered.make_shared(X(i.clone())).unwrap_err();
        assert!(e.layout().size() > 0);
        assert_eq!(i.get(), 1);
        assert_eq!(metered.blocks(), 0);
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_make_shared_with_failure_skips_init() {
        let metered = Metered::with_budget(0);
        let mut called = false;
        let r = metered.make_shared_with(|| called = true);
        assert!(r.is_err());
        assert!(!called);
    }

    #[test]
    fn test_make_shared_with_panic_frees_block() {
        let metered = Metered::default();
        let r = catch_unwind(AssertUnwindSafe(|| {
            metered.make_shared_with(|| -> u32 { panic!("constructor failed") })
        }));
        assert!(r.is_err());
        assert_eq!(metered.blocks(), 0);
        assert_eq!(metered.size(), 0);
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_shared_from_raw_failure_runs_deleter() {
        let metered = Metered::with_budget(0);
        let deleted = Rc::new(Cell::new(0));
        let p = Box::into_raw(Box::new(5));
        let r = unsafe {
            let deleted = deleted.clone();
            metered.shared_from_raw(p, move |p| {
                assert_eq!(*p, 5);
                drop(Box::from_raw(p));
                deleted.set(deleted.get() + 1);
            })
        };
        assert!(r.is_err());
        assert_eq!(deleted.get(), 1);
        assert_eq!(Rc::strong_count(&deleted), 1);
        assert_eq!(metered.blocks(), 0);
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_shared_from_box_unsized() {
        let metered = Metered::default();
        let s = metered.shared_from_box::<[u16]>(Box::new([1, 2, 3])).unwrap();
        assert_eq!(&*s, &[1, 2, 3]);
        assert_eq!(s.use_count(), 1);
        drop(s);
        assert_eq!(metered.blocks(), 0);
    }
}
