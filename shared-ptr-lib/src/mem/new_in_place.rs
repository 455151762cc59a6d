/// Builds an object directly in the storage of its control block.
pub trait NewInPlace {
    type Result;
    unsafe fn new_in_place(self, p: *mut Self::Result);
}

/// Moves a ready value into the block.
#[derive(Debug)]
pub struct Fixed<T>(pub T);

impl<T> NewInPlace for Fixed<T> {
    type Result = T;
    #[inline(always)]
    unsafe fn new_in_place(self, p: *mut T) {
        p.write(self.0)
    }
}

/// Runs the closure after the block is allocated and stores its result.
#[derive(Debug)]
pub struct Init<F>(pub F);

impl<T, F: FnOnce() -> T> NewInPlace for Init<F> {
    type Result = T;
    #[inline(always)]
    unsafe fn new_in_place(self, p: *mut T) {
        p.write((self.0)())
    }
}
