pub mod block;
pub mod counter;
pub mod error;
pub mod field_layout;
pub mod global;
pub mod manager;
pub mod metered;
pub mod new_in_place;
pub mod shared;
pub mod weak;

use self::{error::AllocError, global::GLOBAL, manager::Manager, shared::Shared};

/// Allocates `value` and its control block in one go.
pub fn make_shared<T: 'static>(value: T) -> Result<Shared<T>, AllocError> {
    GLOBAL.make_shared(value)
}

#[cfg(test)]
mod test {
    use core::mem::size_of;

    use wasm_bindgen_test::wasm_bindgen_test;

    use super::{global::AtomicGlobal, make_shared, shared::Shared, weak::Weak};

    trait Dyn {}

    // (block, element): the block is always a fat pointer
    const _: () = assert!(size_of::<Shared<u32>>() == 3 * size_of::<usize>());
    const _: () = assert!(size_of::<Shared<dyn Dyn>>() == 4 * size_of::<usize>());
    const _: () = assert!(size_of::<Weak<[u8], AtomicGlobal>>() == 4 * size_of::<usize>());

    #[test]
    #[wasm_bindgen_test]
    fn test_make_shared() {
        let s = make_shared(vec![1, 2, 3]).unwrap();
        let w = s.downgrade();
        assert_eq!(s.len(), 3);
        assert_eq!(w.lock().iter().sum::<i32>(), 6);
        drop(s);
        assert!(w.expired());
    }
}
