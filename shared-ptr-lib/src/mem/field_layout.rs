use core::{
    alloc::Layout,
    marker::PhantomData,
    mem::{align_of, size_of},
};

/// Placement of a `T` prefix in front of an adjacent `A` region.
pub struct FieldLayout<T, A> {
    pub align: usize,
    pub size: usize,
    _0: PhantomData<(T, A)>,
}

const fn max(a: usize, b: usize) -> usize {
    if a > b {
        a
    } else {
        b
    }
}

impl<T, A> FieldLayout<T, A> {
    pub const fn align_to(adjacent_align: usize) -> FieldLayout<T, A> {
        assert!(adjacent_align.is_power_of_two());
        assert!(adjacent_align >= align_of::<A>());
        FieldLayout {
            align: max(align_of::<T>(), adjacent_align),
            size: {
                let mask = adjacent_align - 1;
                (size_of::<T>() + mask) & !mask
            },
            _0: PhantomData,
        }
    }
    /// The layout of the prefix together with `adjacent_size` bytes of `A`.
    pub const fn layout(&self, adjacent_size: usize) -> Layout {
        unsafe { Layout::from_size_align_unchecked(self.size + adjacent_size, self.align) }
    }
    #[inline(always)]
    pub unsafe fn to_adjacent(&self, p: *mut T) -> *mut A {
        (p as *mut u8).add(self.size) as *mut A
    }
    #[inline(always)]
    pub unsafe fn from_adjacent(&self, p: *mut A) -> *mut T {
        (p as *mut u8).sub(self.size) as *mut T
    }
}

#[cfg(test)]
mod test {
    use core::mem::size_of;

    use wasm_bindgen_test::wasm_bindgen_test;

    use super::FieldLayout;

    const _P_1: FieldLayout<usize, u8> = FieldLayout::align_to(1);
    const _: () = assert!(_P_1.size == size_of::<usize>());

    const _P_16: FieldLayout<u32, u8> = FieldLayout::align_to(16);
    const _: () = assert!(_P_16.align == 16 && _P_16.size == 16);

    const _P_3: FieldLayout<[u8; 3], u16> = FieldLayout::align_to(2);
    const _: () = assert!(_P_3.align == 2 && _P_3.size == 4);

    #[test]
    #[wasm_bindgen_test]
    fn test_round_trip() {
        let fl = FieldLayout::<u16, u64>::align_to(8);
        let mut buffer = [0u64; 3];
        let prefix = buffer.as_mut_ptr() as *mut u16;
        unsafe {
            let adjacent = fl.to_adjacent(prefix);
            assert_eq!(adjacent as usize - prefix as usize, 8);
            assert_eq!(fl.from_adjacent(adjacent), prefix);
        }
        assert_eq!(fl.layout(16).size(), 24);
        assert_eq!(fl.layout(16).align(), 8);
    }

    #[test]
    #[should_panic]
    #[wasm_bindgen_test]
    fn test_invalid_align() {
        FieldLayout::<u32, u8>::align_to(6);
    }

    #[test]
    #[should_panic]
    #[wasm_bindgen_test]
    fn test_align_below_adjacent() {
        FieldLayout::<u8, u32>::align_to(2);
    }
}
