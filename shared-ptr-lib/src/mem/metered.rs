use core::{alloc::Layout, cell::Cell, ptr::null_mut};
use std::rc::Rc;

use super::{
    field_layout::FieldLayout,
    global::{Global, GLOBAL},
    manager::{Dealloc, Manager},
};

#[derive(Debug, Default)]
struct Meter {
    blocks: Cell<usize>,
    size: Cell<usize>,
    budget: Cell<Option<usize>>,
}

/// A manager that keeps track of live blocks and can run out of allocations.
///
/// Every block is prefixed with a strong pointer to its meter, so blocks may
/// outlive the `Metered` value they were allocated from.
#[derive(Debug, Default, Clone)]
pub struct Metered(Rc<Meter>);

type Prefix = *const Meter;

type PrefixLayout = FieldLayout<Prefix, u8>;

impl Metered {
    /// Fails every allocation after the first `allocations`.
    pub fn with_budget(allocations: usize) -> Self {
        let result = Self::default();
        result.set_budget(Some(allocations));
        result
    }
    pub fn set_budget(&self, allocations: Option<usize>) {
        self.0.budget.set(allocations)
    }
    /// Number of live blocks.
    pub fn blocks(&self) -> usize {
        self.0.blocks.get()
    }
    /// Bytes held by live blocks, prefixes included.
    pub fn size(&self) -> usize {
        self.0.size.get()
    }
    fn layout(block_layout: Layout) -> (PrefixLayout, Layout) {
        let prefix_layout = PrefixLayout::align_to(block_layout.align());
        let layout = prefix_layout.layout(block_layout.size());
        (prefix_layout, layout)
    }
}

#[derive(Debug)]
pub struct MeteredDealloc();

impl Dealloc for MeteredDealloc {
    type Counter = Cell<usize>;
    unsafe fn dealloc(block_p: *mut u8, block_layout: Layout) {
        let (prefix_layout, layout) = Metered::layout(block_layout);
        let p = prefix_layout.from_adjacent(block_p);
        {
            let meter = Rc::from_raw(*p);
            meter.blocks.set(meter.blocks.get() - 1);
            meter.size.set(meter.size.get() - layout.size());
        }
        Global::dealloc(p as *mut u8, layout);
    }
}

impl Manager for &Metered {
    type Dealloc = MeteredDealloc;
    unsafe fn alloc(self, block_layout: Layout) -> *mut u8 {
        let meter = &*self.0;
        if let Some(budget) = meter.budget.get() {
            if budget == 0 {
                return null_mut();
            }
            meter.budget.set(Some(budget - 1));
        }
        let (prefix_layout, layout) = Metered::layout(block_layout);
        let p = GLOBAL.alloc(layout) as *mut Prefix;
        if p.is_null() {
            return null_mut();
        }
        p.write(Rc::into_raw(self.0.clone()));
        meter.blocks.set(meter.blocks.get() + 1);
        meter.size.set(meter.size.get() + layout.size());
        prefix_layout.to_adjacent(p)
    }
}

#[cfg(test)]
mod test {
    use core::{alloc::Layout, cell::Cell, mem::size_of};

    use wasm_bindgen_test::wasm_bindgen_test;

    use crate::mem::{block::obj_block::ObjBlock, manager::Manager};

    use super::Metered;

    #[test]
    #[wasm_bindgen_test]
    fn test() {
        let metered = Metered::default();
        {
            let x = metered.make_shared(42u64).unwrap();
            assert_eq!(*x, 42);
            assert_eq!(metered.blocks(), 1);
            let block = Layout::new::<ObjBlock<u64, Cell<usize>>>();
            let prefix = (size_of::<usize>() + block.align() - 1) & !(block.align() - 1);
            assert_eq!(metered.size(), prefix + block.size());
        }
        assert_eq!(metered.blocks(), 0);
        assert_eq!(metered.size(), 0);
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_budget() {
        let metered = Metered::with_budget(2);
        let a = metered.make_shared(1).unwrap();
        let b = metered.make_shared(2).unwrap();
        assert!(metered.make_shared(3).is_err());
        assert_eq!(metered.blocks(), 2);
        // freeing a block doesn't refill the budget
        drop(a);
        assert!(metered.make_shared(4).is_err());
        metered.set_budget(None);
        let c = metered.make_shared(5).unwrap();
        assert_eq!(*b + *c, 7);
        assert_eq!(metered.blocks(), 2);
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_blocks_outlive_metered() {
        let metered = Metered::default();
        let x = metered.make_shared(String::from("kept")).unwrap();
        let observer = metered.clone();
        drop(metered);
        assert_eq!(observer.blocks(), 1);
        drop(x);
        assert_eq!(observer.blocks(), 0);
    }
}
