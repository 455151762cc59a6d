use core::alloc::Layout;

use thiserror::Error;

/// The manager couldn't provide storage for a control block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error(
    "failed to allocate a control block of {} bytes (align {})",
    .layout.size(),
    .layout.align()
)]
pub struct AllocError {
    layout: Layout,
}

impl AllocError {
    #[inline(always)]
    pub const fn new(layout: Layout) -> Self {
        Self { layout }
    }
    #[inline(always)]
    pub const fn layout(&self) -> Layout {
        self.layout
    }
}
