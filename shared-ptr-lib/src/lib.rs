#![allow(clippy::missing_safety_doc)]
pub mod mem;

pub use mem::{
    error::AllocError,
    global::{AtomicGlobal, Global, ATOMIC_GLOBAL, GLOBAL},
    make_shared,
    manager::{Dealloc, Manager},
    metered::Metered,
    shared::Shared,
    weak::Weak,
};
