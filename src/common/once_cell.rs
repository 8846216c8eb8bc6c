use parking_lot::Once;
use std::{cell::UnsafeCell, mem::MaybeUninit, ops::Deref};

/// Value built on first access, for use in `static` items.
///
/// The value is never dropped.
pub(crate) struct Lazy<T> {
    once: Once,
    cell: UnsafeCell<MaybeUninit<T>>,
    init: fn() -> T,
}

// the cell is written exactly once under `Once`, every other access is a shared read
unsafe impl<T: Send + Sync> Sync for Lazy<T> {}

impl<T> Lazy<T> {
    pub(crate) const fn new(init: fn() -> T) -> Self {
        Self {
            once: Once::new(),
            cell: UnsafeCell::new(MaybeUninit::uninit()),
            init,
        }
    }

    pub(crate) fn force(&self) -> &T {
        self.once.call_once(|| {
            unsafe { &mut *self.cell.get() }.write((self.init)());
        });
        unsafe { (*self.cell.get()).assume_init_ref() }
    }
}

impl<T> Deref for Lazy<T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.force()
    }
}
