//! `GlobalAlloc` adapter
use core::{
    alloc::{GlobalAlloc, Layout},
    cell::RefCell,
    ptr::{self, NonNull},
};

use crate::Gmf;

/// [`Gmf`] behind the [`GlobalAlloc`] interface, so that code written against
/// the standard allocator interface can draw memory from a caller-owned pool.
///
/// `ArenaAlloc` is meant for a single thread and is not `Sync`, so it can't be
/// a `#[global_allocator]`.
///
/// Allocations are placed with [`Gmf::allocate_aligned`], so every returned
/// pointer satisfies the requested alignment.
#[derive(Debug)]
pub struct ArenaAlloc<'pool> {
    inner: RefCell<Gmf<'pool>>,
}

impl<'pool> ArenaAlloc<'pool> {
    #[inline]
    pub const fn new(inner: Gmf<'pool>) -> Self {
        Self {
            inner: RefCell::new(inner),
        }
    }

    /// Get the wrapped allocator back.
    #[inline]
    pub fn into_inner(self) -> Gmf<'pool> {
        self.inner.into_inner()
    }

    /// Call `f` with a shared reference to the wrapped allocator.
    ///
    /// # Panics
    ///
    /// Panics if called from inside an allocation function (this can only
    /// happen through `f` itself).
    pub fn with<R>(&self, f: impl FnOnce(&Gmf<'pool>) -> R) -> R {
        f(&self.inner.borrow())
    }

    /// Returns `false`, whatever `other` is. See [`Gmf::is_equal`].
    #[inline]
    pub fn is_equal(&self, _other: &ArenaAlloc<'_>) -> bool {
        false
    }
}

impl PartialEq for ArenaAlloc<'_> {
    /// Allocators are compared by identity.
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        ptr::eq(self, other)
    }
}

impl Eq for ArenaAlloc<'_> {}

unsafe impl GlobalAlloc for ArenaAlloc<'_> {
    #[inline]
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        self.inner
            .borrow_mut()
            .allocate_aligned(layout)
            .map_or(ptr::null_mut(), NonNull::as_ptr)
    }

    #[inline]
    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        if let Some(ptr) = NonNull::new(ptr) {
            self.inner.borrow_mut().deallocate(ptr, layout);
        }
    }

    #[inline]
    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        let Some(old_ptr) = NonNull::new(ptr) else {
            return ptr::null_mut();
        };

        // Resizing in place keeps the (already aligned) address
        if self.inner.borrow_mut().resize_in_place(old_ptr, new_size) {
            return ptr;
        }

        // Safety: `layout.align()` is a power of two, and the size parameter's
        //         validity is upheld by the caller
        let new_layout = Layout::from_size_align_unchecked(new_size, layout.align());
        let new_ptr = self.alloc(new_layout);
        if !new_ptr.is_null() {
            // Safety: The old block is still occupied, so the two don't
            //         overlap
            ptr::copy_nonoverlapping(ptr, new_ptr, layout.size().min(new_size));
            self.dealloc(ptr, layout);
        }
        new_ptr
    }
}
