//! The allocator core
use core::{alloc::Layout, cmp::Ordering, marker::PhantomData, mem::MaybeUninit, ptr::NonNull};

use crate::{
    index::{FreeSet, OccupiedSet},
    Block, Error,
};

#[doc = svgbobdoc::transform!(
/// The best-fit allocator over a memory pool borrowed for `'pool`.
///
/// # Data Structure Overview
///
/// <center>
/// ```svgbob
///   Pool
///        ,-------+-----------+------+----------------+------------------,
///        |  A0   |    F0     |  A1  |       F1       |        A2        |
///        '-------+-----------+------+----------------+------------------'
///        ^       ^           ^      ^                ^                  ^
///     pool_start                                                     pool_end
///
/// ╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶
///   Free blocks
///
///     by size:    (len F0, front F0) < (len F1, front F1)     "best fit = lower bound"
///     by address: front F0 -> back F0, front F1 -> back F1    "neighbors of a released block"
///
/// ╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶╶
///   Occupied blocks
///
///     by address: front A0 -> back A0, front A1 -> back A1, front A2 -> back A2
/// ```
/// </center>
)]
///
/// # Properties
///
/// The free and occupied blocks always partition the pool exactly. No two
/// free blocks are adjacent: a released block is merged with its free
/// neighbors immediately.
///
/// All bookkeeping is kept outside of the pool, so the allocator never reads
/// or writes the pool's contents except when [`Self::reallocate`] has to move
/// an allocation.
///
/// [`Self::allocate`] ignores alignment: an allocation starts exactly at the
/// front of the block it was carved from. [`Self::allocate_aligned`] may
/// start it further in, leaving free blocks on both sides.
#[derive(Debug)]
pub struct Gmf<'pool> {
    /// The start of the pool. All returned pointers are derived from this.
    base: NonNull<u8>,
    pool: Block,
    free: FreeSet,
    occupied: OccupiedSet,
    _phantom: PhantomData<&'pool mut [MaybeUninit<u8>]>,
}

// Safety: `base` is only used to derive pointers into the pool, which is
//         exclusively borrowed by `Gmf` for `'pool`. Everything else is plain
//         data without interior mutability.
unsafe impl Send for Gmf<'_> {}
unsafe impl Sync for Gmf<'_> {}

impl<'pool> Gmf<'pool> {
    /// Construct an allocator managing the whole of `pool`.
    ///
    /// Fails with [`Error::EmptyPool`] if `pool` is empty.
    ///
    /// # Examples
    ///
    /// ```
    /// use gmf::{Error, Gmf};
    /// use std::mem::MaybeUninit;
    ///
    /// let mut pool = [MaybeUninit::uninit(); 64];
    /// let gmf = Gmf::new(&mut pool).unwrap();
    /// assert_eq!(gmf.free_bytes(), 64);
    ///
    /// assert!(matches!(Gmf::new(&mut []), Err(Error::EmptyPool { .. })));
    /// ```
    ///
    /// The pool must outlive the allocator:
    ///
    /// ```rust,compile_fail
    /// use gmf::Gmf;
    /// use std::mem::MaybeUninit;
    /// let mut pool = [MaybeUninit::uninit(); 64];
    /// let gmf = Gmf::new(&mut pool).unwrap();
    /// drop(pool); // dropping the memory pool first is not allowed
    /// drop(gmf);
    /// ```
    pub fn new(pool: &'pool mut [MaybeUninit<u8>]) -> Result<Self, Error> {
        let start = pool.as_mut_ptr().cast::<u8>();
        let end = start.wrapping_add(pool.len());
        // Safety: `pool` is a mutable reference, which guarantees the absence
        // of aliasing references. Being `'pool` means it will outlive `self`.
        unsafe { Self::from_raw_parts(start, end) }
    }

    /// Construct an allocator managing `start..end`.
    ///
    /// Fails with [`Error::NullPool`] if either bound is null,
    /// [`Error::InvalidBounds`] if `start > end`, and [`Error::EmptyPool`] if
    /// `start == end`.
    ///
    /// # Safety
    ///
    /// `start..end` must be valid for reads and writes for `'pool` and must
    /// not be accessed through any other pointer except for the allocations
    /// handed out by `self`.
    pub unsafe fn from_raw_parts(start: *mut u8, end: *mut u8) -> Result<Self, Error> {
        let base = NonNull::new(start).ok_or(Error::NullPool)?;
        if end.is_null() {
            return Err(Error::NullPool);
        }

        let pool = Block::new(start as usize, end as usize)?;
        if pool.is_empty() {
            return Err(Error::EmptyPool { addr: pool.front() });
        }

        let mut free = FreeSet::new();
        free.insert(pool);

        log::debug!("Gmf::from_raw_parts({:?})", pool);

        Ok(Self {
            base,
            pool,
            free,
            occupied: OccupiedSet::new(),
            _phantom: PhantomData,
        })
    }

    /// Attempt to allocate `layout.size()` bytes.
    ///
    /// The request is served from the smallest free block that is large
    /// enough (the lowest-addressed one if there are several). Whatever the
    /// allocation doesn't use stays free.
    ///
    /// Returns the starting address of the allocated memory block on success;
    /// `None` if `layout.size()` is zero or there's no free block large enough.
    /// Neither case changes the allocator's state.
    ///
    /// `layout.align()` is not taken into account. Use
    /// [`Self::allocate_aligned`] if it matters.
    ///
    /// # Time Complexity
    ///
    /// This method will complete in `O(log n)` time where `n` is the number of
    /// blocks.
    pub fn allocate(&mut self, layout: Layout) -> Option<NonNull<u8>> {
        let size = layout.size();
        if size == 0 {
            log::trace!("Gmf::allocate({:?}): zero-sized", layout);
            return None;
        }

        let Some(block) = self.free.best_fit(size) else {
            log::trace!("Gmf::allocate({:?}): no free block large enough", layout);
            return None;
        };

        let taken = Block::from_bounds_unchecked(block.front(), block.front() + size);
        self.carve(block, taken);
        self.occupied.insert(taken);
        log::trace!("Gmf::allocate({:?}) -> {:?} (from {:?})", layout, taken, block);

        self.debug_check_integrity();
        self.ptr_at(taken.front())
    }

    /// Attempt to allocate `layout.size()` bytes at an address that is a
    /// multiple of `layout.align()`.
    ///
    /// The request is served from the smallest free block that can hold it at
    /// an aligned address (the lowest-addressed one if there are several).
    /// The parts of that block before and after the allocation stay free.
    ///
    /// Returns `None` without changing the allocator's state if
    /// `layout.size()` is zero or no free block can hold the request.
    ///
    /// # Time Complexity
    ///
    /// This method will complete in `O(log n + k)` time where `n` is the
    /// number of blocks and `k` is the number of free blocks shorter than
    /// `layout.size() + layout.align() - 1` bytes.
    pub fn allocate_aligned(&mut self, layout: Layout) -> Option<NonNull<u8>> {
        let size = layout.size();
        if size == 0 {
            log::trace!("Gmf::allocate_aligned({:?}): zero-sized", layout);
            return None;
        }

        let Some((block, start)) = self.free.best_fit_aligned(size, layout.align()) else {
            log::trace!(
                "Gmf::allocate_aligned({:?}): no free block large enough",
                layout
            );
            return None;
        };

        let taken = Block::from_bounds_unchecked(start, start + size);
        self.carve(block, taken);
        self.occupied.insert(taken);
        log::trace!(
            "Gmf::allocate_aligned({:?}) -> {:?} (from {:?})",
            layout,
            taken,
            block
        );

        self.debug_check_integrity();
        self.ptr_at(taken.front())
    }

    /// Deallocate a previously allocated memory block.
    ///
    /// The block's extent is taken from the allocator's own records, so
    /// `layout` is informational only.
    ///
    /// `ptr` not being the start of an outstanding allocation (because it was
    /// already released, or never came from `self`) is silently ignored. Use
    /// [`Self::try_deallocate`] to find out about it.
    ///
    /// # Time Complexity
    ///
    /// This method will complete in `O(log n)` time where `n` is the number of
    /// blocks.
    pub fn deallocate(&mut self, ptr: NonNull<u8>, layout: Layout) {
        match self.try_deallocate(ptr) {
            Ok(block) => {
                log::trace!("Gmf::deallocate({:?}, {:?}) -> {:?}", ptr, layout, block)
            }
            Err(e) => log::debug!("Gmf::deallocate({:?}, {:?}): ignored: {}", ptr, layout, e),
        }
    }

    /// Deallocate a previously allocated memory block, failing with
    /// [`Error::UnknownAllocation`] if `ptr` is not the start of an outstanding
    /// allocation. A failed call doesn't change the allocator's state.
    ///
    /// Returns the free block the released memory ended up in, i.e., the
    /// released block merged with its free neighbors.
    pub fn try_deallocate(&mut self, ptr: NonNull<u8>) -> Result<Block, Error> {
        let addr = ptr.as_ptr() as usize;
        let block = self
            .occupied
            .remove(addr)
            .ok_or(Error::UnknownAllocation { addr })?;

        let merged = self.release(block);

        self.debug_check_integrity();
        Ok(merged)
    }

    /// Shrink or grow a previously allocated memory block.
    ///
    /// The block is resized in place if possible: shrinking always is, growing
    /// is if the block is immediately followed by a free block with enough
    /// room. Otherwise, the block is moved to the best-fitting free block and
    /// its first `min(old_size, new_size)` bytes are copied over.
    ///
    /// Returns the new starting address of the memory block on success;
    /// `None` otherwise, in which case the original allocation is left as it
    /// was. A zero `new_layout.size()` or a `ptr` that isn't the start of an
    /// outstanding allocation makes this method fail.
    ///
    /// # Time Complexity
    ///
    /// Unlike other methods, this method will complete in linear time
    /// (`O(old_size)`) if the block has to be moved.
    ///
    /// # Safety
    ///
    /// The contents of the memory block may be moved, so no reference to it
    /// may be live during the call, and pointers derived from `ptr` must not
    /// be used after a successful call.
    pub unsafe fn reallocate(
        &mut self,
        ptr: NonNull<u8>,
        new_layout: Layout,
    ) -> Option<NonNull<u8>> {
        let addr = ptr.as_ptr() as usize;
        let new_size = new_layout.size();
        if new_size == 0 {
            log::trace!("Gmf::reallocate({:?}, {:?}): zero-sized", ptr, new_layout);
            return None;
        }

        let block = self.occupied.get(addr)?;
        let old_size = block.len();

        let new_ptr = if self.resize_block(block, new_size) {
            Some(ptr)
        } else if let Some(new_ptr) = self.relocate(block, new_size) {
            // Safety: Both ranges lie in the pool, which we have exclusive
            //         access to, and the new block is at least `old_size`
            //         bytes long. They might overlap.
            core::ptr::copy(ptr.as_ptr(), new_ptr.as_ptr(), old_size);
            Some(new_ptr)
        } else {
            None
        };

        log::trace!(
            "Gmf::reallocate({:?}, {:?}) -> {:?}",
            ptr,
            new_layout,
            new_ptr
        );
        self.debug_check_integrity();
        new_ptr
    }

    /// Shrink or grow a previously allocated memory block without moving it.
    ///
    /// Shrinking always succeeds. Growing succeeds if the block is immediately
    /// followed by a free block with enough room.
    ///
    /// Returns `false` without changing anything if the block couldn't be
    /// resized, `new_size` is zero, or `ptr` is not the start of an outstanding
    /// allocation.
    pub fn resize_in_place(&mut self, ptr: NonNull<u8>, new_size: usize) -> bool {
        let resized = new_size != 0
            && self
                .occupied
                .get(ptr.as_ptr() as usize)
                .is_some_and(|block| self.resize_block(block, new_size));

        log::trace!(
            "Gmf::resize_in_place({:?}, {}) -> {}",
            ptr,
            new_size,
            resized
        );
        self.debug_check_integrity();
        resized
    }

    /// Resize the occupied `block` to `new_size` (non-zero) bytes in place.
    fn resize_block(&mut self, block: Block, new_size: usize) -> bool {
        match new_size.cmp(&block.len()) {
            Ordering::Equal => true,
            Ordering::Less => {
                self.shrink(block, new_size);
                true
            }
            Ordering::Greater => self.grow_in_place(block, new_size),
        }
    }

    /// A subroutine of [`Self::resize_block`]. Give the tail of `block` beyond
    /// `new_size` bytes back to the free set.
    fn shrink(&mut self, block: Block, new_size: usize) {
        let (kept, tail) = block
            .split_at(new_size)
            .unwrap_or_else(|| unreachable!());
        self.occupied.remove(block.front());
        self.occupied.insert(kept);
        self.release(tail);
    }

    /// A subroutine of [`Self::resize_block`]. Attempt to extend `block` into
    /// the free block that immediately follows it.
    fn grow_in_place(&mut self, block: Block, new_size: usize) -> bool {
        let grow_by = new_size - block.len();
        let Some(next) = self
            .free
            .after(block.front())
            .filter(|next| block.touches_right(next) && next.len() >= grow_by)
        else {
            return false;
        };

        let grown = Block::from_bounds_unchecked(block.front(), block.front() + new_size);
        self.carve(next, Block::from_bounds_unchecked(block.back(), grown.back()));
        self.occupied.remove(block.front());
        self.occupied.insert(grown);
        true
    }

    /// A subroutine of [`Self::reallocate`]. Release `block` and allocate
    /// `new_size` bytes elsewhere. If that fails, `block` is reinstated exactly
    /// and `None` is returned.
    fn relocate(&mut self, block: Block, new_size: usize) -> Option<NonNull<u8>> {
        self.occupied.remove(block.front());
        let hole = self.release(block);

        if let Some(target) = self.free.best_fit(new_size) {
            let taken = Block::from_bounds_unchecked(target.front(), target.front() + new_size);
            self.carve(target, taken);
            self.occupied.insert(taken);
            self.ptr_at(taken.front())
        } else {
            // `hole` is the merged free block that `block` was released into
            self.carve(hole, block);
            self.occupied.insert(block);
            None
        }
    }

    /// Remove `taken` from the free block `block` that encloses it. Any part
    /// of `block` before or after `taken` remains free.
    ///
    /// `taken` is not added to any index.
    fn carve(&mut self, block: Block, taken: Block) {
        debug_assert!(block.encloses(&taken));
        debug_assert!(!taken.is_empty());

        self.free.remove(block);

        if block.front() < taken.front() {
            self.free
                .insert(Block::from_bounds_unchecked(block.front(), taken.front()));
        }
        if taken.back() < block.back() {
            self.free
                .insert(Block::from_bounds_unchecked(taken.back(), block.back()));
        }
    }

    /// Add `block`, which is in neither index, to the free set, merging it with
    /// its free neighbors.
    ///
    /// Returns the resulting free block.
    fn release(&mut self, block: Block) -> Block {
        let mut merged = block;

        if let Some(left) = self
            .free
            .before(block.front())
            .filter(|left| block.touches_left(left))
        {
            log::trace!("merging {:?} into {:?}", left, block);
            self.free.remove(left);
            merged = merged.merge(left);
        }

        if let Some(right) = self
            .free
            .after(block.front())
            .filter(|right| block.touches_right(right))
        {
            log::trace!("merging {:?} into {:?}", right, block);
            self.free.remove(right);
            merged = merged.merge(right);
        }

        self.free.insert(merged);
        merged
    }

    #[inline]
    fn ptr_at(&self, addr: usize) -> Option<NonNull<u8>> {
        debug_assert!(self.pool.contains(addr));
        NonNull::new(self.base.as_ptr().wrapping_add(addr - self.pool.front()))
    }

    /// The managed memory pool.
    #[inline]
    pub fn pool(&self) -> Block {
        self.pool
    }

    /// The total number of bytes in free blocks.
    pub fn free_bytes(&self) -> usize {
        self.free.iter().map(|block| block.len()).sum()
    }

    /// The total number of bytes in occupied blocks.
    pub fn occupied_bytes(&self) -> usize {
        self.occupied.iter().map(|block| block.len()).sum()
    }

    /// The longest free block, i.e., the largest request that can currently
    /// succeed.
    #[inline]
    pub fn largest_free_block(&self) -> Option<Block> {
        self.free.largest()
    }

    /// Iterate over the free blocks in address order.
    pub fn free_blocks(&self) -> impl Iterator<Item = Block> + '_ {
        self.free.iter()
    }

    /// Iterate over the occupied blocks in address order.
    pub fn occupied_blocks(&self) -> impl Iterator<Item = Block> + '_ {
        self.occupied.iter()
    }

    /// Get the size of the allocation starting at `ptr`, or `None` if `ptr` is
    /// not the start of an outstanding allocation.
    #[inline]
    pub fn usable_size(&self, ptr: NonNull<u8>) -> Option<usize> {
        self.occupied
            .get(ptr.as_ptr() as usize)
            .map(|block| block.len())
    }

    /// Returns `false`, whatever `other` is.
    ///
    /// Memory allocated from one allocator can never be released through
    /// another one, even if both manage the same bytes.
    #[inline]
    pub fn is_equal(&self, _other: &Gmf<'_>) -> bool {
        false
    }

    /// Assert that the free and occupied blocks partition the pool exactly,
    /// that no two free blocks are adjacent, and that the free-block indices
    /// agree with each other.
    ///
    /// # Panics
    ///
    /// Panics if any of the above doesn't hold, which indicates a bug in this
    /// crate.
    pub fn check_integrity(&self) {
        self.free.check_consistency();

        let mut free = self.free.iter().peekable();
        let mut occupied = self.occupied.iter().peekable();
        let mut cursor = self.pool.front();
        let mut prev_is_free = false;
        let mut num_blocks = 0;

        loop {
            let is_free = match (free.peek(), occupied.peek()) {
                (Some(f), Some(o)) => f.front() < o.front(),
                (Some(_), None) => true,
                (None, Some(_)) => false,
                (None, None) => break,
            };
            let block = if is_free { free.next() } else { occupied.next() }
                .unwrap_or_else(|| unreachable!());

            assert!(!block.is_empty(), "{:?} is empty", block);
            assert_eq!(
                block.front(),
                cursor,
                "{:?} does not start where the previous block ends",
                block
            );
            assert!(
                !(is_free && prev_is_free),
                "{:?} is free and not merged with its predecessor",
                block
            );

            cursor = block.back();
            prev_is_free = is_free;
            num_blocks += 1;
        }

        assert_eq!(cursor, self.pool.back(), "the pool is not fully covered");
        assert_eq!(num_blocks, self.free.len() + self.occupied.len());
    }

    /// Run [`Self::check_integrity`] after a mutation. Only this crate's own
    /// unit tests pay for it.
    #[inline]
    fn debug_check_integrity(&self) {
        #[cfg(test)]
        self.check_integrity();
    }
}

impl PartialEq for Gmf<'_> {
    /// Allocators are compared by identity.
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        core::ptr::eq(self, other)
    }
}

impl Eq for Gmf<'_> {}
