//! The ordered indices backing the allocator
use alloc::collections::{BTreeMap, BTreeSet};
use core::ops::Bound;

use crate::Block;

/// The set of free blocks, indexed both by size and by address.
///
/// Both indices always describe the same set of blocks. They are only ever
/// updated together through [`Self::insert`] and [`Self::remove`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct FreeSet {
    /// `(len, front)` for every free block. Ordering by `len` first makes the
    /// lower bound of `(n, 0)` the smallest block at least `n` bytes long;
    /// `front` makes each entry unique and breaks ties by lowest address.
    by_size: BTreeSet<(usize, usize)>,
    /// `front → back` for every free block. Free blocks never overlap, so
    /// `front` is unique.
    by_addr: BTreeMap<usize, usize>,
}

impl FreeSet {
    #[inline]
    pub const fn new() -> Self {
        Self {
            by_size: BTreeSet::new(),
            by_addr: BTreeMap::new(),
        }
    }

    /// Add `block` to both indices.
    pub fn insert(&mut self, block: Block) {
        debug_assert!(!block.is_empty());
        let fresh = self.by_size.insert((block.len(), block.front()));
        debug_assert!(fresh, "{:?} is already in the size index", block);
        let old = self.by_addr.insert(block.front(), block.back());
        debug_assert!(old.is_none(), "{:?} is already in the address index", block);
    }

    /// Remove `block` from both indices.
    pub fn remove(&mut self, block: Block) {
        let found = self.by_size.remove(&(block.len(), block.front()));
        debug_assert!(found, "{:?} is not in the size index", block);
        let back = self.by_addr.remove(&block.front());
        debug_assert_eq!(back, Some(block.back()));
    }

    /// Find the smallest free block that is at least `size` bytes long.
    /// Among equally long blocks, the one with the lowest address wins.
    pub fn best_fit(&self, size: usize) -> Option<Block> {
        self.by_size
            .range((size, 0)..)
            .next()
            .map(|&(len, front)| Block::from_bounds_unchecked(front, front + len))
    }

    /// Find the smallest free block that can hold `size` bytes starting at a
    /// multiple of `align`, and that starting address. Among equally long
    /// blocks, the one with the lowest address wins.
    ///
    /// Only blocks shorter than `size + align - 1` can be rejected, so the
    /// search visits at most those blocks plus one.
    pub fn best_fit_aligned(&self, size: usize, align: usize) -> Option<(Block, usize)> {
        debug_assert!(align.is_power_of_two());
        self.by_size.range((size, 0)..).find_map(|&(len, front)| {
            let back = front + len;
            let start = front.checked_next_multiple_of(align)?;
            (start.checked_add(size)? <= back)
                .then(|| (Block::from_bounds_unchecked(front, back), start))
        })
    }

    /// The free block with the greatest address strictly below `addr`.
    pub fn before(&self, addr: usize) -> Option<Block> {
        self.by_addr
            .range(..addr)
            .next_back()
            .map(|(&front, &back)| Block::from_bounds_unchecked(front, back))
    }

    /// The free block with the smallest address strictly above `addr`.
    pub fn after(&self, addr: usize) -> Option<Block> {
        self.by_addr
            .range((Bound::Excluded(addr), Bound::Unbounded))
            .next()
            .map(|(&front, &back)| Block::from_bounds_unchecked(front, back))
    }

    /// The longest free block. Ties are broken by highest address.
    pub fn largest(&self) -> Option<Block> {
        self.by_size
            .iter()
            .next_back()
            .map(|&(len, front)| Block::from_bounds_unchecked(front, front + len))
    }

    /// Iterate over the free blocks in address order.
    pub fn iter(&self) -> impl Iterator<Item = Block> + '_ {
        self.by_addr
            .iter()
            .map(|(&front, &back)| Block::from_bounds_unchecked(front, back))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.by_addr.len()
    }

    /// Assert that both indices contain exactly the same blocks.
    pub fn check_consistency(&self) {
        assert_eq!(self.by_size.len(), self.by_addr.len());
        for (&front, &back) in self.by_addr.iter() {
            assert!(
                self.by_size.contains(&(back - front, front)),
                "{:#x}..{:#x} is missing from the size index",
                front,
                back
            );
        }
    }
}

/// The set of occupied blocks, indexed by address.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct OccupiedSet {
    by_addr: BTreeMap<usize, usize>,
}

impl OccupiedSet {
    #[inline]
    pub const fn new() -> Self {
        Self {
            by_addr: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, block: Block) {
        let old = self.by_addr.insert(block.front(), block.back());
        debug_assert!(old.is_none(), "{:#x} is already occupied", block.front());
    }

    /// Look up the occupied block starting exactly at `addr`.
    pub fn get(&self, addr: usize) -> Option<Block> {
        self.by_addr
            .get(&addr)
            .map(|&back| Block::from_bounds_unchecked(addr, back))
    }

    /// Remove and return the occupied block starting exactly at `addr`.
    pub fn remove(&mut self, addr: usize) -> Option<Block> {
        self.by_addr
            .remove(&addr)
            .map(|back| Block::from_bounds_unchecked(addr, back))
    }

    pub fn iter(&self) -> impl Iterator<Item = Block> + '_ {
        self.by_addr
            .iter()
            .map(|(&front, &back)| Block::from_bounds_unchecked(front, back))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.by_addr.len()
    }
}

#[cfg(test)]
mod tests;
