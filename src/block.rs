//! Half-open address ranges
use core::{fmt, ops::Range};

use crate::Error;

/// A contiguous half-open byte range `[front, back)`, either free or occupied.
///
/// Addresses are plain integers here. A `Block` never dereferences them, so
/// it's also usable to describe ranges that aren't backed by memory at all.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Block {
    front: usize,
    back: usize,
}

impl Block {
    /// Construct a `Block` spanning `front..back`.
    ///
    /// Fails with [`Error::InvalidBounds`] if `front > back`.
    ///
    /// # Examples
    ///
    /// ```
    /// use gmf::{Block, Error};
    /// assert_eq!(Block::new(0x10, 0x30).unwrap().len(), 0x20);
    /// assert_eq!(
    ///     Block::new(0x30, 0x10),
    ///     Err(Error::InvalidBounds { front: 0x30, back: 0x10 }),
    /// );
    /// ```
    #[inline]
    pub const fn new(front: usize, back: usize) -> Result<Self, Error> {
        if front > back {
            Err(Error::InvalidBounds { front, back })
        } else {
            Ok(Self { front, back })
        }
    }

    /// Construct a `Block` without checking `front <= back`.
    ///
    /// Used to rebuild blocks from index entries, which were all created from
    /// valid `Block`s.
    #[inline]
    pub(crate) const fn from_bounds_unchecked(front: usize, back: usize) -> Self {
        debug_assert!(front <= back);
        Self { front, back }
    }

    /// Construct a `Block` of `len` bytes starting at `front`.
    ///
    /// Fails with [`Error::InvalidBounds`] if the end address overflows.
    #[inline]
    pub fn with_len(front: usize, len: usize) -> Result<Self, Error> {
        match front.checked_add(len) {
            Some(back) => Self::new(front, back),
            None => Err(Error::InvalidBounds {
                front,
                back: front.wrapping_add(len),
            }),
        }
    }

    /// The address of the first byte (inclusive).
    #[inline]
    pub const fn front(&self) -> usize {
        self.front
    }

    /// The address one past the last byte (exclusive).
    #[inline]
    pub const fn back(&self) -> usize {
        self.back
    }

    /// The number of bytes in the block.
    #[inline]
    pub const fn len(&self) -> usize {
        self.back - self.front
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.front == self.back
    }

    /// Returns `true` if `other` ends exactly where `self` begins.
    #[inline]
    pub const fn touches_left(&self, other: &Self) -> bool {
        self.front == other.back
    }

    /// Returns `true` if `other` begins exactly where `self` ends.
    #[inline]
    pub const fn touches_right(&self, other: &Self) -> bool {
        self.back == other.front
    }

    #[inline]
    pub const fn contains(&self, addr: usize) -> bool {
        self.front <= addr && addr < self.back
    }

    /// Returns `true` if `other` lies entirely within `self`.
    #[inline]
    pub const fn encloses(&self, other: &Self) -> bool {
        self.front <= other.front && other.back <= self.back
    }

    /// Cut the block into `[front, front + len)` and `[front + len, back)`.
    ///
    /// Returns `None` if `len` exceeds [`Self::len`].
    #[inline]
    pub const fn split_at(&self, len: usize) -> Option<(Self, Self)> {
        if len > self.len() {
            return None;
        }
        let mid = self.front + len;
        Some((
            Self {
                front: self.front,
                back: mid,
            },
            Self {
                front: mid,
                back: self.back,
            },
        ))
    }

    /// The smallest block spanning both `self` and `other`.
    ///
    /// The caller is responsible for making sure there's no gap between them;
    /// this is only meaningful for touching blocks.
    #[inline]
    pub(crate) fn merge(self, other: Self) -> Self {
        debug_assert!(self.touches_left(&other) || self.touches_right(&other));
        Self {
            front: self.front.min(other.front),
            back: self.back.max(other.back),
        }
    }

    #[inline]
    pub const fn range(&self) -> Range<usize> {
        self.front..self.back
    }
}

impl fmt::Debug for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}..{:#x}", self.front, self.back)
    }
}

impl From<Block> for Range<usize> {
    #[inline]
    fn from(x: Block) -> Self {
        x.range()
    }
}

impl TryFrom<Range<usize>> for Block {
    type Error = Error;

    #[inline]
    fn try_from(x: Range<usize>) -> Result<Self, Error> {
        Self::new(x.start, x.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_reversed_bounds() {
        assert_eq!(
            Block::new(8, 4),
            Err(Error::InvalidBounds { front: 8, back: 4 })
        );
        assert!(Block::new(4, 4).unwrap().is_empty());
    }

    #[test]
    fn with_len_overflow() {
        assert!(Block::with_len(usize::MAX, 1).is_err());
        assert_eq!(Block::with_len(16, 4).unwrap(), Block::new(16, 20).unwrap());
    }

    #[test]
    fn adjacency() {
        let a = Block::new(0, 16).unwrap();
        let b = Block::new(16, 40).unwrap();
        let c = Block::new(41, 50).unwrap();

        assert!(b.touches_left(&a));
        assert!(a.touches_right(&b));
        assert!(!a.touches_left(&b));
        assert!(!b.touches_right(&c));
        assert!(!c.touches_left(&b));

        assert_eq!(a.merge(b), Block::new(0, 40).unwrap());
        assert_eq!(b.merge(a), Block::new(0, 40).unwrap());
    }

    #[test]
    fn split() {
        let a = Block::new(100, 150).unwrap();
        let (head, tail) = a.split_at(20).unwrap();
        assert_eq!(head, Block::new(100, 120).unwrap());
        assert_eq!(tail, Block::new(120, 150).unwrap());
        assert!(head.touches_right(&tail));

        let (head, tail) = a.split_at(50).unwrap();
        assert_eq!(head, a);
        assert!(tail.is_empty());

        assert_eq!(a.split_at(51), None);
    }

    #[test]
    fn containment() {
        let a = Block::new(100, 150).unwrap();
        assert!(a.contains(100));
        assert!(a.contains(149));
        assert!(!a.contains(150));
        assert!(a.encloses(&Block::new(110, 150).unwrap()));
        assert!(!a.encloses(&Block::new(90, 110).unwrap()));
    }
}
