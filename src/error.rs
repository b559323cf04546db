/// The error type returned by fallible operations of this crate.
///
/// Running out of memory isn't one of them. [`Gmf::allocate`] reports that by
/// returning `None`, like any other allocator.
///
/// [`Gmf::allocate`]: crate::Gmf::allocate
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// A block's front address lies past its back address.
    #[error("block front {front:#x} lies past its back {back:#x}")]
    InvalidBounds { front: usize, back: usize },

    /// One of the pool bounds is a null pointer.
    #[error("memory pool bound is null")]
    NullPool,

    /// The pool doesn't contain a single byte.
    #[error("memory pool at {addr:#x} is empty")]
    EmptyPool { addr: usize },

    /// The address being released doesn't start an outstanding allocation.
    #[error("{addr:#x} is not the start of an occupied block")]
    UnknownAllocation { addr: usize },
}

#[cfg(any(test, feature = "std"))]
#[cfg_attr(feature = "doc_cfg", doc(cfg(feature = "std")))]
impl From<Error> for std::io::Error {
    /// Every variant describes a bad argument, so they all map to
    /// [`std::io::ErrorKind::InvalidInput`].
    fn from(e: Error) -> Self {
        std::io::Error::new(std::io::ErrorKind::InvalidInput, e)
    }
}
