//! This crate implements a general-purpose, minimal-fragmentation memory
//! allocator for a memory pool provided by an application.
//!
//!  - **Best fit.** Every request is served from the smallest free block that
//!    is large enough, and the unused tail of that block goes straight back
//!    into the free set.
//!
//!  - **Immediate coalescing.** A released block is merged with its free
//!    neighbors on the spot, so two adjacent free blocks never coexist.
//!
//!  - **The memory pool is provided by an application.** The allocator
//!    borrows it for its whole lifetime and only touches its contents when
//!    moving an allocation. All bookkeeping lives in ordered indices
//!    allocated through [`alloc`], which means allocation and deallocation
//!    complete in `O(log n)` time where `n` is the number of blocks.
//!
//!  - **This crate supports `#![no_std]`** (it needs `alloc`, though).
//!
//! # Examples
//!
//! ## `Gmf`: Core API
//!
//! ```rust
//! use gmf::Gmf;
//! use std::{alloc::Layout, mem::MaybeUninit};
//!
//! let mut pool = [MaybeUninit::uninit(); 1024];
//! let mut gmf = Gmf::new(&mut pool).unwrap();
//!
//! let ptr1 = gmf.allocate(Layout::new::<u64>()).unwrap();
//! let ptr2 = gmf.allocate(Layout::new::<u64>()).unwrap();
//! assert_eq!(gmf.occupied_bytes(), 16);
//!
//! gmf.deallocate(ptr1, Layout::new::<u64>());
//! gmf.deallocate(ptr2, Layout::new::<u64>());
//!
//! // Both blocks were merged back into the remainder of the pool
//! assert_eq!(gmf.free_blocks().count(), 1);
//! assert_eq!(gmf.free_bytes(), 1024);
//! ```
//!
//! ## `ArenaAlloc`: `GlobalAlloc` adapter
//!
//! ```rust
//! use gmf::{ArenaAlloc, Gmf};
//! use std::{alloc::{GlobalAlloc, Layout}, mem::MaybeUninit};
//!
//! #[repr(align(16))]
//! struct Pool([MaybeUninit<u8>; 1040]);
//!
//! let mut pool = Pool([MaybeUninit::uninit(); 1040]);
//! let arena = ArenaAlloc::new(Gmf::new(&mut pool.0).unwrap());
//!
//! unsafe {
//!     let layout = Layout::array::<i32>(256).unwrap();
//!     let ptr = arena.alloc(layout);
//!     assert!(!ptr.is_null());
//!     arena.dealloc(ptr, layout);
//! }
//! ```
//!
//! # Details
//!
//! ## Differences from a conventional heap
//!
//!  - [`Gmf::allocate`] places a request at the front of the best-fitting
//!    block and does not pad it for alignment. [`Gmf::allocate_aligned`] and
//!    [`ArenaAlloc`] pick the smallest block that can hold the request at an
//!    aligned address instead.
//!
//!  - Releasing an address that is not the start of an outstanding allocation
//!    is ignored by [`Gmf::deallocate`]. Use [`Gmf::try_deallocate`] to have it
//!    reported instead.
//!
#![no_std]
#![cfg_attr(feature = "doc_cfg", feature(doc_cfg))]

extern crate alloc;

mod arena;
mod block;
mod error;
mod gmf;
mod index;
pub use self::{arena::ArenaAlloc, block::Block, error::Error, gmf::Gmf};

#[cfg(any(test, feature = "std"))]
extern crate std;
