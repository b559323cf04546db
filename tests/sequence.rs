//! A growable sequence of `i32` backed by a 1040-byte pool
use gmf::{ArenaAlloc, Gmf};
use std::{
    alloc::{GlobalAlloc, Layout},
    mem::MaybeUninit,
    ptr::NonNull,
};

#[repr(align(16))]
struct Align<T>(T);

/// A minimal vector that draws its storage from any `GlobalAlloc`.
struct Seq<'a, A: GlobalAlloc> {
    alloc: &'a A,
    ptr: Option<NonNull<i32>>,
    len: usize,
    cap: usize,
}

impl<'a, A: GlobalAlloc> Seq<'a, A> {
    fn new(alloc: &'a A) -> Self {
        Self {
            alloc,
            ptr: None,
            len: 0,
            cap: 0,
        }
    }

    fn layout(cap: usize) -> Layout {
        Layout::array::<i32>(cap).unwrap()
    }

    /// Change the capacity to exactly `cap` elements.
    fn set_capacity(&mut self, cap: usize) {
        let new_ptr = unsafe {
            match self.ptr {
                None => self.alloc.alloc(Self::layout(cap)),
                Some(ptr) => self.alloc.realloc(
                    ptr.as_ptr().cast(),
                    Self::layout(self.cap),
                    Self::layout(cap).size(),
                ),
            }
        };
        self.ptr = Some(NonNull::new(new_ptr.cast()).expect("out of memory"));
        self.cap = cap;
    }

    fn push(&mut self, x: i32) {
        if self.len == self.cap {
            self.set_capacity((self.cap * 2).max(1));
        }
        unsafe { self.ptr.unwrap().as_ptr().add(self.len).write(x) };
        self.len += 1;
    }

    /// Grow to `len` elements, filling the new ones with `x`.
    fn resize(&mut self, len: usize, x: i32) {
        if len > self.cap {
            self.set_capacity(len);
        }
        while self.len < len {
            unsafe { self.ptr.unwrap().as_ptr().add(self.len).write(x) };
            self.len += 1;
        }
    }

    fn as_slice(&self) -> &[i32] {
        match self.ptr {
            Some(ptr) => unsafe { std::slice::from_raw_parts(ptr.as_ptr(), self.len) },
            None => &[],
        }
    }
}

impl<A: GlobalAlloc> Drop for Seq<'_, A> {
    fn drop(&mut self) {
        if let Some(ptr) = self.ptr {
            unsafe { self.alloc.dealloc(ptr.as_ptr().cast(), Self::layout(self.cap)) };
        }
    }
}

#[test]
fn resize_to_256() {
    let _ = env_logger::builder().is_test(true).try_init();

    let mut pool = Align([MaybeUninit::uninit(); 1040]);
    let arena = ArenaAlloc::new(Gmf::new(&mut pool.0).unwrap());

    {
        let mut seq = Seq::new(&arena);
        seq.resize(256, 0);
        assert_eq!(seq.as_slice(), &[0; 256][..]);

        arena.with(|gmf| {
            gmf.check_integrity();
            assert_eq!(gmf.occupied_bytes(), 1024);
            assert_eq!(gmf.free_bytes(), 16);
        });
    }

    let gmf = arena.into_inner();
    assert_eq!(gmf.occupied_blocks().count(), 0);
    assert_eq!(gmf.free_blocks().collect::<Vec<_>>(), vec![gmf.pool()]);
}

#[test]
fn push_256() {
    let _ = env_logger::builder().is_test(true).try_init();

    let mut pool = Align([MaybeUninit::uninit(); 1040]);
    let arena = ArenaAlloc::new(Gmf::new(&mut pool.0).unwrap());

    {
        let mut seq = Seq::new(&arena);
        for i in 0..256 {
            seq.push(i * 7);
        }
        assert!(seq.as_slice().iter().copied().eq((0..256).map(|i| i * 7)));

        // Every reallocation could grow in place
        let front = arena.with(|gmf| gmf.pool().front());
        assert_eq!(seq.ptr.unwrap().as_ptr() as usize, front);
    }

    arena.with(|gmf| {
        assert_eq!(gmf.occupied_bytes(), 0);
        assert_eq!(gmf.free_blocks().count(), 1);
    });
}

#[test]
fn second_sequence_does_not_fit() {
    let mut pool = Align([MaybeUninit::uninit(); 1040]);
    let arena = ArenaAlloc::new(Gmf::new(&mut pool.0).unwrap());

    let mut a = Seq::new(&arena);
    a.resize(256, 1);

    let p = unsafe { arena.alloc(Layout::array::<i32>(256).unwrap()) };
    assert!(p.is_null());

    drop(a);
    let p = unsafe { arena.alloc(Layout::array::<i32>(256).unwrap()) };
    assert!(!p.is_null());
    unsafe { arena.dealloc(p, Layout::array::<i32>(256).unwrap()) };
}
