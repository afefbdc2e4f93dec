//! # Task Stacks
//!
//! Spawned tasks get their stacks from a `StackArena`: one statically
//! reserved region carved front to back. Regions are never returned, which
//! matches a system where tasks never exit.
//!
//! Overflow is not detected. A task writing below its region corrupts
//! whatever was carved before it.

use core::ptr::NonNull;

use crate::config::STACK_ALIGN;

/// A stack region owned by exactly one task.
///
/// Not `Clone`: moving it into a TCB is what makes the ownership exclusive.
#[derive(Debug, PartialEq, Eq)]
pub struct Stack {
    base: NonNull<u8>,
    size: usize,
}

impl Stack {
    /// Lowest address of the region.
    pub fn base(&self) -> usize {
        self.base.as_ptr() as usize
    }

    /// Size in bytes.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Initial stack pointer: one past the highest byte, aligned down.
    /// Stacks grow downward.
    pub fn top(&self) -> usize {
        (self.base() + self.size) & !(STACK_ALIGN - 1)
    }
}

/// Bump allocator over a fixed region.
#[derive(Debug)]
pub struct StackArena {
    base: *mut u8,
    len: usize,
    next: usize,
}

impl StackArena {
    /// Take exclusive ownership of `region` for carving stacks.
    pub fn new(region: &'static mut [u8]) -> Self {
        Self {
            base: region.as_mut_ptr(),
            len: region.len(),
            next: 0,
        }
    }

    /// An arena with no space. Every allocation fails.
    pub const fn empty() -> Self {
        Self {
            base: core::ptr::null_mut(),
            len: 0,
            next: 0,
        }
    }

    /// Carve `size` bytes (rounded up to `STACK_ALIGN`) starting at an
    /// aligned address. `None` when the rest of the arena is too small, or
    /// for a zero-sized request.
    pub fn alloc(&mut self, size: usize) -> Option<Stack> {
        if size == 0 || self.base.is_null() {
            return None;
        }
        let size = size.checked_add(STACK_ALIGN - 1)? & !(STACK_ALIGN - 1);

        let base = self.base as usize;
        let start = (base + self.next).checked_add(STACK_ALIGN - 1)? & !(STACK_ALIGN - 1);
        let end = start.checked_add(size)?;
        if end > base + self.len {
            return None;
        }

        self.next = end - base;
        // SAFETY: `start` lies inside the non-null region handed to `new`.
        let ptr = unsafe { NonNull::new_unchecked(start as *mut u8) };
        Some(Stack { base: ptr, size })
    }

    /// Bytes not yet carved, before alignment padding.
    pub fn remaining(&self) -> usize {
        self.len - self.next
    }
}
