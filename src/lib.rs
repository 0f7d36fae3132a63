//! A user-space dynamic memory allocator over a flat process address space.
//!
//! Exposes the classic `malloc`/`free`/`calloc`/`realloc` contract as four free functions plus
//! five introspection counters. Internally, requests are routed by size to one of two
//! segregated heaps:
//!
//! - [`small_heap::SmallHeap`]: grown from the program break via `sbrk`, with first-fit reuse,
//!   splitting, adjacent-neighbor coalescing, and wilderness extension.
//! - [`large_heap::LargeHeap`]: one anonymous `mmap` per block, unmapped on free.
//!
//! The allocator is single-threaded by contract (see `DESIGN.md`): callers must not invoke any
//! function in this crate concurrently from more than one thread.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod allocator;
mod descriptor;
mod error;
mod large_heap;
mod os;
mod small_heap;
#[cfg(test)]
mod test_support;

use std::cell::UnsafeCell;
use std::ptr;
use std::sync::Once;

use allocator::Allocator;

pub use allocator::{LARGE_THRESHOLD, MAX_SIZE};
pub use descriptor::META_DATA_SIZE;

/// Lazily-constructed, never-torn-down process singleton.
///
/// A `std::sync::Mutex` would be the reflexive choice, but this crate's contract rules out
/// concurrent callers entirely (§5): there is no mutation ordering for a lock to arbitrate.
/// What's still needed is the lazy-static-singleton shape itself — "initialized to empty at
/// first touch" — which `Once` alone provides without forcing unrelated callers through a lock.
struct GlobalAllocatorCell {
    once: Once,
    inner: UnsafeCell<Option<Allocator>>,
}

// Safety obligation lives entirely on `get`'s caller: the cell is shared across threads only in
// the type-system sense required to make it a `static`, never in the sense of concurrent access.
unsafe impl Sync for GlobalAllocatorCell {}

impl GlobalAllocatorCell {
    const fn new() -> Self {
        Self { once: Once::new(), inner: UnsafeCell::new(None) }
    }

    /// # Safety
    /// The caller must not call this (or hold the returned reference) concurrently with any
    /// other call into this cell from another thread. This crate's single-threaded-caller
    /// contract is what makes that sound; it is not enforced here.
    unsafe fn get(&self) -> &mut Allocator {
        self.once.call_once(|| unsafe {
            *self.inner.get() = Some(Allocator::new());
        });
        unsafe { (*self.inner.get()).as_mut().unwrap_unchecked() }
    }
}

static ALLOCATOR: GlobalAllocatorCell = GlobalAllocatorCell::new();

/// Allocates `size` payload bytes from whichever heap fits the request, returning null on
/// failure or on an out-of-range `size` (`size == 0` or `size > MAX_SIZE`).
///
/// # Safety
/// Must not be called concurrently with any other function in this crate from another thread.
pub unsafe fn alloc(size: usize) -> *mut u8 {
    match unsafe { ALLOCATOR.get() }.alloc(size) {
        Ok(ptr) => ptr,
        Err(e) => {
            log::warn!("alloc({size}) failed: {e}");
            ptr::null_mut()
        }
    }
}

/// Allocates space for `count` elements of `elem_size` bytes each and zero-fills it.
///
/// `count * elem_size` overflow is rejected explicitly (returns null), rather than wrapping.
///
/// # Safety
/// Must not be called concurrently with any other function in this crate from another thread.
pub unsafe fn zalloc(count: usize, elem_size: usize) -> *mut u8 {
    match unsafe { ALLOCATOR.get() }.zalloc(count, elem_size) {
        Ok(ptr) => ptr,
        Err(e) => {
            log::warn!("zalloc({count}, {elem_size}) failed: {e}");
            ptr::null_mut()
        }
    }
}

/// Releases a block previously returned by [`alloc`], [`zalloc`], or [`realloc`].
///
/// Null is a no-op. Freeing a pointer this crate did not hand out, or freeing the same pointer
/// twice, is undefined behavior and is not checked.
///
/// # Safety
/// `ptr` must be null or a still-live pointer returned by this crate, not previously freed.
/// Must not be called concurrently with any other function in this crate from another thread.
pub unsafe fn free(ptr: *mut u8) {
    unsafe { ALLOCATOR.get() }.free(ptr);
}

/// Resizes a block previously returned by [`alloc`], [`zalloc`], or [`realloc`] to `size`
/// payload bytes, preserving its contents up to the smaller of the old and new sizes.
///
/// `realloc(null, size)` behaves as `alloc(size)`. On failure the original block is left
/// intact and null is returned.
///
/// # Safety
/// `ptr` must be null or a still-live pointer returned by this crate. Must not be called
/// concurrently with any other function in this crate from another thread.
pub unsafe fn realloc(ptr: *mut u8, size: usize) -> *mut u8 {
    match unsafe { ALLOCATOR.get() }.realloc(ptr, size) {
        Ok(new_ptr) => new_ptr,
        Err(e) => {
            log::warn!("realloc({ptr:p}, {size}) failed: {e}");
            std::ptr::null_mut()
        }
    }
}

/// Size, in bytes, of one block descriptor. Both heaps share this footprint by construction.
pub fn meta_data_size() -> usize {
    META_DATA_SIZE
}

/// Number of small blocks currently free. Large blocks are never free (they are unmapped
/// immediately on release), so this counts only the small heap.
pub fn num_free_blocks() -> usize {
    unsafe { ALLOCATOR.get() }.num_free_blocks()
}

/// Sum of payload bytes across all free small blocks.
pub fn num_free_bytes() -> usize {
    unsafe { ALLOCATOR.get() }.num_free_bytes()
}

/// Total descriptor count across both heaps, free and live.
pub fn num_allocated_blocks() -> usize {
    unsafe { ALLOCATOR.get() }.num_allocated_blocks()
}

/// Sum of payload bytes across every descriptor in both heaps, free and live.
pub fn num_allocated_bytes() -> usize {
    unsafe { ALLOCATOR.get() }.num_allocated_bytes()
}

/// Sum of descriptor overhead bytes across both heaps: `num_allocated_blocks() *
/// meta_data_size()`.
pub fn num_meta_data_bytes() -> usize {
    unsafe { ALLOCATOR.get() }.num_meta_data_bytes()
}
