//! The facade: request validation, small/large dispatch, and the `realloc` state machine.
//!
//! Grounded on `TieredMemoryAllocator`'s size-threshold dispatch shape (route to the pool
//! whose range contains the request, track aggregate stats by walking both pools), generalized
//! from three pools to two and from pooled reuse to this crate's split/coalesce/wilderness
//! policy. The `realloc` case order follows the seven-case decision tree of the allocator this
//! crate's contract was distilled from.

use std::ptr;

use crate::descriptor::{BlockDescriptor, META_DATA_SIZE};
use crate::error::{AllocError, Result};
use crate::large_heap::LargeHeap;
use crate::small_heap::SmallHeap;

/// Requests at or above this many payload bytes are routed to the large heap.
pub const LARGE_THRESHOLD: usize = 131_072;

/// No single request may exceed this many payload bytes.
pub const MAX_SIZE: usize = 100_000_000;

fn validate_size(size: usize) -> Result<()> {
    if size == 0 || size > MAX_SIZE {
        return Err(AllocError::SizeOutOfRange);
    }
    Ok(())
}

/// Owns both heaps and dispatches every public operation to the one that owns the pointer, or
/// to the one sized for the request.
pub(crate) struct Allocator {
    small: SmallHeap,
    large: LargeHeap,
}

impl Allocator {
    pub(crate) const fn new() -> Self {
        Self { small: SmallHeap::new(), large: LargeHeap::new() }
    }

    pub(crate) fn alloc(&mut self, size: usize) -> Result<*mut u8> {
        validate_size(size)?;
        if size >= LARGE_THRESHOLD {
            self.large.append(size)
        } else {
            self.small.append(size)
        }
    }

    pub(crate) fn zalloc(&mut self, count: usize, elem_size: usize) -> Result<*mut u8> {
        let total = count.checked_mul(elem_size).ok_or(AllocError::SizeOutOfRange)?;
        let ptr = self.alloc(total)?;
        unsafe { ptr::write_bytes(ptr, 0, total) };
        Ok(ptr)
    }

    pub(crate) fn free(&mut self, payload: *mut u8) {
        if payload.is_null() {
            return;
        }
        if self.small.contains(payload) {
            self.small.free(payload);
        } else {
            self.large.free(payload);
        }
    }

    pub(crate) fn realloc(&mut self, old_ptr: *mut u8, size: usize) -> Result<*mut u8> {
        validate_size(size)?;
        if old_ptr.is_null() {
            return self.alloc(size);
        }
        if self.small.contains(old_ptr) {
            self.realloc_small(old_ptr, size)
        } else {
            self.realloc_large(old_ptr, size)
        }
    }

    /// Seven-case decision tree: no-op, shrink, wilderness-extend, merge-right, merge-left,
    /// merge-both, relocate. Stops at the first case that applies.
    fn realloc_small(&mut self, old_ptr: *mut u8, size: usize) -> Result<*mut u8> {
        let block = self
            .small
            .locate(old_ptr)
            .expect("old_ptr was confirmed to belong to the small heap");
        let old_size = unsafe { block.as_ref().size };

        if size == old_size {
            return Ok(old_ptr);
        }
        if size < old_size {
            self.small.split(block, size);
            log::debug!("realloc: shrink {old_ptr:p} from {old_size} to {size} bytes in place");
            return Ok(old_ptr);
        }

        let diff = size as isize - old_size as isize - META_DATA_SIZE as isize;

        if self.small.is_tail(block) {
            if let Ok(grown) = self.small.grow_live_tail(size) {
                log::debug!("realloc: wilderness-extended {old_ptr:p} to {size} bytes");
                return Ok(grown);
            }
        }

        let next = unsafe { block.as_ref().next };
        if let Some(next_block) = next {
            let (next_free, next_size) = unsafe { (next_block.as_ref().is_free, next_block.as_ref().size) };
            if next_free && next_size as isize >= diff {
                self.small.merge(block, next_block);
                self.small.split(block, size);
                unsafe { (*block.as_ptr()).is_free = false };
                log::debug!("realloc: merged right neighbor to grow {old_ptr:p} to {size} bytes");
                return Ok(old_ptr);
            }
        }

        let prev = unsafe { block.as_ref().prev };
        if let Some(prev_block) = prev {
            let (prev_free, prev_size) = unsafe { (prev_block.as_ref().is_free, prev_block.as_ref().size) };
            if prev_free && prev_size as isize >= diff {
                let target = prev_block;
                self.small.merge(target, block);
                let new_payload = BlockDescriptor::payload_ptr(target);
                unsafe { ptr::copy(old_ptr, new_payload, old_size) };
                self.small.split(target, size);
                unsafe { (*target.as_ptr()).is_free = false };
                log::debug!("realloc: merged left neighbor to grow {old_ptr:p} to {size} bytes");
                return Ok(new_payload);
            }
        }

        if let (Some(next_block), Some(prev_block)) = (next, prev) {
            let (next_free, next_size) = unsafe { (next_block.as_ref().is_free, next_block.as_ref().size) };
            let (prev_free, prev_size) = unsafe { (prev_block.as_ref().is_free, prev_block.as_ref().size) };
            let combined = (prev_size + next_size) as isize;
            if next_free && prev_free && combined >= diff - META_DATA_SIZE as isize {
                let target = prev_block;
                self.small.merge(block, next_block);
                self.small.merge(target, block);
                let new_payload = BlockDescriptor::payload_ptr(target);
                unsafe { ptr::copy(old_ptr, new_payload, old_size) };
                self.small.split(target, size);
                unsafe { (*target.as_ptr()).is_free = false };
                log::debug!("realloc: merged both neighbors to grow {old_ptr:p} to {size} bytes");
                return Ok(new_payload);
            }
        }

        let new_ptr = self.small.append(size)?;
        unsafe { ptr::copy_nonoverlapping(old_ptr, new_ptr, old_size) };
        self.small.free(old_ptr);
        log::debug!("realloc: relocated {old_ptr:p} ({old_size} bytes) to {new_ptr:p} ({size} bytes)");
        Ok(new_ptr)
    }

    /// The large heap never grows or shrinks a mapping in place; every resize relocates.
    fn realloc_large(&mut self, old_ptr: *mut u8, size: usize) -> Result<*mut u8> {
        let old_size = self.large.get_size(old_ptr).unwrap_or(0);
        let new_ptr = self.large.append(size)?;
        unsafe { ptr::copy_nonoverlapping(old_ptr, new_ptr, old_size.min(size)) };
        self.large.free(old_ptr);
        log::debug!("realloc: large relocate {old_ptr:p} ({old_size} bytes) to {new_ptr:p} ({size} bytes)");
        Ok(new_ptr)
    }

    pub(crate) fn num_free_blocks(&self) -> usize {
        self.small.iter().filter(|b| unsafe { b.as_ref().is_free }).count()
    }

    pub(crate) fn num_free_bytes(&self) -> usize {
        self.small
            .iter()
            .filter(|b| unsafe { b.as_ref().is_free })
            .map(|b| unsafe { b.as_ref().size })
            .sum()
    }

    pub(crate) fn num_allocated_blocks(&self) -> usize {
        self.small.length() + self.large.length()
    }

    pub(crate) fn num_allocated_bytes(&self) -> usize {
        let small: usize = self.small.iter().map(|b| unsafe { b.as_ref().size }).sum();
        let large: usize = self.large.iter().map(|b| unsafe { b.as_ref().size }).sum();
        small + large
    }

    pub(crate) fn num_meta_data_bytes(&self) -> usize {
        self.num_allocated_blocks() * META_DATA_SIZE
    }
}
