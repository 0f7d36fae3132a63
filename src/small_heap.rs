//! The small-allocation heap: a doubly-linked, address-ordered, first-fit free list grown
//! from the program break.

use std::ptr::NonNull;

use crate::descriptor::{BlockDescriptor, META_DATA_SIZE};
use crate::error::{AllocError, Result};
use crate::os;

/// No dangling sliver: a split that would leave a remainder smaller than this many payload
/// bytes is skipped entirely.
pub(crate) const MIN_SPLIT_REMAINDER: usize = 128;

/// The small heap's descriptor list.
pub(crate) struct SmallHeap {
    head: Option<NonNull<BlockDescriptor>>,
    tail: Option<NonNull<BlockDescriptor>>,
    length: usize,
}

impl SmallHeap {
    pub(crate) const fn new() -> Self {
        Self { head: None, tail: None, length: 0 }
    }

    pub(crate) fn tail(&self) -> Option<NonNull<BlockDescriptor>> {
        self.tail
    }

    pub(crate) fn length(&self) -> usize {
        self.length
    }

    /// Finds or creates a block of exactly `size` payload bytes: first-fit reuse, then
    /// wilderness extension, then a fresh program-break extension.
    pub(crate) fn append(&mut self, size: usize) -> Result<*mut u8> {
        let mut current = self.head;
        while let Some(block) = current {
            let (block_size, is_free, next) = unsafe {
                let b = block.as_ref();
                (b.size, b.is_free, b.next)
            };
            if is_free && block_size >= size {
                self.split(block, size);
                unsafe { (*block.as_ptr()).is_free = false };
                return Ok(BlockDescriptor::payload_ptr(block));
            }
            if next.is_none() && is_free {
                return self.enlarge_wilderness(size);
            }
            current = next;
        }

        let total = size.checked_add(META_DATA_SIZE).ok_or(AllocError::SizeOutOfRange)?;
        let base = os::extend_program_break(total as isize)?;
        let prev_tail = self.tail;
        let descriptor = unsafe { BlockDescriptor::write_new(base, size, false, prev_tail, None) };
        match prev_tail {
            Some(prev) => unsafe { (*prev.as_ptr()).next = Some(descriptor) },
            None => self.head = Some(descriptor),
        }
        self.tail = Some(descriptor);
        self.length += 1;
        Ok(BlockDescriptor::payload_ptr(descriptor))
    }

    /// Carves `new_size` payload bytes off the front of `block`, leaving a free remainder
    /// block behind it, unless the remainder would be too small to be worth the descriptor
    /// overhead (strict boundary, see `MIN_SPLIT_REMAINDER`).
    pub(crate) fn split(&mut self, block: NonNull<BlockDescriptor>, new_size: usize) {
        let (old_size, next) = unsafe {
            let b = block.as_ref();
            (b.size, b.next)
        };
        if old_size < new_size + META_DATA_SIZE + MIN_SPLIT_REMAINDER {
            return;
        }
        let remainder = old_size - new_size - META_DATA_SIZE;
        let new_block_addr = unsafe { BlockDescriptor::payload_ptr(block).add(new_size) };
        let new_descriptor =
            unsafe { BlockDescriptor::write_new(new_block_addr, remainder, true, Some(block), next) };
        unsafe {
            (*block.as_ptr()).size = new_size;
            (*block.as_ptr()).next = Some(new_descriptor);
        }
        match next {
            Some(next_block) => unsafe { (*next_block.as_ptr()).prev = Some(new_descriptor) },
            None => self.tail = Some(new_descriptor),
        }
        self.length += 1;
        log::debug!("split block into {new_size} + {remainder} (+descriptor) bytes");
    }

    /// Fuses `right` into `left`: `left` absorbs `right`'s size and descriptor bytes. Does not
    /// touch `left.is_free` — callers set that explicitly once all merges for an operation are
    /// done.
    pub(crate) fn merge(&mut self, left: NonNull<BlockDescriptor>, right: NonNull<BlockDescriptor>) {
        let (right_size, right_next) = unsafe {
            let r = right.as_ref();
            (r.size, r.next)
        };
        unsafe {
            (*left.as_ptr()).size += META_DATA_SIZE + right_size;
            (*left.as_ptr()).next = right_next;
        }
        match right_next {
            Some(next_block) => unsafe { (*next_block.as_ptr()).prev = Some(left) },
            None => self.tail = Some(left),
        }
        self.length -= 1;
    }

    /// Marks `payload`'s block free, coalescing with free neighbors so that no two adjacent
    /// blocks are ever both free.
    pub(crate) fn free(&mut self, payload: *mut u8) {
        let Some(block) = self.find(payload) else { return };
        let (next, prev) = unsafe {
            let b = block.as_ref();
            (b.next, b.prev)
        };
        let next_is_free = next.is_some_and(|n| unsafe { n.as_ref().is_free });
        let prev_is_free = prev.is_some_and(|p| unsafe { p.as_ref().is_free });

        match (next.filter(|_| next_is_free), prev.filter(|_| prev_is_free)) {
            (Some(next_block), Some(prev_block)) => {
                self.merge(block, next_block);
                self.merge(prev_block, block);
            }
            (Some(next_block), None) => {
                self.merge(block, next_block);
                unsafe { (*block.as_ptr()).is_free = true };
            }
            (None, Some(prev_block)) => {
                self.merge(prev_block, block);
            }
            (None, None) => {
                unsafe { (*block.as_ptr()).is_free = true };
            }
        }
    }

    /// Extends the program break to grow the free tail block to `size` payload bytes.
    ///
    /// Precondition: the tail exists, is free, and is smaller than `size` — callers only reach
    /// this after a first-fit scan has already ruled out every other candidate.
    pub(crate) fn enlarge_wilderness(&mut self, size: usize) -> Result<*mut u8> {
        let tail = self.tail.expect("enlarge_wilderness called on an empty heap");
        let payload = self.extend_tail_to(tail, size)?;
        unsafe { (*tail.as_ptr()).is_free = false };
        Ok(payload)
    }

    /// Grows the already-live tail block to `size` payload bytes by extending the program
    /// break, without touching its `is_free` state. Used by `realloc`'s wilderness-extend case,
    /// where the tail is the block being resized and is not free.
    pub(crate) fn grow_live_tail(&mut self, size: usize) -> Result<*mut u8> {
        let tail = self.tail.expect("grow_live_tail called on an empty heap");
        self.extend_tail_to(tail, size)
    }

    /// Whether `block` is this heap's tail.
    pub(crate) fn is_tail(&self, block: NonNull<BlockDescriptor>) -> bool {
        self.tail == Some(block)
    }

    fn extend_tail_to(&mut self, tail: NonNull<BlockDescriptor>, size: usize) -> Result<*mut u8> {
        let tail_size = unsafe { tail.as_ref().size };
        debug_assert!(size > tail_size, "tail extension must grow the tail");
        let delta = (size - tail_size) as isize;
        os::extend_program_break(delta)?;
        unsafe { (*tail.as_ptr()).size = size };
        log::debug!("tail extended by {delta} bytes to {size} total");
        Ok(BlockDescriptor::payload_ptr(tail))
    }

    /// Payload size of the block owning `payload`, or `None` if unknown to this heap.
    pub(crate) fn get_size(&self, payload: *mut u8) -> Option<usize> {
        self.find(payload).map(|block| unsafe { block.as_ref().size })
    }

    /// Whether `payload` was allocated from this heap.
    pub(crate) fn contains(&self, payload: *mut u8) -> bool {
        self.find(payload).is_some()
    }

    /// Locates the descriptor owning `payload`, by linear scan and pointer-equality.
    pub(crate) fn locate(&self, payload: *mut u8) -> Option<NonNull<BlockDescriptor>> {
        self.iter().find(|&block| BlockDescriptor::payload_ptr(block) == payload)
    }

    /// Walks the descriptor list head-to-tail in address order.
    pub(crate) fn iter(&self) -> SmallHeapIter {
        SmallHeapIter { current: self.head }
    }
}

pub(crate) struct SmallHeapIter {
    current: Option<NonNull<BlockDescriptor>>,
}

impl Iterator for SmallHeapIter {
    type Item = NonNull<BlockDescriptor>;

    fn next(&mut self) -> Option<Self::Item> {
        let block = self.current?;
        self.current = unsafe { block.as_ref().next };
        Some(block)
    }
}
