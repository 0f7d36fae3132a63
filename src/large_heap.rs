//! The large-allocation heap: every block is its own anonymous mapping, released to the OS
//! the moment it is freed. No splitting, no coalescing, no reuse.

use std::ptr::NonNull;

use crate::descriptor::{BlockDescriptor, META_DATA_SIZE};
use crate::error::Result;
use crate::os;

/// The large heap's descriptor list.
pub(crate) struct LargeHeap {
    head: Option<NonNull<BlockDescriptor>>,
    tail: Option<NonNull<BlockDescriptor>>,
    length: usize,
}

impl LargeHeap {
    pub(crate) const fn new() -> Self {
        Self { head: None, tail: None, length: 0 }
    }

    pub(crate) fn length(&self) -> usize {
        self.length
    }

    /// Maps a fresh region of exactly `size_of::<BlockDescriptor>() + size` bytes and links a
    /// new descriptor at its base.
    pub(crate) fn append(&mut self, size: usize) -> Result<*mut u8> {
        let total = size + META_DATA_SIZE;
        let base = os::map_anonymous(total)?;
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

    /// Unlinks `payload`'s block and unmaps its region. No-op if `payload` is unknown to this
    /// heap.
    pub(crate) fn free(&mut self, payload: *mut u8) {
        let Some(block) = self.find(payload) else { return };
        let (size, prev, next) = unsafe {
            let b = block.as_ref();
            (b.size, b.prev, b.next)
        };
        match prev {
            Some(prev_block) => unsafe { (*prev_block.as_ptr()).next = next },
            None => self.head = next,
        }
        match next {
            Some(next_block) => unsafe { (*next_block.as_ptr()).prev = prev },
            None => self.tail = prev,
        }
        self.length -= 1;

        let region = block.as_ptr() as *mut u8;
        unsafe { os::unmap_anonymous(region, size + META_DATA_SIZE) };
    }

    /// Payload size of the block owning `payload`, or `None` if unknown to this heap.
    pub(crate) fn get_size(&self, payload: *mut u8) -> Option<usize> {
        self.find(payload).map(|block| unsafe { block.as_ref().size })
    }

    /// Whether `payload` was allocated from this heap.
    pub(crate) fn contains(&self, payload: *mut u8) -> bool {
        self.find(payload).is_some()
    }

    fn find(&self, payload: *mut u8) -> Option<NonNull<BlockDescriptor>> {
        self.iter().find(|&block| BlockDescriptor::payload_ptr(block) == payload)
    }

    /// Walks the descriptor list; order is unspecified (release does not require neighbor
    /// knowledge, so blocks are not kept address-ordered).
    pub(crate) fn iter(&self) -> LargeHeapIter {
        LargeHeapIter { current: self.head }
    }
}

pub(crate) struct LargeHeapIter {
    current: Option<NonNull<BlockDescriptor>>,
}

impl Iterator for LargeHeapIter {
    type Item = NonNull<BlockDescriptor>;

    fn next(&mut self) -> Option<Self::Item> {
        let block = self.current?;
        self.current = unsafe { block.as_ref().next };
        Some(block)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_then_free_round_trips() {
        let mut heap = LargeHeap::new();
        let p = heap.append(200_000).unwrap();
        assert_eq!(heap.length(), 1);
        assert_eq!(heap.get_size(p), Some(200_000));

        heap.free(p);
        assert_eq!(heap.length(), 0);
        assert!(!heap.contains(p));
    }

    #[test]
    fn free_of_unknown_pointer_is_a_no_op() {
        let mut heap = LargeHeap::new();
        let bogus = 0x1234usize as *mut u8;
        heap.free(bogus);
        assert_eq!(heap.length(), 0);
    }
}
