//! The block descriptor shared by both heaps.
//!
//! One shape is used by `SmallHeap` and `LargeHeap` alike (see `DESIGN.md`); the only
//! behavioral divergence between the two heaps is release policy (coalesce vs. unmap), not the
//! descriptor layout. Field order is frozen and every field is plain data, so
//! `size_of::<BlockDescriptor>()` is exactly `meta_data_size()` with no hidden padding from
//! trait objects or niche optimization surprises.

use std::ptr::NonNull;

/// A block's bookkeeping record, placed immediately before its payload.
#[repr(C)]
pub(crate) struct BlockDescriptor {
    /// Payload byte count, excluding this descriptor.
    pub size: usize,
    /// True iff the owner released the payload and it has not been reused.
    pub is_free: bool,
    /// Previous neighbor in address order.
    pub prev: Option<NonNull<BlockDescriptor>>,
    /// Next neighbor in address order.
    pub next: Option<NonNull<BlockDescriptor>>,
}

// `size` + `is_free` (padded to pointer alignment) + `prev` + `next`: four pointer-sized words.
// Pins the descriptor's footprint so a future field addition/reordering doesn't silently widen
// it without `meta_data_size()` being revisited.
static_assertions::const_assert_eq!(
    core::mem::size_of::<BlockDescriptor>(),
    4 * core::mem::size_of::<usize>()
);

impl BlockDescriptor {
    /// Writes a fresh descriptor at `at`, returning a pointer to it.
    ///
    /// # Safety
    /// `at` must point to at least `size_of::<BlockDescriptor>() + size` valid, writable bytes.
    pub unsafe fn write_new(
        at: *mut u8,
        size: usize,
        is_free: bool,
        prev: Option<NonNull<BlockDescriptor>>,
        next: Option<NonNull<BlockDescriptor>>,
    ) -> NonNull<BlockDescriptor> {
        let descriptor = at as *mut BlockDescriptor;
        unsafe {
            descriptor.write(BlockDescriptor { size, is_free, prev, next });
            NonNull::new_unchecked(descriptor)
        }
    }

    /// Address of this descriptor's first payload byte.
    pub fn payload_ptr(this: NonNull<BlockDescriptor>) -> *mut u8 {
        unsafe { (this.as_ptr() as *mut u8).add(core::mem::size_of::<BlockDescriptor>()) }
    }
}

/// Constant size of one block descriptor; both heaps share this footprint by construction.
pub const META_DATA_SIZE: usize = core::mem::size_of::<BlockDescriptor>();
