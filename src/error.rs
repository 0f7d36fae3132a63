//! Internal error type for the allocator's OS collaborators.
//!
//! This never reaches the public surface: `alloc`/`zalloc`/`free`/`realloc` degrade every
//! error back to a null pointer, matching the classic `malloc` contract. It exists so the
//! internal plumbing (and its tests) has something sturdier than a bare `Option<()>` to match
//! on, and so failures can be logged with a reason before being flattened to null.

use core::fmt;

/// Reasons the allocator's internal operations can fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocError {
    /// Requested size is zero or exceeds `MAX_SIZE`, or `zalloc`'s `count * elem_size`
    /// overflowed `usize`.
    SizeOutOfRange,
    /// The OS rejected a program-break extension (`sbrk`).
    OsExtendFail,
    /// The OS rejected an anonymous mapping request (`mmap`).
    OsMapFail,
}

impl fmt::Display for AllocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AllocError::SizeOutOfRange => {
                write!(f, "requested size is zero or exceeds the maximum allocation size")
            }
            AllocError::OsExtendFail => write!(f, "failed to extend the program break"),
            AllocError::OsMapFail => write!(f, "failed to map anonymous memory"),
        }
    }
}

impl std::error::Error for AllocError {}

/// Result alias for the allocator's internal operations.
pub(crate) type Result<T> = core::result::Result<T, AllocError>;
