//! The allocator's OS collaborators: program-break extension and anonymous page mapping.
//!
//! These three functions are the crate's only FFI boundary. Everything above this module
//! operates on memory it already owns; everything below it is a direct, thin wrap of a libc
//! call with the failure sentinel normalized to `Err`.

use std::ffi::c_void;
use std::ptr;

use crate::error::{AllocError, Result};

/// Extends the program break by `delta` bytes and returns the address it used to sit at
/// (i.e. the base of the newly available region), matching `sbrk`'s return convention.
///
/// `delta` may be negative in principle, but this allocator only ever grows the break; it
/// never calls this with a negative `delta`.
pub(crate) fn extend_program_break(delta: isize) -> Result<*mut u8> {
    let prev = unsafe { libc::sbrk(delta) };
    if prev == -1isize as *mut c_void {
        log::warn!("sbrk({delta}) failed");
        return Err(AllocError::OsExtendFail);
    }
    log::debug!("program break extended by {delta} bytes at {prev:p}");
    Ok(prev as *mut u8)
}

/// Maps a fresh, zero-initialized anonymous region of exactly `len` bytes.
pub(crate) fn map_anonymous(len: usize) -> Result<*mut u8> {
    let ptr = unsafe {
        libc::mmap(
            ptr::null_mut(),
            len,
            libc::PROT_READ | libc::PROT_WRITE,
            libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
            -1,
            0,
        )
    };
    if ptr == libc::MAP_FAILED {
        log::warn!("mmap({len}) failed");
        return Err(AllocError::OsMapFail);
    }
    log::debug!("mapped {len} anonymous bytes at {ptr:p}");
    Ok(ptr as *mut u8)
}

/// Unmaps a region previously returned by [`map_anonymous`].
///
/// # Safety
/// `ptr` must be the base address returned by a prior, not-yet-unmapped [`map_anonymous`]
/// call, and `len` must be the exact length passed to that call.
pub(crate) unsafe fn unmap_anonymous(ptr: *mut u8, len: usize) {
    let rc = unsafe { libc::munmap(ptr as *mut c_void, len) };
    if rc != 0 {
        log::warn!("munmap({ptr:p}, {len}) failed");
    } else {
        log::debug!("unmapped {len} anonymous bytes at {ptr:p}");
    }
}
