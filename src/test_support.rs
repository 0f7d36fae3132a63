//! Test-only scaffolding.
//!
//! Every test in this crate that grows a `SmallHeap` ultimately calls the real `sbrk`, and the
//! program break is one global resource per process (this crate's documented single-threaded
//! contract assumes no other code moves the break). Rust's default test harness runs `#[test]`
//! functions on separate threads, so without serialization two tests growing independent
//! `SmallHeap`s could interleave their `sbrk` calls and violate each other's contiguity
//! invariant. This guard exists purely to keep the test harness from fighting itself; it is not
//! part of the allocator's public API and says nothing about the allocator's own (lack of)
//! thread safety.
#![cfg(test)]

use std::sync::{Mutex, MutexGuard, OnceLock};

static HEAP_TEST_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

pub(crate) fn serialize() -> MutexGuard<'static, ()> {
    HEAP_TEST_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}
