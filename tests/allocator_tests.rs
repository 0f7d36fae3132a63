//! End-to-end scenarios driving the public facade directly, the way a real caller would.
//!
//! Every test here mutates the one process-wide allocator singleton (program break included),
//! so tests take `serialize()` first to keep Rust's default per-test threads from interleaving
//! heap mutations and corrupting each other's counters. This is test-harness scaffolding only;
//! the allocator itself makes no concurrency promises.

use std::sync::{Mutex, MutexGuard, OnceLock};

static TEST_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

fn serialize() -> MutexGuard<'static, ()> {
    TEST_LOCK.get_or_init(|| Mutex::new(())).lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[test]
fn fresh_alloc_free_then_reuse() {
    let _guard = serialize();
    unsafe {
        let p1 = flatheap::alloc(100);
        assert!(!p1.is_null());
        flatheap::free(p1);
        let before = flatheap::num_allocated_blocks();
        let p2 = flatheap::alloc(50);
        assert_eq!(p2, p1);
        assert_eq!(flatheap::num_allocated_blocks(), before);
        assert_eq!(flatheap::num_free_blocks(), 1);
        flatheap::free(p2);
    }
}

#[test]
fn coalesce_between_two_free_neighbors() {
    let _guard = serialize();
    unsafe {
        let a = flatheap::alloc(200);
        let b = flatheap::alloc(200);
        let c = flatheap::alloc(200);
        flatheap::free(a);
        flatheap::free(c);
        flatheap::free(b);

        assert_eq!(flatheap::num_allocated_blocks(), 1);
        assert_eq!(flatheap::num_free_blocks(), 1);
        assert_eq!(flatheap::num_free_bytes(), 600 + 2 * flatheap::meta_data_size());
    }
}

#[test]
fn wilderness_extension_on_alloc() {
    let _guard = serialize();
    unsafe {
        let a = flatheap::alloc(100);
        flatheap::free(a);
        let b = flatheap::alloc(300);
        assert_eq!(b, a);
        assert_eq!(flatheap::num_allocated_blocks(), 1);
        assert_eq!(flatheap::num_allocated_bytes(), 300);
        flatheap::free(b);
    }
}

#[test]
fn realloc_shrink_in_place() {
    let _guard = serialize();
    unsafe {
        let a = flatheap::alloc(1000);
        let r = flatheap::realloc(a, 100);
        assert_eq!(r, a);
        flatheap::free(r);
    }
}

#[test]
fn realloc_grows_into_free_right_neighbor() {
    let _guard = serialize();
    unsafe {
        let a = flatheap::alloc(100);
        let b = flatheap::alloc(1000);
        let c = flatheap::alloc(100);
        flatheap::free(b);
        let r = flatheap::realloc(a, 200);
        assert_eq!(r, a);
        flatheap::free(c);
        flatheap::free(r);
    }
}

#[test]
fn realloc_merges_left_neighbor_via_public_facade() {
    let _guard = serialize();
    unsafe {
        let a = flatheap::alloc(100);
        let b = flatheap::alloc(50);
        let c = flatheap::alloc(50); // keeps `b` off the tail
        std::ptr::write_bytes(b, 0xAB, 50);
        flatheap::free(a);

        let r = flatheap::realloc(b, 120);
        assert_eq!(r, a, "merge-left relocates to the lower (prev) address");
        let bytes = std::slice::from_raw_parts(r, 50);
        assert!(bytes.iter().all(|&byte| byte == 0xAB));

        flatheap::free(r);
        flatheap::free(c);
    }
}

#[test]
fn realloc_merges_both_neighbors_via_public_facade() {
    let _guard = serialize();
    unsafe {
        let a = flatheap::alloc(100);
        let b = flatheap::alloc(50);
        let c = flatheap::alloc(100);
        std::ptr::write_bytes(b, 0xCD, 50);
        flatheap::free(a);
        flatheap::free(c);

        let r = flatheap::realloc(b, 232);
        assert_eq!(r, a, "merge-both relocates to the lower (prev) address");
        let bytes = std::slice::from_raw_parts(r, 50);
        assert!(bytes.iter().all(|&byte| byte == 0xCD));

        flatheap::free(r);
    }
}

#[test]
fn realloc_large_relocates_and_preserves_contents() {
    let _guard = serialize();
    unsafe {
        let p = flatheap::alloc(200_000);
        std::ptr::write_bytes(p, 0x42, 200_000);

        let grown = flatheap::realloc(p, 300_000);
        assert_ne!(grown, p);
        let bytes = std::slice::from_raw_parts(grown, 200_000);
        assert!(bytes.iter().all(|&byte| byte == 0x42));

        flatheap::free(grown);
    }
}

#[test]
fn large_path_routing_and_unmap() {
    let _guard = serialize();
    unsafe {
        let a = flatheap::alloc(200_000);
        assert!(!a.is_null());
        assert_eq!(flatheap::num_allocated_blocks(), 1);
        assert_eq!(flatheap::num_allocated_bytes(), 200_000);
        assert_eq!(flatheap::num_meta_data_bytes(), flatheap::meta_data_size());
        assert_eq!(flatheap::num_free_blocks(), 0);

        flatheap::free(a);
        assert_eq!(flatheap::num_allocated_blocks(), 0);
        assert_eq!(flatheap::num_allocated_bytes(), 0);
        assert_eq!(flatheap::num_meta_data_bytes(), 0);
        assert_eq!(flatheap::num_free_blocks(), 0);
    }
}

#[test]
fn alloc_rejects_zero_and_oversize() {
    let _guard = serialize();
    unsafe {
        assert!(flatheap::alloc(0).is_null());
        assert!(flatheap::alloc(flatheap::MAX_SIZE + 1).is_null());
    }
}

#[test]
fn threshold_routes_small_vs_large() {
    let _guard = serialize();
    unsafe {
        let small = flatheap::alloc(flatheap::LARGE_THRESHOLD - 1);
        let large = flatheap::alloc(flatheap::LARGE_THRESHOLD);
        assert!(!small.is_null());
        assert!(!large.is_null());
        flatheap::free(small);
        flatheap::free(large);
    }
}

#[test]
fn realloc_null_behaves_as_alloc() {
    let _guard = serialize();
    unsafe {
        let p = flatheap::realloc(std::ptr::null_mut(), 64);
        assert!(!p.is_null());
        flatheap::free(p);
    }
}

#[test]
fn free_of_null_is_a_no_op() {
    let _guard = serialize();
    unsafe {
        flatheap::free(std::ptr::null_mut());
    }
}
