//! Identifier allocation for in-memory entities
//!
//! Sections and questions get opaque string ids at authoring time, before
//! anything is persisted. The allocator is abstracted so the "unique and
//! stable once assigned" contract does not lean on a storage-engine
//! feature.

use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

/// Produces unique, never-reused string identifiers.
pub trait IdAllocator: Send + Sync {
    fn allocate(&self) -> String;
}

/// Default allocator backed by random v4 UUIDs.
#[derive(Debug, Default, Clone)]
pub struct UuidAllocator;

impl IdAllocator for UuidAllocator {
    fn allocate(&self) -> String {
        Uuid::new_v4().to_string()
    }
}

/// Monotonic counter allocator. Deterministic ids for tests.
#[derive(Debug, Default)]
pub struct SequentialAllocator {
    next: AtomicU64,
}

impl IdAllocator for SequentialAllocator {
    fn allocate(&self) -> String {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        format!("id-{n}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn uuid_allocator_produces_unique_ids() {
        let alloc = UuidAllocator;
        let ids: HashSet<String> = (0..100).map(|_| alloc.allocate()).collect();
        assert_eq!(ids.len(), 100);
    }

    #[test]
    fn sequential_allocator_is_deterministic() {
        let alloc = SequentialAllocator::default();
        assert_eq!(alloc.allocate(), "id-0");
        assert_eq!(alloc.allocate(), "id-1");
        assert_eq!(alloc.allocate(), "id-2");
    }
}
