//! Column identities.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Identity of a logical column, rendered as `c<id>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AttributeId(u64);

impl AttributeId {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub const fn value(&self) -> u64 {
        self.0
    }

    pub fn name(&self) -> String {
        format!("c{}", self.0)
    }
}

impl std::fmt::Display for AttributeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "c{}", self.0)
    }
}

/// A logical column shared by every field that carries it.
///
/// Fields hold `Arc<Column>`; the strong count is the number of referencing
/// fields and the column is dropped with the last of them.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct Column {
    id: AttributeId,
}

impl Column {
    pub const fn id(&self) -> AttributeId {
        self.id
    }

    pub fn name(&self) -> String {
        self.id.name()
    }
}

/// Hands out fresh column ids. Owned by one DAG.
#[derive(Debug, Clone, Default)]
pub struct ColumnAllocator {
    next: u64,
}

impl ColumnAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a column with a fresh id.
    pub fn allocate(&mut self) -> Arc<Column> {
        let id = AttributeId(self.next);
        self.next += 1;
        Arc::new(Column { id })
    }

    /// Number of ids handed out so far.
    pub fn allocated(&self) -> u64 {
        self.next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_id_name() {
        assert_eq!(AttributeId::new(7).name(), "c7");
        assert_eq!(AttributeId::new(7).to_string(), "c7");
    }

    #[test]
    fn test_allocator_is_monotonic() {
        let mut allocator = ColumnAllocator::new();
        let a = allocator.allocate();
        let b = allocator.allocate();
        assert_eq!(a.id(), AttributeId::new(0));
        assert_eq!(b.id(), AttributeId::new(1));
        assert_eq!(allocator.allocated(), 2);
    }

    #[test]
    fn test_allocators_are_independent() {
        let mut first = ColumnAllocator::new();
        let mut second = ColumnAllocator::new();
        first.allocate();
        assert_eq!(second.allocate().id(), AttributeId::new(0));
    }

    #[test]
    fn test_column_refcount() {
        let mut allocator = ColumnAllocator::new();
        let column = allocator.allocate();
        let shared = Arc::clone(&column);
        assert_eq!(Arc::strong_count(&column), 2);
        drop(shared);
        assert_eq!(Arc::strong_count(&column), 1);
    }
}
