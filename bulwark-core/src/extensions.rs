//! Typed per-request extensions.
//!
//! Filters attach data to a request by type rather than by string key, so a
//! later stage reads it back as the exact type that was written:
//!
//! ```rust
//! use bulwark_core::Extensions;
//!
//! #[derive(Debug, PartialEq)]
//! struct TraceId(u64);
//!
//! let mut ext = Extensions::new();
//! ext.insert(TraceId(7));
//! assert_eq!(ext.get::<TraceId>(), Some(&TraceId(7)));
//! ```

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

/// Type-keyed storage; at most one value per type.
#[derive(Clone, Default)]
pub struct Extensions {
    map: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl Extensions {
    #[inline]
    pub fn new() -> Self {
        Self {
            map: HashMap::new(),
        }
    }

    /// Insert a value, replacing any previous value of the same type.
    #[inline]
    pub fn insert<T: Send + Sync + 'static>(&mut self, value: T) {
        self.map.insert(TypeId::of::<T>(), Arc::new(value));
    }

    /// Get a reference to the value of type `T`, if present.
    #[inline]
    pub fn get<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.map
            .get(&TypeId::of::<T>())
            .and_then(|arc| arc.downcast_ref::<T>())
    }

    #[inline]
    pub fn contains<T: Send + Sync + 'static>(&self) -> bool {
        self.map.contains_key(&TypeId::of::<T>())
    }

    /// Remove the value of type `T`. Returns true if one existed.
    #[inline]
    pub fn remove<T: Send + Sync + 'static>(&mut self) -> bool {
        self.map.remove(&TypeId::of::<T>()).is_some()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl std::fmt::Debug for Extensions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Extensions")
            .field("count", &self.map.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Slot(&'static str);

    #[test]
    fn test_latest_write_wins() {
        let mut ext = Extensions::new();
        ext.insert(Slot("first"));
        ext.insert(Slot("second"));

        assert_eq!(ext.len(), 1);
        assert_eq!(ext.get::<Slot>(), Some(&Slot("second")));
    }

    #[test]
    fn test_remove() {
        let mut ext = Extensions::new();
        ext.insert(42u32);
        assert!(ext.contains::<u32>());
        assert!(ext.remove::<u32>());
        assert!(!ext.remove::<u32>());
        assert!(ext.is_empty());
    }

    #[test]
    fn test_types_do_not_collide() {
        let mut ext = Extensions::new();
        ext.insert(1i32);
        ext.insert(Slot("a"));
        assert_eq!(ext.get::<i32>(), Some(&1));
        assert_eq!(ext.get::<i64>(), None);
    }
}
