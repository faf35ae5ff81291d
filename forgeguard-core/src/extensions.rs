//! Typed per-request state.
//!
//! Upstream middleware attach their request-scoped collaborators here
//! (the cookie jar, the loaded session, the token minted earlier in the
//! same request) so downstream middleware can find them by type.
//!
//! # Example
//!
//! ```rust
//! use forgeguard_core::Extensions;
//!
//! #[derive(Debug, PartialEq)]
//! struct TenantId(u32);
//!
//! let mut ext = Extensions::new();
//! ext.insert(TenantId(7));
//!
//! assert_eq!(ext.get::<TenantId>(), Some(&TenantId(7)));
//! ```

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

/// Type-keyed map of request-scoped values.
///
/// Values are stored behind an `Arc`, so cloning a request shares its
/// extensions rather than duplicating them.
#[derive(Clone, Default)]
pub struct Extensions {
    map: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl Extensions {
    /// Create an empty container.
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
            .and_then(|value| value.downcast_ref::<T>())
    }

    /// Check if a value of type `T` is present.
    #[inline]
    pub fn contains<T: Send + Sync + 'static>(&self) -> bool {
        self.map.contains_key(&TypeId::of::<T>())
    }

    /// Remove the value of type `T`.
    ///
    /// Returns true if a value was removed.
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
    struct Marker(&'static str);

    #[test]
    fn test_insert_and_get() {
        let mut ext = Extensions::new();
        ext.insert(Marker("session"));
        ext.insert(42u8);

        assert_eq!(ext.get::<Marker>(), Some(&Marker("session")));
        assert_eq!(ext.get::<u8>(), Some(&42));
        assert_eq!(ext.get::<String>(), None);
        assert_eq!(ext.len(), 2);
    }

    #[test]
    fn test_insert_replaces() {
        let mut ext = Extensions::new();
        ext.insert(Marker("first"));
        ext.insert(Marker("second"));

        assert_eq!(ext.get::<Marker>(), Some(&Marker("second")));
        assert_eq!(ext.len(), 1);
    }

    #[test]
    fn test_remove() {
        let mut ext = Extensions::new();
        ext.insert(Marker("gone"));

        assert!(ext.remove::<Marker>());
        assert!(!ext.remove::<Marker>());
        assert!(!ext.contains::<Marker>());
        assert!(ext.is_empty());
    }

    #[test]
    fn test_clone_shares_values() {
        let mut ext = Extensions::new();
        ext.insert(Marker("shared"));

        let cloned = ext.clone();
        assert_eq!(cloned.get::<Marker>(), Some(&Marker("shared")));
    }
}
