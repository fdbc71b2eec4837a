/*!
 * Core Types
 * Identity types shared by the condition variable subsystem and the scheduler
 */

use serde::{Deserialize, Serialize};
use std::fmt;

/// Pointer-sized identity of an external kernel object
///
/// Keys are opaque: the subsystem never dereferences them, it only hashes and
/// compares. The null key marks an anonymous (unpublished) variable.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ObjectKey(usize);

impl ObjectKey {
    /// Key of an anonymous variable
    pub const NULL: Self = Self(0);

    /// Wrap a raw pointer-sized value
    #[inline]
    pub const fn new(raw: usize) -> Self {
        Self(raw)
    }

    /// Key derived from the address of `object`
    #[inline]
    pub fn of<T: ?Sized>(object: &T) -> Self {
        Self(object as *const T as *const () as usize)
    }

    #[inline]
    pub const fn raw(self) -> usize {
        self.0
    }

    #[inline]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

impl From<usize> for ObjectKey {
    fn from(raw: usize) -> Self {
        Self(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_key() {
        assert!(ObjectKey::NULL.is_null());
        assert!(ObjectKey::default().is_null());
        assert!(!ObjectKey::new(0x1000).is_null());
    }

    #[test]
    fn test_key_from_address() {
        let a = 1u64;
        let b = 2u64;
        assert_eq!(ObjectKey::of(&a), ObjectKey::of(&a));
        assert_ne!(ObjectKey::of(&a), ObjectKey::of(&b));
        assert_eq!(ObjectKey::of(&a).raw(), &a as *const u64 as usize);
    }

    #[test]
    fn test_display_is_hex() {
        assert_eq!(ObjectKey::new(0xbeef).to_string(), "0xbeef");
    }
}
