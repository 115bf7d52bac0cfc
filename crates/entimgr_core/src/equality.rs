//! Equality policies used to locate an entity for remove and update.

use std::fmt;
use std::marker::PhantomData;

/// Decides whether two entities denote the same logical record.
///
/// The policy must be consistent for the lifetime of the manager that owns
/// it: stored entities are never re-evaluated after insertion.
///
/// Any `Fn(&T, &T) -> bool + Send + Sync` closure is a policy.
pub trait EqualityPolicy<T>: Send + Sync {
    /// Returns true if `a` and `b` denote the same record.
    fn equals(&self, a: &T, b: &T) -> bool;
}

impl<T, F> EqualityPolicy<T> for F
where
    F: Fn(&T, &T) -> bool + Send + Sync,
{
    fn equals(&self, a: &T, b: &T) -> bool {
        self(a, b)
    }
}

/// Structural equality through `PartialEq`.
///
/// Entities moved into a strategy have no object identity left to compare,
/// so this is the default policy for `T: PartialEq`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValueEquality;

impl<T: PartialEq> EqualityPolicy<T> for ValueEquality {
    fn equals(&self, a: &T, b: &T) -> bool {
        a == b
    }
}

/// Equality on a projected key, e.g. an `id` field.
///
/// Built with [`by_key`].
pub struct KeyEquality<T, K, F> {
    key: F,
    _marker: PhantomData<fn(&T) -> K>,
}

impl<T, K, F> EqualityPolicy<T> for KeyEquality<T, K, F>
where
    K: PartialEq,
    F: Fn(&T) -> K + Send + Sync,
{
    fn equals(&self, a: &T, b: &T) -> bool {
        (self.key)(a) == (self.key)(b)
    }
}

impl<T, K, F> fmt::Debug for KeyEquality<T, K, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyEquality").finish_non_exhaustive()
    }
}

/// Creates a policy comparing entities by the key `key` extracts.
///
/// # Example
///
/// ```rust
/// use entimgr_core::{by_key, EqualityPolicy};
///
/// struct User { id: u64, name: String }
///
/// let policy = by_key(|u: &User| u.id);
/// let a = User { id: 1, name: "old".into() };
/// let b = User { id: 1, name: "new".into() };
/// assert!(policy.equals(&a, &b));
/// ```
pub fn by_key<T, K, F>(key: F) -> KeyEquality<T, K, F>
where
    K: PartialEq,
    F: Fn(&T) -> K + Send + Sync,
{
    KeyEquality {
        key,
        _marker: PhantomData,
    }
}

/// Returns the index of the first entity equal to `target` under `equality`.
///
/// Linear scan in sequence order; the first match wins.
pub fn position_of<T>(items: &[T], target: &T, equality: &dyn EqualityPolicy<T>) -> Option<usize> {
    items.iter().position(|candidate| equality.equals(candidate, target))
}
