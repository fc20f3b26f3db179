//! Shared plumbing used across the crate.

use std::collections::{BTreeMap, BTreeSet};

/// Map/Set aliases used throughout the crate: `BTreeMap`/`BTreeSet` give us a
/// deterministic iteration order, which matters because suggestion ordering
/// and fixed-point equality checks must not depend on hash iteration order.
pub type Map<K, V> = BTreeMap<K, V>;
pub type Set<T> = BTreeSet<T>;

/// Marks a value that has passed a validation pass. Once you have a
/// `Valid<T>` you can rely on whatever invariant the validator checked
/// without re-checking it at every call site.
///
/// A `Program` is only ever handed to the CFG builder after
/// `front_end::ast::validate` has wrapped it.
#[derive(Clone, Debug)]
pub struct Valid<T>(pub T);

impl<T> Valid<T> {
    /// Only call this once you've actually checked the invariant yourself;
    /// used by tests that build small ASTs in-process rather than going
    /// through the parser + validator.
    pub fn assume_valid(value: T) -> Self {
        Valid(value)
    }

    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> std::ops::Deref for Valid<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}
