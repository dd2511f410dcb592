//! # Skolem Registry (C4)
//!
//! Maintains a process-wide mapping `(fnName, args) -> id` so that rules
//! synthesizing the same logical entity - whether from different rules or
//! different evaluations of the same rule - agree on its identity. Ids are
//! drawn from a reserved high range (top bit set) disjoint from
//! user-supplied ids, and `intern` is a pure function of its inputs: no
//! counter state, so materialized ids stay stable across restarts.

use dashmap::DashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Top bit set: disjoint from any id a user can supply via `insert`.
const SKOLEM_RANGE_BASE: u64 = 1 << 63;

/// A deterministic, process-wide interning table for Skolem terms.
///
/// `intern` is idempotent and requires no shared counter: the id is derived
/// directly from `(fn_name, args)` by hashing, then tagged into the
/// reserved range. Two registries - or the same registry across process
/// restarts - agree on the id for the same inputs without coordination.
/// The cache below is purely a memoization of that pure function, not a
/// source of identity, which is why fresh registries still agree with ones
/// that have a warm cache.
#[derive(Debug, Default)]
pub struct SkolemRegistry {
    cache: DashMap<(String, Vec<String>), u64>,
    arities: DashMap<String, usize>,
}

/// A Skolem function was used with two different arities across the
/// program - signals a likely authoring mistake, since two rules that
/// intend to denote the same kind of entity should agree on arity.
#[derive(Debug, Clone, thiserror::Error)]
#[error("skolem arity mismatch: function '{name}' used with arity {first} and {second}")]
pub struct ArityMismatch {
    pub name: String,
    pub first: usize,
    pub second: usize,
}

impl SkolemRegistry {
    #[must_use]
    pub fn new() -> Self {
        SkolemRegistry::default()
    }

    /// Intern `(fn_name, args)`, returning the deterministic synthetic id.
    ///
    /// # Errors
    /// Returns `ArityMismatch` if `fn_name` was previously interned with a
    /// different argument-tuple length.
    pub fn intern(&self, fn_name: &str, args: &[String]) -> Result<u64, ArityMismatch> {
        if let Some(prior) = self.arities.get(fn_name) {
            if *prior != args.len() {
                return Err(ArityMismatch {
                    name: fn_name.to_string(),
                    first: *prior,
                    second: args.len(),
                });
            }
        } else {
            self.arities.insert(fn_name.to_string(), args.len());
        }

        let key = (fn_name.to_string(), args.to_vec());
        if let Some(existing) = self.cache.get(&key) {
            return Ok(*existing);
        }
        let id = Self::compute_id(fn_name, args);
        self.cache.insert(key, id);
        Ok(id)
    }

    /// Pure function of `(fn_name, args)` - no counter, so the result is
    /// stable across registries and across restarts.
    fn compute_id(fn_name: &str, args: &[String]) -> u64 {
        let mut hasher = DefaultHasher::new();
        fn_name.hash(&mut hasher);
        for a in args {
            a.hash(&mut hasher);
        }
        let digest = hasher.finish();
        // Clear the top bit before tagging so every synthesized id lands in
        // the reserved range, disjoint from user ids regardless of hash value.
        SKOLEM_RANGE_BASE | (digest >> 1)
    }

    /// Whether an id falls in the Skolem-reserved range - used to assert
    /// that base data never collides with synthesized identities.
    #[must_use]
    pub fn is_skolem_id(id: u64) -> bool {
        id & SKOLEM_RANGE_BASE != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intern_is_deterministic_across_registries() {
        let a = SkolemRegistry::new();
        let b = SkolemRegistry::new();
        let args = vec!["10".to_string()];
        assert_eq!(a.intern("d", &args).unwrap(), b.intern("d", &args).unwrap());
    }

    #[test]
    fn intern_agrees_iff_args_equal() {
        let r = SkolemRegistry::new();
        let id1 = r.intern("d", &["10".to_string()]).unwrap();
        let id2 = r.intern("d", &["10".to_string()]).unwrap();
        let id3 = r.intern("d", &["11".to_string()]).unwrap();
        assert_eq!(id1, id2);
        assert_ne!(id1, id3);
    }

    #[test]
    fn skolem_ids_never_collide_with_base_range() {
        let r = SkolemRegistry::new();
        let id = r.intern("f", &["x".to_string()]).unwrap();
        assert!(SkolemRegistry::is_skolem_id(id));
        assert!(!SkolemRegistry::is_skolem_id(42));
    }

    #[test]
    fn arity_mismatch_is_rejected() {
        let r = SkolemRegistry::new();
        r.intern("f", &["a".to_string()]).unwrap();
        let err = r.intern("f", &["a".to_string(), "b".to_string()]).unwrap_err();
        assert_eq!(err.first, 1);
        assert_eq!(err.second, 2);
    }

    proptest::proptest! {
        #[test]
        fn intern_is_deterministic_for_arbitrary_args(
            name in "[a-z]{1,8}",
            args in proptest::collection::vec(".{0,6}", 0..4),
        ) {
            let a = SkolemRegistry::new();
            let b = SkolemRegistry::new();
            assert_eq!(a.intern(&name, &args).unwrap(), b.intern(&name, &args).unwrap());
        }
    }
}
