//! Property values and comparison semantics.
//!
//! Per the design notes, every property value is stored as a string. The
//! `<, >, <=, >=` comparisons attempt a numeric parse on both operands and
//! fall back to lexicographic comparison if either side fails to parse.
//! `=` and `!=` are always string equality - this is the most defensible
//! reading of an otherwise-ambiguous source and is documented rather than
//! silently assumed.

use std::cmp::Ordering;
use std::fmt;

/// A property value. Always backed by a string; numeric comparisons are
/// performed on demand rather than at storage time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct PropertyValue(pub String);

impl PropertyValue {
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        PropertyValue(s.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parse as an i64 or f64, preferring integer when both would parse.
    fn as_number(&self) -> Option<f64> {
        self.0.parse::<f64>().ok()
    }

    /// Compare two values using the documented policy: numeric parse on
    /// both sides, falling back to lexicographic string comparison.
    #[must_use]
    pub fn compare(&self, other: &PropertyValue) -> Ordering {
        match (self.as_number(), other.as_number()) {
            (Some(a), Some(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
            _ => self.0.cmp(&other.0),
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        PropertyValue(s.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(s: String) -> Self {
        PropertyValue(s)
    }
}

impl From<i64> for PropertyValue {
    fn from(n: i64) -> Self {
        PropertyValue(n.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_comparison_prefers_numeric_parse() {
        let a = PropertyValue::new("30");
        let b = PropertyValue::new("25");
        assert_eq!(a.compare(&b), Ordering::Greater);
    }

    #[test]
    fn lexicographic_fallback_when_unparseable() {
        let a = PropertyValue::new("apple");
        let b = PropertyValue::new("banana");
        assert_eq!(a.compare(&b), Ordering::Less);
    }

    #[test]
    fn equality_is_always_string_equality() {
        let a = PropertyValue::new("01");
        let b = PropertyValue::new("1");
        // Numerically equal but textually different - `=` must not unify them.
        assert_ne!(a, b);
    }

    proptest::proptest! {
        #[test]
        fn compare_is_antisymmetric(a in ".{0,8}", b in ".{0,8}") {
            let (pa, pb) = (PropertyValue::new(a), PropertyValue::new(b));
            assert_eq!(pa.compare(&pb).reverse(), pb.compare(&pa));
        }

        #[test]
        fn numeric_strings_compare_numerically(a in -10_000i64..10_000, b in -10_000i64..10_000) {
            let (pa, pb) = (PropertyValue::from(a), PropertyValue::from(b));
            assert_eq!(pa.compare(&pb), a.cmp(&b));
        }
    }
}
