//! Semiring policies parametrizing every multiply and merge
//!
//! A semiring replaces ordinary `+` and `*` so the same engine computes
//! numerical products, shortest paths (min-plus) or reachability (select-max).
//! Policies are zero-sized types used as generic parameters, so the heap-merge
//! inner loop is monomorphized and inlined.

use num_traits::{Bounded, Num};

/// An `add`/`multiply` pair over the value domain `T`
///
/// `multiply` returns `None` to signal annihilation: the product must not be
/// materialized in the output.
pub trait Semiring<T> {
    /// Combine two values landing on the same coordinate
    fn add(a: &T, b: &T) -> T;

    /// Product of two values, or `None` if the product is annihilated
    fn multiply(a: &T, b: &T) -> Option<T>;
}

/// Ordinary arithmetic
#[derive(Debug, Clone, Copy, Default)]
pub struct PlusTimes;

impl<T: Num + Copy> Semiring<T> for PlusTimes {
    #[inline]
    fn add(a: &T, b: &T) -> T {
        *a + *b
    }

    #[inline]
    fn multiply(a: &T, b: &T) -> Option<T> {
        Some(*a * *b)
    }
}

/// Max as addition, product as multiplication; used for BFS frontier expansion
#[derive(Debug, Clone, Copy, Default)]
pub struct SelectMax;

impl<T: Num + Copy + PartialOrd> Semiring<T> for SelectMax {
    #[inline]
    fn add(a: &T, b: &T) -> T {
        if *a >= *b {
            *a
        } else {
            *b
        }
    }

    #[inline]
    fn multiply(a: &T, b: &T) -> Option<T> {
        Some(*a * *b)
    }
}

/// Tropical (min, +); `T::max_value()` plays infinity
#[derive(Debug, Clone, Copy, Default)]
pub struct MinPlus;

impl<T: Num + Copy + PartialOrd + Bounded> Semiring<T> for MinPlus {
    #[inline]
    fn add(a: &T, b: &T) -> T {
        if *a <= *b {
            *a
        } else {
            *b
        }
    }

    #[inline]
    fn multiply(a: &T, b: &T) -> Option<T> {
        let inf = T::max_value();
        if *a == inf || *b == inf {
            // inf is the additive identity of min, nothing to store
            None
        } else {
            Some(*a + *b)
        }
    }
}

/// Tropical (max, +); `T::min_value()` plays minus infinity
#[derive(Debug, Clone, Copy, Default)]
pub struct MaxPlus;

impl<T: Num + Copy + PartialOrd + Bounded> Semiring<T> for MaxPlus {
    #[inline]
    fn add(a: &T, b: &T) -> T {
        if *a >= *b {
            *a
        } else {
            *b
        }
    }

    #[inline]
    fn multiply(a: &T, b: &T) -> Option<T> {
        let neg_inf = T::min_value();
        if *a == neg_inf || *b == neg_inf {
            None
        } else {
            Some(*a + *b)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plus_times() {
        assert_eq!(<PlusTimes as Semiring<i64>>::add(&2, &3), 5);
        assert_eq!(<PlusTimes as Semiring<i64>>::multiply(&2, &3), Some(6));
    }

    #[test]
    fn test_select_max() {
        assert_eq!(<SelectMax as Semiring<i32>>::add(&2, &7), 7);
        assert_eq!(<SelectMax as Semiring<i32>>::multiply(&2, &7), Some(14));
    }

    #[test]
    fn test_min_plus_infinity_annihilates() {
        assert_eq!(<MinPlus as Semiring<i64>>::add(&4, &1), 1);
        assert_eq!(<MinPlus as Semiring<i64>>::multiply(&4, &1), Some(5));
        assert_eq!(<MinPlus as Semiring<i64>>::multiply(&i64::MAX, &1), None);
    }

    #[test]
    fn test_max_plus() {
        assert_eq!(<MaxPlus as Semiring<i64>>::add(&4, &1), 4);
        assert_eq!(<MaxPlus as Semiring<i64>>::multiply(&4, &1), Some(5));
        assert_eq!(<MaxPlus as Semiring<i64>>::multiply(&i64::MIN, &1), None);
    }
}
