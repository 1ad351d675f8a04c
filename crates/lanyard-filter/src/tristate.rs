//! Three-valued logic.
//!
//! `Fail` means "could not be evaluated". It is never an authoritative
//! negative: `NOT(Fail)` is still `Fail`, and an `OR` with a `True` child
//! is `True` even if another child failed.

use std::ops::Not;

use serde::{Deserialize, Serialize};

/// Outcome of evaluating a rule or matcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tristate {
    True,
    False,
    Fail,
}

impl Tristate {
    pub fn is_true(self) -> bool {
        self == Tristate::True
    }

    pub fn is_fail(self) -> bool {
        self == Tristate::Fail
    }

    /// Conjunction. Every child is evaluated.
    ///
    /// `Fail` dominates `False`; `True` only if every child is `True`.
    pub fn all(children: impl IntoIterator<Item = Tristate>) -> Tristate {
        let mut result = Tristate::True;
        for child in children {
            match child {
                Tristate::Fail => result = Tristate::Fail,
                Tristate::False if result == Tristate::True => result = Tristate::False,
                _ => {}
            }
        }
        result
    }

    /// Disjunction. Every child is evaluated.
    ///
    /// `True` if any child is `True`; otherwise `Fail` if any failed.
    pub fn any(children: impl IntoIterator<Item = Tristate>) -> Tristate {
        let mut saw_fail = false;
        let mut saw_true = false;
        for child in children {
            match child {
                Tristate::True => saw_true = true,
                Tristate::Fail => saw_fail = true,
                Tristate::False => {}
            }
        }
        if saw_true {
            Tristate::True
        } else if saw_fail {
            Tristate::Fail
        } else {
            Tristate::False
        }
    }
}

impl Not for Tristate {
    type Output = Tristate;

    fn not(self) -> Tristate {
        match self {
            Tristate::True => Tristate::False,
            Tristate::False => Tristate::True,
            Tristate::Fail => Tristate::Fail,
        }
    }
}

impl From<bool> for Tristate {
    fn from(value: bool) -> Self {
        if value { Tristate::True } else { Tristate::False }
    }
}

impl std::fmt::Display for Tristate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Tristate::True => "TRUE",
            Tristate::False => "FALSE",
            Tristate::Fail => "FAIL",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::Tristate::{Fail, False as F, True as T};
    use super::*;
    use proptest::prelude::*;
    use test_case::test_case;

    #[test_case(&[F, F], F)]
    #[test_case(&[F, Fail], Fail)]
    #[test_case(&[F, Fail, T], T)]
    #[test_case(&[T], T)]
    #[test_case(&[Fail], Fail)]
    fn test_or_truth_table(children: &[Tristate], expected: Tristate) {
        assert_eq!(Tristate::any(children.iter().copied()), expected);
    }

    #[test_case(&[F, Fail], Fail)]
    #[test_case(&[Fail, F], Fail)]
    #[test_case(&[T, T], T)]
    #[test_case(&[T, F], F)]
    #[test_case(&[T, Fail], Fail)]
    fn test_and_truth_table(children: &[Tristate], expected: Tristate) {
        assert_eq!(Tristate::all(children.iter().copied()), expected);
    }

    #[test_case(T, F)]
    #[test_case(F, T)]
    #[test_case(Fail, Fail)]
    fn test_not_truth_table(input: Tristate, expected: Tristate) {
        assert_eq!(!input, expected);
    }

    fn tristate() -> impl Strategy<Value = Tristate> {
        prop_oneof![Just(T), Just(F), Just(Fail)]
    }

    proptest! {
        /// Property: NOT is an involution
        #[test]
        fn prop_not_involution(a in tristate()) {
            prop_assert_eq!(!!a, a);
        }

        /// Property: combinators do not depend on child order
        #[test]
        fn prop_order_independent(mut children in proptest::collection::vec(tristate(), 1..8)) {
            let and = Tristate::all(children.iter().copied());
            let or = Tristate::any(children.iter().copied());
            children.reverse();
            prop_assert_eq!(Tristate::all(children.iter().copied()), and);
            prop_assert_eq!(Tristate::any(children.iter().copied()), or);
        }

        /// Property: on non-failing inputs the logic is boolean
        #[test]
        fn prop_agrees_with_bool(children in proptest::collection::vec(any::<bool>(), 1..8)) {
            let tri: Vec<Tristate> = children.iter().copied().map(Tristate::from).collect();
            prop_assert_eq!(Tristate::all(tri.iter().copied()), Tristate::from(children.iter().all(|b| *b)));
            prop_assert_eq!(Tristate::any(tri.iter().copied()), Tristate::from(children.iter().any(|b| *b)));
        }

        /// Property: a TRUE child makes OR true whatever else fails
        #[test]
        fn prop_or_true_absorbs_fail(children in proptest::collection::vec(tristate(), 0..8)) {
            let mut with_true = children.clone();
            with_true.push(T);
            prop_assert_eq!(Tristate::any(with_true), T);
        }

        /// Property: a FAIL child makes AND fail whatever else is false
        #[test]
        fn prop_and_fail_dominates(children in proptest::collection::vec(tristate(), 0..8)) {
            let mut with_fail = children.clone();
            with_fail.push(Fail);
            prop_assert_eq!(Tristate::all(with_fail), Fail);
        }
    }
}
