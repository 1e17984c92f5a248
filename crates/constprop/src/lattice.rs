//! # Lattice Traits
//!
//! Abstract values combine at CFG join points through a join (least upper
//! bound) and get refined along branch edges through a meet (greatest lower
//! bound). Both the per-register [`ConstantDomain`](crate::ConstantDomain)
//! and the whole [`ConstantEnvironment`](crate::ConstantEnvironment)
//! implement these traits.
//!
//! Orientation: bottom is "no value reaches here" (unreachable), top is "any
//! value". Joining with bottom changes nothing.

use std::fmt::Debug;

/// A join semi-lattice
///
/// `join` must be idempotent, commutative and associative.
pub trait JoinSemiLattice: Clone + Debug + PartialEq {
    /// Least upper bound of two elements
    #[must_use]
    fn join(&self, other: &Self) -> Self;

    /// Returns `true` for the greatest element
    fn is_top(&self) -> bool;
}

/// A meet semi-lattice
///
/// `meet` must be idempotent, commutative and associative.
pub trait MeetSemiLattice: Clone + Debug + PartialEq {
    /// Greatest lower bound of two elements
    #[must_use]
    fn meet(&self, other: &Self) -> Self;

    /// Returns `true` for the least element
    fn is_bottom(&self) -> bool;
}

/// A lattice with both operations and distinguished extremes
///
/// Absorption holds: `x.meet(&x.join(&y)) == x` and `x.join(&x.meet(&y)) == x`.
pub trait Lattice: JoinSemiLattice + MeetSemiLattice {
    fn top() -> Self;

    fn bottom() -> Self;

    /// Partial order: `self ⊑ other`
    fn leq(&self, other: &Self) -> bool {
        self.join(other) == *other
    }
}
