//! # Constant Domain
//!
//! The abstract value of one register or field:
//!
//! ```text
//!            Top
//!     /  /   |   \  \
//!   ... -1   0   1  ...
//!     \  \   |   /  /
//!           Bottom
//! ```
//!
//! Distinct constants are unordered, so joining two of them gives `Top`.

use std::fmt;

use crate::lattice::{JoinSemiLattice, Lattice, MeetSemiLattice};

/// Flat constant lattice over signed 64-bit literals
///
/// Narrow (32-bit) values are stored sign-extended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstantDomain {
    /// No value: the program point is unreachable
    Bottom,
    /// Exactly this value
    Constant(i64),
    /// Any value
    Top,
}

impl ConstantDomain {
    pub const fn constant(literal: i64) -> Self {
        Self::Constant(literal)
    }

    pub const fn top() -> Self {
        Self::Top
    }

    pub const fn bottom() -> Self {
        Self::Bottom
    }

    /// Returns the literal iff this is a constant leaf
    pub const fn get_constant(&self) -> Option<i64> {
        match self {
            Self::Constant(k) => Some(*k),
            _ => None,
        }
    }

    pub const fn is_constant(&self) -> bool {
        matches!(self, Self::Constant(_))
    }
}

impl Default for ConstantDomain {
    fn default() -> Self {
        Self::Top
    }
}

impl JoinSemiLattice for ConstantDomain {
    fn join(&self, other: &Self) -> Self {
        use ConstantDomain::*;
        match (*self, *other) {
            (Bottom, x) | (x, Bottom) => x,
            (Constant(a), Constant(b)) if a == b => Constant(a),
            _ => Top,
        }
    }

    fn is_top(&self) -> bool {
        matches!(self, Self::Top)
    }
}

impl MeetSemiLattice for ConstantDomain {
    fn meet(&self, other: &Self) -> Self {
        use ConstantDomain::*;
        match (*self, *other) {
            (Top, x) | (x, Top) => x,
            (Constant(a), Constant(b)) if a == b => Constant(a),
            _ => Bottom,
        }
    }

    fn is_bottom(&self) -> bool {
        matches!(self, Self::Bottom)
    }
}

impl Lattice for ConstantDomain {
    fn top() -> Self {
        Self::Top
    }

    fn bottom() -> Self {
        Self::Bottom
    }

    fn leq(&self, other: &Self) -> bool {
        use ConstantDomain::*;
        match (*self, *other) {
            (Bottom, _) | (_, Top) => true,
            (Constant(a), Constant(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for ConstantDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bottom => write!(f, "_|_"),
            Self::Constant(k) => write!(f, "{k}"),
            Self::Top => write!(f, "T"),
        }
    }
}
