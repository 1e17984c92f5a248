//! # Constant Environment
//!
//! Maps registers, and the static fields of a class under initialization, to
//! [`ConstantDomain`] values.
//!
//! ## Representation
//!
//! ```text
//! Bottom                      unreachable program point
//! Value { registers, fields } absent key = Top, present key = Constant(k)
//! ```
//!
//! Only constants are stored. Writing `Top` removes the key, writing
//! `Bottom` collapses the whole environment to `Bottom`, so two environments
//! describing the same state always compare equal.

use std::fmt;

use dexopt_ir::{FieldRef, Reg, RESULT_REGISTER};
use rustc_hash::FxHashMap;

use crate::domain::ConstantDomain;
use crate::lattice::{JoinSemiLattice, Lattice, MeetSemiLattice};

/// Abstract state of a method at one program point
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConstantEnvironment {
    Bottom,
    Value {
        registers: FxHashMap<Reg, i64>,
        fields: FxHashMap<FieldRef, i64>,
    },
}

impl ConstantEnvironment {
    /// The environment where nothing is known
    pub fn top() -> Self {
        Self::Value {
            registers: FxHashMap::default(),
            fields: FxHashMap::default(),
        }
    }

    pub const fn bottom() -> Self {
        Self::Bottom
    }

    /// Returns the value of `reg`; `Top` if unbound, `Bottom` on a bottom
    /// environment
    pub fn get(&self, reg: Reg) -> ConstantDomain {
        match self {
            Self::Bottom => ConstantDomain::Bottom,
            Self::Value { registers, .. } => registers
                .get(&reg)
                .map_or(ConstantDomain::Top, |&k| ConstantDomain::Constant(k)),
        }
    }

    /// Binds `reg` to `value`
    ///
    /// Has no effect on a bottom environment. Binding `Bottom` makes the
    /// environment bottom.
    pub fn set(&mut self, reg: Reg, value: ConstantDomain) {
        let Self::Value { registers, .. } = self else {
            return;
        };
        match value {
            ConstantDomain::Constant(k) => {
                registers.insert(reg, k);
            }
            ConstantDomain::Top => {
                registers.remove(&reg);
            }
            ConstantDomain::Bottom => *self = Self::Bottom,
        }
    }

    /// Returns the value of the static field `field`
    pub fn get_field(&self, field: &FieldRef) -> ConstantDomain {
        match self {
            Self::Bottom => ConstantDomain::Bottom,
            Self::Value { fields, .. } => fields
                .get(field)
                .map_or(ConstantDomain::Top, |&k| ConstantDomain::Constant(k)),
        }
    }

    /// Binds the static field `field` to `value`, with the same rules as
    /// [`ConstantEnvironment::set`]
    pub fn set_field(&mut self, field: &FieldRef, value: ConstantDomain) {
        let Self::Value { fields, .. } = self else {
            return;
        };
        match value {
            ConstantDomain::Constant(k) => {
                fields.insert(field.clone(), k);
            }
            ConstantDomain::Top => {
                fields.remove(field);
            }
            ConstantDomain::Bottom => *self = Self::Bottom,
        }
    }

    pub fn set_to_bottom(&mut self) {
        *self = Self::Bottom;
    }

    /// Joins `other` into `self`; returns true if `self` changed
    pub fn join_with(&mut self, other: &Self) -> bool {
        let joined = JoinSemiLattice::join(self, other);
        if joined == *self {
            false
        } else {
            *self = joined;
            true
        }
    }

    /// Number of bound registers and fields
    pub fn len(&self) -> usize {
        match self {
            Self::Bottom => 0,
            Self::Value { registers, fields } => registers.len() + fields.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ConstantEnvironment {
    fn default() -> Self {
        Self::top()
    }
}

/// Keeps the bindings present in both maps with equal values
fn intersect<K: Clone + Eq + std::hash::Hash>(
    a: &FxHashMap<K, i64>,
    b: &FxHashMap<K, i64>,
) -> FxHashMap<K, i64> {
    a.iter()
        .filter(|&(key, value)| b.get(key) == Some(value))
        .map(|(key, &value)| (key.clone(), value))
        .collect()
}

/// Unions two binding maps; `None` if a key is bound to different values
fn union<K: Clone + Eq + std::hash::Hash>(
    a: &FxHashMap<K, i64>,
    b: &FxHashMap<K, i64>,
) -> Option<FxHashMap<K, i64>> {
    let mut result = a.clone();
    for (key, &value) in b {
        match result.get(key) {
            Some(&existing) if existing != value => return None,
            _ => {
                result.insert(key.clone(), value);
            }
        }
    }
    Some(result)
}

impl JoinSemiLattice for ConstantEnvironment {
    fn join(&self, other: &Self) -> Self {
        match (self, other) {
            (Self::Bottom, x) | (x, Self::Bottom) => x.clone(),
            (
                Self::Value {
                    registers: ra,
                    fields: fa,
                },
                Self::Value {
                    registers: rb,
                    fields: fb,
                },
            ) => Self::Value {
                registers: intersect(ra, rb),
                fields: intersect(fa, fb),
            },
        }
    }

    fn is_top(&self) -> bool {
        matches!(
            self,
            Self::Value { registers, fields } if registers.is_empty() && fields.is_empty()
        )
    }
}

impl MeetSemiLattice for ConstantEnvironment {
    fn meet(&self, other: &Self) -> Self {
        match (self, other) {
            (Self::Bottom, _) | (_, Self::Bottom) => Self::Bottom,
            (
                Self::Value {
                    registers: ra,
                    fields: fa,
                },
                Self::Value {
                    registers: rb,
                    fields: fb,
                },
            ) => match (union(ra, rb), union(fa, fb)) {
                (Some(registers), Some(fields)) => Self::Value { registers, fields },
                _ => Self::Bottom,
            },
        }
    }

    fn is_bottom(&self) -> bool {
        matches!(self, Self::Bottom)
    }
}

impl Lattice for ConstantEnvironment {
    fn top() -> Self {
        Self::top()
    }

    fn bottom() -> Self {
        Self::Bottom
    }

    fn leq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Bottom, _) => true,
            (_, Self::Bottom) => false,
            (
                Self::Value {
                    registers: ra,
                    fields: fa,
                },
                Self::Value {
                    registers: rb,
                    fields: fb,
                },
            ) => {
                rb.iter().all(|(reg, value)| ra.get(reg) == Some(value))
                    && fb.iter().all(|(field, value)| fa.get(field) == Some(value))
            }
        }
    }
}

impl fmt::Display for ConstantEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (registers, fields) = match self {
            Self::Bottom => return write!(f, "_|_"),
            Self::Value { registers, fields } => (registers, fields),
        };

        let mut regs: Vec<_> = registers.iter().collect();
        regs.sort();
        let mut entries: Vec<String> = regs
            .into_iter()
            .map(|(&reg, k)| {
                if reg == RESULT_REGISTER {
                    format!("result={k}")
                } else {
                    format!("v{reg}={k}")
                }
            })
            .collect();

        let mut fields: Vec<_> = fields.iter().collect();
        fields.sort();
        entries.extend(fields.into_iter().map(|(field, k)| format!("{field}={k}")));

        write!(f, "{{{}}}", entries.join(", "))
    }
}

#[cfg(test)]
#[path = "environment_tests.rs"]
mod tests;
