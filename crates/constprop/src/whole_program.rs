//! # Whole-Program State
//!
//! Facts computed ahead of time over the whole program and consulted, never
//! updated, while a single method is optimized. A fact must hold in every
//! reachable state of the program; it is trusted as given.

use dexopt_ir::FieldRef;
use rustc_hash::FxHashMap;

use crate::domain::ConstantDomain;
use crate::lattice::JoinSemiLattice;

/// Read-only view of whole-program facts
pub trait WholeProgramState: Send + Sync {
    /// Value every read of the static field `field` observes; `Top` when
    /// unknown
    fn get_field_value(&self, field: &FieldRef) -> ConstantDomain;
}

/// Whole-program state that knows nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoWholeProgramState;

impl WholeProgramState for NoWholeProgramState {
    fn get_field_value(&self, _field: &FieldRef) -> ConstantDomain {
        ConstantDomain::Top
    }
}

/// Static fields known to hold a single constant for the whole program
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldSummary {
    fields: FxHashMap<FieldRef, i64>,
}

impl FieldSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl FromIterator<(FieldRef, i64)> for FieldSummary {
    fn from_iter<I: IntoIterator<Item = (FieldRef, i64)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

impl WholeProgramState for FieldSummary {
    fn get_field_value(&self, field: &FieldRef) -> ConstantDomain {
        self.fields
            .get(field)
            .map_or(ConstantDomain::Top, |&k| ConstantDomain::Constant(k))
    }
}

/// Abstract values of a method's parameters, by parameter index
///
/// Unset parameters are `Top`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArgumentDomain {
    args: FxHashMap<usize, ConstantDomain>,
}

impl ArgumentDomain {
    /// Nothing is known about any parameter
    pub fn top() -> Self {
        Self::default()
    }

    pub fn get(&self, idx: usize) -> ConstantDomain {
        self.args.get(&idx).copied().unwrap_or(ConstantDomain::Top)
    }

    pub fn set(&mut self, idx: usize, value: ConstantDomain) {
        if value.is_top() {
            self.args.remove(&idx);
        } else {
            self.args.insert(idx, value);
        }
    }

    pub fn with(mut self, idx: usize, value: ConstantDomain) -> Self {
        self.set(idx, value);
        self
    }

    pub fn is_top(&self) -> bool {
        self.args.is_empty()
    }
}
