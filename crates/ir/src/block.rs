//! # Basic Blocks
//!
//! A basic block is a straight-line sequence of instruction handles. Only the
//! last instruction may transfer control (`if-*`, `goto`, `return*`, `throw`);
//! a block whose last instruction is none of those falls through along its
//! single `Goto` edge.

use crate::{EdgeId, InsnId};

/// A basic block in the control flow graph
///
/// # Invariants
///
/// - `insns` only holds handles of instructions owned by this block
/// - `succs` lists the outgoing edges in insertion order, `preds` the
///   incoming ones
/// - A block ending in a conditional branch has one `Branch` and one `Goto`
///   successor edge
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Block {
    /// Instruction handles in execution order
    pub insns: Vec<InsnId>,

    /// Incoming edges
    pub preds: Vec<EdgeId>,

    /// Outgoing edges
    pub succs: Vec<EdgeId>,
}

impl Block {
    /// Creates a new empty block
    pub const fn new() -> Self {
        Self {
            insns: Vec::new(),
            preds: Vec::new(),
            succs: Vec::new(),
        }
    }

    /// Returns the instruction handles of this block
    pub fn insns(&self) -> &[InsnId] {
        &self.insns
    }

    pub fn preds(&self) -> &[EdgeId] {
        &self.preds
    }

    pub fn succs(&self) -> &[EdgeId] {
        &self.succs
    }

    /// Returns the last instruction handle, if any
    pub fn last_insn(&self) -> Option<InsnId> {
        self.insns.last().copied()
    }

    /// Returns the position of `insn` within this block
    pub fn position_of(&self, insn: InsnId) -> Option<usize> {
        self.insns.iter().position(|&id| id == insn)
    }

    pub fn is_empty(&self) -> bool {
        self.insns.is_empty()
    }

    pub fn len(&self) -> usize {
        self.insns.len()
    }
}
