//! # Fixpoint Iterator
//!
//! Forward worklist solver computing the [`ConstantEnvironment`] at the entry
//! and exit of every block.
//!
//! ## Algorithm
//!
//! ```text
//! entry(B) = initial                         if B is the entry block
//!          ⊔ { analyze_edge(e, exit(P)) | e: P -> B }
//! exit(B)  = analyze_instruction over B's instructions, starting at entry(B)
//! ```
//!
//! Blocks are seeded in reverse postorder. Whenever the exit state of a
//! block changes, its successors are queued again. Values only move up a
//! lattice of finite height, so the iteration terminates.
//!
//! Blocks not reachable from the entry block keep a bottom state.

use std::collections::VecDeque;

use dexopt_ir::{cfg, BlockId, EdgeId, EdgeType, Instruction, IrCode, Opcode};
use index_vec::IndexVec;

use crate::analyzer::InstructionAnalyzer;
use crate::domain::ConstantDomain;
use crate::environment::ConstantEnvironment;
use crate::lattice::MeetSemiLattice;

static BOTTOM: ConstantEnvironment = ConstantEnvironment::Bottom;

/// Intraprocedural constant propagation over one method
#[derive(Debug)]
pub struct FixpointIterator<'w> {
    analyzer: InstructionAnalyzer<'w>,
    entry_states: IndexVec<BlockId, ConstantEnvironment>,
    exit_states: IndexVec<BlockId, ConstantEnvironment>,
    /// Blocks to be processed
    worklist: VecDeque<BlockId>,
    /// Dedup flags for the worklist
    in_worklist: IndexVec<BlockId, bool>,
    /// Number of block visits in the last run
    iterations: usize,
}

impl<'w> FixpointIterator<'w> {
    pub fn new(analyzer: InstructionAnalyzer<'w>) -> Self {
        Self {
            analyzer,
            entry_states: IndexVec::new(),
            exit_states: IndexVec::new(),
            worklist: VecDeque::new(),
            in_worklist: IndexVec::new(),
            iterations: 0,
        }
    }

    /// Runs the analysis to a fixpoint, starting from `initial` at the entry
    /// block
    ///
    /// Results of an earlier run are discarded.
    pub fn run(&mut self, code: &IrCode, initial: ConstantEnvironment) {
        let num_blocks = code.num_blocks();
        self.entry_states = IndexVec::from_vec(vec![ConstantEnvironment::Bottom; num_blocks]);
        self.exit_states = IndexVec::from_vec(vec![ConstantEnvironment::Bottom; num_blocks]);
        self.in_worklist = IndexVec::from_vec(vec![false; num_blocks]);
        self.worklist.clear();
        self.iterations = 0;

        for block_id in cfg::reverse_postorder(code) {
            self.worklist.push_back(block_id);
            self.in_worklist[block_id] = true;
        }

        while let Some(block_id) = self.worklist.pop_front() {
            self.in_worklist[block_id] = false;
            self.iterations += 1;

            let entry = self.compute_entry_state(code, block_id, &initial);
            let exit = self.analyze_block(code, block_id, entry.clone());
            self.entry_states[block_id] = entry;

            if exit != self.exit_states[block_id] {
                self.exit_states[block_id] = exit;
                for succ in cfg::successors(code, block_id) {
                    if !self.in_worklist[succ] {
                        self.worklist.push_back(succ);
                        self.in_worklist[succ] = true;
                    }
                }
            }
        }

        log::debug!(
            "constant propagation fixpoint: {} block visits over {} blocks",
            self.iterations,
            num_blocks
        );
    }

    fn compute_entry_state(
        &self,
        code: &IrCode,
        block_id: BlockId,
        initial: &ConstantEnvironment,
    ) -> ConstantEnvironment {
        let mut entry = if block_id == code.entry_block() {
            initial.clone()
        } else {
            ConstantEnvironment::Bottom
        };

        let preds = code
            .block(block_id)
            .map(|block| block.preds.as_slice())
            .unwrap_or_default();
        for &edge_id in preds {
            let pred = code.edge(edge_id).src;
            let incoming = self.analyze_edge(code, edge_id, self.exit_states[pred].clone());
            entry.join_with(&incoming);
        }
        entry
    }

    fn analyze_block(
        &self,
        code: &IrCode,
        block_id: BlockId,
        entry: ConstantEnvironment,
    ) -> ConstantEnvironment {
        code.block_insns(block_id)
            .fold(entry, |env, (_, insn)| self.analyze_instruction(insn, env))
    }

    /// State at the entry of `block`; bottom if the block is unreachable
    pub fn get_entry_state_at(&self, block: BlockId) -> &ConstantEnvironment {
        self.entry_states.get(block).unwrap_or(&BOTTOM)
    }

    /// State at the exit of `block`, before any edge refinement
    pub fn get_exit_state_at(&self, block: BlockId) -> &ConstantEnvironment {
        self.exit_states.get(block).unwrap_or(&BOTTOM)
    }

    /// Transfer function of a single instruction
    pub fn analyze_instruction(
        &self,
        insn: &Instruction,
        env: ConstantEnvironment,
    ) -> ConstantEnvironment {
        self.analyzer.analyze_instruction(insn, env)
    }

    /// Refines the exit state of the source of `edge` for the outcome the
    /// edge stands for
    ///
    /// Returns bottom if the edge can never be taken, and `exit` unchanged if
    /// the source block does not end in a conditional branch.
    pub fn analyze_edge(
        &self,
        code: &IrCode,
        edge: EdgeId,
        exit: ConstantEnvironment,
    ) -> ConstantEnvironment {
        if exit.is_bottom() {
            return exit;
        }
        let edge = code.edge(edge);
        let Some(insn) = code
            .branch_insn(edge.src)
            .and_then(|id| code.instruction(id).ok())
        else {
            return exit;
        };
        refine_branch_edge(insn, edge.kind, exit)
    }

    /// Number of block visits the last run needed
    pub const fn iterations(&self) -> usize {
        self.iterations
    }

    pub const fn analyzer(&self) -> &InstructionAnalyzer<'w> {
        &self.analyzer
    }
}

/// Outcome of a conditional branch on constant operands
///
/// Zero tests compare `left` against `right`, which callers pass as 0.
pub fn eval_comparison(op: Opcode, left: i64, right: i64) -> Option<bool> {
    use Opcode::*;
    let taken = match op {
        IfEq | IfEqz => left == right,
        IfNe | IfNez => left != right,
        IfLt | IfLtz => left < right,
        IfGe | IfGez => left >= right,
        IfGt | IfGtz => left > right,
        IfLe | IfLez => left <= right,
        _ => return None,
    };
    Some(taken)
}

fn refine_branch_edge(
    insn: &Instruction,
    kind: EdgeType,
    mut env: ConstantEnvironment,
) -> ConstantEnvironment {
    let op = insn.opcode;
    let taken = kind == EdgeType::Branch;

    let left = insn.src(0);
    let right = if op.is_if_testz() { None } else { insn.src(1) };
    let lhs = left.map_or(ConstantDomain::Top, |reg| env.get(reg));
    let rhs = if op.is_if_testz() {
        ConstantDomain::Constant(0)
    } else {
        right.map_or(ConstantDomain::Top, |reg| env.get(reg))
    };

    if let (Some(a), Some(b)) = (lhs.get_constant(), rhs.get_constant()) {
        if eval_comparison(op, a, b).is_some_and(|outcome| outcome != taken) {
            env.set_to_bottom();
        }
        return env;
    }

    // Only equality is expressible in the constant lattice
    let operands_equal = match op {
        Opcode::IfEq | Opcode::IfEqz => taken,
        Opcode::IfNe | Opcode::IfNez => !taken,
        _ => false,
    };
    if operands_equal {
        let refined = lhs.meet(&rhs);
        for reg in [left, right].into_iter().flatten() {
            env.set(reg, refined);
        }
    }
    env
}

#[cfg(test)]
#[path = "fixpoint_tests.rs"]
mod tests;
