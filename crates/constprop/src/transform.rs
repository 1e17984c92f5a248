//! # Constant Propagation Transform
//!
//! Rewrites a method using the results of a [`FixpointIterator`]:
//!
//! - materializes registers proven constant as `const`/`const-wide`
//! - deletes static-field writes of the value the field is known to hold
//! - turns conditional branches with one impossible side into `goto` or
//!   removes them
//!
//! Decisions are taken block by block on the state right after each
//! instruction and recorded in a [`ChangeSet`], which is applied only once
//! every block has been inspected.

use std::fmt;
use std::ops::{Add, AddAssign};

use dexopt_ir::{
    block_label, BlockId, ChangeSet, EdgeType, InsnId, Instruction, IrCode, Opcode,
};
use serde::Serialize;

use crate::config::ConstantPropagationConfig;
use crate::environment::ConstantEnvironment;
use crate::error::{ConstPropError, ConstPropResult};
use crate::fixpoint::FixpointIterator;
use crate::lattice::MeetSemiLattice;
use crate::whole_program::WholeProgramState;

/// What a transform run changed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Stats {
    /// Instructions replaced by a constant load
    pub materialized_consts: usize,
    /// Conditional branches replaced by `goto` or removed
    pub branches_removed: usize,
    /// Static-field writes deleted because the field already holds the value
    pub redundant_stores_removed: usize,
}

impl Stats {
    /// Returns true if the code was changed
    pub const fn changed(&self) -> bool {
        self.materialized_consts + self.branches_removed + self.redundant_stores_removed > 0
    }
}

impl Add for Stats {
    type Output = Self;

    fn add(mut self, other: Self) -> Self {
        self += other;
        self
    }
}

impl AddAssign for Stats {
    fn add_assign(&mut self, other: Self) {
        self.materialized_consts += other.materialized_consts;
        self.branches_removed += other.branches_removed;
        self.redundant_stores_removed += other.redundant_stores_removed;
    }
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} consts materialized, {} branches removed, {} redundant stores removed",
            self.materialized_consts, self.branches_removed, self.redundant_stores_removed
        )
    }
}

/// The rewrite half of constant propagation
#[derive(Debug, Clone, Copy, Default)]
pub struct Transform {
    config: ConstantPropagationConfig,
}

impl Transform {
    pub const fn new(config: ConstantPropagationConfig) -> Self {
        Self { config }
    }

    /// Rewrites `code` according to the analysis results in `fp`
    ///
    /// `fp` must have been run on `code`. Nothing is edited if an error is
    /// returned.
    pub fn apply(
        &self,
        fp: &FixpointIterator<'_>,
        whole_program: &dyn WholeProgramState,
        code: &mut IrCode,
    ) -> ConstPropResult<Stats> {
        let (changes, stats) = self.plan(fp, whole_program, code)?;
        changes.apply(code)?;
        Ok(stats)
    }

    /// Computes the edits without applying them
    pub fn plan(
        &self,
        fp: &FixpointIterator<'_>,
        whole_program: &dyn WholeProgramState,
        code: &IrCode,
    ) -> ConstPropResult<(ChangeSet, Stats)> {
        let mut changes = ChangeSet::new(code);
        let mut stats = Stats::default();

        for block_id in code.block_ids() {
            let mut env = fp.get_entry_state_at(block_id).clone();
            // Unreachable, leave it for dead code removal
            if env.is_bottom() {
                continue;
            }

            let mut prev_op = None;
            for (insn_id, insn) in code.block_insns(block_id) {
                env = fp.analyze_instruction(insn, env);
                self.simplify_instruction(
                    &env,
                    whole_program,
                    insn_id,
                    insn,
                    prev_op,
                    &mut changes,
                    &mut stats,
                );
                prev_op = Some(insn.opcode);
            }
            self.eliminate_dead_branch(fp, code, block_id, &env, &mut changes, &mut stats)?;
        }

        Ok((changes, stats))
    }

    /// `env` is the state right after `insn`
    #[allow(clippy::too_many_arguments)]
    fn simplify_instruction(
        &self,
        env: &ConstantEnvironment,
        whole_program: &dyn WholeProgramState,
        insn_id: InsnId,
        insn: &Instruction,
        prev_op: Option<Opcode>,
        changes: &mut ChangeSet,
        stats: &mut Stats,
    ) {
        let op = insn.opcode;
        match op {
            Opcode::Move | Opcode::MoveWide => {
                if self.config.replace_moves_with_consts {
                    replace_with_const(env, insn_id, insn, changes, stats);
                }
            }
            _ if op.is_move_result_pseudo() => {
                if prev_op.is_some_and(|prev| prev.is_sget() || prev.is_aget()) {
                    replace_with_const(env, insn_id, insn, changes, stats);
                }
            }
            _ if op.is_arithmetic_literal() => {
                replace_with_const(env, insn_id, insn, changes, stats);
            }
            _ if op.is_sput() => {
                let (Some(field), Some(src)) = (insn.field(), insn.src(0)) else {
                    return;
                };
                let Some(known) = whole_program.get_field_value(field).get_constant() else {
                    return;
                };
                if env.get(src).get_constant() == Some(known) {
                    log::trace!("`{insn}` writes the value {field} always holds");
                    changes.delete(insn_id);
                    stats.redundant_stores_removed += 1;
                }
            }
            _ => {}
        }
    }

    fn eliminate_dead_branch(
        &self,
        fp: &FixpointIterator<'_>,
        code: &IrCode,
        block_id: BlockId,
        env: &ConstantEnvironment,
        changes: &mut ChangeSet,
        stats: &mut Stats,
    ) -> ConstPropResult<()> {
        let Some(branch) = code.branch_insn(block_id) else {
            return Ok(());
        };
        let block = code.block(block_id)?;
        if block.succs.len() != 2 {
            return Err(ConstPropError::MalformedBranch {
                block: block_id,
                count: block.succs.len(),
                dump: code.dump_block(block_id),
            });
        }

        for &edge_id in &block.succs {
            if !fp.analyze_edge(code, edge_id, env.clone()).is_bottom() {
                continue;
            }
            let insn = code.instruction(branch)?;
            stats.branches_removed += 1;
            match code.edge(edge_id).kind {
                EdgeType::Goto => {
                    log::trace!("{}: `{insn}` is always taken", block_label(block_id));
                    changes.replace(branch, Instruction::goto());
                }
                EdgeType::Branch => {
                    log::trace!("{}: `{insn}` is never taken", block_label(block_id));
                    changes.delete(branch);
                }
            }
            // A reachable block keeps at least one live successor
            break;
        }
        Ok(())
    }
}

/// Replaces `insn` with a load of the constant its destination holds in
/// `env`, if any
fn replace_with_const(
    env: &ConstantEnvironment,
    insn_id: InsnId,
    insn: &Instruction,
    changes: &mut ChangeSet,
    stats: &mut Stats,
) {
    let Some(dest) = insn.dest else {
        return;
    };
    let Some(literal) = env.get(dest).get_constant() else {
        return;
    };

    let replacement = if insn.dest_is_wide() {
        Instruction::constant_wide(dest, literal)
    } else {
        Instruction::constant(dest, literal)
    };
    log::trace!("replacing `{insn}` with `{replacement}`");
    changes.replace(insn_id, replacement);
    stats.materialized_consts += 1;
}

#[cfg(test)]
#[path = "transform_tests.rs"]
mod tests;
