//! # Batched Edits
//!
//! A [`ChangeSet`] collects the edits a pass decides on while it inspects a
//! method, and applies them in one go once inspection is over. Handles stay
//! valid while the set is being built because nothing is edited yet.
//!
//! Applying a set runs replacements first, in the order they were recorded,
//! then deletions. The whole batch is checked before the first edit, so a
//! rejected set leaves the code untouched.

use rustc_hash::FxHashSet;

use crate::{CodeId, EdgeType, InsnId, Instruction, IrCode, IrError, IrResult};

/// Edits recorded against one [`IrCode`]
#[derive(Debug, Clone)]
pub struct ChangeSet {
    code_id: CodeId,
    replacements: Vec<(InsnId, Instruction)>,
    deletions: Vec<InsnId>,
}

/// Handles produced by applying a [`ChangeSet`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppliedChanges {
    /// `(old, new)` pairs, in application order
    pub replaced: Vec<(InsnId, InsnId)>,

    /// Removed instructions
    pub deleted: Vec<InsnId>,
}

impl ChangeSet {
    /// Creates an empty change set bound to `code`
    pub fn new(code: &IrCode) -> Self {
        Self {
            code_id: code.id(),
            replacements: Vec::new(),
            deletions: Vec::new(),
        }
    }

    /// Schedules the replacement of `old` with `new`
    ///
    /// A conditional branch is replaced through
    /// [`IrCode::replace_branch`], anything else through
    /// [`IrCode::replace_opcode`].
    pub fn replace(&mut self, old: InsnId, new: Instruction) {
        log::trace!("schedule replace {old:?} with `{new}`");
        self.replacements.push((old, new));
    }

    /// Schedules the removal of `insn`
    pub fn delete(&mut self, insn: InsnId) {
        log::trace!("schedule delete {insn:?}");
        self.deletions.push(insn);
    }

    pub const fn code_id(&self) -> CodeId {
        self.code_id
    }

    pub fn replacements(&self) -> &[(InsnId, Instruction)] {
        &self.replacements
    }

    pub fn deletions(&self) -> &[InsnId] {
        &self.deletions
    }

    pub fn is_empty(&self) -> bool {
        self.replacements.is_empty() && self.deletions.is_empty()
    }

    /// Applies every scheduled edit to `code`
    ///
    /// # Errors
    ///
    /// Returns an error without editing anything if the set was built for
    /// other code, names a detached or unknown handle, edits the same handle
    /// twice, or pairs a replacement with the wrong primitive.
    pub fn apply(self, code: &mut IrCode) -> IrResult<AppliedChanges> {
        self.check(code)?;

        let mut applied = AppliedChanges::default();
        for (old, new) in self.replacements {
            let is_branch = code.instruction(old)?.opcode.is_conditional_branch();
            let new_id = if is_branch {
                code.replace_branch(old, new)?
            } else {
                code.replace_opcode(old, new)?
            };
            applied.replaced.push((old, new_id));
        }
        for insn in self.deletions {
            code.remove_opcode(insn)?;
            applied.deleted.push(insn);
        }

        log::debug!(
            "applied {} replacements and {} deletions to code {}",
            applied.replaced.len(),
            applied.deleted.len(),
            code.id()
        );
        Ok(applied)
    }

    fn check(&self, code: &IrCode) -> IrResult<()> {
        if self.code_id != code.id() {
            return Err(IrError::ForeignChangeSet {
                expected: self.code_id,
                found: code.id(),
            });
        }

        let mut seen = FxHashSet::default();
        let edited = self
            .replacements
            .iter()
            .map(|(old, _)| *old)
            .chain(self.deletions.iter().copied());
        for insn in edited {
            code.block_of(insn)?;
            if !seen.insert(insn) {
                return Err(IrError::ConflictingEdits(insn));
            }
        }

        for (old, new) in &self.replacements {
            let old_op = code.instruction(*old)?.opcode;
            if old_op.is_conditional_branch() {
                if !new.opcode.is_goto() {
                    return Err(IrError::UnsupportedBranchReplacement(new.opcode));
                }
            } else if old_op.is_branch() || new.opcode.is_branch() {
                return Err(IrError::BranchNeedsEdgeUpdate(if old_op.is_branch() {
                    old_op
                } else {
                    new.opcode
                }));
            }
        }

        // Branch edits rewire both edges of their block
        for insn in self
            .replacements
            .iter()
            .map(|(old, _)| *old)
            .chain(self.deletions.iter().copied())
        {
            if !code.instruction(insn)?.opcode.is_conditional_branch() {
                continue;
            }
            let block = code.block_of(insn)?;
            for kind in [EdgeType::Goto, EdgeType::Branch] {
                if code.succ_edge(block, kind).is_none() {
                    return Err(IrError::MissingEdge {
                        block,
                        kind,
                        dump: code.dump_block(block),
                    });
                }
            }
        }

        Ok(())
    }
}
