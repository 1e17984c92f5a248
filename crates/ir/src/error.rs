//! # IR Errors

use crate::{block_label, BlockId, CodeId, InsnId, Opcode};

/// Errors raised by structural queries, validation and the mutation
/// primitives of [`IrCode`](crate::IrCode)
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum IrError {
    #[error("Instruction {0:?} is not attached to any block")]
    DetachedInstruction(InsnId),

    #[error("Unknown instruction handle {0:?}")]
    UnknownInstruction(InsnId),

    #[error("Unknown block {}", block_label(*.0))]
    UnknownBlock(BlockId),

    #[error("Change set built for code {expected} applied to code {found}")]
    ForeignChangeSet { expected: CodeId, found: CodeId },

    #[error("Instruction {0:?} is edited more than once in the same change set")]
    ConflictingEdits(InsnId),

    #[error("Expected a conditional branch, found {0}")]
    NotABranch(Opcode),

    #[error("A conditional branch can only be replaced with goto, not {0}")]
    UnsupportedBranchReplacement(Opcode),

    #[error("Branch instructions must be replaced with replace_branch, found {0}")]
    BranchNeedsEdgeUpdate(Opcode),

    #[error("Block {} has no {kind} successor edge\n{dump}", block_label(*.block))]
    MissingEdge {
        block: BlockId,
        kind: crate::EdgeType,
        dump: String,
    },

    #[error("Invalid instruction {insn:?}: {reason}")]
    InvalidInstruction { insn: InsnId, reason: String },

    #[error("Invalid block {}: {reason}\n{dump}", block_label(*.block))]
    InvalidBlock {
        block: BlockId,
        reason: String,
        dump: String,
    },

    #[error("Block {} is not reachable from the entry block", block_label(*.0))]
    UnreachableBlock(BlockId),
}

pub type IrResult<T> = Result<T, IrError>;
