//! # Register Bytecode IR
//!
//! This crate defines the in-memory representation of a register-based
//! bytecode method that the optimization passes operate on.
//!
//! ## Architecture
//!
//! ```text
//! IrCode
//! insns: IndexVec<InsnId, Instruction>   (arena, handles never move)
//! blocks: IndexVec<BlockId, Block>
//! edges: IndexVec<EdgeId, Edge>
//! entry: BlockId
//!
//! Block
//! insns: Vec<InsnId>
//! preds / succs: Vec<EdgeId>
//! ```
//!
//! Instructions are owned by the arena and referenced everywhere else through
//! an [`InsnId`]. Editing a block only re-links handles, so a handle taken
//! before an edit keeps pointing at the same instruction afterwards. An
//! instruction that has been replaced or removed stays in the arena but is no
//! longer attached to any block.
//!
//! ## Editing
//!
//! Passes never edit code while they inspect it. They record their edits in
//! a [`ChangeSet`] and apply it in one batch through the three mutation
//! primitives of [`IrCode`]: `replace_opcode`, `replace_branch` and
//! `remove_opcode`.

pub use block::Block;
pub use builder::CodeBuilder;
pub use changes::{AppliedChanges, ChangeSet};
pub use code::{CodeId, IrCode};
pub use edge::{Edge, EdgeType};
pub use error::{IrError, IrResult};
pub use field::FieldRef;
pub use instruction::Instruction;
pub use opcode::{Opcode, OpcodeCategory};

pub mod block;
pub mod builder;
pub mod cfg;
pub mod changes;
pub mod code;
pub mod edge;
pub mod error;
pub mod field;
pub mod instruction;
pub mod opcode;

// --- Core Identifiers ---

index_vec::define_index_type! {
    /// Stable handle of an instruction inside an [`IrCode`] arena
    pub struct InsnId = u32;
}

index_vec::define_index_type! {
    /// Unique identifier for a basic block within a method
    pub struct BlockId = u32;
}

index_vec::define_index_type! {
    /// Unique identifier for a CFG edge within a method
    pub struct EdgeId = u32;
}

/// A virtual register number
///
/// Wide values occupy the register pair `(r, r + 1)` and are addressed by the
/// lower register.
pub type Reg = u32;

/// Pseudo register holding the value produced by the last instruction that
/// pairs with a `move-result-pseudo*` or `move-result*`.
pub const RESULT_REGISTER: Reg = Reg::MAX;

// --- Pretty Printing Support ---

/// Trait for pretty-printing IR constructs
pub trait PrettyPrint {
    fn pretty_print(&self, indent: usize) -> String;
}

/// Helper function to create indentation
pub(crate) fn indent_str(level: usize) -> String {
    "  ".repeat(level)
}

/// Formats a block id the way it appears in dumps, e.g. `B3`
pub fn block_label(id: BlockId) -> String {
    format!("B{}", id.index())
}
