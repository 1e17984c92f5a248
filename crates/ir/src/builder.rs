//! # Code Builder
//!
//! Block-by-block construction of an [`IrCode`]. The builder keeps a
//! current block; instructions are appended to it, and the methods that end
//! a block (`goto`, `branch`, `fallthrough`) also create its outgoing edges.

use crate::{BlockId, EdgeType, InsnId, Instruction, IrCode, IrResult};

/// A builder for method code
///
/// ```
/// use dexopt_ir::{CodeBuilder, Instruction};
///
/// let mut builder = CodeBuilder::new();
/// let exit = builder.new_block();
/// builder.push(Instruction::constant(0, 1));
/// builder.fallthrough(exit);
/// builder.switch_to_block(exit);
/// builder.push(Instruction::ret(0));
/// let code = builder.build().unwrap();
/// assert_eq!(code.num_blocks(), 2);
/// ```
pub struct CodeBuilder {
    code: IrCode,
    current_block_id: BlockId,
}

impl CodeBuilder {
    /// Creates a builder positioned at the entry block of fresh code
    pub fn new() -> Self {
        let code = IrCode::new();
        let current_block_id = code.entry_block();
        Self {
            code,
            current_block_id,
        }
    }

    /// Creates a new empty block without switching to it
    pub fn new_block(&mut self) -> BlockId {
        self.code.add_block()
    }

    /// Makes `block_id` the block subsequent instructions are appended to
    pub const fn switch_to_block(&mut self, block_id: BlockId) {
        self.current_block_id = block_id;
    }

    pub const fn current_block(&self) -> BlockId {
        self.current_block_id
    }

    /// Appends an instruction to the current block
    pub fn push(&mut self, insn: Instruction) -> InsnId {
        self.code.push_instruction(self.current_block_id, insn)
    }

    /// Ends the current block by falling through to `target`
    pub fn fallthrough(&mut self, target: BlockId) {
        self.code
            .add_edge(self.current_block_id, target, EdgeType::Goto);
    }

    /// Ends the current block with an explicit `goto target`
    pub fn goto(&mut self, target: BlockId) -> InsnId {
        let id = self.push(Instruction::goto());
        self.fallthrough(target);
        id
    }

    /// Ends the current block with a conditional branch
    ///
    /// Control goes to `taken` when the condition holds and falls through to
    /// `fallthrough` otherwise.
    ///
    /// # Panics
    ///
    /// Panics if `insn` is not a conditional branch.
    pub fn branch(&mut self, insn: Instruction, taken: BlockId, fallthrough: BlockId) -> InsnId {
        assert!(
            insn.opcode.is_conditional_branch(),
            "`{insn}` is not a conditional branch"
        );
        let id = self.push(insn);
        self.code
            .add_edge(self.current_block_id, taken, EdgeType::Branch);
        self.code
            .add_edge(self.current_block_id, fallthrough, EdgeType::Goto);
        id
    }

    /// Finishes construction, validating structure and reachability
    pub fn build(self) -> IrResult<IrCode> {
        self.code.validate()?;
        self.code.validate_reachability()?;
        Ok(self.code)
    }

    /// Finishes construction without validation
    pub fn finish(self) -> IrCode {
        self.code
    }
}

impl Default for CodeBuilder {
    fn default() -> Self {
        Self::new()
    }
}
