//! # Method Code
//!
//! [`IrCode`] is the container for the CFG of one method. It owns the
//! instruction arena, the blocks and the edges, and exposes the three
//! mutation primitives passes use to edit code:
//!
//! - [`IrCode::replace_opcode`] swaps a non-branch instruction in place
//! - [`IrCode::replace_branch`] turns a conditional branch into a `goto`,
//!   dropping the fallthrough edge and retyping the taken edge
//! - [`IrCode::remove_opcode`] unlinks an instruction; removing a conditional
//!   branch drops its taken edge so control falls through
//!
//! Replaced and removed instructions stay in the arena and keep their
//! handle, but become detached: they no longer belong to any block and every
//! further edit naming them is rejected.

use std::sync::atomic::{AtomicU64, Ordering};

use index_vec::IndexVec;

use crate::{
    block_label, indent_str, Block, BlockId, Edge, EdgeId, EdgeType, InsnId, Instruction,
    IrError, IrResult, PrettyPrint,
};

static NEXT_CODE_ID: AtomicU64 = AtomicU64::new(0);

/// Identity of one [`IrCode`] instance
///
/// Every container gets a fresh id on creation and on clone, so a
/// [`ChangeSet`](crate::ChangeSet) can tell which container it was built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CodeId(u64);

impl CodeId {
    fn fresh() -> Self {
        Self(NEXT_CODE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for CodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The CFG of a single method
///
/// # Design Notes
///
/// - Instructions live in an arena (`insns`); blocks hold handles into it
/// - `owners` maps every handle to the block it is attached to, or `None`
///   once it has been replaced or removed
/// - Edges removed by an edit stay in the arena but are unlinked from the
///   `preds`/`succs` lists of both endpoints
#[derive(Debug)]
pub struct IrCode {
    id: CodeId,

    insns: IndexVec<InsnId, Instruction>,

    owners: IndexVec<InsnId, Option<BlockId>>,

    blocks: IndexVec<BlockId, Block>,

    edges: IndexVec<EdgeId, Edge>,

    entry: BlockId,
}

impl IrCode {
    /// Creates code holding a single empty entry block
    pub fn new() -> Self {
        let mut blocks = IndexVec::new();
        let entry = blocks.push(Block::new());
        Self {
            id: CodeId::fresh(),
            insns: IndexVec::new(),
            owners: IndexVec::new(),
            blocks,
            edges: IndexVec::new(),
            entry,
        }
    }

    pub const fn id(&self) -> CodeId {
        self.id
    }

    pub const fn entry_block(&self) -> BlockId {
        self.entry
    }

    // ==================== Construction ====================

    /// Adds a new empty block
    pub fn add_block(&mut self) -> BlockId {
        self.blocks.push(Block::new())
    }

    /// Appends an instruction to the end of `block`
    ///
    /// # Panics
    ///
    /// Panics if `block` does not exist.
    pub fn push_instruction(&mut self, block: BlockId, insn: Instruction) -> InsnId {
        let id = self.insns.push(insn);
        self.owners.push(Some(block));
        self.blocks[block].insns.push(id);
        id
    }

    /// Adds an edge and links it into both endpoints
    ///
    /// # Panics
    ///
    /// Panics if either block does not exist.
    pub fn add_edge(&mut self, src: BlockId, target: BlockId, kind: EdgeType) -> EdgeId {
        let id = self.edges.push(Edge::new(src, target, kind));
        self.blocks[src].succs.push(id);
        self.blocks[target].preds.push(id);
        id
    }

    fn unlink_edge(&mut self, edge: EdgeId) {
        let Edge { src, target, .. } = self.edges[edge];
        self.blocks[src].succs.retain(|&e| e != edge);
        self.blocks[target].preds.retain(|&e| e != edge);
    }

    // ==================== Queries ====================

    pub fn block(&self, id: BlockId) -> IrResult<&Block> {
        self.blocks.get(id).ok_or(IrError::UnknownBlock(id))
    }

    pub fn num_blocks(&self) -> usize {
        self.blocks.len()
    }

    /// Iterates over all blocks in id order
    pub fn blocks(&self) -> impl Iterator<Item = (BlockId, &Block)> {
        self.blocks.iter_enumerated()
    }

    pub fn block_ids(&self) -> impl Iterator<Item = BlockId> {
        self.blocks.indices()
    }

    pub fn edge(&self, id: EdgeId) -> &Edge {
        &self.edges[id]
    }

    /// Returns the instruction behind a handle, attached or not
    pub fn instruction(&self, id: InsnId) -> IrResult<&Instruction> {
        self.insns.get(id).ok_or(IrError::UnknownInstruction(id))
    }

    /// Returns the block `insn` is attached to
    pub fn block_of(&self, insn: InsnId) -> IrResult<BlockId> {
        let owner = *self
            .owners
            .get(insn)
            .ok_or(IrError::UnknownInstruction(insn))?;
        owner.ok_or(IrError::DetachedInstruction(insn))
    }

    pub fn is_attached(&self, insn: InsnId) -> bool {
        self.block_of(insn).is_ok()
    }

    /// Iterates over the attached instructions of `block` in order
    ///
    /// # Panics
    ///
    /// Panics if `block` does not exist.
    pub fn block_insns(&self, block: BlockId) -> impl Iterator<Item = (InsnId, &Instruction)> {
        self.blocks[block]
            .insns
            .iter()
            .map(move |&id| (id, &self.insns[id]))
    }

    /// Iterates over every attached instruction, block by block
    pub fn iter_insns(&self) -> impl Iterator<Item = (BlockId, InsnId, &Instruction)> {
        self.blocks.iter_enumerated().flat_map(move |(block_id, block)| {
            block
                .insns
                .iter()
                .map(move |&id| (block_id, id, &self.insns[id]))
        })
    }

    /// Number of attached instructions
    pub fn num_instructions(&self) -> usize {
        self.blocks.iter().map(Block::len).sum()
    }

    /// Returns the outgoing edge of `block` with the given kind
    pub fn succ_edge(&self, block: BlockId, kind: EdgeType) -> Option<EdgeId> {
        self.blocks
            .get(block)?
            .succs
            .iter()
            .copied()
            .find(|&e| self.edges[e].kind == kind)
    }

    /// Returns the conditional branch ending `block`, if any
    pub fn branch_insn(&self, block: BlockId) -> Option<InsnId> {
        let last = self.blocks.get(block)?.last_insn()?;
        self.insns[last]
            .opcode
            .is_conditional_branch()
            .then_some(last)
    }

    // ==================== Mutation primitives ====================

    /// Replaces a non-branch instruction with `new`, keeping its position
    ///
    /// Returns the handle of the inserted instruction. `old` becomes
    /// detached.
    pub fn replace_opcode(&mut self, old: InsnId, new: Instruction) -> IrResult<InsnId> {
        let block = self.block_of(old)?;
        let old_op = self.insns[old].opcode;
        if old_op.is_branch() {
            return Err(IrError::BranchNeedsEdgeUpdate(old_op));
        }
        if new.opcode.is_branch() {
            return Err(IrError::BranchNeedsEdgeUpdate(new.opcode));
        }

        log::trace!("{}: replace `{}` with `{}`", block_label(block), self.insns[old], new);
        Ok(self.swap_in(block, old, new))
    }

    /// Replaces the conditional branch `old` with the `goto` `new`
    ///
    /// The fallthrough (`Goto`) edge of the block is removed and the taken
    /// (`Branch`) edge becomes the block's only, unconditional, successor.
    pub fn replace_branch(&mut self, old: InsnId, new: Instruction) -> IrResult<InsnId> {
        let block = self.block_of(old)?;
        let old_op = self.insns[old].opcode;
        if !old_op.is_conditional_branch() {
            return Err(IrError::NotABranch(old_op));
        }
        if !new.opcode.is_goto() {
            return Err(IrError::UnsupportedBranchReplacement(new.opcode));
        }

        let fallthrough = self.expect_succ_edge(block, EdgeType::Goto)?;
        let taken = self.expect_succ_edge(block, EdgeType::Branch)?;

        log::trace!(
            "{}: replace `{}` with `{}` to {}",
            block_label(block),
            self.insns[old],
            new,
            block_label(self.edges[taken].target)
        );
        self.unlink_edge(fallthrough);
        self.edges[taken].kind = EdgeType::Goto;
        Ok(self.swap_in(block, old, new))
    }

    /// Removes `insn` from its block
    ///
    /// Removing a conditional branch also removes its taken edge, leaving
    /// the block to fall through.
    pub fn remove_opcode(&mut self, insn: InsnId) -> IrResult<()> {
        let block = self.block_of(insn)?;
        if self.insns[insn].opcode.is_conditional_branch() {
            let taken = self.expect_succ_edge(block, EdgeType::Branch)?;
            self.unlink_edge(taken);
        }

        log::trace!("{}: remove `{}`", block_label(block), self.insns[insn]);
        self.blocks[block].insns.retain(|&id| id != insn);
        self.owners[insn] = None;
        Ok(())
    }

    fn expect_succ_edge(&self, block: BlockId, kind: EdgeType) -> IrResult<EdgeId> {
        self.succ_edge(block, kind)
            .ok_or_else(|| IrError::MissingEdge {
                block,
                kind,
                dump: self.dump_block(block),
            })
    }

    fn swap_in(&mut self, block: BlockId, old: InsnId, new: Instruction) -> InsnId {
        let new_id = self.insns.push(new);
        self.owners.push(Some(block));
        for slot in self.blocks[block].insns.iter_mut() {
            if *slot == old {
                *slot = new_id;
            }
        }
        self.owners[old] = None;
        new_id
    }

    // ==================== Validation ====================

    /// Checks the structural invariants of the CFG
    ///
    /// - every attached instruction is well-formed and owned by its block
    /// - control transfers only appear at the end of a block
    /// - `move-result-pseudo*` directly follows a read that produces it
    /// - the successor edges of each block match its last instruction
    /// - edge lists agree on both endpoints
    ///
    /// Blocks that have become unreachable through branch elimination are
    /// allowed; see [`IrCode::validate_reachability`].
    pub fn validate(&self) -> IrResult<()> {
        if self.blocks.get(self.entry).is_none() {
            return Err(IrError::UnknownBlock(self.entry));
        }

        for (block_id, block) in self.blocks.iter_enumerated() {
            self.validate_block(block_id, block)?;
        }
        Ok(())
    }

    fn validate_block(&self, block_id: BlockId, block: &Block) -> IrResult<()> {
        let invalid = |reason: String| IrError::InvalidBlock {
            block: block_id,
            reason,
            dump: self.dump_block(block_id),
        };

        for (pos, &id) in block.insns.iter().enumerate() {
            if self.owners.get(id).copied().flatten() != Some(block_id) {
                return Err(invalid(format!("instruction {id:?} is not owned by this block")));
            }
            let insn = &self.insns[id];
            insn.validate()
                .map_err(|reason| IrError::InvalidInstruction { insn: id, reason })?;

            let is_last = pos + 1 == block.insns.len();
            if (insn.opcode.is_branch() || insn.opcode.ends_control_flow()) && !is_last {
                return Err(invalid(format!("`{insn}` is not at the end of the block")));
            }
            if insn.opcode.is_move_result_pseudo() {
                let Some(read) = pos.checked_sub(1).map(|prev| &self.insns[block.insns[prev]])
                else {
                    return Err(invalid(format!("`{insn}` does not follow a read")));
                };
                if read.opcode.move_result_pseudo_for() != Some(insn.opcode) {
                    return Err(invalid(format!("`{insn}` cannot pick up the value of `{read}`")));
                }
            }
        }

        for &edge_id in &block.succs {
            let edge = &self.edges[edge_id];
            if edge.src != block_id || !self.blocks[edge.target].preds.contains(&edge_id) {
                return Err(invalid(format!("successor edge {edge} is not linked")));
            }
        }
        for &edge_id in &block.preds {
            let edge = &self.edges[edge_id];
            if edge.target != block_id || !self.blocks[edge.src].succs.contains(&edge_id) {
                return Err(invalid(format!("predecessor edge {edge} is not linked")));
            }
        }

        let count = |kind: EdgeType| {
            block
                .succs
                .iter()
                .filter(|&&e| self.edges[e].kind == kind)
                .count()
        };
        let (gotos, branches) = (count(EdgeType::Goto), count(EdgeType::Branch));
        let last_op = block.last_insn().map(|id| self.insns[id].opcode);

        match last_op {
            Some(op) if op.is_conditional_branch() => {
                if block.succs.len() != 2 || gotos != 1 || branches != 1 {
                    return Err(invalid(format!(
                        "`{op}` needs one goto and one branch successor, found {} edges",
                        block.succs.len()
                    )));
                }
            }
            Some(op) if op.is_goto() => {
                if block.succs.len() != 1 || gotos != 1 {
                    return Err(invalid("`goto` needs exactly one goto successor".to_string()));
                }
            }
            Some(op) if op.ends_control_flow() => {
                if !block.succs.is_empty() {
                    return Err(invalid(format!("`{op}` cannot have successors")));
                }
            }
            _ => {
                if block.succs.len() > 1 || branches != 0 {
                    return Err(invalid(
                        "a fallthrough block has at most one goto successor".to_string(),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Checks that every block is reachable from the entry block
    pub fn validate_reachability(&self) -> IrResult<()> {
        let reachable = crate::cfg::reachable_blocks(self);
        match self.block_ids().find(|id| !reachable.contains(id)) {
            Some(id) => Err(IrError::UnreachableBlock(id)),
            None => Ok(()),
        }
    }

    // ==================== Dumps ====================

    /// Renders one block with its edges, used in diagnostics
    pub fn dump_block(&self, block: BlockId) -> String {
        let Some(b) = self.blocks.get(block) else {
            return format!("{}: <unknown>", block_label(block));
        };

        let render_edges = |edges: &[EdgeId], pick: fn(&Edge) -> BlockId| {
            edges
                .iter()
                .map(|&e| {
                    let edge = &self.edges[e];
                    format!("{} ({})", block_label(pick(edge)), edge.kind)
                })
                .collect::<Vec<_>>()
                .join(", ")
        };

        let mut result = format!(
            "{}: preds=[{}] succs=[{}]\n",
            block_label(block),
            render_edges(&b.preds, Edge::src),
            render_edges(&b.succs, Edge::target),
        );
        for &id in &b.insns {
            result.push_str(&format!("{}{}\n", indent_str(1), self.insns[id].pretty_print(0)));
        }
        result
    }
}

impl Default for IrCode {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for IrCode {
    /// Clones the CFG under a fresh [`CodeId`]
    fn clone(&self) -> Self {
        Self {
            id: CodeId::fresh(),
            insns: self.insns.clone(),
            owners: self.owners.clone(),
            blocks: self.blocks.clone(),
            edges: self.edges.clone(),
            entry: self.entry,
        }
    }
}

impl PrettyPrint for IrCode {
    fn pretty_print(&self, indent: usize) -> String {
        let base_indent = indent_str(indent);
        let mut result = format!("{base_indent}code entry={}\n", block_label(self.entry));
        for block_id in self.blocks.indices() {
            for line in self.dump_block(block_id).lines() {
                result.push_str(&format!("{base_indent}{line}\n"));
            }
        }
        result
    }
}

#[cfg(test)]
#[path = "code_tests.rs"]
mod tests;
