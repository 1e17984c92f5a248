//! # Control Flow Graph Utilities
//!
//! Traversal orders and neighbor queries over the blocks of an [`IrCode`].

use rustc_hash::FxHashSet;

use crate::{BlockId, IrCode};

/// Get all successor blocks of a given block, in edge order
pub fn successors(code: &IrCode, block_id: BlockId) -> Vec<BlockId> {
    code.block(block_id)
        .map(|block| {
            block
                .succs
                .iter()
                .map(|&e| code.edge(e).target)
                .collect()
        })
        .unwrap_or_default()
}

/// Get all predecessor blocks of a given block, in edge order
pub fn predecessors(code: &IrCode, block_id: BlockId) -> Vec<BlockId> {
    code.block(block_id)
        .map(|block| block.preds.iter().map(|&e| code.edge(e).src).collect())
        .unwrap_or_default()
}

/// Returns the blocks reachable from the entry block following live edges
pub fn reachable_blocks(code: &IrCode) -> FxHashSet<BlockId> {
    let mut visited = FxHashSet::default();
    let mut stack = vec![code.entry_block()];

    while let Some(block_id) = stack.pop() {
        if !visited.insert(block_id) {
            continue;
        }
        for succ in successors(code, block_id) {
            if !visited.contains(&succ) {
                stack.push(succ);
            }
        }
    }

    visited
}

/// Computes the reverse postorder of the blocks reachable from entry
///
/// In reverse postorder every block comes before its successors, back edges
/// excepted, which makes it the natural seed order for forward dataflow.
pub fn reverse_postorder(code: &IrCode) -> Vec<BlockId> {
    let mut visited = FxHashSet::default();
    let mut postorder = Vec::with_capacity(code.num_blocks());

    // Iterative DFS: (block, index of the next successor to visit)
    let entry = code.entry_block();
    let mut stack = vec![(entry, 0usize)];
    visited.insert(entry);

    while let Some((block_id, next)) = stack.pop() {
        let succs = successors(code, block_id);
        if let Some(&succ) = succs.get(next) {
            stack.push((block_id, next + 1));
            if visited.insert(succ) {
                stack.push((succ, 0));
            }
        } else {
            postorder.push(block_id);
        }
    }

    postorder.reverse();
    postorder
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CodeBuilder, Instruction};

    /// B0 -> B1; B1 branches to B3 or falls through to B2; B2 loops back to B1
    fn simple_loop() -> IrCode {
        let mut builder = CodeBuilder::new();
        let b1 = builder.new_block();
        let b2 = builder.new_block();
        let b3 = builder.new_block();

        builder.push(Instruction::constant(0, 1));
        builder.fallthrough(b1);

        builder.switch_to_block(b1);
        builder.branch(Instruction::if_eqz(0), b3, b2);

        builder.switch_to_block(b2);
        builder.push(Instruction::add_int_lit8(0, 0, -1));
        builder.goto(b1);

        builder.switch_to_block(b3);
        builder.push(Instruction::return_void());

        builder.build().unwrap()
    }

    #[test]
    fn test_reverse_postorder_respects_forward_edges() {
        let code = simple_loop();
        let rpo = reverse_postorder(&code);
        let pos = |b: usize| rpo.iter().position(|id| id.index() == b).unwrap();

        assert_eq!(rpo.len(), 4);
        assert_eq!(rpo[0], code.entry_block());
        assert!(pos(0) < pos(1));
        assert!(pos(1) < pos(2));
        assert!(pos(1) < pos(3));
    }

    #[test]
    fn test_neighbors() {
        let code = simple_loop();
        let b1 = BlockId::from_usize(1);
        let b2 = BlockId::from_usize(2);

        let mut preds = predecessors(&code, b1);
        preds.sort();
        assert_eq!(preds, vec![BlockId::from_usize(0), b2]);
        assert_eq!(successors(&code, b2), vec![b1]);

        let mut succs = successors(&code, b1);
        succs.sort();
        assert_eq!(succs, vec![b2, BlockId::from_usize(3)]);
    }

    #[test]
    fn test_unreachable_block_is_excluded() {
        let mut code = IrCode::new();
        let entry = code.entry_block();
        code.push_instruction(entry, Instruction::return_void());
        let orphan = code.add_block();
        code.push_instruction(orphan, Instruction::return_void());

        let reachable = reachable_blocks(&code);
        assert!(reachable.contains(&entry));
        assert!(!reachable.contains(&orphan));
        assert_eq!(reverse_postorder(&code), vec![entry]);
    }
}
