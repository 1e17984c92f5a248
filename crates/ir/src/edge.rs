//! # CFG Edges
//!
//! Edges connect a source block to a target block and record how control
//! gets there.

use crate::{block_label, BlockId};

/// The kind of control transfer an edge represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeType {
    /// Unconditional transfer: an explicit `goto`, or falling through to the
    /// next block (including the not-taken side of a conditional branch)
    Goto,
    /// The taken side of a conditional branch
    Branch,
}

impl std::fmt::Display for EdgeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Goto => write!(f, "goto"),
            Self::Branch => write!(f, "branch"),
        }
    }
}

/// A directed CFG edge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    pub src: BlockId,
    pub target: BlockId,
    pub kind: EdgeType,
}

impl Edge {
    pub const fn new(src: BlockId, target: BlockId, kind: EdgeType) -> Self {
        Self { src, target, kind }
    }

    pub const fn src(&self) -> BlockId {
        self.src
    }

    pub const fn target(&self) -> BlockId {
        self.target
    }

    pub const fn kind(&self) -> EdgeType {
        self.kind
    }
}

impl std::fmt::Display for Edge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} -> {} ({})",
            block_label(self.src),
            block_label(self.target),
            self.kind
        )
    }
}
