//! # Constant Propagation Errors

use dexopt_ir::{block_label, BlockId, IrError};

/// Errors that abort constant propagation on a method
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConstPropError {
    #[error(
        "Conditional branch in {} has {count} successors, expected 2\n{dump}",
        block_label(*.block)
    )]
    MalformedBranch {
        block: BlockId,
        count: usize,
        dump: String,
    },

    #[error(transparent)]
    Ir(#[from] IrError),

    #[error("Invalid pass configuration: {0}")]
    InvalidConfig(String),

    #[error("In method {method}: {source}")]
    InMethod {
        method: String,
        #[source]
        source: Box<ConstPropError>,
    },
}

impl ConstPropError {
    /// Attaches the name of the method being processed
    pub fn in_method(self, method: &str) -> Self {
        Self::InMethod {
            method: method.to_string(),
            source: Box::new(self),
        }
    }
}

pub type ConstPropResult<T> = Result<T, ConstPropError>;
