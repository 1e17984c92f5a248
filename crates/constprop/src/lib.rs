//! # Constant Propagation
//!
//! Intraprocedural constant propagation over the register IR of
//! [`dexopt_ir`], with the rewrites it enables:
//!
//! - registers proven constant are materialized as `const` loads
//! - static-field writes of the value the field always holds are deleted
//! - conditional branches with one impossible side are removed
//!
//! ## Architecture
//!
//! ```text
//! ConstantDomain / ConstantEnvironment    abstract values (lattice)
//!        │
//! InstructionAnalyzer                     transfer function (analyzer chain)
//!        │
//! FixpointIterator                        per-block entry/exit states
//!        │
//! Transform ── WholeProgramState          decide edits, apply as one ChangeSet
//!        │
//! ConstantPropagationPass                 per-method driver, parallel over methods
//! ```

pub use analyzer::{
    analyze_default, ClinitFieldAnalyzer, InstructionAnalyzer, PrimitiveAnalyzer, SubAnalyzer,
    WholeProgramAwareAnalyzer,
};
pub use config::ConstantPropagationConfig;
pub use domain::ConstantDomain;
pub use environment::ConstantEnvironment;
pub use error::{ConstPropError, ConstPropResult};
pub use fixpoint::FixpointIterator;
pub use lattice::{JoinSemiLattice, Lattice, MeetSemiLattice};
pub use pass::{initial_environment, CodePass, ConstantPropagationPass, Method, StaticField};
pub use transform::{Stats, Transform};
pub use whole_program::{ArgumentDomain, FieldSummary, NoWholeProgramState, WholeProgramState};

pub mod analyzer;
pub mod config;
pub mod domain;
pub mod environment;
pub mod error;
pub mod fixpoint;
pub mod lattice;
pub mod pass;
pub mod transform;
pub mod whole_program;
