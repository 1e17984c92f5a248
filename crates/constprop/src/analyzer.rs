//! # Instruction Analyzers
//!
//! The transfer function of the constant propagation is a chain of
//! sub-analyzers. Each one models a family of instructions; the first that
//! accepts an instruction decides its effect, and instructions nobody
//! accepts fall back to [`analyze_default`].
//!
//! The standard chain is:
//!
//! 1. [`ClinitFieldAnalyzer`]: static fields of the class being initialized
//! 2. [`WholeProgramAwareAnalyzer`]: reads of fields with a known value
//! 3. [`PrimitiveAnalyzer`]: constants, moves and literal arithmetic

use std::sync::Arc;

use dexopt_ir::{Instruction, Opcode, RESULT_REGISTER};

use crate::domain::ConstantDomain;
use crate::environment::ConstantEnvironment;
use crate::lattice::{JoinSemiLattice, MeetSemiLattice};
use crate::whole_program::WholeProgramState;

/// One link of the analyzer chain
pub trait SubAnalyzer: Send + Sync {
    /// Applies the effect of `insn` to `env` and returns true if this
    /// analyzer models `insn`; leaves `env` untouched otherwise
    fn analyze(&self, insn: &Instruction, env: &mut ConstantEnvironment) -> bool;

    fn name(&self) -> &'static str;
}

/// Writes `value` to the destination of `insn`
///
/// The high half of a wide destination becomes unknown.
fn write_dest(insn: &Instruction, env: &mut ConstantEnvironment, value: ConstantDomain) {
    let Some(dest) = insn.dest else {
        return;
    };
    env.set(dest, value);
    if insn.dest_is_wide() {
        if let Some(high) = dest.checked_add(1) {
            env.set(high, ConstantDomain::Top);
        }
    }
}

/// Effect of an instruction no sub-analyzer models
///
/// The destination becomes unknown, and so does the result register for
/// instructions that deliver a value through it.
pub fn analyze_default(insn: &Instruction, env: &mut ConstantEnvironment) {
    write_dest(insn, env, ConstantDomain::Top);
    if insn.opcode.has_move_result_pseudo() || insn.opcode.is_invoke() {
        env.set(RESULT_REGISTER, ConstantDomain::Top);
    }
}

/// Evaluates `value op literal` with 32-bit wrapping semantics
pub fn eval_literal_op(op: Opcode, value: i64, literal: i64) -> Option<i64> {
    use Opcode::*;

    let (a, b) = (value as i32, literal as i32);
    let result = match op {
        AddIntLit8 | AddIntLit16 => a.wrapping_add(b),
        RsubIntLit8 | RsubIntLit16 => b.wrapping_sub(a),
        MulIntLit8 | MulIntLit16 => a.wrapping_mul(b),
        AndIntLit8 | AndIntLit16 => a & b,
        OrIntLit8 | OrIntLit16 => a | b,
        XorIntLit8 | XorIntLit16 => a ^ b,
        _ => return None,
    };
    Some(i64::from(result))
}

// ==================== Sub-analyzers ====================

/// Tracks the static fields of the class whose `<clinit>` is analyzed
///
/// Inside a class initializer the fields of the class are only written by
/// the initializer itself, so their values can be followed through the
/// environment.
#[derive(Debug, Clone)]
pub struct ClinitFieldAnalyzer {
    class_under_init: Arc<str>,
}

impl ClinitFieldAnalyzer {
    pub fn new(class_under_init: &str) -> Self {
        Self {
            class_under_init: Arc::from(class_under_init),
        }
    }
}

impl SubAnalyzer for ClinitFieldAnalyzer {
    fn analyze(&self, insn: &Instruction, env: &mut ConstantEnvironment) -> bool {
        let Some(field) = insn.field() else {
            return false;
        };
        if field.class() != &*self.class_under_init {
            return false;
        }

        if insn.opcode.is_sget() {
            let value = env.get_field(field);
            env.set(RESULT_REGISTER, value);
            true
        } else if insn.opcode.is_sput() {
            let value = insn.src(0).map_or(ConstantDomain::Top, |src| env.get(src));
            env.set_field(field, value);
            true
        } else {
            false
        }
    }

    fn name(&self) -> &'static str {
        "ClinitFieldAnalyzer"
    }
}

/// Reads static fields the whole-program state knows to be constant
pub struct WholeProgramAwareAnalyzer<'w> {
    state: &'w dyn WholeProgramState,
}

impl<'w> WholeProgramAwareAnalyzer<'w> {
    pub fn new(state: &'w dyn WholeProgramState) -> Self {
        Self { state }
    }
}

impl SubAnalyzer for WholeProgramAwareAnalyzer<'_> {
    fn analyze(&self, insn: &Instruction, env: &mut ConstantEnvironment) -> bool {
        if !insn.opcode.is_sget() {
            return false;
        }
        let Some(field) = insn.field() else {
            return false;
        };

        let value = self.state.get_field_value(field);
        if value.is_top() {
            return false;
        }
        env.set(RESULT_REGISTER, value);
        true
    }

    fn name(&self) -> &'static str {
        "WholeProgramAwareAnalyzer"
    }
}

/// Constants, register moves and integer arithmetic with an immediate
#[derive(Debug, Clone, Copy, Default)]
pub struct PrimitiveAnalyzer;

impl SubAnalyzer for PrimitiveAnalyzer {
    fn analyze(&self, insn: &Instruction, env: &mut ConstantEnvironment) -> bool {
        let op = insn.opcode;

        if op.is_const() {
            let value = insn
                .literal
                .map_or(ConstantDomain::Top, ConstantDomain::Constant);
            write_dest(insn, env, value);
        } else if op.is_move() {
            let value = insn.src(0).map_or(ConstantDomain::Top, |src| env.get(src));
            write_dest(insn, env, value);
        } else if op.is_move_result() || op.is_move_result_pseudo() {
            let value = env.get(RESULT_REGISTER);
            write_dest(insn, env, value);
        } else if op.is_arithmetic_literal() {
            let folded = match (insn.src(0).map(|src| env.get(src)), insn.literal) {
                (Some(ConstantDomain::Constant(value)), Some(literal)) => {
                    eval_literal_op(op, value, literal)
                }
                _ => None,
            };
            write_dest(
                insn,
                env,
                folded.map_or(ConstantDomain::Top, ConstantDomain::Constant),
            );
        } else if op.is_load_param() {
            // Parameters are seeded in the initial environment
        } else {
            return false;
        }
        true
    }

    fn name(&self) -> &'static str {
        "PrimitiveAnalyzer"
    }
}

// ==================== Combiner ====================

/// An ordered chain of sub-analyzers forming the transfer function
#[derive(Default)]
pub struct InstructionAnalyzer<'w> {
    sub_analyzers: Vec<Box<dyn SubAnalyzer + 'w>>,
}

impl<'w> InstructionAnalyzer<'w> {
    /// Creates an empty chain; every instruction gets the default effect
    pub fn new() -> Self {
        Self {
            sub_analyzers: Vec::new(),
        }
    }

    /// Appends a sub-analyzer to the end of the chain
    pub fn with(mut self, sub_analyzer: impl SubAnalyzer + 'w) -> Self {
        self.sub_analyzers.push(Box::new(sub_analyzer));
        self
    }

    /// The standard chain
    ///
    /// The class-initializer analyzer is only included when
    /// `class_under_init` is set.
    pub fn standard(class_under_init: Option<&str>, state: &'w dyn WholeProgramState) -> Self {
        let mut analyzer = Self::new();
        if let Some(class) = class_under_init {
            analyzer = analyzer.with(ClinitFieldAnalyzer::new(class));
        }
        analyzer
            .with(WholeProgramAwareAnalyzer::new(state))
            .with(PrimitiveAnalyzer)
    }

    /// Names of the sub-analyzers, in chain order
    pub fn names(&self) -> Vec<&'static str> {
        self.sub_analyzers.iter().map(|sub| sub.name()).collect()
    }

    /// Transfer function: the state after `insn` given the state before it
    pub fn analyze_instruction(
        &self,
        insn: &Instruction,
        mut env: ConstantEnvironment,
    ) -> ConstantEnvironment {
        if env.is_bottom() {
            return env;
        }
        let handled = self
            .sub_analyzers
            .iter()
            .any(|sub| sub.analyze(insn, &mut env));
        if !handled {
            analyze_default(insn, &mut env);
        }
        env
    }
}

impl std::fmt::Debug for InstructionAnalyzer<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstructionAnalyzer")
            .field("sub_analyzers", &self.names())
            .finish()
    }
}

#[cfg(test)]
#[path = "analyzer_tests.rs"]
mod tests;
