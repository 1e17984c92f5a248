//! # IR Instructions
//!
//! This module defines the instruction type of the register IR.

use std::sync::Arc;

use smallvec::SmallVec;

use crate::{FieldRef, Opcode, PrettyPrint, Reg};

/// A single IR instruction
///
/// An instruction is an opcode plus its operands: at most one destination
/// register, zero or more source registers, and an optional embedded literal,
/// field reference or method reference.
///
/// # Design Notes
///
/// - Instructions carry no position or block information; they live in the
///   arena of an [`IrCode`](crate::IrCode) and are referred to by handle
/// - Whether the destination or first source is a register pair is decided
///   by the opcode (see [`Opcode::dest_is_wide`])
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    pub opcode: Opcode,

    /// Destination register, if the opcode writes one
    pub dest: Option<Reg>,

    /// Source registers in operand order
    pub srcs: SmallVec<[Reg; 2]>,

    /// Embedded literal (`const*`, `*-int/lit*`)
    pub literal: Option<i64>,

    /// Field operand (`sget*`, `sput*`)
    pub field: Option<FieldRef>,

    /// Callee name (`invoke-*`)
    pub method: Option<Arc<str>>,
}

impl Instruction {
    /// Creates an instruction with no operands
    pub fn new(opcode: Opcode) -> Self {
        Self {
            opcode,
            dest: None,
            srcs: SmallVec::new(),
            literal: None,
            field: None,
            method: None,
        }
    }

    /// Sets the destination register
    pub fn with_dest(mut self, dest: Reg) -> Self {
        self.dest = Some(dest);
        self
    }

    /// Appends a source register
    pub fn with_src(mut self, src: Reg) -> Self {
        self.srcs.push(src);
        self
    }

    /// Sets the embedded literal
    pub fn with_literal(mut self, literal: i64) -> Self {
        self.literal = Some(literal);
        self
    }

    /// Sets the field operand
    pub fn with_field(mut self, field: FieldRef) -> Self {
        self.field = Some(field);
        self
    }

    /// Sets the callee
    pub fn with_method(mut self, method: &str) -> Self {
        self.method = Some(Arc::from(method));
        self
    }

    // --- Convenience constructors ---

    /// `const dest, literal`
    pub fn constant(dest: Reg, literal: i64) -> Self {
        Self::new(Opcode::Const).with_dest(dest).with_literal(literal)
    }

    /// `const-wide dest, literal`
    pub fn constant_wide(dest: Reg, literal: i64) -> Self {
        Self::new(Opcode::ConstWide)
            .with_dest(dest)
            .with_literal(literal)
    }

    /// `move dest, src`
    pub fn mov(dest: Reg, src: Reg) -> Self {
        Self::new(Opcode::Move).with_dest(dest).with_src(src)
    }

    /// `move-wide dest, src`
    pub fn mov_wide(dest: Reg, src: Reg) -> Self {
        Self::new(Opcode::MoveWide).with_dest(dest).with_src(src)
    }

    /// Binary operation with an immediate: `op dest, src, literal`
    ///
    /// `op` must be one of the `*-int/lit*` opcodes.
    pub fn binop_lit(op: Opcode, dest: Reg, src: Reg, literal: i64) -> Self {
        debug_assert!(op.is_arithmetic_literal(), "{op} takes no literal");
        Self::new(op)
            .with_dest(dest)
            .with_src(src)
            .with_literal(literal)
    }

    /// `add-int/lit8 dest, src, literal`
    pub fn add_int_lit8(dest: Reg, src: Reg, literal: i64) -> Self {
        Self::binop_lit(Opcode::AddIntLit8, dest, src, literal)
    }

    /// `add-int/lit16 dest, src, literal`
    pub fn add_int_lit16(dest: Reg, src: Reg, literal: i64) -> Self {
        Self::binop_lit(Opcode::AddIntLit16, dest, src, literal)
    }

    /// Three-register binary operation: `op dest, left, right`
    pub fn binop(op: Opcode, dest: Reg, left: Reg, right: Reg) -> Self {
        Self::new(op).with_dest(dest).with_src(left).with_src(right)
    }

    /// Static field read; its value is picked up by the following
    /// `move-result-pseudo*`
    pub fn sget(op: Opcode, field: FieldRef) -> Self {
        debug_assert!(op.is_sget(), "{op} is not a static field read");
        Self::new(op).with_field(field)
    }

    /// Static field write: `op src, field`
    pub fn sput(op: Opcode, src: Reg, field: FieldRef) -> Self {
        debug_assert!(op.is_sput(), "{op} is not a static field write");
        Self::new(op).with_src(src).with_field(field)
    }

    /// Array read `op array, index`; its value is picked up by the following
    /// `move-result-pseudo*`
    pub fn aget(op: Opcode, array: Reg, index: Reg) -> Self {
        debug_assert!(op.is_aget(), "{op} is not an array read");
        Self::new(op).with_src(array).with_src(index)
    }

    /// `move-result-pseudo dest`
    pub fn move_result_pseudo(dest: Reg) -> Self {
        Self::new(Opcode::MoveResultPseudo).with_dest(dest)
    }

    /// `move-result-pseudo-wide dest`
    pub fn move_result_pseudo_wide(dest: Reg) -> Self {
        Self::new(Opcode::MoveResultPseudoWide).with_dest(dest)
    }

    /// `move-result-pseudo-object dest`
    pub fn move_result_pseudo_object(dest: Reg) -> Self {
        Self::new(Opcode::MoveResultPseudoObject).with_dest(dest)
    }

    /// `move-result dest`
    pub fn move_result(dest: Reg) -> Self {
        Self::new(Opcode::MoveResult).with_dest(dest)
    }

    /// `load-param dest`
    pub fn load_param(dest: Reg) -> Self {
        Self::new(Opcode::LoadParam).with_dest(dest)
    }

    /// `load-param-wide dest`
    pub fn load_param_wide(dest: Reg) -> Self {
        Self::new(Opcode::LoadParamWide).with_dest(dest)
    }

    /// `load-param-object dest`
    pub fn load_param_object(dest: Reg) -> Self {
        Self::new(Opcode::LoadParamObject).with_dest(dest)
    }

    /// Comparison against zero: `op src`
    pub fn if_testz(op: Opcode, src: Reg) -> Self {
        debug_assert!(op.is_if_testz(), "{op} is not a zero test");
        Self::new(op).with_src(src)
    }

    /// Comparison of two registers: `op left, right`
    pub fn if_test(op: Opcode, left: Reg, right: Reg) -> Self {
        debug_assert!(op.is_if_test(), "{op} is not a two-register test");
        Self::new(op).with_src(left).with_src(right)
    }

    /// `if-eqz src`
    pub fn if_eqz(src: Reg) -> Self {
        Self::if_testz(Opcode::IfEqz, src)
    }

    /// `if-nez src`
    pub fn if_nez(src: Reg) -> Self {
        Self::if_testz(Opcode::IfNez, src)
    }

    /// `goto`
    pub fn goto() -> Self {
        Self::new(Opcode::Goto)
    }

    /// `return src`
    pub fn ret(src: Reg) -> Self {
        Self::new(Opcode::Return).with_src(src)
    }

    /// `return-void`
    pub fn return_void() -> Self {
        Self::new(Opcode::ReturnVoid)
    }

    /// `invoke-static {args}, method`
    pub fn invoke_static(method: &str, args: &[Reg]) -> Self {
        let mut insn = Self::new(Opcode::InvokeStatic).with_method(method);
        insn.srcs.extend_from_slice(args);
        insn
    }

    // --- Accessors ---

    /// Returns the destination register, if any
    pub const fn dest(&self) -> Option<Reg> {
        self.dest
    }

    /// Returns the `idx`-th source register
    pub fn src(&self, idx: usize) -> Option<Reg> {
        self.srcs.get(idx).copied()
    }

    pub fn srcs(&self) -> &[Reg] {
        &self.srcs
    }

    pub const fn literal(&self) -> Option<i64> {
        self.literal
    }

    pub const fn field(&self) -> Option<&FieldRef> {
        self.field.as_ref()
    }

    pub const fn dest_is_wide(&self) -> bool {
        self.opcode.dest_is_wide()
    }

    /// Validates operand shape against the opcode
    pub fn validate(&self) -> Result<(), String> {
        let op = self.opcode;

        if op.has_dest() != self.dest.is_some() {
            return Err(format!(
                "{op}: destination register {}",
                if op.has_dest() { "missing" } else { "not allowed" }
            ));
        }

        let expected_srcs = if op.is_move() || op.is_arithmetic_literal() || op.is_if_testz() {
            Some(1)
        } else if op.is_sput() || (op.is_return() && op != Opcode::ReturnVoid) {
            Some(1)
        } else if op.is_if_test()
            || op.is_aget()
            || matches!(op, Opcode::AddInt | Opcode::SubInt | Opcode::MulInt)
        {
            Some(2)
        } else if op.is_invoke() {
            None
        } else if op == Opcode::Throw {
            Some(1)
        } else {
            Some(0)
        };
        if let Some(expected) = expected_srcs {
            if self.srcs.len() != expected {
                return Err(format!(
                    "{op}: expected {expected} source registers, found {}",
                    self.srcs.len()
                ));
            }
        }

        let needs_literal = op.is_const() || op.is_arithmetic_literal();
        if needs_literal != self.literal.is_some() {
            return Err(format!(
                "{op}: literal {}",
                if needs_literal { "missing" } else { "not allowed" }
            ));
        }

        let needs_field = op.is_sget() || op.is_sput();
        if needs_field != self.field.is_some() {
            return Err(format!(
                "{op}: field operand {}",
                if needs_field { "missing" } else { "not allowed" }
            ));
        }

        Ok(())
    }
}

impl PrettyPrint for Instruction {
    fn pretty_print(&self, _indent: usize) -> String {
        let mut operands: Vec<String> = Vec::new();

        if self.opcode.is_invoke() {
            let args: Vec<String> = self.srcs.iter().map(|r| format!("v{r}")).collect();
            operands.push(format!("{{{}}}", args.join(", ")));
            if let Some(method) = &self.method {
                operands.push(method.to_string());
            }
        } else {
            if let Some(dest) = self.dest {
                operands.push(format!("v{dest}"));
            }
            operands.extend(self.srcs.iter().map(|r| format!("v{r}")));
            if let Some(literal) = self.literal {
                operands.push(literal.to_string());
            }
            if let Some(field) = &self.field {
                operands.push(field.to_string());
            }
        }

        if operands.is_empty() {
            self.opcode.mnemonic().to_string()
        } else {
            format!("{} {}", self.opcode.mnemonic(), operands.join(", "))
        }
    }
}

impl std::fmt::Display for Instruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.pretty_print(0))
    }
}
