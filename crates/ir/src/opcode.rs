//! # Opcodes
//!
//! The opcode set of the register IR and the predicates passes use to
//! classify instructions.

/// Coarse classification of opcodes used by analyses and rewrites
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpcodeCategory {
    /// Register-to-register copy (`move*`, `move-result*`, `load-param*`)
    Move,
    /// Load of an embedded literal (`const*`)
    LoadConstant,
    /// Integer arithmetic with an immediate operand (`*-int/lit*`)
    ArithmeticLiteral,
    /// Read of a static field (`sget*`)
    StaticFieldRead,
    /// Write of a static field (`sput*`)
    StaticFieldWrite,
    /// Two-way conditional branch (`if-*`)
    ConditionalBranch,
    /// Unconditional jump (`goto`)
    UnconditionalJump,
    /// Everything else
    Other,
}

/// An IR opcode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Opcode {
    Nop,

    Const,
    ConstWide,

    Move,
    MoveWide,
    MoveObject,
    MoveResult,
    MoveResultWide,
    MoveResultObject,
    MoveResultPseudo,
    MoveResultPseudoWide,
    MoveResultPseudoObject,

    LoadParam,
    LoadParamWide,
    LoadParamObject,

    AddIntLit8,
    AddIntLit16,
    RsubIntLit8,
    RsubIntLit16,
    MulIntLit8,
    MulIntLit16,
    AndIntLit8,
    AndIntLit16,
    OrIntLit8,
    OrIntLit16,
    XorIntLit8,
    XorIntLit16,

    AddInt,
    SubInt,
    MulInt,

    Sget,
    SgetWide,
    SgetObject,
    SgetBoolean,
    SgetByte,
    SgetChar,
    SgetShort,

    Sput,
    SputWide,
    SputObject,
    SputBoolean,
    SputByte,
    SputChar,
    SputShort,

    Aget,
    AgetWide,
    AgetObject,

    IfEq,
    IfNe,
    IfLt,
    IfGe,
    IfGt,
    IfLe,
    IfEqz,
    IfNez,
    IfLtz,
    IfGez,
    IfGtz,
    IfLez,

    Goto,

    Return,
    ReturnWide,
    ReturnObject,
    ReturnVoid,

    InvokeStatic,
    InvokeDirect,
    InvokeVirtual,

    Throw,
}

impl Opcode {
    /// Returns the textual mnemonic used in dumps
    pub const fn mnemonic(self) -> &'static str {
        use Opcode::*;
        match self {
            Nop => "nop",
            Const => "const",
            ConstWide => "const-wide",
            Move => "move",
            MoveWide => "move-wide",
            MoveObject => "move-object",
            MoveResult => "move-result",
            MoveResultWide => "move-result-wide",
            MoveResultObject => "move-result-object",
            MoveResultPseudo => "move-result-pseudo",
            MoveResultPseudoWide => "move-result-pseudo-wide",
            MoveResultPseudoObject => "move-result-pseudo-object",
            LoadParam => "load-param",
            LoadParamWide => "load-param-wide",
            LoadParamObject => "load-param-object",
            AddIntLit8 => "add-int/lit8",
            AddIntLit16 => "add-int/lit16",
            RsubIntLit8 => "rsub-int/lit8",
            RsubIntLit16 => "rsub-int",
            MulIntLit8 => "mul-int/lit8",
            MulIntLit16 => "mul-int/lit16",
            AndIntLit8 => "and-int/lit8",
            AndIntLit16 => "and-int/lit16",
            OrIntLit8 => "or-int/lit8",
            OrIntLit16 => "or-int/lit16",
            XorIntLit8 => "xor-int/lit8",
            XorIntLit16 => "xor-int/lit16",
            AddInt => "add-int",
            SubInt => "sub-int",
            MulInt => "mul-int",
            Sget => "sget",
            SgetWide => "sget-wide",
            SgetObject => "sget-object",
            SgetBoolean => "sget-boolean",
            SgetByte => "sget-byte",
            SgetChar => "sget-char",
            SgetShort => "sget-short",
            Sput => "sput",
            SputWide => "sput-wide",
            SputObject => "sput-object",
            SputBoolean => "sput-boolean",
            SputByte => "sput-byte",
            SputChar => "sput-char",
            SputShort => "sput-short",
            Aget => "aget",
            AgetWide => "aget-wide",
            AgetObject => "aget-object",
            IfEq => "if-eq",
            IfNe => "if-ne",
            IfLt => "if-lt",
            IfGe => "if-ge",
            IfGt => "if-gt",
            IfLe => "if-le",
            IfEqz => "if-eqz",
            IfNez => "if-nez",
            IfLtz => "if-ltz",
            IfGez => "if-gez",
            IfGtz => "if-gtz",
            IfLez => "if-lez",
            Goto => "goto",
            Return => "return",
            ReturnWide => "return-wide",
            ReturnObject => "return-object",
            ReturnVoid => "return-void",
            InvokeStatic => "invoke-static",
            InvokeDirect => "invoke-direct",
            InvokeVirtual => "invoke-virtual",
            Throw => "throw",
        }
    }

    /// Returns the coarse category of this opcode
    pub const fn category(self) -> OpcodeCategory {
        if self.is_move() || self.is_move_result_any() || self.is_load_param() {
            OpcodeCategory::Move
        } else if self.is_const() {
            OpcodeCategory::LoadConstant
        } else if self.is_arithmetic_literal() {
            OpcodeCategory::ArithmeticLiteral
        } else if self.is_sget() {
            OpcodeCategory::StaticFieldRead
        } else if self.is_sput() {
            OpcodeCategory::StaticFieldWrite
        } else if self.is_conditional_branch() {
            OpcodeCategory::ConditionalBranch
        } else if self.is_goto() {
            OpcodeCategory::UnconditionalJump
        } else {
            OpcodeCategory::Other
        }
    }

    pub const fn is_const(self) -> bool {
        matches!(self, Self::Const | Self::ConstWide)
    }

    /// Plain register moves (`move`, `move-wide`, `move-object`)
    pub const fn is_move(self) -> bool {
        matches!(self, Self::Move | Self::MoveWide | Self::MoveObject)
    }

    pub const fn is_move_result(self) -> bool {
        matches!(
            self,
            Self::MoveResult | Self::MoveResultWide | Self::MoveResultObject
        )
    }

    pub const fn is_move_result_pseudo(self) -> bool {
        matches!(
            self,
            Self::MoveResultPseudo | Self::MoveResultPseudoWide | Self::MoveResultPseudoObject
        )
    }

    const fn is_move_result_any(self) -> bool {
        self.is_move_result() || self.is_move_result_pseudo()
    }

    pub const fn is_load_param(self) -> bool {
        matches!(
            self,
            Self::LoadParam | Self::LoadParamWide | Self::LoadParamObject
        )
    }

    pub const fn is_arithmetic_literal(self) -> bool {
        use Opcode::*;
        matches!(
            self,
            AddIntLit8
                | AddIntLit16
                | RsubIntLit8
                | RsubIntLit16
                | MulIntLit8
                | MulIntLit16
                | AndIntLit8
                | AndIntLit16
                | OrIntLit8
                | OrIntLit16
                | XorIntLit8
                | XorIntLit16
        )
    }

    pub const fn is_sget(self) -> bool {
        use Opcode::*;
        matches!(
            self,
            Sget | SgetWide | SgetObject | SgetBoolean | SgetByte | SgetChar | SgetShort
        )
    }

    pub const fn is_sput(self) -> bool {
        use Opcode::*;
        matches!(
            self,
            Sput | SputWide | SputObject | SputBoolean | SputByte | SputChar | SputShort
        )
    }

    pub const fn is_aget(self) -> bool {
        matches!(self, Self::Aget | Self::AgetWide | Self::AgetObject)
    }

    pub const fn is_invoke(self) -> bool {
        matches!(
            self,
            Self::InvokeStatic | Self::InvokeDirect | Self::InvokeVirtual
        )
    }

    /// Comparison of two registers (`if-eq` .. `if-le`)
    pub const fn is_if_test(self) -> bool {
        use Opcode::*;
        matches!(self, IfEq | IfNe | IfLt | IfGe | IfGt | IfLe)
    }

    /// Comparison of one register against zero (`if-eqz` .. `if-lez`)
    pub const fn is_if_testz(self) -> bool {
        use Opcode::*;
        matches!(self, IfEqz | IfNez | IfLtz | IfGez | IfGtz | IfLez)
    }

    pub const fn is_conditional_branch(self) -> bool {
        self.is_if_test() || self.is_if_testz()
    }

    pub const fn is_goto(self) -> bool {
        matches!(self, Self::Goto)
    }

    /// Any instruction carrying a CFG edge: conditional branches and `goto`
    pub const fn is_branch(self) -> bool {
        self.is_conditional_branch() || self.is_goto()
    }

    pub const fn is_return(self) -> bool {
        matches!(
            self,
            Self::Return | Self::ReturnWide | Self::ReturnObject | Self::ReturnVoid
        )
    }

    /// Instructions after which control never falls through
    pub const fn ends_control_flow(self) -> bool {
        self.is_return() || matches!(self, Self::Throw)
    }

    /// Instructions whose value is delivered through a following
    /// `move-result-pseudo*`
    pub const fn has_move_result_pseudo(self) -> bool {
        self.is_sget() || self.is_aget()
    }

    /// Instructions that write a destination register
    pub const fn has_dest(self) -> bool {
        use Opcode::*;
        self.is_const()
            || self.is_move()
            || self.is_move_result_any()
            || self.is_load_param()
            || self.is_arithmetic_literal()
            || matches!(self, AddInt | SubInt | MulInt)
    }

    /// Instructions whose destination is a register pair
    pub const fn dest_is_wide(self) -> bool {
        use Opcode::*;
        matches!(
            self,
            ConstWide | MoveWide | MoveResultWide | MoveResultPseudoWide | LoadParamWide
        )
    }

    /// The `move-result-pseudo*` variant pairing with a read of this width
    pub const fn move_result_pseudo_for(self) -> Option<Self> {
        use Opcode::*;
        match self {
            SgetWide | AgetWide => Some(MoveResultPseudoWide),
            SgetObject | AgetObject => Some(MoveResultPseudoObject),
            Sget | SgetBoolean | SgetByte | SgetChar | SgetShort | Aget => Some(MoveResultPseudo),
            _ => None,
        }
    }
}

impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.mnemonic())
    }
}
