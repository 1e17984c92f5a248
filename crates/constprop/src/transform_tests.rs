use super::*;
use crate::analyzer::{InstructionAnalyzer, PrimitiveAnalyzer, SubAnalyzer};
use crate::domain::ConstantDomain;
use crate::whole_program::{FieldSummary, NoWholeProgramState, WholeProgramState};
use dexopt_ir::{CodeBuilder, FieldRef, IrCode, PrettyPrint, RESULT_REGISTER};

fn optimize_with(
    code: &mut IrCode,
    whole_program: &dyn WholeProgramState,
    config: ConstantPropagationConfig,
) -> ConstPropResult<Stats> {
    let mut fp = FixpointIterator::new(InstructionAnalyzer::standard(None, whole_program));
    fp.run(code, ConstantEnvironment::top());
    Transform::new(config).apply(&fp, whole_program, code)
}

fn optimize(code: &mut IrCode) -> Stats {
    optimize_with(code, &NoWholeProgramState, ConstantPropagationConfig::default()).unwrap()
}

fn single_block(insns: Vec<Instruction>) -> IrCode {
    let mut builder = CodeBuilder::new();
    for insn in insns {
        builder.push(insn);
    }
    builder.build().unwrap()
}

#[test]
fn test_moves_are_kept_when_disabled() {
    let mut code = single_block(vec![
        Instruction::constant(1, 5),
        Instruction::mov(0, 1),
        Instruction::ret(0),
    ]);
    let config = ConstantPropagationConfig {
        replace_moves_with_consts: false,
        ..Default::default()
    };

    let stats = optimize_with(&mut code, &NoWholeProgramState, config).unwrap();

    assert_eq!(stats, Stats::default());
    insta::assert_snapshot!(code.pretty_print(0), @r"
    code entry=B0
    B0: preds=[] succs=[]
      const v1, 5
      move v0, v1
      return v0
    ");
}

#[test]
fn test_wide_move_becomes_const_wide() {
    let mut code = single_block(vec![
        Instruction::constant_wide(2, 1 << 40),
        Instruction::mov_wide(0, 2),
        Instruction::return_void(),
    ]);

    let stats = optimize(&mut code);

    assert_eq!(stats.materialized_consts, 1);
    insta::assert_snapshot!(code.pretty_print(0), @r"
    code entry=B0
    B0: preds=[] succs=[]
      const-wide v2, 1099511627776
      const-wide v0, 1099511627776
      return-void
    ");
}

#[test]
fn test_pseudo_after_known_field_read() {
    let known = FieldRef::new("LFoo;", "known", "I");
    let unknown = FieldRef::new("LFoo;", "unknown", "I");
    let summary: FieldSummary = [(known.clone(), 42)].into_iter().collect();
    let mut code = single_block(vec![
        Instruction::sget(Opcode::Sget, known),
        Instruction::move_result_pseudo(0),
        Instruction::sget(Opcode::Sget, unknown),
        Instruction::move_result_pseudo(1),
        Instruction::invoke_static("LFoo;.bar", &[]),
        Instruction::move_result(2),
        Instruction::return_void(),
    ]);

    let stats = optimize_with(&mut code, &summary, ConstantPropagationConfig::default()).unwrap();

    assert_eq!(stats.materialized_consts, 1);
    // The read itself stays, only the pseudo instruction becomes a constant
    insta::assert_snapshot!(code.pretty_print(0), @r"
    code entry=B0
    B0: preds=[] succs=[]
      sget LFoo;.known:I
      const v0, 42
      sget LFoo;.unknown:I
      move-result-pseudo v1
      invoke-static {}, LFoo;.bar
      move-result v2
      return-void
    ");
    code.validate().unwrap();
}

/// Plain `aget` reads always yield 7
struct SevenArrays;

impl SubAnalyzer for SevenArrays {
    fn analyze(&self, insn: &Instruction, env: &mut ConstantEnvironment) -> bool {
        if insn.opcode != Opcode::Aget {
            return false;
        }
        env.set(RESULT_REGISTER, ConstantDomain::constant(7));
        true
    }

    fn name(&self) -> &'static str {
        "SevenArrays"
    }
}

#[test]
fn test_pseudo_after_known_array_read() {
    let mut code = single_block(vec![
        Instruction::load_param_object(0),
        Instruction::load_param(1),
        Instruction::aget(Opcode::Aget, 0, 1),
        Instruction::move_result_pseudo(2),
        Instruction::aget(Opcode::AgetObject, 0, 1),
        Instruction::move_result_pseudo_object(3),
        Instruction::return_void(),
    ]);
    let analyzer = InstructionAnalyzer::new()
        .with(SevenArrays)
        .with(PrimitiveAnalyzer);
    let mut fp = FixpointIterator::new(analyzer);
    fp.run(&code, ConstantEnvironment::top());

    let stats = Transform::default()
        .apply(&fp, &NoWholeProgramState, &mut code)
        .unwrap();

    assert_eq!(stats.materialized_consts, 1);
    insta::assert_snapshot!(code.pretty_print(0), @r"
    code entry=B0
    B0: preds=[] succs=[]
      load-param-object v0
      load-param v1
      aget v0, v1
      const v2, 7
      aget-object v0, v1
      move-result-pseudo-object v3
      return-void
    ");
    code.validate().unwrap();
}

#[test]
fn test_store_is_kept_unless_value_matches_summary() {
    let field = FieldRef::new("LFoo;", "count", "I");
    let summary: FieldSummary = [(field.clone(), 7)].into_iter().collect();
    let mut code = single_block(vec![
        Instruction::constant(0, 8),
        Instruction::sput(Opcode::Sput, 0, field.clone()),
        Instruction::load_param(1),
        Instruction::sput(Opcode::Sput, 1, field),
        Instruction::return_void(),
    ]);
    let before = code.pretty_print(0);

    let stats = optimize_with(&mut code, &summary, ConstantPropagationConfig::default()).unwrap();

    assert_eq!(stats, Stats::default());
    assert_eq!(code.pretty_print(0), before);
}

#[test]
fn test_all_literal_operations_fold() {
    let mut code = single_block(vec![
        Instruction::constant(0, 6),
        Instruction::binop_lit(Opcode::RsubIntLit8, 1, 0, 10),
        Instruction::binop_lit(Opcode::MulIntLit16, 2, 0, -3),
        Instruction::binop_lit(Opcode::XorIntLit8, 3, 0, 3),
        Instruction::binop(Opcode::AddInt, 4, 0, 0),
        Instruction::return_void(),
    ]);

    let stats = optimize(&mut code);

    assert_eq!(stats.materialized_consts, 3);
    insta::assert_snapshot!(code.pretty_print(0), @r"
    code entry=B0
    B0: preds=[] succs=[]
      const v0, 6
      const v1, 4
      const v2, -18
      const v3, 5
      add-int v4, v0, v0
      return-void
    ");
}

#[test]
fn test_malformed_branch_is_rejected_without_edits() {
    let mut builder = CodeBuilder::new();
    let exit = builder.new_block();
    builder.push(Instruction::constant(1, 1));
    builder.push(Instruction::mov(2, 1));
    builder.push(Instruction::if_nez(2));
    builder.fallthrough(exit);
    builder.switch_to_block(exit);
    builder.push(Instruction::return_void());
    let mut code = builder.finish();
    let before = code.pretty_print(0);

    let err = optimize_with(&mut code, &NoWholeProgramState, ConstantPropagationConfig::default())
        .unwrap_err();

    match err {
        ConstPropError::MalformedBranch { block, count, dump } => {
            assert_eq!(block, code.entry_block());
            assert_eq!(count, 1);
            assert!(dump.contains("if-nez v2"));
        }
        other => panic!("expected a malformed branch, got {other:?}"),
    }
    assert_eq!(code.pretty_print(0), before);
}

#[test]
fn test_plan_does_not_edit() {
    let mut code = single_block(vec![
        Instruction::constant(1, 5),
        Instruction::mov(0, 1),
        Instruction::ret(0),
    ]);
    let mut fp = FixpointIterator::new(InstructionAnalyzer::standard(None, &NoWholeProgramState));
    fp.run(&code, ConstantEnvironment::top());

    let (changes, stats) = Transform::default()
        .plan(&fp, &NoWholeProgramState, &code)
        .unwrap();

    assert_eq!(stats.materialized_consts, 1);
    assert_eq!(changes.replacements().len(), 1);
    assert!(changes.deletions().is_empty());
    assert_eq!(code.num_instructions(), 3);

    changes.apply(&mut code).unwrap();
    assert_eq!(
        code.iter_insns().nth(1).map(|(_, _, insn)| insn.opcode),
        Some(Opcode::Const)
    );
}

#[test]
fn test_stats_arithmetic() {
    let a = Stats {
        materialized_consts: 1,
        branches_removed: 2,
        redundant_stores_removed: 0,
    };
    let b = Stats {
        materialized_consts: 3,
        branches_removed: 0,
        redundant_stores_removed: 1,
    };

    let sum = a + b;
    assert_eq!(sum.materialized_consts, 4);
    assert_eq!(sum.branches_removed, 2);
    assert_eq!(sum.redundant_stores_removed, 1);
    assert!(sum.changed());
    assert!(!Stats::default().changed());
    assert_eq!(
        sum.to_string(),
        "4 consts materialized, 2 branches removed, 1 redundant stores removed"
    );
}
