//! Soundness and stability of the pass on generated code

use dexopt_constprop::analyzer::eval_literal_op;
use dexopt_constprop::fixpoint::eval_comparison;
use dexopt_constprop::{
    ConstantEnvironment, ConstantPropagationConfig, ConstantPropagationPass, FixpointIterator,
    InstructionAnalyzer, MeetSemiLattice, Method, NoWholeProgramState, Stats,
};
use dexopt_ir::{CodeBuilder, EdgeType, Instruction, IrCode, Opcode, PrettyPrint, Reg};
use proptest::prelude::*;

const NUM_PARAMS: Reg = 3;
const NUM_REGS: Reg = 6;

#[derive(Debug, Clone)]
enum Step {
    Const(Reg, i64),
    Move(Reg, Reg),
    Lit(Opcode, Reg, Reg, i64),
}

impl Step {
    fn to_instruction(&self) -> Instruction {
        match *self {
            Self::Const(dest, literal) => Instruction::constant(dest, literal),
            Self::Move(dest, src) => Instruction::mov(dest, src),
            Self::Lit(op, dest, src, literal) => Instruction::binop_lit(op, dest, src, literal),
        }
    }
}

fn reg() -> impl Strategy<Value = Reg> {
    0..NUM_REGS
}

fn step() -> impl Strategy<Value = Step> {
    let lit_op = prop::sample::select(vec![
        Opcode::AddIntLit8,
        Opcode::RsubIntLit8,
        Opcode::MulIntLit16,
        Opcode::AndIntLit8,
        Opcode::OrIntLit16,
        Opcode::XorIntLit8,
    ]);
    prop_oneof![
        (reg(), -1000i64..1000).prop_map(|(dest, k)| Step::Const(dest, k)),
        (reg(), reg()).prop_map(|(dest, src)| Step::Move(dest, src)),
        (lit_op, reg(), reg(), -128i64..128)
            .prop_map(|(op, dest, src, k)| Step::Lit(op, dest, src, k)),
    ]
}

fn branch() -> impl Strategy<Value = Instruction> {
    let testz = prop::sample::select(vec![
        Opcode::IfEqz,
        Opcode::IfNez,
        Opcode::IfLtz,
        Opcode::IfGez,
        Opcode::IfGtz,
        Opcode::IfLez,
    ]);
    let test = prop::sample::select(vec![
        Opcode::IfEq,
        Opcode::IfNe,
        Opcode::IfLt,
        Opcode::IfGe,
        Opcode::IfGt,
        Opcode::IfLe,
    ]);
    prop_oneof![
        (testz, reg()).prop_map(|(op, src)| Instruction::if_testz(op, src)),
        (test, reg(), reg()).prop_map(|(op, l, r)| Instruction::if_test(op, l, r)),
    ]
}

/// Parameters in v0..v2, the remaining registers zeroed, then `steps`
fn straight_line(steps: &[Step]) -> CodeBuilder {
    let mut builder = CodeBuilder::new();
    for r in 0..NUM_PARAMS {
        builder.push(Instruction::load_param(r));
    }
    for r in NUM_PARAMS..NUM_REGS {
        builder.push(Instruction::constant(r, 0));
    }
    for step in steps {
        builder.push(step.to_instruction());
    }
    builder
}

/// Executes the entry block and returns the registers at its end
fn interpret(code: &IrCode, params: &[i64]) -> Vec<i64> {
    let mut regs = vec![0i64; NUM_REGS as usize];
    let mut params = params.iter().copied();
    for (_, insn) in code.block_insns(code.entry_block()) {
        let op = insn.opcode;
        let read = |regs: &[i64], idx: usize| regs[insn.src(idx).unwrap() as usize];
        let value = if op.is_load_param() {
            params.next().unwrap()
        } else if op.is_const() {
            insn.literal().unwrap()
        } else if op.is_move() {
            read(&regs, 0)
        } else if op.is_arithmetic_literal() {
            eval_literal_op(op, read(&regs, 0), insn.literal().unwrap()).unwrap()
        } else {
            continue;
        };
        regs[insn.dest().unwrap() as usize] = value;
    }
    regs
}

fn optimize(code: IrCode) -> (IrCode, Stats) {
    let mut method = Method::new("LFoo;", "gen", code);
    let pass =
        ConstantPropagationPass::new(ConstantPropagationConfig::default(), &NoWholeProgramState);
    let stats = pass.run_on_method(&mut method).unwrap();
    (method.code, stats)
}

proptest! {
    #[test]
    fn rewrite_preserves_register_values(
        steps in prop::collection::vec(step(), 0..24),
        params in prop::collection::vec(-50i64..50, NUM_PARAMS as usize),
    ) {
        let mut builder = straight_line(&steps);
        builder.push(Instruction::return_void());
        let code = builder.build().unwrap();
        let expected = interpret(&code, &params);

        let (optimized, _) = optimize(code);

        prop_assert_eq!(interpret(&optimized, &params), expected);
    }

    #[test]
    fn second_run_changes_nothing(
        steps in prop::collection::vec(step(), 0..24),
        cond in branch(),
    ) {
        let mut builder = straight_line(&steps);
        let fallthrough = builder.new_block();
        let taken = builder.new_block();
        builder.branch(cond, taken, fallthrough);
        builder.switch_to_block(fallthrough);
        builder.push(Instruction::return_void());
        builder.switch_to_block(taken);
        builder.push(Instruction::return_void());

        let (once, _) = optimize(builder.build().unwrap());
        let snapshot = once.pretty_print(0);
        let (twice, stats) = optimize(once);

        prop_assert_eq!(stats, Stats::default());
        prop_assert_eq!(twice.pretty_print(0), snapshot);
    }

    #[test]
    fn executed_branch_side_is_never_pruned(
        steps in prop::collection::vec(step(), 0..24),
        params in prop::collection::vec(-50i64..50, NUM_PARAMS as usize),
        cond in branch(),
    ) {
        let mut builder = straight_line(&steps);
        let fallthrough = builder.new_block();
        let taken = builder.new_block();
        let op = cond.opcode;
        let (left, right) = (cond.src(0).unwrap(), cond.src(1));
        builder.branch(cond, taken, fallthrough);
        builder.switch_to_block(fallthrough);
        builder.push(Instruction::return_void());
        builder.switch_to_block(taken);
        builder.push(Instruction::return_void());
        let code = builder.build().unwrap();

        let regs = interpret(&code, &params);
        let rhs = right.map_or(0, |r| regs[r as usize]);
        let concretely_taken = eval_comparison(op, regs[left as usize], rhs).unwrap();

        let analyzer = InstructionAnalyzer::standard(None, &NoWholeProgramState);
        let mut fp = FixpointIterator::new(analyzer);
        fp.run(&code, ConstantEnvironment::top());
        let entry = code.entry_block();
        let exit = fp.get_exit_state_at(entry).clone();

        let mut bottoms = 0;
        for &edge in code.block(entry).unwrap().succs() {
            let on_edge = fp.analyze_edge(&code, edge, exit.clone());
            let executed = (code.edge(edge).kind == EdgeType::Branch) == concretely_taken;
            if executed {
                prop_assert!(!on_edge.is_bottom());
            }
            if on_edge.is_bottom() {
                bottoms += 1;
            }
        }
        prop_assert!(bottoms <= 1);
    }
}

#[test]
fn test_run_on_methods_sums_stats() {
    let methods_code = |k: i64| {
        let mut builder = CodeBuilder::new();
        builder.push(Instruction::constant(1, k));
        builder.push(Instruction::mov(0, 1));
        builder.push(Instruction::add_int_lit8(2, 0, 1));
        builder.push(Instruction::return_void());
        builder.build().unwrap()
    };
    let mut methods: Vec<Method> = (0..16)
        .map(|k| Method::new("LFoo;", &format!("m{k}"), methods_code(k)))
        .collect();

    let pass =
        ConstantPropagationPass::new(ConstantPropagationConfig::default(), &NoWholeProgramState);
    let stats = pass.run_on_methods(&mut methods).unwrap();

    assert_eq!(stats.materialized_consts, 32);
    assert_eq!(stats.branches_removed, 0);
    for (k, method) in methods.iter().enumerate() {
        let last = method.code.iter_insns().nth(2).map(|(_, _, insn)| insn.clone());
        assert_eq!(last, Some(Instruction::constant(2, k as i64 + 1)));
    }
}

#[test]
fn test_run_on_methods_reports_failing_method() {
    let mut good = CodeBuilder::new();
    good.push(Instruction::return_void());

    let mut broken = CodeBuilder::new();
    let exit = broken.new_block();
    broken.push(Instruction::if_eqz(0));
    broken.fallthrough(exit);
    broken.switch_to_block(exit);
    broken.push(Instruction::return_void());

    let mut methods = vec![
        Method::new("LFoo;", "good", good.build().unwrap()),
        Method::new("LFoo;", "broken", broken.finish()),
    ];
    let pass =
        ConstantPropagationPass::new(ConstantPropagationConfig::default(), &NoWholeProgramState);

    let err = pass.run_on_methods(&mut methods).unwrap_err();
    assert!(err.to_string().contains("LFoo;.broken"));
}
