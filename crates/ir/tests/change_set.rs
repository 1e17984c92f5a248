//! Batched application of edits through `ChangeSet`.

use dexopt_ir::{
    BlockId, ChangeSet, CodeBuilder, EdgeType, FieldRef, InsnId, Instruction, IrCode, IrError,
    Opcode, PrettyPrint,
};

struct Fixture {
    code: IrCode,
    read: InsnId,
    pseudo: InsnId,
    mov: InsnId,
    branch: InsnId,
}

/// B0: read a field, copy it, branch on it; B1 and B2 both return.
fn fixture() -> Fixture {
    let field = FieldRef::new("LFoo;", "flag", "I");
    let mut builder = CodeBuilder::new();
    let b1 = builder.new_block();
    let b2 = builder.new_block();

    let read = builder.push(Instruction::sget(Opcode::Sget, field));
    let pseudo = builder.push(Instruction::move_result_pseudo(0));
    let mov = builder.push(Instruction::mov(1, 0));
    let branch = builder.branch(Instruction::if_eqz(1), b2, b1);

    builder.switch_to_block(b1);
    builder.push(Instruction::ret(1));
    builder.switch_to_block(b2);
    builder.push(Instruction::return_void());

    Fixture {
        code: builder.build().unwrap(),
        read,
        pseudo,
        mov,
        branch,
    }
}

#[test]
fn applies_replacements_then_deletions() {
    let Fixture {
        mut code,
        pseudo,
        mov,
        branch,
        ..
    } = fixture();

    let mut changes = ChangeSet::new(&code);
    changes.replace(pseudo, Instruction::constant(0, 0));
    changes.replace(branch, Instruction::goto());
    changes.delete(mov);

    let applied = changes.apply(&mut code).unwrap();

    assert_eq!(applied.replaced.len(), 2);
    assert_eq!(applied.replaced[0].0, pseudo);
    assert_eq!(applied.replaced[1].0, branch);
    assert_eq!(applied.deleted, vec![mov]);
    code.validate().unwrap();

    insta::assert_snapshot!(code.pretty_print(0), @r"
    code entry=B0
    B0: preds=[] succs=[B2 (goto)]
      sget LFoo;.flag:I
      const v0, 0
      goto
    B1: preds=[] succs=[]
      return v1
    B2: preds=[B0 (goto)] succs=[]
      return-void
    ");
}

#[test]
fn empty_change_set_is_a_no_op() {
    let Fixture { mut code, .. } = fixture();
    let before = code.pretty_print(0);

    let changes = ChangeSet::new(&code);
    assert!(changes.is_empty());
    let applied = changes.apply(&mut code).unwrap();

    assert!(applied.replaced.is_empty());
    assert!(applied.deleted.is_empty());
    assert_eq!(code.pretty_print(0), before);
}

#[test]
fn rejects_change_set_for_other_code() {
    let Fixture { code, read, .. } = fixture();
    let mut other = code.clone();
    let before = other.pretty_print(0);

    let mut changes = ChangeSet::new(&code);
    changes.delete(read);

    assert_eq!(
        changes.apply(&mut other),
        Err(IrError::ForeignChangeSet {
            expected: code.id(),
            found: other.id(),
        })
    );
    assert_eq!(other.pretty_print(0), before);
}

#[test]
fn rejects_stale_handles_after_application() {
    let Fixture {
        mut code, mov, ..
    } = fixture();

    let mut first = ChangeSet::new(&code);
    first.replace(mov, Instruction::constant(1, 0));
    first.apply(&mut code).unwrap();

    let mut second = ChangeSet::new(&code);
    second.delete(mov);
    assert_eq!(
        second.apply(&mut code),
        Err(IrError::DetachedInstruction(mov))
    );
}

#[test]
fn rejects_conflicting_edits_before_editing() {
    let Fixture {
        mut code,
        pseudo,
        mov,
        ..
    } = fixture();
    let before = code.pretty_print(0);

    let mut changes = ChangeSet::new(&code);
    changes.replace(pseudo, Instruction::constant(0, 1));
    changes.replace(mov, Instruction::constant(1, 1));
    changes.delete(mov);

    assert_eq!(changes.apply(&mut code), Err(IrError::ConflictingEdits(mov)));
    assert_eq!(code.pretty_print(0), before);
    assert!(code.is_attached(pseudo));
}

#[test]
fn rejects_non_goto_branch_replacement() {
    let Fixture {
        mut code,
        pseudo,
        branch,
        ..
    } = fixture();

    let mut changes = ChangeSet::new(&code);
    changes.replace(pseudo, Instruction::constant(0, 1));
    changes.replace(branch, Instruction::return_void());

    assert_eq!(
        changes.apply(&mut code),
        Err(IrError::UnsupportedBranchReplacement(Opcode::ReturnVoid))
    );
    assert!(code.is_attached(pseudo));
}

#[test]
fn deleting_a_branch_keeps_the_fallthrough_edge() {
    let Fixture {
        mut code, branch, ..
    } = fixture();
    let entry = code.entry_block();

    let mut changes = ChangeSet::new(&code);
    changes.delete(branch);
    changes.apply(&mut code).unwrap();

    let fallthrough = code.succ_edge(entry, EdgeType::Goto).unwrap();
    assert_eq!(code.edge(fallthrough).target, BlockId::from_usize(1));
    assert!(code.succ_edge(entry, EdgeType::Branch).is_none());
    assert_eq!(code.block(entry).unwrap().succs.len(), 1);
}
