use std::sync::Arc;

use jbpl_bytecode::{ClassNode, InsnNode, LabelId, MethodNode, Opcode};
use jbpl_core::ast::*;
use jbpl_core::error::Error;
use jbpl_core::types::Type;
use jbpl_interpret::{evaluate_file, ClassPool, EvaluationOptions, EvaluationOutcome};
use pretty_assertions::assert_eq;

fn target_pool() -> ClassPool {
    let mut run = MethodNode::new(0x0009, "run", "()V");
    run.instructions = vec![
        InsnNode::Label(LabelId(0)),
        InsnNode::Insn(Opcode::ICONST_0),
        InsnNode::Insn(Opcode::POP),
        InsnNode::Insn(Opcode::RETURN),
    ];
    let mut take = MethodNode::new(0x0009, "take", "(I)V");
    take.instructions = vec![
        InsnNode::Var {
            opcode: Opcode::ILOAD,
            slot: 0,
        },
        InsnNode::Insn(Opcode::POP),
        InsnNode::Insn(Opcode::RETURN),
    ];
    let mut class = ClassNode::new("lib/Target");
    class.methods.push(run);
    class.methods.push(take);
    let pool = ClassPool::new();
    pool.insert(class);
    pool
}

fn selector(condition: SelectorCondition, offset: Option<i32>) -> Element {
    let mut selector = SelectorDecl::new("here", vec![condition]);
    selector.offset = offset.map(Expr::literal);
    Element::from(selector)
}

fn injector(body: Vec<Element>) -> Element {
    injector_into("run", vec![], body)
}

fn injector_into(name: &str, params: Vec<Type>, body: Vec<Element>) -> Element {
    Element::from(InjectorDecl {
        target: Expr::function_signature(Type::class("lib/Target"), name, Type::VOID, params),
        selector: Expr::new(ExprKind::SelectorReference("here".into())),
        body,
    })
}

fn inject(elements: Vec<Element>) -> jbpl_core::error::Result<EvaluationOutcome> {
    let file = AssemblyFile::new("inject.jbpl").with_elements(elements);
    evaluate_file(
        &file,
        EvaluationOptions::default().with_class_provider(Arc::new(target_pool())),
    )
}

fn run_code(outcome: &EvaluationOutcome) -> Vec<InsnNode> {
    code_of(outcome, "run", "()V")
}

fn code_of(outcome: &EvaluationOutcome, name: &str, descriptor: &str) -> Vec<InsnNode> {
    outcome
        .classes
        .class("lib/Target")
        .and_then(|class| class.method(name, descriptor))
        .map(|method| method.instructions.clone())
        .unwrap()
}

#[test]
fn code_is_spliced_before_the_matched_opcode() {
    let outcome = inject(vec![
        selector(
            SelectorCondition::new(ConditionOrder::Before, ConditionTarget::Opcode(Opcode::RETURN)),
            None,
        ),
        injector(vec![Element::from(Instruction::opless(Opcode::NOP))]),
    ])
    .unwrap();

    assert_eq!(
        run_code(&outcome),
        vec![
            InsnNode::Label(LabelId(0)),
            InsnNode::Insn(Opcode::ICONST_0),
            InsnNode::Insn(Opcode::POP),
            InsnNode::Insn(Opcode::NOP),
            InsnNode::Insn(Opcode::RETURN),
        ]
    );
}

#[test]
fn instruction_patterns_and_offsets_move_the_point() {
    let outcome = inject(vec![
        selector(
            SelectorCondition::new(
                ConditionOrder::After,
                ConditionTarget::Instruction(Instruction::opless(Opcode::ICONST_0)),
            ),
            Some(1),
        ),
        injector(vec![Element::from(Instruction::opless(Opcode::NOP))]),
    ])
    .unwrap();

    assert_eq!(run_code(&outcome)[3], InsnNode::Insn(Opcode::NOP));
}

#[test]
fn injected_labels_do_not_collide() {
    let outcome = inject(vec![
        selector(
            SelectorCondition::new(ConditionOrder::Before, ConditionTarget::Opcode(Opcode::RETURN)),
            None,
        ),
        injector(vec![Element::from(Instruction::label("skip"))]),
    ])
    .unwrap();

    assert_eq!(run_code(&outcome)[3], InsnNode::Label(LabelId(1)));
}

#[test]
fn unmatched_selectors_are_missing_targets() {
    let error = inject(vec![
        selector(
            SelectorCondition::new(ConditionOrder::Before, ConditionTarget::Opcode(Opcode::IRETURN)),
            None,
        ),
        injector(vec![]),
    ])
    .unwrap_err();

    assert!(matches!(error.root(), Error::MissingTarget { .. }));
    assert!(error.root().to_string().contains("Selector 'here' did not match any instruction"));
}

#[test]
fn offsets_past_the_method_end_fail() {
    let error = inject(vec![
        selector(
            SelectorCondition::new(ConditionOrder::After, ConditionTarget::Opcode(Opcode::RETURN)),
            Some(2),
        ),
        injector(vec![]),
    ])
    .unwrap_err();

    assert_eq!(
        error.root().to_string(),
        "Selector 'here' points outside of method"
    );
}

#[test]
fn injected_locals_start_after_the_parameters() {
    let store = Instruction::synthetic(InstructionKind::Stack {
        opcode: Opcode::ISTORE,
        slot: Expr::reference("x"),
    });
    let outcome = inject(vec![
        selector(
            SelectorCondition::new(ConditionOrder::Before, ConditionTarget::Opcode(Opcode::RETURN)),
            None,
        ),
        injector_into(
            "take",
            vec![Type::I32],
            vec![
                Element::from(LocalStatement {
                    name: "x".into(),
                    index: None,
                }),
                Element::from(Instruction::opless(Opcode::ICONST_0)),
                Element::from(store),
            ],
        ),
    ])
    .unwrap();

    assert_eq!(
        code_of(&outcome, "take", "(I)V"),
        vec![
            InsnNode::Var {
                opcode: Opcode::ILOAD,
                slot: 0,
            },
            InsnNode::Insn(Opcode::POP),
            InsnNode::Insn(Opcode::ICONST_0),
            InsnNode::Var {
                opcode: Opcode::ISTORE,
                slot: 1,
            },
            InsnNode::Insn(Opcode::RETURN),
        ]
    );
}
