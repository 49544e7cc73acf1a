use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use jbpl_bytecode::{ClassNode, ClassVersion, Constant, InsnNode, MethodNode, Opcode};
use jbpl_core::ast::*;
use jbpl_core::diagnostics::DiagnosticLevel;
use jbpl_core::error::Error;
use jbpl_core::span::TokenRange;
use jbpl_core::types::{PreproType, Type};
use jbpl_core::value::Value;
use jbpl_interpret::intrinsics::IntrinsicMacro;
use jbpl_interpret::{evaluate_file, ClassPool, EvaluationContext, EvaluationOptions, EvaluationOutcome};
use pretty_assertions::assert_eq;

fn main_type() -> Type {
    Type::class("test/Main")
}

fn main_class() -> Element {
    Element::from(ClassDecl::new(Expr::ty(main_type())))
}

fn static_function(name: &str, return_type: Type, params: Vec<Type>, body: Vec<Element>) -> Element {
    Element::from(
        FunctionDecl::new(
            Expr::function_signature(main_type(), name, return_type, params),
            body,
        )
        .with_modifiers([AccessModifier::Public, AccessModifier::Static]),
    )
}

fn macro_decl(name: &str, params: &[(&str, Type)], return_type: Type, body: Vec<Element>) -> Element {
    let parameters = params
        .iter()
        .map(|(name, ty)| MacroParameter {
            name: name.to_string(),
            ty: Expr::ty(ty.clone()),
        })
        .collect();
    Element::from(MacroDecl::new(name, parameters, Expr::ty(return_type), body))
}

fn call(name: &str, arguments: Vec<Expr>) -> Expr {
    Expr::call(name, arguments.into_iter().map(Argument::positional).collect())
}

fn ret(value: Expr) -> Element {
    Element::Statement(Statement::ret(Some(value)))
}

fn if_then(condition: Expr, body: Vec<Element>) -> Element {
    Element::Expr(Expr::new(ExprKind::If(IfExpr {
        condition: Box::new(condition),
        body,
        else_ifs: Vec::new(),
        else_branch: None,
    })))
}

fn flow(kind: StatementKind) -> Element {
    Element::Statement(Statement::new(kind))
}

/// Options with a `probe` intrinsic recording the arguments of every call.
fn probed() -> (EvaluationOptions, Rc<RefCell<Vec<Vec<Value>>>>) {
    let calls = Rc::new(RefCell::new(Vec::new()));
    let recorded = Rc::clone(&calls);
    let options = EvaluationOptions::default().with_intrinsic(IntrinsicMacro::new("probe", move |call| {
        recorded.borrow_mut().push(call.arguments.to_vec());
        Ok(Value::Unit)
    }));
    (options, calls)
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn evaluate(elements: Vec<Element>, options: EvaluationOptions) -> jbpl_core::error::Result<EvaluationOutcome> {
    init_tracing();
    let file = AssemblyFile::new("test.jbpl").with_elements(elements);
    evaluate_file(&file, options)
}

fn method(outcome: &EvaluationOutcome, owner: &str, name: &str, descriptor: &str) -> MethodNode {
    outcome
        .classes
        .class(owner)
        .and_then(|class| class.method(name, descriptor))
        .cloned()
        .unwrap()
}

#[test]
fn function_return_loads_the_constant_and_returns_it() {
    let outcome = evaluate(
        vec![
            main_class(),
            static_function(
                "three",
                Type::I32,
                vec![],
                vec![ret(Expr::binary(BinaryOp::Add, Expr::literal(1), Expr::literal(2)))],
            ),
        ],
        EvaluationOptions::default(),
    )
    .unwrap();

    let method = method(&outcome, "test/Main", "three", "()I");
    assert_eq!(
        method.instructions,
        vec![InsnNode::Insn(Opcode::ICONST_3), InsnNode::Insn(Opcode::IRETURN)]
    );
    assert_eq!(method.access, 0x0009);
}

#[test]
fn void_functions_reject_return_values() {
    let error = evaluate(
        vec![
            main_class(),
            static_function("run", Type::VOID, vec![], vec![ret(Expr::literal(1))]),
        ],
        EvaluationOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(error.root(), Error::TypeMismatch { .. }));
}

#[test]
fn named_locals_continue_after_parameters() {
    let store = Instruction::synthetic(InstructionKind::Stack {
        opcode: Opcode::ISTORE,
        slot: Expr::reference("x"),
    });
    let outcome = evaluate(
        vec![
            main_class(),
            static_function(
                "run",
                Type::VOID,
                vec![Type::I32],
                vec![
                    Element::from(LocalStatement {
                        name: "x".into(),
                        index: None,
                    }),
                    Element::from(Instruction::opless(Opcode::ICONST_0)),
                    Element::from(store),
                    Element::Statement(Statement::ret(None)),
                ],
            ),
        ],
        EvaluationOptions::default(),
    )
    .unwrap();

    assert_eq!(
        method(&outcome, "test/Main", "run", "(I)V").instructions,
        vec![
            InsnNode::Insn(Opcode::ICONST_0),
            InsnNode::Var {
                opcode: Opcode::ISTORE,
                slot: 1
            },
            InsnNode::Insn(Opcode::RETURN),
        ]
    );
}

#[test]
fn macro_arguments_bind_by_name_and_position() {
    let (options, calls) = probed();
    let captured = Rc::new(RefCell::new(Vec::new()));
    let frames = Rc::clone(&captured);
    let options = options.with_intrinsic(IntrinsicMacro::new("frame_arguments", move |call| {
        frames.borrow_mut().extend(call.frame.arguments().iter().cloned());
        Ok(Value::Unit)
    }));

    evaluate(
        vec![
            macro_decl(
                "pair",
                &[("a", Type::I32), ("b", Type::STRING)],
                Type::VOID,
                vec![
                    Element::Expr(call("probe", vec![Expr::reference("a"), Expr::reference("b")])),
                    Element::Expr(call("frame_arguments", vec![])),
                ],
            ),
            Element::Expr(Expr::call(
                "pair",
                vec![
                    Argument::named("b", Expr::literal("x")),
                    Argument::named("a", Expr::literal(1)),
                ],
            )),
        ],
        options,
    )
    .unwrap();

    assert_eq!(
        *calls.borrow(),
        vec![vec![Value::I32(1), Value::String("x".into())]]
    );
    assert_eq!(
        *captured.borrow(),
        vec![Value::I32(1), Value::String("x".into())]
    );
}

#[test]
fn missing_arguments_are_reported_by_name() {
    let error = evaluate(
        vec![
            macro_decl("pair", &[("a", Type::I32), ("b", Type::I32)], Type::VOID, vec![]),
            Element::Expr(call("pair", vec![Expr::literal(1)])),
        ],
        EvaluationOptions::default(),
    )
    .unwrap_err();
    assert_eq!(
        error.root().to_string(),
        "Missing argument for parameter 'b' in call to macro pair"
    );
}

#[test]
fn loops_honour_break_and_continue() {
    let (options, calls) = probed();
    let numbers = Expr::array(None, (0..10).map(Expr::literal).collect());
    let loop_body = vec![
        if_then(
            Expr::binary(BinaryOp::Eq, Expr::reference("i"), Expr::literal(2)),
            vec![flow(StatementKind::Continue)],
        ),
        if_then(
            Expr::binary(BinaryOp::Eq, Expr::reference("i"), Expr::literal(5)),
            vec![flow(StatementKind::Break)],
        ),
        Element::Expr(Expr::binary(
            BinaryOp::AddAssign,
            Expr::reference("total"),
            Expr::reference("i"),
        )),
    ];

    evaluate(
        vec![
            macro_decl(
                "sum",
                &[],
                Type::I32,
                vec![
                    Element::from(DefineStatement::new("total", Expr::ty(Type::I32), Expr::literal(0))),
                    Element::from(ForStatement {
                        variable: "i".into(),
                        value: numbers,
                        body: loop_body,
                    }),
                    ret(Expr::reference("total")),
                ],
            ),
            Element::Expr(call("probe", vec![call("sum", vec![])])),
        ],
        options,
    )
    .unwrap();

    assert_eq!(*calls.borrow(), vec![vec![Value::I32(8)]]);
}

#[test]
fn returns_inside_branches_leave_the_macro() {
    let (options, calls) = probed();
    evaluate(
        vec![
            macro_decl(
                "sign",
                &[("x", Type::I32)],
                Type::STRING,
                vec![
                    if_then(
                        Expr::binary(BinaryOp::Gt, Expr::reference("x"), Expr::literal(0)),
                        vec![ret(Expr::literal("pos"))],
                    ),
                    ret(Expr::literal("neg")),
                ],
            ),
            Element::Expr(call("probe", vec![call("sign", vec![Expr::literal(4)])])),
            Element::Expr(call("probe", vec![call("sign", vec![Expr::literal(-4)])])),
        ],
        options,
    )
    .unwrap();

    assert_eq!(
        *calls.borrow(),
        vec![
            vec![Value::String("pos".into())],
            vec![Value::String("neg".into())]
        ]
    );
}

#[test]
fn stray_flow_is_an_error() {
    let error = evaluate(vec![flow(StatementKind::Break)], EvaluationOptions::default()).unwrap_err();
    assert_eq!(
        error.root().to_string(),
        "Cannot use break outside of a function or macro"
    );

    let error = evaluate(
        vec![
            macro_decl("m", &[], Type::VOID, vec![flow(StatementKind::Continue)]),
            Element::Expr(call("m", vec![])),
        ],
        EvaluationOptions::default(),
    )
    .unwrap_err();
    assert_eq!(error.root().to_string(), "Cannot use continue outside of a loop");
}

#[test]
fn overloads_pick_the_best_match() {
    let (options, calls) = probed();
    let tagged = |tag: &str| vec![Element::Expr(call("probe", vec![Expr::literal(tag)]))];
    evaluate(
        vec![
            macro_decl("show", &[("v", Type::I32)], Type::VOID, tagged("int")),
            macro_decl("show", &[("v", Type::STRING)], Type::VOID, tagged("string")),
            Element::Expr(call("show", vec![Expr::literal("a")])),
            Element::Expr(call("show", vec![Expr::literal(1)])),
        ],
        options,
    )
    .unwrap();

    assert_eq!(
        *calls.borrow(),
        vec![
            vec![Value::String("string".into())],
            vec![Value::String("int".into())]
        ]
    );
}

#[test]
fn equally_good_overloads_are_ambiguous() {
    let error = evaluate(
        vec![
            macro_decl("mix", &[("a", Type::I64), ("b", Type::I32)], Type::VOID, vec![]),
            macro_decl("mix", &[("a", Type::I32), ("b", Type::I64)], Type::VOID, vec![]),
            Element::Expr(call("mix", vec![Expr::literal(1), Expr::literal(1)])),
        ],
        EvaluationOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(error.root(), Error::AmbiguousOverload { .. }));
}

#[test]
fn macros_contribute_code_through_their_result() {
    let push = Instruction::synthetic(InstructionKind::LoadConstant {
        opcode: Opcode::BIPUSH,
        value: Expr::reference("n"),
    });
    let outcome = evaluate(
        vec![
            main_class(),
            macro_decl(
                "push",
                &[("n", Type::I32)],
                Type::Prepro(PreproType::Instruction),
                vec![
                    // emitted directly inside a macro: dropped
                    Element::from(Instruction::opless(Opcode::NOP)),
                    ret(Expr::instruction(push)),
                ],
            ),
            static_function(
                "run",
                Type::VOID,
                vec![],
                vec![
                    Element::Expr(call("push", vec![Expr::literal(40)])),
                    Element::Statement(Statement::ret(None)),
                ],
            ),
        ],
        EvaluationOptions::default(),
    )
    .unwrap();

    assert_eq!(
        method(&outcome, "test/Main", "run", "()V").instructions,
        vec![
            InsnNode::Int {
                opcode: Opcode::BIPUSH,
                operand: 40
            },
            InsnNode::Insn(Opcode::RETURN),
        ]
    );
}

#[test]
fn intrinsic_defines_edit_the_method_being_built() {
    let outcome = evaluate(
        vec![
            main_class(),
            static_function(
                "run",
                Type::VOID,
                vec![],
                vec![
                    Element::from(Instruction::opless(Opcode::ICONST_1)),
                    Element::Expr(Expr::binary(
                        BinaryOp::AddAssign,
                        Expr::reference("instructions"),
                        Expr::instruction(Instruction::opless(Opcode::POP)),
                    )),
                    Element::Expr(Expr::binary(
                        BinaryOp::Assign,
                        Expr::reference("access"),
                        Expr::literal(0x0002 | 0x0008),
                    )),
                    Element::Expr(Expr::binary(
                        BinaryOp::Assign,
                        Expr::reference("exceptions"),
                        Expr::array(Some(Type::STRING), vec![Expr::literal("java/io/IOException")]),
                    )),
                    Element::Statement(Statement::ret(None)),
                ],
            ),
        ],
        EvaluationOptions::default(),
    )
    .unwrap();

    let method = method(&outcome, "test/Main", "run", "()V");
    assert_eq!(
        method.instructions,
        vec![
            InsnNode::Insn(Opcode::ICONST_1),
            InsnNode::Insn(Opcode::POP),
            InsnNode::Insn(Opcode::RETURN),
        ]
    );
    assert_eq!(method.access, 0x000A);
    assert_eq!(method.exceptions, vec!["java/io/IOException".to_string()]);
}

#[test]
fn fields_get_constant_values() {
    let mut field = FieldDecl::new(Expr::field_signature(main_type(), "LIMIT", Type::I32));
    field.initializer = Some(Expr::binary(BinaryOp::Mul, Expr::literal(6), Expr::literal(7)));
    field.modifiers = vec![AccessModifier::Public, AccessModifier::Static, AccessModifier::Final];
    let outcome = evaluate(vec![main_class(), Element::from(field)], EvaluationOptions::default()).unwrap();

    let class = outcome.classes.class("test/Main").unwrap();
    let field = class.field("LIMIT", "I").unwrap();
    assert_eq!(field.value, Some(Constant::Int(42)));
    assert_eq!(field.access, 0x0019);
}

#[test]
fn yeet_removes_classes_and_members() {
    let pool = ClassPool::new();
    let mut old = ClassNode::new("lib/Old");
    old.methods.push(MethodNode::new(1, "gone", "()V"));
    old.methods.push(MethodNode::new(1, "kept", "()V"));
    pool.insert(old);
    pool.insert(ClassNode::new("lib/Dead"));

    let outcome = evaluate(
        vec![
            Element::from(YeetStatement {
                target: Expr::function_signature(Type::class("lib/Old"), "gone", Type::VOID, vec![]),
            }),
            Element::from(YeetStatement {
                target: Expr::ty(Type::class("lib/Dead")),
            }),
        ],
        EvaluationOptions::default().with_class_provider(Arc::new(pool)),
    )
    .unwrap();

    let old = outcome.classes.class("lib/Old").unwrap();
    assert_eq!(
        old.methods.iter().map(|it| it.name.as_str()).collect::<Vec<_>>(),
        vec!["kept"]
    );
    assert!(outcome.classes.is_tombstone("lib/Dead"));
}

#[test]
fn yeeting_a_missing_member_fails() {
    let pool = ClassPool::new();
    pool.insert(ClassNode::new("lib/Old"));
    let error = evaluate(
        vec![Element::from(YeetStatement {
            target: Expr::function_signature(Type::class("lib/Old"), "nope", Type::VOID, vec![]),
        })],
        EvaluationOptions::default().with_class_provider(Arc::new(pool)),
    )
    .unwrap_err();
    assert!(matches!(error.root(), Error::MissingTarget { .. }));
}

#[test]
fn version_statements_apply_to_later_classes() {
    let outcome = evaluate(
        vec![
            Element::from(VersionStatement {
                version: Expr::literal(8),
            }),
            main_class(),
        ],
        EvaluationOptions::default(),
    )
    .unwrap();

    let expected = ClassVersion::from_number(52).unwrap();
    assert_eq!(outcome.version, expected);
    assert_eq!(outcome.classes.class("test/Main").unwrap().version, expected);
}

#[test]
fn messages_reach_sinks_and_diagnostics() {
    let infos = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&infos);
    let options = EvaluationOptions::default()
        .with_info_sink(move |message| sink.borrow_mut().push(message.to_string()))
        .with_error_sink(|_| {});

    let outcome = evaluate(
        vec![
            Element::Expr(call("info", vec![Expr::literal("hello")])),
            Element::Expr(call("error", vec![Expr::literal("bad")])),
        ],
        options,
    )
    .unwrap();

    assert_eq!(*infos.borrow(), vec!["hello".to_string()]);
    let levels: Vec<_> = outcome
        .diagnostics
        .iter()
        .map(|it| (it.level, it.message.as_str()))
        .collect();
    assert_eq!(
        levels,
        vec![(DiagnosticLevel::Info, "hello"), (DiagnosticLevel::Error, "bad")]
    );
}

#[test]
fn failures_carry_the_live_frames() {
    let error = evaluate(
        vec![
            macro_decl(
                "boom",
                &[],
                Type::VOID,
                vec![Element::from(AssertStatement {
                    condition: Expr::literal(false),
                    message: Some(Expr::literal("kaboom")),
                })],
            ),
            Element::Expr(call("boom", vec![])),
        ],
        EvaluationOptions::default(),
    )
    .unwrap_err();

    assert_eq!(error.root().to_string(), "Assertion failed: kaboom");
    let Error::Traced { trace, .. } = &error else {
        panic!("expected a traced error, got {error:?}");
    };
    let owners: Vec<_> = trace.frames.iter().map(|frame| frame.owner.as_str()).collect();
    assert_eq!(owners, vec!["macro boom", "file test.jbpl"]);
}

#[test]
fn defines_inside_taken_branches_are_visible() {
    let (options, calls) = probed();
    let branch = Element::Expr(Expr::new(ExprKind::If(IfExpr {
        condition: Box::new(Expr::literal(true)),
        body: vec![
            Element::from(DefineStatement::new("x", Expr::ty(Type::I32), Expr::literal(1))),
            Element::Expr(call("probe", vec![Expr::reference("x")])),
        ],
        else_ifs: Vec::new(),
        else_branch: Some(ElseBranch {
            body: Vec::new(),
            range: TokenRange::Synthetic,
        }),
    })));

    evaluate(vec![branch], options).unwrap();

    assert_eq!(*calls.borrow(), vec![vec![Value::I32(1)]]);
}

#[test]
fn when_falls_back_to_its_default_branch() {
    let (options, calls) = probed();
    let arm = |condition: Expr, label: &str| WhenBranch {
        condition,
        body: vec![Element::Expr(call("probe", vec![Expr::literal(label)]))],
        is_scoped: true,
        range: TokenRange::Synthetic,
    };
    let when = |subject: i32| {
        Element::Expr(Expr::new(ExprKind::When(WhenExpr {
            value: Box::new(Expr::literal(subject)),
            branches: vec![arm(Expr::literal(1), "one")],
            default: Some(Box::new(arm(Expr::unit(), "other"))),
        })))
    };

    evaluate(vec![when(1), when(5)], options).unwrap();

    assert_eq!(
        *calls.borrow(),
        vec![
            vec![Value::String("one".into())],
            vec![Value::String("other".into())]
        ]
    );
}

#[test]
fn macros_see_the_values_of_their_caller() {
    let (options, calls) = probed();
    let show_i = vec![Element::Expr(call("probe", vec![Expr::reference("i")]))];
    evaluate(
        vec![
            macro_decl("show", &[], Type::VOID, show_i.clone()),
            macro_decl("shadow", &[("i", Type::I32)], Type::VOID, show_i),
            Element::from(ForStatement {
                variable: "i".into(),
                value: Expr::array(None, vec![Expr::literal(7)]),
                body: vec![
                    Element::Expr(call("show", vec![])),
                    Element::Expr(call("shadow", vec![Expr::literal(3)])),
                ],
            }),
        ],
        options,
    )
    .unwrap();

    assert_eq!(
        *calls.borrow(),
        vec![vec![Value::I32(7)], vec![Value::I32(3)]]
    );
}

#[test]
fn oversized_ranges_are_errors() {
    let range = |start: i64, end: i64, inclusive: bool| {
        Expr::new(ExprKind::Range(RangeExpr {
            start: Box::new(Expr::literal(start)),
            end: Box::new(Expr::literal(end)),
            inclusive,
        }))
    };

    let size = Expr::new(ExprKind::SizeOf(Box::new(range(i64::MIN, 1, false))));
    let error = evaluate(
        vec![Element::Expr(call("probe", vec![size]))],
        probed().0,
    )
    .unwrap_err();
    assert!(error.root().to_string().contains("does not fit into i32"));

    let error = evaluate(
        vec![Element::Expr(call("probe", vec![range(0, i64::MAX, true)]))],
        probed().0,
    )
    .unwrap_err();
    assert_eq!(
        error.root().to_string(),
        format!("Inclusive range end {} is too large", i64::MAX)
    );

    let error = evaluate(
        vec![Element::from(ForStatement {
            variable: "i".into(),
            value: range(0, i64::MAX, false),
            body: Vec::new(),
        })],
        EvaluationOptions::default(),
    )
    .unwrap_err();
    assert!(error.root().to_string().contains("too many elements"));
}

#[test]
fn standalone_expressions_leave_no_frames_behind() {
    let file = AssemblyFile::new("expr.jbpl");
    let sum = Expr::binary(BinaryOp::Add, Expr::literal(1), Expr::literal(2));
    let mut context = EvaluationContext::new(&file, EvaluationOptions::default()).unwrap();

    assert_eq!(context.evaluate_expr(&sum).unwrap(), Value::I32(3));
    assert!(context.frames().is_empty());
    assert_eq!(context.evaluate_expr(&sum).unwrap(), Value::I32(3));
    assert!(context.frames().is_empty());
}
