use jbpl_core::ast::*;
use jbpl_core::types::Type;
use pretty_assertions::assert_eq;

#[test]
fn clones_are_detached() {
    let original = MacroDecl::new(
        "m",
        vec![MacroParameter::new("a", Expr::ty(Type::I32))],
        Expr::ty(Type::I32),
        vec![Element::from(Statement::ret(Some(Expr::reference("a"))))],
    );
    let mut copy = original.clone();
    assert_eq!(copy, original);

    copy.add_element(Statement::ret(None));
    copy.parameters[0].name = "b".into();
    assert_eq!(original.body.len(), 1);
    assert_eq!(original.parameters[0].name, "a");
    assert_ne!(copy, original);
}

#[test]
fn container_protocols_keep_insertion_order() {
    let mut compound = CompoundStatement { statements: vec![] };
    compound.add_statement(Statement::new(StatementKind::Break));
    compound.add_statement(Statement::new(StatementKind::Continue));
    assert_eq!(compound.statements()[1].kind, StatementKind::Continue);
    assert!(compound.remove_statement(5).is_none());
    compound.remove_statement(0);
    assert_eq!(compound.statements().len(), 1);
    compound.clear_statements();
    assert!(compound.statements().is_empty());

    let mut array = ArrayExpr {
        element_type: None,
        values: vec![],
    };
    array.add_expr(Expr::literal(1));
    array.add_expr(Expr::literal(2));
    assert_eq!(array.exprs(), &[Expr::literal(1), Expr::literal(2)]);
}

#[test]
fn elements_serialize_to_json() {
    let file = AssemblyFile::new("json.jbpl")
        .with_elements([Element::from(Instruction::opless(jbpl_bytecode::Opcode::NOP))]);
    let json = file.to_json().unwrap();
    let back: AssemblyFile = serde_json::from_str(&json).unwrap();
    assert_eq!(back, file);
}
