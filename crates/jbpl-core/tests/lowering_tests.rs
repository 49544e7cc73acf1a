use std::collections::HashMap;

use jbpl_bytecode::Opcode;
use jbpl_core::ast::*;
use jbpl_core::error::{Error, Result};
use jbpl_core::lower::*;
use jbpl_core::span::TokenRange;
use jbpl_core::types::Type;
use pretty_assertions::assert_eq;

fn insn(opcode: Opcode) -> Element {
    Element::from(Instruction::opless(opcode))
}

fn include(path: &str) -> Element {
    Element::from(IncludeStatement { path: path.into() })
}

fn function(body: Vec<Element>) -> Element {
    Element::from(FunctionDecl::new(
        Expr::function_signature(Type::class("a/B"), "run", Type::VOID, vec![]),
        body,
    ))
}

struct Library {
    files: HashMap<String, AssemblyFile>,
    requests: Vec<String>,
}

impl Library {
    fn new(files: impl IntoIterator<Item = AssemblyFile>) -> Self {
        Self {
            files: files.into_iter().map(|file| (file.path.clone(), file)).collect(),
            requests: Vec::new(),
        }
    }
}

impl IncludeResolver for Library {
    fn resolve(&mut self, path: &str) -> Result<AssemblyFile> {
        self.requests.push(path.to_string());
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| Error::Generic(format!("no such file {}", path)))
    }
}

#[test]
fn compounds_are_spliced_in_place() {
    let compound = CompoundStatement {
        statements: vec![
            Statement::from(Instruction::opless(Opcode::ICONST_1)),
            Statement::from(Instruction::opless(Opcode::ICONST_2)),
        ],
    };
    let file = AssemblyFile::new("main.jbpl").with_elements([function(vec![
        insn(Opcode::NOP),
        Element::from(compound),
        insn(Opcode::IADD),
    ])]);
    let lowered = lower_file(file, &mut NoIncludes).unwrap();

    let expected = AssemblyFile::new("main.jbpl").with_elements([function(vec![
        insn(Opcode::NOP),
        insn(Opcode::ICONST_1),
        insn(Opcode::ICONST_2),
        insn(Opcode::IADD),
    ])]);
    assert_eq!(lowered, expected);
}

#[test]
fn noops_and_empty_declarations_are_dropped() {
    let file = AssemblyFile::new("main.jbpl").with_elements([
        Element::from(Statement::new(StatementKind::Noop)),
        Element::Declaration(Declaration::new(DeclarationKind::Empty)),
        function(vec![
            Element::from(Statement::new(StatementKind::Noop)),
            insn(Opcode::RETURN),
        ]),
    ]);
    let lowered = lower_file(file, &mut NoIncludes).unwrap();
    assert_eq!(
        lowered.elements,
        vec![function(vec![insn(Opcode::RETURN)])]
    );
}

#[test]
fn includes_expand_once_and_hide_private_names() {
    let mut private_define =
        DefineStatement::new("secret", Expr::ty(Type::I32), Expr::literal(1));
    private_define.is_private = true;
    let public_define = DefineStatement::new("shared", Expr::ty(Type::I32), Expr::literal(2));
    let mut private_macro = MacroDecl::new("helper", vec![], Expr::ty(Type::VOID), vec![]);
    private_macro.is_private = true;

    let lib = AssemblyFile::new("lib.jbpl").with_elements([
        Element::from(private_define),
        Element::from(public_define.clone()),
        Element::from(private_macro),
        include("base.jbpl"),
    ]);
    let base = AssemblyFile::new("base.jbpl").with_elements([Element::from(
        TypeAliasStatement {
            name: "Int".into(),
            ty: Expr::ty(Type::I32),
            is_private: false,
        },
    )]);
    let main = AssemblyFile::new("main.jbpl").with_elements([
        include("lib.jbpl"),
        include("lib.jbpl"),
        include("base.jbpl"),
    ]);

    let mut library = Library::new([lib, base]);
    let lowered = lower_file(main, &mut library).unwrap();
    assert_eq!(library.requests, vec!["lib.jbpl", "base.jbpl"]);
    assert_eq!(
        lowered.elements,
        vec![
            Element::from(public_define),
            Element::from(TypeAliasStatement {
                name: "Int".into(),
                ty: Expr::ty(Type::I32),
                is_private: false,
            }),
        ]
    );
}

#[test]
fn a_file_never_includes_itself() {
    let main = AssemblyFile::new("main.jbpl").with_elements([include("main.jbpl")]);
    let mut library = Library::new([]);
    let lowered = lower_file(main, &mut library).unwrap();
    assert!(lowered.elements.is_empty());
    assert!(library.requests.is_empty());
}

#[test]
fn missing_includes_are_lowering_errors() {
    let main = AssemblyFile::new("main.jbpl").with_elements([include("nowhere.jbpl")]);
    let error = lower_file(main, &mut NoIncludes).unwrap_err();
    assert!(matches!(error, Error::Lowering { .. }));
    assert!(error.to_string().contains("Could not include 'nowhere.jbpl'"));
}

#[test]
fn structural_validation() {
    let nested_include = AssemblyFile::new("main.jbpl").with_elements([function(vec![include("x.jbpl")])]);
    let error = lower_file(nested_include, &mut NoIncludes).unwrap_err();
    assert!(error.to_string().contains("top level only"));

    let unreachable = MacroDecl::new(
        "m",
        vec![],
        Expr::ty(Type::I32),
        vec![
            Element::from(Statement::ret(Some(Expr::literal(1)))),
            Element::from(Statement::ret(Some(Expr::literal(2)))),
        ],
    );
    let file = AssemblyFile::new("main.jbpl").with_elements([Element::from(unreachable)]);
    let error = lower_file(file, &mut NoIncludes).unwrap_err();
    assert!(error.to_string().contains("Statement can never be reached"));
}

#[test]
fn closures_can_resolve_includes() {
    let mut resolver = |path: &str| -> Result<AssemblyFile> {
        Ok(AssemblyFile::new(path).with_elements([Element::from(Instruction::opless(Opcode::NOP))]))
    };
    let main = AssemblyFile::new("main.jbpl").with_elements([include("nop.jbpl")]);
    let lowered = lower_file(main, &mut resolver).unwrap();
    assert_eq!(lowered.elements, vec![insn(Opcode::NOP)]);
    assert_eq!(lowered.elements[0].range(), TokenRange::Synthetic);
}
