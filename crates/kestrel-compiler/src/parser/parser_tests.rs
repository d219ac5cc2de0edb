//! Unit tests for the parser.

use indoc::indoc;
use kestrel_ir::node::{
    BinaryOp, BlockFlags, DeclKind, Expr, ForKind, FunctionFlags, LiteralValue, Stmt, UnaryOp,
};
use kestrel_ir::{FunctionNode, Source};

use super::parse_program;

fn parse(src: &str) -> FunctionNode {
    let source = Source::new("test.js", src);
    let (function, _) = parse_program(&source).expect("parse failed");
    function
}

fn parse_err(src: &str) -> crate::Error {
    let source = Source::new("test.js", src);
    parse_program(&source).expect_err("expected a parse error")
}

#[test]
fn program_node_shape() {
    let program = parse("var x = 1;");
    assert!(program.is_program());
    assert!(program.is_vararg());
    assert!(program.body.flags.contains(BlockFlags::IS_FUNCTION_BODY));
    assert_eq!(program.body.statements.len(), 1);
}

#[test]
fn var_list_expands_to_statements() {
    let program = parse("var a = 1, b, c = 2;");
    let names: Vec<_> = program
        .body
        .statements
        .iter()
        .map(|s| match s {
            Stmt::Var(v) => v.name.name.clone(),
            other => panic!("expected var, got {other:?}"),
        })
        .collect();
    assert_eq!(names, vec!["a", "b", "c"]);
}

#[test]
fn const_requires_initializer() {
    let err = parse_err("const a;");
    assert!(err.to_string().contains("missing const initializer"));
}

#[test]
fn function_declaration_becomes_var() {
    let program = parse("function f(a, b) { return a; }");
    match &program.body.statements[0] {
        Stmt::Var(v) => {
            assert!(v.is_function_declaration);
            assert_eq!(v.kind, DeclKind::Var);
            assert_eq!(v.name.name, "f");
            match v.init.as_ref().unwrap() {
                Expr::Function(f) => {
                    assert!(f.flags.contains(FunctionFlags::IS_DECLARED));
                    assert_eq!(f.params.len(), 2);
                }
                other => panic!("expected function, got {other:?}"),
            }
        }
        other => panic!("expected var, got {other:?}"),
    }
}

#[test]
fn named_function_expression_flag() {
    let program = parse("var g = function h() { return 1; };");
    match &program.body.statements[0] {
        Stmt::Var(v) => match v.init.as_ref().unwrap() {
            Expr::Function(f) => {
                assert!(f.flags.contains(FunctionFlags::IS_NAMED_FUNCTION_EXPRESSION));
                assert!(!f.flags.contains(FunctionFlags::IS_DECLARED));
                assert_eq!(f.name.name, "h");
            }
            other => panic!("expected function, got {other:?}"),
        },
        other => panic!("expected var, got {other:?}"),
    }
}

#[test]
fn eval_call_marks_functions() {
    let program = parse(indoc! {"
        function outer() {
            function inner() { eval(s); }
        }
    "});
    assert!(program.flags.contains(FunctionFlags::HAS_NESTED_EVAL));
    let outer = first_function(&program);
    assert!(outer.flags.contains(FunctionFlags::HAS_NESTED_EVAL));
    assert!(!outer.flags.contains(FunctionFlags::HAS_EVAL));
    let inner = first_function(outer);
    assert!(inner.flags.contains(FunctionFlags::HAS_EVAL));
    assert!(inner.is_vararg());
    assert!(inner.body.flags.contains(BlockFlags::IS_DYNAMIC_BOUNDARY));
}

#[test]
fn arguments_use_marks_vararg() {
    let program = parse("function f() { return arguments[0]; }");
    let f = first_function(&program);
    assert!(f.needs_arguments());
    assert!(f.is_vararg());
}

#[test]
fn precedence_shapes_the_tree() {
    let program = parse("x = 1 + 2 * 3;");
    match &program.body.statements[0] {
        Stmt::Expression(e) => match &e.expression {
            Expr::Binary(assign) => {
                assert_eq!(assign.op, BinaryOp::Assign);
                match &assign.rhs {
                    Expr::Binary(add) => {
                        assert_eq!(add.op, BinaryOp::Add);
                        match &add.rhs {
                            Expr::Binary(mul) => assert_eq!(mul.op, BinaryOp::Mul),
                            other => panic!("expected mul, got {other:?}"),
                        }
                    }
                    other => panic!("expected add, got {other:?}"),
                }
            }
            other => panic!("expected assign, got {other:?}"),
        },
        other => panic!("expected expression, got {other:?}"),
    }
}

#[test]
fn for_in_uses_modify_for_collection() {
    let program = parse("for (var k in obj) { f(k); }");
    match &program.body.statements[0] {
        Stmt::For(f) => {
            assert_eq!(f.kind, ForKind::ForIn);
            assert!(f.test.is_none());
            assert!(f.modify.is_some());
        }
        other => panic!("expected for, got {other:?}"),
    }
}

#[test]
fn case_bodies_are_flagged() {
    let program = parse("switch (e) { case 1: f(); default: g(); }");
    match &program.body.statements[0] {
        Stmt::Switch(s) => {
            assert_eq!(s.cases.len(), 2);
            assert!(s.has_default());
            for case in &s.cases {
                assert!(case.body.flags.contains(BlockFlags::IS_CASE_BODY));
            }
        }
        other => panic!("expected switch, got {other:?}"),
    }
}

#[test]
fn unbraced_bodies_become_synthetic_blocks() {
    let program = parse("if (a) b = 1; else c = 2;");
    match &program.body.statements[0] {
        Stmt::If(i) => {
            assert!(i.pass.flags.contains(BlockFlags::IS_SYNTHETIC));
            assert!(i.fail.as_ref().unwrap().flags.contains(BlockFlags::IS_SYNTHETIC));
        }
        other => panic!("expected if, got {other:?}"),
    }
}

#[test]
fn labelled_break_targets() {
    let program = parse(indoc! {"
        outer: for (;;) {
            for (;;) { break outer; }
        }
    "});
    match &program.body.statements[0] {
        Stmt::Label(l) => assert_eq!(l.name, "outer"),
        other => panic!("expected label, got {other:?}"),
    }
}

#[test]
fn unary_and_literals() {
    let program = parse("var x = -0x10; var s = 'a\\n'; var n = null;");
    match &program.body.statements[0] {
        Stmt::Var(v) => match v.init.as_ref().unwrap() {
            Expr::Unary(u) => {
                assert_eq!(u.op, UnaryOp::Neg);
                assert_eq!(
                    u.operand.as_literal().unwrap().value,
                    LiteralValue::Int(16)
                );
            }
            other => panic!("expected unary, got {other:?}"),
        },
        other => panic!("expected var, got {other:?}"),
    }
}

#[test]
fn new_with_member_chain() {
    let program = parse("var d = new a.b.C(1);");
    match &program.body.statements[0] {
        Stmt::Var(v) => match v.init.as_ref().unwrap() {
            Expr::Call(c) => {
                assert!(c.is_new);
                assert_eq!(c.args.len(), 1);
                assert!(matches!(&c.function, Expr::Access(_)));
            }
            other => panic!("expected call, got {other:?}"),
        },
        other => panic!("expected var, got {other:?}"),
    }
}

#[test]
fn try_without_catch_or_finally_is_an_error() {
    let err = parse_err("try { f(); }");
    assert!(err.to_string().contains("missing catch or finally"));
}

#[test]
fn duplicate_default_is_an_error() {
    let err = parse_err("switch (e) { default: a(); default: b(); }");
    assert!(err.to_string().contains("duplicate default"));
}

fn first_function(f: &FunctionNode) -> &FunctionNode {
    f.body
        .statements
        .iter()
        .find_map(|s| match s {
            Stmt::Var(v) => match v.init.as_ref() {
                Some(Expr::Function(inner)) => Some(inner.as_ref()),
                _ => None,
            },
            _ => None,
        })
        .expect("no nested function found")
}
