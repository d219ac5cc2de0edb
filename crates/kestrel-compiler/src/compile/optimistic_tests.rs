//! Unit tests for optimistic type assignment.

use kestrel_ir::node::{BinaryOp, Expr, FIRST_PROGRAM_POINT};
use kestrel_ir::JsType;

use crate::compile::{CompileOptions, TypeFeedback};
use crate::test_utils::{compile, compile_with, find_function, own_exprs, walk_exprs};

/// The first add node of a compiled tree, with its owning function id.
fn find_add(script: &crate::compile::CompiledScript) -> (kestrel_ir::FnId, u32, Option<JsType>) {
    for function in crate::test_utils::functions_of(&script.function) {
        for expr in own_exprs(function) {
            if let Expr::Binary(b) = expr {
                if b.op == BinaryOp::Add {
                    return (function.id, b.program_point.unwrap(), b.opt_type);
                }
            }
        }
    }
    panic!("no add node found");
}

#[test]
fn fresh_sites_start_at_the_narrowest_type() {
    let script = compile("function f(a, b) { var x = a + b; }");
    let (_, point, ty) = find_add(&script);
    assert!(point >= FIRST_PROGRAM_POINT);
    assert_eq!(ty, Some(JsType::NARROWEST));
}

#[test]
fn invalidated_sites_widen() {
    // First compile to learn the add's program point, then recompile with
    // feedback, the way a de-optimizing runtime would.
    let src = "function f(a, b) { var x = a + b; }";
    let (function, point, _) = find_add(&compile(src));

    let mut feedback = TypeFeedback::new();
    feedback.invalidate(function, point, JsType::Number);
    let script = compile_with(src, CompileOptions::default(), &feedback);
    let (_, _, ty) = find_add(&script);
    assert_eq!(ty, Some(JsType::Object));
}

#[test]
fn condition_positions_are_never_optimistic() {
    let script = compile("function f(a, b) { if (a + b) { g(); } }");
    let (_, _, ty) = find_add(&script);
    assert_eq!(ty, None);
}

#[test]
fn loop_tests_are_never_optimistic() {
    let script = compile("function f(a, b) { while (a + b) { g(); } }");
    let (_, _, ty) = find_add(&script);
    assert_eq!(ty, None);
}

#[test]
fn assignment_targets_are_never_optimistic() {
    let script = compile("function f() { a = b; }");
    let f = find_function(&script.function, "f");
    let mut lhs_ty = Some(JsType::Unknown);
    let mut rhs_ty = None;
    for expr in own_exprs(f) {
        if let Expr::Binary(b) = expr {
            if b.op == BinaryOp::Assign {
                if let Expr::Ident(l) = &b.lhs {
                    lhs_ty = l.opt_type;
                }
                if let Expr::Ident(r) = &b.rhs {
                    rhs_ty = r.opt_type;
                }
            }
        }
    }
    assert_eq!(lhs_ty, None);
    assert_eq!(rhs_ty, Some(JsType::NARROWEST));
}

#[test]
fn strict_equality_operands_are_never_optimistic() {
    let script = compile("function f() { return a === b; }");
    let mut ident_types = Vec::new();
    walk_exprs(&script.function, &mut |e| {
        if let Expr::Ident(i) = e {
            if i.name == "a" || i.name == "b" {
                ident_types.push(i.opt_type);
            }
        }
    });
    assert_eq!(ident_types, vec![None, None]);
}

#[test]
fn call_targets_are_never_optimistic() {
    let script = compile("function f() { g(); }");
    let mut g_type = Some(JsType::Unknown);
    walk_exprs(&script.function, &mut |e| {
        if let Expr::Ident(i) = e {
            if i.name == "g" {
                g_type = i.opt_type;
            }
        }
    });
    assert_eq!(g_type, None);
}

#[test]
fn slotted_locals_have_statically_known_types() {
    let script = compile("function f() { var a = 1; return a + 1; }");
    let mut a_types = Vec::new();
    walk_exprs(&script.function, &mut |e| {
        if let Expr::Ident(i) = e {
            if i.name == "a" {
                a_types.push(i.opt_type);
            }
        }
    });
    // Both the (never-visited) declaration target and the use are
    // pessimistic: the local's type comes from its slot.
    assert!(a_types.iter().all(Option::is_none));
}

#[test]
fn vararg_parameters_are_object_typed() {
    let script = compile("function f(p) { return arguments[0] + p; }");
    let mut p_type = None;
    walk_exprs(&script.function, &mut |e| {
        if let Expr::Ident(i) = e {
            if i.name == "p" {
                p_type = i.opt_type;
            }
        }
    });
    assert_eq!(p_type, Some(JsType::Object));
}

#[test]
fn program_points_are_unique_per_function() {
    let src = "function f(a, b) { var x = a + b; var y = g(a) + h(b); } var z = f(1, 2);";
    let script = compile(src);
    for function in crate::test_utils::functions_of(&script.function) {
        let mut seen = std::collections::HashSet::new();
        for expr in own_exprs(function) {
            if let Some(point) = expr.program_point() {
                assert!(point >= FIRST_PROGRAM_POINT);
                assert!(
                    seen.insert(point),
                    "duplicate program point {point} in function {}",
                    function.id.as_u32()
                );
            }
        }
    }
}
