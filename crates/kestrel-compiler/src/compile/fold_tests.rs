//! Unit tests for the constant folder.

use pretty_assertions::assert_eq;

use kestrel_ir::node::{Expr, LiteralValue, Stmt};

use crate::test_utils::{find_var, folded};

fn init_value(src: &str, name: &str) -> LiteralValue {
    let program = folded(src);
    let var = find_var(&program, name);
    match var.init.as_ref().expect("initializer") {
        Expr::Literal(lit) => lit.value.clone(),
        other => panic!("initializer did not fold: {other:?}"),
    }
}

#[test]
fn arithmetic_folds_to_int() {
    assert_eq!(init_value("var x = 1 + 2 * 3;", "x"), LiteralValue::Int(7));
}

#[test]
fn int_overflow_widens_to_long() {
    assert_eq!(
        init_value("var x = 2147483647 + 1;", "x"),
        LiteralValue::Long(2147483648)
    );
}

#[test]
fn division_narrows_when_exact() {
    assert_eq!(init_value("var x = 6 / 2;", "x"), LiteralValue::Int(3));
    assert_eq!(init_value("var x = 1 / 2;", "x"), LiteralValue::Number(0.5));
}

#[test]
fn negated_zero_is_a_number() {
    match init_value("var x = -0;", "x") {
        LiteralValue::Number(n) => {
            assert_eq!(n, 0.0);
            assert!(n.is_sign_negative());
        }
        other => panic!("expected -0.0, got {other:?}"),
    }
}

#[test]
fn unsigned_shift_renarrows_through_uint32() {
    assert_eq!(
        init_value("var x = -1 >>> 0;", "x"),
        LiteralValue::Long(4294967295)
    );
    assert_eq!(init_value("var x = 8 >>> 1;", "x"), LiteralValue::Int(4));
}

#[test]
fn bitwise_produces_int() {
    assert_eq!(init_value("var x = ~5;", "x"), LiteralValue::Int(-6));
    assert_eq!(init_value("var x = 6 & 3;", "x"), LiteralValue::Int(2));
    assert_eq!(init_value("var x = 1 << 5;", "x"), LiteralValue::Int(32));
}

#[test]
fn string_concatenation() {
    assert_eq!(
        init_value("var x = 'a' + 1;", "x"),
        LiteralValue::Str("a1".to_string())
    );
}

#[test]
fn comparisons_fold_to_booleans() {
    assert_eq!(init_value("var x = 1 < 2;", "x"), LiteralValue::Boolean(true));
    assert_eq!(
        init_value("var x = 'a' < 'b';", "x"),
        LiteralValue::Boolean(true)
    );
    assert_eq!(
        init_value("var x = 1 === 1.0;", "x"),
        LiteralValue::Boolean(true)
    );
    assert_eq!(
        init_value("var x = null == 0;", "x"),
        LiteralValue::Boolean(false)
    );
}

#[test]
fn truthiness_of_not() {
    assert_eq!(init_value("var x = !'';", "x"), LiteralValue::Boolean(true));
    assert_eq!(
        init_value("var x = !3;", "x"),
        LiteralValue::Boolean(false)
    );
}

#[test]
fn typeof_is_never_folded() {
    let program = folded("var x = typeof 1;");
    let var = find_var(&program, "x");
    assert!(matches!(var.init.as_ref().unwrap(), Expr::Unary(_)));
}

#[test]
fn array_literals_never_fold_as_operands() {
    let program = folded("var x = [1] + 1;");
    let var = find_var(&program, "x");
    assert!(matches!(var.init.as_ref().unwrap(), Expr::Binary(_)));
}

#[test]
fn ternary_takes_the_live_branch() {
    assert_eq!(init_value("var x = true ? 1 : 2;", "x"), LiteralValue::Int(1));
    assert_eq!(init_value("var x = 0 ? 1 : 2;", "x"), LiteralValue::Int(2));
}

#[test]
fn dead_if_branch_keeps_var_declarations() {
    let program = folded("if (false) { var a; a = 1; } else { var b = 2; }");
    match &program.body.statements[0] {
        Stmt::Block(block) => {
            let vars: Vec<_> = block
                .statements
                .iter()
                .filter_map(|s| match s {
                    Stmt::Var(v) => Some((v.name.name.clone(), v.init.is_some())),
                    _ => None,
                })
                .collect();
            assert_eq!(
                vars,
                vec![("a".to_string(), false), ("b".to_string(), true)]
            );
            // The dead assignment is gone.
            assert!(
                !block
                    .statements
                    .iter()
                    .any(|s| matches!(s, Stmt::Expression(_)))
            );
        }
        other => panic!("expected block, got {other:?}"),
    }
}

#[test]
fn dead_if_without_live_branch_leaves_only_vars() {
    let program = folded("if (false) { var a = 1; f(); }");
    match &program.body.statements[0] {
        Stmt::Block(block) => {
            assert_eq!(block.statements.len(), 1);
            match &block.statements[0] {
                Stmt::Var(v) => {
                    assert_eq!(v.name.name, "a");
                    assert!(v.init.is_none());
                }
                other => panic!("expected var, got {other:?}"),
            }
        }
        other => panic!("expected block, got {other:?}"),
    }
}

#[test]
fn unique_integer_switch_is_detected() {
    let program = folded("switch (e) { case 1: break; case 2: break; case 3: break; }");
    match &program.body.statements[0] {
        Stmt::Switch(s) => assert!(s.unique_integer),
        other => panic!("expected switch, got {other:?}"),
    }
}

#[test]
fn duplicate_case_values_are_not_unique_integer() {
    let program = folded("switch (e) { case 1: break; case 1: break; }");
    match &program.body.statements[0] {
        Stmt::Switch(s) => assert!(!s.unique_integer),
        other => panic!("expected switch, got {other:?}"),
    }
}

#[test]
fn folding_is_idempotent() {
    let src = "var x = 1 + 2; if (true) { g(); } var y = x ? 'a' + 'b' : 2;";
    let once = folded(src);
    let mut ids = kestrel_ir::node::IdAllocator::new();
    // Re-fold the already folded tree; nothing should change.
    let twice = crate::compile::fold_apply(&mut ids, once.clone()).unwrap();
    assert_eq!(once, twice);
}
