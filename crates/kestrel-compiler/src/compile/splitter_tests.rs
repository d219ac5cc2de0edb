//! Unit tests for the splitter.

use indoc::indoc;

use kestrel_ir::node::{Expr, FunctionFlags, Stmt};

use crate::compile::{CompileOptions, TypeFeedback};
use crate::test_utils::{compile, compile_with, walk_stmts};

fn split_options(threshold: u32) -> CompileOptions {
    CompileOptions {
        split_threshold: threshold,
        ..CompileOptions::default()
    }
}

fn split_nodes(script: &crate::compile::CompiledScript) -> Vec<kestrel_ir::node::SplitNode> {
    let mut out = Vec::new();
    walk_stmts(&script.function, &mut |stmt| {
        if let Stmt::Split(s) = stmt {
            out.push((**s).clone());
        }
    });
    out
}

#[test]
fn functions_below_the_threshold_are_unchanged() {
    let src = "var x = 1; function f() { return x + 1; }";
    let feedback = TypeFeedback::new();
    let normal = compile(src);
    let unlimited = compile_with(src, split_options(u32::MAX), &feedback);

    assert!(split_nodes(&normal).is_empty());
    assert_eq!(normal.function, unlimited.function);
    assert!(!normal.function.flags.contains(FunctionFlags::IS_SPLIT));
    // Every function still gets a compile-unit binding.
    assert!(normal.function.compile_unit.is_some());
}

#[test]
fn oversized_bodies_are_partitioned_into_split_nodes() {
    let src = indoc! {"
        f(1); f(2); f(3); f(4); f(5);
        f(6); f(7); f(8); f(9); f(10);
    "};
    let feedback = TypeFeedback::new();
    let script = compile_with(src, split_options(100), &feedback);

    let splits = split_nodes(&script);
    assert!(splits.len() >= 2, "expected multiple split nodes");
    assert!(script.function.flags.contains(FunctionFlags::IS_SPLIT));
    assert!(!script.units.is_empty());
}

#[test]
fn terminal_statements_stay_outside_split_nodes() {
    let src = indoc! {"
        function f() {
            g(1); g(2); g(3); g(4); g(5);
            g(6); g(7); g(8); g(9); g(10);
            return 1;
        }
        var r = f();
    "};
    let feedback = TypeFeedback::new();
    let script = compile_with(src, split_options(100), &feedback);
    let f = crate::test_utils::find_function(&script.function, "f");
    for stmt in &f.body.statements {
        if let Stmt::Split(split) = stmt {
            let mut nested_return = false;
            for s in &split.body.statements {
                nested_return |= matches!(s, Stmt::Return(_));
            }
            assert!(!nested_return, "terminal statement inside a split node");
        }
    }
    assert!(matches!(f.body.statements.last(), Some(Stmt::Return(_))));
}

#[test]
fn oversized_array_literals_get_ranges() {
    let elements = (0..40).map(|i| i.to_string()).collect::<Vec<_>>().join(", ");
    let src = format!("var big = [{elements}];");
    let feedback = TypeFeedback::new();
    let script = compile_with(&src, split_options(120), &feedback);

    let mut ranges = Vec::new();
    let mut seen_len = 0;
    crate::test_utils::walk_exprs(&script.function, &mut |e| {
        if let Expr::ArrayLiteral(a) = e {
            ranges = a.units.clone();
            seen_len = a.elements.len();
        }
    });
    assert!(ranges.len() >= 2, "expected multiple array ranges");
    // Ranges tile the element list.
    assert_eq!(ranges.first().unwrap().lo, 0);
    assert_eq!(ranges.last().unwrap().hi, seen_len);
    for pair in ranges.windows(2) {
        assert_eq!(pair[0].hi, pair[1].lo);
    }
}

#[test]
fn nested_functions_split_independently() {
    let src = indoc! {"
        function big() {
            g(1); g(2); g(3); g(4); g(5);
            g(6); g(7); g(8); g(9); g(10);
        }
    "};
    let feedback = TypeFeedback::new();
    let script = compile_with(src, split_options(100), &feedback);

    let big = crate::test_utils::find_function(&script.function, "big");
    assert!(big.flags.contains(FunctionFlags::IS_SPLIT));
    // The program itself stayed small enough to remain whole.
    let program_splits: Vec<_> = script
        .function
        .body
        .statements
        .iter()
        .filter(|s| matches!(s, Stmt::Split(_)))
        .collect();
    assert!(program_splits.is_empty());
}

#[test]
fn split_bodies_are_scope_boundaries() {
    let src = indoc! {"
        f(1); f(2); f(3); f(4); f(5);
        f(6); f(7); f(8); f(9); f(10);
    "};
    let feedback = TypeFeedback::new();
    let script = compile_with(src, split_options(100), &feedback);
    for split in split_nodes(&script) {
        assert!(
            split
                .body
                .flags
                .contains(kestrel_ir::node::BlockFlags::IS_SPLIT_BODY)
        );
    }
}
