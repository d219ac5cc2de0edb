//! End-to-end pipeline invariants.

use indoc::indoc;

use kestrel_ir::node::{Expr, Stmt};

use crate::test_utils::{compile, functions_of, own_exprs, walk_exprs, walk_stmts};

#[test]
fn every_identifier_reference_has_a_symbol() {
    let src = indoc! {"
        var total = 0;
        function sum(arr) {
            var i;
            for (i = 0; i < arr.length; i = i + 1) {
                total = total + arr[i];
            }
            return total;
        }
        try {
            sum([1, 2, 3]);
        } catch (e) {
            report(e);
        } finally {
            done();
        }
        outer: while (running) {
            switch (mode) {
                case 1: break outer;
                default: mode = next(mode);
            }
        }
    "};
    let script = compile(src);
    let mut unresolved = Vec::new();
    walk_exprs(&script.function, &mut |e| {
        if let Expr::Ident(i) = e {
            if i.symbol.is_none() {
                unresolved.push(i.name.clone());
            }
        }
    });
    assert!(unresolved.is_empty(), "unresolved: {unresolved:?}");
}

#[test]
fn no_try_node_retains_a_finally_body() {
    let src = indoc! {"
        function f() {
            try {
                try { g(); } finally { inner(); }
            } catch (e) {
                h(e);
            } finally {
                outer();
            }
        }
    "};
    let script = compile(src);
    walk_stmts(&script.function, &mut |stmt| {
        if let Stmt::Try(t) = stmt {
            assert!(t.finally_body.is_none());
        }
    });
}

#[test]
fn var_names_survive_lowering_even_in_dead_code() {
    let src = indoc! {"
        if (false) { var ghost = 1; }
        function f() { return 1; var shadow = 2; }
        var live = f();
    "};
    let script = compile(src);
    let mut names = Vec::new();
    walk_stmts(&script.function, &mut |stmt| {
        if let Stmt::Var(v) = stmt {
            names.push(v.name.name.clone());
        }
    });
    assert!(names.contains(&"ghost".to_string()));
    assert!(names.contains(&"shadow".to_string()));
    assert!(names.contains(&"live".to_string()));
}

#[test]
fn unique_integer_switch_needs_no_tag() {
    let script = compile("switch (e) { case 1: break; case 2: break; case 3: break; }");
    // No wrapping block was introduced.
    match &script.function.body.statements[0] {
        Stmt::Switch(s) => {
            assert!(s.unique_integer);
            assert!(s.tag.is_none());
        }
        other => panic!("expected a bare switch, got {other:?}"),
    }
}

#[test]
fn non_unique_switch_allocates_a_tag() {
    let script = compile("switch (e) { case 'a': f(); }");
    let mut tags = Vec::new();
    walk_stmts(&script.function, &mut |stmt| {
        if let Stmt::Switch(s) = stmt {
            tags.push(s.tag);
        }
    });
    assert_eq!(tags.len(), 1);
    let tag = tags[0].expect("no tag symbol allocated");
    assert!(script.symbols.symbol(tag).is_internal());
}

#[test]
fn self_referential_function_expression_round_trip() {
    let script = compile("var g = function g(){ return g; };");
    let g = crate::test_utils::find_function(&script.function, "g");
    assert!(
        g.flags
            .contains(kestrel_ir::node::FunctionFlags::USES_SELF_SYMBOL)
    );
    let mut self_refs = 0;
    for expr in own_exprs(g) {
        if let Expr::Ident(i) = expr {
            if i.name == "g" {
                let symbol = script.symbols.symbol(i.symbol.unwrap());
                if symbol.is_function_self() {
                    self_refs += 1;
                }
            }
        }
    }
    assert!(self_refs >= 1);
}

#[test]
fn every_function_is_bound_to_a_compile_unit() {
    let src = "function a() { function b() { return 1; } return b; } var r = a();";
    let script = compile(src);
    for function in functions_of(&script.function) {
        assert!(
            function.compile_unit.is_some(),
            "function {} has no compile unit",
            function.name.name
        );
    }
}

#[test]
fn program_points_do_not_leak_across_functions() {
    let src = indoc! {"
        function f(a) { return a.x + a.y; }
        function g(b) { return b.x + b.y; }
        var r = f(o) + g(o);
    "};
    let script = compile(src);
    for function in functions_of(&script.function) {
        let mut seen = std::collections::HashSet::new();
        for expr in own_exprs(function) {
            if let Some(point) = expr.program_point() {
                assert!(seen.insert(point));
            }
        }
    }
}

#[test]
fn parallel_compilations_share_only_immutable_state() {
    let feedback = crate::compile::TypeFeedback::new();
    let sources: Vec<_> = (0..4)
        .map(|i| kestrel_ir::Source::new(format!("s{i}.js"), "var x = 1 + 2;".to_string()))
        .collect();
    std::thread::scope(|scope| {
        for source in &sources {
            let feedback = &feedback;
            scope.spawn(move || {
                let mut compiler = crate::compile::Compiler::new(source, feedback);
                compiler.compile_script().expect("compile failed");
            });
        }
    });
}
