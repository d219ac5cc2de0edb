//! Unit tests for scope-depth analysis.

use indoc::indoc;

use kestrel_ir::node::FunctionFlags;
use kestrel_ir::Source;

use crate::compile::{CompileOptions, Compiler, TypeFeedback};
use crate::parser;
use crate::test_utils::find_function;

#[test]
fn captured_var_has_depth_zero_from_the_nearest_scope() {
    let source = Source::new(
        "test.js",
        "function outer() { var a; function inner() { return a; } }",
    );
    let feedback = TypeFeedback::new();
    let mut compiler = Compiler::new(&source, &feedback);
    let script = compiler.compile_script().expect("compile failed");

    let inner = find_function(&script.function, "inner");
    let data = compiler
        .get_script_function_data(inner.id)
        .expect("no data for inner");
    assert_eq!(data.external_symbol_depths.get("a"), Some(&0));
    assert!(!data.in_dynamic_context);
}

#[test]
fn intervening_scope_blocks_increase_the_depth() {
    let src = indoc! {"
        function outer() {
            var a;
            function mid() {
                var b;
                function inner() { return a + b; }
                return inner;
            }
        }
    "};
    let source = Source::new("test.js", src);
    let feedback = TypeFeedback::new();
    let mut compiler = Compiler::new(&source, &feedback);
    let script = compiler.compile_script().expect("compile failed");

    let inner = find_function(&script.function, "inner");
    let data = compiler.get_script_function_data(inner.id).unwrap();
    // b is one scope out from inner; a is behind mid's scope-bearing body.
    assert_eq!(data.external_symbol_depths.get("b"), Some(&0));
    assert_eq!(data.external_symbol_depths.get("a"), Some(&1));
}

#[test]
fn internal_symbols_cover_nested_definitions() {
    let src = "function outer() { var a; function inner() { var c; } }";
    let source = Source::new("test.js", src);
    let feedback = TypeFeedback::new();
    let mut compiler = Compiler::new(&source, &feedback);
    let script = compiler.compile_script().expect("compile failed");

    let outer = find_function(&script.function, "outer");
    let data = compiler.get_script_function_data(outer.id).unwrap();
    assert!(data.internal_symbols.contains("a"));
    assert!(data.internal_symbols.contains("c"));
}

#[test]
fn functions_under_eval_are_in_dynamic_context() {
    let src = indoc! {"
        function host() {
            eval(s);
            function captive() { }
        }
    "};
    let source = Source::new("test.js", src);
    let feedback = TypeFeedback::new();
    let mut compiler = Compiler::new(&source, &feedback);
    let script = compiler.compile_script().expect("compile failed");

    let host = find_function(&script.function, "host");
    let captive = find_function(&script.function, "captive");
    assert!(!host.flags.contains(FunctionFlags::IN_DYNAMIC_CONTEXT));
    assert!(captive.flags.contains(FunctionFlags::IN_DYNAMIC_CONTEXT));
    assert!(
        compiler
            .get_script_function_data(captive.id)
            .unwrap()
            .in_dynamic_context
    );
}

#[test]
fn on_demand_without_cached_data_is_fatal() {
    let source = Source::new("test.js", "var x = 1;");
    let (function, ids) = parser::parse_program(&source).expect("parse failed");
    let feedback = TypeFeedback::new();
    let options = CompileOptions {
        on_demand: true,
        ..CompileOptions::default()
    };
    let mut compiler = Compiler::with_options(&source, &feedback, options);
    let err = compiler
        .compile_function(function, ids)
        .expect_err("expected an internal error");
    assert!(matches!(err, crate::Error::Internal(_)));
}

#[test]
fn on_demand_restores_dynamic_context_from_cache() {
    let source = Source::new("test.js", "var x = 1;");
    let (function, ids) = parser::parse_program(&source).expect("parse failed");
    let feedback = TypeFeedback::new();
    let options = CompileOptions {
        on_demand: true,
        ..CompileOptions::default()
    };
    let mut compiler = Compiler::with_options(&source, &feedback, options);
    compiler.register_script_function_data(
        function.id,
        crate::compile::RecompilableData {
            in_dynamic_context: true,
            ..Default::default()
        },
    );
    let script = compiler
        .compile_function(function, ids)
        .expect("compile failed");
    assert!(
        script
            .function
            .flags
            .contains(FunctionFlags::IN_DYNAMIC_CONTEXT)
    );
}
