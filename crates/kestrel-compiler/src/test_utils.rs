//! Test utilities shared by pass tests.

use kestrel_ir::node::{Expr, ForInit, FunctionNode, Stmt, VarNode};
use kestrel_ir::{FnId, Source, SymbolTable};

use crate::compile::{CompileOptions, CompiledScript, Compiler, TypeFeedback};
use crate::parser;

/// Run the full pipeline over a source string.
pub fn compile(src: &str) -> CompiledScript {
    let source = Source::new("test.js", src);
    let feedback = TypeFeedback::new();
    match Compiler::new(&source, &feedback).compile_script() {
        Ok(script) => script,
        Err(e) => panic!("compilation failed: {e}"),
    }
}

/// Run the full pipeline with explicit options and feedback.
pub fn compile_with(src: &str, options: CompileOptions, feedback: &TypeFeedback) -> CompiledScript {
    let source = Source::new("test.js", src);
    match Compiler::with_options(&source, feedback, options).compile_script() {
        Ok(script) => script,
        Err(e) => panic!("compilation failed: {e}"),
    }
}

/// Expect the pipeline to fail.
pub fn compile_err(src: &str) -> crate::Error {
    let source = Source::new("test.js", src);
    let feedback = TypeFeedback::new();
    Compiler::new(&source, &feedback)
        .compile_script()
        .err()
        .expect("expected a compile error")
}

/// Parse and run only folding and lowering.
pub fn lowered(src: &str) -> FunctionNode {
    let source = Source::new("test.js", src);
    let (function, mut ids) = parser::parse_program(&source).expect("parse failed");
    let function = crate::compile::fold_apply(&mut ids, function).expect("folding failed");
    crate::compile::lower_apply(&mut ids, function).expect("lowering failed")
}

/// Parse and run only folding.
pub fn folded(src: &str) -> FunctionNode {
    let source = Source::new("test.js", src);
    let (function, mut ids) = parser::parse_program(&source).expect("parse failed");
    crate::compile::fold_apply(&mut ids, function).expect("folding failed")
}

/// Visit every statement of a function, nested functions included.
pub fn walk_stmts<'a>(function: &'a FunctionNode, f: &mut impl FnMut(&'a Stmt)) {
    walk_block_stmts(&function.body.statements, f);
}

fn walk_block_stmts<'a>(stmts: &'a [Stmt], f: &mut impl FnMut(&'a Stmt)) {
    for stmt in stmts {
        f(stmt);
        match stmt {
            Stmt::Block(b) => walk_block_stmts(&b.statements, f),
            Stmt::Var(v) => {
                if let Some(init) = &v.init {
                    walk_expr_stmts(init, f);
                }
            }
            Stmt::Expression(e) => walk_expr_stmts(&e.expression, f),
            Stmt::If(i) => {
                walk_expr_stmts(&i.test, f);
                walk_block_stmts(&i.pass.statements, f);
                if let Some(fail) = &i.fail {
                    walk_block_stmts(&fail.statements, f);
                }
            }
            Stmt::Switch(s) => {
                walk_expr_stmts(&s.expression, f);
                for c in &s.cases {
                    if let Some(t) = &c.test {
                        walk_expr_stmts(t, f);
                    }
                    walk_block_stmts(&c.body.statements, f);
                }
            }
            Stmt::While(w) => {
                walk_expr_stmts(&w.test, f);
                walk_block_stmts(&w.body.statements, f);
            }
            Stmt::For(fo) => {
                match &fo.init {
                    Some(ForInit::Var(vars)) => {
                        for v in vars {
                            if let Some(init) = &v.init {
                                walk_expr_stmts(init, f);
                            }
                        }
                    }
                    Some(ForInit::Expr(e)) => walk_expr_stmts(e, f),
                    None => {}
                }
                if let Some(t) = &fo.test {
                    walk_expr_stmts(t, f);
                }
                if let Some(m) = &fo.modify {
                    walk_expr_stmts(m, f);
                }
                walk_block_stmts(&fo.body.statements, f);
            }
            Stmt::Try(t) => {
                walk_block_stmts(&t.body.statements, f);
                for c in &t.catches {
                    walk_block_stmts(&c.body.statements, f);
                }
                if let Some(fin) = &t.finally_body {
                    walk_block_stmts(&fin.statements, f);
                }
                walk_block_stmts(&t.inlined_finallies, f);
            }
            Stmt::Throw(t) => walk_expr_stmts(&t.expression, f),
            Stmt::Return(r) => {
                if let Some(e) = &r.expression {
                    walk_expr_stmts(e, f);
                }
            }
            Stmt::Label(l) => walk_block_stmts(&l.body.statements, f),
            Stmt::Split(s) => walk_block_stmts(&s.body.statements, f),
            _ => {}
        }
    }
}

fn walk_expr_stmts<'a>(expr: &'a Expr, f: &mut impl FnMut(&'a Stmt)) {
    if let Expr::Function(function) = expr {
        walk_block_stmts(&function.body.statements, f);
        return;
    }
    for child in expr_children(expr) {
        walk_expr_stmts(child, f);
    }
}

/// Visit every expression of a function, nested functions included.
pub fn walk_exprs<'a>(function: &'a FunctionNode, f: &mut impl FnMut(&'a Expr)) {
    let mut on_stmt = |stmt: &'a Stmt| {
        for e in stmt_exprs(stmt) {
            visit_expr(e, f);
        }
    };
    walk_block_stmts(&function.body.statements, &mut on_stmt);
}

fn visit_expr<'a>(expr: &'a Expr, f: &mut impl FnMut(&'a Expr)) {
    f(expr);
    if matches!(expr, Expr::Function(_)) {
        // Function bodies are reached through their statements.
        return;
    }
    for child in expr_children(expr) {
        visit_expr(child, f);
    }
}

fn stmt_exprs(stmt: &Stmt) -> Vec<&Expr> {
    match stmt {
        Stmt::Var(v) => v.init.iter().collect(),
        Stmt::Expression(e) => vec![&e.expression],
        Stmt::If(i) => vec![&i.test],
        Stmt::Switch(s) => {
            let mut out = vec![&s.expression];
            out.extend(s.cases.iter().filter_map(|c| c.test.as_ref()));
            out
        }
        Stmt::While(w) => vec![&w.test],
        Stmt::For(fo) => {
            let mut out = Vec::new();
            match &fo.init {
                Some(ForInit::Var(vars)) => out.extend(vars.iter().filter_map(|v| v.init.as_ref())),
                Some(ForInit::Expr(e)) => out.push(e),
                None => {}
            }
            out.extend(fo.test.iter());
            out.extend(fo.modify.iter());
            out
        }
        Stmt::Throw(t) => vec![&t.expression],
        Stmt::Return(r) => r.expression.iter().collect(),
        Stmt::Try(t) => t
            .catches
            .iter()
            .filter_map(|c| c.condition.as_ref())
            .collect(),
        _ => Vec::new(),
    }
}

fn expr_children(expr: &Expr) -> Vec<&Expr> {
    match expr {
        Expr::Unary(u) => vec![&u.operand],
        Expr::Binary(b) => vec![&b.lhs, &b.rhs],
        Expr::Ternary(t) => vec![&t.test, &t.consequent, &t.alternate],
        Expr::Access(a) => vec![&a.base],
        Expr::Index(i) => vec![&i.base, &i.index],
        Expr::Call(c) => {
            let mut out = vec![&c.function];
            out.extend(c.args.iter());
            out
        }
        Expr::ArrayLiteral(a) => a.elements.iter().flatten().collect(),
        Expr::ObjectLiteral(o) => o.properties.iter().map(|p| &p.value).collect(),
        Expr::Runtime(r) => r.args.iter().collect(),
        Expr::JoinPredecessor(j) => vec![&j.expression],
        Expr::Ident(_) | Expr::Literal(_) | Expr::Function(_) => Vec::new(),
    }
}

/// Every function of a tree, the given one included, outermost first.
pub fn functions_of<'a>(function: &'a FunctionNode) -> Vec<&'a FunctionNode> {
    let mut out: Vec<&'a FunctionNode> = vec![function];
    let mut i = 0;
    while i < out.len() {
        let current = out[i];
        let mut nested: Vec<&'a FunctionNode> = Vec::new();
        let mut on_stmt = |stmt: &'a Stmt| {
            for e in stmt_exprs(stmt) {
                collect_nested_functions(e, &mut nested);
            }
        };
        walk_own_stmts(&current.body.statements, &mut on_stmt);
        out.extend(nested);
        i += 1;
    }
    out
}

fn collect_nested_functions<'a>(expr: &'a Expr, out: &mut Vec<&'a FunctionNode>) {
    if let Expr::Function(f) = expr {
        out.push(f);
        return;
    }
    for child in expr_children(expr) {
        collect_nested_functions(child, out);
    }
}

/// Expressions belonging to one function, not descending into nested
/// function bodies.
pub fn own_exprs<'a>(function: &'a FunctionNode) -> Vec<&'a Expr> {
    let mut out: Vec<&'a Expr> = Vec::new();
    let mut on_stmt = |stmt: &'a Stmt| {
        for e in stmt_exprs(stmt) {
            collect_own_exprs(e, &mut out);
        }
    };
    walk_own_stmts(&function.body.statements, &mut on_stmt);
    out
}

fn collect_own_exprs<'a>(expr: &'a Expr, out: &mut Vec<&'a Expr>) {
    out.push(expr);
    if matches!(expr, Expr::Function(_)) {
        return;
    }
    for child in expr_children(expr) {
        collect_own_exprs(child, out);
    }
}

/// Like `walk_block_stmts` but staying within one function: statements of
/// nested function bodies are not visited.
fn walk_own_stmts<'a>(stmts: &'a [Stmt], f: &mut impl FnMut(&'a Stmt)) {
    for stmt in stmts {
        f(stmt);
        match stmt {
            Stmt::Block(b) => walk_own_stmts(&b.statements, f),
            Stmt::If(i) => {
                walk_own_stmts(&i.pass.statements, f);
                if let Some(fail) = &i.fail {
                    walk_own_stmts(&fail.statements, f);
                }
            }
            Stmt::Switch(s) => {
                for c in &s.cases {
                    walk_own_stmts(&c.body.statements, f);
                }
            }
            Stmt::While(w) => walk_own_stmts(&w.body.statements, f),
            Stmt::For(fo) => walk_own_stmts(&fo.body.statements, f),
            Stmt::Try(t) => {
                walk_own_stmts(&t.body.statements, f);
                for c in &t.catches {
                    walk_own_stmts(&c.body.statements, f);
                }
                if let Some(fin) = &t.finally_body {
                    walk_own_stmts(&fin.statements, f);
                }
                walk_own_stmts(&t.inlined_finallies, f);
            }
            Stmt::Label(l) => walk_own_stmts(&l.body.statements, f),
            Stmt::Split(s) => walk_own_stmts(&s.body.statements, f),
            _ => {}
        }
    }
}

/// Find a nested function by name.
pub fn find_function<'a>(function: &'a FunctionNode, name: &str) -> &'a FunctionNode {
    let mut found = None;
    let mut on_stmt = |stmt: &'a Stmt| {
        for e in stmt_exprs(stmt) {
            find_function_in_expr(e, name, &mut found);
        }
    };
    walk_block_stmts(&function.body.statements, &mut on_stmt);
    found.unwrap_or_else(|| panic!("no function named {name}"))
}

fn find_function_in_expr<'a>(
    expr: &'a Expr,
    name: &str,
    found: &mut Option<&'a FunctionNode>,
) {
    if let Expr::Function(f) = expr {
        if f.name.name == name && found.is_none() {
            *found = Some(f);
        }
        return;
    }
    for child in expr_children(expr) {
        find_function_in_expr(child, name, found);
    }
}

/// Find a var declaration by name, anywhere in the function.
pub fn find_var<'a>(function: &'a FunctionNode, name: &str) -> &'a VarNode {
    let mut found: Option<&VarNode> = None;
    walk_stmts(function, &mut |stmt| {
        if let Stmt::Var(v) = stmt {
            if v.name.name == name && found.is_none() {
                found = Some(v);
            }
        }
    });
    found.unwrap_or_else(|| panic!("no var named {name}"))
}

/// The symbol of an identifier must resolve; convenience for assertions.
pub fn symbol_of<'a>(symbols: &'a SymbolTable, expr: &Expr) -> &'a kestrel_ir::Symbol {
    match expr {
        Expr::Ident(i) => symbols.symbol(i.symbol.expect("unresolved identifier")),
        other => panic!("not an identifier: {other:?}"),
    }
}

/// Id of the program function.
pub fn program_id() -> FnId {
    FnId::from_raw(0)
}
