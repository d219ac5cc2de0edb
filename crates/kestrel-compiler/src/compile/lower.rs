//! Lowering pass: rewrites high-level constructs to primitive ones.
//!
//! - program-level expression values are captured into `:return`
//! - constant-string indexing becomes property access
//! - `in`/`instanceof`/`debugger` become runtime calls
//! - `while (true)` becomes a testless `for`; loop tests become join
//!   predecessors; loop bodies with escaping jumps are marked
//! - switches that are not unique-integer get a scope-restricting block
//! - `try`/`finally` is dissolved: the finally body is spliced onto every
//!   exit edge of the try and the construct is left with a synthetic
//!   catch-all that rethrows
//!
//! Runs as the block-aware visitor: on every block exit, statements behind
//! the first terminal statement are dropped, except that dead `var`
//! declarations survive without their initializers.

use kestrel_ir::consts;
use kestrel_ir::error::IrResult;
use kestrel_ir::node::{
    BinaryNode, BinaryOp, Block, BlockFlags, BreakNode, CaseNode, CatchNode, ContinueNode,
    DebuggerNode, Expr, ExpressionStatement, ForInit, ForKind, ForNode, FunctionFlags,
    FunctionNode, IdAllocator, IdentNode, IndexNode, JoinPredecessorExpr,
    JumpToInlinedFinallyNode, LabelNode, LiteralNode, LiteralValue, ReturnNode, RuntimeNode,
    RuntimeOp, Stmt, SwitchNode, ThrowNode, TryNode, UnaryNode, UnaryOp, WhileNode,
};
use kestrel_ir::visitor::{self, Visitor};
use kestrel_ir::{LexicalContext, Token};

/// Lower a function and everything nested in it.
pub fn apply(ids: &mut IdAllocator, function: FunctionNode) -> IrResult<FunctionNode> {
    let mut lower = Lower {
        ids,
        next_finally_label: 0,
        next_exception: 0,
    };
    let mut lc = LexicalContext::new();
    visitor::transform_function(&mut lower, &mut lc, function)
}

struct Lower<'a> {
    ids: &'a mut IdAllocator,
    next_finally_label: u32,
    next_exception: u32,
}

impl Visitor for Lower<'_> {
    fn leave_block(&mut self, _lc: &mut LexicalContext, mut block: Block) -> IrResult<Block> {
        block.statements = visitor::prune_dead_statements(std::mem::take(&mut block.statements));
        Ok(block)
    }

    fn leave_expression_statement(
        &mut self,
        lc: &mut LexicalContext,
        mut node: ExpressionStatement,
    ) -> IrResult<Stmt> {
        let in_program = lc
            .current_function()
            .flags
            .contains(FunctionFlags::IS_PROGRAM);
        if in_program && !node.expression.is_internal_ident() && !is_return_assignment(&node.expression)
        {
            let token = node.expression.token();
            let finish = node.expression.finish();
            node.expression = Expr::Binary(Box::new(BinaryNode {
                token,
                finish,
                op: BinaryOp::Assign,
                lhs: Expr::Ident(IdentNode::synthetic(consts::RETURN)),
                rhs: node.expression,
                program_point: None,
                opt_type: None,
            }));
        }
        Ok(Stmt::Expression(node))
    }

    fn leave_index(&mut self, _lc: &mut LexicalContext, node: IndexNode) -> IrResult<Expr> {
        let property = match node.index.as_literal().map(|l| &l.value) {
            Some(LiteralValue::Str(s)) if is_identifier_name(s) => Some(s.clone()),
            _ => None,
        };
        if let Some(property) = property {
            return Ok(Expr::Access(Box::new(kestrel_ir::node::AccessNode {
                token: node.token,
                finish: node.finish,
                base: node.base,
                property,
                program_point: None,
                opt_type: None,
            })));
        }
        Ok(Expr::Index(Box::new(node)))
    }

    fn leave_unary(&mut self, _lc: &mut LexicalContext, node: UnaryNode) -> IrResult<Expr> {
        // delete of anything but a property or variable reference only
        // evaluates its operand and yields true.
        if node.op == UnaryOp::Delete && !node.operand.is_base_node() {
            return Ok(Expr::Binary(Box::new(BinaryNode {
                token: node.token,
                finish: node.finish,
                op: BinaryOp::Comma,
                lhs: node.operand,
                rhs: Expr::Literal(LiteralNode::synthetic(LiteralValue::Boolean(true))),
                program_point: None,
                opt_type: None,
            })));
        }
        Ok(Expr::Unary(Box::new(node)))
    }

    fn leave_binary(&mut self, _lc: &mut LexicalContext, node: BinaryNode) -> IrResult<Expr> {
        let op = match node.op {
            BinaryOp::In => RuntimeOp::In,
            BinaryOp::Instanceof => RuntimeOp::Instanceof,
            _ => return Ok(Expr::Binary(Box::new(node))),
        };
        Ok(Expr::Runtime(RuntimeNode {
            token: node.token,
            finish: node.finish,
            op,
            args: vec![node.lhs, node.rhs],
        }))
    }

    fn leave_debugger(&mut self, _lc: &mut LexicalContext, node: DebuggerNode) -> IrResult<Stmt> {
        Ok(Stmt::Expression(ExpressionStatement {
            token: node.token,
            finish: node.finish,
            expression: Expr::Runtime(RuntimeNode {
                token: node.token,
                finish: node.finish,
                op: RuntimeOp::Debugger,
                args: Vec::new(),
            }),
        }))
    }

    fn leave_while(&mut self, _lc: &mut LexicalContext, mut node: WhileNode) -> IrResult<Stmt> {
        if control_flow_escapes(&node.body) {
            node.body.flags |= BlockFlags::CONTROL_FLOW_ESCAPES;
        }
        if is_always_true(&node.test) {
            return Ok(Stmt::For(Box::new(ForNode {
                token: node.token,
                finish: node.finish,
                kind: ForKind::For,
                init: None,
                test: None,
                modify: None,
                body: node.body,
            })));
        }
        let test = node.test;
        node.test = join_predecessor(test);
        Ok(Stmt::While(Box::new(node)))
    }

    fn leave_for(&mut self, _lc: &mut LexicalContext, mut node: ForNode) -> IrResult<Stmt> {
        if control_flow_escapes(&node.body) {
            node.body.flags |= BlockFlags::CONTROL_FLOW_ESCAPES;
        }
        if node.test.as_ref().is_some_and(is_always_true) {
            node.test = None;
        }
        node.test = node.test.take().map(join_predecessor);
        Ok(Stmt::For(Box::new(node)))
    }

    fn leave_switch(&mut self, _lc: &mut LexicalContext, mut node: SwitchNode) -> IrResult<Stmt> {
        for case in &mut node.cases {
            narrow_case_test(case);
        }
        node.unique_integer = all_unique_integers(&node);
        if node.unique_integer {
            return Ok(Stmt::Switch(Box::new(node)));
        }
        // The hoisted tag symbol must not leak into the surrounding block.
        let id = self.ids.block_id();
        Ok(Stmt::Block(Box::new(Block::synthetic(
            id,
            vec![Stmt::Switch(Box::new(node))],
        ))))
    }

    fn leave_try(&mut self, _lc: &mut LexicalContext, node: TryNode) -> IrResult<Stmt> {
        self.lower_try(node)
    }
}

impl Lower<'_> {
    fn fresh_finally_label(&mut self) -> String {
        let label = format!("{}-{}", consts::FINALLY_LABEL_PREFIX, self.next_finally_label);
        self.next_finally_label += 1;
        label
    }

    fn fresh_exception_name(&mut self) -> String {
        let name = format!("{}{}", consts::EXCEPTION_PREFIX, self.next_exception);
        self.next_exception += 1;
        name
    }

    /// Dissolve `finally`: inline a clone of the finally body into every
    /// exit edge of the try, leaving a try with a synthetic catch-all.
    fn lower_try(&mut self, mut node: TryNode) -> IrResult<Stmt> {
        let finally = match node.finally_body.take() {
            Some(f) if !f.statements.is_empty() => f,
            _ => {
                // No finally work: a try without catches dissolves into its
                // body.
                if node.catches.is_empty() {
                    return Ok(Stmt::Block(Box::new(node.body)));
                }
                return Ok(Stmt::Try(Box::new(node)));
            }
        };

        // Unreachable statements in the finally body would be cloned over
        // and over; cut it at its first terminal statement.
        let mut template = finally;
        template.statements =
            visitor::prune_dead_statements(std::mem::take(&mut template.statements));
        let template_terminal = template.is_terminal();

        // Wrap existing catches in a nested try so the outer try has a
        // single catch-all that rethrows under a fresh name.
        let body = if node.catches.is_empty() {
            node.body
        } else {
            let inner = TryNode {
                token: node.token,
                finish: node.finish,
                body: node.body,
                catches: node.catches,
                finally_body: None,
                inlined_finallies: Vec::new(),
            };
            Block::synthetic(self.ids.block_id(), vec![Stmt::Try(Box::new(inner))])
        };

        // The catch-all runs its own finally clone before rethrowing. Only
        // this rethrow belongs to this try; synthetic rethrows of nested,
        // already-lowered tries are never touched again.
        let exception = self.fresh_exception_name();
        let rethrow_clone = self.clone_finally(&template);
        let rethrow = Stmt::Throw(Box::new(ThrowNode {
            token: Token::synthetic(),
            finish: 0,
            expression: Expr::Ident(IdentNode::synthetic(exception.clone())),
            is_synthetic_rethrow: true,
        }));
        let catch_all = CatchNode {
            token: node.token,
            finish: node.finish,
            exception: IdentNode::synthetic(exception),
            condition: None,
            body: Block::synthetic(
                self.ids.block_id(),
                vec![Stmt::Block(Box::new(rethrow_clone)), rethrow],
            ),
            is_synthetic_rethrow: true,
        };

        let mut outer = TryNode {
            token: node.token,
            finish: node.finish,
            body,
            catches: vec![catch_all],
            finally_body: None,
            inlined_finallies: Vec::new(),
        };

        // Splice the finally clone onto every other exit edge.
        let mut splice = SpliceCtx {
            template: &template,
            template_terminal,
            inlined: Vec::new(),
            loop_depth: 0,
            breakable_depth: 0,
            labels: Vec::new(),
        };
        outer.body = self.splice_block(outer.body, &mut splice);
        outer.inlined_finallies = splice.inlined;

        // Fall-through off the try body runs the finally as well.
        let fallthrough = self.clone_finally(&template);
        let id = self.ids.block_id();
        Ok(Stmt::Block(Box::new(Block::synthetic(
            id,
            vec![Stmt::Try(Box::new(outer)), Stmt::Block(Box::new(fallthrough))],
        ))))
    }

    /// A renamed deep copy of the finally template. Fresh block and
    /// function ids, and every label defined inside is renamed so two
    /// in-scope clones never collide.
    fn clone_finally(&mut self, template: &Block) -> Block {
        let mut clone = template.clone();
        let suffix = self.next_finally_label;
        self.next_finally_label += 1;

        let mut defined = Vec::new();
        collect_labels(&clone.statements, &mut defined);

        renumber_block(&mut clone, self.ids);
        if !defined.is_empty() {
            rename_labels(&mut clone.statements, &defined, suffix);
        }
        clone
    }

    fn splice_block(&mut self, mut block: Block, ctx: &mut SpliceCtx<'_>) -> Block {
        let statements = std::mem::take(&mut block.statements);
        block.statements = statements
            .into_iter()
            .map(|s| self.splice_stmt(s, ctx))
            .collect();
        block
    }

    /// Rewrite one statement of the region being spliced. Nested functions
    /// are never descended into; `JumpToInlinedFinally` is never modified.
    fn splice_stmt(&mut self, stmt: Stmt, ctx: &mut SpliceCtx<'_>) -> Stmt {
        match stmt {
            Stmt::Return(r) => self.splice_return(*r, ctx),
            Stmt::Break(b) => {
                if ctx.jump_is_local(b.label.as_deref(), true) {
                    Stmt::Break(b)
                } else {
                    self.jump_through_finally(Stmt::Break(b), ctx)
                }
            }
            Stmt::Continue(c) => {
                if ctx.jump_is_local(c.label.as_deref(), false) {
                    Stmt::Continue(c)
                } else {
                    self.jump_through_finally(Stmt::Continue(c), ctx)
                }
            }
            Stmt::JumpToInlinedFinally(j) => Stmt::JumpToInlinedFinally(j),
            Stmt::Block(mut b) => {
                *b = self.splice_block(*b, ctx);
                Stmt::Block(b)
            }
            Stmt::If(mut i) => {
                i.pass = self.splice_block(i.pass, ctx);
                i.fail = i.fail.take().map(|f| self.splice_block(f, ctx));
                Stmt::If(i)
            }
            Stmt::While(mut w) => {
                ctx.loop_depth += 1;
                ctx.breakable_depth += 1;
                w.body = self.splice_block(w.body, ctx);
                ctx.loop_depth -= 1;
                ctx.breakable_depth -= 1;
                Stmt::While(w)
            }
            Stmt::For(mut f) => {
                ctx.loop_depth += 1;
                ctx.breakable_depth += 1;
                f.body = self.splice_block(f.body, ctx);
                ctx.loop_depth -= 1;
                ctx.breakable_depth -= 1;
                Stmt::For(f)
            }
            Stmt::Switch(mut s) => {
                ctx.breakable_depth += 1;
                s.cases = s
                    .cases
                    .into_iter()
                    .map(|mut c| {
                        c.body = self.splice_block(c.body, ctx);
                        c
                    })
                    .collect();
                ctx.breakable_depth -= 1;
                Stmt::Switch(s)
            }
            Stmt::Try(mut t) => {
                t.body = self.splice_block(t.body, ctx);
                t.catches = t
                    .catches
                    .into_iter()
                    .map(|mut c| {
                        c.body = self.splice_block(c.body, ctx);
                        c
                    })
                    .collect();
                t.finally_body = t.finally_body.take().map(|f| self.splice_block(f, ctx));
                t.inlined_finallies = t
                    .inlined_finallies
                    .into_iter()
                    .map(|s| self.splice_stmt(s, ctx))
                    .collect();
                Stmt::Try(t)
            }
            Stmt::Label(mut l) => {
                ctx.labels.push(l.name.clone());
                l.body = self.splice_block(l.body, ctx);
                ctx.labels.pop();
                Stmt::Label(l)
            }
            Stmt::Split(mut s) => {
                s.body = self.splice_block(s.body, ctx);
                Stmt::Split(s)
            }
            other => other,
        }
    }

    fn splice_return(&mut self, node: ReturnNode, ctx: &mut SpliceCtx<'_>) -> Stmt {
        let ReturnNode {
            token,
            finish,
            expression,
        } = node;

        if ctx.template_terminal {
            // Control never comes back from the finally, so the return
            // degenerates to evaluating its operand and jumping.
            let jump = self.jump_through_finally_terminal(ctx);
            return match expression {
                None => jump,
                Some(expression) => {
                    let id = self.ids.block_id();
                    let eval_token = expression.token();
                    let eval_finish = expression.finish();
                    Stmt::Block(Box::new(Block::synthetic(
                        id,
                        vec![
                            Stmt::Expression(ExpressionStatement {
                                token: eval_token,
                                finish: eval_finish,
                                expression,
                            }),
                            jump,
                        ],
                    )))
                }
            };
        }

        let clone = self.clone_finally(ctx.template);
        let id = self.ids.block_id();
        match expression {
            Some(expression) if !is_trivial_return_operand(&expression) => {
                // The operand must be evaluated before the finally runs;
                // route the value through `:return`.
                let eval_token = expression.token();
                let eval_finish = expression.finish();
                let save = Stmt::Expression(ExpressionStatement {
                    token: eval_token,
                    finish: eval_finish,
                    expression: Expr::Binary(Box::new(BinaryNode {
                        token: eval_token,
                        finish: eval_finish,
                        op: BinaryOp::Assign,
                        lhs: Expr::Ident(IdentNode::synthetic(consts::RETURN)),
                        rhs: expression,
                        program_point: None,
                        opt_type: None,
                    })),
                });
                let reload = Stmt::Return(Box::new(ReturnNode {
                    token,
                    finish,
                    expression: Some(Expr::Ident(IdentNode::synthetic(consts::RETURN))),
                }));
                Stmt::Block(Box::new(Block::synthetic(
                    id,
                    vec![save, Stmt::Block(Box::new(clone)), reload],
                )))
            }
            expression => Stmt::Block(Box::new(Block::synthetic(
                id,
                vec![
                    Stmt::Block(Box::new(clone)),
                    Stmt::Return(Box::new(ReturnNode {
                        token,
                        finish,
                        expression,
                    })),
                ],
            ))),
        }
    }

    /// A jump statement routed through a labelled finally clone: the clone
    /// runs, then the original jump proceeds.
    fn jump_through_finally(&mut self, jump: Stmt, ctx: &mut SpliceCtx<'_>) -> Stmt {
        let label = self.fresh_finally_label();
        let clone = self.clone_finally(ctx.template);
        let body_id = self.ids.block_id();
        let body = Block::synthetic(body_id, vec![Stmt::Block(Box::new(clone)), jump]);
        ctx.inlined.push(Stmt::Label(Box::new(LabelNode {
            token: Token::synthetic(),
            finish: 0,
            name: label.clone(),
            body,
        })));
        Stmt::JumpToInlinedFinally(JumpToInlinedFinallyNode {
            token: Token::synthetic(),
            finish: 0,
            label,
        })
    }

    /// Jump into a terminal finally clone; control never continues past it.
    fn jump_through_finally_terminal(&mut self, ctx: &mut SpliceCtx<'_>) -> Stmt {
        let label = self.fresh_finally_label();
        let clone = self.clone_finally(ctx.template);
        let body_id = self.ids.block_id();
        let body = Block::synthetic(body_id, vec![Stmt::Block(Box::new(clone))]);
        ctx.inlined.push(Stmt::Label(Box::new(LabelNode {
            token: Token::synthetic(),
            finish: 0,
            name: label.clone(),
            body,
        })));
        Stmt::JumpToInlinedFinally(JumpToInlinedFinallyNode {
            token: Token::synthetic(),
            finish: 0,
            label,
        })
    }
}

struct SpliceCtx<'t> {
    template: &'t Block,
    template_terminal: bool,
    inlined: Vec<Stmt>,
    loop_depth: u32,
    breakable_depth: u32,
    labels: Vec<String>,
}

impl SpliceCtx<'_> {
    /// Whether a break/continue stays within the try being spliced.
    fn jump_is_local(&self, label: Option<&str>, is_break: bool) -> bool {
        match label {
            Some(name) => self.labels.iter().any(|l| l == name),
            None if is_break => self.breakable_depth > 0,
            None => self.loop_depth > 0,
        }
    }
}

fn is_return_assignment(expression: &Expr) -> bool {
    matches!(
        expression,
        Expr::Binary(b)
            if b.op == BinaryOp::Assign
                && matches!(&b.lhs, Expr::Ident(i) if i.name == consts::RETURN)
    )
}

fn is_identifier_name(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

fn is_always_true(test: &Expr) -> bool {
    test.as_literal().is_some_and(|l| l.value.to_boolean())
}

fn join_predecessor(test: Expr) -> Expr {
    match test {
        already @ Expr::JoinPredecessor(_) => already,
        test => Expr::JoinPredecessor(Box::new(JoinPredecessorExpr::wrap(test))),
    }
}

/// A return expression that can safely be evaluated after a non-terminal
/// finally clone.
fn is_trivial_return_operand(expression: &Expr) -> bool {
    match expression {
        Expr::Literal(_) => true,
        Expr::Ident(i) => i.name == consts::RETURN,
        _ => false,
    }
}

fn narrow_case_test(case: &mut CaseNode) {
    let Some(Expr::Literal(lit)) = &mut case.test else {
        return;
    };
    let narrowed = match &lit.value {
        LiteralValue::Long(v) => LiteralValue::narrowest_long(*v),
        LiteralValue::Number(n) => LiteralValue::narrowest_number(*n),
        _ => return,
    };
    if matches!(narrowed, LiteralValue::Int(_)) {
        lit.value = narrowed;
    }
}

fn all_unique_integers(node: &SwitchNode) -> bool {
    let mut seen = Vec::with_capacity(node.cases.len());
    for case in &node.cases {
        let Some(test) = &case.test else { continue };
        match test.as_literal().map(|l| &l.value) {
            Some(LiteralValue::Int(v)) if !seen.contains(v) => seen.push(*v),
            _ => return false,
        }
    }
    true
}

/// Whether a loop body contains a jump that leaves the loop: an unlabelled
/// break or continue targeting the loop itself, or a labelled jump whose
/// label is defined outside the body.
fn control_flow_escapes(body: &Block) -> bool {
    fn scan(stmts: &[Stmt], loops: u32, breakables: u32, labels: &mut Vec<String>) -> bool {
        stmts.iter().any(|stmt| match stmt {
            Stmt::Break(BreakNode { label, .. }) => match label {
                Some(name) => !labels.iter().any(|l| l == name),
                None => breakables == 0,
            },
            Stmt::Continue(ContinueNode { label, .. }) => match label {
                Some(name) => !labels.iter().any(|l| l == name),
                None => loops == 0,
            },
            Stmt::Block(b) => scan(&b.statements, loops, breakables, labels),
            Stmt::If(i) => {
                scan(&i.pass.statements, loops, breakables, labels)
                    || i.fail
                        .as_ref()
                        .is_some_and(|f| scan(&f.statements, loops, breakables, labels))
            }
            Stmt::While(w) => scan(&w.body.statements, loops + 1, breakables + 1, labels),
            Stmt::For(f) => scan(&f.body.statements, loops + 1, breakables + 1, labels),
            Stmt::Switch(s) => s
                .cases
                .iter()
                .any(|c| scan(&c.body.statements, loops, breakables + 1, labels)),
            Stmt::Try(t) => {
                scan(&t.body.statements, loops, breakables, labels)
                    || t.catches
                        .iter()
                        .any(|c| scan(&c.body.statements, loops, breakables, labels))
                    || t.finally_body
                        .as_ref()
                        .is_some_and(|f| scan(&f.statements, loops, breakables, labels))
                    || scan(&t.inlined_finallies, loops, breakables, labels)
            }
            Stmt::Label(l) => {
                labels.push(l.name.clone());
                let hit = scan(&l.body.statements, loops, breakables, labels);
                labels.pop();
                hit
            }
            Stmt::Split(s) => scan(&s.body.statements, loops, breakables, labels),
            _ => false,
        })
    }
    let mut labels = Vec::new();
    scan(&body.statements, 0, 0, &mut labels)
}

/// Give a cloned subtree fresh block and function ids.
fn renumber_block(block: &mut Block, ids: &mut IdAllocator) {
    block.id = ids.block_id();
    for stmt in &mut block.statements {
        renumber_stmt(stmt, ids);
    }
}

fn renumber_stmt(stmt: &mut Stmt, ids: &mut IdAllocator) {
    match stmt {
        Stmt::Block(b) => renumber_block(b, ids),
        Stmt::Var(v) => {
            if let Some(init) = &mut v.init {
                renumber_expr(init, ids);
            }
        }
        Stmt::Expression(e) => renumber_expr(&mut e.expression, ids),
        Stmt::If(i) => {
            renumber_expr(&mut i.test, ids);
            renumber_block(&mut i.pass, ids);
            if let Some(f) = &mut i.fail {
                renumber_block(f, ids);
            }
        }
        Stmt::Switch(s) => {
            renumber_expr(&mut s.expression, ids);
            for case in &mut s.cases {
                if let Some(t) = &mut case.test {
                    renumber_expr(t, ids);
                }
                renumber_block(&mut case.body, ids);
            }
        }
        Stmt::While(w) => {
            renumber_expr(&mut w.test, ids);
            renumber_block(&mut w.body, ids);
        }
        Stmt::For(f) => {
            match &mut f.init {
                Some(ForInit::Var(vars)) => {
                    for v in vars {
                        if let Some(init) = &mut v.init {
                            renumber_expr(init, ids);
                        }
                    }
                }
                Some(ForInit::Expr(e)) => renumber_expr(e, ids),
                None => {}
            }
            if let Some(t) = &mut f.test {
                renumber_expr(t, ids);
            }
            if let Some(m) = &mut f.modify {
                renumber_expr(m, ids);
            }
            renumber_block(&mut f.body, ids);
        }
        Stmt::Try(t) => {
            renumber_block(&mut t.body, ids);
            for c in &mut t.catches {
                if let Some(cond) = &mut c.condition {
                    renumber_expr(cond, ids);
                }
                renumber_block(&mut c.body, ids);
            }
            if let Some(f) = &mut t.finally_body {
                renumber_block(f, ids);
            }
            for s in &mut t.inlined_finallies {
                renumber_stmt(s, ids);
            }
        }
        Stmt::Throw(t) => renumber_expr(&mut t.expression, ids),
        Stmt::Return(r) => {
            if let Some(e) = &mut r.expression {
                renumber_expr(e, ids);
            }
        }
        Stmt::Label(l) => renumber_block(&mut l.body, ids),
        Stmt::Split(s) => renumber_block(&mut s.body, ids),
        _ => {}
    }
}

fn renumber_expr(expr: &mut Expr, ids: &mut IdAllocator) {
    match expr {
        Expr::Function(f) => {
            f.id = ids.function_id();
            renumber_block(&mut f.body, ids);
        }
        Expr::Unary(u) => renumber_expr(&mut u.operand, ids),
        Expr::Binary(b) => {
            renumber_expr(&mut b.lhs, ids);
            renumber_expr(&mut b.rhs, ids);
        }
        Expr::Ternary(t) => {
            renumber_expr(&mut t.test, ids);
            renumber_expr(&mut t.consequent, ids);
            renumber_expr(&mut t.alternate, ids);
        }
        Expr::Access(a) => renumber_expr(&mut a.base, ids),
        Expr::Index(i) => {
            renumber_expr(&mut i.base, ids);
            renumber_expr(&mut i.index, ids);
        }
        Expr::Call(c) => {
            renumber_expr(&mut c.function, ids);
            for a in &mut c.args {
                renumber_expr(a, ids);
            }
        }
        Expr::ArrayLiteral(a) => {
            for e in a.elements.iter_mut().flatten() {
                renumber_expr(e, ids);
            }
        }
        Expr::ObjectLiteral(o) => {
            for p in &mut o.properties {
                renumber_expr(&mut p.value, ids);
            }
        }
        Expr::Runtime(r) => {
            for a in &mut r.args {
                renumber_expr(a, ids);
            }
        }
        Expr::JoinPredecessor(j) => renumber_expr(&mut j.expression, ids),
        Expr::Ident(_) | Expr::Literal(_) => {}
    }
}

/// Labels defined inside a cloned finally body.
fn collect_labels(stmts: &[Stmt], out: &mut Vec<String>) {
    for stmt in stmts {
        match stmt {
            Stmt::Label(l) => {
                out.push(l.name.clone());
                collect_labels(&l.body.statements, out);
            }
            Stmt::Block(b) => collect_labels(&b.statements, out),
            Stmt::If(i) => {
                collect_labels(&i.pass.statements, out);
                if let Some(f) = &i.fail {
                    collect_labels(&f.statements, out);
                }
            }
            Stmt::While(w) => collect_labels(&w.body.statements, out),
            Stmt::For(f) => collect_labels(&f.body.statements, out),
            Stmt::Switch(s) => {
                for c in &s.cases {
                    collect_labels(&c.body.statements, out);
                }
            }
            Stmt::Try(t) => {
                collect_labels(&t.body.statements, out);
                for c in &t.catches {
                    collect_labels(&c.body.statements, out);
                }
                if let Some(f) = &t.finally_body {
                    collect_labels(&f.statements, out);
                }
                collect_labels(&t.inlined_finallies, out);
            }
            Stmt::Split(s) => collect_labels(&s.body.statements, out),
            _ => {}
        }
    }
}

/// Rename every occurrence of the given labels, definitions and jumps
/// alike, with a clone-unique suffix. Label names with a `:` cannot be
/// written in source, so renamed labels never collide with user labels.
fn rename_labels(stmts: &mut [Stmt], defined: &[String], suffix: u32) {
    let rename = |name: &mut String| {
        if defined.iter().any(|d| d == name.as_str()) {
            *name = format!("{name}:{suffix}");
        }
    };
    for stmt in stmts {
        match stmt {
            Stmt::Label(l) => {
                rename(&mut l.name);
                rename_labels(&mut l.body.statements, defined, suffix);
            }
            Stmt::Break(b) => {
                if let Some(name) = &mut b.label {
                    rename(name);
                }
            }
            Stmt::Continue(c) => {
                if let Some(name) = &mut c.label {
                    rename(name);
                }
            }
            Stmt::Block(b) => rename_labels(&mut b.statements, defined, suffix),
            Stmt::If(i) => {
                rename_labels(&mut i.pass.statements, defined, suffix);
                if let Some(f) = &mut i.fail {
                    rename_labels(&mut f.statements, defined, suffix);
                }
            }
            Stmt::While(w) => rename_labels(&mut w.body.statements, defined, suffix),
            Stmt::For(f) => rename_labels(&mut f.body.statements, defined, suffix),
            Stmt::Switch(s) => {
                for c in &mut s.cases {
                    rename_labels(&mut c.body.statements, defined, suffix);
                }
            }
            Stmt::Try(t) => {
                rename_labels(&mut t.body.statements, defined, suffix);
                for c in &mut t.catches {
                    rename_labels(&mut c.body.statements, defined, suffix);
                }
                if let Some(f) = &mut t.finally_body {
                    rename_labels(&mut f.statements, defined, suffix);
                }
                rename_labels(&mut t.inlined_finallies, defined, suffix);
            }
            Stmt::Split(s) => rename_labels(&mut s.body.statements, defined, suffix),
            _ => {}
        }
    }
}
