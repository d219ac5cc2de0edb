//! Visitor protocol and the by-value transform engine.
//!
//! Implement `Visitor` for a pass. Override `enter_*` to inspect a node
//! before its children (return `false` to keep the subtree untouched;
//! `leave_*` is then not called) and `leave_*` to rebuild or replace the
//! node on the way up. The `transform_*` functions drive traversal and own
//! the lexical-context push/pop discipline: frames are balanced on every
//! exit path, including errors, and flags accumulated on a frame are merged
//! into the rebuilt node when it is popped.
//!
//! Structural identifiers (declaration targets, function names, parameter
//! lists, access property names, object-literal keys) are not routed
//! through expression traversal.

use crate::error::IrResult;
use crate::lexical_context::LexicalContext;
use crate::node::{
    AccessNode, ArrayLiteralNode, BinaryNode, Block, BreakNode, CallNode, CaseNode, CatchNode,
    ContinueNode, DebuggerNode, EmptyNode, Expr, ExpressionStatement, ForInit, ForNode,
    FunctionNode, IdentNode, IfNode, IndexNode, JoinPredecessorExpr, JumpToInlinedFinallyNode,
    LabelNode, LiteralNode, ObjectNode, ReturnNode, RuntimeNode, SplitNode, Stmt, SwitchNode,
    TernaryNode, ThrowNode, TryNode, UnaryNode, VarNode, WhileNode,
};

macro_rules! enter_default {
    ($($name:ident($node:ty);)*) => {
        $(fn $name(&mut self, _lc: &mut LexicalContext, _node: &mut $node) -> IrResult<bool> {
            Ok(true)
        })*
    };
}

/// Pre-/post-order callbacks per node variant.
#[allow(unused_variables)]
pub trait Visitor: Sized {
    enter_default! {
        enter_ident(IdentNode);
        enter_literal(LiteralNode);
        enter_array_literal(ArrayLiteralNode);
        enter_object_literal(ObjectNode);
        enter_unary(UnaryNode);
        enter_binary(BinaryNode);
        enter_ternary(TernaryNode);
        enter_access(AccessNode);
        enter_index(IndexNode);
        enter_call(CallNode);
        enter_runtime(RuntimeNode);
        enter_join_predecessor(JoinPredecessorExpr);
        enter_function(FunctionNode);
        enter_block(Block);
        enter_var(VarNode);
        enter_expression_statement(ExpressionStatement);
        enter_empty(EmptyNode);
        enter_if(IfNode);
        enter_switch(SwitchNode);
        enter_case(CaseNode);
        enter_while(WhileNode);
        enter_for(ForNode);
        enter_try(TryNode);
        enter_catch(CatchNode);
        enter_throw(ThrowNode);
        enter_return(ReturnNode);
        enter_break(BreakNode);
        enter_continue(ContinueNode);
        enter_label(LabelNode);
        enter_jump_to_inlined_finally(JumpToInlinedFinallyNode);
        enter_debugger(DebuggerNode);
        enter_split(SplitNode);
    }

    fn leave_ident(&mut self, lc: &mut LexicalContext, node: IdentNode) -> IrResult<Expr> {
        Ok(Expr::Ident(node))
    }

    fn leave_literal(&mut self, lc: &mut LexicalContext, node: LiteralNode) -> IrResult<Expr> {
        Ok(Expr::Literal(node))
    }

    fn leave_array_literal(
        &mut self,
        lc: &mut LexicalContext,
        node: ArrayLiteralNode,
    ) -> IrResult<Expr> {
        Ok(Expr::ArrayLiteral(node))
    }

    fn leave_object_literal(&mut self, lc: &mut LexicalContext, node: ObjectNode) -> IrResult<Expr> {
        Ok(Expr::ObjectLiteral(node))
    }

    fn leave_unary(&mut self, lc: &mut LexicalContext, node: UnaryNode) -> IrResult<Expr> {
        Ok(Expr::Unary(Box::new(node)))
    }

    fn leave_binary(&mut self, lc: &mut LexicalContext, node: BinaryNode) -> IrResult<Expr> {
        Ok(Expr::Binary(Box::new(node)))
    }

    fn leave_ternary(&mut self, lc: &mut LexicalContext, node: TernaryNode) -> IrResult<Expr> {
        Ok(Expr::Ternary(Box::new(node)))
    }

    fn leave_access(&mut self, lc: &mut LexicalContext, node: AccessNode) -> IrResult<Expr> {
        Ok(Expr::Access(Box::new(node)))
    }

    fn leave_index(&mut self, lc: &mut LexicalContext, node: IndexNode) -> IrResult<Expr> {
        Ok(Expr::Index(Box::new(node)))
    }

    fn leave_call(&mut self, lc: &mut LexicalContext, node: CallNode) -> IrResult<Expr> {
        Ok(Expr::Call(Box::new(node)))
    }

    fn leave_runtime(&mut self, lc: &mut LexicalContext, node: RuntimeNode) -> IrResult<Expr> {
        Ok(Expr::Runtime(node))
    }

    fn leave_join_predecessor(
        &mut self,
        lc: &mut LexicalContext,
        node: JoinPredecessorExpr,
    ) -> IrResult<Expr> {
        Ok(Expr::JoinPredecessor(Box::new(node)))
    }

    fn leave_function(
        &mut self,
        lc: &mut LexicalContext,
        node: FunctionNode,
    ) -> IrResult<FunctionNode> {
        Ok(node)
    }

    fn leave_block(&mut self, lc: &mut LexicalContext, node: Block) -> IrResult<Block> {
        Ok(node)
    }

    fn leave_var(&mut self, lc: &mut LexicalContext, node: VarNode) -> IrResult<VarNode> {
        Ok(node)
    }

    fn leave_expression_statement(
        &mut self,
        lc: &mut LexicalContext,
        node: ExpressionStatement,
    ) -> IrResult<Stmt> {
        Ok(Stmt::Expression(node))
    }

    fn leave_empty(&mut self, lc: &mut LexicalContext, node: EmptyNode) -> IrResult<Stmt> {
        Ok(Stmt::Empty(node))
    }

    fn leave_if(&mut self, lc: &mut LexicalContext, node: IfNode) -> IrResult<Stmt> {
        Ok(Stmt::If(Box::new(node)))
    }

    fn leave_switch(&mut self, lc: &mut LexicalContext, node: SwitchNode) -> IrResult<Stmt> {
        Ok(Stmt::Switch(Box::new(node)))
    }

    fn leave_case(&mut self, lc: &mut LexicalContext, node: CaseNode) -> IrResult<CaseNode> {
        Ok(node)
    }

    fn leave_while(&mut self, lc: &mut LexicalContext, node: WhileNode) -> IrResult<Stmt> {
        Ok(Stmt::While(Box::new(node)))
    }

    fn leave_for(&mut self, lc: &mut LexicalContext, node: ForNode) -> IrResult<Stmt> {
        Ok(Stmt::For(Box::new(node)))
    }

    fn leave_try(&mut self, lc: &mut LexicalContext, node: TryNode) -> IrResult<Stmt> {
        Ok(Stmt::Try(Box::new(node)))
    }

    fn leave_catch(&mut self, lc: &mut LexicalContext, node: CatchNode) -> IrResult<CatchNode> {
        Ok(node)
    }

    fn leave_throw(&mut self, lc: &mut LexicalContext, node: ThrowNode) -> IrResult<Stmt> {
        Ok(Stmt::Throw(Box::new(node)))
    }

    fn leave_return(&mut self, lc: &mut LexicalContext, node: ReturnNode) -> IrResult<Stmt> {
        Ok(Stmt::Return(Box::new(node)))
    }

    fn leave_break(&mut self, lc: &mut LexicalContext, node: BreakNode) -> IrResult<Stmt> {
        Ok(Stmt::Break(node))
    }

    fn leave_continue(&mut self, lc: &mut LexicalContext, node: ContinueNode) -> IrResult<Stmt> {
        Ok(Stmt::Continue(node))
    }

    fn leave_label(&mut self, lc: &mut LexicalContext, node: LabelNode) -> IrResult<Stmt> {
        Ok(Stmt::Label(Box::new(node)))
    }

    fn leave_jump_to_inlined_finally(
        &mut self,
        lc: &mut LexicalContext,
        node: JumpToInlinedFinallyNode,
    ) -> IrResult<Stmt> {
        Ok(Stmt::JumpToInlinedFinally(node))
    }

    fn leave_debugger(&mut self, lc: &mut LexicalContext, node: DebuggerNode) -> IrResult<Stmt> {
        Ok(Stmt::Debugger(node))
    }

    fn leave_split(&mut self, lc: &mut LexicalContext, node: SplitNode) -> IrResult<Stmt> {
        Ok(Stmt::Split(Box::new(node)))
    }
}

/// Transform an expression bottom-up.
pub fn transform_expr<V: Visitor>(
    v: &mut V,
    lc: &mut LexicalContext,
    expr: Expr,
) -> IrResult<Expr> {
    match expr {
        Expr::Ident(mut n) => {
            if !v.enter_ident(lc, &mut n)? {
                return Ok(Expr::Ident(n));
            }
            v.leave_ident(lc, n)
        }
        Expr::Literal(mut n) => {
            if !v.enter_literal(lc, &mut n)? {
                return Ok(Expr::Literal(n));
            }
            v.leave_literal(lc, n)
        }
        Expr::ArrayLiteral(mut n) => {
            if !v.enter_array_literal(lc, &mut n)? {
                return Ok(Expr::ArrayLiteral(n));
            }
            let elements = std::mem::take(&mut n.elements);
            n.elements = elements
                .into_iter()
                .map(|e| e.map(|e| transform_expr(v, lc, e)).transpose())
                .collect::<IrResult<_>>()?;
            v.leave_array_literal(lc, n)
        }
        Expr::ObjectLiteral(mut n) => {
            if !v.enter_object_literal(lc, &mut n)? {
                return Ok(Expr::ObjectLiteral(n));
            }
            let properties = std::mem::take(&mut n.properties);
            n.properties = properties
                .into_iter()
                .map(|mut p| {
                    p.value = transform_expr(v, lc, p.value)?;
                    Ok(p)
                })
                .collect::<IrResult<_>>()?;
            v.leave_object_literal(lc, n)
        }
        Expr::Unary(n) => {
            let mut n = *n;
            if !v.enter_unary(lc, &mut n)? {
                return Ok(Expr::Unary(Box::new(n)));
            }
            let operand = n.operand;
            n.operand = transform_expr(v, lc, operand)?;
            v.leave_unary(lc, n)
        }
        Expr::Binary(n) => {
            let mut n = *n;
            if !v.enter_binary(lc, &mut n)? {
                return Ok(Expr::Binary(Box::new(n)));
            }
            let lhs = n.lhs;
            n.lhs = transform_expr(v, lc, lhs)?;
            let rhs = n.rhs;
            n.rhs = transform_expr(v, lc, rhs)?;
            v.leave_binary(lc, n)
        }
        Expr::Ternary(n) => {
            let mut n = *n;
            if !v.enter_ternary(lc, &mut n)? {
                return Ok(Expr::Ternary(Box::new(n)));
            }
            let test = n.test;
            n.test = transform_expr(v, lc, test)?;
            let consequent = n.consequent;
            n.consequent = transform_expr(v, lc, consequent)?;
            let alternate = n.alternate;
            n.alternate = transform_expr(v, lc, alternate)?;
            v.leave_ternary(lc, n)
        }
        Expr::Access(n) => {
            let mut n = *n;
            if !v.enter_access(lc, &mut n)? {
                return Ok(Expr::Access(Box::new(n)));
            }
            let base = n.base;
            n.base = transform_expr(v, lc, base)?;
            v.leave_access(lc, n)
        }
        Expr::Index(n) => {
            let mut n = *n;
            if !v.enter_index(lc, &mut n)? {
                return Ok(Expr::Index(Box::new(n)));
            }
            let base = n.base;
            n.base = transform_expr(v, lc, base)?;
            let index = n.index;
            n.index = transform_expr(v, lc, index)?;
            v.leave_index(lc, n)
        }
        Expr::Call(n) => {
            let mut n = *n;
            if !v.enter_call(lc, &mut n)? {
                return Ok(Expr::Call(Box::new(n)));
            }
            let function = n.function;
            n.function = transform_expr(v, lc, function)?;
            let args = std::mem::take(&mut n.args);
            n.args = args
                .into_iter()
                .map(|a| transform_expr(v, lc, a))
                .collect::<IrResult<_>>()?;
            v.leave_call(lc, n)
        }
        Expr::Runtime(mut n) => {
            if !v.enter_runtime(lc, &mut n)? {
                return Ok(Expr::Runtime(n));
            }
            let args = std::mem::take(&mut n.args);
            n.args = args
                .into_iter()
                .map(|a| transform_expr(v, lc, a))
                .collect::<IrResult<_>>()?;
            v.leave_runtime(lc, n)
        }
        Expr::Function(n) => {
            let f = transform_function(v, lc, *n)?;
            Ok(Expr::Function(Box::new(f)))
        }
        Expr::JoinPredecessor(n) => {
            let mut n = *n;
            if !v.enter_join_predecessor(lc, &mut n)? {
                return Ok(Expr::JoinPredecessor(Box::new(n)));
            }
            let expression = n.expression;
            n.expression = transform_expr(v, lc, expression)?;
            v.leave_join_predecessor(lc, n)
        }
    }
}

/// Transform a function: pushes its frame, transforms the body, merges
/// accumulated frame flags back into the node.
pub fn transform_function<V: Visitor>(
    v: &mut V,
    lc: &mut LexicalContext,
    f: FunctionNode,
) -> IrResult<FunctionNode> {
    let id = f.id;
    lc.push_function(&f);
    let result = function_in_context(v, lc, f);
    let frame = lc.pop_function(id);
    let mut f = result?;
    f.flags |= frame.flags;
    Ok(f)
}

fn function_in_context<V: Visitor>(
    v: &mut V,
    lc: &mut LexicalContext,
    mut f: FunctionNode,
) -> IrResult<FunctionNode> {
    if !v.enter_function(lc, &mut f)? {
        return Ok(f);
    }
    let body = std::mem::replace(&mut f.body, Block::placeholder());
    f.body = transform_block(v, lc, body)?;
    v.leave_function(lc, f)
}

/// Transform a block: pushes its frame, transforms the statements, merges
/// accumulated frame flags back into the node.
pub fn transform_block<V: Visitor>(
    v: &mut V,
    lc: &mut LexicalContext,
    block: Block,
) -> IrResult<Block> {
    let id = block.id;
    lc.push_block(&block);
    let result = block_in_context(v, lc, block);
    let frame = lc.pop_block(id);
    let mut block = result?;
    block.flags |= frame.flags;
    Ok(block)
}

fn block_in_context<V: Visitor>(
    v: &mut V,
    lc: &mut LexicalContext,
    mut block: Block,
) -> IrResult<Block> {
    if !v.enter_block(lc, &mut block)? {
        return Ok(block);
    }
    let statements = std::mem::take(&mut block.statements);
    let mut out = Vec::with_capacity(statements.len());
    for stmt in statements {
        out.push(transform_stmt(v, lc, stmt)?);
    }
    block.statements = out;
    v.leave_block(lc, block)
}

fn transform_var<V: Visitor>(v: &mut V, lc: &mut LexicalContext, mut n: VarNode) -> IrResult<VarNode> {
    if !v.enter_var(lc, &mut n)? {
        return Ok(n);
    }
    if let Some(init) = n.init.take() {
        n.init = Some(transform_expr(v, lc, init)?);
    }
    v.leave_var(lc, n)
}

/// Transform a statement bottom-up.
pub fn transform_stmt<V: Visitor>(v: &mut V, lc: &mut LexicalContext, stmt: Stmt) -> IrResult<Stmt> {
    match stmt {
        Stmt::Block(b) => Ok(Stmt::Block(Box::new(transform_block(v, lc, *b)?))),
        Stmt::Var(n) => Ok(Stmt::Var(Box::new(transform_var(v, lc, *n)?))),
        Stmt::Expression(mut n) => {
            if !v.enter_expression_statement(lc, &mut n)? {
                return Ok(Stmt::Expression(n));
            }
            let expression = n.expression;
            n.expression = transform_expr(v, lc, expression)?;
            v.leave_expression_statement(lc, n)
        }
        Stmt::Empty(mut n) => {
            if !v.enter_empty(lc, &mut n)? {
                return Ok(Stmt::Empty(n));
            }
            v.leave_empty(lc, n)
        }
        Stmt::If(n) => {
            let mut n = *n;
            if !v.enter_if(lc, &mut n)? {
                return Ok(Stmt::If(Box::new(n)));
            }
            let test = n.test;
            n.test = transform_expr(v, lc, test)?;
            let pass = std::mem::replace(&mut n.pass, Block::placeholder());
            n.pass = transform_block(v, lc, pass)?;
            if let Some(fail) = n.fail.take() {
                n.fail = Some(transform_block(v, lc, fail)?);
            }
            v.leave_if(lc, n)
        }
        Stmt::Switch(n) => {
            let mut n = *n;
            if !v.enter_switch(lc, &mut n)? {
                return Ok(Stmt::Switch(Box::new(n)));
            }
            let expression = n.expression;
            n.expression = transform_expr(v, lc, expression)?;
            let cases = std::mem::take(&mut n.cases);
            let mut out = Vec::with_capacity(cases.len());
            for mut case in cases {
                if !v.enter_case(lc, &mut case)? {
                    out.push(case);
                    continue;
                }
                if let Some(test) = case.test.take() {
                    case.test = Some(transform_expr(v, lc, test)?);
                }
                let body = std::mem::replace(&mut case.body, Block::placeholder());
                case.body = transform_block(v, lc, body)?;
                out.push(v.leave_case(lc, case)?);
            }
            n.cases = out;
            v.leave_switch(lc, n)
        }
        Stmt::While(n) => {
            let mut n = *n;
            if !v.enter_while(lc, &mut n)? {
                return Ok(Stmt::While(Box::new(n)));
            }
            let test = n.test;
            n.test = transform_expr(v, lc, test)?;
            let body = std::mem::replace(&mut n.body, Block::placeholder());
            n.body = transform_block(v, lc, body)?;
            v.leave_while(lc, n)
        }
        Stmt::For(n) => {
            let mut n = *n;
            if !v.enter_for(lc, &mut n)? {
                return Ok(Stmt::For(Box::new(n)));
            }
            n.init = match n.init.take() {
                Some(ForInit::Var(vars)) => Some(ForInit::Var(
                    vars.into_iter()
                        .map(|var| transform_var(v, lc, var))
                        .collect::<IrResult<_>>()?,
                )),
                Some(ForInit::Expr(e)) => Some(ForInit::Expr(transform_expr(v, lc, e)?)),
                None => None,
            };
            if let Some(test) = n.test.take() {
                n.test = Some(transform_expr(v, lc, test)?);
            }
            if let Some(modify) = n.modify.take() {
                n.modify = Some(transform_expr(v, lc, modify)?);
            }
            let body = std::mem::replace(&mut n.body, Block::placeholder());
            n.body = transform_block(v, lc, body)?;
            v.leave_for(lc, n)
        }
        Stmt::Try(n) => {
            let mut n = *n;
            if !v.enter_try(lc, &mut n)? {
                return Ok(Stmt::Try(Box::new(n)));
            }
            let body = std::mem::replace(&mut n.body, Block::placeholder());
            n.body = transform_block(v, lc, body)?;
            let catches = std::mem::take(&mut n.catches);
            let mut out = Vec::with_capacity(catches.len());
            for mut catch in catches {
                if !v.enter_catch(lc, &mut catch)? {
                    out.push(catch);
                    continue;
                }
                if let Some(condition) = catch.condition.take() {
                    catch.condition = Some(transform_expr(v, lc, condition)?);
                }
                let body = std::mem::replace(&mut catch.body, Block::placeholder());
                catch.body = transform_block(v, lc, body)?;
                out.push(v.leave_catch(lc, catch)?);
            }
            n.catches = out;
            if let Some(finally_body) = n.finally_body.take() {
                n.finally_body = Some(transform_block(v, lc, finally_body)?);
            }
            let inlined = std::mem::take(&mut n.inlined_finallies);
            n.inlined_finallies = inlined
                .into_iter()
                .map(|s| transform_stmt(v, lc, s))
                .collect::<IrResult<_>>()?;
            v.leave_try(lc, n)
        }
        Stmt::Throw(n) => {
            let mut n = *n;
            if !v.enter_throw(lc, &mut n)? {
                return Ok(Stmt::Throw(Box::new(n)));
            }
            let expression = n.expression;
            n.expression = transform_expr(v, lc, expression)?;
            v.leave_throw(lc, n)
        }
        Stmt::Return(n) => {
            let mut n = *n;
            if !v.enter_return(lc, &mut n)? {
                return Ok(Stmt::Return(Box::new(n)));
            }
            if let Some(e) = n.expression.take() {
                n.expression = Some(transform_expr(v, lc, e)?);
            }
            v.leave_return(lc, n)
        }
        Stmt::Break(mut n) => {
            if !v.enter_break(lc, &mut n)? {
                return Ok(Stmt::Break(n));
            }
            v.leave_break(lc, n)
        }
        Stmt::Continue(mut n) => {
            if !v.enter_continue(lc, &mut n)? {
                return Ok(Stmt::Continue(n));
            }
            v.leave_continue(lc, n)
        }
        Stmt::Label(n) => {
            let mut n = *n;
            if !v.enter_label(lc, &mut n)? {
                return Ok(Stmt::Label(Box::new(n)));
            }
            let body = std::mem::replace(&mut n.body, Block::placeholder());
            n.body = transform_block(v, lc, body)?;
            v.leave_label(lc, n)
        }
        Stmt::JumpToInlinedFinally(mut n) => {
            if !v.enter_jump_to_inlined_finally(lc, &mut n)? {
                return Ok(Stmt::JumpToInlinedFinally(n));
            }
            v.leave_jump_to_inlined_finally(lc, n)
        }
        Stmt::Debugger(mut n) => {
            if !v.enter_debugger(lc, &mut n)? {
                return Ok(Stmt::Debugger(n));
            }
            v.leave_debugger(lc, n)
        }
        Stmt::Split(n) => {
            let mut n = *n;
            if !v.enter_split(lc, &mut n)? {
                return Ok(Stmt::Split(Box::new(n)));
            }
            let body = std::mem::replace(&mut n.body, Block::placeholder());
            n.body = transform_block(v, lc, body)?;
            v.leave_split(lc, n)
        }
    }
}

/// Block-aware statement discipline: drop statements after the first one
/// that terminates control flow, preserving the hoisting effect of dead
/// `var` declarations (with initializers removed).
pub fn prune_dead_statements(statements: Vec<Stmt>) -> Vec<Stmt> {
    let mut out = Vec::with_capacity(statements.len());
    let mut dead = false;
    for stmt in statements {
        if dead {
            extract_var_declarations(&stmt, &mut out);
        } else {
            dead = stmt.terminates_flow();
            out.push(stmt);
        }
    }
    out
}

/// Collect uninitialized copies of every `var` declaration in a statement,
/// without descending into nested functions. Block-scoped declarations die
/// with their block and are not extracted.
pub fn extract_var_declarations(stmt: &Stmt, out: &mut Vec<Stmt>) {
    match stmt {
        Stmt::Var(v) if v.kind == crate::node::DeclKind::Var => {
            out.push(Stmt::Var(Box::new(v.without_init())));
        }
        Stmt::Var(_) => {}
        Stmt::Block(b) => {
            for s in &b.statements {
                extract_var_declarations(s, out);
            }
        }
        Stmt::If(i) => {
            for s in &i.pass.statements {
                extract_var_declarations(s, out);
            }
            if let Some(fail) = &i.fail {
                for s in &fail.statements {
                    extract_var_declarations(s, out);
                }
            }
        }
        Stmt::While(w) => {
            for s in &w.body.statements {
                extract_var_declarations(s, out);
            }
        }
        Stmt::For(f) => {
            if let Some(ForInit::Var(vars)) = &f.init {
                for v in vars {
                    out.push(Stmt::Var(Box::new(v.without_init())));
                }
            }
            for s in &f.body.statements {
                extract_var_declarations(s, out);
            }
        }
        Stmt::Try(t) => {
            for s in &t.body.statements {
                extract_var_declarations(s, out);
            }
            for c in &t.catches {
                for s in &c.body.statements {
                    extract_var_declarations(s, out);
                }
            }
            if let Some(f) = &t.finally_body {
                for s in &f.statements {
                    extract_var_declarations(s, out);
                }
            }
            for s in &t.inlined_finallies {
                extract_var_declarations(s, out);
            }
        }
        Stmt::Switch(s) => {
            for case in &s.cases {
                for st in &case.body.statements {
                    extract_var_declarations(st, out);
                }
            }
        }
        Stmt::Label(l) => {
            for s in &l.body.statements {
                extract_var_declarations(s, out);
            }
        }
        Stmt::Split(s) => {
            for st in &s.body.statements {
                extract_var_declarations(st, out);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{BlockId, DeclKind, LiteralValue};
    use crate::token::Token;

    fn var(name: &str, init: Option<Expr>) -> Stmt {
        Stmt::Var(Box::new(VarNode {
            token: Token::synthetic(),
            finish: 0,
            kind: DeclKind::Var,
            name: IdentNode::synthetic(name),
            init,
            is_function_declaration: false,
        }))
    }

    fn int(v: i32) -> Expr {
        Expr::Literal(LiteralNode::synthetic(LiteralValue::Int(v)))
    }

    #[test]
    fn prune_keeps_dead_vars_without_initializers() {
        let statements = vec![
            Stmt::Return(Box::new(ReturnNode {
                token: Token::synthetic(),
                finish: 0,
                expression: None,
            })),
            var("a", Some(int(1))),
            Stmt::Expression(ExpressionStatement {
                token: Token::synthetic(),
                finish: 0,
                expression: int(2),
            }),
        ];
        let pruned = prune_dead_statements(statements);
        assert_eq!(pruned.len(), 2);
        assert!(matches!(&pruned[0], Stmt::Return(_)));
        match &pruned[1] {
            Stmt::Var(v) => {
                assert_eq!(v.name.name, "a");
                assert!(v.init.is_none());
            }
            other => panic!("expected var, got {other:?}"),
        }
    }

    struct CountingVisitor {
        idents: usize,
    }

    impl Visitor for CountingVisitor {
        fn leave_ident(&mut self, _lc: &mut LexicalContext, node: IdentNode) -> IrResult<Expr> {
            self.idents += 1;
            Ok(Expr::Ident(node))
        }
    }

    #[test]
    fn engine_balances_context_and_reaches_leaves() {
        let body = Block::new(
            BlockId::from_raw(0),
            Token::synthetic(),
            0,
            vec![Stmt::Expression(ExpressionStatement {
                token: Token::synthetic(),
                finish: 0,
                expression: Expr::Binary(Box::new(BinaryNode {
                    token: Token::synthetic(),
                    finish: 0,
                    op: crate::node::BinaryOp::Add,
                    lhs: Expr::Ident(IdentNode::synthetic("a")),
                    rhs: Expr::Ident(IdentNode::synthetic("b")),
                    program_point: None,
                    opt_type: None,
                })),
            })],
        );
        let mut lc = LexicalContext::new();
        let mut v = CountingVisitor { idents: 0 };
        let block = transform_block(&mut v, &mut lc, body).unwrap();
        assert!(lc.is_empty());
        assert_eq!(v.idents, 2);
        assert_eq!(block.statements.len(), 1);
    }
}
