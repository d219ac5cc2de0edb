//! Node weighing for the splitter.
//!
//! Costs approximate emitted code size per node kind. Nested functions are
//! weighed flat; the splitter recurses into them separately.

use kestrel_ir::node::{BinaryOp, Block, Expr, ForInit, Stmt};

pub const FUNCTION_WEIGHT: u32 = 40;
pub const CALL_WEIGHT: u32 = 10;
pub const LITERAL_WEIGHT: u32 = 10;
pub const ACCESS_WEIGHT: u32 = 4;
pub const LOOP_WEIGHT: u32 = 4;
pub const OBJECT_WEIGHT: u32 = 16;
pub const SPLIT_WEIGHT: u32 = 40;
pub const VAR_WEIGHT: u32 = 40;
pub const ADD_WEIGHT: u32 = 10;
pub const COMPARE_WEIGHT: u32 = 6;
pub const IF_WEIGHT: u32 = 2;
pub const THROW_WEIGHT: u32 = 2;
pub const CATCH_WEIGHT: u32 = 10;
pub const BREAK_WEIGHT: u32 = 1;
pub const CONTINUE_WEIGHT: u32 = 1;
pub const RETURN_WEIGHT: u32 = 2;
pub const SWITCH_WEIGHT: u32 = 8;
pub const OPERATOR_WEIGHT: u32 = 1;

pub fn weigh_block(block: &Block) -> u32 {
    block.statements.iter().map(weigh_stmt).sum()
}

pub fn weigh_stmt(stmt: &Stmt) -> u32 {
    match stmt {
        Stmt::Block(b) => weigh_block(b),
        Stmt::Var(v) => VAR_WEIGHT + v.init.as_ref().map_or(0, weigh_expr),
        Stmt::Expression(e) => weigh_expr(&e.expression),
        Stmt::Empty(_) | Stmt::Debugger(_) => 0,
        Stmt::If(i) => {
            IF_WEIGHT
                + weigh_expr(&i.test)
                + weigh_block(&i.pass)
                + i.fail.as_ref().map_or(0, weigh_block)
        }
        Stmt::Switch(s) => {
            SWITCH_WEIGHT
                + weigh_expr(&s.expression)
                + s.cases
                    .iter()
                    .map(|c| c.test.as_ref().map_or(0, weigh_expr) + weigh_block(&c.body))
                    .sum::<u32>()
        }
        Stmt::While(w) => LOOP_WEIGHT + weigh_expr(&w.test) + weigh_block(&w.body),
        Stmt::For(f) => {
            let init = match &f.init {
                Some(ForInit::Var(vars)) => vars
                    .iter()
                    .map(|v| VAR_WEIGHT + v.init.as_ref().map_or(0, weigh_expr))
                    .sum(),
                Some(ForInit::Expr(e)) => weigh_expr(e),
                None => 0,
            };
            LOOP_WEIGHT
                + init
                + f.test.as_ref().map_or(0, weigh_expr)
                + f.modify.as_ref().map_or(0, weigh_expr)
                + weigh_block(&f.body)
        }
        Stmt::Try(t) => {
            weigh_block(&t.body)
                + t.catches
                    .iter()
                    .map(|c| CATCH_WEIGHT + weigh_block(&c.body))
                    .sum::<u32>()
                + t.finally_body.as_ref().map_or(0, weigh_block)
                + t.inlined_finallies.iter().map(weigh_stmt).sum::<u32>()
        }
        Stmt::Throw(t) => THROW_WEIGHT + weigh_expr(&t.expression),
        Stmt::Return(r) => RETURN_WEIGHT + r.expression.as_ref().map_or(0, weigh_expr),
        Stmt::Break(_) => BREAK_WEIGHT,
        Stmt::Continue(_) => CONTINUE_WEIGHT,
        Stmt::Label(l) => weigh_block(&l.body),
        Stmt::JumpToInlinedFinally(_) => BREAK_WEIGHT,
        Stmt::Split(s) => SPLIT_WEIGHT + weigh_block(&s.body),
    }
}

pub fn weigh_expr(expr: &Expr) -> u32 {
    match expr {
        Expr::Ident(_) => ACCESS_WEIGHT,
        Expr::Literal(_) => LITERAL_WEIGHT,
        Expr::ArrayLiteral(a) => {
            LITERAL_WEIGHT
                + a.elements
                    .iter()
                    .map(|e| e.as_ref().map_or(1, weigh_expr))
                    .sum::<u32>()
        }
        Expr::ObjectLiteral(o) => {
            OBJECT_WEIGHT + o.properties.iter().map(|p| weigh_expr(&p.value)).sum::<u32>()
        }
        Expr::Unary(u) => OPERATOR_WEIGHT + weigh_expr(&u.operand),
        Expr::Binary(b) => {
            let op = match b.op {
                BinaryOp::Add | BinaryOp::AssignAdd => ADD_WEIGHT,
                op if op.is_comparison() => COMPARE_WEIGHT,
                _ => OPERATOR_WEIGHT,
            };
            op + weigh_expr(&b.lhs) + weigh_expr(&b.rhs)
        }
        Expr::Ternary(t) => {
            IF_WEIGHT + weigh_expr(&t.test) + weigh_expr(&t.consequent) + weigh_expr(&t.alternate)
        }
        Expr::Access(a) => ACCESS_WEIGHT + weigh_expr(&a.base),
        Expr::Index(i) => ACCESS_WEIGHT + weigh_expr(&i.base) + weigh_expr(&i.index),
        Expr::Call(c) => {
            CALL_WEIGHT + weigh_expr(&c.function) + c.args.iter().map(weigh_expr).sum::<u32>()
        }
        Expr::Function(_) => FUNCTION_WEIGHT,
        Expr::Runtime(r) => CALL_WEIGHT + r.args.iter().map(weigh_expr).sum::<u32>(),
        Expr::JoinPredecessor(j) => weigh_expr(&j.expression),
    }
}
