//! Constant folding pass.
//!
//! Evaluates unary, binary, ternary, if, and switch nodes over primitive
//! literal operands. Never fails: anything it cannot fold is left alone.
//! Dead branches surrender their `var` declarations (without initializers)
//! so hoisting semantics survive. Array and object literals never fold as
//! operands.

use kestrel_ir::error::IrResult;
use kestrel_ir::node::literal::{to_int32, to_uint32};
use kestrel_ir::node::{
    BinaryNode, BinaryOp, Block, Expr, FunctionNode, IdAllocator, IfNode, LiteralNode,
    LiteralValue, Stmt, SwitchNode, TernaryNode, UnaryNode, UnaryOp,
};
use kestrel_ir::visitor::{self, Visitor};
use kestrel_ir::LexicalContext;

/// Fold every constant subexpression of a function.
pub fn apply(ids: &mut IdAllocator, function: FunctionNode) -> IrResult<FunctionNode> {
    let mut folder = FoldConstants { ids };
    let mut lc = LexicalContext::new();
    visitor::transform_function(&mut folder, &mut lc, function)
}

struct FoldConstants<'a> {
    ids: &'a mut IdAllocator,
}

impl Visitor for FoldConstants<'_> {
    fn leave_unary(&mut self, _lc: &mut LexicalContext, node: UnaryNode) -> IrResult<Expr> {
        let folded = match node.operand.as_literal() {
            Some(lit) => fold_unary(node.op, &lit.value),
            None => None,
        };
        match folded {
            Some(value) => Ok(Expr::Literal(LiteralNode::new(node.token, node.finish, value))),
            None => Ok(Expr::Unary(Box::new(node))),
        }
    }

    fn leave_binary(&mut self, _lc: &mut LexicalContext, node: BinaryNode) -> IrResult<Expr> {
        let folded = match (node.lhs.as_literal(), node.rhs.as_literal()) {
            (Some(lhs), Some(rhs)) => fold_binary(node.op, &lhs.value, &rhs.value),
            _ => None,
        };
        match folded {
            Some(value) => Ok(Expr::Literal(LiteralNode::new(node.token, node.finish, value))),
            None => Ok(Expr::Binary(Box::new(node))),
        }
    }

    fn leave_ternary(&mut self, _lc: &mut LexicalContext, node: TernaryNode) -> IrResult<Expr> {
        let test = node.test.as_literal().map(|l| l.value.to_boolean());
        match test {
            Some(true) => Ok(node.consequent),
            Some(false) => Ok(node.alternate),
            None => Ok(Expr::Ternary(Box::new(node))),
        }
    }

    fn leave_if(&mut self, _lc: &mut LexicalContext, node: IfNode) -> IrResult<Stmt> {
        let test = node.test.as_literal().map(|l| l.value.to_boolean());
        let Some(truthy) = test else {
            return Ok(Stmt::If(Box::new(node)));
        };
        let (live, dead) = if truthy {
            (Some(node.pass), node.fail)
        } else {
            (node.fail, Some(node.pass))
        };

        let mut hoisted = Vec::new();
        if let Some(dead) = &dead {
            for stmt in &dead.statements {
                visitor::extract_var_declarations(stmt, &mut hoisted);
            }
        }

        Ok(match live {
            Some(mut block) => {
                if !hoisted.is_empty() {
                    hoisted.append(&mut block.statements);
                    block.statements = hoisted;
                }
                Stmt::Block(Box::new(block))
            }
            None if hoisted.is_empty() => Stmt::Empty(kestrel_ir::node::EmptyNode {
                token: node.token,
                finish: node.finish,
            }),
            None => Stmt::Block(Box::new(Block::synthetic(self.ids.block_id(), hoisted))),
        })
    }

    fn leave_switch(&mut self, _lc: &mut LexicalContext, mut node: SwitchNode) -> IrResult<Stmt> {
        node.unique_integer = is_unique_integer(&node);
        Ok(Stmt::Switch(Box::new(node)))
    }
}

/// All case tests are distinct integer literals.
fn is_unique_integer(node: &SwitchNode) -> bool {
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

fn fold_unary(op: UnaryOp, value: &LiteralValue) -> Option<LiteralValue> {
    match op {
        UnaryOp::Not => Some(LiteralValue::Boolean(!value.to_boolean())),
        UnaryOp::BitNot => Some(LiteralValue::Int(!to_int32(value.as_number()?))),
        UnaryOp::Neg => fold_negate(value),
        UnaryOp::Pos => match value {
            LiteralValue::Int(_) | LiteralValue::Long(_) | LiteralValue::Number(_) => {
                Some(value.clone())
            }
            LiteralValue::Boolean(b) => Some(LiteralValue::Int(i32::from(*b))),
            LiteralValue::Null => Some(LiteralValue::Int(0)),
            LiteralValue::Undefined => Some(LiteralValue::Number(f64::NAN)),
            LiteralValue::Str(_) => None,
        },
        // typeof and delete are never folded; inc/dec need a mutable target.
        _ => None,
    }
}

fn fold_negate(value: &LiteralValue) -> Option<LiteralValue> {
    if value.is_int_or_boolean() || value.is_long() {
        let v = value.as_long()?;
        // Zero skips the int path: int negation cannot represent -0.
        if v == 0 {
            return Some(LiteralValue::Number(-0.0));
        }
        return match v.checked_neg() {
            Some(n) => Some(LiteralValue::narrowest_long(n)),
            None => Some(LiteralValue::Number(-(v as f64))),
        };
    }
    match value {
        LiteralValue::Number(n) => Some(LiteralValue::Number(-n)),
        _ => None,
    }
}

fn fold_binary(op: BinaryOp, lhs: &LiteralValue, rhs: &LiteralValue) -> Option<LiteralValue> {
    match op {
        BinaryOp::Add => {
            if lhs.is_string() || rhs.is_string() {
                return Some(LiteralValue::Str(lhs.to_js_string() + &rhs.to_js_string()));
            }
            fold_arithmetic(op, lhs, rhs)
        }
        BinaryOp::Sub | BinaryOp::Mul => fold_arithmetic(op, lhs, rhs),
        BinaryOp::Div | BinaryOp::Mod => {
            let (a, b) = (lhs.as_number()?, rhs.as_number()?);
            let r = if op == BinaryOp::Div { a / b } else { a % b };
            Some(LiteralValue::narrowest_number(r))
        }
        BinaryOp::Shl => {
            let shift = to_uint32(rhs.as_number()?) & 31;
            Some(LiteralValue::Int(to_int32(lhs.as_number()?) << shift))
        }
        BinaryOp::Shr => {
            let shift = to_uint32(rhs.as_number()?) & 31;
            Some(LiteralValue::Int(to_int32(lhs.as_number()?) >> shift))
        }
        BinaryOp::Ushr => {
            let shift = to_uint32(rhs.as_number()?) & 31;
            let r = to_uint32(lhs.as_number()?) >> shift;
            Some(LiteralValue::narrowest_long(i64::from(r)))
        }
        BinaryOp::BitAnd => Some(LiteralValue::Int(
            to_int32(lhs.as_number()?) & to_int32(rhs.as_number()?),
        )),
        BinaryOp::BitOr => Some(LiteralValue::Int(
            to_int32(lhs.as_number()?) | to_int32(rhs.as_number()?),
        )),
        BinaryOp::BitXor => Some(LiteralValue::Int(
            to_int32(lhs.as_number()?) ^ to_int32(rhs.as_number()?),
        )),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            fold_relational(op, lhs, rhs)
        }
        BinaryOp::Eq | BinaryOp::Ne => {
            let eq = loose_equals(lhs, rhs)?;
            Some(LiteralValue::Boolean(if op == BinaryOp::Eq { eq } else { !eq }))
        }
        BinaryOp::StrictEq | BinaryOp::StrictNe => {
            let eq = strict_equals(lhs, rhs);
            Some(LiteralValue::Boolean(if op == BinaryOp::StrictEq {
                eq
            } else {
                !eq
            }))
        }
        _ => None,
    }
}

/// Int-preferred arithmetic: integral operands compute in 64 bits and
/// narrow; anything else computes as a double and narrows when the result
/// is exactly an int.
fn fold_arithmetic(op: BinaryOp, lhs: &LiteralValue, rhs: &LiteralValue) -> Option<LiteralValue> {
    if let (Some(a), Some(b)) = (lhs.as_long(), rhs.as_long()) {
        let exact = match op {
            BinaryOp::Add => a.checked_add(b),
            BinaryOp::Sub => a.checked_sub(b),
            BinaryOp::Mul => a.checked_mul(b),
            _ => None,
        };
        if let Some(v) = exact {
            return Some(LiteralValue::narrowest_long(v));
        }
    }
    let (a, b) = (lhs.as_number()?, rhs.as_number()?);
    let r = match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        _ => return None,
    };
    Some(LiteralValue::narrowest_number(r))
}

fn fold_relational(op: BinaryOp, lhs: &LiteralValue, rhs: &LiteralValue) -> Option<LiteralValue> {
    let ordering = if let (LiteralValue::Str(a), LiteralValue::Str(b)) = (lhs, rhs) {
        a.partial_cmp(b)
    } else {
        lhs.as_number()?.partial_cmp(&rhs.as_number()?)
    }?;
    let r = match op {
        BinaryOp::Lt => ordering.is_lt(),
        BinaryOp::Le => ordering.is_le(),
        BinaryOp::Gt => ordering.is_gt(),
        BinaryOp::Ge => ordering.is_ge(),
        _ => return None,
    };
    Some(LiteralValue::Boolean(r))
}

fn loose_equals(lhs: &LiteralValue, rhs: &LiteralValue) -> Option<bool> {
    use LiteralValue::{Null, Str, Undefined};
    match (lhs, rhs) {
        (Null | Undefined, Null | Undefined) => Some(true),
        (Null | Undefined, _) | (_, Null | Undefined) => Some(false),
        (Str(a), Str(b)) => Some(a == b),
        _ => Some(lhs.as_number()? == rhs.as_number()?),
    }
}

fn strict_equals(lhs: &LiteralValue, rhs: &LiteralValue) -> bool {
    use LiteralValue::{Boolean, Null, Str, Undefined};
    match (lhs, rhs) {
        (Null, Null) | (Undefined, Undefined) => true,
        (Str(a), Str(b)) => a == b,
        (Boolean(a), Boolean(b)) => a == b,
        _ => {
            if lhs.is_numeric() && rhs.is_numeric() {
                lhs.as_number() == rhs.as_number()
            } else {
                false
            }
        }
    }
}
