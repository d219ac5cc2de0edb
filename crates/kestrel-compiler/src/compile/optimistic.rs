//! Optimistic type assignment.
//!
//! Tags every program-pointed node with the narrowest type the feedback
//! store has not yet invalidated. Contexts that require a specific coercion
//! are marked never-optimistic before the typer descends into them: bases
//! of member access, assignment destinations, strict-equality operands,
//! call targets, condition positions, `!`/`new` operands, and the
//! `__proto__` property value. Identifiers bound to local bytecode slots
//! have statically known types, and parameters of variable-arity functions
//! are always objects.

use std::collections::HashSet;

use kestrel_ir::error::IrResult;
use kestrel_ir::node::{
    AccessNode, BinaryNode, BinaryOp, CallNode, CatchNode, Expr, ExpressionStatement, ForKind,
    ForNode, FunctionNode, IdentNode, IfNode, IndexNode, ObjectNode, RuntimeNode, RuntimeOp,
    TernaryNode, UnaryNode, UnaryOp, WhileNode,
};
use kestrel_ir::visitor::{self, Visitor};
use kestrel_ir::{JsType, LexicalContext, SymbolTable};

use super::feedback::TypeFeedback;

/// Assign optimistic types to a function tree.
///
/// Nested functions are not descended into during on-demand compilation.
pub fn apply(
    symbols: &SymbolTable,
    feedback: &TypeFeedback,
    on_demand: bool,
    function: FunctionNode,
) -> IrResult<FunctionNode> {
    let mut pass = OptimisticTypes {
        symbols,
        feedback,
        on_demand,
        never: Vec::new(),
    };
    let mut lc = LexicalContext::new();
    visitor::transform_function(&mut pass, &mut lc, function)
}

struct OptimisticTypes<'a> {
    symbols: &'a SymbolTable,
    feedback: &'a TypeFeedback,
    on_demand: bool,
    /// Per-function sets of program points tagged never-optimistic.
    never: Vec<HashSet<u32>>,
}

impl OptimisticTypes<'_> {
    fn tag_never(&mut self, expr: &Expr) {
        if let Some(point) = expr.program_point() {
            self.never.last_mut().expect("function state").insert(point);
        }
    }

    fn optimistic_type(&self, lc: &LexicalContext, point: Option<u32>) -> Option<JsType> {
        let point = point?;
        if self.never.last().is_some_and(|set| set.contains(&point)) {
            return None;
        }
        let function = lc.current_function().id;
        Some(self.feedback.narrowest_valid_type(function, point))
    }
}

impl Visitor for OptimisticTypes<'_> {
    fn enter_function(
        &mut self,
        _lc: &mut LexicalContext,
        _node: &mut FunctionNode,
    ) -> IrResult<bool> {
        if self.on_demand && !self.never.is_empty() {
            return Ok(false);
        }
        self.never.push(HashSet::new());
        Ok(true)
    }

    fn leave_function(
        &mut self,
        _lc: &mut LexicalContext,
        node: FunctionNode,
    ) -> IrResult<FunctionNode> {
        self.never.pop();
        Ok(node)
    }

    fn enter_access(&mut self, _lc: &mut LexicalContext, node: &mut AccessNode) -> IrResult<bool> {
        self.tag_never(&node.base);
        Ok(true)
    }

    fn enter_index(&mut self, _lc: &mut LexicalContext, node: &mut IndexNode) -> IrResult<bool> {
        self.tag_never(&node.base);
        Ok(true)
    }

    fn enter_call(&mut self, _lc: &mut LexicalContext, node: &mut CallNode) -> IrResult<bool> {
        self.tag_never(&node.function);
        Ok(true)
    }

    fn enter_unary(&mut self, _lc: &mut LexicalContext, node: &mut UnaryNode) -> IrResult<bool> {
        if node.op == UnaryOp::Not {
            self.tag_never(&node.operand);
        }
        Ok(true)
    }

    fn enter_binary(&mut self, _lc: &mut LexicalContext, node: &mut BinaryNode) -> IrResult<bool> {
        match node.op {
            BinaryOp::StrictEq | BinaryOp::StrictNe => {
                self.tag_never(&node.lhs);
                self.tag_never(&node.rhs);
            }
            op if op.is_assignment() => {
                if !op.is_self_modifying() {
                    self.tag_never(&node.lhs);
                }
                if node.lhs.is_internal_ident() {
                    self.tag_never(&node.rhs);
                }
            }
            _ => {}
        }
        Ok(true)
    }

    fn enter_runtime(&mut self, _lc: &mut LexicalContext, node: &mut RuntimeNode) -> IrResult<bool> {
        if matches!(node.op, RuntimeOp::In | RuntimeOp::Instanceof) {
            for arg in &node.args {
                self.tag_never(arg);
            }
        }
        Ok(true)
    }

    fn enter_expression_statement(
        &mut self,
        _lc: &mut LexicalContext,
        node: &mut ExpressionStatement,
    ) -> IrResult<bool> {
        if !node.expression.is_self_modifying() {
            self.tag_never(&node.expression);
        }
        Ok(true)
    }

    fn enter_if(&mut self, _lc: &mut LexicalContext, node: &mut IfNode) -> IrResult<bool> {
        self.tag_never(&node.test);
        Ok(true)
    }

    fn enter_ternary(&mut self, _lc: &mut LexicalContext, node: &mut TernaryNode) -> IrResult<bool> {
        self.tag_never(&node.test);
        Ok(true)
    }

    fn enter_while(&mut self, _lc: &mut LexicalContext, node: &mut WhileNode) -> IrResult<bool> {
        self.tag_never(&node.test);
        Ok(true)
    }

    fn enter_for(&mut self, _lc: &mut LexicalContext, node: &mut ForNode) -> IrResult<bool> {
        if let Some(test) = &node.test {
            self.tag_never(test);
        }
        if node.kind != ForKind::For {
            if let Some(iterable) = &node.modify {
                self.tag_never(iterable);
            }
        }
        Ok(true)
    }

    fn enter_catch(&mut self, _lc: &mut LexicalContext, node: &mut CatchNode) -> IrResult<bool> {
        if let Some(condition) = &node.condition {
            self.tag_never(condition);
        }
        Ok(true)
    }

    fn enter_object_literal(
        &mut self,
        _lc: &mut LexicalContext,
        node: &mut ObjectNode,
    ) -> IrResult<bool> {
        for property in &node.properties {
            if property.is_proto() {
                self.tag_never(&property.value);
            }
        }
        Ok(true)
    }

    fn leave_ident(&mut self, lc: &mut LexicalContext, mut node: IdentNode) -> IrResult<Expr> {
        let Some(symbol) = node.symbol.map(|id| self.symbols.symbol(id)) else {
            return Ok(Expr::Ident(node));
        };
        if symbol.is_param() && symbol.field_index.is_some() {
            // Variable-arity parameters are loaded from an object array.
            node.opt_type = Some(JsType::Object);
            return Ok(Expr::Ident(node));
        }
        if symbol.is_slotted_local() || symbol.is_internal() {
            return Ok(Expr::Ident(node));
        }
        node.opt_type = self.optimistic_type(lc, node.program_point);
        Ok(Expr::Ident(node))
    }

    fn leave_unary(&mut self, lc: &mut LexicalContext, mut node: UnaryNode) -> IrResult<Expr> {
        node.opt_type = self.optimistic_type(lc, node.program_point);
        Ok(Expr::Unary(Box::new(node)))
    }

    fn leave_binary(&mut self, lc: &mut LexicalContext, mut node: BinaryNode) -> IrResult<Expr> {
        node.opt_type = self.optimistic_type(lc, node.program_point);
        Ok(Expr::Binary(Box::new(node)))
    }

    fn leave_access(&mut self, lc: &mut LexicalContext, mut node: AccessNode) -> IrResult<Expr> {
        node.opt_type = self.optimistic_type(lc, node.program_point);
        Ok(Expr::Access(Box::new(node)))
    }

    fn leave_index(&mut self, lc: &mut LexicalContext, mut node: IndexNode) -> IrResult<Expr> {
        node.opt_type = self.optimistic_type(lc, node.program_point);
        Ok(Expr::Index(Box::new(node)))
    }

    fn leave_call(&mut self, lc: &mut LexicalContext, mut node: CallNode) -> IrResult<Expr> {
        node.opt_type = self.optimistic_type(lc, node.program_point);
        Ok(Expr::Call(Box::new(node)))
    }
}
