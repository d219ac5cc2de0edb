//! Program-point allocation.
//!
//! Walks each function in a fixed order and hands a unique integer to every
//! node that can throw an optimistic-typing de-optimization: arithmetic
//! unary/binary operations, calls, property and index access, and
//! identifier references. Var-declaration targets never reach expression
//! traversal, and internal identifiers are excluded. Counters reset at each
//! function boundary; overflow is fatal.

use kestrel_ir::consts;
use kestrel_ir::error::{IrError, IrResult};
use kestrel_ir::node::{
    AccessNode, BinaryNode, CallNode, FunctionNode, IdentNode, IndexNode, UnaryNode,
    FIRST_PROGRAM_POINT, MAX_PROGRAM_POINT_VALUE,
};
use kestrel_ir::visitor::{self, Visitor};
use kestrel_ir::{Expr, LexicalContext};

/// Allocate program points for a function tree.
///
/// In on-demand mode nested functions are left untouched; they are
/// recompiled in their own right with their own counters.
pub fn apply(on_demand: bool, function: FunctionNode) -> IrResult<FunctionNode> {
    let mut pass = ProgramPoints {
        on_demand,
        counters: Vec::new(),
    };
    let mut lc = LexicalContext::new();
    visitor::transform_function(&mut pass, &mut lc, function)
}

struct ProgramPoints {
    on_demand: bool,
    counters: Vec<u32>,
}

impl ProgramPoints {
    fn next(&mut self) -> IrResult<u32> {
        let counter = self.counters.last_mut().expect("inside a function");
        let point = *counter;
        if point > MAX_PROGRAM_POINT_VALUE {
            return Err(IrError::internal("program point overflow"));
        }
        *counter += 1;
        Ok(point)
    }
}

impl Visitor for ProgramPoints {
    fn enter_function(
        &mut self,
        _lc: &mut LexicalContext,
        _node: &mut FunctionNode,
    ) -> IrResult<bool> {
        if self.on_demand && !self.counters.is_empty() {
            return Ok(false);
        }
        self.counters.push(FIRST_PROGRAM_POINT);
        Ok(true)
    }

    fn leave_function(
        &mut self,
        _lc: &mut LexicalContext,
        node: FunctionNode,
    ) -> IrResult<FunctionNode> {
        self.counters.pop();
        Ok(node)
    }

    fn leave_ident(&mut self, _lc: &mut LexicalContext, mut node: IdentNode) -> IrResult<Expr> {
        if !consts::is_internal_name(&node.name) {
            node.program_point = Some(self.next()?);
        }
        Ok(Expr::Ident(node))
    }

    fn leave_unary(&mut self, _lc: &mut LexicalContext, mut node: UnaryNode) -> IrResult<Expr> {
        if node.op.can_be_optimistic() {
            node.program_point = Some(self.next()?);
        }
        Ok(Expr::Unary(Box::new(node)))
    }

    fn leave_binary(&mut self, _lc: &mut LexicalContext, mut node: BinaryNode) -> IrResult<Expr> {
        if node.op.can_be_optimistic() {
            node.program_point = Some(self.next()?);
        }
        Ok(Expr::Binary(Box::new(node)))
    }

    fn leave_access(&mut self, _lc: &mut LexicalContext, mut node: AccessNode) -> IrResult<Expr> {
        node.program_point = Some(self.next()?);
        Ok(Expr::Access(Box::new(node)))
    }

    fn leave_index(&mut self, _lc: &mut LexicalContext, mut node: IndexNode) -> IrResult<Expr> {
        node.program_point = Some(self.next()?);
        Ok(Expr::Index(Box::new(node)))
    }

    fn leave_call(&mut self, _lc: &mut LexicalContext, mut node: CallNode) -> IrResult<Expr> {
        node.program_point = Some(self.next()?);
        Ok(Expr::Call(Box::new(node)))
    }
}
