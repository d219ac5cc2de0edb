//! Splitting of oversized functions.
//!
//! Weighs each function; when a body, block, or literal exceeds the weight
//! threshold, consecutive statements or literal elements are partitioned
//! greedily into groups below the threshold, each bound to its own compile
//! unit. Functions carrying an apply-to-call specialization are never
//! split.

use kestrel_ir::error::IrResult;
use kestrel_ir::node::{
    ArrayLiteralNode, Block, BlockFlags, DeclKind, Expr, FunctionFlags, FunctionNode, IdAllocator,
    ObjectNode, SplitNode, SplitRange, Stmt,
};
use kestrel_ir::visitor::{self, Visitor};
use kestrel_ir::LexicalContext;

use super::units::UnitAllocator;
use super::weigh::{weigh_block, weigh_expr, weigh_stmt, LITERAL_WEIGHT, OBJECT_WEIGHT};

/// Default split threshold: 32 KiB of weight.
pub const DEFAULT_SPLIT_THRESHOLD: u32 = 32 * 1024;

/// Split a function tree, binding every function to a compile unit.
pub fn apply(
    ids: &mut IdAllocator,
    units: &mut UnitAllocator,
    threshold: u32,
    dual_fields: bool,
    function: FunctionNode,
) -> IrResult<FunctionNode> {
    let mut splitter = Splitter {
        ids,
        units,
        threshold,
        dual_fields,
        states: Vec::new(),
    };
    let mut lc = LexicalContext::new();
    visitor::transform_function(&mut splitter, &mut lc, function)
}

struct SplitState {
    /// This function weighs more than the threshold and gets partitioned.
    splitting: bool,
    did_split: bool,
}

struct Splitter<'a> {
    ids: &'a mut IdAllocator,
    units: &'a mut UnitAllocator,
    threshold: u32,
    dual_fields: bool,
    states: Vec<SplitState>,
}

impl Visitor for Splitter<'_> {
    fn enter_function(
        &mut self,
        _lc: &mut LexicalContext,
        node: &mut FunctionNode,
    ) -> IrResult<bool> {
        let splittable = !node
            .flags
            .contains(FunctionFlags::HAS_APPLY_TO_CALL_SPECIALIZATION);
        self.states.push(SplitState {
            splitting: splittable && weigh_block(&node.body) > self.threshold,
            did_split: false,
        });
        Ok(true)
    }

    fn leave_function(
        &mut self,
        _lc: &mut LexicalContext,
        mut node: FunctionNode,
    ) -> IrResult<FunctionNode> {
        let state = self.states.pop().expect("split state");
        if state.did_split {
            node.flags |= FunctionFlags::IS_SPLIT;
        }
        node.compile_unit = Some(self.units.find_unit(weigh_block(&node.body)));
        Ok(node)
    }

    fn leave_block(&mut self, _lc: &mut LexicalContext, mut block: Block) -> IrResult<Block> {
        if self.splitting() && weigh_block(&block) > self.threshold {
            block.statements = self.partition_statements(std::mem::take(&mut block.statements));
        }
        Ok(block)
    }

    fn leave_array_literal(
        &mut self,
        _lc: &mut LexicalContext,
        mut node: ArrayLiteralNode,
    ) -> IrResult<Expr> {
        let total = LITERAL_WEIGHT
            + node
                .elements
                .iter()
                .map(|e| e.as_ref().map_or(1, weigh_expr))
                .sum::<u32>();
        if self.splitting() && total > self.threshold {
            node.units = self.partition_weights(
                node.elements
                    .iter()
                    .map(|e| Some(e.as_ref().map_or(1, weigh_expr))),
            );
            self.mark_split();
        }
        Ok(Expr::ArrayLiteral(node))
    }

    fn leave_object_literal(
        &mut self,
        _lc: &mut LexicalContext,
        mut node: ObjectNode,
    ) -> IrResult<Expr> {
        let total = OBJECT_WEIGHT
            + node
                .properties
                .iter()
                .map(|p| weigh_expr(&p.value))
                .sum::<u32>();
        if self.splitting() && total > self.threshold {
            let dual = self.dual_fields;
            node.units = self.partition_weights(node.properties.iter().map(|p| {
                // Constant properties go to the spill object directly and
                // stay out of split ranges.
                if dual && p.is_constant() {
                    None
                } else {
                    Some(weigh_expr(&p.value))
                }
            }));
            self.mark_split();
        }
        Ok(Expr::ObjectLiteral(node))
    }
}

impl Splitter<'_> {
    fn splitting(&self) -> bool {
        self.states.last().is_some_and(|s| s.splitting)
    }

    fn mark_split(&mut self) {
        if let Some(state) = self.states.last_mut() {
            state.did_split = true;
        }
    }

    /// Partition consecutive statements into split nodes, leaving terminal
    /// statements, block-scoped declarations, and oversized single
    /// statements in place.
    fn partition_statements(&mut self, statements: Vec<Stmt>) -> Vec<Stmt> {
        let mut out = Vec::with_capacity(statements.len());
        let mut group: Vec<Stmt> = Vec::new();
        let mut group_weight = 0;

        for stmt in statements {
            let weight = weigh_stmt(&stmt);
            let barrier = stmt.terminates_flow()
                || is_block_scoped_declaration(&stmt)
                || weight >= self.threshold;
            if barrier {
                self.flush_group(&mut out, &mut group, &mut group_weight);
                out.push(stmt);
                continue;
            }
            if group_weight + weight > self.threshold && !group.is_empty() {
                self.flush_group(&mut out, &mut group, &mut group_weight);
            }
            group.push(stmt);
            group_weight += weight;
        }
        self.flush_group(&mut out, &mut group, &mut group_weight);
        out
    }

    fn flush_group(&mut self, out: &mut Vec<Stmt>, group: &mut Vec<Stmt>, weight: &mut u32) {
        if group.is_empty() {
            return;
        }
        let unit = self.units.find_unit(*weight);
        let mut body = Block::synthetic(self.ids.block_id(), std::mem::take(group));
        body.flags |= BlockFlags::IS_SPLIT_BODY;
        let token = body.token;
        let finish = body.finish;
        out.push(Stmt::Split(Box::new(SplitNode {
            token,
            finish,
            body,
            unit,
        })));
        self.mark_split();
        *weight = 0;
    }

    /// Greedy ranges over literal elements. `None` weights are excluded
    /// from every range and act as partition barriers.
    fn partition_weights(
        &mut self,
        weights: impl Iterator<Item = Option<u32>>,
    ) -> Vec<SplitRange> {
        let mut ranges = Vec::new();
        let mut lo = 0;
        let mut weight = 0;
        let mut index = 0;
        for element in weights {
            match element {
                None => {
                    if index > lo {
                        ranges.push(SplitRange::new(lo, index, self.units.find_unit(weight)));
                    }
                    lo = index + 1;
                    weight = 0;
                }
                Some(w) => {
                    if weight + w > self.threshold && index > lo {
                        ranges.push(SplitRange::new(lo, index, self.units.find_unit(weight)));
                        lo = index;
                        weight = 0;
                    }
                    weight += w;
                }
            }
            index += 1;
        }
        if index > lo {
            ranges.push(SplitRange::new(lo, index, self.units.find_unit(weight)));
        }
        ranges
    }
}

fn is_block_scoped_declaration(stmt: &Stmt) -> bool {
    matches!(stmt, Stmt::Var(v) if v.kind != DeclKind::Var)
}
