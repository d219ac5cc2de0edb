//! Scope-depth analysis.
//!
//! For each eagerly compiled function, partitions referenced symbols into
//! internal (defined transitively within the body) and external (captured),
//! recording for each capture how many scope-bearing blocks separate the
//! function's body from the defining block. The results feed on-demand
//! recompilation, which skips this pass and reads the cached data instead.

use indexmap::IndexMap;

use kestrel_ir::error::IrResult;
use kestrel_ir::lexical_context::Frame;
use kestrel_ir::node::{Block, BlockFlags, BlockId, FnId, FunctionFlags, FunctionNode, IdentNode};
use kestrel_ir::visitor::{self, Visitor};
use kestrel_ir::{Expr, LexicalContext, SymbolTable};

use super::compiler::RecompilableData;

/// Compute scope depths for a function and everything nested in it,
/// registering one `RecompilableData` per function id.
pub fn apply(
    symbols: &SymbolTable,
    registry: &mut IndexMap<FnId, RecompilableData>,
    function: FunctionNode,
) -> IrResult<FunctionNode> {
    let mut pass = FindScopeDepths {
        symbols,
        registry,
        states: Vec::new(),
        dynamic_scope_count: 0,
    };
    let mut lc = LexicalContext::new();
    visitor::transform_function(&mut pass, &mut lc, function)
}

struct FnState {
    fn_id: FnId,
    body_id: BlockId,
    data: RecompilableData,
}

struct FindScopeDepths<'a> {
    symbols: &'a SymbolTable,
    registry: &'a mut IndexMap<FnId, RecompilableData>,
    states: Vec<FnState>,
    dynamic_scope_count: u32,
}

impl Visitor for FindScopeDepths<'_> {
    fn enter_function(
        &mut self,
        _lc: &mut LexicalContext,
        node: &mut FunctionNode,
    ) -> IrResult<bool> {
        if self.dynamic_scope_count > 0 {
            node.flags |= FunctionFlags::IN_DYNAMIC_CONTEXT;
        }
        let mut data = RecompilableData::default();
        data.in_dynamic_context = node.flags.contains(FunctionFlags::IN_DYNAMIC_CONTEXT);
        self.states.push(FnState {
            fn_id: node.id,
            body_id: node.body.id,
            data,
        });
        Ok(true)
    }

    fn enter_block(&mut self, _lc: &mut LexicalContext, block: &mut Block) -> IrResult<bool> {
        if block.flags.contains(BlockFlags::IS_DYNAMIC_BOUNDARY) {
            self.dynamic_scope_count += 1;
        }
        // Every enclosing function transitively owns this block's symbols.
        for (name, _) in self.symbols.symbols_in(block.id) {
            for state in &mut self.states {
                state.data.internal_symbols.insert(name.to_owned());
            }
        }
        Ok(true)
    }

    fn leave_block(&mut self, _lc: &mut LexicalContext, block: Block) -> IrResult<Block> {
        if block.flags.contains(BlockFlags::IS_DYNAMIC_BOUNDARY) {
            self.dynamic_scope_count -= 1;
        }
        Ok(block)
    }

    fn leave_ident(&mut self, lc: &mut LexicalContext, node: IdentNode) -> IrResult<Expr> {
        let Some(id) = node.symbol else {
            return Ok(Expr::Ident(node));
        };
        let symbol = self.symbols.symbol(id);
        let state = self.states.last_mut().expect("function state");

        let internal = lc
            .blocks_from(lc.current_block().id)
            .any(|b| b.id == symbol.block);
        if !internal {
            let depth = capture_depth(lc, state.body_id, symbol.block);
            state
                .data
                .external_symbol_depths
                .entry(symbol.name.clone())
                .or_insert(depth);
        }
        Ok(Expr::Ident(node))
    }

    fn leave_function(
        &mut self,
        _lc: &mut LexicalContext,
        node: FunctionNode,
    ) -> IrResult<FunctionNode> {
        let state = self.states.pop().expect("function state");
        self.registry.insert(state.fn_id, state.data);
        Ok(node)
    }
}

/// Scope-bearing blocks strictly between a function's body and the block
/// defining a captured symbol, walking outward.
fn capture_depth(lc: &LexicalContext, body_id: BlockId, defining: BlockId) -> u32 {
    let mut depth = 0;
    let mut past_body = false;
    for frame in lc.frames_top_down() {
        if let Frame::Block(b) = frame {
            if !past_body {
                past_body = b.id == body_id;
                continue;
            }
            if b.id == defining {
                break;
            }
            if b.flags.contains(BlockFlags::NEEDS_SCOPE) {
                depth += 1;
            }
        }
    }
    depth
}
