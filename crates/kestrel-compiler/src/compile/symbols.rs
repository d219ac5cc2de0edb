//! Symbol assignment pass.
//!
//! On entering a function, compiler-constant symbols are defined in the
//! body block, parameters are bound, and all declarations are hoisted:
//! `var` to the function body, `let`/`const` into the immediately enclosing
//! block. Each identifier leaf then resolves by walking blocks outward from
//! its use; unresolved names become interned global symbols. Symbols only
//! reachable across a function, dynamic-scope, or split boundary are
//! promoted to scope storage, which marks the defining block `needs-scope`
//! and every intervening function `needs-parent-scope`.

use indexmap::IndexSet;

use kestrel_ir::consts;
use kestrel_ir::error::{IrError, IrResult};
use kestrel_ir::lexical_context::Frame;
use kestrel_ir::node::{
    BinaryNode, Block, BlockFlags, BlockId, CatchNode, DeclKind, Expr, FnId, ForInit,
    FunctionFlags, FunctionNode, IdentNode, LiteralNode, LiteralValue, RuntimeNode, RuntimeOp,
    Stmt, SwitchNode, UnaryNode, UnaryOp, VarNode,
};
use kestrel_ir::visitor::{self, Visitor};
use kestrel_ir::{LexicalContext, SymbolFlags, SymbolId, SymbolTable, Token};

/// Resolve every identifier of a function tree against a symbol table.
pub fn apply(symbols: &mut SymbolTable, function: FunctionNode) -> IrResult<FunctionNode> {
    let mut pass = AssignSymbols {
        symbols,
        states: Vec::new(),
    };
    let mut lc = LexicalContext::new();
    visitor::transform_function(&mut pass, &mut lc, function)
}

/// Per-function pass state, stacked for nested functions.
struct FnState {
    fn_id: FnId,
    body_id: BlockId,
    this_properties: IndexSet<String>,
    self_symbol: Option<String>,
    /// Some block of this function holds scope-stored symbols.
    has_scope_block: bool,
}

struct AssignSymbols<'a> {
    symbols: &'a mut SymbolTable,
    states: Vec<FnState>,
}

impl Visitor for AssignSymbols<'_> {
    fn enter_function(
        &mut self,
        _lc: &mut LexicalContext,
        node: &mut FunctionNode,
    ) -> IrResult<bool> {
        let body_id = node.body.id;
        let mut state = FnState {
            fn_id: node.id,
            body_id,
            this_properties: IndexSet::new(),
            self_symbol: None,
            has_scope_block: false,
        };

        self.define_compiler_constants(node, body_id);
        self.bind_parameters(node, body_id)?;

        if node.is_named_function_expression() {
            let name = node.name.name.clone();
            if self.symbols.lookup_in(body_id, &name).is_none() {
                self.symbols.define(
                    body_id,
                    &name,
                    SymbolFlags::IS_VAR | SymbolFlags::IS_FUNCTION_SELF | SymbolFlags::NEEDS_SLOT,
                );
                state.self_symbol = Some(name);
            }
            if node.has_deep_eval() {
                // The eval could reference the function by its own name.
                node.flags |= FunctionFlags::USES_SELF_SYMBOL | FunctionFlags::NEEDS_CALLEE;
            }
        }

        self.states.push(state);
        self.hoist_declarations(&node.body, body_id, node.is_program())?;
        Ok(true)
    }

    fn enter_catch(&mut self, _lc: &mut LexicalContext, node: &mut CatchNode) -> IrResult<bool> {
        let mut flags = SymbolFlags::IS_VAR | SymbolFlags::NEEDS_SLOT;
        if consts::is_internal_name(&node.exception.name) {
            flags |= SymbolFlags::IS_INTERNAL;
        }
        let id = self
            .symbols
            .define(node.body.id, &node.exception.name, flags);
        node.exception.symbol = Some(id);
        Ok(true)
    }

    fn leave_ident(&mut self, lc: &mut LexicalContext, mut node: IdentNode) -> IrResult<Expr> {
        let id = self.resolve(lc, &node.name);
        self.symbols.symbol_mut(id).use_count += 1;
        node.symbol = Some(id);
        Ok(Expr::Ident(node))
    }

    fn leave_var(&mut self, lc: &mut LexicalContext, mut node: VarNode) -> IrResult<VarNode> {
        let id = self
            .lookup_on_stack(lc, &node.name.name)
            .map(|(id, _)| id)
            .unwrap_or_else(|| panic!("undeclared variable {} after hoisting", node.name.name));
        if node.kind.is_block_scoped() {
            self.symbols.symbol_mut(id).flags |= SymbolFlags::HAS_BEEN_DECLARED;
        }
        node.name.symbol = Some(id);
        Ok(node)
    }

    fn leave_unary(&mut self, lc: &mut LexicalContext, node: UnaryNode) -> IrResult<Expr> {
        // typeof of a non-local scope reference goes through the runtime so
        // "typeof undeclared" answers "undefined" instead of throwing.
        if node.op == UnaryOp::Typeof {
            let scope_name = match &node.operand {
                Expr::Ident(ident) => ident.symbol.and_then(|id| {
                    let symbol = self.symbols.symbol(id);
                    if symbol.is_scope() && !self.is_local_to_current_function(lc, id) {
                        Some(ident.name.clone())
                    } else {
                        None
                    }
                }),
                _ => None,
            };
            if let Some(name) = scope_name {
                return Ok(Expr::Runtime(RuntimeNode {
                    token: node.token,
                    finish: node.finish,
                    op: RuntimeOp::Typeof,
                    args: vec![
                        node.operand,
                        Expr::Literal(LiteralNode::synthetic(LiteralValue::Str(name))),
                    ],
                }));
            }
        }
        Ok(Expr::Unary(Box::new(node)))
    }

    fn leave_binary(&mut self, _lc: &mut LexicalContext, node: BinaryNode) -> IrResult<Expr> {
        // Record `this.<name> = ...` for allocation layout.
        if node.op.is_assignment() {
            if let Expr::Access(access) = &node.lhs {
                if matches!(&access.base, Expr::Ident(base) if base.name == consts::THIS) {
                    if let Some(state) = self.states.last_mut() {
                        state.this_properties.insert(access.property.clone());
                    }
                }
            }
        }
        Ok(Expr::Binary(Box::new(node)))
    }

    fn leave_switch(&mut self, lc: &mut LexicalContext, mut node: SwitchNode) -> IrResult<Stmt> {
        // Non-table switches evaluate their expression into a hoisted tag.
        if !node.unique_integer && node.tag.is_none() {
            let block = lc.current_block().id;
            let id = self.symbols.define(
                block,
                consts::SWITCH_TAG,
                SymbolFlags::IS_VAR | SymbolFlags::IS_INTERNAL | SymbolFlags::NEEDS_SLOT,
            );
            node.tag = Some(id);
        }
        Ok(Stmt::Switch(Box::new(node)))
    }

    fn leave_function(
        &mut self,
        lc: &mut LexicalContext,
        mut node: FunctionNode,
    ) -> IrResult<FunctionNode> {
        let state = self.states.pop().expect("function state");
        let flags = node.flags | lc.current_function().flags;
        let body_id = state.body_id;

        node.this_property_count = state.this_properties.len() as u32;

        if flags.contains(FunctionFlags::USES_SELF_SYMBOL) {
            if let Some(name) = &state.self_symbol {
                node.flags |= FunctionFlags::NEEDS_CALLEE;
                let decl = self.synthetic_var(body_id, name, consts::CALLEE);
                node.body.statements.insert(0, decl);
            }
        }
        if flags.contains(FunctionFlags::NEEDS_ARGUMENTS) {
            let decl = self.synthetic_var(body_id, consts::ARGUMENTS_VAR, consts::ARGUMENTS);
            node.body.statements.insert(0, decl);
        }

        // Prune slots nothing ended up needing.
        let needs_callee = (node.flags | lc.current_function().flags)
            .contains(FunctionFlags::NEEDS_CALLEE);
        if !needs_callee {
            self.symbols.remove(body_id, consts::CALLEE);
        }
        let needs_scope = state.has_scope_block
            || (node.flags | lc.current_function().flags)
                .contains(FunctionFlags::NEEDS_PARENT_SCOPE);
        if !needs_scope {
            self.symbols.remove(body_id, consts::SCOPE);
        }
        if let Some(name) = &state.self_symbol {
            if !flags.contains(FunctionFlags::USES_SELF_SYMBOL) {
                let unused = self
                    .symbols
                    .lookup_in(body_id, name)
                    .is_some_and(|id| self.symbols.symbol(id).use_count == 0);
                if unused {
                    self.symbols.remove(body_id, name);
                }
            }
        }

        Ok(node)
    }
}

impl AssignSymbols<'_> {
    fn define_compiler_constants(&mut self, node: &FunctionNode, body_id: BlockId) {
        let internal = SymbolFlags::IS_VAR | SymbolFlags::IS_INTERNAL | SymbolFlags::NEEDS_SLOT;
        self.symbols.define(body_id, consts::CALLEE, internal);
        self.symbols
            .define(body_id, consts::THIS, SymbolFlags::IS_THIS | SymbolFlags::NEEDS_SLOT);
        self.symbols.define(body_id, consts::SCOPE, internal);
        self.symbols.define(body_id, consts::RETURN, internal);
        if node.is_vararg() {
            self.symbols.define(body_id, consts::VARARGS, internal);
        }
        if node.needs_arguments() {
            self.symbols.define(body_id, consts::ARGUMENTS, internal);
            self.symbols.define(
                body_id,
                consts::ARGUMENTS_VAR,
                SymbolFlags::IS_VAR | SymbolFlags::NEEDS_SLOT | SymbolFlags::HAS_OBJECT_VALUE,
            );
        }
    }

    fn bind_parameters(&mut self, node: &mut FunctionNode, body_id: BlockId) -> IrResult<()> {
        let is_vararg = node.is_vararg();
        let promote = node.has_deep_eval() || is_vararg;
        let mut seen: IndexSet<String> = IndexSet::new();
        for (index, param) in node.params.iter_mut().enumerate() {
            if !seen.insert(param.name.clone()) {
                return Err(IrError::syntax(
                    format!("duplicate parameter name \"{}\"", param.name),
                    param.token,
                ));
            }
            let mut flags = SymbolFlags::IS_PARAM | SymbolFlags::NEEDS_SLOT;
            if promote {
                flags |= SymbolFlags::IS_SCOPE;
            }
            let id = self.symbols.define(body_id, &param.name, flags);
            if is_vararg {
                self.symbols.symbol_mut(id).field_index = Some(index as u32);
            }
            param.symbol = Some(id);
        }
        Ok(())
    }

    /// Hoist every declaration in a function body: `var` to the body block,
    /// `let`/`const` into their immediately enclosing block. Does not
    /// descend into nested functions.
    fn hoist_declarations(
        &mut self,
        body: &Block,
        body_id: BlockId,
        program_level: bool,
    ) -> IrResult<()> {
        let mut walker = DeclarationHoister {
            symbols: &mut *self.symbols,
            body_id,
            program_level,
        };
        walker.walk_block(body, body_id)
    }

    fn synthetic_var(&mut self, body_id: BlockId, name: &str, init_name: &str) -> Stmt {
        let mut target = IdentNode::synthetic(name);
        target.symbol = self.symbols.lookup_in(body_id, name);
        let mut init = IdentNode::synthetic(init_name);
        init.symbol = self.symbols.lookup_in(body_id, init_name);
        if let Some(id) = init.symbol {
            self.symbols.symbol_mut(id).use_count += 1;
        }
        Stmt::Var(Box::new(VarNode {
            token: Token::synthetic(),
            finish: 0,
            kind: DeclKind::Var,
            name: target,
            init: Some(Expr::Ident(init)),
            is_function_declaration: false,
        }))
    }

    /// Find a name by walking blocks outward from the current block.
    fn lookup_on_stack(&self, lc: &LexicalContext, name: &str) -> Option<(SymbolId, BlockId)> {
        for frame in lc.frames_top_down() {
            if let Frame::Block(b) = frame {
                if let Some(id) = self.symbols.lookup_in(b.id, name) {
                    return Some((id, b.id));
                }
            }
        }
        None
    }

    /// Resolve a name, interning a global when no definition exists, and
    /// apply scope promotion.
    fn resolve(&mut self, lc: &mut LexicalContext, name: &str) -> SymbolId {
        let mut crossed_boundary = false;
        let mut found: Option<(SymbolId, BlockId)> = None;
        for frame in lc.frames_top_down() {
            match frame {
                Frame::Block(b) => {
                    if let Some(id) = self.symbols.lookup_in(b.id, name) {
                        found = Some((id, b.id));
                        break;
                    }
                    if b.flags.contains(BlockFlags::IS_SPLIT_BODY) {
                        crossed_boundary = true;
                    }
                }
                Frame::Function(_) => crossed_boundary = true,
            }
        }

        let Some((id, block)) = found else {
            // Undeclared: intern one global symbol per name.
            let outermost = lc.outermost_function().body_id;
            let id = self.symbols.define_global(
                outermost,
                name,
                SymbolFlags::IS_SCOPE | SymbolFlags::IS_PROGRAM_LEVEL,
            );
            self.mark_parent_scopes(lc, outermost);
            return id;
        };

        let owner = lc.defining_function(block);
        let owner_all_in_scope = self.function_frame_flags(lc, owner)
            .contains(FunctionFlags::ALL_VARS_IN_SCOPE);
        if crossed_boundary || owner_all_in_scope {
            let symbol = self.symbols.symbol_mut(id);
            if !symbol.is_global() {
                symbol.flags |= SymbolFlags::IS_SCOPE;
            }
        }

        let symbol = self.symbols.symbol(id);
        if symbol.is_function_self() {
            lc.set_function_flag(
                owner,
                FunctionFlags::USES_SELF_SYMBOL | FunctionFlags::NEEDS_CALLEE,
            );
        }
        if symbol.is_scope() {
            if !symbol.is_global() {
                lc.set_block_needs_scope(block);
                if let Some(state) = self.states.iter_mut().rev().find(|s| s.fn_id == owner) {
                    state.has_scope_block = true;
                }
            }
            self.mark_parent_scopes(lc, block);
        }
        id
    }

    /// Flag every function between the use site and the defining block,
    /// exclusive of the definer itself.
    fn mark_parent_scopes(&mut self, lc: &mut LexicalContext, defining_block: BlockId) {
        let mut pending: Vec<FnId> = Vec::new();
        for frame in lc.frames_top_down() {
            match frame {
                Frame::Block(b) if b.id == defining_block => break,
                Frame::Function(f) => pending.push(f.id),
                Frame::Block(_) => {}
            }
        }
        for id in pending {
            lc.set_function_flag(id, FunctionFlags::NEEDS_PARENT_SCOPE);
        }
    }

    fn function_frame_flags(&self, lc: &LexicalContext, id: FnId) -> FunctionFlags {
        for frame in lc.frames_top_down() {
            if let Frame::Function(f) = frame {
                if f.id == id {
                    return f.flags;
                }
            }
        }
        FunctionFlags::empty()
    }

    /// Whether a symbol's defining block belongs to the current function.
    fn is_local_to_current_function(&self, lc: &LexicalContext, id: SymbolId) -> bool {
        let symbol = self.symbols.symbol(id);
        if symbol.is_global() {
            return false;
        }
        lc.blocks_from(lc.current_block().id)
            .any(|b| b.id == symbol.block)
    }
}

/// Walks statements of one function, defining declaration symbols.
struct DeclarationHoister<'a> {
    symbols: &'a mut SymbolTable,
    body_id: BlockId,
    program_level: bool,
}

impl DeclarationHoister<'_> {
    fn walk_block(&mut self, block: &Block, current: BlockId) -> IrResult<()> {
        let in_case_body = block.flags.contains(BlockFlags::IS_CASE_BODY);
        for stmt in &block.statements {
            self.walk_stmt(stmt, current, in_case_body)?;
        }
        Ok(())
    }

    fn walk_stmt(&mut self, stmt: &Stmt, current: BlockId, in_case_body: bool) -> IrResult<()> {
        match stmt {
            Stmt::Var(v) => self.declare(v, current, in_case_body),
            Stmt::Block(b) => self.walk_block(b, b.id),
            Stmt::If(i) => {
                self.walk_block(&i.pass, i.pass.id)?;
                if let Some(f) = &i.fail {
                    self.walk_block(f, f.id)?;
                }
                Ok(())
            }
            Stmt::While(w) => self.walk_block(&w.body, w.body.id),
            Stmt::For(f) => {
                if let Some(ForInit::Var(vars)) = &f.init {
                    for v in vars {
                        // The loop head declares into the loop's enclosing
                        // block.
                        self.declare(v, current, in_case_body)?;
                    }
                }
                self.walk_block(&f.body, f.body.id)
            }
            Stmt::Switch(s) => {
                for case in &s.cases {
                    self.walk_block(&case.body, case.body.id)?;
                }
                Ok(())
            }
            Stmt::Try(t) => {
                self.walk_block(&t.body, t.body.id)?;
                for c in &t.catches {
                    self.walk_block(&c.body, c.body.id)?;
                }
                if let Some(f) = &t.finally_body {
                    self.walk_block(f, f.id)?;
                }
                for s in &t.inlined_finallies {
                    self.walk_stmt(s, current, in_case_body)?;
                }
                Ok(())
            }
            Stmt::Label(l) => self.walk_block(&l.body, l.body.id),
            Stmt::Split(s) => self.walk_block(&s.body, s.body.id),
            _ => Ok(()),
        }
    }

    fn declare(&mut self, var: &VarNode, current: BlockId, in_case_body: bool) -> IrResult<()> {
        let name = var.name.name.as_str();
        if var.kind.is_block_scoped() {
            if in_case_body {
                return Err(IrError::syntax(
                    format!(
                        "let and const cannot be declared in an unprotected switch case: \"{name}\""
                    ),
                    var.name.token,
                ));
            }
            if self.symbols.lookup_in(current, name).is_some() {
                return Err(IrError::syntax(
                    format!("variable \"{name}\" has already been declared"),
                    var.name.token,
                ));
            }
            let mut flags = SymbolFlags::NEEDS_SLOT
                | if var.kind == DeclKind::Const {
                    SymbolFlags::IS_CONST
                } else {
                    SymbolFlags::IS_LET
                };
            if self.program_level && current == self.body_id {
                flags |= SymbolFlags::IS_PROGRAM_LEVEL;
            }
            self.symbols.define(current, name, flags);
            return Ok(());
        }

        // var hoists to the function body; redefinition is legal unless it
        // collides with a block-scoped name.
        if let Some(existing) = self.symbols.lookup_in(self.body_id, name) {
            if self.symbols.symbol(existing).is_block_scoped() {
                return Err(IrError::syntax(
                    format!("variable \"{name}\" has already been declared"),
                    var.name.token,
                ));
            }
            return Ok(());
        }
        let mut flags = SymbolFlags::IS_VAR | SymbolFlags::NEEDS_SLOT;
        if self.program_level {
            flags |= SymbolFlags::IS_PROGRAM_LEVEL;
        }
        if var.is_function_declaration {
            flags |= SymbolFlags::HAS_OBJECT_VALUE;
        }
        self.symbols.define(self.body_id, name, flags);
        Ok(())
    }
}
