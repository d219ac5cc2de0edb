//! Recursive-descent parser producing IR trees.
//!
//! Statements are parsed directly into the node model; expression parsing
//! climbs precedence tiers. The parser assigns function and block ids,
//! records lifecycle flags (`is-program`, `needs-arguments`, `has-eval`,
//! named-function-expression), and wraps single-statement bodies in
//! synthetic blocks so every branch and loop body is a `Block`.

use kestrel_ir::consts;
use kestrel_ir::error::{IrError, IrResult};
use kestrel_ir::node::{
    AccessNode, ArrayLiteralNode, BinaryNode, BinaryOp, Block, BlockFlags, BreakNode, CallNode,
    CaseNode, CatchNode, ContinueNode, DebuggerNode, DeclKind, EmptyNode, Expr,
    ExpressionStatement, ForInit, ForKind, ForNode, FunctionFlags, FunctionNode, IdAllocator,
    IdentNode, IfNode, IndexNode, LabelNode, LiteralNode, LiteralValue, ObjectNode, PropertyKey,
    PropertyNode, ReturnNode, Stmt, SwitchNode, TernaryNode, ThrowNode, TryNode, UnaryNode,
    UnaryOp, VarNode, WhileNode,
};
use kestrel_ir::types::JsType;
use kestrel_ir::{Source, Token, TokenKind};

use super::lexer;

pub struct Parser<'s> {
    source: &'s Source,
    tokens: Vec<Token>,
    pos: usize,
    ids: IdAllocator,
    /// Flag accumulators for every function literal currently open.
    fn_stack: Vec<FunctionFlags>,
}

impl<'s> Parser<'s> {
    pub fn new(source: &'s Source, ids: IdAllocator) -> crate::Result<Self> {
        let (tokens, diagnostics) = lexer::tokenize(source.content());
        if diagnostics.has_errors() {
            return Err(crate::Error::ParseError(diagnostics));
        }
        Ok(Self {
            source,
            tokens,
            pos: 0,
            ids,
            fn_stack: Vec::new(),
        })
    }

    /// Parse a complete script into its program function.
    pub fn parse_program(mut self) -> IrResult<(FunctionNode, IdAllocator)> {
        let token = self.current();
        let fn_id = self.ids.function_id();
        let body_id = self.ids.block_id();

        self.fn_stack
            .push(FunctionFlags::IS_PROGRAM | FunctionFlags::IS_VARARG);
        let mut statements = Vec::new();
        while !self.at(TokenKind::Eof) {
            self.statement(&mut statements)?;
        }
        let flags = self.fn_stack.pop().expect("program flags");

        let finish = self.source.len() as u32;
        let mut body = Block::new(body_id, token, finish, statements);
        body.flags |= BlockFlags::IS_FUNCTION_BODY;
        if flags.contains(FunctionFlags::HAS_EVAL) {
            body.flags |= BlockFlags::IS_DYNAMIC_BOUNDARY;
        }

        let function = FunctionNode {
            token,
            finish,
            id: fn_id,
            name: IdentNode::synthetic(":program"),
            params: Vec::new(),
            body,
            flags,
            return_type: JsType::Unknown,
            compile_unit: None,
            this_property_count: 0,
        };
        Ok((function, self.ids))
    }

    // ------------------------------------------------------------------
    // Token plumbing
    // ------------------------------------------------------------------

    fn current(&self) -> Token {
        self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn kind(&self) -> TokenKind {
        self.current().kind
    }

    fn peek_kind(&self, n: usize) -> TokenKind {
        self.tokens[(self.pos + n).min(self.tokens.len() - 1)].kind
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.kind() == kind
    }

    fn advance(&mut self) -> Token {
        let token = self.current();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, kind: TokenKind) -> Option<Token> {
        if self.at(kind) {
            Some(self.advance())
        } else {
            None
        }
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> IrResult<Token> {
        if self.at(kind) {
            Ok(self.advance())
        } else {
            Err(self.error(format!("expected {what}")))
        }
    }

    fn error(&self, message: impl Into<String>) -> IrError {
        IrError::syntax(message, self.current())
    }

    fn text(&self, token: Token) -> &str {
        self.source.token_text(token)
    }

    fn semicolon(&mut self) {
        // Semicolons are optional at statement boundaries.
        self.eat(TokenKind::Semicolon);
    }

    fn current_fn_flags(&mut self) -> &mut FunctionFlags {
        self.fn_stack.last_mut().expect("inside a function")
    }

    fn note_eval_call(&mut self) {
        let depth = self.fn_stack.len();
        for (i, flags) in self.fn_stack.iter_mut().enumerate() {
            if i == depth - 1 {
                *flags |= FunctionFlags::HAS_EVAL;
            } else {
                *flags |= FunctionFlags::HAS_NESTED_EVAL;
            }
        }
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    fn statement(&mut self, out: &mut Vec<Stmt>) -> IrResult<()> {
        match self.kind() {
            TokenKind::BraceOpen => {
                let block = self.block()?;
                out.push(Stmt::Block(Box::new(block)));
            }
            TokenKind::Var => self.var_statement(DeclKind::Var, out)?,
            TokenKind::Let => self.var_statement(DeclKind::Let, out)?,
            TokenKind::Const => self.var_statement(DeclKind::Const, out)?,
            TokenKind::Function => out.push(self.function_declaration()?),
            TokenKind::If => out.push(self.if_statement()?),
            TokenKind::While => out.push(self.while_statement()?),
            TokenKind::For => out.push(self.for_statement()?),
            TokenKind::Switch => out.push(self.switch_statement()?),
            TokenKind::Try => out.push(self.try_statement()?),
            TokenKind::Throw => out.push(self.throw_statement()?),
            TokenKind::Return => out.push(self.return_statement()?),
            TokenKind::Break => out.push(self.jump_statement(true)?),
            TokenKind::Continue => out.push(self.jump_statement(false)?),
            TokenKind::Debugger => {
                let token = self.advance();
                self.semicolon();
                out.push(Stmt::Debugger(DebuggerNode {
                    token,
                    finish: token.finish(),
                }));
            }
            TokenKind::Semicolon => {
                let token = self.advance();
                out.push(Stmt::Empty(EmptyNode {
                    token,
                    finish: token.finish(),
                }));
            }
            TokenKind::Ident if self.peek_kind(1) == TokenKind::Colon => {
                out.push(self.label_statement()?);
            }
            _ => {
                let token = self.current();
                let expression = self.expression(false)?;
                self.semicolon();
                out.push(Stmt::Expression(ExpressionStatement {
                    token,
                    finish: expression.finish(),
                    expression,
                }));
            }
        }
        Ok(())
    }

    fn block(&mut self) -> IrResult<Block> {
        let open = self.expect(TokenKind::BraceOpen, "'{'")?;
        let id = self.ids.block_id();
        let mut statements = Vec::new();
        while !self.at(TokenKind::BraceClose) && !self.at(TokenKind::Eof) {
            self.statement(&mut statements)?;
        }
        let close = self.expect(TokenKind::BraceClose, "'}'")?;
        Ok(Block::new(id, open, close.finish(), statements))
    }

    /// A loop or branch body: a braced block, or a single statement wrapped
    /// in a synthetic block.
    fn body_block(&mut self) -> IrResult<Block> {
        if self.at(TokenKind::BraceOpen) {
            return self.block();
        }
        let id = self.ids.block_id();
        let mut statements = Vec::new();
        self.statement(&mut statements)?;
        Ok(Block::synthetic(id, statements))
    }

    fn var_statement(&mut self, kind: DeclKind, out: &mut Vec<Stmt>) -> IrResult<()> {
        let vars = self.var_declaration_list(kind, false)?;
        self.semicolon();
        out.extend(vars.into_iter().map(|v| Stmt::Var(Box::new(v))));
        Ok(())
    }

    fn var_declaration_list(&mut self, kind: DeclKind, no_in: bool) -> IrResult<Vec<VarNode>> {
        let keyword = self.advance();
        let mut vars = Vec::new();
        loop {
            let name_token = self.expect(TokenKind::Ident, "binding name")?;
            let name = IdentNode::new(
                name_token,
                name_token.finish(),
                self.text(name_token).to_string(),
            );
            let init = if self.eat(TokenKind::Assign).is_some() {
                Some(self.assignment_expr(no_in)?)
            } else if kind == DeclKind::Const {
                return Err(self.error("missing const initializer"));
            } else {
                None
            };
            let finish = init.as_ref().map(Expr::finish).unwrap_or(name.finish);
            vars.push(VarNode {
                token: keyword,
                finish,
                kind,
                name,
                init,
                is_function_declaration: false,
            });
            if self.eat(TokenKind::Comma).is_none() {
                break;
            }
        }
        Ok(vars)
    }

    fn function_declaration(&mut self) -> IrResult<Stmt> {
        let function = self.function_literal(true)?;
        let name = IdentNode::new(
            function.name.token,
            function.name.finish,
            function.name.name.clone(),
        );
        let token = function.token;
        let finish = function.finish;
        Ok(Stmt::Var(Box::new(VarNode {
            token,
            finish,
            kind: DeclKind::Var,
            name,
            init: Some(Expr::Function(Box::new(function))),
            is_function_declaration: true,
        })))
    }

    fn function_literal(&mut self, declaration: bool) -> IrResult<FunctionNode> {
        let token = self.expect(TokenKind::Function, "'function'")?;
        let name = if self.at(TokenKind::Ident) {
            let t = self.advance();
            Some(IdentNode::new(t, t.finish(), self.text(t).to_string()))
        } else if declaration {
            return Err(self.error("function declaration requires a name"));
        } else {
            None
        };

        self.expect(TokenKind::ParenOpen, "'('")?;
        let mut params = Vec::new();
        while !self.at(TokenKind::ParenClose) {
            let t = self.expect(TokenKind::Ident, "parameter name")?;
            params.push(IdentNode::new(t, t.finish(), self.text(t).to_string()));
            if self.eat(TokenKind::Comma).is_none() {
                break;
            }
        }
        self.expect(TokenKind::ParenClose, "')'")?;

        let fn_id = self.ids.function_id();
        self.fn_stack.push(FunctionFlags::empty());
        let mut body = self.block()?;
        let mut flags = self.fn_stack.pop().expect("function flags");
        body.flags |= BlockFlags::IS_FUNCTION_BODY;

        if flags.intersects(FunctionFlags::HAS_EVAL | FunctionFlags::NEEDS_ARGUMENTS) {
            flags |= FunctionFlags::IS_VARARG;
        }
        if flags.contains(FunctionFlags::HAS_EVAL) {
            body.flags |= BlockFlags::IS_DYNAMIC_BOUNDARY;
        }
        if flags.intersects(FunctionFlags::HAS_EVAL | FunctionFlags::HAS_NESTED_EVAL) {
            // Anything visible to a deep eval must survive in scope storage.
            flags |= FunctionFlags::ALL_VARS_IN_SCOPE;
        }
        flags |= match (&name, declaration) {
            (_, true) => FunctionFlags::IS_DECLARED,
            (Some(_), false) => FunctionFlags::IS_NAMED_FUNCTION_EXPRESSION,
            (None, false) => FunctionFlags::IS_ANONYMOUS,
        };

        let finish = body.finish;
        let name =
            name.unwrap_or_else(|| IdentNode::synthetic(format!(":anon-{}", fn_id.as_u32())));
        Ok(FunctionNode {
            token,
            finish,
            id: fn_id,
            name,
            params,
            body,
            flags,
            return_type: JsType::Unknown,
            compile_unit: None,
            this_property_count: 0,
        })
    }

    fn if_statement(&mut self) -> IrResult<Stmt> {
        let token = self.advance();
        self.expect(TokenKind::ParenOpen, "'('")?;
        let test = self.expression(false)?;
        self.expect(TokenKind::ParenClose, "')'")?;
        let pass = self.body_block()?;
        let fail = if self.eat(TokenKind::Else).is_some() {
            Some(self.body_block()?)
        } else {
            None
        };
        let finish = fail.as_ref().map(|b| b.finish).unwrap_or(pass.finish);
        Ok(Stmt::If(Box::new(IfNode {
            token,
            finish,
            test,
            pass,
            fail,
        })))
    }

    fn while_statement(&mut self) -> IrResult<Stmt> {
        let token = self.advance();
        self.expect(TokenKind::ParenOpen, "'('")?;
        let test = self.expression(false)?;
        self.expect(TokenKind::ParenClose, "')'")?;
        let body = self.body_block()?;
        let finish = body.finish;
        Ok(Stmt::While(Box::new(WhileNode {
            token,
            finish,
            test,
            body,
        })))
    }

    fn for_statement(&mut self) -> IrResult<Stmt> {
        let token = self.advance();
        self.expect(TokenKind::ParenOpen, "'('")?;

        let mut init = None;
        let mut block_scoped_head = false;
        if !self.at(TokenKind::Semicolon) {
            if matches!(self.kind(), TokenKind::Var | TokenKind::Let | TokenKind::Const) {
                let kind = match self.kind() {
                    TokenKind::Var => DeclKind::Var,
                    TokenKind::Let => DeclKind::Let,
                    _ => DeclKind::Const,
                };
                block_scoped_head = kind.is_block_scoped();
                let vars = self.var_declaration_list(kind, true)?;
                if let Some(for_kind) = self.iteration_kind() {
                    if vars.len() != 1 || vars[0].init.is_some() {
                        return Err(self.error("invalid for-in binding"));
                    }
                    let stmt = self.finish_for_each(token, for_kind, ForInit::Var(vars))?;
                    return Ok(self.wrap_loop_head_scope(stmt, block_scoped_head));
                }
                init = Some(ForInit::Var(vars));
            } else {
                let expression = self.expression(true)?;
                if let Some(for_kind) = self.iteration_kind() {
                    if !expression.is_base_node() {
                        return Err(self.error("invalid for-in target"));
                    }
                    return self.finish_for_each(token, for_kind, ForInit::Expr(expression));
                }
                init = Some(ForInit::Expr(expression));
            }
        }
        self.expect(TokenKind::Semicolon, "';'")?;

        let test = if self.at(TokenKind::Semicolon) {
            None
        } else {
            Some(self.expression(false)?)
        };
        self.expect(TokenKind::Semicolon, "';'")?;

        let modify = if self.at(TokenKind::ParenClose) {
            None
        } else {
            Some(self.expression(false)?)
        };
        self.expect(TokenKind::ParenClose, "')'")?;

        let body = self.body_block()?;
        let finish = body.finish;
        let stmt = Stmt::For(Box::new(ForNode {
            token,
            finish,
            kind: ForKind::For,
            init,
            test,
            modify,
            body,
        }));
        Ok(self.wrap_loop_head_scope(stmt, block_scoped_head))
    }

    /// A `let`/`const` loop head lives in a block of its own, so sibling
    /// loops can reuse binding names.
    fn wrap_loop_head_scope(&mut self, stmt: Stmt, block_scoped: bool) -> Stmt {
        if !block_scoped {
            return stmt;
        }
        let id = self.ids.block_id();
        Stmt::Block(Box::new(Block::synthetic(id, vec![stmt])))
    }

    fn iteration_kind(&mut self) -> Option<ForKind> {
        if self.eat(TokenKind::In).is_some() {
            Some(ForKind::ForIn)
        } else if self.at(TokenKind::Of) {
            self.advance();
            Some(ForKind::ForOf)
        } else {
            None
        }
    }

    fn finish_for_each(&mut self, token: Token, kind: ForKind, init: ForInit) -> IrResult<Stmt> {
        let collection = self.assignment_expr(false)?;
        self.expect(TokenKind::ParenClose, "')'")?;
        let body = self.body_block()?;
        let finish = body.finish;
        Ok(Stmt::For(Box::new(ForNode {
            token,
            finish,
            kind,
            init: Some(init),
            test: None,
            modify: Some(collection),
            body,
        })))
    }

    fn switch_statement(&mut self) -> IrResult<Stmt> {
        let token = self.advance();
        self.expect(TokenKind::ParenOpen, "'('")?;
        let expression = self.expression(false)?;
        self.expect(TokenKind::ParenClose, "')'")?;
        self.expect(TokenKind::BraceOpen, "'{'")?;

        let mut cases = Vec::new();
        let mut seen_default = false;
        while !self.at(TokenKind::BraceClose) && !self.at(TokenKind::Eof) {
            let case_token = self.current();
            let test = if self.eat(TokenKind::Case).is_some() {
                Some(self.expression(false)?)
            } else if self.at(TokenKind::Default) {
                if seen_default {
                    return Err(self.error("duplicate default clause"));
                }
                seen_default = true;
                self.advance();
                None
            } else {
                return Err(self.error("expected 'case' or 'default'"));
            };
            self.expect(TokenKind::Colon, "':'")?;

            let body_id = self.ids.block_id();
            let mut statements = Vec::new();
            while !matches!(
                self.kind(),
                TokenKind::Case | TokenKind::Default | TokenKind::BraceClose | TokenKind::Eof
            ) {
                self.statement(&mut statements)?;
            }
            let mut body = Block::synthetic(body_id, statements);
            body.flags |= BlockFlags::IS_CASE_BODY;
            let finish = body.finish;
            cases.push(CaseNode {
                token: case_token,
                finish,
                test,
                body,
            });
        }
        let close = self.expect(TokenKind::BraceClose, "'}'")?;

        Ok(Stmt::Switch(Box::new(SwitchNode {
            token,
            finish: close.finish(),
            expression,
            cases,
            unique_integer: false,
            tag: None,
        })))
    }

    fn try_statement(&mut self) -> IrResult<Stmt> {
        let token = self.advance();
        let body = self.block()?;

        let mut catches = Vec::new();
        while self.at(TokenKind::Catch) {
            let catch_token = self.advance();
            self.expect(TokenKind::ParenOpen, "'('")?;
            let name_token = self.expect(TokenKind::Ident, "exception name")?;
            let exception = IdentNode::new(
                name_token,
                name_token.finish(),
                self.text(name_token).to_string(),
            );
            self.expect(TokenKind::ParenClose, "')'")?;
            let catch_body = self.block()?;
            let finish = catch_body.finish;
            catches.push(CatchNode {
                token: catch_token,
                finish,
                exception,
                condition: None,
                body: catch_body,
                is_synthetic_rethrow: false,
            });
        }

        let finally_body = if self.eat(TokenKind::Finally).is_some() {
            Some(self.block()?)
        } else {
            None
        };

        if catches.is_empty() && finally_body.is_none() {
            return Err(self.error("missing catch or finally after try"));
        }

        let finish = finally_body
            .as_ref()
            .map(|b| b.finish)
            .or_else(|| catches.last().map(|c| c.finish))
            .unwrap_or(body.finish);
        Ok(Stmt::Try(Box::new(TryNode {
            token,
            finish,
            body,
            catches,
            finally_body,
            inlined_finallies: Vec::new(),
        })))
    }

    fn throw_statement(&mut self) -> IrResult<Stmt> {
        let token = self.advance();
        let expression = self.expression(false)?;
        self.semicolon();
        Ok(Stmt::Throw(Box::new(ThrowNode {
            token,
            finish: expression.finish(),
            expression,
            is_synthetic_rethrow: false,
        })))
    }

    fn return_statement(&mut self) -> IrResult<Stmt> {
        let token = self.advance();
        let expression = if matches!(
            self.kind(),
            TokenKind::Semicolon | TokenKind::BraceClose | TokenKind::Eof
        ) {
            None
        } else {
            Some(self.expression(false)?)
        };
        self.semicolon();
        let finish = expression
            .as_ref()
            .map(Expr::finish)
            .unwrap_or(token.finish());
        Ok(Stmt::Return(Box::new(ReturnNode {
            token,
            finish,
            expression,
        })))
    }

    fn jump_statement(&mut self, is_break: bool) -> IrResult<Stmt> {
        let token = self.advance();
        let label = if self.at(TokenKind::Ident) {
            let t = self.advance();
            Some(self.text(t).to_string())
        } else {
            None
        };
        self.semicolon();
        let finish = token.finish();
        Ok(if is_break {
            Stmt::Break(BreakNode {
                token,
                finish,
                label,
            })
        } else {
            Stmt::Continue(ContinueNode {
                token,
                finish,
                label,
            })
        })
    }

    fn label_statement(&mut self) -> IrResult<Stmt> {
        let name_token = self.advance();
        let name = self.text(name_token).to_string();
        self.expect(TokenKind::Colon, "':'")?;
        let body = self.body_block()?;
        let finish = body.finish;
        Ok(Stmt::Label(Box::new(LabelNode {
            token: name_token,
            finish,
            name,
            body,
        })))
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    fn expression(&mut self, no_in: bool) -> IrResult<Expr> {
        let mut expression = self.assignment_expr(no_in)?;
        while let Some(comma) = self.eat(TokenKind::Comma) {
            let rhs = self.assignment_expr(no_in)?;
            expression = Expr::Binary(Box::new(BinaryNode {
                token: comma,
                finish: rhs.finish(),
                op: BinaryOp::Comma,
                lhs: expression,
                rhs,
                program_point: None,
                opt_type: None,
            }));
        }
        Ok(expression)
    }

    fn assignment_expr(&mut self, no_in: bool) -> IrResult<Expr> {
        let lhs = self.ternary_expr(no_in)?;
        let op = match self.kind() {
            TokenKind::Assign => BinaryOp::Assign,
            TokenKind::AssignAdd => BinaryOp::AssignAdd,
            TokenKind::AssignSub => BinaryOp::AssignSub,
            TokenKind::AssignMul => BinaryOp::AssignMul,
            TokenKind::AssignDiv => BinaryOp::AssignDiv,
            TokenKind::AssignMod => BinaryOp::AssignMod,
            _ => return Ok(lhs),
        };
        if !lhs.is_base_node() {
            return Err(self.error("invalid assignment target"));
        }
        let token = self.advance();
        let rhs = self.assignment_expr(no_in)?;
        Ok(Expr::Binary(Box::new(BinaryNode {
            token,
            finish: rhs.finish(),
            op,
            lhs,
            rhs,
            program_point: None,
            opt_type: None,
        })))
    }

    fn ternary_expr(&mut self, no_in: bool) -> IrResult<Expr> {
        let test = self.binary_expr(1, no_in)?;
        let Some(question) = self.eat(TokenKind::Question) else {
            return Ok(test);
        };
        let consequent = self.assignment_expr(false)?;
        self.expect(TokenKind::Colon, "':'")?;
        let alternate = self.assignment_expr(no_in)?;
        Ok(Expr::Ternary(Box::new(TernaryNode {
            token: question,
            finish: alternate.finish(),
            test,
            consequent,
            alternate,
        })))
    }

    fn binary_op(&self, no_in: bool) -> Option<(BinaryOp, u8)> {
        let (op, prec) = match self.kind() {
            TokenKind::PipePipe => (BinaryOp::LogicalOr, 1),
            TokenKind::AmpAmp => (BinaryOp::LogicalAnd, 2),
            TokenKind::Pipe => (BinaryOp::BitOr, 3),
            TokenKind::Caret => (BinaryOp::BitXor, 4),
            TokenKind::Amp => (BinaryOp::BitAnd, 5),
            TokenKind::EqEq => (BinaryOp::Eq, 6),
            TokenKind::NotEq => (BinaryOp::Ne, 6),
            TokenKind::EqEqEq => (BinaryOp::StrictEq, 6),
            TokenKind::NotEqEq => (BinaryOp::StrictNe, 6),
            TokenKind::Lt => (BinaryOp::Lt, 7),
            TokenKind::Gt => (BinaryOp::Gt, 7),
            TokenKind::Le => (BinaryOp::Le, 7),
            TokenKind::Ge => (BinaryOp::Ge, 7),
            TokenKind::Instanceof => (BinaryOp::Instanceof, 7),
            TokenKind::In if !no_in => (BinaryOp::In, 7),
            TokenKind::Shl => (BinaryOp::Shl, 8),
            TokenKind::Shr => (BinaryOp::Shr, 8),
            TokenKind::Ushr => (BinaryOp::Ushr, 8),
            TokenKind::Plus => (BinaryOp::Add, 9),
            TokenKind::Minus => (BinaryOp::Sub, 9),
            TokenKind::Star => (BinaryOp::Mul, 10),
            TokenKind::Slash => (BinaryOp::Div, 10),
            TokenKind::Percent => (BinaryOp::Mod, 10),
            _ => return None,
        };
        Some((op, prec))
    }

    fn binary_expr(&mut self, min_prec: u8, no_in: bool) -> IrResult<Expr> {
        let mut lhs = self.unary_expr()?;
        while let Some((op, prec)) = self.binary_op(no_in) {
            if prec < min_prec {
                break;
            }
            let token = self.advance();
            let rhs = self.binary_expr(prec + 1, no_in)?;
            lhs = Expr::Binary(Box::new(BinaryNode {
                token,
                finish: rhs.finish(),
                op,
                lhs,
                rhs,
                program_point: None,
                opt_type: None,
            }));
        }
        Ok(lhs)
    }

    fn unary_expr(&mut self) -> IrResult<Expr> {
        let op = match self.kind() {
            TokenKind::Plus => Some(UnaryOp::Pos),
            TokenKind::Minus => Some(UnaryOp::Neg),
            TokenKind::Bang => Some(UnaryOp::Not),
            TokenKind::Tilde => Some(UnaryOp::BitNot),
            TokenKind::Typeof => Some(UnaryOp::Typeof),
            TokenKind::Delete => Some(UnaryOp::Delete),
            TokenKind::Void => Some(UnaryOp::Void),
            TokenKind::PlusPlus => Some(UnaryOp::IncPrefix),
            TokenKind::MinusMinus => Some(UnaryOp::DecPrefix),
            _ => None,
        };
        if let Some(op) = op {
            let token = self.advance();
            let operand = self.unary_expr()?;
            if op.is_self_modifying() && !operand.is_base_node() {
                return Err(self.error("invalid increment operand"));
            }
            return Ok(Expr::Unary(Box::new(UnaryNode {
                token,
                finish: operand.finish(),
                op,
                operand,
                program_point: None,
                opt_type: None,
            })));
        }

        let expression = self.lhs_expr()?;
        let postfix = match self.kind() {
            TokenKind::PlusPlus => Some(UnaryOp::IncPostfix),
            TokenKind::MinusMinus => Some(UnaryOp::DecPostfix),
            _ => None,
        };
        if let Some(op) = postfix {
            if !expression.is_base_node() {
                return Err(self.error("invalid increment operand"));
            }
            let token = self.advance();
            return Ok(Expr::Unary(Box::new(UnaryNode {
                token,
                finish: token.finish(),
                op,
                operand: expression,
                program_point: None,
                opt_type: None,
            })));
        }
        Ok(expression)
    }

    fn lhs_expr(&mut self) -> IrResult<Expr> {
        let mut expression = if self.at(TokenKind::New) {
            self.new_expr()?
        } else {
            self.primary_expr()?
        };
        loop {
            match self.kind() {
                TokenKind::ParenOpen => {
                    let token = self.current();
                    let args = self.call_arguments()?;
                    let is_eval = matches!(&expression, Expr::Ident(n) if n.name == consts::EVAL);
                    if is_eval {
                        self.note_eval_call();
                    }
                    let finish = self.tokens[self.pos - 1].finish();
                    expression = Expr::Call(Box::new(CallNode {
                        token,
                        finish,
                        function: expression,
                        args,
                        is_new: false,
                        is_eval,
                        program_point: None,
                        opt_type: None,
                    }));
                }
                TokenKind::Dot => {
                    self.advance();
                    let name_token = self.expect(TokenKind::Ident, "property name")?;
                    expression = Expr::Access(Box::new(AccessNode {
                        token: name_token,
                        finish: name_token.finish(),
                        base: expression,
                        property: self.text(name_token).to_string(),
                        program_point: None,
                        opt_type: None,
                    }));
                }
                TokenKind::BracketOpen => {
                    let token = self.advance();
                    let index = self.expression(false)?;
                    let close = self.expect(TokenKind::BracketClose, "']'")?;
                    expression = Expr::Index(Box::new(IndexNode {
                        token,
                        finish: close.finish(),
                        base: expression,
                        index,
                        program_point: None,
                        opt_type: None,
                    }));
                }
                _ => break,
            }
        }
        Ok(expression)
    }

    fn new_expr(&mut self) -> IrResult<Expr> {
        let token = self.expect(TokenKind::New, "'new'")?;
        let mut callee = if self.at(TokenKind::New) {
            self.new_expr()?
        } else {
            self.primary_expr()?
        };
        // Member chains bind tighter than the constructor call.
        loop {
            match self.kind() {
                TokenKind::Dot => {
                    self.advance();
                    let name_token = self.expect(TokenKind::Ident, "property name")?;
                    callee = Expr::Access(Box::new(AccessNode {
                        token: name_token,
                        finish: name_token.finish(),
                        base: callee,
                        property: self.text(name_token).to_string(),
                        program_point: None,
                        opt_type: None,
                    }));
                }
                TokenKind::BracketOpen => {
                    let bracket = self.advance();
                    let index = self.expression(false)?;
                    let close = self.expect(TokenKind::BracketClose, "']'")?;
                    callee = Expr::Index(Box::new(IndexNode {
                        token: bracket,
                        finish: close.finish(),
                        base: callee,
                        index,
                        program_point: None,
                        opt_type: None,
                    }));
                }
                _ => break,
            }
        }
        let args = if self.at(TokenKind::ParenOpen) {
            self.call_arguments()?
        } else {
            Vec::new()
        };
        let finish = self.tokens[self.pos - 1].finish();
        Ok(Expr::Call(Box::new(CallNode {
            token,
            finish,
            function: callee,
            args,
            is_new: true,
            is_eval: false,
            program_point: None,
            opt_type: None,
        })))
    }

    fn call_arguments(&mut self) -> IrResult<Vec<Expr>> {
        self.expect(TokenKind::ParenOpen, "'('")?;
        let mut args = Vec::new();
        while !self.at(TokenKind::ParenClose) {
            args.push(self.assignment_expr(false)?);
            if self.eat(TokenKind::Comma).is_none() {
                break;
            }
        }
        self.expect(TokenKind::ParenClose, "')'")?;
        Ok(args)
    }

    fn primary_expr(&mut self) -> IrResult<Expr> {
        match self.kind() {
            TokenKind::Ident => {
                let token = self.advance();
                let name = self.text(token).to_string();
                if name == consts::ARGUMENTS_VAR {
                    *self.current_fn_flags() |= FunctionFlags::NEEDS_ARGUMENTS;
                }
                Ok(Expr::Ident(IdentNode::new(token, token.finish(), name)))
            }
            TokenKind::This => {
                let token = self.advance();
                Ok(Expr::Ident(IdentNode::new(
                    token,
                    token.finish(),
                    consts::THIS,
                )))
            }
            TokenKind::Number => {
                let token = self.advance();
                let value = lexer::parse_number(self.text(token));
                Ok(Expr::Literal(LiteralNode::new(token, token.finish(), value)))
            }
            TokenKind::Str => {
                let token = self.advance();
                let value = LiteralValue::Str(lexer::parse_string(self.text(token)));
                Ok(Expr::Literal(LiteralNode::new(token, token.finish(), value)))
            }
            TokenKind::True | TokenKind::False => {
                let token = self.advance();
                let value = LiteralValue::Boolean(token.kind == TokenKind::True);
                Ok(Expr::Literal(LiteralNode::new(token, token.finish(), value)))
            }
            TokenKind::Null => {
                let token = self.advance();
                Ok(Expr::Literal(LiteralNode::new(
                    token,
                    token.finish(),
                    LiteralValue::Null,
                )))
            }
            TokenKind::BracketOpen => self.array_literal(),
            TokenKind::BraceOpen => self.object_literal(),
            TokenKind::ParenOpen => {
                self.advance();
                let expression = self.expression(false)?;
                self.expect(TokenKind::ParenClose, "')'")?;
                Ok(expression)
            }
            TokenKind::Function => Ok(Expr::Function(Box::new(self.function_literal(false)?))),
            _ => Err(self.error("expected an expression")),
        }
    }

    fn array_literal(&mut self) -> IrResult<Expr> {
        let open = self.expect(TokenKind::BracketOpen, "'['")?;
        let mut elements = Vec::new();
        while !self.at(TokenKind::BracketClose) {
            if self.eat(TokenKind::Comma).is_some() {
                elements.push(None);
                continue;
            }
            elements.push(Some(self.assignment_expr(false)?));
            if !self.at(TokenKind::BracketClose) {
                self.expect(TokenKind::Comma, "','")?;
            }
        }
        let close = self.expect(TokenKind::BracketClose, "']'")?;
        Ok(Expr::ArrayLiteral(ArrayLiteralNode {
            token: open,
            finish: close.finish(),
            elements,
            units: Vec::new(),
        }))
    }

    fn object_literal(&mut self) -> IrResult<Expr> {
        let open = self.expect(TokenKind::BraceOpen, "'{'")?;
        let mut properties = Vec::new();
        while !self.at(TokenKind::BraceClose) {
            let key_token = self.current();
            let key = match self.kind() {
                TokenKind::Ident => {
                    let t = self.advance();
                    PropertyKey::Ident(self.text(t).to_string())
                }
                TokenKind::Str => {
                    let t = self.advance();
                    PropertyKey::Str(lexer::parse_string(self.text(t)))
                }
                TokenKind::Number => {
                    let t = self.advance();
                    let n = match lexer::parse_number(self.text(t)) {
                        LiteralValue::Int(v) => f64::from(v),
                        LiteralValue::Long(v) => v as f64,
                        LiteralValue::Number(v) => v,
                        _ => 0.0,
                    };
                    PropertyKey::Number(n)
                }
                _ => return Err(self.error("expected a property key")),
            };
            self.expect(TokenKind::Colon, "':'")?;
            let value = self.assignment_expr(false)?;
            let finish = value.finish();
            properties.push(PropertyNode {
                token: key_token,
                finish,
                key,
                value,
            });
            if self.eat(TokenKind::Comma).is_none() {
                break;
            }
        }
        let close = self.expect(TokenKind::BraceClose, "'}'")?;
        Ok(Expr::ObjectLiteral(ObjectNode {
            token: open,
            finish: close.finish(),
            properties,
            units: Vec::new(),
        }))
    }
}
