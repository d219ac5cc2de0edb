//! Statement node variants.

use bitflags::bitflags;

use crate::node::expr::IdentNode;
use crate::node::{BlockId, CompileUnitId, Expr, Stmt};
use crate::symbol::SymbolId;
use crate::token::Token;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct BlockFlags: u16 {
        /// At least one symbol in this block lives in a runtime scope object.
        const NEEDS_SCOPE = 1 << 0;
        /// Manufactured by the parser or a pass, not written by the user.
        const IS_SYNTHETIC = 1 << 1;
        /// Body block of a function.
        const IS_FUNCTION_BODY = 1 << 2;
        /// Body of a switch case; `let`/`const` directly here is an error.
        const IS_CASE_BODY = 1 << 3;
        /// Body of a split node; a scope boundary for symbol resolution.
        const IS_SPLIT_BODY = 1 << 4;
        /// Dynamic-scope boundary (function body containing a direct eval).
        const IS_DYNAMIC_BOUNDARY = 1 << 5;
        /// A jump out of an enclosed loop passes through this block, so it
        /// never completes normally even if its last statement is terminal.
        const CONTROL_FLOW_ESCAPES = 1 << 6;
    }
}

/// A sequence of statements with its own symbol scope. Symbols live in the
/// compilation's `SymbolTable`, keyed by the block id.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub token: Token,
    pub finish: u32,
    pub id: BlockId,
    pub flags: BlockFlags,
    pub statements: Vec<Stmt>,
}

impl Block {
    pub fn new(id: BlockId, token: Token, finish: u32, statements: Vec<Stmt>) -> Self {
        Self {
            token,
            finish,
            id,
            flags: BlockFlags::empty(),
            statements,
        }
    }

    pub fn synthetic(id: BlockId, statements: Vec<Stmt>) -> Self {
        let token = statements.first().map(Stmt::token).unwrap_or_default();
        let finish = statements.last().map(Stmt::finish).unwrap_or(0);
        let mut block = Self::new(id, token, finish, statements);
        block.flags |= BlockFlags::IS_SYNTHETIC;
        block
    }

    /// Stand-in used while a block is detached during transformation.
    pub fn placeholder() -> Self {
        Self::new(BlockId::PLACEHOLDER, Token::synthetic(), 0, Vec::new())
    }

    pub fn needs_scope(&self) -> bool {
        self.flags.contains(BlockFlags::NEEDS_SCOPE)
    }

    /// True iff the last non-uninitialized-var statement cannot complete
    /// normally.
    pub fn is_terminal(&self) -> bool {
        if self.flags.contains(BlockFlags::CONTROL_FLOW_ESCAPES) {
            return false;
        }
        for stmt in self.statements.iter().rev() {
            match stmt {
                Stmt::Var(v) if v.init.is_none() => continue,
                _ => return stmt.terminates_flow(),
            }
        }
        false
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclKind {
    Var,
    Let,
    Const,
}

impl DeclKind {
    pub fn is_block_scoped(self) -> bool {
        matches!(self, DeclKind::Let | DeclKind::Const)
    }
}

/// A single declaration. Function declarations are hoisted as var nodes
/// wrapping the function expression.
#[derive(Debug, Clone, PartialEq)]
pub struct VarNode {
    pub token: Token,
    pub finish: u32,
    pub kind: DeclKind,
    pub name: IdentNode,
    pub init: Option<Expr>,
    pub is_function_declaration: bool,
}

impl VarNode {
    /// Copy of the declaration with the initializer dropped, used when
    /// preserving hoisting semantics of dead code.
    pub fn without_init(&self) -> VarNode {
        VarNode {
            token: self.token,
            finish: self.finish,
            kind: self.kind,
            name: IdentNode::new(self.name.token, self.name.finish, self.name.name.clone()),
            init: None,
            is_function_declaration: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExpressionStatement {
    pub token: Token,
    pub finish: u32,
    pub expression: Expr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmptyNode {
    pub token: Token,
    pub finish: u32,
}

/// Branches are always blocks; the parser wraps single statements.
#[derive(Debug, Clone, PartialEq)]
pub struct IfNode {
    pub token: Token,
    pub finish: u32,
    pub test: Expr,
    pub pass: Block,
    pub fail: Option<Block>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SwitchNode {
    pub token: Token,
    pub finish: u32,
    pub expression: Expr,
    pub cases: Vec<CaseNode>,
    /// All case tests are distinct integer literals; eligible for a
    /// table-switch and needs no hoisted tag symbol.
    pub unique_integer: bool,
    pub tag: Option<SymbolId>,
}

impl SwitchNode {
    pub fn has_default(&self) -> bool {
        self.cases.iter().any(|c| c.test.is_none())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaseNode {
    pub token: Token,
    pub finish: u32,
    /// `None` for the default case.
    pub test: Option<Expr>,
    pub body: Block,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WhileNode {
    pub token: Token,
    pub finish: u32,
    pub test: Expr,
    pub body: Block,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForKind {
    For,
    ForIn,
    ForOf,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ForInit {
    Var(Vec<VarNode>),
    Expr(Expr),
}

/// All three `for` forms. For `for-in`/`for-of`, `init` holds the iteration
/// target and `modify` the iterated collection.
#[derive(Debug, Clone, PartialEq)]
pub struct ForNode {
    pub token: Token,
    pub finish: u32,
    pub kind: ForKind,
    pub init: Option<ForInit>,
    pub test: Option<Expr>,
    pub modify: Option<Expr>,
    pub body: Block,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TryNode {
    pub token: Token,
    pub finish: u32,
    pub body: Block,
    pub catches: Vec<CatchNode>,
    pub finally_body: Option<Block>,
    /// Labelled clones of the finally body spliced onto exit edges during
    /// lowering; jump statements reference them by label.
    pub inlined_finallies: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CatchNode {
    pub token: Token,
    pub finish: u32,
    pub exception: IdentNode,
    /// Conditional-catch guard; carried for the pipeline but never produced
    /// by the parser subset.
    pub condition: Option<Expr>,
    pub body: Block,
    /// Catch-all manufactured by try/finally lowering.
    pub is_synthetic_rethrow: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ThrowNode {
    pub token: Token,
    pub finish: u32,
    pub expression: Expr,
    /// Rethrow inside a synthetic catch-all; finally splicing keys on it.
    pub is_synthetic_rethrow: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReturnNode {
    pub token: Token,
    pub finish: u32,
    pub expression: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BreakNode {
    pub token: Token,
    pub finish: u32,
    pub label: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContinueNode {
    pub token: Token,
    pub finish: u32,
    pub label: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LabelNode {
    pub token: Token,
    pub finish: u32,
    pub name: String,
    pub body: Block,
}

/// Jump to a labelled inlined-finally clone. Never rewritten once created.
#[derive(Debug, Clone, PartialEq)]
pub struct JumpToInlinedFinallyNode {
    pub token: Token,
    pub finish: u32,
    pub label: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebuggerNode {
    pub token: Token,
    pub finish: u32,
}

/// A partition of an oversized block, compiled into its own compile unit.
#[derive(Debug, Clone, PartialEq)]
pub struct SplitNode {
    pub token: Token,
    pub finish: u32,
    pub body: Block,
    pub unit: CompileUnitId,
}
