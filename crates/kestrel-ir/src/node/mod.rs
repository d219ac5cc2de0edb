//! The IR node model: a closed sum type of expression and statement nodes.
//!
//! Nodes are plain owned data. Passes take nodes by value and return
//! (possibly) new nodes; untouched subtrees move through unchanged.

pub mod expr;
pub mod function;
pub mod literal;
pub mod stmt;

pub use expr::{
    AccessNode, ArrayLiteralNode, BinaryNode, BinaryOp, CallNode, IdentNode, IndexNode,
    JoinPredecessorExpr, LiteralNode, ObjectNode, PropertyKey, PropertyNode, RuntimeNode,
    RuntimeOp, SplitRange, TernaryNode, UnaryNode, UnaryOp,
};
pub use function::{FunctionFlags, FunctionNode};
pub use literal::LiteralValue;
pub use stmt::{
    Block, BlockFlags, BreakNode, CaseNode, CatchNode, ContinueNode, DebuggerNode, DeclKind,
    EmptyNode, ExpressionStatement, ForInit, ForKind, ForNode, IfNode, JumpToInlinedFinallyNode,
    LabelNode, ReturnNode, SplitNode, SwitchNode, ThrowNode, TryNode, VarNode, WhileNode,
};

use crate::token::Token;

/// First value handed out by the program-point allocator.
pub const FIRST_PROGRAM_POINT: u32 = 1;

/// Program points are packed into 17 bits downstream; exceeding this is an
/// internal error.
pub const MAX_PROGRAM_POINT_VALUE: u32 = (1 << 17) - 1;

macro_rules! id_type {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
        pub struct $name(u32);

        impl $name {
            #[inline]
            pub fn from_raw(index: u32) -> Self {
                Self(index)
            }

            #[inline]
            pub fn as_u32(self) -> u32 {
                self.0
            }

            #[inline]
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }
    };
}

id_type! {
    /// Numeric id of a function node, unique within a compilation.
    FnId
}

id_type! {
    /// Id of a block, unique within a compilation; keys per-block symbol
    /// maps in the symbol table.
    BlockId
}

id_type! {
    /// A partition of the output program; each maps to one generated class
    /// in the emitter.
    CompileUnitId
}

impl BlockId {
    /// Id of the stand-in block used while a body is detached.
    pub const PLACEHOLDER: BlockId = BlockId(u32::MAX);
}

/// Hands out function and block ids, unique within one compilation. The
/// parser and every pass that manufactures nodes share one allocator.
#[derive(Debug, Clone, Default)]
pub struct IdAllocator {
    next_function: u32,
    next_block: u32,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn function_id(&mut self) -> FnId {
        let id = FnId(self.next_function);
        self.next_function += 1;
        id
    }

    pub fn block_id(&mut self) -> BlockId {
        let id = BlockId(self.next_block);
        self.next_block += 1;
        id
    }
}

/// Expression nodes.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Ident(IdentNode),
    Literal(LiteralNode),
    ArrayLiteral(ArrayLiteralNode),
    ObjectLiteral(ObjectNode),
    Unary(Box<UnaryNode>),
    Binary(Box<BinaryNode>),
    Ternary(Box<TernaryNode>),
    Access(Box<AccessNode>),
    Index(Box<IndexNode>),
    Call(Box<CallNode>),
    Function(Box<FunctionNode>),
    Runtime(RuntimeNode),
    JoinPredecessor(Box<JoinPredecessorExpr>),
}

impl Expr {
    pub fn token(&self) -> Token {
        match self {
            Expr::Ident(n) => n.token,
            Expr::Literal(n) => n.token,
            Expr::ArrayLiteral(n) => n.token,
            Expr::ObjectLiteral(n) => n.token,
            Expr::Unary(n) => n.token,
            Expr::Binary(n) => n.token,
            Expr::Ternary(n) => n.token,
            Expr::Access(n) => n.token,
            Expr::Index(n) => n.token,
            Expr::Call(n) => n.token,
            Expr::Function(n) => n.token,
            Expr::Runtime(n) => n.token,
            Expr::JoinPredecessor(n) => n.token,
        }
    }

    pub fn finish(&self) -> u32 {
        match self {
            Expr::Ident(n) => n.finish,
            Expr::Literal(n) => n.finish,
            Expr::ArrayLiteral(n) => n.finish,
            Expr::ObjectLiteral(n) => n.finish,
            Expr::Unary(n) => n.finish,
            Expr::Binary(n) => n.finish,
            Expr::Ternary(n) => n.finish,
            Expr::Access(n) => n.finish,
            Expr::Index(n) => n.finish,
            Expr::Call(n) => n.finish,
            Expr::Function(n) => n.finish,
            Expr::Runtime(n) => n.finish,
            Expr::JoinPredecessor(n) => n.finish,
        }
    }

    pub fn as_literal(&self) -> Option<&LiteralNode> {
        match self {
            Expr::Literal(n) => Some(n),
            _ => None,
        }
    }

    /// Primitive literal: foldable operand.
    pub fn is_primitive_literal(&self) -> bool {
        matches!(self, Expr::Literal(_))
    }

    pub fn is_ident(&self) -> bool {
        matches!(self, Expr::Ident(_))
    }

    /// Reference to a compiler-internal symbol.
    pub fn is_internal_ident(&self) -> bool {
        matches!(self, Expr::Ident(n) if n.is_internal())
    }

    /// Valid target of a `delete`: an identifier or a property reference.
    pub fn is_base_node(&self) -> bool {
        matches!(self, Expr::Ident(_) | Expr::Access(_) | Expr::Index(_))
    }

    /// Writes its destination as part of evaluating (`++x`, `x += y`).
    pub fn is_self_modifying(&self) -> bool {
        match self {
            Expr::Unary(n) => n.op.is_self_modifying(),
            Expr::Binary(n) => n.op.is_self_modifying(),
            _ => false,
        }
    }

    /// Program point of this node, if one was allocated.
    pub fn program_point(&self) -> Option<u32> {
        match self {
            Expr::Ident(n) => n.program_point,
            Expr::Unary(n) => n.program_point,
            Expr::Binary(n) => n.program_point,
            Expr::Access(n) => n.program_point,
            Expr::Index(n) => n.program_point,
            Expr::Call(n) => n.program_point,
            Expr::JoinPredecessor(n) => n.expression.program_point(),
            _ => None,
        }
    }
}

/// Statement nodes.
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Block(Box<Block>),
    Var(Box<VarNode>),
    Expression(ExpressionStatement),
    Empty(EmptyNode),
    If(Box<IfNode>),
    Switch(Box<SwitchNode>),
    While(Box<WhileNode>),
    For(Box<ForNode>),
    Try(Box<TryNode>),
    Throw(Box<ThrowNode>),
    Return(Box<ReturnNode>),
    Break(BreakNode),
    Continue(ContinueNode),
    Label(Box<LabelNode>),
    JumpToInlinedFinally(JumpToInlinedFinallyNode),
    Debugger(DebuggerNode),
    Split(Box<SplitNode>),
}

impl Stmt {
    pub fn token(&self) -> Token {
        match self {
            Stmt::Block(n) => n.token,
            Stmt::Var(n) => n.token,
            Stmt::Expression(n) => n.token,
            Stmt::Empty(n) => n.token,
            Stmt::If(n) => n.token,
            Stmt::Switch(n) => n.token,
            Stmt::While(n) => n.token,
            Stmt::For(n) => n.token,
            Stmt::Try(n) => n.token,
            Stmt::Throw(n) => n.token,
            Stmt::Return(n) => n.token,
            Stmt::Break(n) => n.token,
            Stmt::Continue(n) => n.token,
            Stmt::Label(n) => n.token,
            Stmt::JumpToInlinedFinally(n) => n.token,
            Stmt::Debugger(n) => n.token,
            Stmt::Split(n) => n.token,
        }
    }

    pub fn finish(&self) -> u32 {
        match self {
            Stmt::Block(n) => n.finish,
            Stmt::Var(n) => n.finish,
            Stmt::Expression(n) => n.finish,
            Stmt::Empty(n) => n.finish,
            Stmt::If(n) => n.finish,
            Stmt::Switch(n) => n.finish,
            Stmt::While(n) => n.finish,
            Stmt::For(n) => n.finish,
            Stmt::Try(n) => n.finish,
            Stmt::Throw(n) => n.finish,
            Stmt::Return(n) => n.finish,
            Stmt::Break(n) => n.finish,
            Stmt::Continue(n) => n.finish,
            Stmt::Label(n) => n.finish,
            Stmt::JumpToInlinedFinally(n) => n.finish,
            Stmt::Debugger(n) => n.finish,
            Stmt::Split(n) => n.finish,
        }
    }

    /// Control cannot fall through this statement.
    pub fn is_terminal(&self) -> bool {
        match self {
            Stmt::Return(_) | Stmt::Throw(_) => true,
            Stmt::Block(b) => b.is_terminal(),
            Stmt::If(i) => match &i.fail {
                Some(fail) => i.pass.is_terminal() && fail.is_terminal(),
                None => false,
            },
            Stmt::Try(t) => {
                t.body.is_terminal() && t.catches.iter().all(|c| c.body.is_terminal())
            }
            // A testless loop only completes via a jump out of its body.
            Stmt::For(f) => {
                f.kind == ForKind::For
                    && f.test.is_none()
                    && !f.body.flags.contains(BlockFlags::CONTROL_FLOW_ESCAPES)
            }
            Stmt::Switch(s) => s.has_default() && s.cases.iter().all(|c| c.body.is_terminal()),
            Stmt::Label(l) => l.body.is_terminal(),
            Stmt::Split(s) => s.body.is_terminal(),
            _ => false,
        }
    }

    /// Transfers control to a label rather than completing.
    pub fn has_goto(&self) -> bool {
        matches!(
            self,
            Stmt::Break(_) | Stmt::Continue(_) | Stmt::JumpToInlinedFinally(_)
        )
    }

    /// Statements after this one in a block are dead.
    pub fn terminates_flow(&self) -> bool {
        self.is_terminal() || self.has_goto()
    }
}

impl From<Block> for Stmt {
    fn from(b: Block) -> Self {
        Stmt::Block(Box::new(b))
    }
}

impl From<VarNode> for Stmt {
    fn from(v: VarNode) -> Self {
        Stmt::Var(Box::new(v))
    }
}

impl From<TryNode> for Stmt {
    fn from(t: TryNode) -> Self {
        Stmt::Try(Box::new(t))
    }
}

impl From<ThrowNode> for Stmt {
    fn from(t: ThrowNode) -> Self {
        Stmt::Throw(Box::new(t))
    }
}

impl From<ReturnNode> for Stmt {
    fn from(r: ReturnNode) -> Self {
        Stmt::Return(Box::new(r))
    }
}

impl From<ExpressionStatement> for Stmt {
    fn from(e: ExpressionStatement) -> Self {
        Stmt::Expression(e)
    }
}

impl From<LabelNode> for Stmt {
    fn from(l: LabelNode) -> Self {
        Stmt::Label(Box::new(l))
    }
}

impl From<IdentNode> for Expr {
    fn from(n: IdentNode) -> Self {
        Expr::Ident(n)
    }
}

impl From<LiteralNode> for Expr {
    fn from(n: LiteralNode) -> Self {
        Expr::Literal(n)
    }
}

impl From<BinaryNode> for Expr {
    fn from(n: BinaryNode) -> Self {
        Expr::Binary(Box::new(n))
    }
}

impl From<UnaryNode> for Expr {
    fn from(n: UnaryNode) -> Self {
        Expr::Unary(Box::new(n))
    }
}

impl From<RuntimeNode> for Expr {
    fn from(n: RuntimeNode) -> Self {
        Expr::Runtime(n)
    }
}

impl From<FunctionNode> for Expr {
    fn from(n: FunctionNode) -> Self {
        Expr::Function(Box::new(n))
    }
}
