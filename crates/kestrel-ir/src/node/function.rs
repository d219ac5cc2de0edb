//! Function nodes: a statement-bearing expression.

use bitflags::bitflags;

use crate::node::expr::IdentNode;
use crate::node::stmt::Block;
use crate::node::{CompileUnitId, FnId};
use crate::token::Token;
use crate::types::JsType;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct FunctionFlags: u32 {
        /// The outermost script function.
        const IS_PROGRAM = 1 << 0;
        /// Takes its arguments as a runtime array rather than fixed slots.
        const IS_VARARG = 1 << 1;
        /// References the `arguments` object.
        const NEEDS_ARGUMENTS = 1 << 2;
        /// Needs a reference to its own function object.
        const NEEDS_CALLEE = 1 << 3;
        /// Captures symbols from an enclosing function's scope.
        const NEEDS_PARENT_SCOPE = 1 << 4;
        /// Named function expression that references itself.
        const USES_SELF_SYMBOL = 1 << 5;
        /// Every variable lives in the scope object (deep eval present).
        const ALL_VARS_IN_SCOPE = 1 << 6;
        /// Contains split sub-structures.
        const IS_SPLIT = 1 << 7;
        /// Carries an apply-to-call specialization; never split.
        const HAS_APPLY_TO_CALL_SPECIALIZATION = 1 << 8;
        /// Defined lexically inside a dynamic scope.
        const IN_DYNAMIC_CONTEXT = 1 << 9;
        const IS_NAMED_FUNCTION_EXPRESSION = 1 << 10;
        /// Contains a direct call to `eval`.
        const HAS_EVAL = 1 << 11;
        /// A nested function contains a direct call to `eval`.
        const HAS_NESTED_EVAL = 1 << 12;
        const IS_ANONYMOUS = 1 << 13;
        /// Function declaration rather than expression.
        const IS_DECLARED = 1 << 14;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionNode {
    pub token: Token,
    pub finish: u32,
    pub id: FnId,
    pub name: IdentNode,
    pub params: Vec<IdentNode>,
    pub body: Block,
    pub flags: FunctionFlags,
    pub return_type: JsType,
    pub compile_unit: Option<CompileUnitId>,
    /// Number of distinct `this.<name> = ...` assignments observed in the
    /// body; drives allocation layout downstream.
    pub this_property_count: u32,
}

impl FunctionNode {
    pub fn is_program(&self) -> bool {
        self.flags.contains(FunctionFlags::IS_PROGRAM)
    }

    pub fn is_vararg(&self) -> bool {
        self.flags.contains(FunctionFlags::IS_VARARG)
    }

    pub fn needs_arguments(&self) -> bool {
        self.flags.contains(FunctionFlags::NEEDS_ARGUMENTS)
    }

    pub fn is_named_function_expression(&self) -> bool {
        self.flags.contains(FunctionFlags::IS_NAMED_FUNCTION_EXPRESSION)
    }

    /// A direct or nested `eval` can observe this function's scope.
    pub fn has_deep_eval(&self) -> bool {
        self.flags
            .intersects(FunctionFlags::HAS_EVAL | FunctionFlags::HAS_NESTED_EVAL)
    }
}
