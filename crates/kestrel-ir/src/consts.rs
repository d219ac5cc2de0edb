//! Compiler-constant names.
//!
//! Internal symbols start with `:` and are invisible to source code.

/// Holds the completion value of a script and return values routed through
/// inlined finally blocks.
pub const RETURN: &str = ":return";

/// The function object currently executing.
pub const CALLEE: &str = ":callee";

/// The current scope object.
pub const SCOPE: &str = ":scope";

/// Raw argument array of a variable-arity function.
pub const VARARGS: &str = ":varargs";

/// Backing value for the `arguments` object.
pub const ARGUMENTS: &str = ":arguments";

/// Source-visible name of the arguments object.
pub const ARGUMENTS_VAR: &str = "arguments";

/// Hoisted tag of a non-table switch.
pub const SWITCH_TAG: &str = ":switch";

/// Prefix for synthetic catch-all exception names.
pub const EXCEPTION_PREFIX: &str = ":e";

/// Prefix for labels wrapping inlined finally clones.
pub const FINALLY_LABEL_PREFIX: &str = ":finally";

pub const THIS: &str = "this";

pub const EVAL: &str = "eval";

pub const PROTO: &str = "__proto__";

/// Internal names are compiler-generated and never optimistic.
pub fn is_internal_name(name: &str) -> bool {
    name.starts_with(':')
}
