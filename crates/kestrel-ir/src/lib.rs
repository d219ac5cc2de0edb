#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! IR data model for the Kestrel compiler.
//!
//! This crate holds everything the transformation pipeline and a downstream
//! emitter share:
//! - `token` / `source` - packed tokens and source coordinates
//! - `node` - the closed sum type of expression/statement/function nodes
//! - `symbol` - symbols and the compilation-scoped symbol table
//! - `types` - the optimistic type lattice
//! - `lexical_context` - the stack of entered scope-bearing nodes
//! - `visitor` - the visitor protocol and by-value transform engine

pub mod consts;
pub mod error;
pub mod lexical_context;
pub mod node;
pub mod source;
pub mod symbol;
pub mod token;
pub mod types;
pub mod visitor;

pub use error::{IrError, IrResult};
pub use lexical_context::LexicalContext;
pub use node::{BlockId, CompileUnitId, Expr, FnId, FunctionNode, IdAllocator, Stmt};
pub use source::Source;
pub use symbol::{Symbol, SymbolFlags, SymbolId, SymbolTable};
pub use token::{Token, TokenKind};
pub use types::JsType;
