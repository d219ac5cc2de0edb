//! Kestrel compiler core: parser, semantic analysis, and the IR
//! transformation pipeline.
//!
//! This crate provides the compilation pipeline for Kestrel scripts:
//! - `parser` - lexer and recursive-descent parser producing IR trees
//! - `compile` - the ordered transformation passes: constant folding,
//!   lowering, symbol assignment, scope-depth analysis, program-point
//!   allocation, optimistic typing, and splitting
//! - `diagnostics` - error reporting
//!
//! The output of the pipeline is a fully analyzed `FunctionNode` tree ready
//! for code emission: every identifier has a symbol, every splittable
//! container has its ranges, every function has a compile-unit binding, and
//! all try/finally constructs have been lowered.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod compile;
pub mod diagnostics;
pub mod parser;

#[cfg(test)]
pub mod test_utils;

pub use compile::{CompileOptions, CompiledScript, Compiler, RecompilableData, TypeFeedback};
pub use diagnostics::{Diagnostics, DiagnosticsPrinter, Severity};

/// Errors that can occur while compiling a script.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// A malformed construct in the source; compilation stops at the first.
    #[error("{source_name}:{line}:{column}: {message}")]
    Syntax {
        message: String,
        source_name: String,
        line: u32,
        column: u32,
        token: kestrel_ir::Token,
    },

    #[error("parsing failed with {} errors", .0.error_count())]
    ParseError(Diagnostics),

    /// An internal invariant was violated; not recoverable.
    #[error("internal invariant violated: {0}")]
    Internal(String),
}

/// Result type for compiler operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Format an IR-level error against the source it came from.
    pub(crate) fn from_ir(err: kestrel_ir::IrError, source: &kestrel_ir::Source) -> Error {
        match err {
            kestrel_ir::IrError::Syntax { message, token } => {
                let (line, column) = source.line_column(token.start);
                Error::Syntax {
                    message,
                    source_name: source.name().to_string(),
                    line,
                    column,
                    token,
                }
            }
            kestrel_ir::IrError::Internal(message) => Error::Internal(message),
        }
    }
}
