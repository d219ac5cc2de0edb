//! Front end: lexer and recursive-descent parser.
//!
//! Produces the program `FunctionNode` the transformation pipeline
//! consumes, with function/block ids and lifecycle flags already assigned.

mod grammar;
mod lexer;

#[cfg(test)]
mod parser_tests;

pub use grammar::Parser;

use kestrel_ir::node::IdAllocator;
use kestrel_ir::{FunctionNode, Source};

/// Parse a complete script.
pub fn parse_program(source: &Source) -> crate::Result<(FunctionNode, IdAllocator)> {
    let parser = Parser::new(source, IdAllocator::new())?;
    parser
        .parse_program()
        .map_err(|e| crate::Error::from_ir(e, source))
}
