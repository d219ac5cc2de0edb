//! The transformation pipeline.
//!
//! Passes run in a fixed order, each a tree rewrite over the immutable IR:
//! - `fold` - constant folding
//! - `lower` - statement lowering, control-flow rewriting, finally inlining
//! - `symbols` - scope and symbol resolution
//! - `scope_depths` - internal/external symbol partitioning per function
//! - `program_points` - optimistic site numbering
//! - `optimistic` - speculative type assignment from the feedback store
//! - `splitter` (with `weigh`) - partitioning of oversized functions
//!
//! `compiler` drives the phases; `units` and `feedback` hold the
//! compile-unit allocator and the type-feedback store.

mod compiler;
mod feedback;
mod fold;
mod lower;
mod optimistic;
mod program_points;
mod scope_depths;
mod splitter;
mod symbols;
mod units;
mod weigh;

#[cfg(test)]
mod fold_tests;
#[cfg(test)]
mod optimistic_tests;
#[cfg(test)]
mod pipeline_tests;
#[cfg(test)]
mod scope_depths_tests;
#[cfg(test)]
mod splitter_tests;

pub use compiler::{
    CompileOptions, CompilePhase, CompiledScript, Compiler, RecompilableData,
};

#[cfg(test)]
pub(crate) use fold::apply as fold_apply;
#[cfg(test)]
pub(crate) use lower::apply as lower_apply;
pub use feedback::TypeFeedback;
pub use splitter::DEFAULT_SPLIT_THRESHOLD;
pub use units::{CompileUnit, UnitAllocator, DEFAULT_UNIT_CEILING};
pub use weigh::{weigh_block, weigh_expr, weigh_stmt};
