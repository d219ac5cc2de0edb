//! Core compiler state and entry points.

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

use kestrel_ir::error::{IrError, IrResult};
use kestrel_ir::node::{FnId, FunctionFlags, FunctionNode, IdAllocator};
use kestrel_ir::{Source, SymbolTable};

use super::feedback::TypeFeedback;
use super::splitter::DEFAULT_SPLIT_THRESHOLD;
use super::units::{CompileUnit, UnitAllocator};
use super::{
    fold, lower, optimistic, program_points, scope_depths, splitter, symbols as symbol_pass,
};

/// Tunables carried by a `Compiler`.
#[derive(Debug, Clone)]
pub struct CompileOptions {
    /// Recompiling a single nested function with cached analysis data.
    pub on_demand: bool,
    /// Weight above which functions, blocks, and literals are split.
    pub split_threshold: u32,
    /// Object layouts use primitive/object field pairs.
    pub dual_fields: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            on_demand: false,
            split_threshold: DEFAULT_SPLIT_THRESHOLD,
            dual_fields: false,
        }
    }
}

/// Analysis results cached per function for on-demand recompilation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecompilableData {
    /// Names defined transitively within the function body.
    pub internal_symbols: IndexSet<String>,
    /// Captured name to its scope depth relative to the function entry.
    pub external_symbol_depths: IndexMap<String, u32>,
    /// Restored rather than re-derived on recompilation: the original
    /// lexical nesting is no longer present.
    pub in_dynamic_context: bool,
}

/// A fully processed script: every identifier carries a symbol, every
/// splittable container its ranges, every function a compile-unit binding,
/// and all try/finally constructs are lowered.
#[derive(Debug)]
pub struct CompiledScript {
    pub function: FunctionNode,
    pub symbols: SymbolTable,
    pub units: Vec<CompileUnit>,
}

/// The ordered transformation pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompilePhase {
    ConstantFolding,
    Lowering,
    SymbolAssignment,
    ScopeDepthComputation,
    ProgramPointCalculation,
    OptimisticTypeAssignment,
    Splitting,
}

impl CompilePhase {
    pub const PIPELINE: [CompilePhase; 7] = [
        CompilePhase::ConstantFolding,
        CompilePhase::Lowering,
        CompilePhase::SymbolAssignment,
        CompilePhase::ScopeDepthComputation,
        CompilePhase::ProgramPointCalculation,
        CompilePhase::OptimisticTypeAssignment,
        CompilePhase::Splitting,
    ];

    fn apply(self, state: &mut CompileState<'_>, function: FunctionNode) -> IrResult<FunctionNode> {
        match self {
            CompilePhase::ConstantFolding => fold::apply(&mut state.ids, function),
            CompilePhase::Lowering => lower::apply(&mut state.ids, function),
            CompilePhase::SymbolAssignment => symbol_pass::apply(&mut state.symbols, function),
            CompilePhase::ScopeDepthComputation => {
                if state.options.on_demand {
                    restore_cached_depths(state, function)
                } else {
                    scope_depths::apply(&state.symbols, state.script_function_data, function)
                }
            }
            CompilePhase::ProgramPointCalculation => {
                program_points::apply(state.options.on_demand, function)
            }
            CompilePhase::OptimisticTypeAssignment => optimistic::apply(
                &state.symbols,
                state.feedback,
                state.options.on_demand,
                function,
            ),
            CompilePhase::Splitting => splitter::apply(
                &mut state.ids,
                &mut state.units,
                state.options.split_threshold,
                state.options.dual_fields,
                function,
            ),
        }
    }
}

/// On-demand compilation reuses previously computed scope information; a
/// missing entry means the caller handed us a function we never analyzed.
fn restore_cached_depths(
    state: &mut CompileState<'_>,
    mut function: FunctionNode,
) -> IrResult<FunctionNode> {
    let Some(data) = state.script_function_data.get(&function.id) else {
        return Err(IrError::internal(format!(
            "no recompilable data for function {}",
            function.id.as_u32()
        )));
    };
    if data.in_dynamic_context {
        function.flags |= FunctionFlags::IN_DYNAMIC_CONTEXT;
    }
    Ok(function)
}

struct CompileState<'a> {
    ids: IdAllocator,
    symbols: SymbolTable,
    units: UnitAllocator,
    options: &'a CompileOptions,
    feedback: &'a TypeFeedback,
    script_function_data: &'a mut IndexMap<FnId, RecompilableData>,
}

/// Drives the pipeline for one source. Compilations are independent:
/// parallel compilers share only the source text and the feedback store.
pub struct Compiler<'a> {
    source: &'a Source,
    options: CompileOptions,
    feedback: &'a TypeFeedback,
    script_function_data: IndexMap<FnId, RecompilableData>,
}

impl<'a> Compiler<'a> {
    pub fn new(source: &'a Source, feedback: &'a TypeFeedback) -> Self {
        Self::with_options(source, feedback, CompileOptions::default())
    }

    pub fn with_options(
        source: &'a Source,
        feedback: &'a TypeFeedback,
        options: CompileOptions,
    ) -> Self {
        Self {
            source,
            options,
            feedback,
            script_function_data: IndexMap::new(),
        }
    }

    pub fn source(&self) -> &Source {
        self.source
    }

    pub fn is_on_demand_compilation(&self) -> bool {
        self.options.on_demand
    }

    pub fn use_dual_fields(&self) -> bool {
        self.options.dual_fields
    }

    pub fn get_script_function_data(&self, id: FnId) -> Option<&RecompilableData> {
        self.script_function_data.get(&id)
    }

    /// Seed cached analysis data, as an on-demand caller must.
    pub fn register_script_function_data(&mut self, id: FnId, data: RecompilableData) {
        self.script_function_data.insert(id, data);
    }

    /// Parse and run the whole pipeline over the compiler's source.
    pub fn compile_script(&mut self) -> crate::Result<CompiledScript> {
        let (function, ids) = crate::parser::parse_program(self.source)?;
        self.compile_function(function, ids)
    }

    /// Run the pipeline over an already parsed function.
    pub fn compile_function(
        &mut self,
        function: FunctionNode,
        ids: IdAllocator,
    ) -> crate::Result<CompiledScript> {
        let mut state = CompileState {
            ids,
            symbols: SymbolTable::new(),
            units: UnitAllocator::default(),
            options: &self.options,
            feedback: self.feedback,
            script_function_data: &mut self.script_function_data,
        };

        let mut function = function;
        for phase in CompilePhase::PIPELINE {
            function = phase
                .apply(&mut state, function)
                .map_err(|e| crate::Error::from_ir(e, self.source))?;
        }

        Ok(CompiledScript {
            function,
            symbols: state.symbols,
            units: state.units.units().to_vec(),
        })
    }
}
