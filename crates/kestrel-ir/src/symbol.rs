//! Symbols and the compilation-scoped symbol table.
//!
//! Symbols are arena-allocated and addressed by `SymbolId`; per-block name
//! maps and the global interning map live alongside the arena so tree nodes
//! stay plain data.

use bitflags::bitflags;
use indexmap::IndexMap;

use crate::node::BlockId;

/// A lightweight handle to a symbol in the compilation's `SymbolTable`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct SymbolId(u32);

impl SymbolId {
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

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct SymbolFlags: u32 {
        // Kind bits; exactly one is set.
        const IS_VAR = 1 << 0;
        const IS_LET = 1 << 1;
        const IS_CONST = 1 << 2;
        const IS_PARAM = 1 << 3;
        const IS_GLOBAL = 1 << 4;
        const IS_THIS = 1 << 5;

        /// Compiler-generated; invisible to source code.
        const IS_INTERNAL = 1 << 8;
        /// Lives in a runtime scope object rather than a local slot.
        const IS_SCOPE = 1 << 9;
        /// The self name of a named function expression.
        const IS_FUNCTION_SELF = 1 << 10;
        /// Declared at program level.
        const IS_PROGRAM_LEVEL = 1 << 11;
        /// May hold an object value; affects field layout downstream.
        const HAS_OBJECT_VALUE = 1 << 12;
        /// Declaration only reachable through dead code.
        const IS_DEAD = 1 << 13;
        /// A `let`/`const` whose declaration has been reached.
        const HAS_BEEN_DECLARED = 1 << 14;
        /// The emitter must reserve bytecode slots.
        const NEEDS_SLOT = 1 << 15;
    }
}

impl SymbolFlags {
    pub const KIND_MASK: SymbolFlags = SymbolFlags::IS_VAR
        .union(SymbolFlags::IS_LET)
        .union(SymbolFlags::IS_CONST)
        .union(SymbolFlags::IS_PARAM)
        .union(SymbolFlags::IS_GLOBAL)
        .union(SymbolFlags::IS_THIS);
}

/// A named slot resolved by the symbol-assignment pass and shared by every
/// reference. Slots themselves are assigned later, by the emitter.
#[derive(Debug, Clone)]
pub struct Symbol {
    pub name: String,
    pub flags: SymbolFlags,
    /// Block whose scope defines this symbol.
    pub block: BlockId,
    pub first_slot: Option<u32>,
    pub slot_count: u32,
    /// Index into the argument array for parameters of variable-arity
    /// functions.
    pub field_index: Option<u32>,
    pub use_count: u32,
}

impl Symbol {
    pub fn new(name: impl Into<String>, flags: SymbolFlags, block: BlockId) -> Self {
        Self {
            name: name.into(),
            flags,
            block,
            first_slot: None,
            slot_count: 0,
            field_index: None,
            use_count: 0,
        }
    }

    pub fn is_scope(&self) -> bool {
        self.flags.contains(SymbolFlags::IS_SCOPE)
    }

    pub fn is_global(&self) -> bool {
        self.flags.contains(SymbolFlags::IS_GLOBAL)
    }

    pub fn is_internal(&self) -> bool {
        self.flags.contains(SymbolFlags::IS_INTERNAL)
    }

    pub fn is_function_self(&self) -> bool {
        self.flags.contains(SymbolFlags::IS_FUNCTION_SELF)
    }

    pub fn is_param(&self) -> bool {
        self.flags.contains(SymbolFlags::IS_PARAM)
    }

    pub fn is_block_scoped(&self) -> bool {
        self.flags
            .intersects(SymbolFlags::IS_LET | SymbolFlags::IS_CONST)
    }

    /// Has a known local slot and no scope storage: its type is static.
    pub fn is_slotted_local(&self) -> bool {
        self.flags.contains(SymbolFlags::NEEDS_SLOT) && !self.is_scope()
    }
}

/// All symbols of one compilation: the arena, per-block name maps, and the
/// global interning map.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    symbols: Vec<Symbol>,
    block_symbols: IndexMap<BlockId, IndexMap<String, SymbolId>>,
    globals: IndexMap<String, SymbolId>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Define a new symbol in a block. The caller is responsible for
    /// redeclaration checks; defining a name twice in one block replaces
    /// the mapping.
    pub fn define(&mut self, block: BlockId, name: &str, flags: SymbolFlags) -> SymbolId {
        let id = SymbolId::from_raw(self.symbols.len() as u32);
        self.symbols.push(Symbol::new(name, flags, block));
        self.block_symbols
            .entry(block)
            .or_default()
            .insert(name.to_owned(), id);
        id
    }

    /// Global symbols are interned: one symbol per name per compilation.
    pub fn define_global(&mut self, block: BlockId, name: &str, flags: SymbolFlags) -> SymbolId {
        if let Some(&id) = self.globals.get(name) {
            return id;
        }
        let id = self.define(block, name, flags | SymbolFlags::IS_GLOBAL);
        self.globals.insert(name.to_owned(), id);
        id
    }

    pub fn lookup_in(&self, block: BlockId, name: &str) -> Option<SymbolId> {
        self.block_symbols.get(&block)?.get(name).copied()
    }

    /// Remove a symbol's name mapping from its block (slot pruning). The
    /// arena entry remains but is flagged dead.
    pub fn remove(&mut self, block: BlockId, name: &str) -> Option<SymbolId> {
        let id = self.block_symbols.get_mut(&block)?.shift_remove(name)?;
        self.symbols[id.index()].flags |= SymbolFlags::IS_DEAD;
        Some(id)
    }

    pub fn symbol(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id.index()]
    }

    pub fn symbol_mut(&mut self, id: SymbolId) -> &mut Symbol {
        &mut self.symbols[id.index()]
    }

    /// Names defined in a block, in definition order.
    pub fn symbols_in(&self, block: BlockId) -> impl Iterator<Item = (&str, SymbolId)> {
        self.block_symbols
            .get(&block)
            .into_iter()
            .flat_map(|m| m.iter().map(|(k, v)| (k.as_str(), *v)))
    }

    pub fn has_symbols(&self, block: BlockId) -> bool {
        self.block_symbols.get(&block).is_some_and(|m| !m.is_empty())
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (SymbolId, &Symbol)> {
        self.symbols
            .iter()
            .enumerate()
            .map(|(i, s)| (SymbolId::from_raw(i as u32), s))
    }
}
