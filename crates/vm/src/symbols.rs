//! Symbol Table
//!
//! Maps word names to executable bindings: either a built-in opcode
//! (BUILTIN cell) or the CODE entry point of a colon definition (CODE cell).
//! Entries chain newest-first, so redefining a word shadows the old binding
//! without deleting it.

use crate::opcodes::Op;
use stax_core::Cell;

/// Name-to-binding table with newest-wins lookup.
///
/// A linear reverse scan is plenty at this scale (a 64 KiB image cannot
/// hold enough definitions for lookup depth to matter).
#[derive(Default)]
pub struct SymbolTable {
    entries: Vec<(String, Cell)>,
}

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable { entries: Vec::new() }
    }

    /// Bind `name` to a built-in opcode, shadowing any earlier binding.
    pub fn define_builtin(&mut self, name: &str, opcode: Op) {
        self.entries.push((name.to_string(), Cell::from_builtin(opcode as u8)));
    }

    /// Bind `name` to the CODE address of a colon definition.
    pub fn define_code(&mut self, name: &str, addr: u16) {
        self.entries.push((name.to_string(), Cell::from_code(addr)));
    }

    /// Most recent binding for `name` as a tagged cell, or None.
    pub fn find_tagged_value(&self, name: &str) -> Option<Cell> {
        self.entries
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, cell)| *cell)
    }

    /// All bound names, oldest first, duplicates included.
    pub fn names(&self) -> impl DoubleEndedIterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    /// Drop every binding made after `mark` (compile-error rollback, so no
    /// name can point into rolled-back CODE).
    pub fn truncate(&mut self, mark: usize) {
        self.entries.truncate(mark);
    }

    /// Reverse lookup: the newest name bound to exactly this cell.
    pub fn name_for(&self, cell: Cell) -> Option<&str> {
        self.entries
            .iter()
            .rev()
            .find(|(_, c)| *c == cell)
            .map(|(n, _)| n.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Register the base vocabulary every VM starts with.
pub fn install_base_words(symbols: &mut SymbolTable) {
    symbols.define_builtin("+", Op::Add);
    symbols.define_builtin("-", Op::Sub);
    symbols.define_builtin("*", Op::Mul);
    symbols.define_builtin("/", Op::Div);
    symbols.define_builtin("dup", Op::Dup);
    symbols.define_builtin("drop", Op::Drop);
    symbols.define_builtin("swap", Op::Swap);
    symbols.define_builtin("over", Op::Over);
    symbols.define_builtin("rot", Op::Rot);
    symbols.define_builtin("pick", Op::Pick);
    symbols.define_builtin("eval", Op::Eval);
    symbols.define_builtin("length", Op::Length);
    symbols.define_builtin("head", Op::Head);
    symbols.define_builtin("tail", Op::Tail);
    symbols.define_builtin("uncons", Op::Uncons);
    symbols.define_builtin("cons", Op::Cons);
    symbols.define_builtin("concat", Op::Concat);
    symbols.define_builtin("get-at", Op::GetAt);
    symbols.define_builtin("set-at", Op::SetAt);
    symbols.define_builtin("find", Op::Find);
}
