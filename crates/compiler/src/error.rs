//! Compile Diagnostics
//!
//! Every compile failure carries a kind, a human-readable message, and the
//! 1-indexed source position it was detected at. Lexical and syntactic
//! errors abort the current compile unit; the caller rolls emitted CODE and
//! new symbol bindings back to the unit boundary.

use stax_vm::VmError;

/// Broad classification of a compile failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompileErrorKind {
    /// Malformed token: bad number, unterminated string, stray sigil.
    Lexical,
    /// Unbalanced punctuation, misplaced keyword, unexpected end of input.
    Syntax,
    /// A word or `@name` reference with no binding.
    Unresolved,
    /// CODE or STRING segment ran out of room while emitting.
    Capacity,
}

/// A compile error with its source position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileError {
    pub kind: CompileErrorKind,
    pub message: String,
    /// 1-indexed source line.
    pub line: usize,
    /// 1-indexed source column.
    pub column: usize,
}

impl CompileError {
    pub fn new(
        kind: CompileErrorKind,
        message: impl Into<String>,
        line: usize,
        column: usize,
    ) -> Self {
        CompileError {
            kind,
            message: message.into(),
            line,
            column,
        }
    }

    /// Wrap a VM emission failure at a source position.
    pub fn emit(err: VmError, line: usize, column: usize) -> Self {
        CompileError::new(CompileErrorKind::Capacity, err.to_string(), line, column)
    }
}

impl std::fmt::Display for CompileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let what = match self.kind {
            CompileErrorKind::Lexical => "lexical error",
            CompileErrorKind::Syntax => "syntax error",
            CompileErrorKind::Unresolved => "unresolved name",
            CompileErrorKind::Capacity => "capacity error",
        };
        write!(
            f,
            "{what} at line {}, column {}: {}",
            self.line, self.column, self.message
        )
    }
}

impl std::error::Error for CompileError {}
