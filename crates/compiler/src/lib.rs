//! Stax Compiler Library
//!
//! Front-end for the Stax VM: lexes and parses source text and emits
//! bytecode directly into a VM's CODE segment. Compilation is incremental;
//! each call to [`compile`] appends one unit at the current compile pointer
//! and returns its entry address, so a REPL can feed lines one at a time
//! while definitions accumulate.
//!
//! ```rust,ignore
//! use stax_vm::{Vm, run};
//! use stax_compiler::compile;
//!
//! let mut vm = Vm::new();
//! let entry = compile(&mut vm, ": square dup * ;  5 square")?;
//! run(&mut vm, usize::from(entry))?;
//! assert_eq!(vm.stack_cells().len(), 1);
//! ```
//!
//! On a compile error, everything the failed unit emitted is rolled back:
//! CP returns to the unit boundary and symbol bindings made by the unit are
//! withdrawn, so no name can reach half-emitted bytecode.

pub mod error;
pub mod lexer;
pub mod parser;

pub use error::{CompileError, CompileErrorKind};
pub use lexer::{Lexer, Token, TokenKind};
pub use parser::Parser;

use stax_vm::Vm;

/// Compile one source unit into `vm`, returning its CODE entry address.
pub fn compile(vm: &mut Vm, source: &str) -> Result<u16, CompileError> {
    let unit_start = vm.here();
    let symbol_mark = vm.symbols.len();

    let mut parser = Parser::new(source);
    match parser.compile_unit(vm) {
        Ok(()) => Ok(unit_start as u16),
        Err(err) => {
            vm.set_here(unit_start);
            vm.symbols.truncate(symbol_mark);
            Err(err)
        }
    }
}
