//! Parser and Bytecode Emitter
//!
//! A single-pass compiler: tokens are pulled lazily from the lexer and
//! bytecode is emitted straight into the VM's CODE segment at CP. Forward
//! control flow (blocks, conditionals, the jump over a colon definition's
//! body) is resolved with branch fixups patched once the target is known.
//!
//! Surface forms and what they emit:
//!
//! ```text
//! 42, 3.5        LitNumber + cell (small integers become INTEGER cells)
//! "text"         LitString + intern offset
//! word           builtin: its opcode byte / colon word: Form B call
//! @word          PushSymbolRef + the word's BUILTIN or CODE cell
//! `word          LitNumber + an unbound SYMBOL cell (maplist keys)
//! ( ... )        Branch over body ... Exit, then LitCode body-start
//! [ ... ]        ListOpen ... ListClose
//! pred if A else B then   BranchIfFalse/Branch with patched targets
//! : name ... ;   Branch over body ... Exit, then a symbol-table binding
//! ```
//!
//! A compile unit always ends with Exit, so running it terminates by
//! return-stack underflow at the unit boundary.

use stax_vm::{Cell, Op, USER_CALL_BIT, Vm, VmError};

use crate::error::{CompileError, CompileErrorKind};
use crate::lexer::{Lexer, Token, TokenKind};

pub struct Parser {
    lexer: Lexer,
    /// Position of the most recently consumed token (for emit errors).
    line: usize,
    column: usize,
}

impl Parser {
    pub fn new(source: &str) -> Self {
        Parser {
            lexer: Lexer::new(source),
            line: 1,
            column: 1,
        }
    }

    /// Compile a whole unit into the VM, leaving a trailing Exit.
    ///
    /// The caller owns rollback on error (CP and symbol-table marks).
    pub fn compile_unit(&mut self, vm: &mut Vm) -> Result<(), CompileError> {
        while let Some(token) = self.next_token()? {
            if token.kind == TokenKind::Punct(':') {
                self.compile_definition(vm)?;
            } else {
                self.compile_token(vm, token)?;
            }
        }
        self.emit8(vm, Op::Exit as u8)
    }

    // =========================================================================
    // Token plumbing
    // =========================================================================

    fn next_token(&mut self) -> Result<Option<Token>, CompileError> {
        let token = self.lexer.next_token()?;
        if let Some(t) = &token {
            self.line = t.line;
            self.column = t.column;
        }
        Ok(token)
    }

    fn syntax(&self, message: impl Into<String>) -> CompileError {
        CompileError::new(CompileErrorKind::Syntax, message, self.line, self.column)
    }

    fn syntax_at(&self, message: impl Into<String>, line: usize, column: usize) -> CompileError {
        CompileError::new(CompileErrorKind::Syntax, message, line, column)
    }

    // =========================================================================
    // Emission helpers
    // =========================================================================

    fn wrap(&self, result: Result<(), VmError>) -> Result<(), CompileError> {
        result.map_err(|e| CompileError::emit(e, self.line, self.column))
    }

    fn emit8(&self, vm: &mut Vm, byte: u8) -> Result<(), CompileError> {
        self.wrap(vm.emit8(byte))
    }

    fn emit16(&self, vm: &mut Vm, value: u16) -> Result<(), CompileError> {
        self.wrap(vm.emit16(value))
    }

    fn emit_cell(&self, vm: &mut Vm, cell: Cell) -> Result<(), CompileError> {
        self.wrap(vm.emit_cell(cell))
    }

    /// Emit a branch opcode with a placeholder offset; returns the operand
    /// position for the later fixup.
    fn emit_branch(&self, vm: &mut Vm, op: Op) -> Result<usize, CompileError> {
        self.emit8(vm, op as u8)?;
        let at = vm.here();
        self.emit16(vm, 0)?;
        Ok(at)
    }

    /// Point the branch operand at `at` to the current CP.
    fn patch_to_here(&self, vm: &mut Vm, at: usize) -> Result<(), CompileError> {
        let offset = vm.here() as isize - (at as isize + 2);
        if offset > i16::MAX as isize {
            return Err(CompileError::new(
                CompileErrorKind::Capacity,
                "branch distance exceeds 16-bit range",
                self.line,
                self.column,
            ));
        }
        self.wrap(vm.patch16(at, offset as i16 as u16))
    }

    // =========================================================================
    // Expressions
    // =========================================================================

    /// Compile one expression token. Structure terminators (`;` `)` `]`
    /// `else` `then`) are intercepted by the enclosing loops; reaching one
    /// here means it was unbalanced.
    fn compile_token(&mut self, vm: &mut Vm, token: Token) -> Result<(), CompileError> {
        let (line, column) = (token.line, token.column);
        match token.kind {
            TokenKind::Int(n) => {
                let cell = match i16::try_from(n) {
                    Ok(small) => Cell::from_int(small),
                    Err(_) => Cell::from_number(n as f32),
                };
                self.emit8(vm, Op::LitNumber as u8)?;
                self.emit_cell(vm, cell)
            }
            TokenKind::Float(f) => {
                self.emit8(vm, Op::LitNumber as u8)?;
                self.emit_cell(vm, Cell::from_number(f))
            }
            TokenKind::Str(text) => {
                let offset = vm
                    .intern(&text)
                    .map_err(|e| CompileError::emit(e, line, column))?;
                self.emit8(vm, Op::LitString as u8)?;
                self.emit16(vm, offset)
            }
            TokenKind::Word(name) => match name.as_str() {
                "if" => self.compile_conditional(vm),
                "else" | "then" => {
                    Err(self.syntax_at(format!("'{name}' outside a conditional"), line, column))
                }
                _ => self.compile_word(vm, &name, line, column),
            },
            TokenKind::SymbolLit(name) => {
                let offset = vm
                    .intern(&name)
                    .map_err(|e| CompileError::emit(e, line, column))?;
                self.emit8(vm, Op::LitNumber as u8)?;
                self.emit_cell(vm, Cell::from_symbol(offset))
            }
            TokenKind::SymbolRef(name) => {
                let cell = vm.symbols.find_tagged_value(&name).ok_or_else(|| {
                    CompileError::new(
                        CompileErrorKind::Unresolved,
                        format!("unknown word '@{name}'"),
                        line,
                        column,
                    )
                })?;
                self.emit8(vm, Op::PushSymbolRef as u8)?;
                self.emit_cell(vm, cell)
            }
            TokenKind::Punct('(') => self.compile_block(vm),
            TokenKind::Punct('[') => self.compile_list(vm),
            TokenKind::Punct(':') => {
                Err(self.syntax_at("definitions are only allowed at the top level", line, column))
            }
            TokenKind::Punct(';') => {
                Err(self.syntax_at("';' outside a definition", line, column))
            }
            TokenKind::Punct(c @ (')' | ']')) => {
                Err(self.syntax_at(format!("unbalanced '{c}'"), line, column))
            }
            TokenKind::Punct(c) => Err(self.syntax_at(format!("unexpected '{c}'"), line, column)),
        }
    }

    /// A bare word: direct dispatch for builtins, a Form B call for
    /// colon definitions.
    fn compile_word(
        &mut self,
        vm: &mut Vm,
        name: &str,
        line: usize,
        column: usize,
    ) -> Result<(), CompileError> {
        let cell = vm.symbols.find_tagged_value(name).ok_or_else(|| {
            CompileError::new(
                CompileErrorKind::Unresolved,
                format!("unknown word '{name}'"),
                line,
                column,
            )
        })?;
        if cell.is_builtin() {
            self.emit8(vm, cell.payload() as u8)
        } else {
            let addr = cell.payload();
            if addr >= 1 << 15 {
                return Err(CompileError::new(
                    CompileErrorKind::Capacity,
                    format!("'{name}' is beyond the direct-call address space"),
                    line,
                    column,
                ));
            }
            self.emit8(vm, USER_CALL_BIT | (addr >> 8) as u8)?;
            self.emit8(vm, (addr & 0xFF) as u8)
        }
    }

    /// `: name body ;` with a branch over the body so the surrounding
    /// top-level code flows past the definition.
    fn compile_definition(&mut self, vm: &mut Vm) -> Result<(), CompileError> {
        let name = match self.next_token()? {
            Some(Token { kind: TokenKind::Word(name), .. }) => name,
            Some(token) => {
                return Err(self.syntax_at("expected a name after ':'", token.line, token.column));
            }
            None => return Err(self.syntax("expected a name after ':'")),
        };

        let skip = self.emit_branch(vm, Op::Branch)?;
        let addr = vm.here();
        loop {
            match self.next_token()? {
                None => {
                    return Err(self.syntax(format!("unterminated definition ': {name}'")));
                }
                Some(Token { kind: TokenKind::Punct(';'), .. }) => break,
                Some(token) => self.compile_token(vm, token)?,
            }
        }
        self.emit8(vm, Op::Exit as u8)?;
        self.patch_to_here(vm, skip)?;

        vm.symbols.define_code(&name, addr as u16);
        Ok(())
    }

    /// `( ... )`: the body is compiled out of line and its entry pushed
    /// as a CODE cell, ready for `eval`.
    fn compile_block(&mut self, vm: &mut Vm) -> Result<(), CompileError> {
        let skip = self.emit_branch(vm, Op::Branch)?;
        let addr = vm.here();
        loop {
            match self.next_token()? {
                None => return Err(self.syntax("unterminated block (missing ')')")),
                Some(Token { kind: TokenKind::Punct(')'), .. }) => break,
                Some(token) => self.compile_token(vm, token)?,
            }
        }
        self.emit8(vm, Op::Exit as u8)?;
        self.patch_to_here(vm, skip)?;

        self.emit8(vm, Op::LitCode as u8)?;
        self.emit16(vm, addr as u16)
    }

    /// `[ ... ]`: built at runtime between ListOpen and ListClose.
    fn compile_list(&mut self, vm: &mut Vm) -> Result<(), CompileError> {
        self.emit8(vm, Op::ListOpen as u8)?;
        loop {
            match self.next_token()? {
                None => return Err(self.syntax("unterminated list (missing ']')")),
                Some(Token { kind: TokenKind::Punct(']'), .. }) => break,
                Some(token) => self.compile_token(vm, token)?,
            }
        }
        self.emit8(vm, Op::ListClose as u8)
    }

    /// `if A else B then` / `if A then`, predicate already on the stack.
    fn compile_conditional(&mut self, vm: &mut Vm) -> Result<(), CompileError> {
        let to_else = self.emit_branch(vm, Op::BranchIfFalse)?;
        loop {
            match self.next_token()? {
                None => return Err(self.syntax("missing 'then' after 'if'")),
                Some(Token { kind: TokenKind::Word(w), .. }) if w == "then" => {
                    return self.patch_to_here(vm, to_else);
                }
                Some(Token { kind: TokenKind::Word(w), .. }) if w == "else" => break,
                Some(token) => self.compile_token(vm, token)?,
            }
        }

        let to_end = self.emit_branch(vm, Op::Branch)?;
        self.patch_to_here(vm, to_else)?;
        loop {
            match self.next_token()? {
                None => return Err(self.syntax("missing 'then' after 'else'")),
                Some(Token { kind: TokenKind::Word(w), .. }) if w == "then" => break,
                Some(Token { kind: TokenKind::Word(w), .. }) if w == "else" => {
                    return Err(self.syntax("duplicate 'else' in conditional"));
                }
                Some(token) => self.compile_token(vm, token)?,
            }
        }
        self.patch_to_here(vm, to_end)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use stax_vm::SegmentId;

    fn compile_into(vm: &mut Vm, source: &str) -> Result<(), CompileError> {
        Parser::new(source).compile_unit(vm)
    }

    fn code_bytes(vm: &Vm) -> Vec<u8> {
        (0..vm.here())
            .map(|i| vm.memory.read8(SegmentId::Code, i).unwrap())
            .collect()
    }

    #[test]
    fn test_integer_literal_emission() {
        let mut vm = Vm::new();
        compile_into(&mut vm, "5").unwrap();
        let bytes = code_bytes(&vm);
        assert_eq!(bytes[0], Op::LitNumber as u8);
        let cell = Cell::from_bits(vm.memory.read32(SegmentId::Code, 1).unwrap());
        assert_eq!(cell.as_int(), 5);
        assert_eq!(bytes[5], Op::Exit as u8);
    }

    #[test]
    fn test_float_literal_emission() {
        let mut vm = Vm::new();
        compile_into(&mut vm, "2.5").unwrap();
        let cell = Cell::from_bits(vm.memory.read32(SegmentId::Code, 1).unwrap());
        assert!(cell.is_number());
        assert_eq!(cell.as_number(), 2.5);
    }

    #[test]
    fn test_wide_integer_becomes_number() {
        let mut vm = Vm::new();
        compile_into(&mut vm, "100000").unwrap();
        let cell = Cell::from_bits(vm.memory.read32(SegmentId::Code, 1).unwrap());
        assert!(cell.is_number());
        assert_eq!(cell.as_number(), 100000.0);
    }

    #[test]
    fn test_builtin_word_single_byte() {
        let mut vm = Vm::new();
        compile_into(&mut vm, "+").unwrap();
        assert_eq!(code_bytes(&vm), vec![Op::Add as u8, Op::Exit as u8]);
    }

    #[test]
    fn test_unknown_word() {
        let mut vm = Vm::new();
        let err = compile_into(&mut vm, "frobnicate").unwrap_err();
        assert_eq!(err.kind, CompileErrorKind::Unresolved);
        assert!(err.message.contains("frobnicate"));
        assert_eq!((err.line, err.column), (1, 1));
    }

    #[test]
    fn test_definition_registers_and_branches() {
        let mut vm = Vm::new();
        compile_into(&mut vm, ": square dup * ;").unwrap();
        let cell = vm.symbols.find_tagged_value("square").unwrap();
        assert!(cell.is_code());
        // Body starts after Branch + operand.
        assert_eq!(cell.payload(), 3);
        let bytes = code_bytes(&vm);
        assert_eq!(bytes[0], Op::Branch as u8);
        assert_eq!(bytes[3], Op::Dup as u8);
        assert_eq!(bytes[4], Op::Mul as u8);
        assert_eq!(bytes[5], Op::Exit as u8);
        // The branch skips the body entirely.
        assert_eq!(vm.memory.read16(SegmentId::Code, 1).unwrap(), 3);
    }

    #[test]
    fn test_call_emits_form_b() {
        let mut vm = Vm::new();
        compile_into(&mut vm, ": one 1 ; one").unwrap();
        let addr = vm.symbols.find_tagged_value("one").unwrap().payload();
        let bytes = code_bytes(&vm);
        let call_at = bytes.len() - 3;
        assert_eq!(bytes[call_at], USER_CALL_BIT | (addr >> 8) as u8);
        assert_eq!(bytes[call_at + 1], (addr & 0xFF) as u8);
        assert_eq!(*bytes.last().unwrap(), Op::Exit as u8);
    }

    #[test]
    fn test_symbol_ref_builtin() {
        let mut vm = Vm::new();
        compile_into(&mut vm, "@+").unwrap();
        let bytes = code_bytes(&vm);
        assert_eq!(bytes[0], Op::PushSymbolRef as u8);
        let cell = Cell::from_bits(vm.memory.read32(SegmentId::Code, 1).unwrap());
        assert!(cell.is_builtin());
        assert_eq!(cell.payload(), Op::Add as u16);
    }

    #[test]
    fn test_symbol_ref_code() {
        let mut vm = Vm::new();
        compile_into(&mut vm, ": f 1 ; @f").unwrap();
        let addr = vm.symbols.find_tagged_value("f").unwrap().payload();
        let at = vm.here() - 5; // cell operand sits before the trailing Exit
        assert_eq!(
            vm.memory.read8(SegmentId::Code, at - 1).unwrap(),
            Op::PushSymbolRef as u8
        );
        let cell = Cell::from_bits(vm.memory.read32(SegmentId::Code, at).unwrap());
        assert!(cell.is_code());
        assert_eq!(cell.payload(), addr);
    }

    #[test]
    fn test_symbol_literal() {
        let mut vm = Vm::new();
        compile_into(&mut vm, "`key").unwrap();
        let bytes = code_bytes(&vm);
        assert_eq!(bytes[0], Op::LitNumber as u8);
        let cell = Cell::from_bits(vm.memory.read32(SegmentId::Code, 1).unwrap());
        assert!(cell.is_symbol());
        assert_eq!(vm.string_at(cell.payload()).unwrap(), "key");
    }

    #[test]
    fn test_unknown_symbol_ref() {
        let mut vm = Vm::new();
        let err = compile_into(&mut vm, "@missing").unwrap_err();
        assert_eq!(err.kind, CompileErrorKind::Unresolved);
        assert!(err.message.contains("@missing"));
    }

    #[test]
    fn test_block_emits_code_literal() {
        let mut vm = Vm::new();
        compile_into(&mut vm, "( 1 )").unwrap();
        let bytes = code_bytes(&vm);
        assert_eq!(bytes[0], Op::Branch as u8);
        // Body: LitNumber cell Exit, then LitCode pointing at the body.
        assert_eq!(bytes[3], Op::LitNumber as u8);
        assert_eq!(bytes[8], Op::Exit as u8);
        assert_eq!(bytes[9], Op::LitCode as u8);
        assert_eq!(vm.memory.read16(SegmentId::Code, 10).unwrap(), 3);
    }

    #[test]
    fn test_list_literal_emission() {
        let mut vm = Vm::new();
        compile_into(&mut vm, "[ 1 2 ]").unwrap();
        let bytes = code_bytes(&vm);
        assert_eq!(bytes[0], Op::ListOpen as u8);
        assert_eq!(*bytes.last().unwrap(), Op::Exit as u8);
        assert_eq!(bytes[bytes.len() - 2], Op::ListClose as u8);
    }

    #[test]
    fn test_string_literal_interned() {
        let mut vm = Vm::new();
        compile_into(&mut vm, "\"hi\" \"hi\"").unwrap();
        let bytes = code_bytes(&vm);
        assert_eq!(bytes[0], Op::LitString as u8);
        let first = vm.memory.read16(SegmentId::Code, 1).unwrap();
        let second = vm.memory.read16(SegmentId::Code, 4).unwrap();
        assert_eq!(first, second);
        assert_eq!(vm.string_at(first).unwrap(), "hi");
    }

    #[test]
    fn test_conditional_with_else() {
        let mut vm = Vm::new();
        compile_into(&mut vm, "1 if 2 else 3 then").unwrap();
        let bytes = code_bytes(&vm);
        // lit 1, BranchIfFalse, lit 2, Branch, lit 3, Exit
        assert_eq!(bytes[5], Op::BranchIfFalse as u8);
        let to_else = vm.memory.read16(SegmentId::Code, 6).unwrap();
        // Skips lit 2 (5 bytes) and the Branch (3 bytes).
        assert_eq!(to_else, 8);
        assert_eq!(bytes[13], Op::Branch as u8);
        let to_end = vm.memory.read16(SegmentId::Code, 14).unwrap();
        assert_eq!(to_end, 5);
    }

    #[test]
    fn test_conditional_without_else() {
        let mut vm = Vm::new();
        compile_into(&mut vm, "1 if 2 then").unwrap();
        let to_end = vm.memory.read16(SegmentId::Code, 6).unwrap();
        assert_eq!(to_end, 5); // over lit 2
    }

    #[test]
    fn test_missing_then() {
        let mut vm = Vm::new();
        let err = compile_into(&mut vm, "1 if 2").unwrap_err();
        assert_eq!(err.kind, CompileErrorKind::Syntax);
        assert!(err.message.contains("then"));
    }

    #[test]
    fn test_stray_else() {
        let mut vm = Vm::new();
        let err = compile_into(&mut vm, "else").unwrap_err();
        assert!(err.message.contains("outside a conditional"));
    }

    #[test]
    fn test_stray_semicolon() {
        let mut vm = Vm::new();
        let err = compile_into(&mut vm, "1 ;").unwrap_err();
        assert_eq!(err.kind, CompileErrorKind::Syntax);
        assert!(err.message.contains("';' outside a definition"));
    }

    #[test]
    fn test_unbalanced_paren() {
        let mut vm = Vm::new();
        assert!(compile_into(&mut vm, "( 1").is_err());
        let mut vm = Vm::new();
        let err = compile_into(&mut vm, "1 )").unwrap_err();
        assert!(err.message.contains("unbalanced"));
    }

    #[test]
    fn test_unterminated_definition() {
        let mut vm = Vm::new();
        let err = compile_into(&mut vm, ": f 1 2").unwrap_err();
        assert!(err.message.contains("unterminated definition"));
    }

    #[test]
    fn test_nested_definition_rejected() {
        let mut vm = Vm::new();
        let err = compile_into(&mut vm, ": f : g ; ;").unwrap_err();
        assert!(err.message.contains("top level"));
    }

    #[test]
    fn test_definition_needs_name() {
        let mut vm = Vm::new();
        let err = compile_into(&mut vm, ": 5 ;").unwrap_err();
        assert!(err.message.contains("expected a name"));
    }

    #[test]
    fn test_unexpected_brace() {
        let mut vm = Vm::new();
        let err = compile_into(&mut vm, "{").unwrap_err();
        assert_eq!(err.kind, CompileErrorKind::Syntax);
    }
}
