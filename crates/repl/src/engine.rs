//! REPL Session
//!
//! Wraps one VM for interactive use: lines compile as incremental units at
//! the current compile pointer and run immediately. The operand stack and
//! all definitions persist from line to line, so values build up the way a
//! stack-language session expects.

use std::collections::HashSet;

use stax_compiler::{CompileError, compile};
use stax_vm::{Vm, VmError, run};
use tracing::debug;

use crate::config::ReplConfig;
use crate::format;

/// Why a line failed.
#[derive(Debug)]
pub enum SessionError {
    Compile(CompileError),
    Runtime(VmError),
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionError::Compile(e) => write!(f, "{e}"),
            SessionError::Runtime(e) => write!(f, "runtime error: {e}"),
        }
    }
}

impl std::error::Error for SessionError {}

/// One interactive session: a VM plus the config it was built from.
pub struct Session {
    vm: Vm,
    config: ReplConfig,
}

impl Session {
    pub fn new(config: ReplConfig) -> Self {
        let mut vm = Vm::with_layout(config.layout());
        vm.set_step_budget(config.step_budget);
        Session { vm, config }
    }

    /// Compile and run one source unit against the session VM.
    pub fn eval_unit(&mut self, source: &str) -> Result<(), SessionError> {
        let entry = compile(&mut self.vm, source).map_err(SessionError::Compile)?;
        debug!(entry = usize::from(entry), "compiled unit");
        run(&mut self.vm, usize::from(entry)).map_err(SessionError::Runtime)
    }

    /// The current stack, rendered bottom-first.
    pub fn stack_line(&self) -> String {
        format::format_stack(&self.vm)
    }

    /// Number of cells on the operand stack.
    pub fn depth(&self) -> usize {
        self.vm.stack_cells().len()
    }

    /// Every visible word name, oldest first; shadowed duplicates are
    /// collapsed onto their newest binding.
    pub fn words(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut names: Vec<String> = self
            .vm
            .symbols
            .names()
            .rev()
            .filter(|n| seen.insert(n.to_string()))
            .map(|n| n.to_string())
            .collect();
        names.reverse();
        names
    }

    /// Throw the whole image away and start over with the same config.
    pub fn reset(&mut self) {
        *self = Session::new(self.config.clone());
    }

    pub fn vm(&self) -> &Vm {
        &self.vm
    }
}
