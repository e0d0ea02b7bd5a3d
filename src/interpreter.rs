//! Persistent lex → parse → compile → run pipeline.
//!
//! An [`Interpreter`] owns the state that outlives a single source string:
//! the symbol table, the constant pool, and the globals array. Each `run`
//! threads that state through a fresh compiler and VM and takes it back
//! afterwards, so definitions persist across calls. The REPL is a thin
//! loop over this type.

use crate::compiler::Compiler;
use crate::error::{Error, Result};
use crate::lexer::Lexer;
use crate::parser::Parser;
use crate::symbol_table::SymbolTable;
use crate::value::Value;
use crate::vm::{GLOBALS_SIZE, Vm};

pub struct Interpreter {
    symbol_table: SymbolTable,
    constants: Vec<Value>,
    globals: Vec<Value>,
}

impl Default for Interpreter {
    fn default() -> Self {
        Interpreter::new()
    }
}

impl Interpreter {
    pub fn new() -> Interpreter {
        Interpreter {
            symbol_table: SymbolTable::new(),
            constants: Vec::new(),
            globals: vec![Value::Null; GLOBALS_SIZE],
        }
    }

    /// Run one source string and return the value of its last expression
    /// statement.
    ///
    /// State is not transactional: a failed compile keeps any constants and
    /// symbol definitions added before the failure, and a failed run keeps
    /// any globals stored before the offending instruction. This matches
    /// the interactive behavior of sharing state across lines.
    pub fn run(&mut self, source: &str) -> Result<Value> {
        let mut parser = Parser::new(Lexer::new(source));
        let program = parser.parse();
        if !parser.errors().is_empty() {
            return Err(Error::Parse(parser.errors().to_vec()));
        }

        let mut compiler = Compiler::with_state(
            std::mem::take(&mut self.symbol_table),
            std::mem::take(&mut self.constants),
        );
        let compiled = compiler.compile(&program);
        let bytecode = compiler.bytecode();
        (self.symbol_table, self.constants) = compiler.into_state();
        compiled?;

        let mut vm = Vm::with_globals(bytecode, std::mem::take(&mut self.globals));
        let ran = vm.run();
        let value = vm.last_popped_stack_element().clone();
        self.globals = vm.into_globals();
        ran?;

        Ok(value)
    }
}
