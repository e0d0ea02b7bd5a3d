//! Bytecode compiler: lowers the AST to a flat instruction stream plus a
//! constant pool.
//!
//! The compiler walks the tree once, emitting into the topmost of a stack
//! of compilation scopes: one per function body being lowered, with the
//! root ("main") scope at the bottom. Jumps are emitted with a placeholder
//! operand and patched in place once the target offset is known.
//!
//! Symbol definitions and the constant pool survive across `compile` calls
//! when the compiler is constructed with [`Compiler::with_state`], which is
//! how the REPL accumulates state line by line.

use std::rc::Rc;

use log::{debug, trace};

use crate::ast::{BlockStatement, Expression, InfixOperator, PrefixOperator, Program, Statement};
use crate::code::{Instructions, Opcode, make};
use crate::error::CompileError;
use crate::symbol_table::{SymbolScope, SymbolTable};
use crate::value::{CompiledFunction, Value};

/// The compiler's output package: the root scope's instructions and the
/// constants they index.
#[derive(Debug, Clone, PartialEq)]
pub struct Bytecode {
    pub instructions: Instructions,
    pub constants: Vec<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct EmittedInstruction {
    opcode: Opcode,
    position: usize,
}

/// One function body under compilation: its instruction buffer plus the
/// descriptors needed for patching.
#[derive(Debug, Default)]
struct CompilationScope {
    instructions: Instructions,
    last_instruction: Option<EmittedInstruction>,
    previous_instruction: Option<EmittedInstruction>,
}

pub struct Compiler {
    scopes: Vec<CompilationScope>,
    symbol_table: SymbolTable,
    constants: Vec<Value>,
}

impl Default for Compiler {
    fn default() -> Self {
        Compiler::new()
    }
}

impl Compiler {
    /// A standalone compiler owning a fresh symbol table and constant pool.
    pub fn new() -> Compiler {
        Compiler::with_state(SymbolTable::new(), Vec::new())
    }

    /// A compiler seeded with existing state, for incremental use: the REPL
    /// threads the same symbol table and constants through every line and
    /// takes them back with [`Compiler::into_state`].
    pub fn with_state(symbol_table: SymbolTable, constants: Vec<Value>) -> Compiler {
        Compiler {
            scopes: vec![CompilationScope::default()],
            symbol_table,
            constants,
        }
    }

    /// Compile a program into the current scope. On error the partially
    /// emitted instructions and appended constants are not rolled back;
    /// callers must discard the bytecode.
    pub fn compile(&mut self, program: &Program) -> Result<(), CompileError> {
        for statement in &program.statements {
            self.compile_statement(statement)?;
        }
        debug!(
            "compiled {} bytes, {} constants",
            self.current_scope().instructions.len(),
            self.constants.len()
        );
        Ok(())
    }

    pub fn bytecode(&self) -> Bytecode {
        Bytecode {
            instructions: self.current_scope().instructions.clone(),
            constants: self.constants.clone(),
        }
    }

    /// Surrender the symbol table and constant pool for reuse.
    ///
    /// A failed `compile` can leave the table mid-function-scope, so the
    /// chain is unwound back to the root first.
    pub fn into_state(self) -> (SymbolTable, Vec<Value>) {
        let mut table = self.symbol_table;
        while table.has_outer() {
            table = table.into_outer().expect("outer table present");
        }
        (table, self.constants)
    }

    // -----------------------------------------------------------------------
    // Statements
    // -----------------------------------------------------------------------

    fn compile_statement(&mut self, statement: &Statement) -> Result<(), CompileError> {
        match statement {
            Statement::Let { name, value } => {
                self.compile_expression(value)?;
                self.define_and_store(name)
            }
            Statement::Return(value) => {
                self.compile_expression(value)?;
                self.emit(Opcode::ReturnValue, &[]);
                Ok(())
            }
            // A named function at statement position is a declaration: the
            // function value is bound to its name and nothing is left on
            // the stack, so no trailing Pop.
            Statement::Expression(Expression::Function {
                name: Some(name),
                parameters,
                body,
            }) => {
                let name = name.clone();
                self.compile_function_literal(parameters, body)?;
                self.define_and_store(&name)
            }
            Statement::Expression(expression) => {
                self.compile_expression(expression)?;
                self.emit(Opcode::Pop, &[]);
                Ok(())
            }
        }
    }

    fn compile_block(&mut self, block: &BlockStatement) -> Result<(), CompileError> {
        for statement in &block.statements {
            self.compile_statement(statement)?;
        }
        Ok(())
    }

    /// Define `name` in the current scope and emit the matching store.
    /// Re-definition within one scope is refused: the table would hand out
    /// a fresh index and leak the old slot.
    fn define_and_store(&mut self, name: &str) -> Result<(), CompileError> {
        if self.symbol_table.is_defined_locally(name) {
            return Err(CompileError::AlreadyDefined(name.to_string()));
        }
        let symbol = self.symbol_table.define(name);
        match symbol.scope {
            SymbolScope::Global => {
                if symbol.index > u16::MAX as usize {
                    return Err(CompileError::TooManyGlobals);
                }
                self.emit(Opcode::SetGlobal, &[symbol.index]);
            }
            SymbolScope::Local => {
                if symbol.index > u8::MAX as usize {
                    return Err(CompileError::TooManyLocals);
                }
                self.emit(Opcode::SetLocal, &[symbol.index]);
            }
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Expressions
    // -----------------------------------------------------------------------

    fn compile_expression(&mut self, expression: &Expression) -> Result<(), CompileError> {
        match expression {
            Expression::Integer(value) => self.emit_constant(Value::Int(*value)),
            Expression::Float(value) => self.emit_constant(Value::Float(*value)),
            Expression::Str(value) => self.emit_constant(Value::Str(value.as_str().into())),
            Expression::Bool(value) => {
                self.emit(if *value { Opcode::True } else { Opcode::False }, &[]);
                Ok(())
            }
            Expression::Ident(name) => self.compile_ident(name),
            Expression::Prefix { op, rhs } => {
                self.compile_expression(rhs)?;
                match op {
                    PrefixOperator::Bang => self.emit(Opcode::Bang, &[]),
                    PrefixOperator::Minus => self.emit(Opcode::Minus, &[]),
                };
                Ok(())
            }
            Expression::Infix { op, lhs, rhs } => self.compile_infix(*op, lhs, rhs),
            Expression::If {
                condition,
                consequence,
                alternative,
            } => self.compile_if(condition, consequence, alternative.as_ref()),
            Expression::Match { .. } => Err(CompileError::CannotCompile(expression.tag())),
            Expression::Function {
                parameters, body, ..
            } => self.compile_function_literal(parameters, body),
            Expression::Call { callee, arguments } => self.compile_call(callee, arguments),
        }
    }

    fn compile_ident(&mut self, name: &str) -> Result<(), CompileError> {
        let Some(symbol) = self.symbol_table.resolve(name) else {
            return Err(CompileError::UndefinedVariable(name.to_string()));
        };
        let symbol = symbol.clone();
        // A local belonging to an enclosing function would be addressed
        // against this frame's base pointer; there is no free-variable
        // capture, so refuse it here.
        if symbol.scope == SymbolScope::Local && !self.symbol_table.is_defined_locally(name) {
            return Err(CompileError::UndefinedVariable(name.to_string()));
        }
        match symbol.scope {
            SymbolScope::Global => self.emit(Opcode::GetGlobal, &[symbol.index]),
            SymbolScope::Local => self.emit(Opcode::GetLocal, &[symbol.index]),
        };
        Ok(())
    }

    fn compile_infix(
        &mut self,
        op: InfixOperator,
        lhs: &Expression,
        rhs: &Expression,
    ) -> Result<(), CompileError> {
        // There is no less-than opcode: `a < b` compiles as `b > a`.
        if op == InfixOperator::Lt {
            self.compile_expression(rhs)?;
            self.compile_expression(lhs)?;
            self.emit(Opcode::GreaterThan, &[]);
            return Ok(());
        }
        self.compile_expression(lhs)?;
        self.compile_expression(rhs)?;
        let opcode = match op {
            InfixOperator::Plus => Opcode::Add,
            InfixOperator::Minus => Opcode::Sub,
            InfixOperator::Asterisk => Opcode::Mul,
            InfixOperator::Slash => Opcode::Div,
            InfixOperator::Gt => Opcode::GreaterThan,
            InfixOperator::Eq => Opcode::Eq,
            InfixOperator::NotEq => Opcode::NotEq,
            InfixOperator::Lt => return Err(CompileError::UnknownOperator(op)),
        };
        self.emit(opcode, &[]);
        Ok(())
    }

    fn compile_if(
        &mut self,
        condition: &Expression,
        consequence: &BlockStatement,
        alternative: Option<&BlockStatement>,
    ) -> Result<(), CompileError> {
        self.compile_expression(condition)?;
        let jump_not_truthy_position = self.emit(Opcode::JumpNotTruthy, &[9999]);

        self.compile_block(consequence)?;
        if self.last_instruction_is(Opcode::Pop) {
            self.remove_last_pop();
        }
        let jump_position = self.emit(Opcode::Jump, &[9999]);

        let after_consequence = self.current_scope().instructions.len();
        self.change_operand(jump_not_truthy_position, after_consequence)?;

        match alternative {
            None => {
                self.emit(Opcode::Null, &[]);
            }
            Some(alternative) => {
                self.compile_block(alternative)?;
                if self.last_instruction_is(Opcode::Pop) {
                    self.remove_last_pop();
                }
            }
        }

        let after_alternative = self.current_scope().instructions.len();
        self.change_operand(jump_position, after_alternative)?;
        Ok(())
    }

    fn compile_function_literal(
        &mut self,
        parameters: &[String],
        body: &BlockStatement,
    ) -> Result<(), CompileError> {
        if parameters.len() > u8::MAX as usize {
            return Err(CompileError::TooManyArguments);
        }
        self.enter_scope();
        for parameter in parameters {
            if self.symbol_table.is_defined_locally(parameter) {
                return Err(CompileError::AlreadyDefined(parameter.clone()));
            }
            // Parameter i occupies local slot i.
            self.symbol_table.define(parameter);
        }
        self.compile_block(body)?;

        // The body's value is its implicit return: a trailing Pop becomes
        // ReturnValue; a body that ends any other way falls back to Return.
        if self.last_instruction_is(Opcode::Pop) {
            self.replace_last_pop_with_return();
        } else if !self.last_instruction_is(Opcode::ReturnValue) {
            self.emit(Opcode::Return, &[]);
        }

        let num_locals = self.symbol_table.num_definitions();
        let instructions = self.leave_scope();
        let function = CompiledFunction {
            instructions,
            num_locals,
            num_params: parameters.len(),
        };
        let index = self.add_constant(Value::Function(Rc::new(function)))?;
        self.emit(Opcode::Constant, &[index]);
        Ok(())
    }

    fn compile_call(
        &mut self,
        callee: &Expression,
        arguments: &[Expression],
    ) -> Result<(), CompileError> {
        self.compile_expression(callee)?;
        if arguments.len() > u8::MAX as usize {
            return Err(CompileError::TooManyArguments);
        }
        for argument in arguments {
            self.compile_expression(argument)?;
        }
        self.emit(Opcode::Call, &[arguments.len()]);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Emitting and patching
    // -----------------------------------------------------------------------

    fn emit(&mut self, op: Opcode, operands: &[usize]) -> usize {
        let instruction = make(op, operands);
        let position = self.add_instruction(&instruction);
        self.set_last_instruction(op, position);
        position
    }

    fn emit_constant(&mut self, value: Value) -> Result<(), CompileError> {
        let index = self.add_constant(value)?;
        self.emit(Opcode::Constant, &[index]);
        Ok(())
    }

    fn add_instruction(&mut self, instruction: &[u8]) -> usize {
        let scope = self.current_scope_mut();
        let position = scope.instructions.len();
        scope.instructions.extend_from_slice(instruction);
        position
    }

    fn add_constant(&mut self, value: Value) -> Result<usize, CompileError> {
        let index = self.constants.len();
        if index > u16::MAX as usize {
            return Err(CompileError::TooManyConstants);
        }
        self.constants.push(value);
        Ok(index)
    }

    fn set_last_instruction(&mut self, opcode: Opcode, position: usize) {
        let scope = self.current_scope_mut();
        scope.previous_instruction = scope.last_instruction;
        scope.last_instruction = Some(EmittedInstruction { opcode, position });
    }

    fn last_instruction_is(&self, opcode: Opcode) -> bool {
        self.current_scope()
            .last_instruction
            .is_some_and(|last| last.opcode == opcode)
    }

    fn remove_last_pop(&mut self) {
        let scope = self.current_scope_mut();
        let last = scope.last_instruction.expect("no last instruction to remove");
        scope.instructions.truncate(last.position);
        scope.last_instruction = scope.previous_instruction;
    }

    fn replace_last_pop_with_return(&mut self) {
        let position = self
            .current_scope()
            .last_instruction
            .expect("no last instruction to replace")
            .position;
        // Pop and ReturnValue are both a single byte.
        self.replace_instruction(position, &make(Opcode::ReturnValue, &[]));
        if let Some(last) = self.current_scope_mut().last_instruction.as_mut() {
            last.opcode = Opcode::ReturnValue;
        }
    }

    /// Overwrite bytes at `position` with `instruction` (equal lengths).
    fn replace_instruction(&mut self, position: usize, instruction: &[u8]) {
        let scope = self.current_scope_mut();
        scope.instructions[position..position + instruction.len()].copy_from_slice(instruction);
    }

    /// Re-encode the instruction at `position` with a new operand.
    fn change_operand(&mut self, position: usize, operand: usize) -> Result<(), CompileError> {
        if operand > u16::MAX as usize {
            return Err(CompileError::CodeTooLarge);
        }
        let byte = self.current_scope().instructions[position];
        let op = Opcode::from_byte(byte)
            .unwrap_or_else(|| panic!("change_operand at {} on undefined opcode {}", position, byte));
        self.replace_instruction(position, &make(op, &[operand]));
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Scopes
    // -----------------------------------------------------------------------

    fn current_scope(&self) -> &CompilationScope {
        self.scopes.last().expect("compiler scope stack empty")
    }

    fn current_scope_mut(&mut self) -> &mut CompilationScope {
        self.scopes.last_mut().expect("compiler scope stack empty")
    }

    fn enter_scope(&mut self) {
        trace!("enter scope {}", self.scopes.len());
        self.scopes.push(CompilationScope::default());
        let outer = std::mem::take(&mut self.symbol_table);
        self.symbol_table = SymbolTable::enclosing(outer);
    }

    fn leave_scope(&mut self) -> Instructions {
        trace!("leave scope {}", self.scopes.len() - 1);
        let scope = self.scopes.pop().expect("leave_scope on empty scope stack");
        self.symbol_table = std::mem::take(&mut self.symbol_table)
            .into_outer()
            .expect("leave_scope without an enclosing symbol table");
        scope.instructions
    }
}
