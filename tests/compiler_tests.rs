use pretty_assertions::assert_eq;

use axe::ast::Program;
use axe::code::{Instructions, Opcode, instructions_string, make};
use axe::compiler::{Bytecode, Compiler};
use axe::error::CompileError;
use axe::lexer::Lexer;
use axe::parser::Parser;
use axe::value::Value;

fn parse(input: &str) -> Program {
    let mut parser = Parser::new(Lexer::new(input));
    let program = parser.parse();
    assert_eq!(parser.errors(), &[] as &[String], "input: {}", input);
    program
}

fn compile(input: &str) -> Bytecode {
    let mut compiler = Compiler::new();
    compiler
        .compile(&parse(input))
        .unwrap_or_else(|err| panic!("compile error for {:?}: {}", input, err));
    compiler.bytecode()
}

fn compile_err(input: &str) -> CompileError {
    let mut compiler = Compiler::new();
    compiler
        .compile(&parse(input))
        .expect_err("expected a compile error")
}

fn concat(instructions: &[Instructions]) -> Instructions {
    instructions.concat()
}

/// Compare through the disassembler so mismatches print as listings.
fn assert_instructions(input: &str, expected: &[Instructions]) {
    let bytecode = compile(input);
    assert_eq!(
        instructions_string(&bytecode.instructions),
        instructions_string(&concat(expected)),
        "input: {}",
        input
    );
}

fn function_constant(bytecode: &Bytecode, index: usize) -> String {
    match &bytecode.constants[index] {
        Value::Function(function) => instructions_string(&function.instructions),
        other => panic!("constant {} is {}, not a function", index, other.type_name()),
    }
}

#[test]
fn integer_arithmetic() {
    assert_instructions(
        "1 + 2",
        &[
            make(Opcode::Constant, &[0]),
            make(Opcode::Constant, &[1]),
            make(Opcode::Add, &[]),
            make(Opcode::Pop, &[]),
        ],
    );
    assert_instructions(
        "1; 2",
        &[
            make(Opcode::Constant, &[0]),
            make(Opcode::Pop, &[]),
            make(Opcode::Constant, &[1]),
            make(Opcode::Pop, &[]),
        ],
    );
    assert_instructions(
        "1 - 2",
        &[
            make(Opcode::Constant, &[0]),
            make(Opcode::Constant, &[1]),
            make(Opcode::Sub, &[]),
            make(Opcode::Pop, &[]),
        ],
    );
    assert_instructions(
        "1 * 2",
        &[
            make(Opcode::Constant, &[0]),
            make(Opcode::Constant, &[1]),
            make(Opcode::Mul, &[]),
            make(Opcode::Pop, &[]),
        ],
    );
    assert_instructions(
        "2 / 1",
        &[
            make(Opcode::Constant, &[0]),
            make(Opcode::Constant, &[1]),
            make(Opcode::Div, &[]),
            make(Opcode::Pop, &[]),
        ],
    );
    assert_instructions(
        "-1",
        &[
            make(Opcode::Constant, &[0]),
            make(Opcode::Minus, &[]),
            make(Opcode::Pop, &[]),
        ],
    );

    let bytecode = compile("1 + 2");
    assert_eq!(bytecode.constants, vec![Value::Int(1), Value::Int(2)]);
}

#[test]
fn boolean_expressions() {
    assert_instructions("true", &[make(Opcode::True, &[]), make(Opcode::Pop, &[])]);
    assert_instructions("false", &[make(Opcode::False, &[]), make(Opcode::Pop, &[])]);
    assert_instructions(
        "1 > 2",
        &[
            make(Opcode::Constant, &[0]),
            make(Opcode::Constant, &[1]),
            make(Opcode::GreaterThan, &[]),
            make(Opcode::Pop, &[]),
        ],
    );
    assert_instructions(
        "1 == 2",
        &[
            make(Opcode::Constant, &[0]),
            make(Opcode::Constant, &[1]),
            make(Opcode::Eq, &[]),
            make(Opcode::Pop, &[]),
        ],
    );
    assert_instructions(
        "1 != 2",
        &[
            make(Opcode::Constant, &[0]),
            make(Opcode::Constant, &[1]),
            make(Opcode::NotEq, &[]),
            make(Opcode::Pop, &[]),
        ],
    );
    assert_instructions(
        "true != false",
        &[
            make(Opcode::True, &[]),
            make(Opcode::False, &[]),
            make(Opcode::NotEq, &[]),
            make(Opcode::Pop, &[]),
        ],
    );
    assert_instructions(
        "!true",
        &[
            make(Opcode::True, &[]),
            make(Opcode::Bang, &[]),
            make(Opcode::Pop, &[]),
        ],
    );
}

#[test]
fn less_than_swaps_operands() {
    // `1 < 2` pushes the rhs first, so the constants land swapped.
    let bytecode = compile("1 < 2");
    assert_eq!(bytecode.constants, vec![Value::Int(2), Value::Int(1)]);
    assert_instructions(
        "1 < 2",
        &[
            make(Opcode::Constant, &[0]),
            make(Opcode::Constant, &[1]),
            make(Opcode::GreaterThan, &[]),
            make(Opcode::Pop, &[]),
        ],
    );

    // `a < b` and `b > a` compile to identical bytecode packages.
    assert_eq!(compile("1 < 2"), compile("2 > 1"));
}

#[test]
fn conditionals() {
    let bytecode = compile("if true { 10 }; 3333;");
    let expected = "\
0000 OpTrue
0001 OpJumpNotTruthy 10
0004 OpConstant 0
0007 OpJump 11
0010 OpNull
0011 OpPop
0012 OpConstant 1
0015 OpPop
";
    assert_eq!(instructions_string(&bytecode.instructions), expected);

    let bytecode = compile("if true { 10 } else { 20 }; 3333;");
    let expected = "\
0000 OpTrue
0001 OpJumpNotTruthy 10
0004 OpConstant 0
0007 OpJump 13
0010 OpConstant 1
0013 OpPop
0014 OpConstant 2
0017 OpPop
";
    assert_eq!(instructions_string(&bytecode.instructions), expected);
    assert_eq!(
        bytecode.constants,
        vec![Value::Int(10), Value::Int(20), Value::Int(3333)]
    );
}

#[test]
fn global_let_statements() {
    assert_instructions(
        "let one = 1; let two = 2;",
        &[
            make(Opcode::Constant, &[0]),
            make(Opcode::SetGlobal, &[0]),
            make(Opcode::Constant, &[1]),
            make(Opcode::SetGlobal, &[1]),
        ],
    );
    assert_instructions(
        "let one = 1; one;",
        &[
            make(Opcode::Constant, &[0]),
            make(Opcode::SetGlobal, &[0]),
            make(Opcode::GetGlobal, &[0]),
            make(Opcode::Pop, &[]),
        ],
    );
    assert_instructions(
        "let one = 1; let two = one; two;",
        &[
            make(Opcode::Constant, &[0]),
            make(Opcode::SetGlobal, &[0]),
            make(Opcode::GetGlobal, &[0]),
            make(Opcode::SetGlobal, &[1]),
            make(Opcode::GetGlobal, &[1]),
            make(Opcode::Pop, &[]),
        ],
    );
}

#[test]
fn string_expressions() {
    let bytecode = compile("\"axe\"");
    assert_eq!(bytecode.constants, vec![Value::Str("axe".into())]);

    assert_instructions(
        "\"ax\" + \"e\"",
        &[
            make(Opcode::Constant, &[0]),
            make(Opcode::Constant, &[1]),
            make(Opcode::Add, &[]),
            make(Opcode::Pop, &[]),
        ],
    );
}

#[test]
fn float_expressions() {
    let bytecode = compile("1.5 + 2.25");
    assert_eq!(bytecode.constants, vec![Value::Float(1.5), Value::Float(2.25)]);
}

#[test]
fn functions() {
    let bytecode = compile("fn() { return 5 + 10 }");
    assert_eq!(
        function_constant(&bytecode, 2),
        "\
0000 OpConstant 0
0003 OpConstant 1
0006 OpAdd
0007 OpReturnValue
"
    );
    assert_eq!(
        instructions_string(&bytecode.instructions),
        "0000 OpConstant 2\n0003 OpPop\n"
    );

    // An implicit final expression: the trailing Pop is rewritten in place.
    let implicit = compile("fn() { 5 + 10 }");
    assert_eq!(function_constant(&implicit, 2), function_constant(&bytecode, 2));

    let two_statements = compile("fn() { 1; 2 }");
    assert_eq!(
        function_constant(&two_statements, 2),
        "\
0000 OpConstant 0
0003 OpPop
0004 OpConstant 1
0007 OpReturnValue
"
    );

    // An empty body has nothing to return.
    let empty = compile("fn() { }");
    assert_eq!(function_constant(&empty, 0), "0000 OpReturn\n");
}

#[test]
fn function_calls() {
    assert_instructions(
        "fn() { 24 }();",
        &[
            make(Opcode::Constant, &[1]),
            make(Opcode::Call, &[0]),
            make(Opcode::Pop, &[]),
        ],
    );
    assert_instructions(
        "let noArg = fn() { 24 }; noArg();",
        &[
            make(Opcode::Constant, &[1]),
            make(Opcode::SetGlobal, &[0]),
            make(Opcode::GetGlobal, &[0]),
            make(Opcode::Call, &[0]),
            make(Opcode::Pop, &[]),
        ],
    );

    let bytecode = compile("let oneArg = fn(a) { a }; oneArg(24);");
    assert_eq!(
        function_constant(&bytecode, 0),
        "0000 OpGetLocal 0\n0002 OpReturnValue\n"
    );
    assert_instructions(
        "let oneArg = fn(a) { a }; oneArg(24);",
        &[
            make(Opcode::Constant, &[0]),
            make(Opcode::SetGlobal, &[0]),
            make(Opcode::GetGlobal, &[0]),
            make(Opcode::Constant, &[1]),
            make(Opcode::Call, &[1]),
            make(Opcode::Pop, &[]),
        ],
    );

    let bytecode = compile("let manyArg = fn(a, b, c) { a; b; c }; manyArg(24, 25, 26);");
    assert_eq!(
        function_constant(&bytecode, 0),
        "\
0000 OpGetLocal 0
0002 OpPop
0003 OpGetLocal 1
0005 OpPop
0006 OpGetLocal 2
0008 OpReturnValue
"
    );
}

#[test]
fn let_statement_scopes() {
    let bytecode = compile("let num = 55; fn() { num }");
    assert_eq!(
        function_constant(&bytecode, 1),
        "0000 OpGetGlobal 0\n0003 OpReturnValue\n"
    );

    let bytecode = compile("fn() { let num = 55; num }");
    assert_eq!(
        function_constant(&bytecode, 1),
        "\
0000 OpConstant 0
0003 OpSetLocal 0
0005 OpGetLocal 0
0007 OpReturnValue
"
    );

    let bytecode = compile("fn() { let a = 55; let b = 77; a + b }");
    assert_eq!(
        function_constant(&bytecode, 2),
        "\
0000 OpConstant 0
0003 OpSetLocal 0
0005 OpConstant 1
0008 OpSetLocal 1
0010 OpGetLocal 0
0012 OpGetLocal 1
0014 OpAdd
0015 OpReturnValue
"
    );
    match &bytecode.constants[2] {
        Value::Function(function) => {
            assert_eq!(function.num_locals, 2);
            assert_eq!(function.num_params, 0);
        }
        other => panic!("expected function, got {}", other.type_name()),
    }
}

#[test]
fn named_function_declarations_leave_no_pop() {
    assert_instructions(
        "fn fivePlusTen() { 5 + 10 }",
        &[
            make(Opcode::Constant, &[2]),
            make(Opcode::SetGlobal, &[0]),
        ],
    );
    assert_instructions(
        "fn five() { 5 } five()",
        &[
            make(Opcode::Constant, &[1]),
            make(Opcode::SetGlobal, &[0]),
            make(Opcode::GetGlobal, &[0]),
            make(Opcode::Call, &[0]),
            make(Opcode::Pop, &[]),
        ],
    );
}

#[test]
fn parameters_occupy_the_first_local_slots() {
    let bytecode = compile("fn sum(a, b) { let c = a + b; c }");
    assert_eq!(
        function_constant(&bytecode, 0),
        "\
0000 OpGetLocal 0
0002 OpGetLocal 1
0004 OpAdd
0005 OpSetLocal 2
0007 OpGetLocal 2
0009 OpReturnValue
"
    );
    match &bytecode.constants[0] {
        Value::Function(function) => {
            assert_eq!(function.num_locals, 3);
            assert_eq!(function.num_params, 2);
        }
        other => panic!("expected function, got {}", other.type_name()),
    }
}

#[test]
fn compile_errors() {
    assert_eq!(
        compile_err("foo"),
        CompileError::UndefinedVariable("foo".to_string())
    );
    assert_eq!(
        compile_err("foo + 1"),
        CompileError::UndefinedVariable("foo".to_string())
    );
    assert_eq!(
        compile_err("let x = 5; let x = 6;"),
        CompileError::AlreadyDefined("x".to_string())
    );
    assert_eq!(
        compile_err("fn(a) { let a = 1; a }"),
        CompileError::AlreadyDefined("a".to_string())
    );
    assert_eq!(
        compile_err("let m = 1; match m { _ => { 1 } }"),
        CompileError::CannotCompile("Match")
    );
    assert_eq!(
        compile_err("fn(a) { let a = 1; a }").to_string(),
        "variable a already defined"
    );
    assert_eq!(
        compile_err("missing").to_string(),
        "undefined variable missing"
    );
    assert_eq!(
        compile_err("let m = 1; match m { _ => { 1 } }").to_string(),
        "cannot compile Match"
    );
}

#[test]
fn enclosing_function_locals_are_not_visible() {
    // There is no free-variable capture: a local from an enclosing
    // function scope cannot be addressed from an inner frame.
    assert_eq!(
        compile_err("fn() { let a = 1; fn() { a } }"),
        CompileError::UndefinedVariable("a".to_string())
    );
    // Globals are always reachable.
    compile("let a = 1; fn() { fn() { a } }");
}

#[test]
fn operand_width_limits_are_enforced() {
    // 256 parameters cannot encode in the u8 argument count.
    let params: Vec<String> = (0..256).map(|i| format!("p{}", i)).collect();
    let input = format!("fn({}) {{ 1 }}", params.join(", "));
    assert_eq!(compile_err(&input), CompileError::TooManyArguments);

    // Neither can 256 call arguments.
    let args = vec!["1"; 256].join(", ");
    let input = format!("fn() {{ 1 }}({})", args);
    assert_eq!(compile_err(&input), CompileError::TooManyArguments);

    // The 257th local would need index 256, past the u8 operand.
    let lets: Vec<String> = (0..257).map(|i| format!("let l{} = {};", i, i)).collect();
    let input = format!("fn() {{ {} }}", lets.concat());
    assert_eq!(compile_err(&input), CompileError::TooManyLocals);

    // The 65537th constant would need index 65536, past the u16 operand.
    let input = "1;".repeat(65537);
    assert_eq!(compile_err(&input), CompileError::TooManyConstants);
}

#[test]
fn incremental_compilation_accumulates_state() {
    let mut compiler = Compiler::new();
    compiler.compile(&parse("let one = 1;")).unwrap();
    let (table, constants) = compiler.into_state();

    let mut compiler = Compiler::with_state(table, constants);
    compiler.compile(&parse("one + 2")).unwrap();
    let bytecode = compiler.bytecode();

    // `one` resolves to the global defined by the previous compile, and
    // the constant pool keeps growing.
    assert_eq!(
        instructions_string(&bytecode.instructions),
        "\
0000 OpGetGlobal 0
0003 OpConstant 1
0006 OpAdd
0007 OpPop
"
    );
    assert_eq!(bytecode.constants, vec![Value::Int(1), Value::Int(2)]);
}
