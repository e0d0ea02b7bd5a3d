use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser as ClapParser;

use axe::code::instructions_string;
use axe::compiler::Compiler;
use axe::error::Error;
use axe::interpreter::Interpreter;
use axe::lexer::Lexer;
use axe::parser::Parser;
use axe::repl;

/// The axe language: bytecode compiler and stack VM.
#[derive(ClapParser)]
#[command(name = "axe", version, about)]
struct Args {
    /// Source file to run; starts the REPL when omitted.
    file: Option<PathBuf>,

    /// Print the compiled bytecode listing instead of executing.
    #[arg(long)]
    disassemble: bool,
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    match args.file {
        Some(path) => run_file(&path, args.disassemble),
        None => match repl::start() {
            Ok(()) => ExitCode::SUCCESS,
            Err(error) => {
                eprintln!("{}", error);
                ExitCode::FAILURE
            }
        },
    }
}

fn run_file(path: &Path, disassemble: bool) -> ExitCode {
    let source = match fs::read_to_string(path) {
        Ok(source) => source,
        Err(error) => {
            eprintln!("{}: {}", path.display(), error);
            return ExitCode::FAILURE;
        }
    };

    if disassemble {
        return disassemble_source(&source);
    }

    let mut interpreter = Interpreter::new();
    match interpreter.run(&source) {
        Ok(value) => {
            println!("{}", value);
            ExitCode::SUCCESS
        }
        Err(Error::Parse(errors)) => {
            for error in errors {
                eprintln!("{}", error);
            }
            ExitCode::FAILURE
        }
        Err(Error::Compile(error)) => {
            eprintln!("COMPILE ERROR: {}", error);
            ExitCode::FAILURE
        }
        Err(Error::Runtime(error)) => {
            eprintln!("{}", error);
            ExitCode::FAILURE
        }
    }
}

fn disassemble_source(source: &str) -> ExitCode {
    let mut parser = Parser::new(Lexer::new(source));
    let program = parser.parse();
    if !parser.errors().is_empty() {
        for error in parser.errors() {
            eprintln!("{}", error);
        }
        return ExitCode::FAILURE;
    }

    let mut compiler = Compiler::new();
    if let Err(error) = compiler.compile(&program) {
        eprintln!("COMPILE ERROR: {}", error);
        return ExitCode::FAILURE;
    }
    print!("{}", instructions_string(&compiler.bytecode().instructions));
    ExitCode::SUCCESS
}
