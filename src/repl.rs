//! The interactive read-eval-print loop.

use std::io::{self, BufRead, Write};

use crate::error::Error;
use crate::interpreter::Interpreter;

const PROMPT: &str = ">>> ";

/// Run the REPL until `exit` or end of input. Symbol definitions,
/// constants, and globals persist across lines.
pub fn start() -> io::Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut interpreter = Interpreter::new();

    loop {
        write!(stdout, "{}", PROMPT)?;
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            return Ok(());
        }
        let line = line.trim_end_matches(['\n', '\r']);
        if line == "exit" {
            return Ok(());
        }

        match interpreter.run(line) {
            Ok(value) => writeln!(stdout, "{}", value)?,
            Err(Error::Parse(errors)) => {
                for error in errors {
                    writeln!(stdout, "{}", error)?;
                }
            }
            Err(Error::Compile(error)) => writeln!(stdout, "COMPILE ERROR: {}", error)?,
            Err(Error::Runtime(error)) => writeln!(stdout, "{}", error)?,
        }
    }
}
