//! IPPcode23 interpreter entry point.
//!
//! Reads an IPPcode23 XML program from `--source` (or stdin), an optional
//! user-input stream from `--input` (or stdin), and runs it to completion,
//! exiting with the interpreter's own status code on success or the
//! matching diagnostic code on failure.

mod cli;
mod diagnostics;
mod engine;
mod frame;
mod io;
mod program;
mod resolver;
mod value;
mod xml;

use std::env;
use std::fs;
use std::process::ExitCode;

use diagnostics::RuntimeError;
use io::InputSource;

fn read_source(path: Option<&str>) -> Result<String, RuntimeError> {
    match path {
        Some(path) => {
            fs::read_to_string(path).map_err(|e| RuntimeError::CantOpenFile(format!("{}: {}", path, e)))
        }
        None => {
            use std::io::Read;
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .map_err(|e| RuntimeError::CantOpenFile(e.to_string()))?;
            Ok(buf)
        }
    }
}

fn make_input(path: Option<&str>) -> Result<InputSource, RuntimeError> {
    match path {
        Some(path) => InputSource::from_file(path),
        None => Ok(InputSource::from_stdin()),
    }
}

fn run() -> Result<i32, RuntimeError> {
    let argv: Vec<String> = env::args().skip(1).collect();
    let args = cli::parse(&argv)?;

    if args.help {
        print!("{}", cli::usage());
        return Ok(0);
    }

    let source_text = read_source(args.source.as_deref())?;
    let raw = xml::parse(&source_text)?;
    let program = program::load(raw)?;
    let input = make_input(args.input.as_deref())?;

    engine::run(&program, input)
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => match u8::try_from(code) {
            Ok(code) => ExitCode::from(code),
            Err(_) => ExitCode::FAILURE,
        },
        Err(err) => {
            diagnostics::report_and_exit(&err);
        }
    }
}
