//! The source‑to‑effects pipeline: scan → parse → resolve → interpret.
//!
//! A [`Lox`] session owns one interpreter, so globals defined by one `run`
//! are visible to the next.  This is what the prompt relies on.

use std::io::Write;

use log::{debug, info};

use crate::ast::Stmt;
use crate::error::{LoxError, RuntimeError};
use crate::interpreter::Interpreter;
use crate::parser::Parser;
use crate::resolver::Resolver;
use crate::scanner::Scanner;

/// Exit status for compile‑time failures (`EX_DATAERR`).
pub const EXIT_COMPILE_ERROR: i32 = 65;

/// Exit status for runtime failures (`EX_SOFTWARE`).
pub const EXIT_RUNTIME_ERROR: i32 = 70;

/// What happened to one piece of source text.
#[derive(Debug)]
pub enum Outcome {
    Success,

    /// Lexical, syntax or resolution diagnostics.  Nothing was executed.
    CompileError(Vec<LoxError>),

    /// Execution started and stopped at this error.
    RuntimeError(RuntimeError),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success)
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            Outcome::Success => 0,
            Outcome::CompileError(_) => EXIT_COMPILE_ERROR,
            Outcome::RuntimeError(_) => EXIT_RUNTIME_ERROR,
        }
    }
}

pub struct Lox {
    interpreter: Interpreter,
}

impl Default for Lox {
    fn default() -> Self {
        Self::new()
    }
}

impl Lox {
    /// A session printing to stdout.
    pub fn new() -> Self {
        Self {
            interpreter: Interpreter::new(),
        }
    }

    /// A session whose `print` output goes to `output`.
    pub fn with_output(output: Box<dyn Write>) -> Self {
        Self {
            interpreter: Interpreter::with_output(output),
        }
    }

    /// Scan, parse and resolve `source` without running it.
    ///
    /// Lexical errors do not stop parsing, so one call reports as many
    /// problems as possible.
    pub fn compile(&self, source: &str) -> Result<Vec<Stmt>, Vec<LoxError>> {
        let (tokens, mut errors) = Scanner::new(source).scan_all();

        let statements: Vec<Stmt> = match Parser::new(tokens).parse() {
            Ok(statements) => statements,
            Err(parse_errors) => {
                errors.extend(parse_errors);
                return Err(errors);
            }
        };

        if !errors.is_empty() {
            return Err(errors);
        }

        let known: Vec<String> = self.interpreter.global_names();
        Resolver::with_globals(known).resolve(&statements)?;

        debug!("Compiled {} statement(s)", statements.len());
        Ok(statements)
    }

    /// Run `source` to completion against this session's globals.
    pub fn run(&mut self, source: &str) -> Outcome {
        info!("Running {} byte(s) of source", source.len());

        let statements: Vec<Stmt> = match self.compile(source) {
            Ok(statements) => statements,
            Err(errors) => return Outcome::CompileError(errors),
        };

        self.interpret(&statements)
    }

    /// Execute an already resolved program.
    pub fn interpret(&mut self, statements: &[Stmt]) -> Outcome {
        match self.interpreter.interpret(statements) {
            Ok(()) => Outcome::Success,
            Err(e) => Outcome::RuntimeError(e),
        }
    }
}
