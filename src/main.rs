use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use clap::Subcommand;
use env_logger::Builder;
use log::{debug, info};
use memmap2::Mmap;

use rox::ast_printer::AstPrinter;
use rox::error::LoxError;
use rox::interpreter::Interpreter;
use rox::lox::{Lox, Outcome, EXIT_COMPILE_ERROR, EXIT_RUNTIME_ERROR};
use rox::parser::Parser;
use rox::scanner::Scanner;
use rox::token::Token;

#[derive(ClapParser, Debug)]
#[command(version, about = "Lox language interpreter", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    commands: Commands,

    /// Enable logging to app.log
    #[arg(long, global = true)]
    log: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Tokenizes input from a file, printing each token
    Tokenize {
        filename: PathBuf,

        /// Print the tokens as a JSON array
        #[arg(long)]
        json: bool,
    },

    /// Parses a program from a file and prints its AST
    Parse {
        filename: PathBuf,

        /// Print the statements as JSON
        #[arg(long)]
        json: bool,
    },

    /// Evaluates input from a file as a single expression and prints the result
    Evaluate { filename: PathBuf },

    /// Runs a Lox program from a file, or starts a prompt when none is given
    Run { filename: Option<PathBuf> },
}

/// Reads the contents of a file as UTF‑8 text.
fn read_file(filename: &Path) -> Result<String> {
    info!("Reading file: {:?}", filename);
    let file = File::open(filename).with_context(|| format!("Failed to open file {:?}", filename))?;

    let len: u64 = file
        .metadata()
        .with_context(|| format!("Failed to stat file {:?}", filename))?
        .len();

    // Mapping a zero-length file fails on some platforms.
    if len == 0 {
        return Ok(String::new());
    }

    // SAFETY: the map is read once, copied into a String, and dropped before
    // returning; the file is not expected to change while we read it.
    let map: Mmap = unsafe { Mmap::map(&file) }
        .with_context(|| format!("Failed to map file {:?}", filename))?;

    let text: &str = std::str::from_utf8(&map)
        .map_err(LoxError::from)
        .with_context(|| format!("File {:?} is not valid UTF-8", filename))?;

    info!("Read {} bytes from {:?}", text.len(), filename);

    Ok(text.to_owned())
}

fn init_logger() -> Result<()> {
    let log_file = File::create("app.log").context("Failed to create app.log")?;

    Builder::new()
        .format(|buf, record| {
            // Strip 'rox::' from module path
            let module = record
                .module_path()
                .unwrap_or("<unnamed>")
                .strip_prefix("rox::")
                .unwrap_or(record.module_path().unwrap_or("<unnamed>"));
            writeln!(
                buf,
                "[{}:{}] - {}",
                module,
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .filter(None, log::LevelFilter::Debug) // Default to Debug, override with RUST_LOG
        .parse_env("RUST_LOG")
        .init();

    info!("Logger initialized, writing to app.log");
    Ok(())
}

fn report(errors: &[LoxError]) {
    for e in errors {
        eprintln!("{}", e);
    }
}

fn tokenize(filename: &Path, json: bool) -> Result<i32> {
    let source: String = read_file(filename)?;
    let (tokens, errors) = Scanner::new(&source).scan_all();

    report(&errors);

    if json {
        println!("{}", serde_json::to_string_pretty(&tokens)?);
    } else {
        for token in &tokens {
            println!("{}", token);
        }
    }

    Ok(if errors.is_empty() { 0 } else { EXIT_COMPILE_ERROR })
}

fn parse(filename: &Path, json: bool) -> Result<i32> {
    let source: String = read_file(filename)?;
    let (tokens, lex_errors) = Scanner::new(&source).scan_all();

    match Parser::new(tokens).parse() {
        Ok(statements) if lex_errors.is_empty() => {
            if json {
                println!("{}", serde_json::to_string_pretty(&statements)?);
            } else {
                for stmt in &statements {
                    println!("{}", AstPrinter::print_stmt(stmt));
                }
            }
            Ok(0)
        }

        Ok(_) => {
            report(&lex_errors);
            Ok(EXIT_COMPILE_ERROR)
        }

        Err(errors) => {
            report(&lex_errors);
            report(&errors);
            Ok(EXIT_COMPILE_ERROR)
        }
    }
}

fn evaluate(filename: &Path) -> Result<i32> {
    let source: String = read_file(filename)?;
    let (tokens, lex_errors): (Vec<Token>, Vec<LoxError>) = Scanner::new(&source).scan_all();

    if !lex_errors.is_empty() {
        report(&lex_errors);
        return Ok(EXIT_COMPILE_ERROR);
    }

    let expr = match Parser::new(tokens).parse_expression() {
        Ok(expr) => expr,
        Err(errors) => {
            report(&errors);
            return Ok(EXIT_COMPILE_ERROR);
        }
    };

    let mut interpreter = Interpreter::new();
    match interpreter.evaluate(&expr) {
        Ok(value) => {
            debug!("Evaluated to: {}", value);
            println!("{}", value);
            Ok(0)
        }
        Err(e) => {
            eprintln!("{}", e);
            Ok(EXIT_RUNTIME_ERROR)
        }
    }
}

/// Print what went wrong with one run; returns its exit status.
fn finish(outcome: Outcome) -> i32 {
    match &outcome {
        Outcome::Success => {}
        Outcome::CompileError(errors) => report(errors),
        Outcome::RuntimeError(e) => eprintln!("{}", e),
    }

    outcome.exit_code()
}

fn run_file(filename: &Path) -> Result<i32> {
    let source: String = read_file(filename)?;
    let mut lox = Lox::new();

    Ok(finish(lox.run(&source)))
}

/// Read‑eval‑print loop: every line runs on its own against shared globals.
fn run_prompt() -> Result<i32> {
    info!("Starting prompt");

    let mut lox = Lox::new();
    let stdin = io::stdin();
    let mut lines = BufReader::new(stdin.lock()).lines();

    loop {
        print!("> ");
        io::stdout().flush()?;

        let Some(line) = lines.next() else {
            break; // Ctrl-D
        };

        let line: String = line.context("Failed to read from stdin")?;
        let status: i32 = finish(lox.run(&line));
        debug!("Prompt line finished with status {}", status);
    }

    println!();
    Ok(0)
}

fn main() -> Result<()> {
    let args: Cli = Cli::parse();

    // Initialize logger only if --log flag is provided
    if args.log {
        init_logger()?;
    } else {
        // Initialize a minimal logger to avoid "no logger" errors
        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Off)
            .init();
    }

    info!("CLI arguments: {:?}", args);

    let status: i32 = match args.commands {
        Commands::Tokenize { filename, json } => tokenize(&filename, json)?,
        Commands::Parse { filename, json } => parse(&filename, json)?,
        Commands::Evaluate { filename } => evaluate(&filename)?,
        Commands::Run { filename: Some(filename) } => run_file(&filename)?,
        Commands::Run { filename: None } => run_prompt()?,
    };

    if status != 0 {
        debug!("Exiting with code {}", status);
        std::process::exit(status);
    }

    Ok(())
}
