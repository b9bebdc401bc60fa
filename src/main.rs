use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use clap::Subcommand;
use env_logger::Builder;
use log::{debug, info};

use yellow_interpreter as yellow;

use yellow::ast::Ast;
use yellow::error::YellowError;
use yellow::interpreter::Interpreter;
use yellow::parser::Parser;
use yellow::resolver::Resolver;
use yellow::scanner::Scanner;
use yellow::stmt::Stmt;
use yellow::token::Token;

const PROMPT: &str = "yellow|>>> ";

#[derive(ClapParser, Debug)]
#[command(version, about = "Yellow language interpreter", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    commands: Commands,

    /// Enable logging to yellow.log
    #[arg(long, global = true)]
    log: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Tokenizes input from a file, printing each token
    Tokenize {
        filename: PathBuf,

        /// Emit the token stream as JSON
        #[arg(long)]
        json: bool,
    },

    /// Parses input from a file and prints each statement's AST
    Parse { filename: PathBuf },

    /// Runs input from a file as a Yellow program
    Run { filename: PathBuf },

    /// Starts an interactive prompt
    Repl,
}

/// What a single run produced, mapped to exit codes by the caller.
#[derive(Debug, Default, Clone, Copy)]
struct RunOutcome {
    static_error: bool,
    runtime_error: bool,
}

/// Reads a source file, enforcing the scanner's valid-UTF-8 precondition.
fn read_file(filename: &PathBuf) -> Result<String> {
    info!("Reading file: {:?}", filename);

    let file = File::open(filename).context(format!("Failed to open file {:?}", filename))?;
    let mut reader = BufReader::new(file);
    let mut buf = Vec::new();

    let bytes = reader
        .read_to_end(&mut buf)
        .context(format!("Failed to read file {:?}", filename))?;

    info!("Read {} bytes from {:?}", bytes, filename);

    String::from_utf8(buf).context(format!("File {:?} is not valid UTF-8", filename))
}

fn init_logger() -> Result<()> {
    let log_file = File::create("yellow.log").context("Failed to create yellow.log")?;

    // Route records to the file with a [module:line] prefix.
    Builder::new()
        .format(|buf, record| {
            let module = record
                .module_path()
                .unwrap_or("<unnamed>")
                .strip_prefix("yellow_interpreter::")
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
        .filter(None, log::LevelFilter::Debug) // override with RUST_LOG
        .init();

    info!("Logger initialized, writing to yellow.log");

    Ok(())
}

/// Scan the whole source, splitting tokens from lexical errors.  The scanner
/// recovers from bad bytes itself, so both lists can be non-empty.
fn scan(source: &[u8]) -> (Vec<Token>, Vec<YellowError>) {
    let mut tokens: Vec<Token> = Vec::new();
    let mut errors: Vec<YellowError> = Vec::new();

    for result in Scanner::new(source) {
        match result {
            Ok(token) => tokens.push(token),
            Err(e) => errors.push(e),
        }
    }

    (tokens, errors)
}

/// Front half of the pipeline: scan and parse, reporting every accumulated
/// error.  Returns the statements only when both stages fully succeeded.
fn frontend(source: &[u8]) -> Option<Vec<Stmt>> {
    let (tokens, scan_errors) = scan(source);

    for e in &scan_errors {
        eprintln!("{}", e);
    }

    let mut parser = Parser::new(&tokens);

    let statements = match parser.parse() {
        Ok(statements) => statements,

        Err(errors) => {
            for e in errors {
                eprintln!("{}", e);
            }
            return None;
        }
    };

    if scan_errors.is_empty() {
        Some(statements)
    } else {
        None
    }
}

/// Run one source text against a (possibly persistent) interpreter.
fn run_source(interpreter: &mut Interpreter, source: &[u8]) -> RunOutcome {
    let statements = match frontend(source) {
        Some(statements) => statements,

        None => {
            return RunOutcome {
                static_error: true,
                ..Default::default()
            };
        }
    };

    if let Err(errors) = Resolver::new(interpreter).resolve(&statements) {
        for e in errors {
            eprintln!("{}", e);
        }

        return RunOutcome {
            static_error: true,
            ..Default::default()
        };
    }

    if let Err(e) = interpreter.interpret(&statements) {
        eprintln!("{}", e);

        return RunOutcome {
            runtime_error: true,
            ..Default::default()
        };
    }

    RunOutcome::default()
}

fn main() -> Result<()> {
    let args: Cli = Cli::parse();

    if args.log {
        init_logger()?;
    } else {
        // Minimal logger to avoid "no logger" warnings.
        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Off)
            .init();
    }

    info!("CLI arguments: {:?}", args);

    match args.commands {
        Commands::Tokenize { filename, json } => {
            info!("Running Tokenize subcommand");

            let buf = read_file(&filename)?;
            let (tokens, errors) = scan(buf.as_bytes());

            for e in &errors {
                eprintln!("{}", e);
            }

            if json {
                println!("{}", serde_json::to_string_pretty(&tokens)?);
            } else {
                for token in &tokens {
                    debug!("Scanned token: {}", token);

                    println!("{}", token);
                }
            }

            if !errors.is_empty() {
                debug!("Tokenization failed, exiting with code 65");

                std::process::exit(65);
            }

            info!("Tokenization completed successfully");
        }

        Commands::Parse { filename } => {
            info!("Running Parse subcommand");

            let buf = read_file(&filename)?;

            match frontend(buf.as_bytes()) {
                Some(statements) => {
                    let printer = Ast;

                    for stmt in &statements {
                        println!("{}", printer.print_stmt(stmt));
                    }
                }

                None => std::process::exit(65),
            }

            info!("Parse subcommand completed");
        }

        Commands::Run { filename } => {
            info!("Running Run subcommand");

            let buf = read_file(&filename)?;
            let mut interpreter = Interpreter::new();

            let outcome = run_source(&mut interpreter, buf.as_bytes());

            if outcome.static_error {
                std::process::exit(65);
            }
            if outcome.runtime_error {
                std::process::exit(70);
            }

            info!("Program executed successfully");
        }

        Commands::Repl => {
            info!("Starting REPL");

            // One interpreter for the whole session: definitions persist
            // across lines, and an error aborts only the current line.
            let mut interpreter = Interpreter::new();

            let stdin = io::stdin();
            let mut lines = stdin.lock().lines();

            loop {
                print!("{}", PROMPT);
                io::stdout().flush()?;

                let line = match lines.next() {
                    Some(line) => line?,
                    None => break,
                };

                let _ = run_source(&mut interpreter, line.as_bytes());
            }

            info!("REPL session ended");
        }
    }

    Ok(())
}
