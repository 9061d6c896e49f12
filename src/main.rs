use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use clap::Subcommand;
use env_logger::Builder;
use log::{debug, info};
use memmap2::Mmap;

use treelox as lox;

use lox::ast_printer::AstPrinter;
use lox::interpreter::Interpreter;
use lox::parser::Parser;
use lox::resolver::Resolver;
use lox::scanner::Scanner;
use lox::token::Token;

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
    Tokenize { filename: Option<PathBuf> },

    /// Parses input from a file as a single expression and prints its AST
    Parse { filename: Option<PathBuf> },

    /// Evaluates input from a file as a single expression and prints the result
    Evaluate { filename: Option<PathBuf> },

    /// Runs input from a file as a Lox program
    Run { filename: Option<PathBuf> },
}

/// Read-only mapping of a script file.  Tokens borrow directly from the map,
/// so it must outlive the whole pipeline.
struct SourceFile {
    map: Option<Mmap>,
}

impl SourceFile {
    fn open(filename: &Path) -> Result<Self> {
        info!("Mapping file: {:?}", filename);

        let file =
            File::open(filename).with_context(|| format!("Failed to open file {:?}", filename))?;

        let len = file
            .metadata()
            .with_context(|| format!("Failed to stat file {:?}", filename))?
            .len();

        // Zero-length files cannot be mapped; there is nothing to scan anyway.
        if len == 0 {
            info!("File {:?} is empty", filename);

            return Ok(Self { map: None });
        }

        // SAFETY: the mapping is read-only and lives for the whole run; the
        // script file is not expected to change underneath the interpreter.
        let map = unsafe { Mmap::map(&file) }
            .with_context(|| format!("Failed to map file {:?}", filename))?;

        info!("Mapped {} bytes from {:?}", len, filename);

        Ok(Self { map: Some(map) })
    }

    fn source(&self) -> Result<&str> {
        match &self.map {
            Some(map) => std::str::from_utf8(map).context("Source is not valid UTF-8"),
            None => Ok(""),
        }
    }
}

fn init_logger() -> Result<()> {
    // Create or open the log file
    let log_file = File::create("app.log").context("Failed to create app.log")?;

    // Configure env_logger to write to file with module path and source line
    Builder::new()
        .format(|buf, record| {
            // Strip 'treelox::' from module path
            let module = record
                .module_path()
                .unwrap_or("<unnamed>")
                .strip_prefix("treelox::")
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
        .init();

    info!("Logger initialized, writing to app.log");

    Ok(())
}

/// Missing filename: report and exit cleanly, like an empty REPL session.
fn require_filename(filename: Option<PathBuf>) -> PathBuf {
    match filename {
        Some(filename) => filename,

        None => {
            info!("No filepath provided");

            println!("No input filepath was provided. Exiting...");

            std::process::exit(0);
        }
    }
}

/// Scan the whole source up front.  Lexical diagnostics go to stderr, and
/// any of them stops the pipeline before parsing.
fn scan_or_exit(source: &str) -> Vec<Token<'_>> {
    let mut tokens: Vec<Token<'_>> = Vec::new();
    let mut had_error = false;

    for result in Scanner::new(source) {
        match result {
            Ok(token) => tokens.push(token),

            Err(e) => {
                had_error = true;

                debug!("Lex debug: {}", e);

                eprintln!("{}", e);
            }
        }
    }

    if had_error {
        debug!("Scanning failed, exiting with code 65");

        std::process::exit(65);
    }

    tokens
}

fn cmd_tokenize(filename: Option<PathBuf>) -> Result<()> {
    info!("Running Tokenize subcommand");

    let file = SourceFile::open(&require_filename(filename))?;
    let source = file.source()?;

    let mut tokenized = true;

    for result in Scanner::new(source) {
        match result {
            Ok(token) => {
                debug!("Scanned token: {}", token);

                println!("{}", token);
            }

            Err(e) => {
                tokenized = false;

                debug!("Tokenization debug: {}", e);

                eprintln!("{}", e);
            }
        }
    }

    if !tokenized {
        debug!("Tokenization failed, exiting with code 65");

        std::process::exit(65);
    }

    info!("Tokenization completed successfully");

    Ok(())
}

fn cmd_parse(filename: Option<PathBuf>) -> Result<()> {
    info!("Running Parse subcommand");

    let file = SourceFile::open(&require_filename(filename))?;
    let source = file.source()?;

    let tokens = scan_or_exit(source);

    match Parser::new(&tokens).parse_expression() {
        Ok(expr) => {
            let ast_str = AstPrinter::print(&expr);

            debug!("AST: {}", ast_str);

            println!("{}", ast_str);
        }

        Err(e) => {
            debug!("Parse debug: {}", e);

            eprintln!("{}", e);

            std::process::exit(65);
        }
    }

    info!("Parse subcommand completed");

    Ok(())
}

fn cmd_evaluate(filename: Option<PathBuf>) -> Result<()> {
    info!("Running Evaluate subcommand");

    let file = SourceFile::open(&require_filename(filename))?;
    let source = file.source()?;

    let tokens = scan_or_exit(source);

    match Parser::new(&tokens).parse_expression() {
        Ok(expr) => {
            let mut interpreter = Interpreter::new();

            match interpreter.evaluate(&expr) {
                Ok(value) => {
                    debug!("Evaluated to: {}", value);

                    println!("{}", value);
                }

                Err(e) => {
                    debug!("Evaluation debug: {}", e);

                    eprintln!("{}", e);

                    std::process::exit(70);
                }
            }
        }

        Err(e) => {
            debug!("Parse debug: {}", e);

            eprintln!("{}", e);

            std::process::exit(65);
        }
    }

    info!("Evaluate subcommand completed");

    Ok(())
}

fn cmd_run(filename: Option<PathBuf>) -> Result<()> {
    info!("Running Run subcommand");

    let file = SourceFile::open(&require_filename(filename))?;
    let source = file.source()?;

    let tokens = scan_or_exit(source);

    let statements = match Parser::new(&tokens).parse() {
        Ok(statements) => statements,

        Err(errors) => {
            for e in &errors {
                debug!("Parse debug: {}", e);

                eprintln!("{}", e);
            }

            std::process::exit(65);
        }
    };

    info!("Parsed {} statements", statements.len());

    let mut interpreter = Interpreter::new();

    {
        let mut resolver = Resolver::new(&mut interpreter);

        if let Err(errors) = resolver.resolve(&statements) {
            for e in &errors {
                debug!("Resolve debug: {}", e);

                eprintln!("{}", e);
            }

            std::process::exit(65);
        }
    }

    if let Err(e) = interpreter.interpret(&statements) {
        debug!("Runtime debug: {}", e);

        eprintln!("{}", e);

        std::process::exit(70);
    }

    info!("Program executed successfully");

    Ok(())
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

    match args.commands {
        Commands::Tokenize { filename } => cmd_tokenize(filename),
        Commands::Parse { filename } => cmd_parse(filename),
        Commands::Evaluate { filename } => cmd_evaluate(filename),
        Commands::Run { filename } => cmd_run(filename),
    }
}
