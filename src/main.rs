use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use loxide as lox;

use clap::error::ErrorKind;
use clap::Parser as ClapParser;
use clap::Subcommand;

use lox::ast_printer::AstPrinter;
use lox::error::LoxError;
use lox::interpreter::Interpreter;
use lox::parser::Parser;
use lox::resolver::Resolver;
use lox::scanner::Scanner;

#[derive(ClapParser, Debug)]
#[command(version, about, long_about = None, args_conflicts_with_subcommands = true)]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Script to run; omit it to get a REPL
    script: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Parses the script and pretty-prints its syntax tree
    Print { filename: PathBuf },
}

/// Everything that can stop a run: static errors (scan, parse, resolve;
/// possibly several of them) or a single runtime error.
enum RunError {
    Static(Vec<LoxError>),
    Runtime(LoxError),
}

fn main() -> anyhow::Result<()> {
    simple_logger::init()?;

    let args: Cli = match Cli::try_parse() {
        Ok(args) => args,

        Err(e) => {
            if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) {
                print!("{}", e);
                std::process::exit(0);
            }

            eprint!("{}", e);
            std::process::exit(64);
        }
    };

    match args.command {
        Some(Commands::Print { filename }) => print_file(&filename),

        None => match args.script {
            Some(script) => run_file(&script),

            None => run_prompt(),
        },
    }
}

fn run_file(path: &Path) -> anyhow::Result<()> {
    let source: Vec<u8> = read_source(path);

    let mut interpreter = Interpreter::new(io::stdout());

    match run(&mut interpreter, &source) {
        Ok(()) => Ok(()),

        Err(RunError::Static(errors)) => {
            for e in &errors {
                eprintln!("{}", e);
            }
            std::process::exit(65);
        }

        // A runtime failure halts the script but is not a process-level
        // error; the exit code stays 0.
        Err(RunError::Runtime(e)) => {
            eprintln!("{}", e);
            Ok(())
        }
    }
}

fn run_prompt() -> anyhow::Result<()> {
    let stdin = io::stdin();

    let mut interpreter = Interpreter::new(io::stdout());

    print!("> ");
    io::stdout().flush()?;

    for line in stdin.lock().lines() {
        let line: String = line?;

        match run(&mut interpreter, line.as_bytes()) {
            Ok(()) => {}

            Err(RunError::Static(errors)) => {
                for e in &errors {
                    eprintln!("{}", e);
                }
            }

            Err(RunError::Runtime(e)) => eprintln!("{}", e),
        }

        print!("> ");
        io::stdout().flush()?;
    }

    Ok(())
}

fn print_file(path: &Path) -> anyhow::Result<()> {
    let source: Vec<u8> = read_source(path);

    let tokens = match Scanner::new(&source).scan_tokens() {
        Ok(tokens) => tokens,

        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(65);
        }
    };

    let statements = match Parser::new(tokens).parse() {
        Ok(statements) => statements,

        Err(errors) => {
            for e in &errors {
                eprintln!("{}", e);
            }
            std::process::exit(65);
        }
    };

    print!("{}", AstPrinter::new().print(&statements));

    Ok(())
}

fn read_source(path: &Path) -> Vec<u8> {
    match fs::read(path) {
        Ok(bytes) => bytes,

        Err(e) => {
            eprintln!("{}: {}", path.display(), e);
            std::process::exit(66);
        }
    }
}

/// The full pipeline against a persistent interpreter: scan, parse, resolve,
/// interpret.  The REPL calls this once per line; locals recorded by earlier
/// lines stay valid because expression identities are never reused.
fn run<W: Write>(interpreter: &mut Interpreter<W>, source: &[u8]) -> Result<(), RunError> {
    let tokens = Scanner::new(source)
        .scan_tokens()
        .map_err(|e| RunError::Static(vec![e]))?;

    let statements = Parser::new(tokens).parse().map_err(RunError::Static)?;

    Resolver::new(interpreter)
        .resolve(&statements)
        .map_err(RunError::Static)?;

    interpreter.interpret(&statements).map_err(RunError::Runtime)
}
