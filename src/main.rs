use std::fs::File;
use std::io::{BufReader, Read};
use std::path::PathBuf;

use clap::Parser as ClapParser;
use clap::Subcommand;

use treelox::ast_printer::AstPrinter;
use treelox::error::{LoxError, Result};
use treelox::interpreter::Interpreter;
use treelox::parser::Parser;
use treelox::resolver::Resolver;
use treelox::scanner::Scanner;
use treelox::stmt::Stmt;
use treelox::token::Token;

#[derive(ClapParser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Scan the source file and dump its token stream
    Tokenize { filename: PathBuf },

    /// Parse the source file and dump its statement tree
    Parse { filename: PathBuf },

    /// Execute the source file
    Run { filename: PathBuf },
}

fn read_source(filename: &PathBuf) -> anyhow::Result<Vec<u8>> {
    let mut buf: Vec<u8> = Vec::new();
    let mut reader: BufReader<File> = BufReader::new(File::open(filename)?);
    reader.read_to_end(&mut buf)?;
    Ok(buf)
}

fn scan(buf: Vec<u8>) -> Result<Vec<Token>> {
    Scanner::new(buf).collect()
}

fn parse(buf: Vec<u8>) -> Result<Vec<Stmt>> {
    let tokens = scan(buf)?;
    Parser::new(tokens).parse()
}

/// Exit code for scan/parse/resolve failures (EX_DATAERR).
const EXIT_STATIC_ERROR: i32 = 65;
/// Exit code for runtime failures (EX_SOFTWARE).
const EXIT_RUNTIME_ERROR: i32 = 70;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args: Cli = Cli::parse();

    match args.command {
        Commands::Tokenize { filename } => {
            let buf = read_source(&filename)?;

            let mut clean = true;
            for token in Scanner::new(buf) {
                match token {
                    Ok(token) => println!("{}", token),
                    Err(e) => {
                        clean = false;
                        eprintln!("{}", e);
                    }
                }
            }

            if !clean {
                std::process::exit(EXIT_STATIC_ERROR);
            }
        }

        Commands::Parse { filename } => {
            let buf = read_source(&filename)?;

            match parse(buf) {
                Ok(statements) => {
                    println!("{}", AstPrinter.print_program(&statements));
                }
                Err(e) => {
                    eprintln!("{}", e);
                    std::process::exit(EXIT_STATIC_ERROR);
                }
            }
        }

        Commands::Run { filename } => {
            let buf = read_source(&filename)?;

            let statements = match parse(buf) {
                Ok(statements) => statements,
                Err(e) => {
                    eprintln!("{}", e);
                    std::process::exit(EXIT_STATIC_ERROR);
                }
            };

            let mut interpreter = Interpreter::new();

            if let Err(e) = Resolver::new(&mut interpreter).resolve(&statements) {
                eprintln!("{}", e);
                std::process::exit(EXIT_STATIC_ERROR);
            }

            if let Err(e) = interpreter.interpret(&statements) {
                let code = match e {
                    LoxError::Runtime(_) => EXIT_RUNTIME_ERROR,
                    _ => EXIT_STATIC_ERROR,
                };
                eprintln!("{}", e);
                std::process::exit(code);
            }
        }
    }

    Ok(())
}
