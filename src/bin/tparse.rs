use clap::Parser as CliParser;
use log::error;
use std::{error::Error, path::PathBuf};

use tinyx::{lexer::Lexer, parser::Parser};

#[derive(CliParser, Debug)]
#[command(author, version, about = "Parse a Tiny-Extended source file")]
struct Cli {
    /// Source file to parse.
    file: PathBuf,

    /// Directory the artifacts are written into.
    #[arg(short, long, default_value = "AST")]
    out_dir: PathBuf,
}

fn run(args: &Cli) -> Result<(), Box<dyn Error>> {
    let tokens = Lexer::new(&args.file).scan()?;
    let mut parser = Parser::new(tokens);
    let root = parser.parse()?;
    parser.write_output(&root, &args.out_dir)?;
    Ok(())
}

fn main() {
    simple_logger::init_with_level(log::Level::Warn).unwrap();
    let args = Cli::parse();

    if let Err(err) = run(&args) {
        error!("{err}");
        std::process::exit(-1);
    }
}
