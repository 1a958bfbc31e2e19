use clap::Parser as CliParser;
use log::error;
use std::{error::Error, path::PathBuf};

use tinyx::{lexer::Lexer, parser::Parser, semantic::Analyzer};

#[derive(CliParser, Debug)]
#[command(author, version, about = "Semantically analyze a Tiny-Extended source file")]
struct Cli {
    /// Source file to analyze.
    file: PathBuf,

    /// Directory the artifacts are written into.
    #[arg(short, long, default_value = "eAST")]
    out_dir: PathBuf,
}

fn run(args: &Cli) -> Result<(), Box<dyn Error>> {
    let tokens = Lexer::new(&args.file).scan()?;
    let mut parser = Parser::new(tokens);
    let root = parser.parse()?;

    let mut analyzer = Analyzer::new();
    let evaluated = analyzer.walk(root, &parser.errors)?;
    analyzer.write_output(&evaluated, &args.out_dir)?;
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
