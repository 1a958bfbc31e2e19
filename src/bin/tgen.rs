use clap::Parser as CliParser;
use log::error;
use std::{error::Error, path::PathBuf};

use tinyx::{
    codegen::{self, Compiler},
    lexer::Lexer,
    parser::Parser,
    semantic::Analyzer,
};

#[derive(CliParser, Debug)]
#[command(author, version, about = "Generate PM code for a Tiny-Extended source file")]
struct Cli {
    /// Source file to compile.
    file: PathBuf,

    /// Directory the artifacts are written into.
    #[arg(short, long, default_value = "middle")]
    out_dir: PathBuf,

    /// Leave trace comments out of the listing.
    #[arg(long)]
    no_trace: bool,
}

fn run(args: &Cli) -> Result<(), Box<dyn Error>> {
    let tokens = Lexer::new(&args.file).scan()?;
    let mut parser = Parser::new(tokens);
    let root = parser.parse()?;

    let mut analyzer = Analyzer::new();
    let evaluated = analyzer.walk(root, &parser.errors)?;

    let compiler = Compiler::new(&analyzer.symbol_table, !args.no_trace);
    let listing = compiler.generate(&evaluated, &analyzer.errors)?;
    codegen::write_listing(&listing, &args.out_dir)?;
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
