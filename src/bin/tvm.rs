use clap::Parser as CliParser;
use log::error;
use std::{
    error::Error,
    io::{self, BufReader},
    path::PathBuf,
};

use tinyx::{codegen::Compiler, lexer::Lexer, machine::Machine, parser::Parser, semantic::Analyzer};

#[derive(CliParser, Debug)]
#[command(author, version, about = "Compile and interactively run a Tiny-Extended source file")]
struct Cli {
    /// Source file to compile and run.
    file: PathBuf,

    /// Directory the artifacts are written into.
    #[arg(short, long, default_value = "Runtime")]
    out_dir: PathBuf,

    /// Report the number of executed instructions after each run.
    #[arg(long)]
    count: bool,
}

fn run(args: &Cli) -> Result<(), Box<dyn Error>> {
    let tokens = Lexer::new(&args.file).scan()?;
    let mut parser = Parser::new(tokens);
    let root = parser.parse()?;

    let mut analyzer = Analyzer::new();
    let evaluated = analyzer.walk(root, &parser.errors)?;

    let compiler = Compiler::new(&analyzer.symbol_table, true);
    let listing = compiler.generate(&evaluated, &analyzer.errors)?;

    let mut machine = Machine::load(
        &listing,
        analyzer.symbol_table,
        BufReader::new(io::stdin()),
        io::stdout(),
    )?;
    machine.count_instructions = args.count;
    machine.repl()?;
    machine.write_output(&args.out_dir)?;
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
