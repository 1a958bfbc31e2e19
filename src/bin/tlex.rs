use clap::Parser as CliParser;
use log::error;
use std::path::PathBuf;

use tinyx::lexer::Lexer;

#[derive(CliParser, Debug)]
#[command(author, version, about = "Tokenize a Tiny-Extended source file")]
struct Cli {
    /// Source file to scan.
    file: PathBuf,

    /// Directory the artifacts are written into.
    #[arg(short, long, default_value = "Lexicon")]
    out_dir: PathBuf,
}

fn main() {
    simple_logger::init_with_level(log::Level::Warn).unwrap();
    let args = Cli::parse();

    if let Err(err) = Lexer::new(&args.file).write_output(&args.out_dir) {
        error!("{err}");
        std::process::exit(-1);
    }
}
