use std::{error::Error, io::Cursor};

use tinyx::{
    codegen::Compiler,
    lexer::Lexer,
    machine::Machine,
    parser::Parser,
    semantic::{Analyzer, SymbolTable},
};

/// Expected observable output of a compiled program.
pub struct Expected<'a> {
    pub output: &'a str,
}

impl<'a> Expected<'a> {
    fn assert_matches(self, output: &str) {
        assert_eq!(output, self.output);
    }
}

#[derive(Debug)]
pub struct Compiled {
    pub listing: Vec<String>,
    pub symbols: SymbolTable,
}

/// Run the front end and code generator over `source`.
#[allow(dead_code)]
pub fn compile(source: &str) -> Result<Compiled, Box<dyn Error>> {
    let mut parser = Parser::new(Lexer::scan_text(source));
    let root = parser.parse()?;

    let mut analyzer = Analyzer::new();
    let evaluated = analyzer.walk(root, &parser.errors)?;

    let listing =
        Compiler::new(&analyzer.symbol_table, true).generate(&evaluated, &analyzer.errors)?;
    Ok(Compiled {
        listing,
        symbols: analyzer.symbol_table,
    })
}

/// Compile `source`, execute it on the PM with `input` on stdin, and
/// return everything it wrote.
#[allow(dead_code)]
pub fn run(source: &str, input: &str) -> Result<String, Box<dyn Error>> {
    let compiled = compile(source)?;
    let mut machine = Machine::load(
        &compiled.listing,
        compiled.symbols,
        Cursor::new(input.as_bytes().to_vec()),
        Vec::new(),
    )?;
    machine.go()?;
    Ok(String::from_utf8(machine.into_output())?)
}

/// Compile and run `source` and assert the machine wrote exactly the
/// expected output.
#[allow(dead_code)]
pub fn check_execution(
    source: &str,
    input: &str,
    expected: Expected,
) -> Result<(), Box<dyn Error>> {
    let output = run(source, input)?;
    expected.assert_matches(&output);
    Ok(())
}

/// Compile `source` and assert the pipeline refuses with exactly this
/// message.
#[allow(dead_code)]
pub fn check_refusal(source: &str, expected_message: &str) {
    let message = compile(source)
        .expect_err("expected the pipeline to refuse")
        .to_string();
    assert_eq!(message, expected_message);
}
