mod common;

use std::{error::Error, io::Cursor};

use common::{check_execution, compile, Expected};
use tinyx::{machine::Machine, semantic::Value};

const FACTORIAL: &str =
    "main { int n; n := 5; int f; f := 1; while (n > 0) { f := f * n; --n; } coutln f; }";
const EXPECTED: Expected = Expected { output: "120\n" };

#[test]
fn test_factorial() -> Result<(), Box<dyn Error>> {
    check_execution(FACTORIAL, "", EXPECTED)
}

#[test]
fn test_false_condition_skips_body() -> Result<(), Box<dyn Error>> {
    check_execution(
        "main { int x; while (x) { coutln 1; } cout 0; }",
        "",
        Expected { output: "0" },
    )
}

#[test]
fn test_symbol_table_reflects_execution() -> Result<(), Box<dyn Error>> {
    let compiled = compile(FACTORIAL)?;
    let mut machine = Machine::load(
        &compiled.listing,
        compiled.symbols,
        Cursor::new(Vec::new()),
        Vec::new(),
    )?;
    machine.go()?;

    assert_eq!(machine.symbols()["n"].val, Value::Int(0));
    assert_eq!(machine.symbols()["f"].val, Value::Int(120));
    Ok(())
}
