mod common;

use std::error::Error;

use common::{check_execution, Expected};

#[test]
fn test_read_then_echo() -> Result<(), Box<dyn Error>> {
    check_execution(
        "main { int x; cin x; coutln x; }",
        "5\n",
        Expected { output: "> 5\n" },
    )
}

#[test]
fn test_read_feeds_arithmetic() -> Result<(), Box<dyn Error>> {
    check_execution(
        "main { int x; cin x; cout x * 2; }",
        "21\n",
        Expected { output: "> 42" },
    )
}

#[test]
fn test_read_coerces_to_declared_type() -> Result<(), Box<dyn Error>> {
    check_execution(
        "main { int x; cin x; coutln x; }",
        "2.9\n",
        Expected { output: "> 2\n" },
    )
}
