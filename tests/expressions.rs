mod common;

use std::error::Error;

use common::{check_execution, Expected};

#[test]
fn test_precedence_and_output() -> Result<(), Box<dyn Error>> {
    check_execution(
        "main { int x; x := 2 + 3 * 4; cout x; }",
        "",
        Expected { output: "14" },
    )
}

#[test]
fn test_integer_division_truncates() -> Result<(), Box<dyn Error>> {
    check_execution(
        "main { int x; x := 7 / 2; coutln x; }",
        "",
        Expected { output: "3\n" },
    )
}

#[test]
fn test_unary_sign() -> Result<(), Box<dyn Error>> {
    check_execution(
        "main { int x; x := -3 + 5; cout x; }",
        "",
        Expected { output: "2" },
    )
}

#[test]
fn test_parentheses_override_precedence() -> Result<(), Box<dyn Error>> {
    check_execution(
        "main { int x; x := (2 + 3) * 4; cout x; }",
        "",
        Expected { output: "20" },
    )
}

#[test]
fn test_increment_and_decrement() -> Result<(), Box<dyn Error>> {
    check_execution(
        "main { int x; x := 5; x++; ++x; x--; cout x; }",
        "",
        Expected { output: "6" },
    )
}
