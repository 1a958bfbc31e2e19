mod common;

use std::error::Error;

use common::{check_execution, Expected};

#[test]
fn test_real_target_keeps_the_quotient() -> Result<(), Box<dyn Error>> {
    check_execution(
        "main { real x; x := 7 / 2; coutln x; }",
        "",
        Expected { output: "3.5\n" },
    )
}

#[test]
fn test_int_target_truncates_the_quotient() -> Result<(), Box<dyn Error>> {
    check_execution(
        "main { int x; x := 9 / 2; cout x; }",
        "",
        Expected { output: "4" },
    )
}

#[test]
fn test_mixed_arithmetic_promotes() -> Result<(), Box<dyn Error>> {
    check_execution(
        "main { real x; x := 1.5 + 1; coutln x; }",
        "",
        Expected { output: "2.5\n" },
    )
}

#[test]
fn test_whole_reals_print_with_fraction() -> Result<(), Box<dyn Error>> {
    check_execution(
        "main { real x; x := 3; coutln x; }",
        "",
        Expected { output: "3.0\n" },
    )
}
