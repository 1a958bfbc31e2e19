mod common;

use std::error::Error;

use common::{check_execution, Expected};

#[test]
fn test_comparison_into_boolean_variable() -> Result<(), Box<dyn Error>> {
    check_execution(
        "main { boolean b; b := 3 < 5; if (b) then { coutln 1; } else { coutln 0; } }",
        "",
        Expected { output: "1\n" },
    )
}

#[test]
fn test_false_comparison_takes_else() -> Result<(), Box<dyn Error>> {
    check_execution(
        "main { boolean b; b := 5 <= 4; if (b) then { coutln 1; } else { coutln 0; } }",
        "",
        Expected { output: "0\n" },
    )
}

#[test]
fn test_relational_condition_directly() -> Result<(), Box<dyn Error>> {
    check_execution(
        "main { if (2 != 3) then { cout 1; } }",
        "",
        Expected { output: "1" },
    )
}

#[test]
fn test_boolean_literals() -> Result<(), Box<dyn Error>> {
    check_execution(
        "main { if (True) then { cout 1; } if (False) then { cout 2; } }",
        "",
        Expected { output: "1" },
    )
}
