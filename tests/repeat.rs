mod common;

use std::error::Error;

use common::{check_execution, Expected};

#[test]
fn test_break_leaves_the_loop() -> Result<(), Box<dyn Error>> {
    check_execution(
        "main { int i; i := 0; repeat { ++i; if (i == 3) then { rompe; } } until (i == 10); coutln i; }",
        "",
        Expected { output: "3\n" },
    )
}

#[test]
fn test_body_runs_at_least_once() -> Result<(), Box<dyn Error>> {
    check_execution(
        "main { int i; repeat { ++i; } until (i == 1); cout i; }",
        "",
        Expected { output: "1" },
    )
}

#[test]
fn test_breaks_in_nested_loops() -> Result<(), Box<dyn Error>> {
    check_execution(
        "main { int i; int j; \
         while (1) { \
           j := 0; \
           repeat { ++j; if (j == 2) then { rompe; } } until (j == 5); \
           ++i; \
           if (i == 3) then { rompe; } \
         } \
         cout i; cout j; }",
        "",
        Expected { output: "32" },
    )
}
