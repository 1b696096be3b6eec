use std::{error::Error, path::Path};

use test_utils::{check_run, Expected};

#[test]
fn interpret_sum() -> Result<(), Box<dyn Error>> {
    check_run(
        Path::new("./demos/sum.rpal"),
        Expected {
            stdout: "55\n",
            stderr: "",
        },
    )
}

#[test]
fn interpret_fact() -> Result<(), Box<dyn Error>> {
    check_run(
        Path::new("./demos/fact.rpal"),
        Expected {
            stdout: "720\n",
            stderr: "",
        },
    )
}

#[test]
fn interpret_deep_recursion() -> Result<(), Box<dyn Error>> {
    check_run(
        Path::new("./demos/deep.rpal"),
        Expected {
            stdout: "0\n",
            stderr: "",
        },
    )
}
