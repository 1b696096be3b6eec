use std::{error::Error, path::Path};

use test_utils::{check_run, Expected};

#[test]
fn interpret_simultaneous_bindings() -> Result<(), Box<dyn Error>> {
    check_run(
        Path::new("./demos/pair.rpal"),
        Expected {
            stdout: "7\n",
            stderr: "",
        },
    )
}

#[test]
fn interpret_within() -> Result<(), Box<dyn Error>> {
    check_run(
        Path::new("./demos/within.rpal"),
        Expected {
            stdout: "4\n",
            stderr: "",
        },
    )
}
