use std::{error::Error, path::Path};

use test_utils::{check_run, Expected};

#[test]
fn interpret_concatenation() -> Result<(), Box<dyn Error>> {
    check_run(
        Path::new("./demos/conc.rpal"),
        Expected {
            stdout: "Hello World\n",
            stderr: "",
        },
    )
}

#[test]
fn interpret_escape_sequences() -> Result<(), Box<dyn Error>> {
    check_run(
        Path::new("./demos/escape.rpal"),
        Expected {
            stdout: "Hello\nWorld\n",
            stderr: "",
        },
    )
}
