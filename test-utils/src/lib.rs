use std::{
    error::Error,
    io,
    path::Path,
    process::{Command, Output},
    str,
};

const MYRPAL_PATH: &str = "./target/debug/myrpal";

pub struct Expected<'a> {
    pub stdout: &'a str,
    pub stderr: &'a str,
}

impl<'a> Expected<'a> {
    fn assert_matches(self, output: &Output) -> Result<(), Box<dyn Error>> {
        assert_eq!(str::from_utf8(&output.stdout)?, self.stdout);
        assert_eq!(str::from_utf8(&output.stderr)?, self.stderr);
        Ok(())
    }
}

fn run_interpreter(src_path: &Path, flags: &[&str]) -> Result<Output, io::Error> {
    Command::new(MYRPAL_PATH).arg(src_path).args(flags).output()
}

/// Run a program through the interpreter binary and assert its exact
/// output.
pub fn check_run(src_path: &Path, expected: Expected) -> Result<(), Box<dyn Error>> {
    let output = run_interpreter(src_path, &[])?;

    expected.assert_matches(&output)?;
    assert!(
        output.status.success(),
        "interpreter exited with status {:?}",
        output.status.code()
    );

    Ok(())
}

/// Run a program with extra flags and assert its exact stdout.
pub fn check_run_with_flags(
    src_path: &Path,
    flags: &[&str],
    expected_stdout: &str,
) -> Result<(), Box<dyn Error>> {
    let output = run_interpreter(src_path, flags)?;

    assert_eq!(str::from_utf8(&output.stdout)?, expected_stdout);
    assert!(
        output.status.success(),
        "interpreter exited with status {:?}",
        output.status.code()
    );

    Ok(())
}

/// Run a program expected to fail; assert the exit is non-zero and the
/// diagnostic mentions the given fragment.
pub fn check_failing_run(src_path: &Path, fragment: &str) -> Result<(), Box<dyn Error>> {
    let output = run_interpreter(src_path, &[])?;

    assert!(
        !output.status.success(),
        "interpreter should exit with a non-zero status"
    );
    let diagnostics = format!(
        "{}{}",
        str::from_utf8(&output.stdout)?,
        str::from_utf8(&output.stderr)?
    );
    assert!(
        diagnostics.contains(fragment),
        "diagnostic '{diagnostics}' does not mention '{fragment}'"
    );

    Ok(())
}
