//! Binary entrypoint for the Lattice plugin host.
//!
//! Delegates to [`lattice_host::run`], which loads configuration, bootstraps
//! the registries, and dispatches the requested subcommand.

use std::io::{self, StderrLock, StdoutLock};
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut stdout: StdoutLock<'_> = io::stdout().lock();
    let mut stderr: StderrLock<'_> = io::stderr().lock();
    lattice_host::run(std::env::args_os(), &mut stdout, &mut stderr)
}
