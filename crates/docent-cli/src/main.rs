//! # docent CLI
//!
//! Command-line interface for the Feldman critique docent.
//!
//! This binary provides human-friendly access to `docent-core` functionality.
//! Run `docent --help` for usage information.

mod cli;
pub mod ui;

use std::process::ExitCode;

fn main() -> ExitCode {
    cli::run()
}
