//! vipp2dfa - Command-line converter from Xerox VIPP to Papyrus DocDEF

use std::process::ExitCode;

use vipp2dfa::cli;

fn main() -> ExitCode {
    cli::run()
}
