use minitar::cli::exec::exec_cli;
use std::process::ExitCode;

fn main() -> ExitCode {
    exec_cli()
}
