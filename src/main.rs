use clap::Parser;
use bistrader::cli::{run, Cli};

fn main() -> std::process::ExitCode {
    run(Cli::parse())
}
