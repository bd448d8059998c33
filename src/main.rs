use std::process::ExitCode;

use clap::Parser;
use mintpaint::cli::{self, CliArgs};
use mintpaint::logger;

fn main() -> ExitCode {
    logger::init();
    let args = CliArgs::parse();
    mintpaint::log_info!("CLI run: {} input pattern(s)", args.input.len());
    cli::run(args)
}
