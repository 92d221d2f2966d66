//! filecat CLI: catalog a filesystem tree and find duplicate files.

use clap::Parser;
use filecat::cli::Cli;
use std::process::ExitCode;
use std::time::Instant;

fn main() -> ExitCode {
    let start_time = Instant::now();
    let cli = Cli::parse();
    filecat::logging::setup_logging(cli.verbose);

    let cancel_flag = match filecat::cancel::install_handler() {
        Ok(flag) => flag,
        Err(e) => {
            eprintln!("failed to install interrupt handler: {e}");
            return ExitCode::from(1);
        }
    };

    let result = filecat::cli::run(cli, cancel_flag);
    if let Err(e) = &result {
        log::error!("{e:#}");
    }
    log::debug!("total time: {:?}", start_time.elapsed());

    ExitCode::from(filecat::error::exit_code(&result) as u8)
}
