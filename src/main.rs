use anyhow::Result;
use clap::Parser;
use tracing::error;

use closeness::{analysis, utils, Args};

fn main() -> Result<()> {
    let args = Args::parse();
    utils::setup_logging(args.verbose);
    utils::validate_args(&args)?;

    match analysis::run(&args) {
        Ok(()) => Ok(()),
        Err(e) => {
            error!(action = "fail", component = "main", error = %e, "Command failed");
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}
