mod adapters;
mod cli;
mod core;
mod error;
mod logging;

use clap::Parser;

use crate::{cli::Args, error::AppResult};

fn main() -> AppResult<()> {
    let args = Args::parse();
    logging::init(&args.log_level);
    tracing::debug!(?args, "starting");

    adapters::bridge::run(args)
}
