use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;

use portkill::cli::Args;

fn main() -> Result<ExitCode> {
    let args = Args::parse();

    let mut logger =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if let Some(level) = args.log_level {
        logger.filter_level(level.into());
    }
    logger.init();

    portkill::run(args)
}
