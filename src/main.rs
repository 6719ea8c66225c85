//! climaterag - CLI entry point

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use climaterag::cli::{App, Args};
use climaterag::Config;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(args.verbosity().filter_directive())),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = Config::load(args.config.clone())?;
    config.validate()?;

    if let Err(e) = App::new(config).run(args.command).await {
        eprintln!("{} {}", "✗".red(), e);
        std::process::exit(1);
    }

    Ok(())
}
