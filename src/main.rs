//! CLI entry point for the mosaic layout tool

use clap::Parser;
use mosaictile::io::cli::{Cli, LayoutRunner};

fn main() -> mosaictile::Result<()> {
    let cli = Cli::parse();
    let default_level = if cli.quiet { "warn" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();
    let mut runner = LayoutRunner::new(cli);
    runner.run().map(|_| ())
}
