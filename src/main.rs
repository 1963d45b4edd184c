mod cli;
mod commands;
mod downloader;
mod resources;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let config = cli::Args::parse().config();

    // Downloads run strictly sequentially on a single-threaded runtime.
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    rt.block_on(commands::run_download(config))
}
