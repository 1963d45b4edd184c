use anyhow::Result;

use crate::cli::DownloadConfig;
use crate::downloader::Downloader;
use crate::resources;

/// Walk the selected resources in catalog order, one file at a time. Any
/// error on a transfer aborts the remaining run.
pub async fn run_download(config: DownloadConfig) -> Result<()> {
    println!("ComfyUI model download - v{}", env!("CARGO_PKG_VERSION"));

    let models = resources::select(&config);
    let downloader = Downloader::new(&config)?;

    for model in models {
        if config.verbose {
            println!("\n{}", model.name);
        }
        downloader.download_model(model).await?;
    }

    Ok(())
}
