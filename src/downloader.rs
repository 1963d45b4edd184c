use anyhow::{Context, Result};
use futures::StreamExt;
use indicatif::{HumanBytes, ProgressBar, ProgressStyle};
use reqwest::{header, Client};
use std::time::Duration;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::cli::DownloadConfig;
use crate::resources::{ModelFile, ModelResource};

const USER_AGENT: &str = concat!("comfydl/", env!("CARGO_PKG_VERSION"));

/// Outcome of comparing a local file against the server's declared size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeCheck {
    Match,
    Mismatch,
    /// The server did not declare a size.
    Unknown,
}

pub fn size_check(remote: Option<u64>, local: u64) -> SizeCheck {
    match remote {
        Some(size) if size == local => SizeCheck::Match,
        Some(_) => SizeCheck::Mismatch,
        None => SizeCheck::Unknown,
    }
}

pub struct Downloader<'a> {
    client: Client,
    config: &'a DownloadConfig,
}

impl<'a> Downloader<'a> {
    pub fn new(config: &'a DownloadConfig) -> Result<Self> {
        // Shared client for the main transfers. Connect and read are
        // bounded, total transfer time is not.
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(Duration::from_secs(10))
            .read_timeout(Duration::from_secs(60))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client, config })
    }

    pub async fn download_model(&self, model: &ModelResource) -> Result<()> {
        for file in model.files {
            self.download_file(model.name, file).await?;
        }
        Ok(())
    }

    async fn download_file(&self, name: &str, file: &ModelFile) -> Result<()> {
        let target = self.config.destination.join(file.path);
        if self.config.verbose {
            println!("Looking for {}", target.display());
        }

        let local_size = match fs::metadata(&target).await {
            Ok(meta) => Some(meta.len()),
            Err(_) => None,
        };

        // Try to settle the size question with a HEAD probe first.
        let mut compared = false;
        if let Some(local) = local_size {
            if !self.config.no_head_request {
                match probe_size(file.url).await {
                    Ok(Some(remote)) => {
                        compared = true;
                        match size_check(Some(remote), local) {
                            SizeCheck::Match => {
                                self.report_skip(name);
                                return Ok(());
                            }
                            _ => self.report_differs(name),
                        }
                    }
                    Ok(None) => {} // no Content-Length, let the GET decide
                    Err(_) => {
                        if self.config.verbose {
                            println!("{}: HEAD request failed, falling back to GET request", name);
                        }
                    }
                }
            }
        }

        let response = self
            .client
            .get(file.url)
            .send()
            .await
            .with_context(|| format!("Failed to request {}", file.url))?
            .error_for_status()?;

        // The probe did not complete or had no Content-Length; re-check
        // against the GET response before committing to the transfer.
        if let Some(local) = local_size {
            if !compared {
                match size_check(content_length(response.headers()), local) {
                    SizeCheck::Match => {
                        // Dropping the response aborts the transfer unread.
                        self.report_skip(name);
                        return Ok(());
                    }
                    SizeCheck::Mismatch => self.report_differs(name),
                    SizeCheck::Unknown => {
                        if self.config.verbose {
                            println!(
                                "{}: Found - Could not retrieve Content-Length from server - downloading",
                                name
                            );
                        }
                    }
                }
            }
        }

        println!("Downloading {}", file.url);
        if self.config.dry_run {
            return Ok(());
        }

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }
        let mut out = fs::File::create(&target)
            .await
            .with_context(|| format!("Failed to create {}", target.display()))?;

        let pb = progress_bar(name, content_length(response.headers()));
        let mut written: u64 = 0;
        let mut stream = response.bytes_stream();
        while let Some(item) = stream.next().await {
            let chunk = item.context("Error while downloading chunk")?;
            out.write_all(&chunk)
                .await
                .context("Error while writing to file")?;
            written += chunk.len() as u64;
            pb.inc(chunk.len() as u64);
        }
        out.flush().await.context("Failed to flush file")?;

        pb.finish_with_message(format!("Completed {} ({})", file.path, HumanBytes(written)));
        Ok(())
    }

    fn report_skip(&self, name: &str) {
        println!("{}: Found - Local file size matches server's - skipping", name);
    }

    fn report_differs(&self, name: &str) {
        if self.config.verbose {
            println!("{}: Found - Local file size differs from server's - downloading", name);
        }
    }
}

/// Metadata-only probe for the declared size, on its own short-lived client
/// with more aggressive timeouts than the transfer client.
async fn probe_size(url: &str) -> Result<Option<u64>> {
    let client = Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(Duration::from_secs(10))
        .read_timeout(Duration::from_secs(10))
        .build()
        .context("Failed to build probe client")?;
    let response = client.head(url).send().await?.error_for_status()?;
    Ok(content_length(response.headers()))
}

/// Declared size from the response headers. For HEAD responses the body size
/// hint is not the header value, so read the header directly.
fn content_length(headers: &header::HeaderMap) -> Option<u64> {
    headers
        .get(header::CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .parse()
        .ok()
}

fn progress_bar(name: &str, total: Option<u64>) -> ProgressBar {
    let pb = match total {
        Some(len) => {
            let pb = ProgressBar::new(len);
            pb.set_style(ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes:>12}/{total_bytes:<12} {bytes_per_sec:>12} {eta:>4} {msg}")
                .unwrap()
                .progress_chars("=>-"));
            pb
        }
        None => {
            let pb = ProgressBar::new_spinner();
            pb.set_style(
                ProgressStyle::default_spinner()
                    .template("{spinner:.green} [{elapsed_precise}] {bytes:>12} {bytes_per_sec:>12} {msg}")
                    .unwrap(),
            );
            pb
        }
    };
    pb.set_message(format!("Downloading {}", name));
    pb
}
