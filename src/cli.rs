use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the directory where the models should be downloaded. This can
    /// be your ComfyUI directory to place files directly, or you can specify
    /// an empty directory and copy the files manually
    pub destination: PathBuf,

    /// Print URLs and file paths
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// Don't actually download anything
    #[arg(short = 'd', long)]
    pub dry_run: bool,

    /// Skip SD1.5 models
    #[arg(long)]
    pub no_sd15: bool,

    /// Skip SDXL models
    #[arg(long)]
    pub no_sdxl: bool,

    /// Skip default checkpoints
    #[arg(long)]
    pub no_checkpoints: bool,

    /// Skip upscale models
    #[arg(long)]
    pub no_upscalers: bool,

    /// Skip ControlNet models
    #[arg(long)]
    pub no_controlnet: bool,

    /// Fetch models which would be automatically downloaded on first use
    #[arg(long)]
    pub prefetch: bool,

    /// Minimum viable set of models
    #[arg(short = 'm', long)]
    pub minimal: bool,

    /// Skip head request to check download size
    #[arg(long)]
    pub no_head_request: bool,
}

/// Run configuration, built once from the parsed arguments and passed
/// read-only to everything downstream.
#[derive(Debug, Clone)]
pub struct DownloadConfig {
    pub destination: PathBuf,
    pub verbose: bool,
    pub dry_run: bool,
    pub no_sd15: bool,
    pub no_sdxl: bool,
    pub no_checkpoints: bool,
    pub no_upscalers: bool,
    pub no_controlnet: bool,
    pub prefetch: bool,
    pub minimal: bool,
    pub no_head_request: bool,
}

impl Args {
    pub fn config(self) -> DownloadConfig {
        DownloadConfig {
            destination: self.destination,
            // --dry-run implies --verbose, --minimal implies --no-sdxl
            verbose: self.verbose || self.dry_run,
            no_sdxl: self.no_sdxl || self.minimal,
            dry_run: self.dry_run,
            no_sd15: self.no_sd15,
            no_checkpoints: self.no_checkpoints,
            no_upscalers: self.no_upscalers,
            no_controlnet: self.no_controlnet,
            prefetch: self.prefetch,
            minimal: self.minimal,
            no_head_request: self.no_head_request,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> DownloadConfig {
        let argv = std::iter::once("comfydl").chain(args.iter().copied());
        Args::try_parse_from(argv)
            .expect("arguments must parse")
            .config()
    }

    #[test]
    fn test_destination_is_required() {
        assert!(Args::try_parse_from(["comfydl"]).is_err());
    }

    #[test]
    fn test_defaults() {
        let config = parse(&["models"]);
        assert_eq!(config.destination, PathBuf::from("models"));
        assert!(!config.verbose);
        assert!(!config.dry_run);
        assert!(!config.no_sd15);
        assert!(!config.no_sdxl);
        assert!(!config.no_checkpoints);
        assert!(!config.no_upscalers);
        assert!(!config.no_controlnet);
        assert!(!config.prefetch);
        assert!(!config.minimal);
        assert!(!config.no_head_request);
    }

    #[test]
    fn test_flags() {
        let config = parse(&[
            "models",
            "--no-sd15",
            "--no-checkpoints",
            "--no-upscalers",
            "--no-controlnet",
            "--prefetch",
            "--no-head-request",
        ]);
        assert!(config.no_sd15);
        assert!(config.no_checkpoints);
        assert!(config.no_upscalers);
        assert!(config.no_controlnet);
        assert!(config.prefetch);
        assert!(config.no_head_request);
        assert!(!config.no_sdxl);
    }

    #[test]
    fn test_minimal_forces_no_sdxl() {
        let config = parse(&["models", "--minimal"]);
        assert!(config.minimal);
        assert!(config.no_sdxl);
    }

    #[test]
    fn test_dry_run_implies_verbose() {
        let config = parse(&["models", "--dry-run"]);
        assert!(config.dry_run);
        assert!(config.verbose);

        let config = parse(&["models", "-v"]);
        assert!(config.verbose);
        assert!(!config.dry_run);
    }
}
