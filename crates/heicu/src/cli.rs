use clap::Parser;
use heicu::OutputKind;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "heicu")]
#[command(author, version, about = "Batch HEIC/HEIF to JPEG/PNG converter")]
pub struct Cli {
    /// HEIC/HEIF files to convert. Other files are skipped.
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Output format (jpeg or png)
    #[arg(short, long)]
    pub format: Option<OutputKind>,

    /// Output quality between 0.1 and 1.0 (JPEG only)
    #[arg(short, long)]
    pub quality: Option<f32>,

    /// Directory converted files are saved to
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Number of files decoded at the same time
    #[arg(short = 'j', long)]
    pub concurrency: Option<usize>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}
