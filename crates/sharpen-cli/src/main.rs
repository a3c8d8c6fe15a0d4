//! sharpen - probe the parallel unsharp filter
//!
//! Runs the filter on synthetic images across stripe counts and checks that
//! every run produces the same pixels.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use sharpen_ops::{EdgePolicy, SharpenConfig};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

mod commands;
mod pattern;

#[derive(Parser)]
#[command(name = "sharpen")]
#[command(author, version, about = "Parallel unsharp-mask probe")]
#[command(long_about = "
Runs the parallel unsharp-mask filter over a synthetic image with several
stripe counts, reports median timings, and fails if any stripe count
produces different pixels.

Examples:
  sharpen probe                                   # 512x512 checker, 1/2/4/8 stripes
  sharpen probe --pattern noise -W 1920 -H 1080 --threads 1,3,16
  sharpen probe --radius 4 --amount 1.2 --edge wrap --repeat 10
  sharpen config --config look.json --threshold 8  # show merged settings
")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output (debug logging)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Time the filter across stripe counts and compare checksums
    #[command(visible_alias = "p")]
    Probe(ProbeArgs),

    /// Print the effective filter configuration as JSON
    Config(ConfigArgs),
}

/// Filter settings shared by all subcommands.
#[derive(Args, Debug, Clone)]
struct FilterArgs {
    /// JSON file with filter settings; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Blur radius in pixels (0 or less disables sharpening)
    #[arg(short, long, allow_negative_numbers = true)]
    radius: Option<f32>,

    /// Sharpening strength
    #[arg(short, long)]
    amount: Option<f32>,

    /// Minimum per-channel difference that gets sharpened (0-255)
    #[arg(long)]
    threshold: Option<i32>,

    /// Skip blurring alpha (output alpha always follows the source)
    #[arg(long)]
    no_alpha: bool,

    /// Out-of-range sampling: clamp or wrap
    #[arg(long)]
    edge: Option<EdgePolicy>,
}

impl FilterArgs {
    /// Merges the config file (if any) with command-line overrides.
    fn resolve(&self) -> Result<SharpenConfig> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => SharpenConfig::default(),
        };
        if let Some(radius) = self.radius {
            config = config.with_radius(radius);
        }
        if let Some(amount) = self.amount {
            config = config.with_amount(amount);
        }
        if let Some(threshold) = self.threshold {
            config = config.with_threshold(threshold);
        }
        if self.no_alpha {
            config = config.with_alpha(false);
        }
        if let Some(edge) = self.edge {
            config = config.with_edge_policy(edge);
        }
        config.validate().context("Invalid filter settings")?;
        Ok(config)
    }
}

fn load_config(path: &Path) -> Result<SharpenConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config: {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse config: {}", path.display()))
}

#[derive(Args)]
struct ProbeArgs {
    #[command(flatten)]
    filter: FilterArgs,

    /// Synthetic input image
    #[arg(short, long, value_enum, default_value_t = Pattern::Checker)]
    pattern: Pattern,

    /// Image width
    #[arg(short = 'W', long, default_value_t = 512)]
    width: u32,

    /// Image height
    #[arg(short = 'H', long, default_value_t = 512)]
    height: u32,

    /// Seed for the noise pattern
    #[arg(long, default_value_t = 0x5EED)]
    seed: u32,

    /// Stripe counts to compare, comma separated
    #[arg(long, value_delimiter = ',', default_values_t = [1, 2, 4, 8])]
    threads: Vec<usize>,

    /// Worker pool size (0 = one per core)
    #[arg(short = 'j', long, default_value_t = 0)]
    pool_size: usize,

    /// Timed runs per stripe count
    #[arg(long, default_value_t = 5, value_parser = clap::value_parser!(u32).range(1..))]
    repeat: u32,
}

#[derive(Args)]
struct ConfigArgs {
    #[command(flatten)]
    filter: FilterArgs,
}

/// Synthetic probe inputs.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Pattern {
    /// 8x8 cells of dark and light grey
    Checker,
    /// Red across, green down
    Gradient,
    /// Seeded pseudo-random ARGB
    Noise,
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Probe(args) => commands::probe::run(args),
        Commands::Config(args) => commands::config::run(args),
    }
}
