//! Config command

use crate::ConfigArgs;
use anyhow::{Context, Result};

pub fn run(args: ConfigArgs) -> Result<()> {
    let config = args.filter.resolve()?;
    let json = serde_json::to_string_pretty(&config).context("Failed to serialize config")?;
    println!("{json}");
    Ok(())
}
