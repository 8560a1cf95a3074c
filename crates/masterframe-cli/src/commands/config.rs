use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use masterframe_core::consts::DEFAULT_STAGE;
use masterframe_core::pipeline::config::StageConfig;

#[derive(Args)]
pub struct ConfigArgs {
    /// Write config to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Print or save a full default StageConfig as TOML.
pub fn run(args: &ConfigArgs) -> Result<()> {
    let config = StageConfig::new(
        DEFAULT_STAGE,
        vec![
            PathBuf::from("bias_001.fits"),
            PathBuf::from("bias_002.fits"),
            PathBuf::from("bias_003.fits"),
        ],
        "master_bias.fits",
    );
    let toml_str = config.to_toml_string()?;

    if let Some(ref path) = args.output {
        std::fs::write(path, &toml_str)
            .with_context(|| format!("Failed to write config to {}", path.display()))?;
        println!("Default config saved to {}", path.display());
    } else {
        print!("{}", toml_str);
    }

    Ok(())
}
