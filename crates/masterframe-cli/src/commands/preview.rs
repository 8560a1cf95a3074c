use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use masterframe_core::io::image_io::render_preview;
use masterframe_core::io::loader::{load_frame, LoadOptions};

#[derive(Args)]
pub struct PreviewArgs {
    /// FITS or raster image file
    pub file: PathBuf,

    /// Output PNG path
    #[arg(short, long, default_value = "preview.png")]
    pub output: PathBuf,
}

pub fn run(args: &PreviewArgs) -> Result<()> {
    let frame = load_frame(&args.file, &LoadOptions::default())?;
    render_preview(&frame.data, &frame.display_name(), &args.output)
        .with_context(|| format!("Failed to write preview {}", args.output.display()))?;
    println!("Preview saved to {}", args.output.display());
    Ok(())
}
