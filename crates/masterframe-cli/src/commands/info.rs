use std::fs::File;
use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use masterframe_core::io::fits::{is_fits, read_fits};
use masterframe_core::io::loader::{load_frame, LoadOptions};
use masterframe_core::stats::FrameStats;

/// Keywords written with a master frame, shown when present.
const PROVENANCE_KEYS: &[&str] = &[
    "IMAGETYP", "NCOMBINE", "COMBINE", "REJECT", "NLOW", "NHIGH", "LSIGMA", "HSIGMA", "MAXITER",
    "LPCT", "HPCT", "SCALE",
];

#[derive(Args)]
pub struct InfoArgs {
    /// FITS or raster image file
    pub file: PathBuf,
}

pub fn run(args: &InfoArgs) -> Result<()> {
    let mut magic = [0u8; 80];
    let read = File::open(&args.file)
        .and_then(|mut f| f.read(&mut magic))
        .with_context(|| format!("Failed to read {}", args.file.display()))?;

    println!("File:        {}", args.file.display());

    let data = if is_fits(&magic[..read]) {
        let image = read_fits(&args.file)?;
        let dims: Vec<String> = image.axes.iter().map(usize::to_string).collect();
        println!("Format:      FITS");
        println!("Axes:        {} ({})", image.axes.len(), dims.join("x"));
        println!("BITPIX:      {}", image.bitpix);
        if image.plane_count() > 1 {
            println!("Planes:      {} (first plane shown)", image.plane_count());
        }

        let cards: Vec<_> = PROVENANCE_KEYS
            .iter()
            .filter_map(|&key| image.header.get(key).map(|v| (key, v)))
            .collect();
        if !cards.is_empty() {
            println!("Provenance:");
            for (key, value) in cards {
                println!("  {key:<10}{value}");
            }
            for (key, value) in image.header.keywords() {
                if key.starts_with("IMCMB") || (key.starts_with("SCAL") && key.len() == 7) {
                    println!("  {key:<10}{value}");
                }
            }
        }
        for line in image.header.history() {
            println!("History:     {line}");
        }
        image.plane
    } else {
        println!("Format:      raster");
        load_frame(&args.file, &LoadOptions::default())?.data
    };

    let (h, w) = data.dim();
    let stats = FrameStats::of(&data);
    println!("Dimensions:  {}x{}", w, h);
    println!("Min:         {}", stats.min);
    println!("Max:         {}", stats.max);
    println!("Mean:        {:.4}", stats.mean);
    println!("Median:      {:.4}", stats.median);
    println!("Std dev:     {:.4}", stats.stddev);

    Ok(())
}
