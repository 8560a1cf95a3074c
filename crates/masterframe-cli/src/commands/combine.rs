use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args, ValueEnum};
use masterframe_core::combine::CombineMethod;
use masterframe_core::consts::DEFAULT_STAGE;
use masterframe_core::io::image_io::render_preview;
use masterframe_core::io::loader::StatSection;
use masterframe_core::pipeline::config::{RejectMethod, StageConfig};
use masterframe_core::pipeline::run_stage_reported;
use masterframe_core::scale::ScalingPolicy;

use crate::progress::BarReporter;
use crate::summary::{print_master_summary, print_stage_summary};

#[derive(Clone, Copy, ValueEnum)]
pub enum CombineArg {
    Median,
    Average,
}

impl From<CombineArg> for CombineMethod {
    fn from(arg: CombineArg) -> Self {
        match arg {
            CombineArg::Median => CombineMethod::Median,
            CombineArg::Average => CombineMethod::Mean,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum RejectArg {
    None,
    Minmax,
    Sigclip,
    Pclip,
}

impl From<RejectArg> for RejectMethod {
    fn from(arg: RejectArg) -> Self {
        match arg {
            RejectArg::None => RejectMethod::None,
            RejectArg::Minmax => RejectMethod::Minmax,
            RejectArg::Sigclip => RejectMethod::Sigclip,
            RejectArg::Pclip => RejectMethod::Pclip,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum ScaleArg {
    None,
    Median,
    Mean,
    Mode,
}

impl From<ScaleArg> for ScalingPolicy {
    fn from(arg: ScaleArg) -> Self {
        match arg {
            ScaleArg::None => ScalingPolicy::None,
            ScaleArg::Median => ScalingPolicy::Median,
            ScaleArg::Mean => ScalingPolicy::Mean,
            ScaleArg::Mode => ScalingPolicy::Mode,
        }
    }
}

/// Flags override the matching `--config` entries; files given on the
/// command line replace the configured inputs.
#[derive(Args)]
pub struct CombineArgs {
    /// Raw frames to combine (FITS, TIFF, PNG, ...)
    pub files: Vec<PathBuf>,

    /// Output master frame (FITS)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Stage config file (TOML)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Calibration stage recorded in the master (bias, dark, flat, ...)
    #[arg(long)]
    pub stage: Option<String>,

    /// Combine statistic
    #[arg(long, value_enum)]
    pub combine: Option<CombineArg>,

    /// Outlier rejection method
    #[arg(long, value_enum)]
    pub reject: Option<RejectArg>,

    /// Lowest samples dropped per pixel (minmax)
    #[arg(long)]
    pub nlow: Option<usize>,

    /// Highest samples dropped per pixel (minmax)
    #[arg(long)]
    pub nhigh: Option<usize>,

    /// Lower clipping bound in standard deviations (sigclip)
    #[arg(long)]
    pub low_sigma: Option<f32>,

    /// Upper clipping bound in standard deviations (sigclip)
    #[arg(long)]
    pub high_sigma: Option<f32>,

    /// Maximum clipping passes (sigclip)
    #[arg(long)]
    pub max_iterations: Option<u32>,

    /// Lower percentile kept (pclip)
    #[arg(long)]
    pub low_pct: Option<f32>,

    /// Upper percentile kept (pclip)
    #[arg(long)]
    pub high_pct: Option<f32>,

    /// Per-frame scaling statistic
    #[arg(long, value_enum)]
    pub scale: Option<ScaleArg>,

    /// Crop region x1,x2,y1,y2 (0-based, end-exclusive)
    #[arg(long, value_parser = parse_statsec)]
    pub statsec: Option<StatSection>,

    /// Fill value for NaN/Inf samples
    #[arg(long, allow_hyphen_values = true)]
    pub blank: Option<f32>,

    /// Replace an existing output file
    #[arg(long)]
    pub overwrite: bool,

    /// Also write a stretched PNG preview of the master
    #[arg(long)]
    pub preview: Option<PathBuf>,
}

fn parse_statsec(s: &str) -> Result<StatSection, String> {
    let bounds: Vec<usize> = s
        .split(',')
        .map(|v| v.trim().parse::<usize>())
        .collect::<Result<Vec<usize>, _>>()
        .map_err(|e| format!("invalid statsec bound: {e}"))?;
    let bounds: [usize; 4] = bounds
        .try_into()
        .map_err(|_| "statsec needs exactly four values: x1,x2,y1,y2".to_string())?;
    Ok(StatSection::from(bounds))
}

pub fn run(args: &CombineArgs) -> Result<()> {
    let config = build_config(args)?;
    print_stage_summary(&config);

    let reporter = Arc::new(BarReporter::new()?);
    let master = match run_stage_reported(&config, reporter.clone(), None) {
        Ok(master) => {
            reporter.finish();
            master
        }
        Err(e) => {
            reporter.abandon();
            return Err(e).with_context(|| format!("Failed to build {} master", config.stage));
        }
    };

    if let Some(ref preview) = args.preview {
        render_preview(master.data(), &config.stage, preview)
            .with_context(|| format!("Failed to write preview {}", preview.display()))?;
    }

    print_master_summary(&master, &config.output, args.preview.as_deref());
    Ok(())
}

fn build_config(args: &CombineArgs) -> Result<StageConfig> {
    let mut config = if let Some(ref path) = args.config {
        StageConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?
    } else {
        StageConfig::new(DEFAULT_STAGE, Vec::new(), PathBuf::new())
    };

    if !args.files.is_empty() {
        config.inputs = args.files.clone();
    }
    if let Some(ref output) = args.output {
        config.output = output.clone();
    }
    if let Some(ref stage) = args.stage {
        config.stage = stage.clone();
    }

    let c = &mut config.combine;
    if let Some(m) = args.combine {
        c.combine_method = m.into();
    }
    if let Some(r) = args.reject {
        c.reject_method = r.into();
    }
    if let Some(v) = args.nlow {
        c.nlow = v;
    }
    if let Some(v) = args.nhigh {
        c.nhigh = v;
    }
    if let Some(v) = args.low_sigma {
        c.low_sigma = v;
    }
    if let Some(v) = args.high_sigma {
        c.high_sigma = v;
    }
    if let Some(v) = args.max_iterations {
        c.max_iterations = v;
    }
    if let Some(v) = args.low_pct {
        c.low_pct = v;
    }
    if let Some(v) = args.high_pct {
        c.high_pct = v;
    }
    if let Some(s) = args.scale {
        c.scale = s.into();
    }
    if args.statsec.is_some() {
        c.statsec = args.statsec;
    }
    if let Some(v) = args.blank {
        c.blank = v;
    }
    if args.overwrite {
        c.overwrite = true;
    }

    if config.output.as_os_str().is_empty() {
        bail!("No output path: pass -o/--output or set `output` in the config");
    }
    if config.inputs.is_empty() {
        bail!("No input frames: pass files or set `inputs` in the config");
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_statsec() {
        let sec = parse_statsec("10, 90,20,80").unwrap();
        assert_eq!(sec, StatSection::from([10, 90, 20, 80]));
        assert!(parse_statsec("1,2,3").is_err());
        assert!(parse_statsec("1,2,x,4").is_err());
    }
}
