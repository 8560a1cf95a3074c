use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::{MasterFrameError, Result};
use crate::io::fits::{write_fits, FitsHeader, HeaderValue};
use crate::master::{MasterFrame, Provenance};
use crate::reject::RejectionPolicy;

/// Highest index representable in an 8-character `IMCMBnnn` keyword.
const MAX_INDEXED_CARDS: usize = 999;

/// Persist a master frame as FITS with its provenance cards.
///
/// The file is written next to `destination` and renamed into place, so a
/// failure never leaves a partial master behind. Fails with
/// `DestinationExists` when the file is present and `overwrite` is false.
pub fn write_master(master: &MasterFrame, destination: &Path, overwrite: bool) -> Result<()> {
    if !overwrite && destination.exists() {
        return Err(MasterFrameError::DestinationExists(destination.to_path_buf()));
    }
    if let Some(parent) = destination.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let header = provenance_header(master.provenance());
    let staging = staging_path(destination);
    let written = write_fits(&staging, &header, master.data())
        .and_then(|()| fs::rename(&staging, destination).map_err(MasterFrameError::from));
    if let Err(e) = written {
        let _ = fs::remove_file(&staging);
        return Err(e);
    }

    info!(
        path = %destination.display(),
        width = master.width(),
        height = master.height(),
        "Master frame written"
    );
    Ok(())
}

/// Header cards describing how the master was produced.
pub fn provenance_header(p: &Provenance) -> FitsHeader {
    let mut h = FitsHeader::new();
    h.set("IMAGETYP", HeaderValue::Text(p.stage.clone()), Some("calibration stage"));
    h.set(
        "NCOMBINE",
        HeaderValue::Integer(p.source_count as i64),
        Some("number of frames combined"),
    );
    h.set(
        "COMBINE",
        HeaderValue::Text(p.combine_method.name().into()),
        Some("combine statistic"),
    );
    h.set(
        "REJECT",
        HeaderValue::Text(p.rejection_policy.name().into()),
        Some("rejection policy"),
    );
    match p.rejection_policy {
        RejectionPolicy::None => {}
        RejectionPolicy::MinMax { nlow, nhigh } => {
            h.set("NLOW", HeaderValue::Integer(nlow as i64), None);
            h.set("NHIGH", HeaderValue::Integer(nhigh as i64), None);
        }
        RejectionPolicy::SigmaClip {
            low_sigma,
            high_sigma,
            max_iterations,
        } => {
            h.set("LSIGMA", HeaderValue::Float(low_sigma as f64), None);
            h.set("HSIGMA", HeaderValue::Float(high_sigma as f64), None);
            h.set("MAXITER", HeaderValue::Integer(max_iterations as i64), None);
        }
        RejectionPolicy::PercentileClip { low_pct, high_pct } => {
            h.set("LPCT", HeaderValue::Float(low_pct as f64), None);
            h.set("HPCT", HeaderValue::Float(high_pct as f64), None);
        }
    }
    h.set(
        "SCALE",
        HeaderValue::Text(p.scaling_policy.name().into()),
        Some("scaling statistic"),
    );

    for (i, name) in p.input_file_names.iter().take(MAX_INDEXED_CARDS).enumerate() {
        h.set(&format!("IMCMB{:03}", i + 1), HeaderValue::Text(name.clone()), None);
    }
    if p.scaling_policy != crate::scale::ScalingPolicy::None {
        for (i, factor) in p.scale_factors.iter().take(MAX_INDEXED_CARDS).enumerate() {
            h.set(&format!("SCAL{:03}", i + 1), HeaderValue::Float(*factor as f64), None);
        }
    }
    h.add_history(&format!(
        "{} master from {} frames: combine={} reject={} scale={}",
        p.stage,
        p.source_count,
        p.combine_method.name(),
        p.rejection_policy.name(),
        p.scaling_policy.name()
    ));
    h
}

fn staging_path(destination: &Path) -> PathBuf {
    let name = destination
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "master".into());
    destination.with_file_name(format!(".{name}.partial"))
}
