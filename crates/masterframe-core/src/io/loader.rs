use std::fs::File;
use std::path::Path;

use memmap2::Mmap;
use ndarray::{s, Array2};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::consts::DEFAULT_BLANK;
use crate::error::{MasterFrameError, Result};
use crate::frame::Frame;
use crate::io::fits::{is_fits, parse_fits};
use crate::io::image_io::load_raster;

/// Crop region `[x1, x2, y1, y2]`: columns `x1..x2`, rows `y1..y2`, 0-based,
/// end-exclusive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "[usize; 4]", into = "[usize; 4]")]
pub struct StatSection {
    pub x1: usize,
    pub x2: usize,
    pub y1: usize,
    pub y2: usize,
}

impl From<[usize; 4]> for StatSection {
    fn from([x1, x2, y1, y2]: [usize; 4]) -> Self {
        Self { x1, x2, y1, y2 }
    }
}

impl From<StatSection> for [usize; 4] {
    fn from(s: StatSection) -> Self {
        [s.x1, s.x2, s.y1, s.y2]
    }
}

impl std::fmt::Display for StatSection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}:{}, {}:{}]", self.y1, self.y2, self.x1, self.x2)
    }
}

impl StatSection {
    /// Check the bounds are ordered, independent of any frame.
    pub fn check_order(&self) -> Result<()> {
        if self.x1 >= self.x2 || self.y1 >= self.y2 {
            return Err(MasterFrameError::InvalidConfig(format!(
                "statsec {self} is empty or inverted (need x1 < x2 and y1 < y2)"
            )));
        }
        Ok(())
    }

    /// Validate against a frame of the given (height, width).
    pub fn validated(&self, height: usize, width: usize) -> Result<StatSection> {
        self.check_order()?;
        if self.x2 > width || self.y2 > height {
            return Err(MasterFrameError::InvalidConfig(format!(
                "statsec {self} exceeds frame dimensions ({width}x{height})"
            )));
        }
        Ok(*self)
    }

    pub fn crop(&self, data: &Array2<f32>) -> Result<Array2<f32>> {
        let (h, w) = data.dim();
        let sec = self.validated(h, w)?;
        Ok(data.slice(s![sec.y1..sec.y2, sec.x1..sec.x2]).to_owned())
    }
}

/// Per-frame load options shared by every frame in a stack.
#[derive(Clone, Debug, PartialEq)]
pub struct LoadOptions {
    /// Fill value for NaN/Inf samples.
    pub blank: f32,
    pub statsec: Option<StatSection>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            blank: DEFAULT_BLANK,
            statsec: None,
        }
    }
}

/// Load one calibration frame from disk.
///
/// FITS files are recognised by their leading `SIMPLE` card whatever their
/// extension; anything else goes through the raster decoder.
pub fn load_frame(path: &Path, options: &LoadOptions) -> Result<Frame> {
    let file = File::open(path).map_err(|e| MasterFrameError::invalid_frame(path, e.to_string()))?;
    let mmap = unsafe { Mmap::map(&file) }
        .map_err(|e| MasterFrameError::invalid_frame(path, e.to_string()))?;

    let data = if is_fits(&mmap) {
        let image = parse_fits(&mmap, path)?;
        let planes = image.plane_count();
        if planes > 1 {
            warn!(
                path = %path.display(),
                planes,
                "Multi-plane image: using the first plane only"
            );
        }
        image.plane
    } else if has_fits_extension(path) {
        return Err(MasterFrameError::invalid_frame(
            path,
            "missing SIMPLE card, not a FITS file",
        ));
    } else {
        load_raster(path)?
    };

    if data.is_empty() {
        return Err(MasterFrameError::invalid_frame(path, "empty image plane"));
    }

    let data = prepare(data, options)?;
    Ok(Frame::with_source(data, path))
}

/// Replace non-finite samples with `blank` and apply the crop section.
pub fn prepare(mut data: Array2<f32>, options: &LoadOptions) -> Result<Array2<f32>> {
    let mut replaced = 0usize;
    data.mapv_inplace(|v| {
        if v.is_finite() {
            v
        } else {
            replaced += 1;
            options.blank
        }
    });
    if replaced > 0 {
        debug!(replaced, blank = options.blank, "Replaced non-finite samples");
    }

    match options.statsec {
        Some(sec) => sec.crop(&data),
        None => Ok(data),
    }
}

fn has_fits_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| matches!(e.to_ascii_lowercase().as_str(), "fits" | "fit" | "fts"))
}
