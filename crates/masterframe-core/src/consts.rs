/// Minimum pixel count (h*w) to use row-level Rayon parallelism.
pub const PARALLEL_PIXEL_THRESHOLD: usize = 65_536;

/// Minimum frame count to use frame-level Rayon parallelism.
pub const PARALLEL_FRAME_THRESHOLD: usize = 4;

/// Scale factor turning a median absolute deviation into a normal-equivalent sigma.
pub const MAD_TO_SIGMA: f32 = 1.4826;

/// Default fill value for non-finite input samples.
pub const DEFAULT_BLANK: f32 = 0.0;

/// FITS logical record size in bytes.
pub const FITS_BLOCK_SIZE: usize = 2880;

/// FITS header card size in bytes.
pub const FITS_CARD_SIZE: usize = 80;

/// Lower percentile used to stretch previews for display.
pub const PREVIEW_LOW_PERCENTILE: f32 = 1.0;

/// Upper percentile used to stretch previews for display.
pub const PREVIEW_HIGH_PERCENTILE: f32 = 99.0;

/// Default stage name when none is configured.
pub const DEFAULT_STAGE: &str = "bias";
