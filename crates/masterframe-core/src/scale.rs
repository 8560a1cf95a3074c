use std::borrow::Cow;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::consts::PARALLEL_FRAME_THRESHOLD;
use crate::frame::{Frame, Stack};
use crate::stats::{mean, median_in_place, robust_mode};

/// Per-frame intensity normalization applied before combining.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ScalingPolicy {
    #[default]
    None,
    Median,
    Mean,
    /// Robust mode estimate `median - 1.4826 * MAD`.
    Mode,
}

impl ScalingPolicy {
    /// Configuration keyword for the policy.
    pub fn name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Median => "median",
            Self::Mean => "mean",
            Self::Mode => "mode",
        }
    }

    /// Scale statistic of a whole frame; `None` for the identity policy.
    pub fn statistic(&self, frame: &Frame) -> Option<f32> {
        if *self == Self::None {
            return None;
        }
        let values = frame.data.as_slice().map(Cow::Borrowed).unwrap_or_else(|| {
            Cow::Owned(frame.data.iter().copied().collect::<Vec<f32>>())
        });
        match self {
            Self::None => None,
            Self::Median => Some(median_in_place(&mut values.into_owned())),
            Self::Mean => Some(mean(&values)),
            Self::Mode => Some(robust_mode(&values)),
        }
    }
}

impl std::fmt::Display for ScalingPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "None"),
            Self::Median => write!(f, "Median"),
            Self::Mean => write!(f, "Mean"),
            Self::Mode => write!(f, "Mode"),
        }
    }
}

/// A stack after scaling, with the divisor applied to each frame.
#[derive(Debug)]
pub struct ScaledStack<'a> {
    /// Borrowed unchanged under `ScalingPolicy::None`.
    pub stack: Cow<'a, Stack>,
    /// Divisor actually applied per frame; 1.0 where a frame was left as is.
    pub factors: Vec<f32>,
}

/// Divide every frame by its own scale statistic.
///
/// The statistic covers the frame's entire raw pixel population, independent
/// of any rejection mask. A zero or non-finite statistic leaves that frame
/// unscaled. The input stack is never modified.
pub fn scale<'a>(stack: &'a Stack, policy: &ScalingPolicy) -> ScaledStack<'a> {
    if *policy == ScalingPolicy::None {
        return ScaledStack {
            stack: Cow::Borrowed(stack),
            factors: vec![1.0; stack.len()],
        };
    }

    let scale_one = |(index, frame): (usize, &Frame)| -> (Frame, f32) {
        let factor = policy.statistic(frame).unwrap_or(1.0);
        if factor == 0.0 || !factor.is_finite() {
            warn!(
                frame = index,
                name = %frame.display_name(),
                factor,
                "Scale statistic unusable, frame left unscaled"
            );
            return (frame.clone(), 1.0);
        }
        debug!(frame = index, factor, "Scaling frame");
        let data = frame.data.mapv(|v| v / factor);
        (
            Frame {
                data,
                source: frame.source.clone(),
            },
            factor,
        )
    };

    let scaled: Vec<(Frame, f32)> = if stack.len() >= PARALLEL_FRAME_THRESHOLD {
        stack.frames().par_iter().enumerate().map(scale_one).collect()
    } else {
        stack.frames().iter().enumerate().map(scale_one).collect()
    };

    let (frames, factors): (Vec<Frame>, Vec<f32>) = scaled.into_iter().unzip();
    ScaledStack {
        stack: Cow::Owned(Stack::from_frames_unchecked(frames)),
        factors,
    }
}
