use ndarray::Array2;
use serde::Serialize;

use crate::combine::CombineMethod;
use crate::reject::RejectionPolicy;
use crate::scale::ScalingPolicy;

/// How a master frame was produced.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Provenance {
    /// Calibration stage name, e.g. "bias".
    pub stage: String,
    pub source_count: usize,
    pub combine_method: CombineMethod,
    pub rejection_policy: RejectionPolicy,
    pub scaling_policy: ScalingPolicy,
    /// Input file names in stack order.
    pub input_file_names: Vec<String>,
    /// Divisor applied to each input frame (1.0 when unscaled).
    pub scale_factors: Vec<f32>,
}

/// Combined calibration frame. Immutable once built.
#[derive(Clone, Debug)]
pub struct MasterFrame {
    data: Array2<f32>,
    provenance: Provenance,
}

impl MasterFrame {
    pub fn new(data: Array2<f32>, provenance: Provenance) -> Self {
        Self { data, provenance }
    }

    pub fn data(&self) -> &Array2<f32> {
        &self.data
    }

    pub fn provenance(&self) -> &Provenance {
        &self.provenance
    }

    pub fn width(&self) -> usize {
        self.data.ncols()
    }

    pub fn height(&self) -> usize {
        self.data.nrows()
    }

    pub fn into_parts(self) -> (Array2<f32>, Provenance) {
        (self.data, self.provenance)
    }
}
