use std::path::PathBuf;

use ndarray::Array2;

use crate::error::{MasterFrameError, Result};

/// A single grayscale calibration exposure.
///
/// Samples are physical values (ADU) as stored in the source file, not
/// normalized to any range.
#[derive(Clone, Debug)]
pub struct Frame {
    /// Pixel data, row-major, shape = (height, width)
    pub data: Array2<f32>,
    /// File the frame was decoded from, if any.
    pub source: Option<PathBuf>,
}

impl Frame {
    pub fn new(data: Array2<f32>) -> Self {
        Self { data, source: None }
    }

    pub fn with_source(data: Array2<f32>, source: impl Into<PathBuf>) -> Self {
        Self {
            data,
            source: Some(source.into()),
        }
    }

    pub fn width(&self) -> usize {
        self.data.ncols()
    }

    pub fn height(&self) -> usize {
        self.data.nrows()
    }

    /// (height, width)
    pub fn dim(&self) -> (usize, usize) {
        self.data.dim()
    }

    /// Name used in provenance records: the file name when known.
    pub fn display_name(&self) -> String {
        match &self.source {
            Some(path) => path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string()),
            None => "<memory>".into(),
        }
    }
}

/// Ordered set of same-geometry frames being combined.
#[derive(Clone, Debug, Default)]
pub struct Stack {
    frames: Vec<Frame>,
}

impl Stack {
    /// Build a stack, failing on the first frame whose dimensions differ from
    /// the first frame's.
    pub fn new(frames: Vec<Frame>) -> Result<Self> {
        let mut stack = Self {
            frames: Vec::with_capacity(frames.len()),
        };
        for frame in frames {
            stack.push(frame)?;
        }
        Ok(stack)
    }

    pub fn push(&mut self, frame: Frame) -> Result<()> {
        if let Some(first) = self.frames.first() {
            if first.dim() != frame.dim() {
                return Err(MasterFrameError::ShapeMismatch {
                    path: frame
                        .source
                        .clone()
                        .unwrap_or_else(|| PathBuf::from(format!("frame #{}", self.frames.len()))),
                    expected: first.dim(),
                    actual: frame.dim(),
                });
            }
        }
        self.frames.push(frame);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// (height, width) shared by every frame; (0, 0) for an empty stack.
    pub fn dim(&self) -> (usize, usize) {
        self.frames.first().map(Frame::dim).unwrap_or((0, 0))
    }

    /// Copy the N samples at `(row, col)` into `out`, in stack order.
    pub fn pixel_column(&self, row: usize, col: usize, out: &mut [f32]) {
        for (slot, frame) in out.iter_mut().zip(&self.frames) {
            *slot = frame.data[[row, col]];
        }
    }

    pub fn source_names(&self) -> Vec<String> {
        self.frames.iter().map(Frame::display_name).collect()
    }

    pub fn into_frames(self) -> Vec<Frame> {
        self.frames
    }

    pub(crate) fn from_frames_unchecked(frames: Vec<Frame>) -> Self {
        Self { frames }
    }
}
