//! Decode-and-suppress pipeline.
//!
//! `Detector` validates grid, anchors and thresholds once, then turns a flat
//! prediction buffer into at most `max_boxes` non-overlapping detections:
//! extraction, anchor decoding, sorting, suppression, copy-out. The only
//! per-call state is the candidate scratch buffer, which the caller owns or
//! which is allocated fresh per call.

use crate::anchor::{decode_candidates, AnchorSet, DecodeParams};
use crate::candidate::CandidateBuffer;
use crate::suppress::{non_max_suppression, Detection};
use crate::tensor::{GridShape, PredictionTensor, PredictionTensorMut};
use crate::trace::{trace_event, trace_span};
use crate::util::{GridBoxError, GridBoxResult};

#[cfg(not(feature = "simd"))]
use crate::candidate::extract_candidates as extract;
#[cfg(feature = "simd")]
use crate::candidate::simd::extract_candidates_simd as extract;

#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Detector configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct DetectorConfig {
    /// Grid rows (H).
    pub grid_rows: usize,
    /// Grid columns (W).
    pub grid_cols: usize,
    /// Upper bound on anchors; sizes the candidate scratch.
    pub max_anchors: usize,
    /// Pixel size of one grid cell.
    pub stride: f32,
    /// Offset subtracted from raw regression values.
    pub bias: f32,
    /// Minimum activated score, exclusive.
    pub score_threshold: f32,
    /// IoU above which the lower-scored box is suppressed.
    pub iou_threshold: f32,
    /// Maximum number of boxes returned.
    pub max_boxes: usize,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        let decode = DecodeParams::default();
        Self {
            grid_rows: 15,
            grid_cols: 20,
            max_anchors: 15,
            stride: decode.stride,
            bias: decode.bias,
            score_threshold: 0.5,
            iou_threshold: 0.5,
            max_boxes: 10,
        }
    }
}

/// Score threshold lies in [0, 1): at 1.0 no sigmoid output can pass.
fn check_score_threshold(value: f32) -> GridBoxResult<()> {
    if !(0.0..1.0).contains(&value) {
        return Err(GridBoxError::InvalidThreshold {
            name: "score",
            value,
        });
    }
    Ok(())
}

/// IoU threshold lies in [0, 1].
fn check_iou_threshold(value: f32) -> GridBoxResult<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(GridBoxError::InvalidThreshold { name: "iou", value });
    }
    Ok(())
}

impl DetectorConfig {
    /// Validates every field.
    pub fn validate(&self) -> GridBoxResult<()> {
        self.grid_shape()?;
        self.scratch_capacity()?;
        self.decode_params().validate()?;
        check_score_threshold(self.score_threshold)?;
        check_iou_threshold(self.iou_threshold)?;
        Ok(())
    }

    /// Grid shape derived from `grid_rows` and `grid_cols`.
    pub fn grid_shape(&self) -> GridBoxResult<GridShape> {
        GridShape::new(self.grid_rows, self.grid_cols)
    }

    /// Decoder parameters derived from `stride` and `bias`.
    pub fn decode_params(&self) -> DecodeParams {
        DecodeParams {
            stride: self.stride,
            bias: self.bias,
        }
    }

    /// Worst-case candidate count: `grid_rows * grid_cols * max_anchors`.
    pub fn scratch_capacity(&self) -> GridBoxResult<usize> {
        let invalid = GridBoxError::InvalidDimensions {
            rows: self.grid_rows,
            cols: self.grid_cols,
            anchors: self.max_anchors,
        };
        if self.max_anchors == 0 {
            return Err(invalid);
        }
        self.grid_rows
            .checked_mul(self.grid_cols)
            .and_then(|v| v.checked_mul(self.max_anchors))
            .ok_or(invalid)
    }
}

/// Validated detector: configuration plus anchor set.
#[derive(Clone, Debug)]
pub struct Detector {
    cfg: DetectorConfig,
    shape: GridShape,
    anchors: AnchorSet,
    capacity: usize,
    tensor_len: usize,
}

impl Detector {
    /// Validates `cfg` and checks `anchors` against `cfg.max_anchors`.
    pub fn new(cfg: DetectorConfig, anchors: AnchorSet) -> GridBoxResult<Self> {
        cfg.validate()?;
        if anchors.len() > cfg.max_anchors {
            return Err(GridBoxError::TooManyAnchors {
                got: anchors.len(),
                max: cfg.max_anchors,
            });
        }
        let shape = cfg.grid_shape()?;
        let capacity = cfg.scratch_capacity()?;
        let tensor_len = shape.tensor_len(anchors.len())?;
        Ok(Self {
            cfg,
            shape,
            anchors,
            capacity,
            tensor_len,
        })
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.cfg
    }

    pub fn anchors(&self) -> &AnchorSet {
        &self.anchors
    }

    /// Number of `f32` values a prediction buffer must hold.
    pub fn tensor_len(&self) -> usize {
        self.tensor_len
    }

    /// Allocates a scratch buffer sized for the worst case of this detector.
    pub fn new_scratch(&self) -> CandidateBuffer {
        CandidateBuffer::with_capacity(self.capacity)
    }

    /// Runs the pipeline with caller-owned scratch.
    ///
    /// `out` is cleared and then filled with at most `max_boxes` detections in
    /// descending score order. Returns the number written.
    pub fn detect_into(
        &self,
        logits: &[f32],
        scratch: &mut CandidateBuffer,
        out: &mut Vec<Detection>,
    ) -> GridBoxResult<usize> {
        out.clear();
        let tensor = PredictionTensor::new(logits, self.shape, self.anchors.len())?;
        run(
            tensor,
            &self.anchors,
            self.cfg.decode_params(),
            self.cfg.score_threshold,
            self.cfg.iou_threshold,
            self.cfg.max_boxes,
            scratch,
            out,
        )
    }

    /// Runs the pipeline with a freshly allocated scratch buffer.
    pub fn detect(&self, logits: &[f32]) -> GridBoxResult<Vec<Detection>> {
        let mut scratch = self.new_scratch();
        let mut out = Vec::with_capacity(self.cfg.max_boxes);
        self.detect_into(logits, &mut scratch, &mut out)?;
        Ok(out)
    }

    /// Runs [`Detector::detect`] over several frames.
    ///
    /// With the `rayon` feature frames are processed in parallel, each with
    /// its own scratch buffer.
    pub fn detect_batch(&self, frames: &[&[f32]]) -> GridBoxResult<Vec<Vec<Detection>>> {
        let _span = trace_span!("detect_batch", frames = frames.len()).entered();
        #[cfg(feature = "rayon")]
        let frames = frames.par_iter();
        #[cfg(not(feature = "rayon"))]
        let frames = frames.iter();
        frames.map(|frame| self.detect(frame)).collect()
    }

    /// Extracts and decodes candidates, writing each decoded box back over the
    /// raw x/y/w/h slots of its cell. Score slots are left unchanged.
    ///
    /// Returns the number of cells decoded.
    pub fn decode_in_place(&self, logits: &mut [f32]) -> GridBoxResult<usize> {
        let mut scratch = self.new_scratch();
        let mut tensor = PredictionTensorMut::new(logits, self.shape, self.anchors.len())?;
        extract(tensor.as_view(), self.cfg.score_threshold, &mut scratch)?;
        decode_candidates(
            tensor.as_view(),
            &self.anchors,
            self.cfg.decode_params(),
            scratch.as_mut_slice(),
        )?;
        for cand in scratch.iter() {
            tensor.write_box(cand.anchor, cand.row, cand.col, &cand.bbox)?;
        }
        Ok(scratch.len())
    }
}

/// One-shot entry point: validates the parameters and runs the pipeline.
///
/// `out` is cleared first. Returns the number of boxes written, never more
/// than `max_boxes`.
#[allow(clippy::too_many_arguments)]
pub fn get_boxes(
    logits: &[f32],
    shape: GridShape,
    anchors: &AnchorSet,
    params: DecodeParams,
    score_threshold: f32,
    iou_threshold: f32,
    max_boxes: usize,
    scratch: &mut CandidateBuffer,
    out: &mut Vec<Detection>,
) -> GridBoxResult<usize> {
    out.clear();
    params.validate()?;
    check_score_threshold(score_threshold)?;
    check_iou_threshold(iou_threshold)?;
    let tensor = PredictionTensor::new(logits, shape, anchors.len())?;
    run(
        tensor,
        anchors,
        params,
        score_threshold,
        iou_threshold,
        max_boxes,
        scratch,
        out,
    )
}

#[allow(clippy::too_many_arguments)]
fn run(
    tensor: PredictionTensor<'_>,
    anchors: &AnchorSet,
    params: DecodeParams,
    score_threshold: f32,
    iou_threshold: f32,
    max_boxes: usize,
    scratch: &mut CandidateBuffer,
    out: &mut Vec<Detection>,
) -> GridBoxResult<usize> {
    let _span = trace_span!("detect", anchors = anchors.len()).entered();

    let n_candidates = extract(tensor, score_threshold, scratch)?;
    trace_event!("candidates", count = n_candidates);
    if n_candidates == 0 {
        return Ok(0);
    }

    decode_candidates(tensor, anchors, params, scratch.as_mut_slice())?;
    let n_boxes = non_max_suppression(scratch.as_mut_slice(), max_boxes, iou_threshold, out);
    trace_event!("boxes", count = n_boxes);
    Ok(n_boxes)
}
