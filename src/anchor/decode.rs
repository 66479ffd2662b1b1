//! Decoding of raw regression values into absolute boxes.

use crate::anchor::{Anchor, AnchorSet};
use crate::candidate::Candidate;
use crate::geometry::BBox;
use crate::tensor::{PredictionTensor, RawPrediction};
use crate::util::{GridBoxError, GridBoxResult};

/// Parameters shared by every decoded box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DecodeParams {
    /// Pixel size of one grid cell.
    pub stride: f32,
    /// Constant subtracted from every raw regression value before scaling.
    pub bias: f32,
}

impl Default for DecodeParams {
    fn default() -> Self {
        Self {
            stride: 16.0,
            bias: 3.0,
        }
    }
}

impl DecodeParams {
    pub fn validate(&self) -> GridBoxResult<()> {
        if !self.stride.is_finite() || self.stride <= 0.0 {
            return Err(GridBoxError::InvalidParameter {
                name: "stride",
                reason: "must be finite and positive",
            });
        }
        if !self.bias.is_finite() {
            return Err(GridBoxError::InvalidParameter {
                name: "bias",
                reason: "must be finite",
            });
        }
        Ok(())
    }
}

/// Decodes one raw quintuple at grid cell `(row, col)`.
///
/// Center offsets scale linearly with the anchor extent; width and height
/// scale by `exp(raw - bias)` and are therefore never negative.
pub fn decode_box(
    raw: &RawPrediction,
    anchor: &Anchor,
    row: usize,
    col: usize,
    params: DecodeParams,
) -> BBox {
    let shift_x = col as f32 * params.stride;
    let shift_y = row as f32 * params.stride;
    BBox {
        center_x: (raw.x - params.bias) * anchor.width + anchor.center_x + shift_x,
        center_y: (raw.y - params.bias) * anchor.height + anchor.center_y + shift_y,
        width: (raw.w - params.bias).exp() * anchor.width,
        height: (raw.h - params.bias).exp() * anchor.height,
    }
}

/// Decodes every candidate in `candidates` and stores the box on it.
///
/// Must run once per extraction; candidates carry their anchor and cell so no
/// offset arithmetic on the tensor is needed here.
pub fn decode_candidates(
    tensor: PredictionTensor<'_>,
    anchors: &AnchorSet,
    params: DecodeParams,
    candidates: &mut [Candidate],
) -> GridBoxResult<()> {
    for cand in candidates.iter_mut() {
        let anchor = anchors
            .get(cand.anchor)
            .ok_or(GridBoxError::TooManyAnchors {
                got: cand.anchor + 1,
                max: anchors.len(),
            })?;
        let raw = tensor
            .prediction(cand.anchor, cand.row, cand.col)
            .ok_or(GridBoxError::InvalidParameter {
                name: "candidate",
                reason: "cell outside the tensor",
            })?;
        cand.bbox = decode_box(&raw, anchor, cand.row, cand.col, params);
    }
    Ok(())
}
