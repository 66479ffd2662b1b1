//! SIMD score-plane scan using the `wide` crate.
//!
//! Eight raw scores are compared against a logit-space bound at once; only
//! chunks with at least one lane above the bound fall back to the scalar
//! sigmoid check, so the output matches [`extract_candidates`] exactly.
//!
//! [`extract_candidates`]: crate::candidate::extract_candidates

use crate::candidate::{Candidate, CandidateBuffer};
use crate::tensor::{Field, PredictionTensor};
use crate::util::math::{logit, sigmoid};
use crate::util::GridBoxResult;
use wide::f32x8;

const LANES: usize = 8;

/// Logit-space slack so rounding in `sigmoid` never rejects a lane the scalar
/// path would accept.
const PREFILTER_SLACK: f32 = 0.25;

#[inline]
fn load_f32x8(slice: &[f32]) -> f32x8 {
    f32x8::from([
        slice[0], slice[1], slice[2], slice[3], slice[4], slice[5], slice[6], slice[7],
    ])
}

/// SIMD variant of [`crate::candidate::extract_candidates`].
pub fn extract_candidates_simd(
    tensor: PredictionTensor<'_>,
    score_threshold: f32,
    out: &mut CandidateBuffer,
) -> GridBoxResult<usize> {
    out.clear();
    let shape = tensor.shape();
    let cells = shape.cells();
    let bound = f32x8::splat(logit(score_threshold) - PREFILTER_SLACK);

    let mut accept = |anchor: usize, cell: usize, raw: f32| -> GridBoxResult<()> {
        let score = sigmoid(raw);
        if score > score_threshold {
            out.push(Candidate::new(
                anchor * cells + cell,
                anchor,
                cell / shape.cols,
                cell % shape.cols,
                score,
            ))?;
        }
        Ok(())
    };

    for anchor in 0..tensor.n_anchor() {
        let Some(scores) = tensor.plane(anchor, Field::Score) else {
            continue;
        };
        let simd_end = scores.len() / LANES * LANES;
        for base in (0..simd_end).step_by(LANES) {
            let chunk = &scores[base..base + LANES];
            if !load_f32x8(chunk).simd_gt(bound).any() {
                continue;
            }
            for (lane, &raw) in chunk.iter().enumerate() {
                accept(anchor, base + lane, raw)?;
            }
        }
        for (cell, &raw) in scores.iter().enumerate().skip(simd_end) {
            accept(anchor, cell, raw)?;
        }
    }
    Ok(out.len())
}
