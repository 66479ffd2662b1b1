//! Scalar score-plane scan.

use crate::candidate::{Candidate, CandidateBuffer};
use crate::tensor::{Field, PredictionTensor};
use crate::util::math::sigmoid;
use crate::util::GridBoxResult;

/// Collects every cell whose `sigmoid(score)` is strictly above `score_threshold`.
///
/// `out` is cleared first. Candidates are emitted in anchor-major, row-major
/// order and their `index` records that order. Returns the candidate count.
pub fn extract_candidates(
    tensor: PredictionTensor<'_>,
    score_threshold: f32,
    out: &mut CandidateBuffer,
) -> GridBoxResult<usize> {
    out.clear();
    let shape = tensor.shape();
    let cells = shape.cells();
    for anchor in 0..tensor.n_anchor() {
        let Some(scores) = tensor.plane(anchor, Field::Score) else {
            continue;
        };
        for (cell, &raw) in scores.iter().enumerate() {
            let score = sigmoid(raw);
            if score <= score_threshold || score.is_nan() {
                continue;
            }
            out.push(Candidate::new(
                anchor * cells + cell,
                anchor,
                cell / shape.cols,
                cell % shape.cols,
                score,
            ))?;
        }
    }
    Ok(out.len())
}
