//! Greedy non-maximum suppression over decoded candidates.
//!
//! Candidates are ordered by descending score, then each still-active box
//! deactivates every later active box whose IoU with it is strictly above the
//! threshold. Survivors are copied out in score order up to a caller limit.

use std::cmp::Ordering;

use crate::candidate::Candidate;
use crate::geometry::{iou, BBox};

/// Final detection handed to downstream consumers.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Detection {
    /// Decoded box in pixel units, center form.
    pub bbox: BBox,
    /// Activated score.
    pub score: f32,
    /// Anchor that produced the box.
    pub anchor: usize,
    /// Grid row of the originating cell.
    pub row: usize,
    /// Grid column of the originating cell.
    pub col: usize,
}

impl Detection {
    /// `(center_x, center_y, width, height)` tuple.
    pub fn ccwh(&self) -> (f32, f32, f32, f32) {
        (
            self.bbox.center_x,
            self.bbox.center_y,
            self.bbox.width,
            self.bbox.height,
        )
    }

    /// `[x_min, y_min, x_max, y_max]`.
    pub fn to_corners(&self) -> [f32; 4] {
        self.bbox.to_corners()
    }
}

impl From<&Candidate> for Detection {
    fn from(c: &Candidate) -> Self {
        Self {
            bbox: c.bbox,
            score: c.score,
            anchor: c.anchor,
            row: c.row,
            col: c.col,
        }
    }
}

fn candidate_cmp_desc(a: &Candidate, b: &Candidate) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.index.cmp(&b.index))
}

/// Sorts by descending score; equal scores keep ascending `index` order.
pub fn sort_candidates_desc(candidates: &mut [Candidate]) {
    candidates.sort_by(candidate_cmp_desc);
}

/// Deactivates every candidate overlapping an earlier active one by more than
/// `iou_threshold`. Expects `candidates` sorted by [`sort_candidates_desc`].
pub fn disable_non_max(candidates: &mut [Candidate], iou_threshold: f32) {
    for c in 0..candidates.len() {
        if !candidates[c].active {
            continue;
        }
        let (head, tail) = candidates.split_at_mut(c + 1);
        let keep = &head[c].bbox;
        for other in tail.iter_mut().filter(|r| r.active) {
            if iou(keep, &other.bbox) > iou_threshold {
                other.active = false;
            }
        }
    }
}

/// Appends active candidates to `out` in order, at most `limit` of them.
///
/// Returns the number appended.
pub fn copy_boxes(candidates: &[Candidate], limit: usize, out: &mut Vec<Detection>) -> usize {
    let before = out.len();
    out.extend(
        candidates
            .iter()
            .filter(|c| c.active)
            .take(limit)
            .map(Detection::from),
    );
    out.len() - before
}

/// Sort, suppress and copy in one step. Returns the number of boxes appended.
pub fn non_max_suppression(
    candidates: &mut [Candidate],
    limit: usize,
    iou_threshold: f32,
    out: &mut Vec<Detection>,
) -> usize {
    sort_candidates_desc(candidates);
    disable_non_max(candidates, iou_threshold);
    copy_boxes(candidates, limit, out)
}
