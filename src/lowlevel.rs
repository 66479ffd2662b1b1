//! Low-level building blocks for custom post-processing pipelines.
//!
//! Most users should prefer [`Detector`](crate::Detector); these re-exports
//! expose the individual stages for callers that run them separately.

pub use crate::anchor::{decode_box, decode_candidates};
pub use crate::candidate::extract_candidates;
#[cfg(feature = "simd")]
pub use crate::candidate::simd::extract_candidates_simd;
pub use crate::geometry::{intersection, overlap, union};
pub use crate::suppress::{copy_boxes, disable_non_max, non_max_suppression, sort_candidates_desc};
pub use crate::tensor::{RawPrediction, FIELDS_PER_ANCHOR};
