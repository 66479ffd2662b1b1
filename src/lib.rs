//! GridBox turns raw grid-detector output into final bounding boxes.
//!
//! The pipeline thresholds sigmoid-activated scores on a fixed `rows x cols`
//! grid, decodes anchor-relative regressions into pixel-space boxes, and
//! removes duplicates with greedy IoU non-maximum suppression. Parallel batch
//! processing is available via the `rayon` feature and an 8-lane score scan
//! via `simd`.

pub mod anchor;
pub mod candidate;
pub mod geometry;
pub mod lowlevel;
pub mod pipeline;
pub mod suppress;
pub mod tensor;
mod trace;
pub mod util;

pub use anchor::{Anchor, AnchorSet, DecodeParams};
pub use candidate::{Candidate, CandidateBuffer};
pub use geometry::{iou, BBox};
pub use pipeline::{get_boxes, Detector, DetectorConfig};
pub use suppress::Detection;
pub use tensor::{Field, GridShape, PredictionTensor, PredictionTensorMut};
pub use util::{GridBoxError, GridBoxResult};
