//! Error types for gridbox.

use thiserror::Error;

/// Result alias for gridbox operations.
pub type GridBoxResult<T> = std::result::Result<T, GridBoxError>;

/// Errors that can occur when configuring or running the detector pipeline.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum GridBoxError {
    /// Grid dimensions or anchor count are zero or overflow.
    #[error("invalid grid dimensions: rows={rows}, cols={cols}, anchors={anchors}")]
    InvalidDimensions {
        rows: usize,
        cols: usize,
        anchors: usize,
    },
    /// The prediction buffer is shorter than the grid layout requires.
    #[error("prediction buffer too small: needed {needed}, got {got}")]
    BufferTooSmall { needed: usize, got: usize },
    /// More candidates passed the score threshold than the scratch buffer holds.
    #[error("candidate buffer capacity {capacity} exceeded (needs at least {needed})")]
    CapacityExceeded { capacity: usize, needed: usize },
    /// The anchor set is larger than the configured maximum.
    #[error("too many anchors: {got} (max {max})")]
    TooManyAnchors { got: usize, max: usize },
    /// The anchor set is empty.
    #[error("anchor set is empty")]
    EmptyAnchors,
    /// An anchor has non-finite values or a non-positive extent.
    #[error("invalid anchor at index {index}: {reason}")]
    InvalidAnchor { index: usize, reason: &'static str },
    /// A score or IoU threshold is outside its valid range.
    #[error("invalid {name} threshold: {value}")]
    InvalidThreshold { name: &'static str, value: f32 },
    /// Any other out-of-range configuration parameter.
    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter {
        name: &'static str,
        reason: &'static str,
    },
}
