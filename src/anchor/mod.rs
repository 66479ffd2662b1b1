//! Anchor definitions and anchor-relative box decoding.
//!
//! Each anchor is a reference box `(center_x, center_y, width, height)` shared
//! by every grid cell. Regression outputs are decoded relative to the anchor
//! and shifted by the cell position times the grid stride.

mod decode;

pub use decode::{decode_box, decode_candidates, DecodeParams};

use crate::util::{GridBoxError, GridBoxResult};

/// Reference box associated with one prediction channel group.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Anchor {
    /// Center offset inside a cell along x.
    pub center_x: f32,
    /// Center offset inside a cell along y.
    pub center_y: f32,
    /// Nominal width.
    pub width: f32,
    /// Nominal height.
    pub height: f32,
}

impl Anchor {
    pub const fn new(center_x: f32, center_y: f32, width: f32, height: f32) -> Self {
        Self {
            center_x,
            center_y,
            width,
            height,
        }
    }

    fn check(&self, index: usize) -> GridBoxResult<()> {
        let values = [self.center_x, self.center_y, self.width, self.height];
        if values.iter().any(|v| !v.is_finite()) {
            return Err(GridBoxError::InvalidAnchor {
                index,
                reason: "non-finite value",
            });
        }
        if self.width <= 0.0 || self.height <= 0.0 {
            return Err(GridBoxError::InvalidAnchor {
                index,
                reason: "width and height must be positive",
            });
        }
        Ok(())
    }
}

impl From<[f32; 4]> for Anchor {
    fn from(v: [f32; 4]) -> Self {
        Self::new(v[0], v[1], v[2], v[3])
    }
}

/// Ordered, validated, immutable anchor set.
#[derive(Clone, Debug, PartialEq)]
pub struct AnchorSet {
    anchors: Vec<Anchor>,
}

impl AnchorSet {
    /// Validates and wraps `anchors`; the set must be non-empty.
    pub fn new(anchors: Vec<Anchor>) -> GridBoxResult<Self> {
        if anchors.is_empty() {
            return Err(GridBoxError::EmptyAnchors);
        }
        for (index, anchor) in anchors.iter().enumerate() {
            anchor.check(index)?;
        }
        Ok(Self { anchors })
    }

    /// Builds a set from `[center_x, center_y, width, height]` rows.
    pub fn from_rows(rows: &[[f32; 4]]) -> GridBoxResult<Self> {
        Self::new(rows.iter().copied().map(Anchor::from).collect())
    }

    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Anchor> {
        self.anchors.get(index)
    }
}
