//! Borrowed views over the flat prediction tensor.
//!
//! The tensor holds, for each anchor, five consecutive `rows x cols` planes in
//! the order score, x, y, width, height. Each plane is row-major. Views check
//! the buffer length once at construction so accessors can index directly.

use crate::geometry::BBox;
use crate::util::{GridBoxError, GridBoxResult};

/// Number of planes stored per anchor.
pub const FIELDS_PER_ANCHOR: usize = 5;

/// One of the five per-anchor planes.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Field {
    Score = 0,
    X = 1,
    Y = 2,
    Width = 3,
    Height = 4,
}

/// Grid dimensions of the prediction map.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct GridShape {
    /// Number of grid rows (H).
    pub rows: usize,
    /// Number of grid columns (W).
    pub cols: usize,
}

impl GridShape {
    /// Creates a shape; both dimensions must be non-zero and `rows * cols`
    /// must fit in `usize`.
    pub fn new(rows: usize, cols: usize) -> GridBoxResult<Self> {
        if rows == 0 || cols == 0 || rows.checked_mul(cols).is_none() {
            return Err(GridBoxError::InvalidDimensions {
                rows,
                cols,
                anchors: 0,
            });
        }
        Ok(Self { rows, cols })
    }

    /// Cells per plane.
    #[inline]
    pub fn cells(&self) -> usize {
        self.rows * self.cols
    }

    /// Number of `f32` values needed for `n_anchor` anchors.
    pub fn tensor_len(&self, n_anchor: usize) -> GridBoxResult<usize> {
        self.rows
            .checked_mul(self.cols)
            .and_then(|v| v.checked_mul(FIELDS_PER_ANCHOR))
            .and_then(|v| v.checked_mul(n_anchor))
            .ok_or(GridBoxError::InvalidDimensions {
                rows: self.rows,
                cols: self.cols,
                anchors: n_anchor,
            })
    }

    /// Offset of `(anchor, field, row, col)` in the flat tensor.
    #[inline]
    pub fn offset(&self, anchor: usize, field: Field, row: usize, col: usize) -> usize {
        let cells = self.cells();
        anchor * FIELDS_PER_ANCHOR * cells + field as usize * cells + row * self.cols + col
    }
}

/// Raw (score, x, y, w, h) quintuple for one anchor and cell.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RawPrediction {
    pub score: f32,
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

fn checked_len(data_len: usize, shape: GridShape, n_anchor: usize) -> GridBoxResult<()> {
    if n_anchor == 0 {
        return Err(GridBoxError::InvalidDimensions {
            rows: shape.rows,
            cols: shape.cols,
            anchors: n_anchor,
        });
    }
    let needed = shape.tensor_len(n_anchor)?;
    if data_len < needed {
        return Err(GridBoxError::BufferTooSmall {
            needed,
            got: data_len,
        });
    }
    Ok(())
}

/// Read-only view of a prediction tensor.
#[derive(Clone, Copy, Debug)]
pub struct PredictionTensor<'a> {
    data: &'a [f32],
    shape: GridShape,
    n_anchor: usize,
}

impl<'a> PredictionTensor<'a> {
    /// Wraps `data`, which must hold at least `n_anchor * 5 * rows * cols` values.
    pub fn new(data: &'a [f32], shape: GridShape, n_anchor: usize) -> GridBoxResult<Self> {
        checked_len(data.len(), shape, n_anchor)?;
        Ok(Self {
            data,
            shape,
            n_anchor,
        })
    }

    pub fn shape(&self) -> GridShape {
        self.shape
    }

    pub fn n_anchor(&self) -> usize {
        self.n_anchor
    }

    /// Returns the `rows * cols` plane for `field` of `anchor`.
    pub fn plane(&self, anchor: usize, field: Field) -> Option<&'a [f32]> {
        if anchor >= self.n_anchor {
            return None;
        }
        let start = self.shape.offset(anchor, field, 0, 0);
        self.data.get(start..start + self.shape.cells())
    }

    /// Returns a single raw value.
    pub fn raw(&self, anchor: usize, field: Field, row: usize, col: usize) -> Option<f32> {
        if anchor >= self.n_anchor || row >= self.shape.rows || col >= self.shape.cols {
            return None;
        }
        self.data
            .get(self.shape.offset(anchor, field, row, col))
            .copied()
    }

    /// Reads the raw quintuple of one anchor at one cell.
    pub fn prediction(&self, anchor: usize, row: usize, col: usize) -> Option<RawPrediction> {
        Some(RawPrediction {
            score: self.raw(anchor, Field::Score, row, col)?,
            x: self.raw(anchor, Field::X, row, col)?,
            y: self.raw(anchor, Field::Y, row, col)?,
            w: self.raw(anchor, Field::Width, row, col)?,
            h: self.raw(anchor, Field::Height, row, col)?,
        })
    }
}

/// Mutable view used when decoded boxes are written back into the tensor.
#[derive(Debug)]
pub struct PredictionTensorMut<'a> {
    data: &'a mut [f32],
    shape: GridShape,
    n_anchor: usize,
}

impl<'a> PredictionTensorMut<'a> {
    /// Wraps `data` with the same length rules as [`PredictionTensor::new`].
    pub fn new(data: &'a mut [f32], shape: GridShape, n_anchor: usize) -> GridBoxResult<Self> {
        checked_len(data.len(), shape, n_anchor)?;
        Ok(Self {
            data,
            shape,
            n_anchor,
        })
    }

    /// Reborrows as a read-only view.
    pub fn as_view(&self) -> PredictionTensor<'_> {
        PredictionTensor {
            data: &*self.data,
            shape: self.shape,
            n_anchor: self.n_anchor,
        }
    }

    /// Overwrites the x/y/w/h slots of `(anchor, row, col)` with `bbox`.
    ///
    /// The score slot is left untouched.
    pub fn write_box(
        &mut self,
        anchor: usize,
        row: usize,
        col: usize,
        bbox: &BBox,
    ) -> GridBoxResult<()> {
        if anchor >= self.n_anchor || row >= self.shape.rows || col >= self.shape.cols {
            return Err(GridBoxError::InvalidParameter {
                name: "cell",
                reason: "anchor, row or column outside the tensor",
            });
        }
        let shape = self.shape;
        self.data[shape.offset(anchor, Field::X, row, col)] = bbox.center_x;
        self.data[shape.offset(anchor, Field::Y, row, col)] = bbox.center_y;
        self.data[shape.offset(anchor, Field::Width, row, col)] = bbox.width;
        self.data[shape.offset(anchor, Field::Height, row, col)] = bbox.height;
        Ok(())
    }
}
