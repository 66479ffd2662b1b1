//! Candidate extraction and the caller-owned scratch buffer.
//!
//! A candidate is one `(anchor, row, col)` cell whose activated score passed
//! the detection threshold. Candidates carry their position explicitly and an
//! `active` flag that suppression clears, so a score of zero is never used as
//! a marker.

mod extract;
#[cfg(feature = "simd")]
pub mod simd;

pub use extract::extract_candidates;

use crate::geometry::BBox;
use crate::util::{GridBoxError, GridBoxResult};

/// One thresholded cell, decoded in place by the anchor decoder.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Candidate {
    /// Position of the cell in extraction order (anchor-major, then row, then column).
    pub index: usize,
    /// Anchor index.
    pub anchor: usize,
    /// Grid row.
    pub row: usize,
    /// Grid column.
    pub col: usize,
    /// Sigmoid-activated score in (0, 1).
    pub score: f32,
    /// Decoded box; zeroed until decoding runs.
    pub bbox: BBox,
    /// Cleared when a higher-scoring overlapping box suppresses this one.
    pub active: bool,
}

impl Candidate {
    /// Creates an active, undecoded candidate.
    pub fn new(index: usize, anchor: usize, row: usize, col: usize, score: f32) -> Self {
        Self {
            index,
            anchor,
            row,
            col,
            score,
            bbox: BBox::default(),
            active: true,
        }
    }

    /// Creates an active candidate with an already decoded box.
    pub fn with_box(index: usize, score: f32, bbox: BBox) -> Self {
        Self {
            bbox,
            ..Self::new(index, 0, 0, 0, score)
        }
    }
}

/// Fixed-capacity scratch list of candidates.
///
/// Owned by the caller and reused across calls; the capacity never grows, and
/// exceeding it is reported as [`GridBoxError::CapacityExceeded`].
#[derive(Clone, Debug)]
pub struct CandidateBuffer {
    items: Vec<Candidate>,
    capacity: usize,
}

impl CandidateBuffer {
    /// Allocates room for exactly `capacity` candidates.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Maximum number of candidates this buffer accepts.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Removes all candidates, keeping the allocation.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Appends a candidate or fails when the buffer is full.
    pub fn push(&mut self, candidate: Candidate) -> GridBoxResult<()> {
        if self.items.len() >= self.capacity {
            return Err(GridBoxError::CapacityExceeded {
                capacity: self.capacity,
                needed: self.items.len() + 1,
            });
        }
        self.items.push(candidate);
        Ok(())
    }

    pub fn as_slice(&self) -> &[Candidate] {
        &self.items
    }

    pub fn as_mut_slice(&mut self) -> &mut [Candidate] {
        &mut self.items
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Candidate> {
        self.items.iter()
    }
}

impl<'a> IntoIterator for &'a CandidateBuffer {
    type Item = &'a Candidate;
    type IntoIter = std::slice::Iter<'a, Candidate>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
