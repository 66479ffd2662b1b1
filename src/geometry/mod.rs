//! Axis-aligned box geometry in center form.
//!
//! All functions are pure. Boxes are `(center_x, center_y, width, height)`;
//! half of each extent lies on either side of the center.

/// Decoded box in absolute pixel units, center form.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BBox {
    /// Horizontal center.
    pub center_x: f32,
    /// Vertical center.
    pub center_y: f32,
    /// Full width.
    pub width: f32,
    /// Full height.
    pub height: f32,
}

impl BBox {
    /// Creates a box from its center and extents.
    pub const fn new(center_x: f32, center_y: f32, width: f32, height: f32) -> Self {
        Self {
            center_x,
            center_y,
            width,
            height,
        }
    }

    /// Builds a center-form box from `[x_min, y_min, x_max, y_max]`.
    pub fn from_corners(corners: [f32; 4]) -> Self {
        let [x0, y0, x1, y1] = corners;
        Self {
            center_x: (x0 + x1) * 0.5,
            center_y: (y0 + y1) * 0.5,
            width: x1 - x0,
            height: y1 - y0,
        }
    }

    /// Returns `[x_min, y_min, x_max, y_max]`.
    pub fn to_corners(&self) -> [f32; 4] {
        let hw = self.width * 0.5;
        let hh = self.height * 0.5;
        [
            self.center_x - hw,
            self.center_y - hh,
            self.center_x + hw,
            self.center_y + hh,
        ]
    }

    /// Area `width * height`.
    #[inline]
    pub fn area(&self) -> f32 {
        self.width * self.height
    }
}

/// Signed 1-D overlap between two intervals given as center and extent.
///
/// Negative when the intervals are disjoint.
#[inline]
pub fn overlap(center_a: f32, extent_a: f32, center_b: f32, extent_b: f32) -> f32 {
    let left = (center_a - extent_a * 0.5).max(center_b - extent_b * 0.5);
    let right = (center_a + extent_a * 0.5).min(center_b + extent_b * 0.5);
    right - left
}

/// Intersection area; zero when either axis does not overlap.
#[inline]
pub fn intersection(a: &BBox, b: &BBox) -> f32 {
    let w = overlap(a.center_x, a.width, b.center_x, b.width);
    let h = overlap(a.center_y, a.height, b.center_y, b.height);
    if w < 0.0 || h < 0.0 {
        return 0.0;
    }
    w * h
}

/// Union area `area(a) + area(b) - intersection(a, b)`.
#[inline]
pub fn union(a: &BBox, b: &BBox) -> f32 {
    a.area() + b.area() - intersection(a, b)
}

/// Intersection over union.
///
/// Returns 0.0 when the union is not strictly positive (degenerate boxes),
/// so a zero-size box never triggers suppression.
#[inline]
pub fn iou(a: &BBox, b: &BBox) -> f32 {
    let inter = intersection(a, b);
    let uni = a.area() + b.area() - inter;
    if uni > 0.0 {
        inter / uni
    } else {
        0.0
    }
}
