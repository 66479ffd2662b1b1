//! Python bindings for the gridbox post-processing library.
//!
//! Exposes the detector, its configuration and box geometry to Python via
//! PyO3; prediction tensors are passed as flat float32 numpy arrays.

use numpy::PyReadonlyArray1;
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

use gridbox::{
    AnchorSet, BBox, Detection as RustDetection, Detector as RustDetector,
    DetectorConfig as RustDetectorConfig, GridBoxError,
};

/// Convert a GridBoxError to a Python exception.
fn to_py_err(err: GridBoxError) -> PyErr {
    PyValueError::new_err(err.to_string())
}

/// Decoded detection in pixel units.
#[pyclass]
#[derive(Clone)]
pub struct Detection {
    #[pyo3(get)]
    pub center_x: f32,
    #[pyo3(get)]
    pub center_y: f32,
    #[pyo3(get)]
    pub width: f32,
    #[pyo3(get)]
    pub height: f32,
    /// Sigmoid-activated score.
    #[pyo3(get)]
    pub score: f32,
    #[pyo3(get)]
    pub anchor: usize,
    #[pyo3(get)]
    pub row: usize,
    #[pyo3(get)]
    pub col: usize,
}

#[pymethods]
impl Detection {
    /// Returns (x_min, y_min, x_max, y_max).
    fn corners(&self) -> (f32, f32, f32, f32) {
        let [x0, y0, x1, y1] =
            BBox::new(self.center_x, self.center_y, self.width, self.height).to_corners();
        (x0, y0, x1, y1)
    }

    fn __repr__(&self) -> String {
        format!(
            "Detection(center_x={:.2}, center_y={:.2}, width={:.2}, height={:.2}, score={:.4})",
            self.center_x, self.center_y, self.width, self.height, self.score
        )
    }
}

impl From<RustDetection> for Detection {
    fn from(d: RustDetection) -> Self {
        Self {
            center_x: d.bbox.center_x,
            center_y: d.bbox.center_y,
            width: d.bbox.width,
            height: d.bbox.height,
            score: d.score,
            anchor: d.anchor,
            row: d.row,
            col: d.col,
        }
    }
}

/// Detector configuration.
#[pyclass]
#[derive(Clone)]
pub struct DetectorConfig {
    inner: RustDetectorConfig,
}

#[pymethods]
impl DetectorConfig {
    /// Create a new DetectorConfig.
    ///
    /// Args:
    ///     grid_rows: Grid rows (default: 15)
    ///     grid_cols: Grid columns (default: 20)
    ///     max_anchors: Maximum anchor count (default: 15)
    ///     stride: Pixels per grid cell (default: 16.0)
    ///     bias: Raw regression offset (default: 3.0)
    ///     score_threshold: Minimum sigmoid score, exclusive (default: 0.5)
    ///     iou_threshold: Suppression IoU, exclusive (default: 0.5)
    ///     max_boxes: Output cap (default: 10)
    #[new]
    #[pyo3(signature = (
        grid_rows = 15,
        grid_cols = 20,
        max_anchors = 15,
        stride = 16.0,
        bias = 3.0,
        score_threshold = 0.5,
        iou_threshold = 0.5,
        max_boxes = 10
    ))]
    #[allow(clippy::too_many_arguments)]
    fn new(
        grid_rows: usize,
        grid_cols: usize,
        max_anchors: usize,
        stride: f32,
        bias: f32,
        score_threshold: f32,
        iou_threshold: f32,
        max_boxes: usize,
    ) -> PyResult<Self> {
        let inner = RustDetectorConfig {
            grid_rows,
            grid_cols,
            max_anchors,
            stride,
            bias,
            score_threshold,
            iou_threshold,
            max_boxes,
        };
        inner.validate().map_err(to_py_err)?;
        Ok(Self { inner })
    }

    fn __repr__(&self) -> String {
        let c = &self.inner;
        format!(
            "DetectorConfig(grid_rows={}, grid_cols={}, max_anchors={}, stride={}, bias={}, score_threshold={}, iou_threshold={}, max_boxes={})",
            c.grid_rows,
            c.grid_cols,
            c.max_anchors,
            c.stride,
            c.bias,
            c.score_threshold,
            c.iou_threshold,
            c.max_boxes
        )
    }
}

/// Decode-and-suppress detector bound to an anchor set.
#[pyclass]
pub struct Detector {
    inner: RustDetector,
}

#[pymethods]
impl Detector {
    /// Create a detector.
    ///
    /// Args:
    ///     anchors: List of (center_x, center_y, width, height) tuples
    ///     config: Optional DetectorConfig (defaults used when omitted)
    #[new]
    #[pyo3(signature = (anchors, config = None))]
    fn new(anchors: Vec<[f32; 4]>, config: Option<DetectorConfig>) -> PyResult<Self> {
        let anchors = AnchorSet::from_rows(&anchors).map_err(to_py_err)?;
        let cfg = config.map(|c| c.inner).unwrap_or_default();
        let inner = RustDetector::new(cfg, anchors).map_err(to_py_err)?;
        Ok(Self { inner })
    }

    /// Number of float32 values a prediction tensor must hold.
    #[getter]
    fn tensor_len(&self) -> usize {
        self.inner.tensor_len()
    }

    /// Run the pipeline on a flat float32 array.
    ///
    /// Returns:
    ///     List of Detection objects, best first
    fn detect(&self, logits: PyReadonlyArray1<'_, f32>) -> PyResult<Vec<Detection>> {
        let data = logits.as_slice()?;
        let boxes = self.inner.detect(data).map_err(to_py_err)?;
        Ok(boxes.into_iter().map(Detection::from).collect())
    }

    /// Run the pipeline over several frames in parallel.
    fn detect_batch(&self, frames: Vec<PyReadonlyArray1<'_, f32>>) -> PyResult<Vec<Vec<Detection>>> {
        let slices = frames
            .iter()
            .map(|f| f.as_slice())
            .collect::<Result<Vec<_>, _>>()?;
        let batch = self.inner.detect_batch(&slices).map_err(to_py_err)?;
        Ok(batch
            .into_iter()
            .map(|boxes| boxes.into_iter().map(Detection::from).collect())
            .collect())
    }

    fn __repr__(&self) -> String {
        format!("Detector(anchors={})", self.inner.anchors().len())
    }
}

/// Intersection over union of two (center_x, center_y, width, height) boxes.
#[pyfunction]
fn iou(a: (f32, f32, f32, f32), b: (f32, f32, f32, f32)) -> f32 {
    gridbox::iou(&BBox::new(a.0, a.1, a.2, a.3), &BBox::new(b.0, b.1, b.2, b.3))
}

/// Intersection over union of two (x_min, y_min, x_max, y_max) boxes.
#[pyfunction]
fn iou_corners(a: [f32; 4], b: [f32; 4]) -> f32 {
    gridbox::iou(&BBox::from_corners(a), &BBox::from_corners(b))
}

/// One-shot helper: build a detector and run it on a single tensor.
///
/// For repeated calls with the same anchors, construct a Detector once.
#[pyfunction]
#[pyo3(signature = (
    logits,
    anchors,
    score_threshold = 0.5,
    iou_threshold = 0.5,
    max_boxes = 10,
    grid_rows = 15,
    grid_cols = 20,
    stride = 16.0,
    bias = 3.0
))]
#[allow(clippy::too_many_arguments)]
fn detect_boxes(
    logits: PyReadonlyArray1<'_, f32>,
    anchors: Vec<[f32; 4]>,
    score_threshold: f32,
    iou_threshold: f32,
    max_boxes: usize,
    grid_rows: usize,
    grid_cols: usize,
    stride: f32,
    bias: f32,
) -> PyResult<Vec<Detection>> {
    let cfg = RustDetectorConfig {
        grid_rows,
        grid_cols,
        stride,
        bias,
        score_threshold,
        iou_threshold,
        max_boxes,
        ..RustDetectorConfig::default()
    };
    let anchors = AnchorSet::from_rows(&anchors).map_err(to_py_err)?;
    let detector = RustDetector::new(cfg, anchors).map_err(to_py_err)?;
    let boxes = detector.detect(logits.as_slice()?).map_err(to_py_err)?;
    Ok(boxes.into_iter().map(Detection::from).collect())
}

/// Python module for gridbox.
#[pymodule]
fn _gridbox(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<Detection>()?;
    m.add_class::<DetectorConfig>()?;
    m.add_class::<Detector>()?;
    m.add_function(wrap_pyfunction!(iou, m)?)?;
    m.add_function(wrap_pyfunction!(iou_corners, m)?)?;
    m.add_function(wrap_pyfunction!(detect_boxes, m)?)?;

    m.add("__version__", env!("CARGO_PKG_VERSION"))?;

    Ok(())
}
