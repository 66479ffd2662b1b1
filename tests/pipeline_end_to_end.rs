use gridbox::lowlevel::{extract_candidates, non_max_suppression};
use gridbox::{
    get_boxes, AnchorSet, BBox, Candidate, CandidateBuffer, DecodeParams, Detector,
    DetectorConfig, Field, GridBoxError, GridShape, PredictionTensor,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Raw values that decode exactly onto the anchor box.
const NEUTRAL: f32 = 3.0;
const BACKGROUND: f32 = -10.0;

struct TensorBuilder {
    shape: GridShape,
    data: Vec<f32>,
}

impl TensorBuilder {
    fn new(rows: usize, cols: usize, n_anchor: usize) -> Self {
        let shape = GridShape::new(rows, cols).unwrap();
        let mut data = vec![NEUTRAL; shape.tensor_len(n_anchor).unwrap()];
        for anchor in 0..n_anchor {
            for row in 0..rows {
                for col in 0..cols {
                    data[shape.offset(anchor, Field::Score, row, col)] = BACKGROUND;
                }
            }
        }
        Self { shape, data }
    }

    fn set(&mut self, anchor: usize, row: usize, col: usize, raw: [f32; 5]) -> &mut Self {
        let fields = [Field::Score, Field::X, Field::Y, Field::Width, Field::Height];
        for (field, value) in fields.into_iter().zip(raw) {
            self.data[self.shape.offset(anchor, field, row, col)] = value;
        }
        self
    }

    fn score(&mut self, anchor: usize, row: usize, col: usize, raw_score: f32) -> &mut Self {
        self.set(anchor, row, col, [raw_score, NEUTRAL, NEUTRAL, NEUTRAL, NEUTRAL])
    }
}

fn small_config(rows: usize, cols: usize, max_anchors: usize) -> DetectorConfig {
    DetectorConfig {
        grid_rows: rows,
        grid_cols: cols,
        max_anchors,
        ..DetectorConfig::default()
    }
}

fn logit(p: f32) -> f32 {
    (p / (1.0 - p)).ln()
}

#[test]
fn single_cell_at_bias_decodes_to_anchor() {
    let anchors = AnchorSet::from_rows(&[[8.0, 8.0, 16.0, 16.0]]).unwrap();
    let detector = Detector::new(small_config(1, 1, 1), anchors).unwrap();
    let mut t = TensorBuilder::new(1, 1, 1);
    t.set(0, 0, 0, [10.0, 3.0, 3.0, 3.0, 3.0]);

    let boxes = detector.detect(&t.data).unwrap();
    assert_eq!(boxes.len(), 1);
    assert_eq!(boxes[0].bbox, BBox::new(8.0, 8.0, 16.0, 16.0));
    assert_eq!(boxes[0].ccwh(), (8.0, 8.0, 16.0, 16.0));
    assert_eq!(boxes[0].to_corners(), [0.0, 0.0, 16.0, 16.0]);
}

#[test]
fn custom_stride_and_bias_shift_the_decoded_box() {
    let anchors = AnchorSet::from_rows(&[[4.0, 4.0, 8.0, 8.0]]).unwrap();
    let cfg = DetectorConfig {
        stride: 8.0,
        bias: 0.0,
        ..small_config(2, 3, 1)
    };
    let detector = Detector::new(cfg, anchors).unwrap();
    let mut t = TensorBuilder::new(2, 3, 1);
    t.set(0, 1, 2, [10.0, 0.0, 0.0, 0.0, 0.0]);

    let boxes = detector.detect(&t.data).unwrap();
    assert_eq!(boxes.len(), 1);
    assert_eq!((boxes[0].row, boxes[0].col), (1, 2));
    assert_eq!(boxes[0].bbox, BBox::new(20.0, 12.0, 8.0, 8.0));
}

#[test]
fn identical_boxes_keep_the_higher_score() {
    let anchors = AnchorSet::from_rows(&[[8.0, 8.0, 16.0, 16.0], [8.0, 8.0, 16.0, 16.0]]).unwrap();
    let detector = Detector::new(small_config(1, 1, 2), anchors).unwrap();
    let mut t = TensorBuilder::new(1, 1, 2);
    t.score(0, 0, 0, logit(0.8)).score(1, 0, 0, logit(0.9));

    let boxes = detector.detect(&t.data).unwrap();
    assert_eq!(boxes.len(), 1);
    assert!((boxes[0].score - 0.9).abs() < 1e-5);
    assert_eq!(boxes[0].anchor, 1);
}

#[test]
fn equal_scores_resolve_to_the_earlier_cell() {
    let anchors = AnchorSet::from_rows(&[[8.0, 8.0, 16.0, 16.0], [8.0, 8.0, 16.0, 16.0]]).unwrap();
    let detector = Detector::new(small_config(1, 1, 2), anchors).unwrap();
    let mut t = TensorBuilder::new(1, 1, 2);
    t.score(0, 0, 0, 2.0).score(1, 0, 0, 2.0);

    let boxes = detector.detect(&t.data).unwrap();
    assert_eq!(boxes.len(), 1);
    assert_eq!(boxes[0].anchor, 0);
}

#[test]
fn nothing_above_threshold_returns_no_boxes() {
    let anchors = AnchorSet::from_rows(&[[8.0, 8.0, 16.0, 16.0]]).unwrap();
    let detector = Detector::new(DetectorConfig::default(), anchors).unwrap();
    let t = TensorBuilder::new(15, 20, 1);

    let mut scratch = detector.new_scratch();
    let mut out = vec![gridbox::Detection {
        bbox: BBox::default(),
        score: 1.0,
        anchor: 0,
        row: 0,
        col: 0,
    }];
    let n = detector.detect_into(&t.data, &mut scratch, &mut out).unwrap();
    assert_eq!(n, 0);
    assert!(out.is_empty());
}

#[test]
fn output_limit_keeps_the_best_box() {
    let anchors = AnchorSet::from_rows(&[[8.0, 8.0, 8.0, 8.0]]).unwrap();
    let cfg = DetectorConfig {
        max_boxes: 1,
        ..small_config(1, 3, 1)
    };
    let detector = Detector::new(cfg, anchors).unwrap();
    let mut t = TensorBuilder::new(1, 3, 1);
    t.score(0, 0, 0, 1.0).score(0, 0, 1, 3.0).score(0, 0, 2, 2.0);

    let boxes = detector.detect(&t.data).unwrap();
    assert_eq!(boxes.len(), 1);
    assert_eq!(boxes[0].col, 1);
    assert_eq!(boxes[0].bbox.center_x, 24.0);
}

#[test]
fn threshold_of_one_keeps_partially_overlapping_boxes() {
    let anchors = AnchorSet::from_rows(&[[8.0, 8.0, 32.0, 32.0]]).unwrap();
    let cfg = DetectorConfig {
        iou_threshold: 1.0,
        ..small_config(1, 3, 1)
    };
    let detector = Detector::new(cfg, anchors).unwrap();
    let mut t = TensorBuilder::new(1, 3, 1);
    t.score(0, 0, 0, 1.0).score(0, 0, 1, 2.0).score(0, 0, 2, 3.0);

    let boxes = detector.detect(&t.data).unwrap();
    assert_eq!(boxes.len(), 3);
    let cols: Vec<_> = boxes.iter().map(|d| d.col).collect();
    assert_eq!(cols, vec![2, 1, 0]);
}

#[test]
fn neighbouring_cells_on_one_object_collapse_to_one_box() {
    let anchors = AnchorSet::from_rows(&[
        [8.0, 8.0, 32.0, 32.0],
        [8.0, 8.0, 64.0, 64.0],
        [8.0, 8.0, 16.0, 48.0],
    ])
    .unwrap();
    let detector = Detector::new(DetectorConfig::default(), anchors).unwrap();
    let mut t = TensorBuilder::new(15, 20, 3);

    // Anchor width 32 and stride 16: shifting one column right is undone by
    // a raw x of 2.5, and one row down by a raw y of 2.5.
    t.set(0, 4, 5, [4.0, 3.0, 3.0, 3.0, 3.0])
        .set(0, 4, 6, [2.0, 2.5, 3.0, 3.0, 3.0])
        .set(0, 5, 5, [3.0, 3.0, 2.5, 3.0, 3.0]);
    // Second object far away on a different anchor.
    t.set(1, 10, 15, [1.5, 3.0, 3.0, 3.0, 3.0]);
    // Below threshold.
    t.score(2, 0, 0, -1.0);

    let boxes = detector.detect(&t.data).unwrap();
    assert_eq!(boxes.len(), 2);
    assert_eq!((boxes[0].anchor, boxes[0].row, boxes[0].col), (0, 4, 5));
    assert_eq!(boxes[0].bbox, BBox::new(88.0, 72.0, 32.0, 32.0));
    assert_eq!((boxes[1].anchor, boxes[1].row, boxes[1].col), (1, 10, 15));
    assert_eq!(boxes[1].bbox, BBox::new(248.0, 168.0, 64.0, 64.0));
}

#[test]
fn scratch_reuse_does_not_leak_between_frames() {
    let anchors = AnchorSet::from_rows(&[[8.0, 8.0, 16.0, 16.0]]).unwrap();
    let detector = Detector::new(small_config(2, 2, 1), anchors).unwrap();
    let mut first = TensorBuilder::new(2, 2, 1);
    first.score(0, 0, 0, 2.0).score(0, 1, 1, 2.0);
    let mut second = TensorBuilder::new(2, 2, 1);
    second.score(0, 0, 1, 2.0);

    let mut scratch = detector.new_scratch();
    let mut out = Vec::new();
    assert_eq!(detector.detect_into(&first.data, &mut scratch, &mut out).unwrap(), 2);
    assert_eq!(detector.detect_into(&second.data, &mut scratch, &mut out).unwrap(), 1);
    assert_eq!(out, detector.detect(&second.data).unwrap());
    assert_eq!((out[0].row, out[0].col), (0, 1));
}

#[test]
fn undersized_scratch_fails_loudly() {
    let anchors = AnchorSet::from_rows(&[[8.0, 8.0, 16.0, 16.0]]).unwrap();
    let detector = Detector::new(small_config(1, 3, 1), anchors).unwrap();
    let mut t = TensorBuilder::new(1, 3, 1);
    t.score(0, 0, 0, 2.0).score(0, 0, 2, 2.0);

    let mut scratch = CandidateBuffer::with_capacity(1);
    let mut out = Vec::new();
    let err = detector
        .detect_into(&t.data, &mut scratch, &mut out)
        .err()
        .unwrap();
    assert_eq!(
        err,
        GridBoxError::CapacityExceeded {
            capacity: 1,
            needed: 2,
        }
    );
}

#[test]
fn decode_in_place_rewrites_only_candidate_cells() {
    let anchors = AnchorSet::from_rows(&[[8.0, 8.0, 16.0, 16.0]]).unwrap();
    let detector = Detector::new(small_config(1, 2, 1), anchors).unwrap();
    let mut t = TensorBuilder::new(1, 2, 1);
    t.set(0, 0, 1, [10.0, 3.5, 3.0, 4.0, 3.0]);
    let shape = t.shape;

    let decoded = detector.decode_in_place(&mut t.data).unwrap();
    assert_eq!(decoded, 1);
    assert_eq!(t.data[shape.offset(0, Field::Score, 0, 1)], 10.0);
    assert_eq!(t.data[shape.offset(0, Field::X, 0, 1)], 32.0);
    assert_eq!(t.data[shape.offset(0, Field::Y, 0, 1)], 8.0);
    assert!((t.data[shape.offset(0, Field::Width, 0, 1)] - std::f32::consts::E * 16.0).abs() < 1e-4);
    assert_eq!(t.data[shape.offset(0, Field::Height, 0, 1)], 16.0);
    // Background cell keeps its raw regression values.
    assert_eq!(t.data[shape.offset(0, Field::X, 0, 0)], NEUTRAL);
}

#[test]
fn free_function_matches_detector() {
    let anchors = AnchorSet::from_rows(&[[8.0, 8.0, 24.0, 24.0], [4.0, 4.0, 40.0, 20.0]]).unwrap();
    let cfg = DetectorConfig::default();
    let detector = Detector::new(cfg.clone(), anchors.clone()).unwrap();
    let data = random_tensor(&mut StdRng::seed_from_u64(3), 15, 20, 2);

    let mut scratch = detector.new_scratch();
    let mut out = Vec::new();
    let n = get_boxes(
        &data,
        GridShape::new(15, 20).unwrap(),
        &anchors,
        DecodeParams::default(),
        cfg.score_threshold,
        cfg.iou_threshold,
        cfg.max_boxes,
        &mut scratch,
        &mut out,
    )
    .unwrap();
    assert_eq!(n, out.len());
    assert_eq!(out, detector.detect(&data).unwrap());

    let err = get_boxes(
        &data,
        GridShape::new(15, 20).unwrap(),
        &anchors,
        DecodeParams::default(),
        -0.1,
        0.5,
        10,
        &mut scratch,
        &mut out,
    )
    .err()
    .unwrap();
    assert!(matches!(err, GridBoxError::InvalidThreshold { name: "score", .. }));
}

fn random_tensor(rng: &mut StdRng, rows: usize, cols: usize, n_anchor: usize) -> Vec<f32> {
    let shape = GridShape::new(rows, cols).unwrap();
    let mut data = vec![0.0f32; shape.tensor_len(n_anchor).unwrap()];
    for anchor in 0..n_anchor {
        for row in 0..rows {
            for col in 0..cols {
                data[shape.offset(anchor, Field::Score, row, col)] = rng.random_range(-4.0..3.0);
                data[shape.offset(anchor, Field::X, row, col)] = rng.random_range(2.0..4.0);
                data[shape.offset(anchor, Field::Y, row, col)] = rng.random_range(2.0..4.0);
                data[shape.offset(anchor, Field::Width, row, col)] = rng.random_range(2.5..3.5);
                data[shape.offset(anchor, Field::Height, row, col)] = rng.random_range(2.5..3.5);
            }
        }
    }
    data
}

#[test]
fn output_is_bounded_and_suppression_is_idempotent() {
    let anchors = AnchorSet::from_rows(&[[8.0, 8.0, 24.0, 24.0], [8.0, 8.0, 48.0, 32.0]]).unwrap();
    let mut rng = StdRng::seed_from_u64(42);
    for max_boxes in [0usize, 1, 5, 50, 1000] {
        let cfg = DetectorConfig {
            max_boxes,
            ..DetectorConfig::default()
        };
        let detector = Detector::new(cfg.clone(), anchors.clone()).unwrap();
        let data = random_tensor(&mut rng, 15, 20, 2);

        let view = PredictionTensor::new(&data, GridShape::new(15, 20).unwrap(), 2).unwrap();
        let mut scratch = detector.new_scratch();
        let n_candidates = extract_candidates(view, cfg.score_threshold, &mut scratch).unwrap();

        let boxes = detector.detect(&data).unwrap();
        assert!(boxes.len() <= max_boxes);
        assert!(boxes.len() <= n_candidates);
        for pair in boxes.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }

        let mut again: Vec<Candidate> = boxes
            .iter()
            .enumerate()
            .map(|(i, d)| Candidate::with_box(i, d.score, d.bbox))
            .collect();
        let mut rerun = Vec::new();
        non_max_suppression(&mut again, usize::MAX, cfg.iou_threshold, &mut rerun);
        assert_eq!(rerun.len(), boxes.len());
        for (a, b) in rerun.iter().zip(boxes.iter()) {
            assert_eq!(a.bbox, b.bbox);
            assert_eq!(a.score, b.score);
        }
    }
}

#[test]
fn decoding_is_deterministic() {
    let anchors = AnchorSet::from_rows(&[[8.0, 8.0, 24.0, 24.0]]).unwrap();
    let detector = Detector::new(DetectorConfig::default(), anchors).unwrap();
    let data = random_tensor(&mut StdRng::seed_from_u64(9), 15, 20, 1);
    assert_eq!(detector.detect(&data).unwrap(), detector.detect(&data).unwrap());
}

#[test]
fn batch_matches_per_frame_detection() {
    let anchors = AnchorSet::from_rows(&[[8.0, 8.0, 24.0, 24.0], [8.0, 8.0, 48.0, 32.0]]).unwrap();
    let detector = Detector::new(DetectorConfig::default(), anchors).unwrap();
    let mut rng = StdRng::seed_from_u64(5);
    let frames: Vec<Vec<f32>> = (0..4).map(|_| random_tensor(&mut rng, 15, 20, 2)).collect();
    let refs: Vec<&[f32]> = frames.iter().map(Vec::as_slice).collect();

    let batch = detector.detect_batch(&refs).unwrap();
    assert_eq!(batch.len(), frames.len());
    for (frame, boxes) in frames.iter().zip(batch.iter()) {
        assert_eq!(boxes, &detector.detect(frame).unwrap());
    }
}
