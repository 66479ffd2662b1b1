use gridbox::geometry::{intersection, iou, union, BBox};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn random_box(rng: &mut StdRng) -> BBox {
    BBox::new(
        rng.random_range(0.0f32..320.0),
        rng.random_range(0.0f32..240.0),
        rng.random_range(1.0f32..80.0),
        rng.random_range(1.0f32..80.0),
    )
}

#[test]
fn iou_is_symmetric() {
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..2000 {
        let a = random_box(&mut rng);
        let b = random_box(&mut rng);
        assert_eq!(iou(&a, &b), iou(&b, &a));
    }
}

#[test]
fn iou_is_bounded_and_self_iou_is_one() {
    let mut rng = StdRng::seed_from_u64(11);
    for _ in 0..2000 {
        let a = random_box(&mut rng);
        let b = random_box(&mut rng);
        let v = iou(&a, &b);
        assert!((0.0..=1.0 + 1e-4).contains(&v), "iou={v}");
        assert!((iou(&a, &a) - 1.0).abs() < 1e-3);
    }
}

#[test]
fn union_never_smaller_than_either_area() {
    let mut rng = StdRng::seed_from_u64(13);
    for _ in 0..2000 {
        let a = random_box(&mut rng);
        let b = random_box(&mut rng);
        let u = union(&a, &b);
        let i = intersection(&a, &b);
        assert!(i >= 0.0);
        assert!(u + 1e-2 >= a.area().max(b.area()));
    }
}

#[test]
fn disjoint_boxes_have_zero_iou() {
    let a = BBox::new(10.0, 10.0, 8.0, 8.0);
    let b = BBox::new(100.0, 10.0, 8.0, 8.0);
    let c = BBox::new(10.0, 100.0, 8.0, 8.0);
    assert_eq!(iou(&a, &b), 0.0);
    assert_eq!(iou(&a, &c), 0.0);
}

#[test]
fn touching_boxes_have_zero_iou() {
    let a = BBox::new(8.0, 8.0, 16.0, 16.0);
    let b = BBox::new(24.0, 8.0, 16.0, 16.0);
    assert_eq!(iou(&a, &b), 0.0);
}

#[test]
fn zero_size_boxes_never_divide_by_zero() {
    let a = BBox::new(5.0, 5.0, 0.0, 0.0);
    let b = BBox::new(5.0, 5.0, 0.0, 4.0);
    assert_eq!(iou(&a, &a), 0.0);
    assert_eq!(iou(&a, &b), 0.0);
    assert!(!iou(&b, &b).is_nan());
}
