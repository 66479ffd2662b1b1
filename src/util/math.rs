//! Scalar activation helpers.

/// Logistic sigmoid.
#[inline]
pub(crate) fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Inverse of [`sigmoid`], defined for `p` in the open interval (0, 1).
///
/// Returns negative infinity at `p == 0` so every finite logit passes a
/// strict `>` comparison against it.
#[cfg_attr(not(feature = "simd"), allow(dead_code))]
#[inline]
pub(crate) fn logit(p: f32) -> f32 {
    if p <= 0.0 {
        return f32::NEG_INFINITY;
    }
    (p / (1.0 - p)).ln()
}

#[cfg(test)]
mod tests {
    use super::{logit, sigmoid};

    #[test]
    fn sigmoid_is_half_at_zero() {
        assert!((sigmoid(0.0) - 0.5).abs() < 1e-7);
        assert!(sigmoid(20.0) > 0.999_99);
        assert!(sigmoid(-20.0) < 1e-5);
    }

    #[test]
    fn logit_inverts_sigmoid() {
        for &x in &[-4.0f32, -1.0, 0.0, 0.5, 3.0, 5.0] {
            assert!((logit(sigmoid(x)) - x).abs() < 1e-3, "x={x}");
        }
    }

    #[test]
    fn logit_of_zero_is_negative_infinity() {
        assert_eq!(logit(0.0), f32::NEG_INFINITY);
    }
}
