//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

/// Clamp a value into `[min, max]`.
///
/// Unlike `f64::clamp` a `NaN` input is mapped to `min`, so that the result can always be fed to
/// an inverse trigonometric function.
pub fn clamp<T>(value: T, min: T, max: T) -> T
where
    T: Float,
{
    if value.is_nan() {
        return min;
    }

    let mut ret = value;

    if ret > max {
        ret = max
    }
    if ret < min {
        ret = min
    }

    ret
}

/// Round a value to the given number of decimal places.
pub fn round_dp<T>(value: T, decimal_places: i32) -> T
where
    T: Float,
{
    let scale = T::from(10.0).unwrap_or_else(T::one).powi(decimal_places);

    (value * scale).round() / scale
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_clamp() {
        assert_eq!(clamp(1.5f64, -1.0, 1.0), 1.0);
        assert_eq!(clamp(-1.0000001f64, -1.0, 1.0), -1.0);
        assert_eq!(clamp(0.25f64, -1.0, 1.0), 0.25);
        assert_eq!(clamp(std::f64::NAN, -1.0, 1.0), -1.0);
    }

    #[test]
    fn test_round_dp() {
        assert_eq!(round_dp(12.345f64, 1), 12.3);
        assert_eq!(round_dp(-0.96f64, 1), -1.0);
        assert_eq!(round_dp(90.0f64, 1), 90.0);
    }
}
