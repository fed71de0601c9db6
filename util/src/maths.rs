//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::{Float, FloatConst};

/// Calculates the least nonnegative remainder of `lhs (mod rhs)`.
/// 
/// This function is taken from the std library as num is missing it.
///
/// In particular, the return value `r` satisfies `0.0 <= r < rhs.abs()` in
/// most cases. However, due to a floating point round-off error it can
/// result in `r == rhs.abs()` if `lhs` is much smaller than `rhs.abs()` in
/// magnitude and `lhs < 0.0`.
pub fn rem_euclid<T>(lhs: T, rhs: T) -> T
where
    T: Float
{
    let r = lhs % rhs;
    if r < T::zero() { r + rhs.abs() } else { r }
}

/// Wrap an angle into the range [-pi, pi).
pub fn wrap_pi<T>(angle: T) -> T
where
    T: Float + FloatConst
{
    rem_euclid(angle + T::PI(), T::PI() + T::PI()) - T::PI()
}

/// Get the signed shortest angular distance from `from` to `to`, in the range [-pi, pi).
pub fn ang_dist<T>(from: T, to: T) -> T
where
    T: Float + FloatConst
{
    wrap_pi(to - from)
}

#[cfg(test)]
mod test {
    use super::*;

    const PI: f64 = std::f64::consts::PI;

    #[test]
    fn test_wrap_pi() {
        assert!((wrap_pi(0f64)).abs() < 1e-12);
        assert!((wrap_pi(3.0 * PI) - (-PI)).abs() < 1e-12);
        assert!((wrap_pi(-PI / 2.0) - (-PI / 2.0)).abs() < 1e-12);
        assert!((wrap_pi(2.0 * PI + 0.5) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_ang_dist() {
        assert!((ang_dist(0.1f64, -0.1f64) - (-0.2)).abs() < 1e-12);
        assert!((ang_dist(PI - 0.1, -PI + 0.1) - 0.2).abs() < 1e-12);
    }
}
