//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

/// Wrap an angle in radians into the range [-pi, pi).
pub fn wrap_pi<T>(value: T) -> T
where
    T: Float
{
    let pi_t: T = T::from(std::f64::consts::PI).unwrap_or_else(T::nan);
    let tau_t: T = T::from(std::f64::consts::TAU).unwrap_or_else(T::nan);

    rem_euclid(value + pi_t, tau_t) - pi_t
}

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

/// Returns true if every value in the slice is finite (not NaN or infinite).
pub fn all_finite<T>(values: &[T]) -> bool
where
    T: Float
{
    values.iter().all(|v| v.is_finite())
}
