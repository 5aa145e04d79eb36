//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

/// Linear interpolation (convex combination) between `a` and `b`.
///
/// `eta = 0` gives `a`, `eta = 1` gives `b`.
pub fn lerp<T>(a: T, b: T, eta: T) -> T
where
    T: Float
{
    (T::one() - eta) * a + eta * b
}

/// Round a value to the given number of decimal places.
pub fn round_dp<T>(value: T, decimal_places: i32) -> T
where
    T: Float
{
    let ten: T = num_traits::cast(10.0).unwrap_or_else(T::nan);
    let scale = ten.powi(decimal_places);
    (value * scale).round() / scale
}
