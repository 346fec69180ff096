//! Test support shared by the settlement-mapper crates.
//!
//! - [`generators`]: synthetic RGB pixel buffers and a small GeoTIFF writer
//! - [`fixtures`]: detection box grids and the neighbor-filter scenario
//! - [`assert_approx_eq!`]: float comparison with an absolute tolerance
//!
//! Pulled in as a dev-dependency: `test-utils = { path = "../test-utils" }`.

pub mod fixtures;
pub mod generators;

pub use fixtures::*;
pub use generators::*;

/// Assert that two numbers differ by at most `tol`.
///
/// Both sides are widened to `f64`, so `f32` scores can be compared against
/// literal expectations.
#[macro_export]
macro_rules! assert_approx_eq {
    ($actual:expr, $expected:expr, $tol:expr) => {{
        let (actual, expected, tol) = ($actual as f64, $expected as f64, $tol as f64);
        assert!(
            (actual - expected).abs() <= tol,
            "{} = {} is not within {} of {}",
            stringify!($actual),
            actual,
            tol,
            expected
        );
    }};
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_within_tolerance() {
        assert_approx_eq!(0.3f32, 0.3, 1e-6);
        assert_approx_eq!(-2.5, -2.5000001, 1e-3);
    }

    #[test]
    #[should_panic(expected = "is not within")]
    fn test_outside_tolerance() {
        assert_approx_eq!(0.68, 0.58, 1e-9);
    }
}
