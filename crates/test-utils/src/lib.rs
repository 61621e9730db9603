//! Shared test utilities for the SST aggregation workspace.
//!
//! This crate provides common testing infrastructure including:
//! - Synthetic grid generators
//! - Region mask fixtures
//! - A tracing initializer for integration tests
//!
//! # Usage
//!
//! Add to your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { path = "../test-utils" }
//! ```
//!
//! Then import in your tests:
//!
//! ```ignore
//! use test_utils::{scalar_grid, fixtures, init_tracing};
//! ```

pub mod fixtures;
pub mod generators;
pub mod logging;

// Re-export commonly used items at the crate root
pub use fixtures::*;
pub use generators::*;
pub use logging::init_tracing;

/// Macro for approximate floating-point equality assertions.
///
/// NaN on both sides counts as equal, so missing values can be asserted
/// the same way as numbers.
///
/// # Usage
///
/// ```ignore
/// use test_utils::assert_approx_eq;
///
/// assert_approx_eq!(1.0001_f64, 1.0_f64, 0.001_f64); // passes
/// assert_approx_eq!(f64::NAN, f64::NAN, 0.001_f64);  // passes
/// ```
#[macro_export]
macro_rules! assert_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let left: f64 = $left as f64;
        let right: f64 = $right as f64;
        let epsilon: f64 = $epsilon as f64;
        if !(left.is_nan() && right.is_nan()) {
            let diff = (left - right).abs();
            if !(diff <= epsilon) {
                panic!(
                    "assertion failed: `(left ≈ right)`\n  left: `{:?}`,\n right: `{:?}`,\n  diff: `{:?}` > epsilon `{:?}`",
                    left, right, diff, epsilon
                );
            }
        }
    }};
}
