//! Running statistical reducers.
//!
//! Every accumulator silently drops a sample when the sample is NaN or
//! when its weight is NaN or zero. `combine` is read-only and may be
//! called any number of times.

use serde::{Deserialize, Serialize};

use crate::error::{AggregationError, Result};

/// Common read side of all accumulators.
pub trait Accumulator {
    /// Number of samples that were accepted.
    fn sample_count(&self) -> usize;

    /// The accumulated statistic, NaN if nothing was accepted.
    fn combine(&self) -> f64;
}

#[inline]
fn is_admissible(sample: f64, weight: f64) -> bool {
    !sample.is_nan() && !weight.is_nan() && weight != 0.0
}

/// Weighted arithmetic mean: `sum(w * x) / sum(w)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ArithmeticMean {
    sample_count: usize,
    sample_sum: f64,
    weight_sum: f64,
}

impl ArithmeticMean {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn accumulate(&mut self, sample: f64, weight: f64) {
        if is_admissible(sample, weight) {
            self.sample_sum += weight * sample;
            self.weight_sum += weight;
            self.sample_count += 1;
        }
    }
}

impl Accumulator for ArithmeticMean {
    fn sample_count(&self) -> usize {
        self.sample_count
    }

    fn combine(&self) -> f64 {
        if self.sample_count == 0 {
            return f64::NAN;
        }
        if self.sample_sum == 0.0 {
            return 0.0;
        }
        if self.weight_sum == 0.0 {
            return f64::NAN;
        }
        self.sample_sum / self.weight_sum
    }
}

/// Root-sum-square of weighted independent errors:
/// `sqrt(sum((w * x)^2) / sum(w)^2)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WeightedUncertainty {
    sample_count: usize,
    square_sum: f64,
    weight_sum: f64,
}

impl WeightedUncertainty {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn accumulate(&mut self, sample: f64, weight: f64) {
        if is_admissible(sample, weight) {
            let weighted = weight * sample;
            self.square_sum += weighted * weighted;
            self.weight_sum += weight;
            self.sample_count += 1;
        }
    }
}

impl Accumulator for WeightedUncertainty {
    fn sample_count(&self) -> usize {
        self.sample_count
    }

    fn combine(&self) -> f64 {
        if self.sample_count == 0 {
            return f64::NAN;
        }
        if self.square_sum == 0.0 {
            return 0.0;
        }
        if self.weight_sum == 0.0 {
            return f64::NAN;
        }
        (self.square_sum / (self.weight_sum * self.weight_sum)).sqrt()
    }
}

/// Unweighted root-sum-square: `sqrt(sum(x^2))`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PlainUncertainty {
    sample_count: usize,
    square_sum: f64,
}

impl PlainUncertainty {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn accumulate(&mut self, sample: f64) {
        if is_admissible(sample, 1.0) {
            self.square_sum += sample * sample;
            self.sample_count += 1;
        }
    }

    /// Weighted entry point for callers that carry weights around.
    ///
    /// Dropped samples (NaN, zero weight) are accepted as no-ops; any
    /// other weight than 1.0 is rejected.
    pub fn accumulate_weighted(&mut self, sample: f64, weight: f64) -> Result<()> {
        if !is_admissible(sample, weight) {
            return Ok(());
        }
        if weight != 1.0 {
            return Err(AggregationError::IllegalWeight {
                accumulator: "PlainUncertainty",
                weight,
            });
        }
        self.accumulate(sample);
        Ok(())
    }
}

impl Accumulator for PlainUncertainty {
    fn sample_count(&self) -> usize {
        self.sample_count
    }

    fn combine(&self) -> f64 {
        if self.sample_count == 0 {
            return f64::NAN;
        }
        self.square_sum.sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_accumulators_are_nan() {
        assert!(ArithmeticMean::new().combine().is_nan());
        assert!(WeightedUncertainty::new().combine().is_nan());
        assert!(PlainUncertainty::new().combine().is_nan());
    }

    #[test]
    fn test_mean_zero_sum_is_zero() {
        let mut acc = ArithmeticMean::new();
        acc.accumulate(0.0, 1.0);
        acc.accumulate(0.0, 3.0);
        assert_eq!(acc.combine(), 0.0);
    }

    #[test]
    fn test_mean_cancelling_weights_is_nan() {
        let mut acc = ArithmeticMean::new();
        acc.accumulate(2.0, 1.0);
        acc.accumulate(2.0, -1.0);
        assert_eq!(acc.sample_count(), 2);
        // sample sum 2 - 2 == 0 hits the zero branch first
        assert_eq!(acc.combine(), 0.0);

        let mut acc = ArithmeticMean::new();
        acc.accumulate(2.0, 1.0);
        acc.accumulate(4.0, -1.0);
        assert!(acc.combine().is_nan());
    }

    #[test]
    fn test_weighted_mean() {
        let mut acc = ArithmeticMean::new();
        acc.accumulate(1.0, 3.0);
        acc.accumulate(5.0, 1.0);
        assert!((acc.combine() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_weighted_uncertainty_cancelling_weights_is_nan() {
        let mut acc = WeightedUncertainty::new();
        acc.accumulate(1.0, 1.0);
        acc.accumulate(1.0, -1.0);
        assert!(acc.combine().is_nan());
    }

    #[test]
    fn test_combine_is_repeatable() {
        let mut acc = WeightedUncertainty::new();
        acc.accumulate(0.3, 0.5);
        acc.accumulate(0.4, 0.5);
        let first = acc.combine();
        assert_eq!(first, acc.combine());
        assert_eq!(acc.sample_count(), 2);
    }

    #[test]
    fn test_plain_accepts_unit_weight() {
        let mut acc = PlainUncertainty::new();
        acc.accumulate_weighted(3.0, 1.0).unwrap();
        acc.accumulate_weighted(4.0, 1.0).unwrap();
        assert!((acc.combine() - 5.0).abs() < 1e-12);
    }
}
