//! Synoptically correlated uncertainty.
//!
//! Errors of neighbouring observations are correlated on synoptic scales,
//! so `n` samples in a cell carry fewer than `n` independent errors. The
//! effective number of synoptic areas is
//!
//! ```text
//! eta = n / (1 + r * (n - 1)),   r = exp(-0.5 * (dxy / Lxy + dt))
//! ```
//!
//! with an empirical mean spatial separation `dxy` and temporal
//! separation `dt` that depend on the target resolutions.

use sst_common::{SpatialResolution, TemporalResolution};

/// Synoptic decorrelation length in km.
pub const LXY_KM: f64 = 100.0;

// Linear fits of the mean separation (km) against resolution (degrees).
const POLE_SLOPE: f64 = 37.2069;
const POLE_INTERCEPT: f64 = -0.101691;
const EQUATOR_SLOPE: f64 = 57.8881;
const EQUATOR_INTERCEPT: f64 = 0.272744;

/// Scales accumulated synoptic uncertainties of cells on one target grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SynopticUncertaintyProvider {
    spatial_resolution: f64,
    temporal_resolution: TemporalResolution,
}

impl SynopticUncertaintyProvider {
    pub fn new(
        spatial_resolution: SpatialResolution,
        temporal_resolution: TemporalResolution,
    ) -> Self {
        Self::with_degrees(spatial_resolution.degrees(), temporal_resolution)
    }

    /// Same as [`SynopticUncertaintyProvider::new`] for a resolution given
    /// in degrees.
    pub fn with_degrees(spatial_resolution: f64, temporal_resolution: TemporalResolution) -> Self {
        Self {
            spatial_resolution,
            temporal_resolution,
        }
    }

    pub fn spatial_resolution(&self) -> f64 {
        self.spatial_resolution
    }

    pub fn temporal_resolution(&self) -> TemporalResolution {
        self.temporal_resolution
    }

    /// Mean spatial separation (km) of synoptic events in row `y`.
    pub fn dxy(&self, y: usize) -> f64 {
        let resolution = self.spatial_resolution;
        if resolution <= 0.05 {
            return 0.0;
        }
        let d_pole = POLE_SLOPE * resolution + POLE_INTERCEPT;
        let d_equator = EQUATOR_SLOPE * resolution + EQUATOR_INTERCEPT;

        let lat = 90.0 - resolution * (y as f64 + 0.5);
        let f = lat.abs() / 90.0;
        d_pole * f + d_equator * (1.0 - f)
    }

    /// Mean temporal separation (days) of synoptic events.
    pub fn dt(&self) -> f64 {
        let r = self.spatial_resolution;
        match self.temporal_resolution {
            TemporalResolution::Daily => 0.0,
            TemporalResolution::Weekly5d => {
                if r <= 1.5 {
                    2.0
                } else if r <= 2.5 {
                    1.0
                } else {
                    0.0
                }
            }
            TemporalResolution::Weekly7d => {
                if r <= 1.75 {
                    2.0
                } else if r <= 2.5 {
                    1.0
                } else {
                    0.0
                }
            }
            TemporalResolution::Monthly => {
                const STEPS: [(f64, f64); 10] = [
                    (0.5, 10.0),
                    (0.75, 9.0),
                    (0.8, 8.5),
                    (1.0, 6.0),
                    (1.2, 3.5),
                    (1.25, 3.0),
                    (2.0, 0.5),
                    (2.25, 0.25),
                    (2.5, 0.2),
                    (3.0, 0.1),
                ];
                STEPS
                    .iter()
                    .find(|(limit, _)| r <= *limit)
                    .map_or(0.0, |(_, days)| *days)
            }
            // built from monthly steps
            TemporalResolution::Seasonal | TemporalResolution::Annual => 0.0,
        }
    }

    fn r(&self, y: usize) -> f64 {
        (-0.5 * (self.dxy(y) / LXY_KM + self.dt())).exp()
    }

    /// Effective number of independent synoptic areas in row `y`.
    pub fn eta(&self, y: usize, sample_count: usize) -> f64 {
        let n = sample_count as f64;
        n / (1.0 + self.r(y) * (n - 1.0))
    }

    /// Scale an accumulated synoptic uncertainty of a cell in row `y`.
    pub fn calculate(&self, y: usize, sample_count: usize, accumulated: f64) -> f64 {
        if sample_count == 0 {
            return f64::NAN;
        }
        accumulated / self.eta(y, sample_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider(resolution: f64, temporal: TemporalResolution) -> SynopticUncertaintyProvider {
        SynopticUncertaintyProvider::with_degrees(resolution, temporal)
    }

    #[test]
    fn test_dxy_at_5_degrees() {
        let p = provider(5.0, TemporalResolution::Monthly);
        assert!((p.dxy(0) - 188.815598).abs() < 1e-5);
        assert!((p.dxy(9) - 240.705816).abs() < 1e-5);
        assert!((p.dxy(18) - 286.830454).abs() < 1e-5);
        assert!((p.dxy(27) - 234.940236).abs() < 1e-5);
    }

    #[test]
    fn test_dxy_vanishes_at_full_resolution() {
        let p = provider(0.05, TemporalResolution::Daily);
        assert_eq!(p.dxy(100), 0.0);
    }

    #[test]
    fn test_dt_weekly() {
        assert_eq!(provider(1.0, TemporalResolution::Weekly5d).dt(), 2.0);
        assert_eq!(provider(2.0, TemporalResolution::Weekly5d).dt(), 1.0);
        assert_eq!(provider(5.0, TemporalResolution::Weekly5d).dt(), 0.0);
        assert_eq!(provider(1.75, TemporalResolution::Weekly7d).dt(), 2.0);
        assert_eq!(provider(2.5, TemporalResolution::Weekly7d).dt(), 1.0);
        assert_eq!(provider(3.0, TemporalResolution::Weekly7d).dt(), 0.0);
    }

    #[test]
    fn test_dt_monthly_thresholds() {
        let expected = [
            (0.5, 10.0),
            (0.75, 9.0),
            (0.8, 8.5),
            (1.0, 6.0),
            (1.2, 3.5),
            (1.25, 3.0),
            (2.0, 0.5),
            (2.25, 0.25),
            (2.5, 0.2),
            (3.0, 0.1),
            (5.0, 0.0),
        ];
        for (resolution, days) in expected {
            assert_eq!(provider(resolution, TemporalResolution::Monthly).dt(), days);
        }
    }

    #[test]
    fn test_single_sample_is_one_area() {
        let p = provider(5.0, TemporalResolution::Monthly);
        assert!((p.eta(3, 1) - 1.0).abs() < 1e-12);
        assert!((p.calculate(3, 1, 0.4) - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_eta_is_below_sample_count() {
        let p = provider(5.0, TemporalResolution::Monthly);
        let eta = p.eta(18, 100);
        assert!(eta > 1.0 && eta < 100.0);
    }

    #[test]
    fn test_no_samples_is_nan() {
        let p = provider(5.0, TemporalResolution::Daily);
        assert!(p.calculate(0, 0, 1.0).is_nan());
    }
}
