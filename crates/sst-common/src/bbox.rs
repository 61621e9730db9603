//! Geographic bounding boxes with antimeridian support.

use serde::{Deserialize, Serialize};

use crate::error::{SstError, SstResult};

/// A geographic bounding box in WGS84 degrees.
///
/// `west > east` denotes a box crossing the antimeridian, e.g. the
/// box `west = 170, east = -170` spans 20 degrees of longitude.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl BoundingBox {
    /// Create a new bounding box from its edges.
    pub fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self {
            west,
            south,
            east,
            north,
        }
    }

    /// The whole globe.
    pub fn global() -> Self {
        Self::new(-180.0, -90.0, 180.0, 90.0)
    }

    /// Create a bounding box, rejecting `north < south`.
    pub fn checked(west: f64, south: f64, east: f64, north: f64) -> SstResult<Self> {
        if north < south {
            return Err(SstError::invalid_argument(format!(
                "north < south ({} < {})",
                north, south
            )));
        }
        Ok(Self::new(west, south, east, north))
    }

    /// Parse a region string in "W,N,E,S" order.
    pub fn from_wnes_str(s: &str) -> Result<Self, BboxParseError> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() != 4 {
            return Err(BboxParseError::InvalidFormat(s.to_string()));
        }

        let parse = |part: &str| -> Result<f64, BboxParseError> {
            part.parse()
                .map_err(|_| BboxParseError::InvalidNumber(part.to_string()))
        };

        let west = parse(parts[0])?;
        let north = parse(parts[1])?;
        let east = parse(parts[2])?;
        let south = parse(parts[3])?;

        if north < south {
            return Err(BboxParseError::NorthBelowSouth { north, south });
        }

        Ok(Self::new(west, south, east, north))
    }

    /// True if the box wraps across the +/-180 degree meridian.
    pub fn crosses_antimeridian(&self) -> bool {
        self.west > self.east
    }

    /// Longitudinal extent in degrees, accounting for antimeridian wrap.
    pub fn width(&self) -> f64 {
        if self.crosses_antimeridian() {
            360.0 - (self.west - self.east)
        } else {
            self.east - self.west
        }
    }

    /// Latitudinal extent in degrees.
    pub fn height(&self) -> f64 {
        self.north - self.south
    }

    /// Check if a point is contained within this bbox.
    pub fn contains_point(&self, lon: f64, lat: f64) -> bool {
        if lat < self.south || lat > self.north {
            return false;
        }
        if self.crosses_antimeridian() {
            lon >= self.west || lon <= self.east
        } else {
            lon >= self.west && lon <= self.east
        }
    }
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::global()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BboxParseError {
    #[error("Invalid region box format: {0}. Expected 'W,N,E,S'")]
    InvalidFormat(String),

    #[error("Invalid number in region box: {0}")]
    InvalidNumber(String),

    #[error("N must not be less than S ({north} < {south})")]
    NorthBelowSouth { north: f64, south: f64 },
}
