//! Coordinate reference system identifier
//!
//! The pipeline never reprojects. A `CRS` is metadata carried from the input
//! DEM to every derived grid so the boundary can write it back out.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque coordinate reference system, identified by EPSG code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CRS {
    epsg: u32,
}

impl CRS {
    pub fn from_epsg(code: u32) -> Self {
        Self { epsg: code }
    }

    pub fn epsg(&self) -> u32 {
        self.epsg
    }

    /// Whether the code falls in the EPSG geographic 2D range (4000-4999).
    ///
    /// Everything else is treated as projected.
    pub fn is_geographic(&self) -> bool {
        (4000..5000).contains(&self.epsg)
    }
}

impl fmt::Display for CRS {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.epsg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crs_epsg() {
        let crs = CRS::from_epsg(4326);
        assert_eq!(crs.epsg(), 4326);
        assert_eq!(crs.to_string(), "EPSG:4326");
    }

    #[test]
    fn test_geographic_range() {
        assert!(CRS::from_epsg(4326).is_geographic());
        assert!(CRS::from_epsg(4674).is_geographic());
        assert!(!CRS::from_epsg(32719).is_geographic());
        assert!(!CRS::from_epsg(3857).is_geographic());
    }
}
