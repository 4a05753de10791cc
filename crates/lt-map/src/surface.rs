//! Map surface collaborator seam
//!
//! The drawing surface is injected per component instance; the engine
//! never reaches for a global map handle.

use anyhow::Result;

/// Opaque handle of an overlay created on a map surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OverlayId(pub u64);

const METERS_PER_DEGREE_LAT: f64 = 111_320.0;

/// Latitude/longitude axis-aligned bounding box, degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoBounds {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl GeoBounds {
    /// Bounding box of a circle drawn around a point, radius in meters.
    pub fn around_circle(lat: f64, lon: f64, radius_m: f64) -> Self {
        let dlat = radius_m / METERS_PER_DEGREE_LAT;
        let dlon = radius_m / (METERS_PER_DEGREE_LAT * lat.to_radians().cos());
        Self {
            south: lat - dlat,
            west: lon - dlon,
            north: lat + dlat,
            east: lon + dlon,
        }
    }

    /// Smallest box containing both boxes.
    pub fn union(&self, other: &GeoBounds) -> GeoBounds {
        GeoBounds {
            south: self.south.min(other.south),
            west: self.west.min(other.west),
            north: self.north.max(other.north),
            east: self.east.max(other.east),
        }
    }

    /// Whether the box is usable for a viewport fit.
    pub fn is_valid(&self) -> bool {
        self.south.is_finite()
            && self.west.is_finite()
            && self.north.is_finite()
            && self.east.is_finite()
            && self.south <= self.north
            && self.west <= self.east
    }
}

/// Drawing operations consumed from the external mapping collaborator.
pub trait MapSurface: Send + Sync {
    /// Create a point overlay at a position.
    fn add_marker(&self, lat: f64, lon: f64) -> OverlayId;

    /// Create a circle overlay with a radius in meters and a fill color.
    fn add_circle(&self, radius_m: f64, fill_color: &str) -> OverlayId;

    /// Keep a circle's center bound to a marker's position.
    fn bind_center(&self, circle: OverlayId, marker: OverlayId);

    /// Destroy an overlay.
    fn remove_overlay(&self, id: OverlayId);

    /// Re-fit the viewport to the given bounds with pixel padding.
    fn fit_bounds(&self, bounds: GeoBounds, padding_px: u32) -> Result<()>;
}
