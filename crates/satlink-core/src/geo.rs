//! Geographic primitives shared by the map controller and overlay renderer

use serde::{Deserialize, Serialize};

/// A geographic point in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// Axis-aligned geographic bounding box
///
/// A freshly created box is empty (and therefore invalid) until the first
/// point is added.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl Bounds {
    pub fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self {
            west,
            south,
            east,
            north,
        }
    }

    /// Bounds containing nothing
    pub fn empty() -> Self {
        Self {
            west: f64::INFINITY,
            south: f64::INFINITY,
            east: f64::NEG_INFINITY,
            north: f64::NEG_INFINITY,
        }
    }

    /// Grow the box to include `point`
    pub fn extend(&mut self, point: LatLng) {
        self.west = self.west.min(point.lng);
        self.east = self.east.max(point.lng);
        self.south = self.south.min(point.lat);
        self.north = self.north.max(point.lat);
    }

    /// Grow the box to include another box
    pub fn union(&mut self, other: &Bounds) {
        if !other.is_valid() {
            return;
        }
        self.extend(other.south_west());
        self.extend(other.north_east());
    }

    /// True once at least one finite point has been added
    pub fn is_valid(&self) -> bool {
        self.west.is_finite()
            && self.south.is_finite()
            && self.east.is_finite()
            && self.north.is_finite()
            && self.west <= self.east
            && self.south <= self.north
    }

    pub fn south_west(&self) -> LatLng {
        LatLng::new(self.south, self.west)
    }

    pub fn north_east(&self) -> LatLng {
        LatLng::new(self.north, self.east)
    }

    pub fn center(&self) -> LatLng {
        LatLng::new(
            (self.south + self.north) / 2.0,
            (self.west + self.east) / 2.0,
        )
    }

    pub fn contains(&self, point: LatLng) -> bool {
        self.is_valid()
            && point.lng >= self.west
            && point.lng <= self.east
            && point.lat >= self.south
            && point.lat <= self.north
    }
}

impl Default for Bounds {
    fn default() -> Self {
        Self::empty()
    }
}

/// The currently visible map region
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub center: LatLng,
    pub zoom: f64,
    pub bounds: Bounds,
}

impl Viewport {
    /// Latitude and longitude formatted for the HUD (fixed 4 decimals)
    pub fn center_readout(&self) -> (String, String) {
        (
            format!("{:.4}", self.center.lat),
            format!("{:.4}", self.center.lng),
        )
    }

    /// Zoom level formatted for the HUD
    pub fn zoom_readout(&self) -> String {
        if self.zoom.fract() == 0.0 {
            format!("{}", self.zoom as i64)
        } else {
            format!("{:.1}", self.zoom)
        }
    }
}
