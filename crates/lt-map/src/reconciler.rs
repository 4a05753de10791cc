//! Marker set reconciliation

use std::sync::Arc;

use ahash::{AHashMap, AHashSet};
use tracing::{debug, warn};

use lt_data::LocationSample;

use crate::surface::{GeoBounds, MapSurface, OverlayId};

/// Padding applied when re-fitting the viewport, pixels.
pub const FIT_PADDING_PX: u32 = 50;

/// Radius substituted when a sample's accuracy is unknown, meters.
pub const UNKNOWN_ACCURACY_RADIUS_M: f64 = 5_000.0;

const CIRCLE_FILL: &str = "#AA0000";

/// Spatial identity of a rendered overlay pair.
///
/// Derived from the coordinate bit patterns: samples at identical
/// coordinates collapse to one overlay regardless of their time ranges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MarkerKey {
    lat_bits: u64,
    lon_bits: u64,
}

impl MarkerKey {
    pub fn for_sample(sample: &LocationSample) -> Self {
        Self {
            lat_bits: sample.lat.to_bits(),
            lon_bits: sample.lon.to_bits(),
        }
    }
}

struct MarkerPair {
    marker: OverlayId,
    circle: OverlayId,
    lat: f64,
    lon: f64,
    radius_m: f64,
}

/// Keeps the rendered overlay set consistent with a changing sample set.
///
/// Owns the rendered set exclusively; overlays are created and destroyed
/// only inside `reconcile`, and all of them are torn down on drop.
pub struct MarkerReconciler {
    surface: Option<Arc<dyn MapSurface>>,
    rendered: AHashMap<MarkerKey, MarkerPair>,
}

impl MarkerReconciler {
    pub fn new() -> Self {
        Self {
            surface: None,
            rendered: AHashMap::new(),
        }
    }

    /// Attach the drawing surface; until then `reconcile` is a no-op.
    pub fn attach_surface(&mut self, surface: Arc<dyn MapSurface>) {
        self.surface = Some(surface);
    }

    pub fn is_attached(&self) -> bool {
        self.surface.is_some()
    }

    /// Number of overlay pairs currently rendered.
    pub fn rendered_count(&self) -> usize {
        self.rendered.len()
    }

    pub fn contains(&self, key: &MarkerKey) -> bool {
        self.rendered.contains_key(key)
    }

    /// Incrementally update the overlay set to match `desired`.
    ///
    /// Overlays for samples still desired survive untouched, so an
    /// unchanged set causes zero creations or destructions; new samples
    /// get a marker plus an accuracy circle bound to it; leftovers are
    /// destroyed. Runs in O(|desired| + |rendered|).
    pub fn reconcile(&mut self, desired: &[LocationSample]) {
        let surface = match &self.surface {
            Some(surface) => Arc::clone(surface),
            None => return,
        };

        debug!(
            desired = desired.len(),
            rendered = self.rendered.len(),
            "reconciling markers"
        );

        let mut to_delete: AHashSet<MarkerKey> = self.rendered.keys().copied().collect();

        for sample in desired {
            let key = MarkerKey::for_sample(sample);
            if self.rendered.contains_key(&key) {
                to_delete.remove(&key);
                continue;
            }

            let radius_m = if sample.accuracy == 0.0 {
                UNKNOWN_ACCURACY_RADIUS_M
            } else {
                sample.accuracy
            };
            let marker = surface.add_marker(sample.lat, sample.lon);
            let circle = surface.add_circle(radius_m, CIRCLE_FILL);
            surface.bind_center(circle, marker);
            self.rendered.insert(
                key,
                MarkerPair {
                    marker,
                    circle,
                    lat: sample.lat,
                    lon: sample.lon,
                    radius_m,
                },
            );
        }

        for key in to_delete {
            if let Some(pair) = self.rendered.remove(&key) {
                surface.remove_overlay(pair.marker);
                surface.remove_overlay(pair.circle);
            }
        }

        self.fit_viewport(&surface);
    }

    /// Re-fit the viewport around every accuracy circle.
    ///
    /// Fault-isolated: a degenerate box or a surface failure is logged
    /// and never disturbs the marker bookkeeping.
    fn fit_viewport(&self, surface: &Arc<dyn MapSurface>) {
        if self.rendered.is_empty() {
            return;
        }

        let mut bounds: Option<GeoBounds> = None;
        for pair in self.rendered.values() {
            let circle = GeoBounds::around_circle(pair.lat, pair.lon, pair.radius_m);
            bounds = Some(match bounds {
                Some(union) => union.union(&circle),
                None => circle,
            });
        }

        match bounds {
            Some(bounds) if bounds.is_valid() => {
                if let Err(err) = surface.fit_bounds(bounds, FIT_PADDING_PX) {
                    warn!("error centering map: {err}");
                }
            }
            _ => warn!("skipping viewport fit: degenerate bounds"),
        }
    }
}

impl Default for MarkerReconciler {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for MarkerReconciler {
    fn drop(&mut self) {
        if let Some(surface) = self.surface.take() {
            for pair in self.rendered.values() {
                surface.remove_overlay(pair.marker);
                surface.remove_overlay(pair.circle);
            }
        }
    }
}
