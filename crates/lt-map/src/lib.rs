//! Map-facing components of the location tracking platform
//!
//! Consumes the data layer's fetch results and keeps a set of map
//! overlays consistent with them.

pub mod reconciler;
pub mod session;
pub mod surface;

// Re-export commonly used types
pub use reconciler::{MarkerKey, MarkerReconciler, FIT_PADDING_PX, UNKNOWN_ACCURACY_RADIUS_M};
pub use session::{SessionPhase, TrackerSession};
pub use surface::{GeoBounds, MapSurface, OverlayId};
