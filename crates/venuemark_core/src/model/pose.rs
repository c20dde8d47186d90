//! Session-local poses and persistent relative offsets.
//!
//! # Responsibility
//! - Describe device poses as reported by the AR tracker.
//! - Describe the persisted displacement from a reference location.
//!
//! # Invariants
//! - `TrackingPose` values are meaningful only inside the tracking session
//!   that produced them.
//! - `RelativeOffset` components are finite when persisted.

use nalgebra::{UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

/// Device pose in the current tracking session's local space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackingPose {
    /// Position in meters, session-local.
    pub position: Vector3<f64>,
    /// Optional device orientation. Not used by offset math.
    pub orientation: Option<UnitQuaternion<f64>>,
}

impl TrackingPose {
    /// Creates a position-only pose.
    pub fn at(x: f64, y: f64, z: f64) -> Self {
        Self {
            position: Vector3::new(x, y, z),
            orientation: None,
        }
    }

    pub fn with_orientation(mut self, orientation: UnitQuaternion<f64>) -> Self {
        self.orientation = Some(orientation);
        self
    }
}

impl From<Vector3<f64>> for TrackingPose {
    fn from(position: Vector3<f64>) -> Self {
        Self {
            position,
            orientation: None,
        }
    }
}

/// Session-independent displacement from the reference location.
///
/// Stored verbatim as `pos_x`, `pos_y`, `pos_z` by the point store.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RelativeOffset {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl RelativeOffset {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn from_vector(value: &Vector3<f64>) -> Self {
        Self::new(value.x, value.y, value.z)
    }

    pub fn to_vector(self) -> Vector3<f64> {
        Vector3::new(self.x, self.y, self.z)
    }

    /// Returns whether every component is a finite number.
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}
