//! Reference frame manager.
//!
//! # Responsibility
//! - Accept scanned fiducial codes as the active reference event.
//! - Capture and hold the session origin for that reference.
//!
//! # Invariants
//! - At most one `SessionOrigin` is active, and it always belongs to the
//!   active reference code.
//! - Origins are never persisted; `clear()` drops them on session end.

use crate::model::marker::ReferenceEvent;
use crate::model::pose::TrackingPose;
use log::{info, warn};
use nalgebra::{UnitQuaternion, Vector3};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Calibration and coordinate errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// No fiducial has been scanned in this session.
    NotCalibrated,
    /// A coordinate operation ran without an established origin.
    NoOrigin,
    /// Scanned code is too short to identify a reference location.
    InvalidReferenceCode(String),
    /// Origin requested for a code other than the calibrated one.
    ReferenceMismatch { expected: String, actual: String },
}

impl Display for FrameError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotCalibrated => write!(f, "no reference code has been scanned"),
            Self::NoOrigin => write!(f, "no session origin established"),
            Self::InvalidReferenceCode(code) => write!(f, "invalid reference code: `{code}`"),
            Self::ReferenceMismatch { expected, actual } => write!(
                f,
                "reference code mismatch: calibrated `{expected}`, got `{actual}`"
            ),
        }
    }
}

impl Error for FrameError {}

/// Tracking-local pose at which the fiducial was observed.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionOrigin {
    pub reference_code: String,
    pub position: Vector3<f64>,
    pub orientation: Option<UnitQuaternion<f64>>,
}

/// Holds the active reference event and its session origin.
#[derive(Debug)]
pub struct ReferenceFrameManager {
    min_code_len: usize,
    reference: Option<ReferenceEvent>,
    origin: Option<SessionOrigin>,
}

impl ReferenceFrameManager {
    pub fn new(min_code_len: usize) -> Self {
        Self {
            min_code_len,
            reference: None,
            origin: None,
        }
    }

    /// Accepts a scanned code as the active reference.
    ///
    /// A new calibration always drops the previous origin, even for the same
    /// code, because the physical re-observation defines a new origin.
    ///
    /// # Errors
    /// - `InvalidReferenceCode` when the trimmed code is shorter than the
    ///   configured minimum.
    pub fn calibrate(&mut self, code: &str) -> Result<ReferenceEvent, FrameError> {
        let trimmed = code.trim();
        if trimmed.chars().count() < self.min_code_len {
            warn!(
                "event=calibrate module=frame status=rejected code_len={}",
                trimmed.chars().count()
            );
            return Err(FrameError::InvalidReferenceCode(trimmed.to_string()));
        }

        let event = ReferenceEvent::new(trimmed);
        self.origin = None;
        self.reference = Some(event.clone());
        info!(
            "event=calibrate module=frame status=ok reference_code={}",
            event.code
        );
        Ok(event)
    }

    /// Records `pose` as the origin for `reference_code`.
    ///
    /// # Errors
    /// - `NotCalibrated` before any successful `calibrate`.
    /// - `ReferenceMismatch` when `reference_code` is not the calibrated code.
    pub fn establish(
        &mut self,
        reference_code: &str,
        pose: &TrackingPose,
    ) -> Result<SessionOrigin, FrameError> {
        let reference = self.reference.as_ref().ok_or(FrameError::NotCalibrated)?;
        if reference.code != reference_code {
            return Err(FrameError::ReferenceMismatch {
                expected: reference.code.clone(),
                actual: reference_code.to_string(),
            });
        }

        let origin = SessionOrigin {
            reference_code: reference.code.clone(),
            position: pose.position,
            orientation: pose.orientation,
        };
        info!(
            "event=origin_established module=frame status=ok reference_code={} x={:.3} y={:.3} z={:.3}",
            origin.reference_code, origin.position.x, origin.position.y, origin.position.z
        );
        self.origin = Some(origin.clone());
        Ok(origin)
    }

    pub fn current(&self) -> Option<&SessionOrigin> {
        self.origin.as_ref()
    }

    pub fn reference(&self) -> Option<&ReferenceEvent> {
        self.reference.as_ref()
    }

    pub fn is_calibrated(&self) -> bool {
        self.reference.is_some()
    }

    /// Drops the origin; the reference event stays calibrated.
    pub fn clear(&mut self) {
        if self.origin.take().is_some() {
            info!("event=origin_cleared module=frame status=ok");
        }
    }

    /// Drops both origin and reference event.
    pub fn reset(&mut self) {
        self.clear();
        self.reference = None;
    }
}
