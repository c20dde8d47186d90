//! Calibration against a scanned fiducial.
//!
//! # Responsibility
//! - Turn a scanned reference code plus the current tracking pose into a
//!   session origin.
//! - Convert between session-local positions and persistent offsets.
//!
//! # Invariants
//! - No coordinate conversion happens without an origin for the active code.

pub mod reference;
pub mod transform;
