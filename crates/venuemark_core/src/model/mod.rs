//! Domain model for calibrated venue markers.
//!
//! # Responsibility
//! - Define persisted marker records and their calibration anchor.
//! - Define session-local pose types and persistent relative offsets.
//! - Define the reward table consulted by the interaction scheduler.
//!
//! # Invariants
//! - Every marker is identified by a stable `MarkerId`.
//! - Nothing session-local (poses, origins) is part of a persisted record.

pub mod marker;
pub mod pose;
pub mod reward;
