//! Absolute pose <-> relative offset conversion.
//!
//! Pure functions; the only state involved is the origin passed in.
//! `decode(encode(p, o), o) == p` up to floating-point rounding. Two sessions
//! agree on a physical point only as far as their origins mark the same
//! real-world spot.

use crate::frame::reference::{FrameError, SessionOrigin};
use crate::model::pose::RelativeOffset;
use nalgebra::Vector3;

/// Displacement of `absolute` from the origin.
pub fn encode(absolute: &Vector3<f64>, origin: &SessionOrigin) -> RelativeOffset {
    RelativeOffset::from_vector(&(absolute - origin.position))
}

/// Session-local position of `offset` under the origin.
pub fn decode(offset: RelativeOffset, origin: &SessionOrigin) -> Vector3<f64> {
    origin.position + offset.to_vector()
}

pub fn try_encode(
    absolute: &Vector3<f64>,
    origin: Option<&SessionOrigin>,
) -> Result<RelativeOffset, FrameError> {
    origin
        .map(|origin| encode(absolute, origin))
        .ok_or(FrameError::NoOrigin)
}

pub fn try_decode(
    offset: RelativeOffset,
    origin: Option<&SessionOrigin>,
) -> Result<Vector3<f64>, FrameError> {
    origin
        .map(|origin| decode(offset, origin))
        .ok_or(FrameError::NoOrigin)
}
