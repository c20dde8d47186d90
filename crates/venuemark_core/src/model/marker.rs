//! Marker domain model.
//!
//! # Responsibility
//! - Define the persisted point-of-interest record and its calibration anchor.
//! - Validate marker shape before it crosses the persistence boundary.
//!
//! # Invariants
//! - `id` is stable and never reused for another marker.
//! - A marker is never mutated after creation.
//! - `relative_offset` is meaningful only against an origin established for
//!   the same `reference_code`.

use crate::model::pose::RelativeOffset;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Stable identifier for every persisted marker.
pub type MarkerId = Uuid;

/// Shortest reference code accepted from the fiducial scanner.
pub const MIN_REFERENCE_CODE_LEN: usize = 4;

/// One successful fiducial calibration.
///
/// Immutable; a recalibration creates a new event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceEvent {
    /// Opaque code scanned from the fiducial.
    pub code: String,
    /// Unix epoch milliseconds.
    pub established_at: i64,
}

impl ReferenceEvent {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            established_at: now_epoch_ms(),
        }
    }
}

/// Persisted point of interest anchored to a reference code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    pub id: MarkerId,
    /// Optional human label, also used by the visibility filter.
    pub name: Option<String>,
    pub reference_code: String,
    pub relative_offset: RelativeOffset,
    pub created_by: String,
    /// Unix epoch milliseconds.
    pub created_at: i64,
}

impl Marker {
    /// Creates a marker with a generated stable ID and the current timestamp.
    pub fn new(
        reference_code: impl Into<String>,
        relative_offset: RelativeOffset,
        created_by: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: None,
            reference_code: reference_code.into(),
            relative_offset,
            created_by: created_by.into(),
            created_at: now_epoch_ms(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Checks the marker shape required by persistence and reconstruction.
    ///
    /// # Errors
    /// - `ReferenceCodeTooShort` when the trimmed code is under 4 chars.
    /// - `NonFiniteOffset` when any offset component is NaN or infinite.
    /// - `BlankName` when a name is present but empty after trimming.
    /// - `BlankCreator` when `created_by` is empty after trimming.
    pub fn validate(&self) -> Result<(), MarkerValidationError> {
        if self.reference_code.trim().chars().count() < MIN_REFERENCE_CODE_LEN {
            return Err(MarkerValidationError::ReferenceCodeTooShort(
                self.reference_code.clone(),
            ));
        }
        if !self.relative_offset.is_finite() {
            return Err(MarkerValidationError::NonFiniteOffset);
        }
        if matches!(self.name.as_deref(), Some(name) if name.trim().is_empty()) {
            return Err(MarkerValidationError::BlankName);
        }
        if self.created_by.trim().is_empty() {
            return Err(MarkerValidationError::BlankCreator);
        }
        Ok(())
    }
}

/// Marker shape violations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkerValidationError {
    ReferenceCodeTooShort(String),
    NonFiniteOffset,
    BlankName,
    BlankCreator,
}

impl Display for MarkerValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ReferenceCodeTooShort(code) => write!(
                f,
                "reference code `{code}` is shorter than {MIN_REFERENCE_CODE_LEN} characters"
            ),
            Self::NonFiniteOffset => write!(f, "relative offset must be finite"),
            Self::BlankName => write!(f, "marker name cannot be blank"),
            Self::BlankCreator => write!(f, "marker creator cannot be blank"),
        }
    }
}

impl Error for MarkerValidationError {}

/// Current wall-clock time in Unix epoch milliseconds.
pub fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_millis() as i64)
}

#[cfg(test)]
mod tests {
    use super::{Marker, MarkerValidationError};
    use crate::model::pose::RelativeOffset;

    #[test]
    fn new_marker_is_valid() {
        let marker = Marker::new("EVENT_A", RelativeOffset::new(1.0, 0.0, 2.0), "author");
        assert!(marker.validate().is_ok());
        assert!(marker.name.is_none());
        assert!(marker.created_at > 0);
    }

    #[test]
    fn short_reference_code_is_rejected() {
        let marker = Marker::new("abc", RelativeOffset::default(), "author");
        assert_eq!(
            marker.validate(),
            Err(MarkerValidationError::ReferenceCodeTooShort("abc".to_string()))
        );
    }

    #[test]
    fn non_finite_offset_is_rejected() {
        let marker = Marker::new("EVENT_A", RelativeOffset::new(f64::NAN, 0.0, 0.0), "author");
        assert_eq!(marker.validate(), Err(MarkerValidationError::NonFiniteOffset));
    }

    #[test]
    fn blank_name_and_creator_are_rejected() {
        let named = Marker::new("EVENT_A", RelativeOffset::default(), "author").with_name("  ");
        assert_eq!(named.validate(), Err(MarkerValidationError::BlankName));

        let anonymous = Marker::new("EVENT_A", RelativeOffset::default(), " ");
        assert_eq!(anonymous.validate(), Err(MarkerValidationError::BlankCreator));
    }
}
