//! Shared-anchor AR engine for venue markers.
//!
//! Markers are stored as offsets from a physical reference code and
//! re-materialized in every later session that scans the same code.

pub mod config;
pub mod db;
pub mod frame;
pub mod logging;
pub mod model;
pub mod repo;
pub mod scene;
pub mod service;

pub use config::{ConfigError, EngineConfig};
pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use frame::reference::{FrameError, ReferenceFrameManager, SessionOrigin};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::marker::{Marker, MarkerId, MarkerValidationError, ReferenceEvent};
pub use model::pose::{RelativeOffset, TrackingPose};
pub use model::reward::{CatalogError, DrawMode, RarityTier, Reward, RewardCatalog};
pub use repo::marker_repo::{
    MarkerQuery, PointStore, RepoError, RepoResult, SqlitePointStore, StoreStats,
};
pub use scene::animation::Easing;
pub use scene::interaction::{IgnoreReason, RewardTriggered, SelectOutcome};
pub use scene::registry::{InstanceKey, MarkerInstance, MarkerRegistry};
pub use service::reconstruction::{ReconstructionResult, ReconstructionTicket, SessionEpoch};
pub use service::session_service::{
    ArSession, FlushReport, FrameInput, FrameReport, Hsl, InstanceVisual, SessionError,
    SessionRole,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
