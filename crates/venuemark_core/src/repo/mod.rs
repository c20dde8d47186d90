//! Point store abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the marker read/write contract the engine depends on.
//! - Isolate SQLite query details from session orchestration.
//!
//! # Invariants
//! - Store writes enforce `Marker::validate()` before persistence.
//! - Store APIs return semantic errors (`NotFound`) alongside transport errors.

pub mod marker_repo;
