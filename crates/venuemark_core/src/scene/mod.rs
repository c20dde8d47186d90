//! Per-session scene state: materialized markers and their live behavior.
//!
//! # Responsibility
//! - Hold marker instances of the current session (`registry`).
//! - Gate visibility by name (`filter`).
//! - Run spins, click counters and rewards each frame (`animation`,
//!   `interaction`).
//!
//! # Invariants
//! - Nothing in this module is persisted.
//! - All state is single-writer, driven from the frame loop.

pub mod animation;
pub mod filter;
pub mod interaction;
pub mod registry;
