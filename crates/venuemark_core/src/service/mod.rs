//! Session-level services.
//!
//! # Responsibility
//! - Orchestrate frame, scene and point store calls into AR use cases.
//! - Keep hosts (renderer, CLI, bridges) decoupled from storage details.

pub mod reconstruction;
pub mod session_service;
