//! Asynchronous reconstruction hand-off.
//!
//! # Responsibility
//! - Describe one pending point store read (`ReconstructionTicket`).
//! - Carry its result back to the frame loop tagged with the session epoch.
//!
//! # Invariants
//! - A result is merged only while its epoch is still the session's epoch.
//! - Fetching never touches session state; it can run on any thread.

use crate::model::marker::Marker;
use crate::repo::marker_repo::{MarkerQuery, PointStore, RepoResult};
use log::{info, warn};
use std::fmt::{Display, Formatter};
use std::time::Instant;

/// Generation token for one AR session lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionEpoch(u64);

impl SessionEpoch {
    pub fn value(self) -> u64 {
        self.0
    }

    pub fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

impl Display for SessionEpoch {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Point store read requested by the session, executed by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconstructionTicket {
    pub epoch: SessionEpoch,
    pub reference_code: String,
}

impl ReconstructionTicket {
    /// Reads every marker of the ticket's reference code.
    ///
    /// Name filtering is applied client-side after the merge, so the query
    /// never narrows by name.
    pub fn fetch(&self, store: &dyn PointStore) -> ReconstructionResult {
        let started_at = Instant::now();
        let markers = store.query(&MarkerQuery::for_reference(self.reference_code.as_str()));
        match &markers {
            Ok(found) => info!(
                "event=reconstruction_fetch module=session status=ok epoch={} reference_code={} count={} duration_ms={}",
                self.epoch,
                self.reference_code,
                found.len(),
                started_at.elapsed().as_millis()
            ),
            Err(err) => warn!(
                "event=reconstruction_fetch module=session status=error epoch={} reference_code={} error={}",
                self.epoch, self.reference_code, err
            ),
        }
        ReconstructionResult {
            epoch: self.epoch,
            reference_code: self.reference_code.clone(),
            markers,
        }
    }
}

/// Outcome of one ticket, sent back to the frame loop.
#[derive(Debug)]
pub struct ReconstructionResult {
    pub epoch: SessionEpoch,
    pub reference_code: String,
    pub markers: RepoResult<Vec<Marker>>,
}

#[cfg(test)]
mod tests {
    use super::SessionEpoch;

    #[test]
    fn epochs_advance_monotonically() {
        let first = SessionEpoch::default();
        let second = first.next();
        assert!(second > first);
        assert_eq!(second.value(), 1);
        assert_eq!(second.to_string(), "1");
    }
}
