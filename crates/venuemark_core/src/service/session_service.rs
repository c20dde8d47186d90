//! AR session use-case service.
//!
//! # Responsibility
//! - Own every piece of per-session state: reference frame, registry,
//!   filter, scheduler, epoch, reconstruction inbox, insert outbox.
//! - Expose the author/viewer use cases and the per-frame `tick`.
//!
//! # Invariants
//! - All instances of the session are decoded against the current origin.
//! - `end_session` clears origin, instances, animations, counters and
//!   pending rewards synchronously, and bumps the epoch.
//! - Reconstruction results with an outdated epoch are never merged.
//! - Markers deleted in this session are never re-materialized.
//! - A failed insert keeps the local instance and stays queued.

use crate::config::EngineConfig;
use crate::frame::reference::{FrameError, ReferenceFrameManager, SessionOrigin};
use crate::frame::transform::{decode, encode};
use crate::model::marker::{Marker, MarkerId, MarkerValidationError, ReferenceEvent};
use crate::model::pose::TrackingPose;
use crate::model::reward::RewardCatalog;
use crate::repo::marker_repo::{PointStore, RepoError};
use crate::scene::filter::VisibilityFilter;
use crate::scene::interaction::{InteractionScheduler, RewardTriggered, SelectOutcome};
use crate::scene::registry::{InstanceKey, MarkerInstance, MarkerRegistry};
use crate::service::reconstruction::{ReconstructionResult, ReconstructionTicket, SessionEpoch};
use log::{debug, info, warn};
use nalgebra::Vector3;
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};

/// Who drives the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionRole {
    /// Places new markers.
    Author,
    /// Browses, filters and selects existing markers.
    Viewer,
}

impl SessionRole {
    /// Per-marker colour; authors see muted tones, viewers brighter ones.
    pub fn palette(self, index: usize) -> Hsl {
        let hue = (index as f64 * 0.1) % 1.0;
        match self {
            Self::Author => Hsl {
                hue,
                saturation: 0.5,
                lightness: 0.4,
            },
            Self::Viewer => Hsl {
                hue,
                saturation: 0.7,
                lightness: 0.6,
            },
        }
    }
}

/// Colour in HSL, each channel in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hsl {
    pub hue: f64,
    pub saturation: f64,
    pub lightness: f64,
}

/// Session use-case failure. Every variant is recoverable.
#[derive(Debug)]
pub enum SessionError {
    NotCalibrated,
    NoOrigin,
    InvalidReferenceCode(String),
    AuthorOnly,
    Validation(MarkerValidationError),
    Persistence(RepoError),
    StaleSession {
        current: SessionEpoch,
        received: SessionEpoch,
    },
}

impl Display for SessionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotCalibrated => write!(f, "scan the venue code before using AR"),
            Self::NoOrigin => write!(f, "no session origin established"),
            Self::InvalidReferenceCode(code) => write!(f, "invalid reference code: `{code}`"),
            Self::AuthorOnly => write!(f, "only the author role can place markers"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::Persistence(err) => write!(f, "{err}"),
            Self::StaleSession { current, received } => write!(
                f,
                "result from session epoch {received} discarded; current epoch is {current}"
            ),
        }
    }
}

impl Error for SessionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Persistence(err) => Some(err),
            _ => None,
        }
    }
}

impl From<FrameError> for SessionError {
    fn from(value: FrameError) -> Self {
        match value {
            FrameError::NotCalibrated => Self::NotCalibrated,
            FrameError::NoOrigin => Self::NoOrigin,
            FrameError::InvalidReferenceCode(code) => Self::InvalidReferenceCode(code),
            FrameError::ReferenceMismatch { actual, .. } => Self::InvalidReferenceCode(actual),
        }
    }
}

impl From<RepoError> for SessionError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => Self::Validation(err),
            other => Self::Persistence(other),
        }
    }
}

impl From<MarkerValidationError> for SessionError {
    fn from(value: MarkerValidationError) -> Self {
        Self::Validation(value)
    }
}

/// Input consumed once per rendered frame.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameInput {
    pub delta_ms: f64,
    /// Instance resolved by the renderer's hit test this frame, if any.
    pub selection: Option<InstanceKey>,
}

impl FrameInput {
    pub fn idle(delta_ms: f64) -> Self {
        Self {
            delta_ms,
            selection: None,
        }
    }

    pub fn select(delta_ms: f64, key: InstanceKey) -> Self {
        Self {
            delta_ms,
            selection: Some(key),
        }
    }
}

/// What happened during one `tick`.
#[derive(Debug, Default)]
pub struct FrameReport {
    /// Read the host should run off the frame path and send back.
    pub reconstruction: Option<ReconstructionTicket>,
    /// Instances materialized from results drained this frame.
    pub merged: usize,
    /// Results dropped this frame (stale epoch or failed fetch).
    pub discarded: usize,
    pub selection: Option<SelectOutcome>,
    pub rewards: Vec<RewardTriggered>,
}

/// Outcome of one outbox flush.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushReport {
    pub persisted: usize,
    pub failed: usize,
}

/// Render-facing state of one instance.
#[derive(Debug, Clone, PartialEq)]
pub struct InstanceVisual {
    pub key: InstanceKey,
    pub marker_id: MarkerId,
    /// Session-local position including the display lift.
    pub position: Vector3<f64>,
    pub visible: bool,
    pub highlighted: bool,
    pub angle: f64,
    pub color: Hsl,
}

/// Explicit owned state of one AR session, advanced by `tick`.
pub struct ArSession {
    config: EngineConfig,
    role: SessionRole,
    author: String,
    frame: ReferenceFrameManager,
    registry: MarkerRegistry,
    filter: VisibilityFilter,
    scheduler: InteractionScheduler,
    epoch: SessionEpoch,
    settle_remaining_ms: Option<f64>,
    reconstruction_requested: bool,
    inbox_tx: Sender<ReconstructionResult>,
    inbox_rx: Receiver<ReconstructionResult>,
    pending_inserts: Vec<Marker>,
    /// Deleted this epoch; in-flight results may still carry them.
    deleted: HashSet<MarkerId>,
}

impl ArSession {
    pub fn new(
        config: EngineConfig,
        role: SessionRole,
        author: impl Into<String>,
        catalog: RewardCatalog,
    ) -> Self {
        let (inbox_tx, inbox_rx) = mpsc::channel();
        let scheduler = InteractionScheduler::new(&config, catalog);
        Self {
            frame: ReferenceFrameManager::new(config.min_reference_code_len),
            config,
            role,
            author: author.into(),
            registry: MarkerRegistry::new(),
            filter: VisibilityFilter::default(),
            scheduler,
            epoch: SessionEpoch::default(),
            settle_remaining_ms: None,
            reconstruction_requested: false,
            inbox_tx,
            inbox_rx,
            pending_inserts: Vec::new(),
            deleted: HashSet::new(),
        }
    }

    pub fn role(&self) -> SessionRole {
        self.role
    }

    pub fn epoch(&self) -> SessionEpoch {
        self.epoch
    }

    pub fn reference(&self) -> Option<&ReferenceEvent> {
        self.frame.reference()
    }

    pub fn origin(&self) -> Option<&SessionOrigin> {
        self.frame.current()
    }

    pub fn registry(&self) -> &MarkerRegistry {
        &self.registry
    }

    pub fn scheduler(&self) -> &InteractionScheduler {
        &self.scheduler
    }

    pub fn active_filter(&self) -> Option<&str> {
        self.filter.active()
    }

    pub fn pending_inserts(&self) -> &[Marker] {
        &self.pending_inserts
    }

    /// Channel end the host uses to deliver fetched results.
    pub fn result_sender(&self) -> Sender<ReconstructionResult> {
        self.inbox_tx.clone()
    }

    /// Accepts a scanned code. A new calibration tears down the scene of the
    /// previous one.
    pub fn scan_reference(&mut self, code: &str) -> Result<ReferenceEvent, SessionError> {
        let was_calibrated = self.frame.is_calibrated();
        let event = self.frame.calibrate(code)?;
        if was_calibrated {
            self.teardown_scene();
            info!(
                "event=recalibrate module=session status=ok reference_code={} epoch={}",
                event.code, self.epoch
            );
        }
        Ok(event)
    }

    /// Called once the tracker reports a stable local reference space.
    ///
    /// Captures the origin at `pose` unless one already exists.
    pub fn on_reference_space_ready(
        &mut self,
        pose: TrackingPose,
    ) -> Result<SessionOrigin, SessionError> {
        if let Some(origin) = self.frame.current() {
            return Ok(origin.clone());
        }
        self.establish_origin(pose)
    }

    /// Records `pose` as the origin of the calibrated reference.
    ///
    /// Existing instances are re-decoded against the new origin and a
    /// reconstruction is requested after the settling delay.
    pub fn establish_origin(&mut self, pose: TrackingPose) -> Result<SessionOrigin, SessionError> {
        let code = self
            .frame
            .reference()
            .map(|reference| reference.code.clone())
            .ok_or(SessionError::NotCalibrated)?;
        let origin = self.frame.establish(&code, &pose)?;

        for (_, instance) in self.registry.iter_mut() {
            instance.position = decode(instance.marker.relative_offset, &origin);
        }
        self.settle_remaining_ms = Some(self.config.settle_delay_ms);
        self.reconstruction_requested = true;
        Ok(origin)
    }

    /// Asks for a fresh read of the store on the next settled tick.
    pub fn request_reconstruction(&mut self) -> Result<(), SessionError> {
        if self.frame.current().is_none() {
            warn!("event=reconstruction_request module=session status=skipped reason=no_origin");
            return Err(SessionError::NoOrigin);
        }
        self.reconstruction_requested = true;
        Ok(())
    }

    /// Advances the session by one rendered frame.
    pub fn tick(&mut self, input: FrameInput) -> FrameReport {
        let mut report = FrameReport::default();
        let delta_ms = input.delta_ms.max(0.0);

        loop {
            match self.inbox_rx.try_recv() {
                Ok(result) => match self.apply_reconstruction(result) {
                    Ok(merged) => report.merged += merged,
                    Err(err) => {
                        report.discarded += 1;
                        if matches!(err, SessionError::StaleSession { .. }) {
                            debug!(
                                "event=reconstruction_merge module=session status=discarded error={}",
                                err
                            );
                        } else {
                            warn!(
                                "event=reconstruction_merge module=session status=error error={}",
                                err
                            );
                        }
                    }
                },
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }

        if let Some(remaining) = self.settle_remaining_ms {
            let remaining = remaining - delta_ms;
            self.settle_remaining_ms = (remaining > 0.0).then_some(remaining);
        }
        if self.settle_remaining_ms.is_none() && self.reconstruction_requested {
            if let Some(reference) = self.frame.reference().filter(|_| self.frame.current().is_some())
            {
                report.reconstruction = Some(ReconstructionTicket {
                    epoch: self.epoch,
                    reference_code: reference.code.clone(),
                });
                self.reconstruction_requested = false;
            }
        }

        if let Some(key) = input.selection {
            report.selection = Some(self.scheduler.on_select(&mut self.registry, key));
        }
        report.rewards = self.scheduler.tick(&mut self.registry, delta_ms);
        report
    }

    /// Merges a fetched result into the registry.
    ///
    /// Returns the number of newly materialized instances. On a failed fetch
    /// the registry is left untouched.
    pub fn apply_reconstruction(
        &mut self,
        result: ReconstructionResult,
    ) -> Result<usize, SessionError> {
        let stale = result.epoch != self.epoch
            || self
                .frame
                .reference()
                .is_some_and(|reference| reference.code != result.reference_code);
        if stale {
            return Err(SessionError::StaleSession {
                current: self.epoch,
                received: result.epoch,
            });
        }

        let reference = self
            .frame
            .reference()
            .ok_or(SessionError::NotCalibrated)?;
        let origin = self.frame.current().ok_or_else(|| {
            warn!("event=reconstruction_merge module=session status=skipped reason=no_origin");
            SessionError::NoOrigin
        })?;
        let markers: Vec<Marker> = result
            .markers
            .map_err(SessionError::Persistence)?
            .into_iter()
            .filter(|marker| !self.deleted.contains(&marker.id))
            .collect();

        let report = self.registry.reconstruct(&markers, reference, origin);
        self.filter.apply(&mut self.registry);
        Ok(report.materialized)
    }

    /// Places a marker at a session-local position (author only).
    ///
    /// The instance appears immediately; persistence happens on the next
    /// `flush_inserts`.
    pub fn place_marker(
        &mut self,
        absolute: Vector3<f64>,
        name: Option<&str>,
    ) -> Result<InstanceKey, SessionError> {
        if self.role != SessionRole::Author {
            return Err(SessionError::AuthorOnly);
        }
        let reference = self.frame.reference().ok_or(SessionError::NotCalibrated)?;
        let Some(origin) = self.frame.current() else {
            warn!("event=place_marker module=session status=skipped reason=no_origin");
            return Err(SessionError::NoOrigin);
        };

        let mut marker = Marker::new(
            reference.code.as_str(),
            encode(&absolute, origin),
            self.author.as_str(),
        );
        marker.name = name.map(|value| value.trim().to_string());
        marker.validate()?;

        let mut instance = MarkerInstance::materialize(marker.clone(), absolute);
        self.filter.apply_to(&mut instance);
        let key = self.registry.register(instance);
        info!(
            "event=place_marker module=session status=ok marker_id={} reference_code={}",
            marker.id, marker.reference_code
        );
        self.pending_inserts.push(marker);
        Ok(key)
    }

    /// Persists queued markers. Failures stay queued for the next flush.
    pub fn flush_inserts(&mut self, store: &dyn PointStore) -> FlushReport {
        let mut report = FlushReport::default();
        let queued = std::mem::take(&mut self.pending_inserts);
        for marker in queued {
            match store.insert(&marker) {
                Ok(_) => report.persisted += 1,
                Err(RepoError::Validation(err)) => {
                    report.failed += 1;
                    warn!(
                        "event=marker_insert module=session status=dropped marker_id={} error={}",
                        marker.id, err
                    );
                }
                Err(err) => {
                    report.failed += 1;
                    warn!(
                        "event=marker_insert module=session status=retry marker_id={} error={}",
                        marker.id, err
                    );
                    self.pending_inserts.push(marker);
                }
            }
        }
        report
    }

    /// Deletes one marker from the store and the scene.
    pub fn remove_marker(
        &mut self,
        store: &dyn PointStore,
        id: MarkerId,
    ) -> Result<(), SessionError> {
        let was_queued = self.pending_inserts.iter().any(|marker| marker.id == id);
        match store.delete(id) {
            Ok(()) => {}
            Err(RepoError::NotFound(_)) if was_queued => {}
            Err(err) => return Err(err.into()),
        }

        self.pending_inserts.retain(|marker| marker.id != id);
        self.deleted.insert(id);
        if let Some(key) = self.registry.key_of(id) {
            self.registry.unregister(key);
            self.scheduler.forget(key);
        }
        Ok(())
    }

    /// Deletes every stored marker and empties the scene. Results fetched
    /// before the clear become stale.
    pub fn clear_all(&mut self, store: &dyn PointStore) -> Result<usize, SessionError> {
        let removed = store.clear_all()?;
        self.registry.clear();
        self.scheduler.reset();
        self.pending_inserts.clear();
        self.invalidate_in_flight();
        info!("event=clear_all module=session status=ok removed={removed}");
        Ok(removed)
    }

    /// Sets the name filter and re-evaluates materialized instances.
    pub fn set_filter(&mut self, name: Option<&str>) -> usize {
        self.filter.set(name.map(str::to_string));
        self.filter.apply(&mut self.registry)
    }

    /// Distinct names of materialized markers, for the filter picker.
    pub fn available_names(&self) -> Vec<String> {
        self.registry.names()
    }

    pub fn key_of(&self, marker_id: MarkerId) -> Option<InstanceKey> {
        self.registry.key_of(marker_id)
    }

    /// Desired render state for every materialized instance.
    pub fn visuals(&self) -> impl Iterator<Item = InstanceVisual> + '_ {
        let lift = Vector3::new(0.0, self.config.display_lift, 0.0);
        self.registry.iter().map(move |(key, instance)| InstanceVisual {
            key,
            marker_id: instance.marker.id,
            position: instance.position + lift,
            visible: instance.visible,
            highlighted: instance.highlighted,
            angle: instance.angle,
            color: self.role.palette(instance.palette_index),
        })
    }

    /// Ends the AR session: origin, scene and transient state are dropped,
    /// and in-flight results become stale. The reference stays calibrated.
    pub fn end_session(&mut self) {
        self.frame.clear();
        self.teardown_scene();
        info!("event=session_end module=session status=ok epoch={}", self.epoch);
    }

    fn teardown_scene(&mut self) {
        self.registry.clear();
        self.scheduler.reset();
        self.settle_remaining_ms = None;
        self.reconstruction_requested = false;
        self.invalidate_in_flight();
    }

    fn invalidate_in_flight(&mut self) {
        self.epoch = self.epoch.next();
        self.deleted.clear();
        while self.inbox_rx.try_recv().is_ok() {}
    }
}
