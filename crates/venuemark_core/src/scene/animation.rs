//! One-shot rotation animations.
//!
//! # Responsibility
//! - Track in-flight spins keyed by target instance.
//! - Advance them by frame delta and write eased angles back to instances.
//!
//! # Invariants
//! - At most one task per target; a second start is rejected.
//! - `advance` is O(active tasks) and does not allocate.

use crate::scene::registry::{InstanceKey, MarkerRegistry};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::f64::consts::TAU;

/// Ease-out curve mapping linear progress `t` in `[0, 1]` to eased progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Easing {
    Linear,
    /// `t * (2 - t)`
    #[default]
    EaseOutQuad,
    EaseOutCubic,
    EaseOutBounce,
}

impl Easing {
    pub fn apply(self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Self::Linear => t,
            Self::EaseOutQuad => t * (2.0 - t),
            Self::EaseOutCubic => 1.0 - (1.0 - t).powi(3),
            Self::EaseOutBounce => ease_out_bounce(t),
        }
    }
}

fn ease_out_bounce(t: f64) -> f64 {
    const N1: f64 = 7.5625;
    const D1: f64 = 2.75;

    if t >= 1.0 {
        1.0
    } else if t < 1.0 / D1 {
        N1 * t * t
    } else if t < 2.0 / D1 {
        let t = t - 1.5 / D1;
        N1 * t * t + 0.75
    } else if t < 2.5 / D1 {
        let t = t - 2.25 / D1;
        N1 * t * t + 0.9375
    } else {
        let t = t - 2.625 / D1;
        N1 * t * t + 0.984375
    }
}

/// Rotation axis in tracking space. Spins use `Vertical`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Vertical,
}

/// In-flight rotation of one instance.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationTask {
    pub target: InstanceKey,
    pub axis: Axis,
    pub start_angle: f64,
    pub end_angle: f64,
    pub elapsed_ms: f64,
    pub duration_ms: f64,
}

impl AnimationTask {
    /// Full turn about the vertical axis starting at `start_angle`.
    pub fn spin(target: InstanceKey, start_angle: f64, duration_ms: f64) -> Self {
        Self {
            target,
            axis: Axis::Vertical,
            start_angle,
            end_angle: start_angle + TAU,
            elapsed_ms: 0.0,
            duration_ms,
        }
    }

    /// Linear progress in `[0, 1]`.
    pub fn progress(&self) -> f64 {
        if self.duration_ms <= 0.0 {
            return 1.0;
        }
        (self.elapsed_ms / self.duration_ms).min(1.0)
    }

    pub fn angle(&self, easing: Easing) -> f64 {
        let eased = easing.apply(self.progress());
        self.start_angle + (self.end_angle - self.start_angle) * eased
    }

    pub fn is_complete(&self) -> bool {
        self.progress() >= 1.0
    }

    pub fn remaining_ms(&self) -> f64 {
        (self.duration_ms - self.elapsed_ms).max(0.0)
    }
}

/// Active tasks, at most one per target.
#[derive(Debug, Default)]
pub struct AnimationSet {
    tasks: BTreeMap<InstanceKey, AnimationTask>,
}

impl AnimationSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts `task` unless its target already spins. Returns whether it started.
    pub fn start(&mut self, task: AnimationTask) -> bool {
        if self.tasks.contains_key(&task.target) {
            return false;
        }
        self.tasks.insert(task.target, task);
        true
    }

    pub fn get(&self, target: InstanceKey) -> Option<&AnimationTask> {
        self.tasks.get(&target)
    }

    pub fn is_animating(&self, target: InstanceKey) -> bool {
        self.tasks.contains_key(&target)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn cancel(&mut self, target: InstanceKey) -> Option<AnimationTask> {
        self.tasks.remove(&target)
    }

    pub fn clear(&mut self) {
        self.tasks.clear();
    }

    /// Advances every task by `delta_ms`, writes angles, and drops finished
    /// tasks. Tasks whose target no longer resolves are dropped too.
    ///
    /// Returns the number of tasks that completed this call.
    pub fn advance(&mut self, registry: &mut MarkerRegistry, delta_ms: f64, easing: Easing) -> usize {
        let delta_ms = delta_ms.max(0.0);
        let mut completed = 0;
        self.tasks.retain(|key, task| {
            let Some(instance) = registry.get_mut(*key) else {
                return false;
            };
            task.elapsed_ms += delta_ms;
            instance.angle = task.angle(easing);
            if task.is_complete() {
                completed += 1;
                return false;
            }
            true
        });
        completed
    }
}

#[cfg(test)]
mod tests {
    use super::{AnimationSet, AnimationTask, Easing};
    use crate::model::marker::Marker;
    use crate::model::pose::RelativeOffset;
    use crate::scene::registry::{InstanceKey, MarkerInstance, MarkerRegistry};
    use nalgebra::Vector3;
    use std::f64::consts::TAU;

    fn registry_with_one() -> (MarkerRegistry, InstanceKey) {
        let mut registry = MarkerRegistry::new();
        let key = registry.register(MarkerInstance::materialize(
            Marker::new("EVENT_A", RelativeOffset::default(), "author"),
            Vector3::zeros(),
        ));
        (registry, key)
    }

    #[test]
    fn easing_curves_hit_endpoints() {
        for easing in [
            Easing::Linear,
            Easing::EaseOutQuad,
            Easing::EaseOutCubic,
            Easing::EaseOutBounce,
        ] {
            assert!(easing.apply(0.0).abs() < 1e-12, "{easing:?} at 0");
            assert!((easing.apply(1.0) - 1.0).abs() < 1e-12, "{easing:?} at 1");
        }
        assert!((Easing::EaseOutQuad.apply(0.5) - 0.75).abs() < 1e-12);
    }

    #[test]
    fn full_duration_tick_lands_on_end_angle_and_removes_task() {
        let (mut registry, key) = registry_with_one();
        let mut animations = AnimationSet::new();
        assert!(animations.start(AnimationTask::spin(key, 0.0, 600.0)));

        let completed = animations.advance(&mut registry, 600.0, Easing::EaseOutQuad);
        assert_eq!(completed, 1);
        assert!(animations.is_empty());
        assert!((registry.get(key).unwrap().angle - TAU).abs() < 1e-9);
    }

    #[test]
    fn partial_tick_applies_eased_angle() {
        let (mut registry, key) = registry_with_one();
        let mut animations = AnimationSet::new();
        animations.start(AnimationTask::spin(key, 0.0, 600.0));

        animations.advance(&mut registry, 300.0, Easing::EaseOutQuad);
        let angle = registry.get(key).unwrap().angle;
        assert!((angle - 0.75 * TAU).abs() < 1e-9);
        assert!((animations.get(key).unwrap().remaining_ms() - 300.0).abs() < 1e-9);
    }

    #[test]
    fn duplicate_start_is_rejected() {
        let (_, key) = registry_with_one();
        let mut animations = AnimationSet::new();
        assert!(animations.start(AnimationTask::spin(key, 0.0, 600.0)));
        assert!(!animations.start(AnimationTask::spin(key, 1.0, 600.0)));
        assert_eq!(animations.len(), 1);
        assert_eq!(animations.get(key).unwrap().start_angle, 0.0);
    }

    #[test]
    fn tasks_for_removed_instances_are_dropped() {
        let (mut registry, key) = registry_with_one();
        let mut animations = AnimationSet::new();
        animations.start(AnimationTask::spin(key, 0.0, 600.0));
        registry.unregister(key);

        assert_eq!(animations.advance(&mut registry, 16.0, Easing::EaseOutQuad), 0);
        assert!(animations.is_empty());
    }
}
