//! Interaction and animation scheduler.
//!
//! # Responsibility
//! - Consume resolved selections, count clicks, start spins.
//! - Schedule and deliver rewards when the click threshold trips.
//! - Advance animations once per rendered frame.
//!
//! # Invariants
//! - Per instance: `Idle -> Spinning -> Idle`; selections while spinning
//!   still count but never start a second spin.
//! - Counters reset to zero exactly when a reward is scheduled.
//! - A reward is delivered only after its target's spin finished plus the
//!   configured delay.
//! - Hit testing is not done here; callers pass the resolved `InstanceKey`.

use crate::config::EngineConfig;
use crate::model::marker::MarkerId;
use crate::model::reward::{Reward, RewardCatalog};
use crate::scene::animation::{AnimationSet, AnimationTask, Easing};
use crate::scene::registry::{InstanceKey, MarkerRegistry};
use log::{debug, info};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::f64::consts::TAU;

/// Why a selection had no effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    UnknownInstance,
    Hidden,
}

/// Result of one `on_select` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectOutcome {
    Ignored(IgnoreReason),
    Counted {
        /// Counter value after this selection (0 when a reward was scheduled).
        clicks: u32,
        spin_started: bool,
        reward_scheduled: bool,
    },
}

/// Reward delivered to the viewer for one marker.
#[derive(Debug, Clone, PartialEq)]
pub struct RewardTriggered {
    pub target: InstanceKey,
    pub marker_id: MarkerId,
    pub reward: Reward,
}

#[derive(Debug, Clone, PartialEq)]
struct PendingReward {
    target: InstanceKey,
    marker_id: MarkerId,
    due_in_ms: f64,
}

/// Per-frame scheduler over the marker registry.
#[derive(Debug)]
pub struct InteractionScheduler {
    click_threshold: u32,
    spin_duration_ms: f64,
    reward_delay_ms: f64,
    easing: Easing,
    animations: AnimationSet,
    pending_rewards: Vec<PendingReward>,
    catalog: RewardCatalog,
    rng: StdRng,
}

impl InteractionScheduler {
    pub fn new(config: &EngineConfig, catalog: RewardCatalog) -> Self {
        let rng = match config.reward_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            click_threshold: config.click_threshold.max(1),
            spin_duration_ms: config.spin_duration_ms,
            reward_delay_ms: config.reward_delay_ms,
            easing: config.easing,
            animations: AnimationSet::new(),
            pending_rewards: Vec::new(),
            catalog,
            rng,
        }
    }

    pub fn animations(&self) -> &AnimationSet {
        &self.animations
    }

    pub fn pending_reward_count(&self) -> usize {
        self.pending_rewards.len()
    }

    /// Handles one resolved selection.
    pub fn on_select(&mut self, registry: &mut MarkerRegistry, key: InstanceKey) -> SelectOutcome {
        let Some(instance) = registry.get_mut(key) else {
            return SelectOutcome::Ignored(IgnoreReason::UnknownInstance);
        };
        if !instance.visible || !instance.selectable {
            return SelectOutcome::Ignored(IgnoreReason::Hidden);
        }

        instance.clicks += 1;
        let spin_started = self.animations.start(AnimationTask::spin(
            key,
            instance.angle.rem_euclid(TAU),
            self.spin_duration_ms,
        ));

        let mut reward_scheduled = false;
        if instance.clicks >= self.click_threshold {
            instance.clicks = 0;
            let spin_remaining = self
                .animations
                .get(key)
                .map_or(0.0, AnimationTask::remaining_ms);
            self.pending_rewards.push(PendingReward {
                target: key,
                marker_id: instance.marker.id,
                due_in_ms: spin_remaining + self.reward_delay_ms,
            });
            reward_scheduled = true;
            info!(
                "event=reward_scheduled module=scheduler status=ok marker_id={} due_in_ms={:.0}",
                instance.marker.id,
                spin_remaining + self.reward_delay_ms
            );
        }

        debug!(
            "event=select module=scheduler status=ok marker_id={} clicks={} spin_started={}",
            instance.marker.id, instance.clicks, spin_started
        );
        SelectOutcome::Counted {
            clicks: instance.clicks,
            spin_started,
            reward_scheduled,
        }
    }

    /// Advances animations and pending rewards by one frame.
    ///
    /// Returns rewards that became due; the vector does not allocate on
    /// frames without deliveries.
    pub fn tick(&mut self, registry: &mut MarkerRegistry, delta_ms: f64) -> Vec<RewardTriggered> {
        let delta_ms = delta_ms.max(0.0);
        self.animations.advance(registry, delta_ms, self.easing);

        let mut delivered = Vec::new();
        for index in (0..self.pending_rewards.len()).rev() {
            let pending = &mut self.pending_rewards[index];
            pending.due_in_ms -= delta_ms;
            if pending.due_in_ms > 0.0 {
                continue;
            }

            let pending = self.pending_rewards.swap_remove(index);
            if !registry.contains(pending.target) {
                continue;
            }
            let reward = self.catalog.draw(&mut self.rng);
            info!(
                "event=reward_triggered module=scheduler status=ok marker_id={} reward={} tier={}",
                pending.marker_id, reward.name, reward.rarity_tier
            );
            delivered.push(RewardTriggered {
                target: pending.target,
                marker_id: pending.marker_id,
                reward,
            });
        }
        delivered
    }

    /// Drops animation and reward state for a removed instance.
    pub fn forget(&mut self, key: InstanceKey) {
        self.animations.cancel(key);
        self.pending_rewards.retain(|pending| pending.target != key);
    }

    /// Drops all transient state; used on session end.
    pub fn reset(&mut self) {
        self.animations.clear();
        self.pending_rewards.clear();
    }
}
