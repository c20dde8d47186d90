//! Marker registry: the markers materialized in the current AR session.
//!
//! # Responsibility
//! - Own every `MarkerInstance` of the session in a slot arena.
//! - Hand out generational `InstanceKey`s that stay stable until removal.
//! - Reconstruct instances from persisted markers against the session origin.
//!
//! # Invariants
//! - A key never resolves after its instance is unregistered or cleared.
//! - At most one instance exists per `MarkerId`.
//! - Only markers of the active reference code are materialized.

use crate::frame::reference::SessionOrigin;
use crate::frame::transform::decode;
use crate::model::marker::{Marker, MarkerId, ReferenceEvent};
use log::{debug, info};
use nalgebra::Vector3;
use std::collections::{BTreeSet, HashMap};

/// Stable handle to one materialized instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InstanceKey {
    index: u32,
    generation: u32,
}

impl InstanceKey {
    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

/// Transient, per-session realization of a persisted marker.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerInstance {
    pub marker: Marker,
    /// Session-local position decoded from the marker's offset.
    pub position: Vector3<f64>,
    pub visible: bool,
    pub highlighted: bool,
    pub selectable: bool,
    /// Selections since session start or since the last reward trigger.
    pub clicks: u32,
    /// Rotation about the vertical axis, radians.
    pub angle: f64,
    /// Materialization order; drives per-marker colour.
    pub palette_index: usize,
}

impl MarkerInstance {
    /// Materializes `marker` at `position` with fresh interaction state.
    pub fn materialize(marker: Marker, position: Vector3<f64>) -> Self {
        Self {
            marker,
            position,
            visible: true,
            highlighted: false,
            selectable: true,
            clicks: 0,
            angle: 0.0,
            palette_index: 0,
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.marker.name.as_deref()
    }
}

/// Outcome counters of one `reconstruct` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconstructReport {
    pub materialized: usize,
    pub already_present: usize,
    pub foreign_reference: usize,
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    instance: Option<MarkerInstance>,
}

/// Arena of materialized instances.
#[derive(Debug, Default)]
pub struct MarkerRegistry {
    slots: Vec<Slot>,
    free: Vec<u32>,
    by_marker: HashMap<MarkerId, InstanceKey>,
    next_palette_index: usize,
}

impl MarkerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.by_marker.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_marker.is_empty()
    }

    /// Materializes every marker of the active reference under `origin`.
    ///
    /// Markers with another reference code are skipped, as are markers that
    /// already have an instance. New instances start visible, unhighlighted
    /// and with zeroed counters; callers re-apply the active filter after.
    pub fn reconstruct(
        &mut self,
        markers: &[Marker],
        reference: &ReferenceEvent,
        origin: &SessionOrigin,
    ) -> ReconstructReport {
        let mut report = ReconstructReport::default();
        for marker in markers {
            if marker.reference_code != reference.code
                || origin.reference_code != reference.code
            {
                report.foreign_reference += 1;
                continue;
            }
            if self.by_marker.contains_key(&marker.id) {
                report.already_present += 1;
                continue;
            }

            let position = decode(marker.relative_offset, origin);
            self.register(MarkerInstance::materialize(marker.clone(), position));
            report.materialized += 1;
        }

        info!(
            "event=reconstruct module=registry status=ok reference_code={} materialized={} already_present={} foreign={}",
            reference.code, report.materialized, report.already_present, report.foreign_reference
        );
        report
    }

    /// Stores an instance and returns its key.
    ///
    /// Registering a marker that already has an instance replaces the old
    /// instance; the old key stops resolving.
    pub fn register(&mut self, mut instance: MarkerInstance) -> InstanceKey {
        if let Some(previous) = self.by_marker.get(&instance.marker.id).copied() {
            self.unregister(previous);
        }

        instance.palette_index = self.next_palette_index;
        self.next_palette_index += 1;
        let marker_id = instance.marker.id;

        let key = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.instance = Some(instance);
                InstanceKey {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot {
                    generation: 0,
                    instance: Some(instance),
                });
                InstanceKey {
                    index,
                    generation: 0,
                }
            }
        };

        self.by_marker.insert(marker_id, key);
        key
    }

    /// Removes an instance; stale keys return `None`.
    pub fn unregister(&mut self, key: InstanceKey) -> Option<MarkerInstance> {
        let slot = self.slots.get_mut(key.index as usize)?;
        if slot.generation != key.generation {
            return None;
        }
        let instance = slot.instance.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(key.index);
        self.by_marker.remove(&instance.marker.id);
        debug!(
            "event=unregister module=registry status=ok marker_id={}",
            instance.marker.id
        );
        Some(instance)
    }

    /// Drops every instance. All previously issued keys become stale.
    pub fn clear(&mut self) {
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if slot.instance.take().is_some() {
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(index as u32);
            }
        }
        self.by_marker.clear();
        self.next_palette_index = 0;
    }

    pub fn get(&self, key: InstanceKey) -> Option<&MarkerInstance> {
        let slot = self.slots.get(key.index as usize)?;
        if slot.generation != key.generation {
            return None;
        }
        slot.instance.as_ref()
    }

    pub fn get_mut(&mut self, key: InstanceKey) -> Option<&mut MarkerInstance> {
        let slot = self.slots.get_mut(key.index as usize)?;
        if slot.generation != key.generation {
            return None;
        }
        slot.instance.as_mut()
    }

    pub fn key_of(&self, marker_id: MarkerId) -> Option<InstanceKey> {
        self.by_marker.get(&marker_id).copied()
    }

    pub fn contains(&self, key: InstanceKey) -> bool {
        self.get(key).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (InstanceKey, &MarkerInstance)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.instance.as_ref().map(|instance| {
                (
                    InstanceKey {
                        index: index as u32,
                        generation: slot.generation,
                    },
                    instance,
                )
            })
        })
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (InstanceKey, &mut MarkerInstance)> {
        self.slots.iter_mut().enumerate().filter_map(|(index, slot)| {
            let generation = slot.generation;
            slot.instance.as_mut().map(|instance| {
                (
                    InstanceKey {
                        index: index as u32,
                        generation,
                    },
                    instance,
                )
            })
        })
    }

    /// Distinct marker names, sorted; unnamed markers are skipped.
    pub fn names(&self) -> Vec<String> {
        self.iter()
            .filter_map(|(_, instance)| instance.name().map(str::to_string))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}
