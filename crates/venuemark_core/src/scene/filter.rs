//! Name-based visibility filter.
//!
//! Hiding is exclusive: filtered-out instances stay materialized but are
//! invisible and cannot be selected. Changing the filter re-evaluates the
//! registry in place; persisted markers are not re-fetched.

use crate::scene::registry::{MarkerInstance, MarkerRegistry};
use log::debug;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisibilityFilter {
    active: Option<String>,
}

impl VisibilityFilter {
    pub fn new(active: Option<String>) -> Self {
        Self { active }
    }

    pub fn active(&self) -> Option<&str> {
        self.active.as_deref()
    }

    /// Replaces the active name; `None` shows everything.
    pub fn set(&mut self, name: Option<String>) {
        self.active = name;
    }

    /// Whether `instance` passes the active name.
    pub fn matches(&self, instance: &MarkerInstance) -> bool {
        match self.active.as_deref() {
            None => true,
            Some(active) => instance.name() == Some(active),
        }
    }

    /// Writes visible/highlighted/selectable flags for one instance.
    pub fn apply_to(&self, instance: &mut MarkerInstance) {
        let visible = self.matches(instance);
        instance.visible = visible;
        instance.selectable = visible;
        instance.highlighted = visible && self.active.is_some();
    }

    /// Re-evaluates every registered instance. Idempotent.
    pub fn apply(&self, registry: &mut MarkerRegistry) -> usize {
        let mut visible = 0;
        for (_, instance) in registry.iter_mut() {
            self.apply_to(instance);
            if instance.visible {
                visible += 1;
            }
        }
        debug!(
            "event=filter_apply module=filter status=ok active={} visible={} total={}",
            self.active.as_deref().unwrap_or("*"),
            visible,
            registry.len()
        );
        visible
    }
}
