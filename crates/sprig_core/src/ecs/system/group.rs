use super::{System, SystemNode, SystemSlot};
use crate::ecs::{World, WorldError};

/// Ordered collection of systems and nested groups, optionally throttled
/// to run every `frame_interval` frames.
///
/// A throttled group accumulates the dt of skipped frames and hands the
/// total to its children when it fires. The first update always fires.
pub struct SystemGroup {
    name: String,
    children: Vec<SystemNode>,
    enabled: bool,
    frame_interval: u32,
    frame_count: u32,
    elapsed: f32,
}

impl SystemGroup {
    pub fn new(name: impl Into<String>, frame_interval: u32) -> Self {
        Self {
            name: name.into(),
            children: Vec::new(),
            enabled: true,
            frame_interval: frame_interval.max(1),
            frame_count: 0,
            elapsed: 0.0,
        }
    }

    pub fn with_system(mut self, system: impl System + 'static) -> Self {
        self.add_system(system);
        self
    }

    pub fn with_group(mut self, group: SystemGroup) -> Self {
        self.add_group(group);
        self
    }

    pub fn add_system(&mut self, system: impl System + 'static) -> &mut Self {
        self.children
            .push(SystemNode::System(SystemSlot::new(Box::new(system))));
        self
    }

    pub fn add_group(&mut self, group: SystemGroup) -> &mut Self {
        self.children.push(SystemNode::Group(group));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn frame_interval(&self) -> u32 {
        self.frame_interval
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// A disabled group skips its whole subtree and does not count frames.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Enable or disable the first descendant system or group called
    /// `name`. Returns `false` if nothing matched.
    pub fn set_enabled_by_name(&mut self, name: &str, enabled: bool) -> bool {
        for child in &mut self.children {
            if child.name() == name {
                child.set_enabled(enabled);
                return true;
            }
            if let SystemNode::Group(group) = child {
                if group.set_enabled_by_name(name, enabled) {
                    return true;
                }
            }
        }
        false
    }

    /// Direct children.
    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub(crate) fn init(&mut self, world: &mut World) -> Result<(), WorldError> {
        for child in &mut self.children {
            child.init(world)?;
        }
        Ok(())
    }

    pub(crate) fn update(&mut self, world: &mut World, dt: f32) {
        if !self.enabled {
            return;
        }
        self.elapsed += dt;
        if self.frame_count % self.frame_interval == 0 {
            let elapsed = std::mem::take(&mut self.elapsed);
            for child in &mut self.children {
                child.run(world, elapsed);
            }
            self.frame_count = 1;
        } else {
            self.frame_count += 1;
        }
    }

    /// Move `other`'s children to the end of this group.
    pub(crate) fn absorb(&mut self, other: SystemGroup) {
        self.children.extend(other.children);
    }

    /// Restore frame counters and re-enable the whole subtree.
    pub(crate) fn reset(&mut self) {
        self.enabled = true;
        self.frame_count = 0;
        self.elapsed = 0.0;
        for child in &mut self.children {
            match child {
                SystemNode::System(slot) => slot.enabled = true,
                SystemNode::Group(group) => group.reset(),
            }
        }
    }
}

impl Default for SystemGroup {
    fn default() -> Self {
        Self::new("RootSystem", 1)
    }
}

impl std::fmt::Debug for SystemGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SystemGroup")
            .field("name", &self.name)
            .field("children", &self.children.iter().map(SystemNode::name).collect::<Vec<_>>())
            .field("enabled", &self.enabled)
            .field("frame_interval", &self.frame_interval)
            .finish()
    }
}
