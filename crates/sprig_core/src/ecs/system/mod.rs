// mod.rs - Systems and the system tree
//
// A system declares one query and is handed its refreshed results each
// update. Systems are arranged in a tree of groups; the world owns the
// root group and walks it depth-first in insertion order.

mod group;

pub use group::SystemGroup;

use crate::ecs::{QueryDescriptor, QueryHandle, World, WorldError};

/// Per-frame behavior bound to one query.
pub trait System {
    /// Name used in logs and timings.
    fn name(&self) -> &str;

    /// Component types this system iterates.
    fn describe(&self) -> QueryDescriptor;

    /// Called once after the system's query is registered.
    fn init(&mut self, _world: &mut World) -> Result<(), WorldError> {
        Ok(())
    }

    /// Run one frame. `query` is this system's query handle; structural
    /// changes made through `world` apply at the next flush.
    fn update(&mut self, world: &mut World, query: QueryHandle, dt: f32);
}

/// A system plus its bookkeeping inside a group.
pub(crate) struct SystemSlot {
    system: Box<dyn System>,
    query: Option<QueryHandle>,
    enabled: bool,
}

impl SystemSlot {
    fn new(system: Box<dyn System>) -> Self {
        Self {
            system,
            query: None,
            enabled: true,
        }
    }

    fn init(&mut self, world: &mut World) -> Result<(), WorldError> {
        let handle = world.register_query(&self.system.describe())?;
        self.query = Some(handle);
        tracing::debug!(system = self.system.name(), query = handle.index(), "system initialized");
        self.system.init(world)
    }

    fn run(&mut self, world: &mut World, dt: f32) {
        if !self.enabled {
            return;
        }
        let Some(query) = self.query else {
            tracing::warn!(system = self.system.name(), "system updated before init, skipped");
            return;
        };

        #[cfg(feature = "metrics")]
        let started = std::time::Instant::now();

        self.system.update(world, query, dt);

        #[cfg(feature = "metrics")]
        world.profiler_mut().record(self.system.name(), started.elapsed());
    }
}

/// Child of a [`SystemGroup`].
pub(crate) enum SystemNode {
    System(SystemSlot),
    Group(SystemGroup),
}

impl SystemNode {
    fn name(&self) -> &str {
        match self {
            SystemNode::System(slot) => slot.system.name(),
            SystemNode::Group(group) => group.name(),
        }
    }

    fn init(&mut self, world: &mut World) -> Result<(), WorldError> {
        match self {
            SystemNode::System(slot) => slot.init(world),
            SystemNode::Group(group) => group.init(world),
        }
    }

    fn run(&mut self, world: &mut World, dt: f32) {
        match self {
            SystemNode::System(slot) => slot.run(world, dt),
            SystemNode::Group(group) => group.update(world, dt),
        }
    }

    fn set_enabled(&mut self, enabled: bool) {
        match self {
            SystemNode::System(slot) => slot.enabled = enabled,
            SystemNode::Group(group) => group.set_enabled(enabled),
        }
    }
}
