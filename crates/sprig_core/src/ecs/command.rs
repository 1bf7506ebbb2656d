//! Deferred structural changes
//!
//! Adds and removals are queued during a frame and applied in FIFO order
//! by `flush`, which also tells interested queries which entities moved.

use crate::ecs::query::{QueryHandle, QueryRegistry};
use crate::ecs::storage::{ComponentPool, ErasedComponent};
use crate::ecs::{ComponentId, Entity, EntityPool};
use sprig_metrics::Counter;

/// One queued structural change.
pub enum Command {
    AddComponent {
        entity: Entity,
        component: ComponentId,
        instance: ErasedComponent,
    },
    RemoveComponent {
        entity: Entity,
        component: ComponentId,
    },
    RemoveEntity {
        entity: Entity,
    },
}

impl Command {
    pub fn entity(&self) -> Entity {
        match self {
            Command::AddComponent { entity, .. }
            | Command::RemoveComponent { entity, .. }
            | Command::RemoveEntity { entity } => *entity,
        }
    }
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Command::AddComponent { entity, component, .. } => f
                .debug_struct("AddComponent")
                .field("entity", entity)
                .field("component", component)
                .finish_non_exhaustive(),
            Command::RemoveComponent { entity, component } => f
                .debug_struct("RemoveComponent")
                .field("entity", entity)
                .field("component", component)
                .finish(),
            Command::RemoveEntity { entity } => {
                f.debug_struct("RemoveEntity").field("entity", entity).finish()
            }
        }
    }
}

/// Outcome of one flush.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FlushReport {
    pub applied: usize,
    pub rejected: usize,
}

/// FIFO command queue plus the component-type → query interest index.
#[derive(Debug, Default)]
pub struct CommandPool {
    queue: Vec<Command>,
    interest: Vec<Vec<QueryHandle>>,
}

impl CommandPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_command(&mut self, command: Command) {
        self.queue.push(command);
    }

    /// Notify `handle` about every change to any of `types`.
    pub fn register_interest(&mut self, handle: QueryHandle, types: &[ComponentId]) {
        for &id in types {
            let index = id as usize;
            if index >= self.interest.len() {
                self.interest.resize_with(index + 1, Vec::new);
            }
            let handles = &mut self.interest[index];
            if !handles.contains(&handle) {
                handles.push(handle);
            }
        }
    }

    /// Queries interested in type `id`.
    pub fn interested(&self, id: ComponentId) -> &[QueryHandle] {
        self.interest
            .get(id as usize)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Apply every queued command in order. Commands queued before this
    /// call are applied exactly once; rejected ones are logged and skipped.
    pub fn flush(
        &mut self,
        entities: &mut EntityPool,
        components: &mut ComponentPool,
        queries: &mut QueryRegistry,
        counters: &mut Counter,
    ) -> FlushReport {
        let mut report = FlushReport::default();
        if self.queue.is_empty() {
            return report;
        }

        let mut queue = std::mem::take(&mut self.queue);
        for command in queue.drain(..) {
            let applied = match command {
                Command::AddComponent { entity, component, instance } => {
                    let added = entities.add_component(entity, component, instance, components);
                    if added {
                        self.notify(queries, component, entity);
                    }
                    added
                }
                Command::RemoveComponent { entity, component } => {
                    let removed = entities.remove_component(entity, component, components);
                    if removed {
                        self.notify(queries, component, entity);
                    }
                    removed
                }
                Command::RemoveEntity { entity } => match entities.remove_entity(entity, components) {
                    Some(owned) => {
                        for id in owned {
                            self.notify(queries, id, entity);
                        }
                        true
                    }
                    None => false,
                },
            };
            if applied {
                report.applied += 1;
            } else {
                report.rejected += 1;
            }
        }
        // keep the allocation for the next frame
        self.queue = queue;

        counters.increment("commands.applied", report.applied as u64);
        counters.increment("commands.rejected", report.rejected as u64);
        tracing::trace!(applied = report.applied, rejected = report.rejected, "flushed commands");
        report
    }

    fn notify(&self, queries: &mut QueryRegistry, id: ComponentId, entity: Entity) {
        for &handle in self.interested(id) {
            queries.mark_dirty(handle, entity);
        }
    }

    /// Drop queued commands without applying them. Pending add instances
    /// are released, not recycled.
    pub fn clear(&mut self) {
        self.queue.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PoolSettings;
    use crate::ecs::{ComponentRegistry, QueryKey};

    #[derive(Default)]
    struct A;
    crate::define_component!(A, "A");
    #[derive(Default)]
    struct B;
    crate::define_component!(B, "B");

    struct Harness {
        commands: CommandPool,
        entities: EntityPool,
        components: ComponentPool,
        queries: QueryRegistry,
        counters: Counter,
        universe: usize,
    }

    impl Harness {
        fn new() -> Self {
            let registry = ComponentRegistry::new().with::<A>().unwrap().with::<B>().unwrap();
            let settings = PoolSettings::new(4, 32);
            Self {
                commands: CommandPool::new(),
                entities: EntityPool::new(registry.len(), settings, settings),
                components: ComponentPool::new(&registry, &settings),
                queries: QueryRegistry::new(),
                counters: Counter::new(),
                universe: registry.len(),
            }
        }

        fn add(&mut self, entity: Entity, component: ComponentId) {
            let instance = self.components.create_component(component).unwrap();
            self.commands.add_command(Command::AddComponent { entity, component, instance });
        }

        fn flush(&mut self) -> FlushReport {
            self.commands.flush(
                &mut self.entities,
                &mut self.components,
                &mut self.queries,
                &mut self.counters,
            )
        }
    }

    #[test]
    fn commands_apply_in_fifo_order() {
        let mut h = Harness::new();
        let e = h.entities.create_entity();
        h.add(e, 0);
        h.commands.add_command(Command::RemoveComponent { entity: e, component: 0 });
        h.add(e, 0);
        assert_eq!(h.commands.len(), 3);

        let report = h.flush();
        assert_eq!(report, FlushReport { applied: 3, rejected: 0 });
        assert!(h.entities.has_component(e, 0));
        assert!(h.commands.is_empty());
    }

    #[test]
    fn invalid_commands_are_counted_as_rejected() {
        let mut h = Harness::new();
        let e = h.entities.create_entity();
        h.commands.add_command(Command::RemoveComponent { entity: e, component: 1 });
        h.add(e, 1);
        h.add(e, 1);
        h.commands.add_command(Command::RemoveEntity { entity: Entity::from_raw(99) });
        let report = h.flush();
        assert_eq!(report, FlushReport { applied: 1, rejected: 3 });
    }

    #[test]
    fn second_flush_is_a_no_op() {
        let mut h = Harness::new();
        let e = h.entities.create_entity();
        h.add(e, 0);
        h.flush();
        assert_eq!(h.flush(), FlushReport::default());
        assert_eq!(h.components.entity_count(0), 1);
    }

    #[test]
    fn only_interested_queries_are_marked() {
        let mut h = Harness::new();
        let (qa, _) = h.queries.register(QueryKey::new([0], [], []), h.universe, &h.components, 10);
        let (qb, _) = h.queries.register(QueryKey::new([], [], [1]), h.universe, &h.components, 10);
        h.commands.register_interest(qa, &[0]);
        h.commands.register_interest(qb, &[1]);
        for handle in [qa, qb] {
            h.queries
                .get_mut(handle)
                .unwrap()
                .refresh(&h.entities, &h.components);
        }

        let e = h.entities.create_entity();
        h.add(e, 1);
        h.flush();
        assert!(!h.queries.get(qa).unwrap().is_dirty());
        assert_eq!(h.queries.get(qb).unwrap().pending(), 1);
    }

    #[test]
    fn remove_entity_marks_every_owned_type() {
        let mut h = Harness::new();
        let (qa, _) = h.queries.register(QueryKey::new([0], [], []), h.universe, &h.components, 10);
        h.commands.register_interest(qa, &[0]);
        let e = h.entities.create_entity();
        h.add(e, 0);
        h.add(e, 1);
        h.flush();
        h.queries.get_mut(qa).unwrap().refresh(&h.entities, &h.components);

        h.commands.add_command(Command::RemoveEntity { entity: e });
        h.flush();
        assert_eq!(h.queries.get(qa).unwrap().pending(), 1);
        h.queries.get_mut(qa).unwrap().refresh(&h.entities, &h.components);
        assert!(h.queries.get(qa).unwrap().is_empty());
    }
}
