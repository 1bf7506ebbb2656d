//! Cached queries over component masks.
//!
//! Every distinct [`QueryKey`] owns exactly one [`Query`]; registering the
//! same key twice returns the existing handle. Systems read query results
//! through a [`QueryView`] obtained from the world, which refreshes the
//! cache first.

mod cache;
mod descriptor;

pub use cache::{Query, Refresh};
pub use descriptor::{QueryDescriptor, QueryKey};

use crate::ecs::storage::{ComponentPool, TypedColumn};
use crate::ecs::{Component, ComponentRef, ComponentRegistry, Entity};
use std::collections::HashMap;

/// Stable index of a registered query.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryHandle(u32);

impl QueryHandle {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Default)]
pub struct QueryRegistry {
    queries: Vec<Query>,
    by_key: HashMap<QueryKey, QueryHandle>,
}

impl QueryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the handle for `key`, creating its cache on first use.
    /// The flag is `true` when a new cache was created.
    pub(crate) fn register(
        &mut self,
        key: QueryKey,
        universe: usize,
        components: &ComponentPool,
        threshold: usize,
    ) -> (QueryHandle, bool) {
        if let Some(&handle) = self.by_key.get(&key) {
            return (handle, false);
        }
        let handle = QueryHandle(self.queries.len() as u32);
        tracing::debug!(query = %key, handle = handle.0, "registered query");
        self.by_key.insert(key.clone(), handle);
        self.queries.push(Query::new(key, universe, components, threshold));
        (handle, true)
    }

    pub fn handle(&self, key: &QueryKey) -> Option<QueryHandle> {
        self.by_key.get(key).copied()
    }

    pub fn get(&self, handle: QueryHandle) -> Option<&Query> {
        self.queries.get(handle.index())
    }

    pub(crate) fn get_mut(&mut self, handle: QueryHandle) -> Option<&mut Query> {
        self.queries.get_mut(handle.index())
    }

    pub(crate) fn mark_dirty(&mut self, handle: QueryHandle, entity: Entity) {
        if let Some(query) = self.queries.get_mut(handle.index()) {
            query.mark_dirty(entity);
        }
    }

    /// Drop every cached result; each query rebuilds on its next read.
    pub(crate) fn invalidate_all(&mut self) {
        for query in &mut self.queries {
            query.invalidate();
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (QueryHandle, &Query)> {
        self.queries
            .iter()
            .enumerate()
            .map(|(index, query)| (QueryHandle(index as u32), query))
    }

    pub fn len(&self) -> usize {
        self.queries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }
}

impl std::fmt::Debug for QueryRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.queries.iter()).finish()
    }
}

/// Read access to a refreshed query.
///
/// `entities()[i]` and `components::<T>()[i]` always describe the same
/// entity.
#[derive(Clone, Copy)]
pub struct QueryView<'w> {
    query: &'w Query,
    registry: &'w ComponentRegistry,
}

impl<'w> QueryView<'w> {
    pub(crate) fn new(query: &'w Query, registry: &'w ComponentRegistry) -> Self {
        Self { query, registry }
    }

    pub fn entities(&self) -> &'w [Entity] {
        self.query.entities()
    }

    pub fn len(&self) -> usize {
        self.query.len()
    }

    pub fn is_empty(&self) -> bool {
        self.query.is_empty()
    }

    pub fn key(&self) -> &'w QueryKey {
        self.query.key()
    }

    /// Column of `T` handles, aligned with [`Self::entities`]. Slots are
    /// `None` only for optional types the entity does not own. Returns
    /// `None` if `T` is not one of the query's include or optional types.
    pub fn components<T: Component>(&self) -> Option<&'w [Option<ComponentRef<T>>]> {
        let column = self
            .registry
            .id_of::<T>()
            .and_then(|id| self.query.column(id));
        let Some(column) = column else {
            tracing::warn!(component = T::NAME, query = %self.query.key(), "component is not a column of this query");
            return None;
        };
        column
            .as_any()
            .downcast_ref::<TypedColumn<T>>()
            .map(|column| column.slots())
    }

    /// Iterate `(entity, handle)` pairs for a required type.
    pub fn iter<T: Component>(&self) -> impl Iterator<Item = (Entity, &'w ComponentRef<T>)> + 'w {
        let entities = self.entities();
        let slots = self.components::<T>().unwrap_or_default();
        entities
            .iter()
            .copied()
            .zip(slots.iter())
            .filter_map(|(entity, slot)| slot.as_ref().map(|component| (entity, component)))
    }
}

impl std::fmt::Debug for QueryView<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryView")
            .field("key", self.query.key())
            .field("entities", &self.query.entities())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PoolSettings;
    use crate::ecs::{ComponentId, EntityPool};

    #[derive(Default)]
    struct A;
    crate::define_component!(A, "A");
    #[derive(Default)]
    struct B;
    crate::define_component!(B, "B");
    #[derive(Default)]
    struct C;
    crate::define_component!(C, "C");

    struct Harness {
        registry: ComponentRegistry,
        components: ComponentPool,
        entities: EntityPool,
        queries: QueryRegistry,
    }

    impl Harness {
        fn new() -> Self {
            let mut registry = ComponentRegistry::new();
            registry.register::<A>().unwrap();
            registry.register::<B>().unwrap();
            registry.register::<C>().unwrap();
            let settings = PoolSettings::new(8, 64);
            Self {
                components: ComponentPool::new(&registry, &settings),
                entities: EntityPool::new(registry.len(), settings, settings),
                queries: QueryRegistry::new(),
                registry,
            }
        }

        fn query(&mut self, key: QueryKey, threshold: usize) -> QueryHandle {
            self.queries
                .register(key, self.registry.len(), &self.components, threshold)
                .0
        }

        fn spawn(&mut self, types: &[ComponentId]) -> Entity {
            let entity = self.entities.create_entity();
            for &id in types {
                self.add(entity, id);
            }
            entity
        }

        fn add(&mut self, entity: Entity, id: ComponentId) {
            let instance = self.components.create_component(id).unwrap();
            self.entities
                .add_component(entity, id, instance, &mut self.components);
            self.dirty(entity);
        }

        fn remove(&mut self, entity: Entity, id: ComponentId) {
            self.entities.remove_component(entity, id, &mut self.components);
            self.dirty(entity);
        }

        fn dirty(&mut self, entity: Entity) {
            for index in 0..self.queries.len() {
                self.queries.mark_dirty(QueryHandle(index as u32), entity);
            }
        }

        fn refresh(&mut self, handle: QueryHandle) -> Refresh {
            self.queries
                .get_mut(handle)
                .unwrap()
                .refresh(&self.entities, &self.components)
        }

        fn sorted(&self, handle: QueryHandle) -> Vec<Entity> {
            let mut entities = self.queries.get(handle).unwrap().entities().to_vec();
            entities.sort();
            entities
        }
    }

    #[test]
    fn same_key_shares_one_cache() {
        let mut h = Harness::new();
        let first = h.query(QueryKey::new([1, 0], [], []), 10);
        let second = h.query(QueryKey::new([0, 1, 0], [], []), 10);
        assert_eq!(first, second);
        assert_eq!(h.queries.len(), 1);
        assert_eq!(h.queries.handle(&QueryKey::new([0, 1], [], [])), Some(first));
    }

    #[test]
    fn first_read_is_a_full_rebuild() {
        let mut h = Harness::new();
        let ab = h.spawn(&[0, 1]);
        h.spawn(&[0]);
        let q = h.query(QueryKey::new([0, 1], [], []), 10);
        assert_eq!(h.refresh(q), Refresh::Full);
        assert_eq!(h.sorted(q), vec![ab]);
        assert_eq!(h.refresh(q), Refresh::Clean);
    }

    #[test]
    fn incremental_refresh_tracks_membership() {
        let mut h = Harness::new();
        let q = h.query(QueryKey::new([0], [2], []), 10);
        h.refresh(q);

        let e = h.spawn(&[0]);
        assert_eq!(h.refresh(q), Refresh::Incremental);
        assert_eq!(h.sorted(q), vec![e]);

        h.add(e, 2);
        assert_eq!(h.refresh(q), Refresh::Incremental);
        assert!(h.sorted(q).is_empty());

        h.remove(e, 2);
        h.refresh(q);
        assert_eq!(h.sorted(q), vec![e]);
    }

    #[test]
    fn exceeding_threshold_forces_rebuild() {
        let mut h = Harness::new();
        let q = h.query(QueryKey::new([0], [], []), 2);
        h.refresh(q);
        for _ in 0..3 {
            h.spawn(&[0]);
        }
        assert_eq!(h.queries.get(q).unwrap().pending(), 0);
        assert_eq!(h.refresh(q), Refresh::Full);
        assert_eq!(h.sorted(q).len(), 3);
    }

    #[test]
    fn swap_remove_keeps_rows_aligned() {
        let mut h = Harness::new();
        let q = h.query(QueryKey::new([0], [], [1]), 10);
        let mut spawned = Vec::new();
        for i in 0..4 {
            let types: &[ComponentId] = if i % 2 == 0 { &[0, 1] } else { &[0] };
            spawned.push(h.spawn(types));
        }
        h.refresh(q);

        h.remove(spawned[0], 0);
        h.refresh(q);

        let view = QueryView::new(h.queries.get(q).unwrap(), &h.registry);
        let b = view.components::<B>().unwrap();
        assert_eq!(view.len(), 3);
        for (entity, slot) in view.entities().iter().zip(b) {
            assert_eq!(slot.is_some(), h.entities.has_component(*entity, 1));
        }
    }

    #[test]
    fn optional_only_query_matches_any_owner() {
        let mut h = Harness::new();
        let a = h.spawn(&[0]);
        let c = h.spawn(&[2]);
        let both = h.spawn(&[0, 2]);
        h.spawn(&[1]);
        let q = h.query(QueryKey::new([], [], [0, 2]), 10);
        h.refresh(q);
        assert_eq!(h.sorted(q), vec![a, c, both]);
    }

    #[test]
    fn optional_only_rebuild_keeps_key_and_columns() {
        let mut h = Harness::new();
        let key = QueryKey::new([], [1], [0, 2]);
        let q = h.query(key.clone(), 1);
        h.refresh(q);
        let a = h.spawn(&[0]);
        let c = h.spawn(&[2]);
        h.spawn(&[0, 1]);
        assert_eq!(h.refresh(q), Refresh::Full);
        assert_eq!(h.sorted(q), vec![a, c]);
        assert_eq!(h.queries.get(q).unwrap().key(), &key);
        assert_eq!(h.queries.handle(&key), Some(q));

        h.add(c, 0);
        assert_eq!(h.refresh(q), Refresh::Incremental);
        let view = QueryView::new(h.queries.get(q).unwrap(), &h.registry);
        let column = view.components::<A>().unwrap();
        for (entity, slot) in view.entities().iter().zip(column) {
            assert!(slot.is_some(), "{entity} owns A");
        }
    }

    #[test]
    fn empty_query_matches_nothing() {
        let mut h = Harness::new();
        h.spawn(&[0]);
        let q = h.query(QueryKey::default(), 10);
        h.refresh(q);
        assert!(h.sorted(q).is_empty());
    }

    #[test]
    fn view_rejects_undeclared_types() {
        let mut h = Harness::new();
        h.spawn(&[0, 1]);
        let q = h.query(QueryKey::new([0], [], []), 10);
        h.refresh(q);
        let view = QueryView::new(h.queries.get(q).unwrap(), &h.registry);
        assert!(view.components::<A>().is_some());
        assert!(view.components::<B>().is_none());
        assert_eq!(view.iter::<A>().count(), 1);
    }
}
