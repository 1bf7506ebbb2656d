//! Entity ids and the per-entity component records
//!
//! Entities are plain `u32` ids handed out by a recycle pool. There is no
//! generation counter: a removed entity's id is reused by later spawns.

use crate::config::PoolSettings;
use crate::ecs::storage::{ComponentPool, ErasedComponent};
use crate::ecs::{ComponentId, Mask};
use crate::pool::RecyclePool;
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Entity handle
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Entity(u32);

impl Entity {
    pub const fn from_raw(id: u32) -> Self {
        Self(id)
    }

    pub const fn id(self) -> u32 {
        self.0
    }

    #[inline]
    pub(crate) const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What an entity currently owns.
#[derive(Debug)]
struct EntityRecord {
    mask: Mask,
    components: Vec<ComponentId>,
}

/// Owns entity ids, masks and the owned-type list of every entity.
pub struct EntityPool {
    ids: RecyclePool<Entity>,
    masks: RecyclePool<Mask>,
    records: HashMap<Entity, EntityRecord>,
    allocated: HashSet<Entity>,
    universe: usize,
    id_settings: PoolSettings,
}

impl EntityPool {
    pub(crate) fn new(universe: usize, id_settings: PoolSettings, mask_settings: PoolSettings) -> Self {
        let masks = RecyclePool::new(
            "MaskPool",
            mask_settings.initial,
            mask_settings.ceiling,
            move || Mask::new(universe),
        )
        .with_reset(Mask::clear);

        Self {
            ids: Self::id_pool(id_settings),
            masks,
            records: HashMap::new(),
            allocated: HashSet::new(),
            universe,
            id_settings,
        }
    }

    fn id_pool(settings: PoolSettings) -> RecyclePool<Entity> {
        let mut next = 0u32;
        RecyclePool::new("EntityPool", settings.initial, settings.ceiling, move || {
            let entity = Entity(next);
            next += 1;
            entity
        })
    }

    /// Allocate an id. The entity owns nothing until commands are flushed.
    pub(crate) fn create_entity(&mut self) -> Entity {
        let entity = self.ids.pop();
        self.allocated.insert(entity);
        entity
    }

    /// Attach `instance` and update the mask. A rejected instance goes
    /// back to its pool.
    pub(crate) fn add_component(
        &mut self,
        entity: Entity,
        id: ComponentId,
        instance: ErasedComponent,
        components: &mut ComponentPool,
    ) -> bool {
        if !self.allocated.contains(&entity) {
            tracing::warn!(%entity, component = id, "add on unallocated entity ignored");
            components.recycle(id, instance);
            return false;
        }
        if id as usize >= self.universe {
            tracing::warn!(%entity, component = id, "add of unregistered component id ignored");
            return false;
        }
        if let Err(instance) = components.attach(entity, id, instance) {
            tracing::warn!(%entity, component = id, "entity already owns component, add ignored");
            components.recycle(id, instance);
            return false;
        }

        let masks = &mut self.masks;
        let record = self.records.entry(entity).or_insert_with(|| EntityRecord {
            mask: masks.pop(),
            components: Vec::new(),
        });
        record.mask.set(id as usize);
        record.components.push(id);
        true
    }

    /// Detach one component. Removing the last component releases the
    /// mask and recycles the id.
    pub(crate) fn remove_component(
        &mut self,
        entity: Entity,
        id: ComponentId,
        components: &mut ComponentPool,
    ) -> bool {
        let Some(record) = self.records.get_mut(&entity) else {
            tracing::warn!(%entity, component = id, "remove on entity without components ignored");
            return false;
        };
        if !record.mask.has(id as usize) {
            tracing::warn!(%entity, component = id, "entity does not own component, remove ignored");
            return false;
        }

        components.detach(entity, id);
        record.mask.delete(id as usize);
        record.components.retain(|&owned| owned != id);
        if record.components.is_empty() {
            if let Some(record) = self.records.remove(&entity) {
                self.masks.insert(record.mask);
            }
            self.allocated.remove(&entity);
            self.ids.insert(entity);
        }
        true
    }

    /// Detach everything the entity owns and recycle its id. Returns the
    /// types it owned, or `None` if the id was not allocated.
    pub(crate) fn remove_entity(
        &mut self,
        entity: Entity,
        components: &mut ComponentPool,
    ) -> Option<Vec<ComponentId>> {
        if !self.allocated.remove(&entity) {
            tracing::warn!(%entity, "remove of unallocated entity ignored");
            return None;
        }
        let owned = match self.records.remove(&entity) {
            Some(record) => {
                for &id in &record.components {
                    components.detach(entity, id);
                }
                self.masks.insert(record.mask);
                record.components
            }
            None => Vec::new(),
        };
        self.ids.insert(entity);
        Some(owned)
    }

    pub fn is_alive(&self, entity: Entity) -> bool {
        self.allocated.contains(&entity)
    }

    /// Mask of owned types; `None` for entities owning nothing.
    pub fn mask(&self, entity: Entity) -> Option<&Mask> {
        self.records.get(&entity).map(|record| &record.mask)
    }

    /// Owned types in attachment order.
    pub fn components_of(&self, entity: Entity) -> &[ComponentId] {
        self.records
            .get(&entity)
            .map(|record| record.components.as_slice())
            .unwrap_or_default()
    }

    pub fn has_component(&self, entity: Entity, id: ComponentId) -> bool {
        self.mask(entity).is_some_and(|mask| mask.has(id as usize))
    }

    /// Entities owning at least one component.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Allocated ids, including entities that own nothing yet.
    pub fn allocated(&self) -> usize {
        self.allocated.len()
    }

    pub fn universe(&self) -> usize {
        self.universe
    }

    /// Forget every entity and restart id allocation from zero.
    pub(crate) fn clear(&mut self) {
        for (_, record) in self.records.drain() {
            self.masks.insert(record.mask);
        }
        self.allocated.clear();
        self.ids = Self::id_pool(self.id_settings);
    }
}

impl fmt::Debug for EntityPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityPool")
            .field("populated", &self.records.len())
            .field("allocated", &self.allocated.len())
            .field("universe", &self.universe)
            .finish()
    }
}
