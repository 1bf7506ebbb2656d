// cache.rs - Cached query results
//
// A query keeps its matched entities and one column per exposed type in
// lockstep. Structural changes mark entities dirty; the next read patches
// just those entities, or rebuilds from scratch once too many are pending.

use super::QueryKey;
use crate::ecs::storage::{Column, ComponentPool};
use crate::ecs::{ComponentId, Entity, EntityPool, Mask};
use std::collections::{HashMap, HashSet};

/// How a refresh brought the cache up to date.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Refresh {
    /// Already current.
    Clean,
    /// Only the dirty entities were re-evaluated.
    Incremental,
    /// Every candidate was re-evaluated.
    Full,
}

enum Candidates {
    /// Scan the owners of this include type.
    Owners(ComponentId),
    /// Some include type has no owners, so nothing can match.
    Nothing,
    /// No include types: scan owners of every optional type.
    OptionalOwners,
}

pub struct Query {
    key: QueryKey,
    include_mask: Mask,
    exclude_mask: Mask,
    optional_mask: Mask,
    column_types: Vec<ComponentId>,
    columns: Vec<Box<dyn Column>>,
    entities: Vec<Entity>,
    matches: HashMap<Entity, usize>,
    pending: Vec<Entity>,
    pending_set: HashSet<Entity>,
    needs_rebuild: bool,
    threshold: usize,
}

impl Query {
    pub(crate) fn new(
        key: QueryKey,
        universe: usize,
        components: &ComponentPool,
        threshold: usize,
    ) -> Self {
        let to_mask = |ids: &[ComponentId]| Mask::from_bits(universe, ids.iter().map(|&id| id as usize));
        let column_types = key.column_types();
        let columns = column_types
            .iter()
            .filter_map(|&id| components.new_column(id))
            .collect();

        Self {
            include_mask: to_mask(key.include()),
            exclude_mask: to_mask(key.exclude()),
            optional_mask: to_mask(key.optional()),
            key,
            column_types,
            columns,
            entities: Vec::new(),
            matches: HashMap::new(),
            pending: Vec::new(),
            pending_set: HashSet::new(),
            needs_rebuild: true,
            threshold,
        }
    }

    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    /// Membership predicate over an entity's mask.
    ///
    /// With include types: owns all of them and none of the excluded.
    /// Without: owns at least one optional type and none of the excluded.
    pub fn matches(&self, mask: &Mask) -> bool {
        if mask.any(&self.exclude_mask) {
            return false;
        }
        if self.include_mask.is_empty() {
            mask.any(&self.optional_mask)
        } else {
            mask.include(&self.include_mask)
        }
    }

    /// Cached entities. Only current after a refresh.
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn is_dirty(&self) -> bool {
        self.needs_rebuild || !self.pending.is_empty()
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub(crate) fn column(&self, id: ComponentId) -> Option<&dyn Column> {
        self.column_types
            .binary_search(&id)
            .ok()
            .and_then(|index| self.columns.get(index))
            .map(|column| column.as_ref())
    }

    /// Note that `entity` changed in a way this query cares about.
    pub(crate) fn mark_dirty(&mut self, entity: Entity) {
        if self.needs_rebuild {
            return;
        }
        if self.pending_set.insert(entity) {
            self.pending.push(entity);
        }
        if self.pending.len() > self.threshold {
            tracing::debug!(query = %self.key, pending = self.pending.len(), "dirty set over threshold, scheduling rebuild");
            self.needs_rebuild = true;
            self.clear_pending();
        }
    }

    /// Force the next refresh to rebuild from scratch.
    pub(crate) fn invalidate(&mut self) {
        self.needs_rebuild = true;
        self.clear_pending();
    }

    pub(crate) fn refresh(&mut self, entities: &EntityPool, components: &ComponentPool) -> Refresh {
        if self.needs_rebuild {
            self.rebuild(entities, components);
            self.needs_rebuild = false;
            self.clear_pending();
            Refresh::Full
        } else if !self.pending.is_empty() {
            let pending = std::mem::take(&mut self.pending);
            for &entity in &pending {
                self.reevaluate(entity, entities, components);
            }
            self.pending = pending;
            self.clear_pending();
            Refresh::Incremental
        } else {
            Refresh::Clean
        }
    }

    fn reevaluate(&mut self, entity: Entity, entities: &EntityPool, components: &ComponentPool) {
        let matched = entities.mask(entity).is_some_and(|mask| self.matches(mask));
        match (matched, self.matches.get(&entity).copied()) {
            (true, Some(index)) => {
                components.fill_columns(entity, &self.column_types, &mut self.columns, index)
            }
            (true, None) => self.append(entity, components),
            (false, Some(index)) => self.swap_remove(index),
            (false, None) => {}
        }
    }

    fn rebuild(&mut self, entities: &EntityPool, components: &ComponentPool) {
        self.entities.clear();
        self.matches.clear();
        for column in &mut self.columns {
            column.clear();
        }

        match self.candidates(components) {
            Candidates::Nothing => {}
            Candidates::Owners(id) => {
                for &entity in components.entities_by_type(id) {
                    if entities.mask(entity).is_some_and(|mask| self.matches(mask)) {
                        self.append(entity, components);
                    }
                }
            }
            Candidates::OptionalOwners => {
                let mut seen = HashSet::new();
                let key = std::mem::take(&mut self.key);
                for &id in key.optional() {
                    for &entity in components.entities_by_type(id) {
                        if seen.insert(entity)
                            && entities.mask(entity).is_some_and(|mask| self.matches(mask))
                        {
                            self.append(entity, components);
                        }
                    }
                }
                self.key = key;
            }
        }
        tracing::trace!(query = %self.key, matched = self.entities.len(), "query rebuilt");
    }

    // Scarcest include type bounds the candidate set.
    fn candidates(&self, components: &ComponentPool) -> Candidates {
        let scarcest = self
            .key
            .include()
            .iter()
            .map(|&id| (components.entity_count(id), id))
            .min();
        match scarcest {
            None => Candidates::OptionalOwners,
            Some((0, _)) => Candidates::Nothing,
            Some((_, id)) => Candidates::Owners(id),
        }
    }

    fn append(&mut self, entity: Entity, components: &ComponentPool) {
        let index = self.entities.len();
        self.entities.push(entity);
        self.matches.insert(entity, index);
        components.fill_columns(entity, &self.column_types, &mut self.columns, index);
        debug_assert!(self.columns.iter().all(|column| column.len() == self.entities.len()));
    }

    fn swap_remove(&mut self, index: usize) {
        let removed = self.entities.swap_remove(index);
        self.matches.remove(&removed);
        if let Some(&moved) = self.entities.get(index) {
            self.matches.insert(moved, index);
        }
        for column in &mut self.columns {
            column.swap_remove(index);
        }
    }

    fn clear_pending(&mut self) {
        self.pending.clear();
        self.pending_set.clear();
    }
}

impl std::fmt::Debug for Query {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Query")
            .field("key", &self.key)
            .field("entities", &self.entities.len())
            .field("pending", &self.pending.len())
            .field("needs_rebuild", &self.needs_rebuild)
            .finish()
    }
}
