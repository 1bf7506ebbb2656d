// sparse_set.rs - Dense storage keyed by entity
//
// `sparse` maps an entity id to its slot in `dense`/`entities`. Removal
// swaps the last element into the hole so both arrays stay packed.

use crate::ecs::Entity;

const EMPTY: u32 = u32::MAX;

#[derive(Debug, Clone)]
pub struct SparseSet<T> {
    sparse: Vec<u32>,
    dense: Vec<T>,
    entities: Vec<Entity>,
}

impl<T> SparseSet<T> {
    pub fn new() -> Self {
        Self {
            sparse: Vec::new(),
            dense: Vec::new(),
            entities: Vec::new(),
        }
    }

    #[inline]
    fn slot(&self, entity: Entity) -> Option<usize> {
        match self.sparse.get(entity.index()) {
            Some(&slot) if slot != EMPTY => Some(slot as usize),
            _ => None,
        }
    }

    /// Insert `value` for `entity`. Returns the value back if the entity is
    /// already present.
    pub fn add(&mut self, entity: Entity, value: T) -> Result<(), T> {
        if self.contains(entity) {
            return Err(value);
        }
        let index = entity.index();
        if index >= self.sparse.len() {
            self.sparse.resize(index + 1, EMPTY);
        }
        self.sparse[index] = self.dense.len() as u32;
        self.dense.push(value);
        self.entities.push(entity);
        Ok(())
    }

    pub fn remove(&mut self, entity: Entity) -> Option<T> {
        let slot = self.slot(entity)?;
        self.sparse[entity.index()] = EMPTY;
        let value = self.dense.swap_remove(slot);
        self.entities.swap_remove(slot);
        if let Some(moved) = self.entities.get(slot) {
            self.sparse[moved.index()] = slot as u32;
        }
        Some(value)
    }

    #[inline]
    pub fn get(&self, entity: Entity) -> Option<&T> {
        self.slot(entity).map(|slot| &self.dense[slot])
    }

    #[inline]
    pub fn get_mut(&mut self, entity: Entity) -> Option<&mut T> {
        self.slot(entity).map(move |slot| &mut self.dense[slot])
    }

    #[inline]
    pub fn contains(&self, entity: Entity) -> bool {
        self.slot(entity).is_some()
    }

    /// Owning entities in storage order.
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn values(&self) -> &[T] {
        &self.dense
    }

    pub fn iter(&self) -> impl Iterator<Item = (Entity, &T)> {
        self.entities.iter().copied().zip(self.dense.iter())
    }

    pub fn len(&self) -> usize {
        self.dense.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dense.is_empty()
    }

    /// Remove every value, handing each to `f`.
    pub fn drain_with(&mut self, mut f: impl FnMut(Entity, T)) {
        self.sparse.clear();
        for (entity, value) in self.entities.drain(..).zip(self.dense.drain(..)) {
            f(entity, value);
        }
    }
}

impl<T> Default for SparseSet<T> {
    fn default() -> Self {
        Self::new()
    }
}
