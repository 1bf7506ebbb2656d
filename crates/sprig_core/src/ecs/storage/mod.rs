// mod.rs - Per-type component storage
//
// `ComponentPool` owns one erased storage per registered type, indexed by
// component id.

mod column;
mod typed;

pub(crate) use column::{Column, TypedColumn};
pub use typed::ErasedComponent;
pub(crate) use typed::{ErasedStorage, TypedStorage};

use crate::config::PoolSettings;
use crate::ecs::{
    Component, ComponentId, ComponentRef, ComponentRegistry, Entity, PropertyBag, WorldError,
};

pub struct ComponentPool {
    storages: Vec<Box<dyn ErasedStorage>>,
}

impl ComponentPool {
    pub(crate) fn new(registry: &ComponentRegistry, settings: &PoolSettings) -> Self {
        Self {
            storages: registry.build_storages(settings),
        }
    }

    pub(crate) fn storage(&self, id: ComponentId) -> Option<&dyn ErasedStorage> {
        self.storages.get(id as usize).map(|s| s.as_ref())
    }

    fn storage_mut(&mut self, id: ComponentId) -> Result<&mut Box<dyn ErasedStorage>, WorldError> {
        self.storages
            .get_mut(id as usize)
            .ok_or(WorldError::UnknownComponentId { id })
    }

    pub(crate) fn typed_mut<T: Component>(
        &mut self,
        id: ComponentId,
    ) -> Option<&mut TypedStorage<T>> {
        self.storages
            .get_mut(id as usize)?
            .as_any_mut()
            .downcast_mut::<TypedStorage<T>>()
    }

    pub(crate) fn typed<T: Component>(&self, id: ComponentId) -> Option<&TypedStorage<T>> {
        self.storages
            .get(id as usize)?
            .as_any()
            .downcast_ref::<TypedStorage<T>>()
    }

    pub(crate) fn create_component(&mut self, id: ComponentId) -> Result<ErasedComponent, WorldError> {
        Ok(self.storage_mut(id)?.create())
    }

    pub(crate) fn create_component_with(
        &mut self,
        id: ComponentId,
        props: &PropertyBag,
    ) -> Result<ErasedComponent, WorldError> {
        Ok(self.storage_mut(id)?.create_with(props)?)
    }

    pub(crate) fn attach(
        &mut self,
        entity: Entity,
        id: ComponentId,
        instance: ErasedComponent,
    ) -> Result<(), ErasedComponent> {
        match self.storages.get_mut(id as usize) {
            Some(storage) => storage.attach(entity, instance),
            None => Err(instance),
        }
    }

    pub(crate) fn detach(&mut self, entity: Entity, id: ComponentId) -> bool {
        self.storages
            .get_mut(id as usize)
            .is_some_and(|storage| storage.detach(entity))
    }

    pub(crate) fn recycle(&mut self, id: ComponentId, instance: ErasedComponent) {
        if let Some(storage) = self.storages.get_mut(id as usize) {
            storage.recycle(instance);
        }
    }

    /// Write one slot of every column in `columns` for `entity`.
    /// `types[i]` names the component type held by `columns[i]`.
    pub(crate) fn fill_columns(
        &self,
        entity: Entity,
        types: &[ComponentId],
        columns: &mut [Box<dyn Column>],
        index: usize,
    ) {
        for (&id, column) in types.iter().zip(columns.iter_mut()) {
            if let Some(storage) = self.storage(id) {
                storage.fill(entity, column.as_mut(), index);
            }
        }
    }

    pub(crate) fn new_column(&self, id: ComponentId) -> Option<Box<dyn Column>> {
        self.storage(id).map(|storage| storage.new_column())
    }

    /// Type-erased instance attached to `entity`.
    pub fn get_component(&self, entity: Entity, id: ComponentId) -> Option<ErasedComponent> {
        self.storage(id)?.get(entity)
    }

    pub fn get<T: Component>(&self, entity: Entity, id: ComponentId) -> Option<ComponentRef<T>> {
        self.typed::<T>(id)?.get_typed(entity).cloned()
    }

    pub fn contains(&self, entity: Entity, id: ComponentId) -> bool {
        self.storage(id).is_some_and(|storage| storage.contains(entity))
    }

    /// Number of entities owning type `id`.
    pub fn entity_count(&self, id: ComponentId) -> usize {
        self.storage(id).map_or(0, |storage| storage.len())
    }

    /// Entities owning type `id`, in storage order.
    pub fn entities_by_type(&self, id: ComponentId) -> &[Entity] {
        self.storage(id).map_or(&[], |storage| storage.entities())
    }

    /// Idle instances waiting in the recycle pool for type `id`.
    pub fn idle(&self, id: ComponentId) -> usize {
        self.storage(id).map_or(0, |storage| storage.idle())
    }

    pub fn pool_capacity(&self, id: ComponentId) -> usize {
        self.storage(id).map_or(0, |storage| storage.capacity())
    }

    pub fn type_count(&self) -> usize {
        self.storages.len()
    }

    pub(crate) fn clear(&mut self) {
        for storage in &mut self.storages {
            storage.clear();
        }
    }
}

impl std::fmt::Debug for ComponentPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(self.storages.iter().map(|s| (s.name(), s.len())))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct A(u8);
    crate::define_component!(A, "A");

    #[derive(Default)]
    struct B;
    crate::define_component!(B, "B");

    fn pool() -> ComponentPool {
        let mut registry = ComponentRegistry::new();
        registry.register::<A>().unwrap();
        registry.register::<B>().unwrap();
        ComponentPool::new(&registry, &PoolSettings::new(4, 16))
    }

    #[test]
    fn attach_and_typed_get() {
        let mut pool = pool();
        let e = Entity::from_raw(0);
        let instance = pool.create_component(0).unwrap();
        assert!(pool.attach(e, 0, instance).is_ok());
        pool.get::<A>(e, 0).unwrap().borrow_mut().0 = 5;
        assert_eq!(pool.get::<A>(e, 0).unwrap().borrow().0, 5);
        assert!(pool.get::<B>(e, 0).is_none());
        assert_eq!(pool.entity_count(0), 1);
        assert_eq!(pool.entities_by_type(0), &[e]);
        assert!(pool.contains(e, 0));
        assert!(!pool.contains(e, 1));
    }

    #[test]
    fn unknown_ids_are_harmless() {
        let mut pool = pool();
        assert!(matches!(
            pool.create_component(9),
            Err(WorldError::UnknownComponentId { id: 9 })
        ));
        assert!(!pool.detach(Entity::from_raw(0), 9));
        assert_eq!(pool.entity_count(9), 0);
        assert!(pool.entities_by_type(9).is_empty());
    }

    #[test]
    fn clear_returns_instances_to_pools() {
        let mut pool = pool();
        for id in 0..3 {
            let instance = pool.create_component(1).unwrap();
            pool.attach(Entity::from_raw(id), 1, instance).ok().unwrap();
        }
        assert_eq!(pool.idle(1), 1);
        pool.clear();
        assert_eq!(pool.entity_count(1), 0);
        assert_eq!(pool.idle(1), 4);
    }
}
