use super::column::{Column, TypedColumn};
use crate::config::PoolSettings;
use crate::ecs::sparse_set::SparseSet;
use crate::ecs::{Component, ComponentRef, Entity, PropertyBag, PropertyError};
use crate::pool::RecyclePool;
use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

/// A component instance with its concrete type erased.
pub type ErasedComponent = Rc<dyn Any>;

/// Object-safe view over one component type's storage.
pub(crate) trait ErasedStorage {
    fn name(&self) -> &'static str;
    /// Number of entities owning this type.
    fn len(&self) -> usize;
    /// Owning entities in storage order.
    fn entities(&self) -> &[Entity];
    fn contains(&self, entity: Entity) -> bool;

    /// Pop a pristine instance from the pool.
    fn create(&mut self) -> ErasedComponent;
    /// Pop an instance and overlay `props`. A failed overlay returns the
    /// instance to the pool.
    fn create_with(&mut self, props: &PropertyBag) -> Result<ErasedComponent, PropertyError>;
    /// Attach `instance` to `entity`. Hands the instance back if the
    /// entity already owns this type or the instance has the wrong type.
    fn attach(&mut self, entity: Entity, instance: ErasedComponent) -> Result<(), ErasedComponent>;
    /// Detach and recycle. Returns `false` if the entity did not own it.
    fn detach(&mut self, entity: Entity) -> bool;
    /// Return an unattached instance to the pool.
    fn recycle(&mut self, instance: ErasedComponent);
    fn get(&self, entity: Entity) -> Option<ErasedComponent>;

    fn new_column(&self) -> Box<dyn Column>;
    /// Write `entity`'s instance (or `None`) into slot `index` of `column`.
    fn fill(&self, entity: Entity, column: &mut dyn Column, index: usize);

    fn idle(&self) -> usize;
    fn capacity(&self) -> usize;
    /// Detach every instance back into the pool.
    fn clear(&mut self);

    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Sparse set of live instances plus the recycle pool feeding it.
pub(crate) struct TypedStorage<T: Component> {
    set: SparseSet<ComponentRef<T>>,
    pool: RecyclePool<ComponentRef<T>>,
}

impl<T: Component> TypedStorage<T> {
    pub(crate) fn new(settings: &PoolSettings) -> Self {
        let pool = RecyclePool::new(
            format!("ComponentPool-{}", T::NAME),
            settings.initial,
            settings.ceiling,
            || Rc::new(RefCell::new(T::default())),
        )
        .with_reset(|component: &mut ComponentRef<T>| {
            if let Ok(mut value) = component.try_borrow_mut() {
                value.reset();
            }
        });
        Self {
            set: SparseSet::new(),
            pool,
        }
    }

    pub(crate) fn boxed(settings: &PoolSettings) -> Box<dyn ErasedStorage> {
        Box::new(Self::new(settings))
    }

    pub(crate) fn create_typed(&mut self) -> ComponentRef<T> {
        self.pool.pop()
    }

    pub(crate) fn get_typed(&self, entity: Entity) -> Option<&ComponentRef<T>> {
        self.set.get(entity)
    }

    fn recycle_typed(&mut self, instance: ComponentRef<T>) {
        // An instance mutably borrowed somewhere cannot be reset; let it go.
        if instance.try_borrow_mut().is_err() {
            tracing::warn!(component = T::NAME, "component still borrowed on removal, not recycled");
            return;
        }
        self.pool.insert(instance);
    }
}

impl<T: Component> ErasedStorage for TypedStorage<T> {
    fn name(&self) -> &'static str {
        T::NAME
    }

    fn len(&self) -> usize {
        self.set.len()
    }

    fn entities(&self) -> &[Entity] {
        self.set.entities()
    }

    fn contains(&self, entity: Entity) -> bool {
        self.set.contains(entity)
    }

    fn create(&mut self) -> ErasedComponent {
        self.create_typed()
    }

    fn create_with(&mut self, props: &PropertyBag) -> Result<ErasedComponent, PropertyError> {
        let instance = self.pool.pop();
        let assigned = instance.borrow_mut().assign(props);
        match assigned {
            Ok(()) => Ok(instance as ErasedComponent),
            Err(err) => {
                self.recycle_typed(instance);
                Err(err)
            }
        }
    }

    fn attach(&mut self, entity: Entity, instance: ErasedComponent) -> Result<(), ErasedComponent> {
        let typed = instance.downcast::<RefCell<T>>()?;
        self.set.add(entity, typed).map_err(|typed| typed as ErasedComponent)
    }

    fn detach(&mut self, entity: Entity) -> bool {
        match self.set.remove(entity) {
            Some(instance) => {
                self.recycle_typed(instance);
                true
            }
            None => false,
        }
    }

    fn recycle(&mut self, instance: ErasedComponent) {
        match instance.downcast::<RefCell<T>>() {
            Ok(typed) => self.recycle_typed(typed),
            Err(_) => tracing::warn!(component = T::NAME, "refusing to recycle instance of another type"),
        }
    }

    fn get(&self, entity: Entity) -> Option<ErasedComponent> {
        self.set
            .get(entity)
            .map(|instance| Rc::clone(instance) as ErasedComponent)
    }

    fn new_column(&self) -> Box<dyn Column> {
        Box::new(TypedColumn::<T>::new())
    }

    fn fill(&self, entity: Entity, column: &mut dyn Column, index: usize) {
        let Some(column) = column.as_any_mut().downcast_mut::<TypedColumn<T>>() else {
            debug_assert!(false, "column type mismatch for {}", T::NAME);
            return;
        };
        column.put(index, self.set.get(entity).cloned());
    }

    fn idle(&self) -> usize {
        self.pool.idle()
    }

    fn capacity(&self) -> usize {
        self.pool.capacity()
    }

    fn clear(&mut self) {
        let mut drained = Vec::with_capacity(self.set.len());
        self.set.drain_with(|_, instance| drained.push(instance));
        for instance in drained {
            self.recycle_typed(instance);
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
