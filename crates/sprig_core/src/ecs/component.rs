// component.rs - Component trait and per-world type registry
//
// Components are plain Rust structs shared as `Rc<RefCell<T>>`. Each
// world freezes its registry at construction; ids are dense `0..len` and
// double as bit positions in entity masks.

use crate::config::PoolSettings;
use crate::ecs::storage::{ErasedStorage, TypedStorage};
use crate::ecs::{PropertyError, RegistrationError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::any::TypeId;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

pub type ComponentId = u32;

/// Shared handle to a live component instance.
pub type ComponentRef<T> = Rc<RefCell<T>>;

/// Template-supplied field overrides, keyed by field name.
pub type PropertyBag = serde_json::Map<String, serde_json::Value>;

/// Data attached to entities.
///
/// `Default` builds the pristine instance the pool hands out; `reset`
/// returns a recycled instance to that state.
pub trait Component: Default + 'static {
    /// Unique name used by entity templates.
    const NAME: &'static str;

    fn reset(&mut self) {
        *self = Self::default();
    }

    /// Overlay template properties. Types without serde support accept
    /// only an empty bag.
    fn assign(&mut self, props: &PropertyBag) -> Result<(), PropertyError> {
        if props.is_empty() {
            Ok(())
        } else {
            Err(PropertyError::Unsupported { component: Self::NAME })
        }
    }
}

/// Overlay `props` onto `target` field by field through its serde
/// representation. Unknown field names are rejected.
pub fn assign_fields<T>(
    target: &mut T,
    component: &'static str,
    props: &PropertyBag,
) -> Result<(), PropertyError>
where
    T: Serialize + DeserializeOwned,
{
    if props.is_empty() {
        return Ok(());
    }
    let mut value = serde_json::to_value(&*target)
        .map_err(|source| PropertyError::Invalid { component, source })?;
    let Some(fields) = value.as_object_mut() else {
        return Err(PropertyError::NotAnObject { component });
    };
    for (key, prop) in props {
        match fields.get_mut(key) {
            Some(slot) => *slot = prop.clone(),
            None => {
                return Err(PropertyError::UnknownField {
                    component,
                    field: key.clone(),
                })
            }
        }
    }
    *target =
        serde_json::from_value(value).map_err(|source| PropertyError::Invalid { component, source })?;
    Ok(())
}

/// Implement [`Component`] for a type.
///
/// ```ignore
/// define_component!(Marker, "Marker");
/// // fields can be set from templates through serde
/// define_component!(Position, "Position", serde);
/// ```
#[macro_export]
macro_rules! define_component {
    ($ty:ty, $name:expr) => {
        impl $crate::ecs::Component for $ty {
            const NAME: &'static str = $name;
        }
    };
    ($ty:ty, $name:expr, serde) => {
        impl $crate::ecs::Component for $ty {
            const NAME: &'static str = $name;

            fn assign(
                &mut self,
                props: &$crate::ecs::PropertyBag,
            ) -> ::std::result::Result<(), $crate::ecs::PropertyError> {
                $crate::ecs::assign_fields(self, Self::NAME, props)
            }
        }
    };
}

/// Metadata recorded for every registered component type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ComponentMeta {
    pub id: ComponentId,
    pub name: &'static str,
    pub type_id: TypeId,
}

type StorageFactory = fn(&PoolSettings) -> Box<dyn ErasedStorage>;

/// Closed set of component types known to one world.
#[derive(Default)]
pub struct ComponentRegistry {
    metas: Vec<ComponentMeta>,
    by_type: HashMap<TypeId, ComponentId>,
    by_name: HashMap<&'static str, ComponentId>,
    factories: Vec<StorageFactory>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `T` and return its dense id.
    pub fn register<T: Component>(&mut self) -> Result<ComponentId, RegistrationError> {
        let type_id = TypeId::of::<T>();
        if let Some(&existing) = self.by_type.get(&type_id) {
            return Err(RegistrationError::DuplicateComponent { name: T::NAME, existing });
        }
        if let Some(&existing) = self.by_name.get(T::NAME) {
            return Err(RegistrationError::DuplicateName { name: T::NAME, existing });
        }

        let id = self.metas.len() as ComponentId;
        self.metas.push(ComponentMeta { id, name: T::NAME, type_id });
        self.by_type.insert(type_id, id);
        self.by_name.insert(T::NAME, id);
        self.factories.push(TypedStorage::<T>::boxed);
        tracing::debug!(component = T::NAME, id, "registered component");
        Ok(id)
    }

    /// Builder-style [`Self::register`].
    pub fn with<T: Component>(mut self) -> Result<Self, RegistrationError> {
        self.register::<T>()?;
        Ok(self)
    }

    pub fn id_of<T: Component>(&self) -> Option<ComponentId> {
        self.id_of_type(TypeId::of::<T>())
    }

    pub fn id_of_type(&self, type_id: TypeId) -> Option<ComponentId> {
        self.by_type.get(&type_id).copied()
    }

    pub fn id_by_name(&self, name: &str) -> Option<ComponentId> {
        self.by_name.get(name).copied()
    }

    pub fn meta(&self, id: ComponentId) -> Option<&ComponentMeta> {
        self.metas.get(id as usize)
    }

    pub fn name_of(&self, id: ComponentId) -> Option<&'static str> {
        self.meta(id).map(|meta| meta.name)
    }

    pub fn contains_id(&self, id: ComponentId) -> bool {
        (id as usize) < self.metas.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ComponentMeta> {
        self.metas.iter()
    }

    /// Number of registered types; the mask universe.
    pub fn len(&self) -> usize {
        self.metas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metas.is_empty()
    }

    pub(crate) fn build_storages(&self, settings: &PoolSettings) -> Vec<Box<dyn ErasedStorage>> {
        self.factories.iter().map(|factory| factory(settings)).collect()
    }
}

impl std::fmt::Debug for ComponentRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.metas.iter().map(|m| (m.id, m.name))).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Default, Debug, PartialEq, Serialize, Deserialize)]
    struct Health {
        current: i32,
        max: i32,
    }
    define_component!(Health, "Health", serde);

    #[derive(Default)]
    struct Frozen;
    define_component!(Frozen, "Frozen");

    #[derive(Default)]
    struct Impostor;
    define_component!(Impostor, "Health");

    fn bag(json: serde_json::Value) -> PropertyBag {
        json.as_object().cloned().unwrap()
    }

    #[test]
    fn ids_are_dense_in_registration_order() {
        let mut registry = ComponentRegistry::new();
        assert_eq!(registry.register::<Health>().unwrap(), 0);
        assert_eq!(registry.register::<Frozen>().unwrap(), 1);
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.id_of::<Frozen>(), Some(1));
        assert_eq!(registry.id_by_name("Health"), Some(0));
        assert_eq!(registry.name_of(1), Some("Frozen"));
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut registry = ComponentRegistry::new();
        registry.register::<Health>().unwrap();
        assert!(matches!(
            registry.register::<Health>(),
            Err(RegistrationError::DuplicateComponent { existing: 0, .. })
        ));
        assert!(matches!(
            registry.register::<Impostor>(),
            Err(RegistrationError::DuplicateName { name: "Health", .. })
        ));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn serde_components_accept_partial_properties() {
        let mut health = Health { current: 1, max: 10 };
        health.assign(&bag(serde_json::json!({ "current": 7 }))).unwrap();
        assert_eq!(health, Health { current: 7, max: 10 });
    }

    #[test]
    fn unknown_and_mistyped_fields_are_rejected() {
        let mut health = Health::default();
        assert!(matches!(
            health.assign(&bag(serde_json::json!({ "armor": 3 }))),
            Err(PropertyError::UnknownField { .. })
        ));
        assert!(matches!(
            health.assign(&bag(serde_json::json!({ "max": "lots" }))),
            Err(PropertyError::Invalid { .. })
        ));
    }

    #[test]
    fn plain_components_only_accept_empty_bags() {
        let mut frozen = Frozen;
        assert!(frozen.assign(&PropertyBag::new()).is_ok());
        assert!(matches!(
            frozen.assign(&bag(serde_json::json!({ "x": 1 }))),
            Err(PropertyError::Unsupported { component: "Frozen" })
        ));
    }

    #[test]
    fn reset_restores_default() {
        let mut health = Health { current: 3, max: 9 };
        health.reset();
        assert_eq!(health, Health::default());
    }
}
