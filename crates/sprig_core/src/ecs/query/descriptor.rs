use crate::ecs::{Component, ComponentId, ComponentRegistry, WorldError};
use std::any::TypeId;
use std::fmt;

/// Canonical id-level description of a query.
///
/// Each list is sorted and deduplicated on construction, so two keys built
/// from the same sets in any order compare equal and share one cache.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct QueryKey {
    include: Vec<ComponentId>,
    exclude: Vec<ComponentId>,
    optional: Vec<ComponentId>,
}

impl QueryKey {
    pub fn new(
        include: impl IntoIterator<Item = ComponentId>,
        exclude: impl IntoIterator<Item = ComponentId>,
        optional: impl IntoIterator<Item = ComponentId>,
    ) -> Self {
        Self {
            include: sanitize(include),
            exclude: sanitize(exclude),
            optional: sanitize(optional),
        }
    }

    pub fn include(&self) -> &[ComponentId] {
        &self.include
    }

    pub fn exclude(&self) -> &[ComponentId] {
        &self.exclude
    }

    pub fn optional(&self) -> &[ComponentId] {
        &self.optional
    }

    /// Types a query exposes columns for: include ∪ optional.
    pub fn column_types(&self) -> Vec<ComponentId> {
        sanitize(self.include.iter().chain(&self.optional).copied())
    }

    /// Every type whose changes can alter membership or column contents.
    pub fn interest(&self) -> Vec<ComponentId> {
        sanitize(
            self.include
                .iter()
                .chain(&self.exclude)
                .chain(&self.optional)
                .copied(),
        )
    }

    pub(crate) fn validate(&self, registry: &ComponentRegistry) -> Result<(), WorldError> {
        match self.interest().into_iter().find(|&id| !registry.contains_id(id)) {
            Some(id) => Err(WorldError::UnknownComponentId { id }),
            None => Ok(()),
        }
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let join = |ids: &[ComponentId]| {
            ids.iter()
                .map(ComponentId::to_string)
                .collect::<Vec<_>>()
                .join("&")
        };
        write!(
            f,
            "{}|{}|{}",
            join(&self.include),
            join(&self.exclude),
            join(&self.optional)
        )
    }
}

fn sanitize(ids: impl IntoIterator<Item = ComponentId>) -> Vec<ComponentId> {
    let mut ids: Vec<_> = ids.into_iter().collect();
    ids.sort_unstable();
    ids.dedup();
    ids
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct TypeRef {
    type_id: TypeId,
    name: &'static str,
}

impl TypeRef {
    fn of<T: Component>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            name: T::NAME,
        }
    }
}

/// Type-level query declaration, resolved to a [`QueryKey`] against a
/// world's registry.
///
/// ```ignore
/// QueryDescriptor::new()
///     .with::<Position>()
///     .with::<Velocity>()
///     .without::<Frozen>()
///     .optional::<Tint>()
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QueryDescriptor {
    include: Vec<TypeRef>,
    exclude: Vec<TypeRef>,
    optional: Vec<TypeRef>,
}

impl QueryDescriptor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Require `T`.
    pub fn with<T: Component>(mut self) -> Self {
        self.include.push(TypeRef::of::<T>());
        self
    }

    /// Reject entities owning `T`.
    pub fn without<T: Component>(mut self) -> Self {
        self.exclude.push(TypeRef::of::<T>());
        self
    }

    /// Expose `T` as a column when present.
    pub fn optional<T: Component>(mut self) -> Self {
        self.optional.push(TypeRef::of::<T>());
        self
    }

    pub fn resolve(&self, registry: &ComponentRegistry) -> Result<QueryKey, WorldError> {
        let lookup = |types: &[TypeRef]| -> Result<Vec<ComponentId>, WorldError> {
            types
                .iter()
                .map(|ty| {
                    registry
                        .id_of_type(ty.type_id)
                        .ok_or(WorldError::UnregisteredComponent { name: ty.name })
                })
                .collect()
        };
        Ok(QueryKey::new(
            lookup(&self.include)?,
            lookup(&self.exclude)?,
            lookup(&self.optional)?,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct A;
    crate::define_component!(A, "A");
    #[derive(Default)]
    struct B;
    crate::define_component!(B, "B");
    #[derive(Default)]
    struct C;
    crate::define_component!(C, "C");

    #[test]
    fn keys_are_order_and_duplicate_insensitive() {
        let a = QueryKey::new([3, 1, 1], [5], []);
        let b = QueryKey::new([1, 3], [5, 5], []);
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "1&3|5|");
    }

    #[test]
    fn column_and_interest_sets() {
        let key = QueryKey::new([2, 0], [1], [2, 4]);
        assert_eq!(key.column_types(), vec![0, 2, 4]);
        assert_eq!(key.interest(), vec![0, 1, 2, 4]);
    }

    #[test]
    fn descriptor_resolves_against_registry() {
        let mut registry = ComponentRegistry::new();
        registry.register::<A>().unwrap();
        registry.register::<B>().unwrap();
        let key = QueryDescriptor::new()
            .with::<B>()
            .with::<A>()
            .without::<B>()
            .resolve(&registry)
            .unwrap();
        assert_eq!(key, QueryKey::new([0, 1], [1], []));

        let err = QueryDescriptor::new().optional::<C>().resolve(&registry).unwrap_err();
        assert!(matches!(err, WorldError::UnregisteredComponent { name: "C" }));
    }

    #[test]
    fn validate_rejects_unknown_ids() {
        let mut registry = ComponentRegistry::new();
        registry.register::<A>().unwrap();
        assert!(QueryKey::new([0], [], []).validate(&registry).is_ok());
        assert!(QueryKey::new([0], [], [7]).validate(&registry).is_err());
    }
}
