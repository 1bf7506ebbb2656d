// world.rs - ECS world: entities, deferred commands, cached queries, systems
//
// Structural changes never apply immediately. They are queued and applied
// by `flush`, which `update` runs before walking the system tree, so every
// system in a frame sees the same entity set.

use crate::config::WorldConfig;
use crate::ecs::command::{Command, CommandPool, FlushReport};
use crate::ecs::query::{QueryDescriptor, QueryHandle, QueryKey, QueryRegistry, QueryView, Refresh};
use crate::ecs::storage::{ComponentPool, ErasedComponent};
use crate::ecs::system::{System, SystemGroup};
use crate::ecs::{
    Component, ComponentId, ComponentRef, ComponentRegistry, Entity, EntityPool, EntityTemplates,
    PropertyBag, WorldError,
};
use sprig_metrics::{Counter, SystemProfiler};
use std::cell::RefCell;
use std::rc::Rc;

/// An entity created from a template, with the instances queued for it.
///
/// The instances are live handles: edits made before the next flush are
/// visible once the components attach.
pub struct SpawnedEntity {
    entity: Entity,
    components: Vec<(ComponentId, ErasedComponent)>,
}

impl SpawnedEntity {
    pub fn entity(&self) -> Entity {
        self.entity
    }

    pub fn component<T: Component>(&self) -> Option<ComponentRef<T>> {
        self.components
            .iter()
            .find_map(|(_, instance)| Rc::clone(instance).downcast::<RefCell<T>>().ok())
    }

    /// Component ids in template order.
    pub fn component_ids(&self) -> impl Iterator<Item = ComponentId> + '_ {
        self.components.iter().map(|(id, _)| *id)
    }
}

impl std::fmt::Debug for SpawnedEntity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpawnedEntity")
            .field("entity", &self.entity)
            .field("components", &self.component_ids().collect::<Vec<_>>())
            .finish()
    }
}

pub struct World {
    config: WorldConfig,
    registry: ComponentRegistry,
    components: ComponentPool,
    entities: EntityPool,
    commands: CommandPool,
    queries: QueryRegistry,
    root: SystemGroup,
    templates: EntityTemplates,
    initialized: bool,
    profiler: SystemProfiler,
    counters: Counter,
}

impl World {
    /// Build a world over a fixed set of component types.
    pub fn new(registry: ComponentRegistry, config: WorldConfig) -> Self {
        let universe = registry.len();
        let components = ComponentPool::new(&registry, &config.component_pool);
        let entities = EntityPool::new(universe, config.entity_pool, config.mask_pool);
        tracing::info!(world = %config.name, components = universe, "world created");
        Self {
            components,
            entities,
            commands: CommandPool::new(),
            queries: QueryRegistry::new(),
            root: SystemGroup::default(),
            templates: EntityTemplates::new(),
            initialized: false,
            profiler: SystemProfiler::new(),
            counters: Counter::new(),
            registry,
            config,
        }
    }

    pub fn with_templates(mut self, templates: EntityTemplates) -> Self {
        self.templates = templates;
        self
    }

    pub fn set_templates(&mut self, templates: EntityTemplates) {
        self.templates = templates;
    }

    pub fn templates(&self) -> &EntityTemplates {
        &self.templates
    }

    // ------------------------------------------------------------------
    // Systems
    // ------------------------------------------------------------------

    /// Append a system to the root group. After `initialize` the system
    /// is initialized immediately.
    pub fn add_system(&mut self, system: impl System + 'static) -> Result<(), WorldError> {
        let mut staged = SystemGroup::default();
        staged.add_system(system);
        self.attach(staged)
    }

    /// Append a group to the root group. After `initialize` its systems
    /// are initialized immediately.
    pub fn add_group(&mut self, group: SystemGroup) -> Result<(), WorldError> {
        let mut staged = SystemGroup::default();
        staged.add_group(group);
        self.attach(staged)
    }

    fn attach(&mut self, mut staged: SystemGroup) -> Result<(), WorldError> {
        if self.initialized {
            staged.init(self)?;
        }
        self.root.absorb(staged);
        Ok(())
    }

    /// Register every system's query and run its `init`, depth-first.
    pub fn initialize(&mut self) -> Result<(), WorldError> {
        if self.initialized {
            return Err(WorldError::AlreadyInitialized {
                name: self.config.name.clone(),
            });
        }
        self.initialized = true;
        let result = self.with_root(|root, world| root.init(world));
        result?;
        tracing::info!(world = %self.config.name, queries = self.queries.len(), "world initialized");
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Enable or disable a system or group anywhere in the tree by name.
    pub fn set_system_enabled(&mut self, name: &str, enabled: bool) -> bool {
        let found = self.root.set_enabled_by_name(name, enabled);
        if !found {
            tracing::warn!(system = name, "no system or group with this name");
        }
        found
    }

    pub fn systems(&self) -> &SystemGroup {
        &self.root
    }

    // Run `f` on the root group with the root detached from the world.
    // Anything attached to the world meanwhile is appended afterwards.
    fn with_root<R>(&mut self, f: impl FnOnce(&mut SystemGroup, &mut World) -> R) -> R {
        let mut root = std::mem::take(&mut self.root);
        let result = f(&mut root, self);
        let added = std::mem::replace(&mut self.root, root);
        self.root.absorb(added);
        result
    }

    // ------------------------------------------------------------------
    // Frame
    // ------------------------------------------------------------------

    /// Apply queued commands, then run the system tree.
    pub fn update(&mut self, dt: f32) {
        self.flush();
        self.with_root(|root, world| root.update(world, dt));
    }

    /// Apply every queued command now.
    pub fn flush(&mut self) -> FlushReport {
        self.commands.flush(
            &mut self.entities,
            &mut self.components,
            &mut self.queries,
            &mut self.counters,
        )
    }

    /// Drop every entity, component and queued command. Registered
    /// queries and systems survive; caches rebuild on their next read.
    pub fn clear(&mut self) {
        self.commands.clear();
        self.components.clear();
        self.entities.clear();
        self.queries.invalidate_all();
        self.root.reset();
        self.profiler.reset();
        self.counters.reset_all();
        tracing::info!(world = %self.config.name, "world cleared");
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Register (or look up) the query described by `descriptor`.
    pub fn register_query(&mut self, descriptor: &QueryDescriptor) -> Result<QueryHandle, WorldError> {
        let key = descriptor.resolve(&self.registry)?;
        self.register_query_key(key)
    }

    pub fn register_query_key(&mut self, key: QueryKey) -> Result<QueryHandle, WorldError> {
        key.validate(&self.registry)?;
        let interest = key.interest();
        let (handle, created) = self.queries.register(
            key,
            self.registry.len(),
            &self.components,
            self.config.refresh_threshold,
        );
        if created {
            self.commands.register_interest(handle, &interest);
        }
        Ok(handle)
    }

    /// Refresh the query if needed and return its results.
    pub fn query(&mut self, handle: QueryHandle) -> Option<QueryView<'_>> {
        let Some(query) = self.queries.get_mut(handle) else {
            tracing::warn!(query = handle.index(), "unknown query handle");
            return None;
        };
        match query.refresh(&self.entities, &self.components) {
            Refresh::Full => self.counters.increment("queries.full_rebuilds", 1),
            Refresh::Incremental => self.counters.increment("queries.incremental_refreshes", 1),
            Refresh::Clean => {}
        }
        Some(QueryView::new(query, &self.registry))
    }

    pub fn queries(&self) -> &QueryRegistry {
        &self.queries
    }

    // ------------------------------------------------------------------
    // Entities and components
    // ------------------------------------------------------------------

    /// Allocate an entity and queue its template components in order.
    pub fn create_entity(&mut self, template: &str) -> Result<SpawnedEntity, WorldError> {
        let specs = self
            .templates
            .get(template)
            .ok_or_else(|| WorldError::UnknownTemplate {
                name: template.to_string(),
            })?;

        let mut resolved = Vec::with_capacity(specs.len());
        for spec in specs {
            let id = self.registry.id_by_name(&spec.component).ok_or_else(|| {
                WorldError::UnknownComponentName {
                    template: template.to_string(),
                    component: spec.component.clone(),
                }
            })?;
            resolved.push((id, &spec.props));
        }

        let mut created: Vec<(ComponentId, ErasedComponent)> = Vec::with_capacity(resolved.len());
        for (id, props) in resolved {
            match self.components.create_component_with(id, props) {
                Ok(instance) => created.push((id, instance)),
                Err(err) => {
                    for (id, instance) in created {
                        self.components.recycle(id, instance);
                    }
                    return Err(err);
                }
            }
        }

        let entity = self.entities.create_entity();
        for (id, instance) in &created {
            self.enqueue_add(entity, *id, Rc::clone(instance));
        }
        tracing::trace!(%entity, template, "entity created from template");
        Ok(SpawnedEntity {
            entity,
            components: created,
        })
    }

    /// Allocate an entity that owns nothing yet.
    pub fn create_empty_entity(&mut self) -> Entity {
        self.entities.create_entity()
    }

    /// Queue a fresh `T` for `entity` and return its handle.
    pub fn add_component<T: Component>(&mut self, entity: Entity) -> Result<ComponentRef<T>, WorldError> {
        let id = self.component_id::<T>()?;
        let instance = self
            .components
            .typed_mut::<T>(id)
            .ok_or(WorldError::UnregisteredComponent { name: T::NAME })?
            .create_typed();
        self.enqueue_add(entity, id, Rc::clone(&instance) as ErasedComponent);
        Ok(instance)
    }

    /// Queue `value` for `entity`.
    pub fn add_component_with<T: Component>(
        &mut self,
        entity: Entity,
        value: T,
    ) -> Result<ComponentRef<T>, WorldError> {
        let instance = self.add_component::<T>(entity)?;
        *instance.borrow_mut() = value;
        Ok(instance)
    }

    /// Queue a component by registered name with property overrides.
    pub fn add_component_by_name(
        &mut self,
        entity: Entity,
        name: &str,
        props: &PropertyBag,
    ) -> Result<ErasedComponent, WorldError> {
        let id = self
            .registry
            .id_by_name(name)
            .ok_or_else(|| WorldError::UnknownComponent {
                name: name.to_string(),
            })?;
        let instance = self.components.create_component_with(id, props)?;
        self.enqueue_add(entity, id, Rc::clone(&instance));
        Ok(instance)
    }

    fn enqueue_add(&mut self, entity: Entity, component: ComponentId, instance: ErasedComponent) {
        self.commands.add_command(Command::AddComponent {
            entity,
            component,
            instance,
        });
    }

    pub fn remove_component<T: Component>(&mut self, entity: Entity) -> Result<(), WorldError> {
        let id = self.component_id::<T>()?;
        self.remove_component_by_id(entity, id)
    }

    pub fn remove_component_by_id(&mut self, entity: Entity, id: ComponentId) -> Result<(), WorldError> {
        if !self.registry.contains_id(id) {
            return Err(WorldError::UnknownComponentId { id });
        }
        self.commands.add_command(Command::RemoveComponent { entity, component: id });
        Ok(())
    }

    /// Queue removal of `entity` and everything it owns.
    pub fn remove_entity(&mut self, entity: Entity) {
        self.commands.add_command(Command::RemoveEntity { entity });
    }

    /// Current instance of `T` on `entity`, as of the last flush.
    pub fn get_component<T: Component>(&self, entity: Entity) -> Result<Option<ComponentRef<T>>, WorldError> {
        let id = self.component_id::<T>()?;
        Ok(self.components.get::<T>(entity, id))
    }

    pub fn has_component<T: Component>(&self, entity: Entity) -> Result<bool, WorldError> {
        let id = self.component_id::<T>()?;
        Ok(self.entities.has_component(entity, id))
    }

    pub fn component_id<T: Component>(&self) -> Result<ComponentId, WorldError> {
        self.registry
            .id_of::<T>()
            .ok_or(WorldError::UnregisteredComponent { name: T::NAME })
    }

    pub fn is_alive(&self, entity: Entity) -> bool {
        self.entities.is_alive(entity)
    }

    /// Entities owning at least one component.
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn pending_commands(&self) -> usize {
        self.commands.len()
    }

    // ------------------------------------------------------------------
    // Introspection
    // ------------------------------------------------------------------

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    pub fn registry(&self) -> &ComponentRegistry {
        &self.registry
    }

    pub fn component_pool(&self) -> &ComponentPool {
        &self.components
    }

    pub fn entity_pool(&self) -> &EntityPool {
        &self.entities
    }

    pub fn profiler(&self) -> &SystemProfiler {
        &self.profiler
    }

    #[cfg_attr(not(feature = "metrics"), allow(dead_code))]
    pub(crate) fn profiler_mut(&mut self) -> &mut SystemProfiler {
        &mut self.profiler
    }

    pub fn counters(&self) -> &Counter {
        &self.counters
    }
}

impl std::fmt::Debug for World {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("World")
            .field("name", &self.config.name)
            .field("registry", &self.registry)
            .field("entities", &self.entities)
            .field("pending", &self.commands.len())
            .field("queries", &self.queries.len())
            .finish()
    }
}
