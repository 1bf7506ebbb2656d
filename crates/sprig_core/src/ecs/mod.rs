//! Entity Component System core types.
//!
//! Single-threaded, frame-driven ECS. Entities are plain ids, components
//! are shared `Rc<RefCell<T>>` handles held in per-type sparse sets, and
//! all structural changes go through a deferred command queue that the
//! world flushes once per frame. Queries cache their matches and patch
//! themselves incrementally from the entities touched by each flush.

mod command;
mod component;
mod entity;
mod error;
mod mask;
pub mod query;
mod sparse_set;
pub mod storage;
pub mod system;
mod template;
mod world;

pub use command::{Command, CommandPool, FlushReport};
pub use component::{
    assign_fields, Component, ComponentId, ComponentMeta, ComponentRef, ComponentRegistry,
    PropertyBag,
};
pub use entity::{Entity, EntityPool};
pub use error::{PropertyError, RegistrationError, TemplateError, WorldError};
pub use mask::Mask;
pub use query::{Query, QueryDescriptor, QueryHandle, QueryKey, QueryRegistry, QueryView, Refresh};
pub use sparse_set::SparseSet;
pub use storage::{ComponentPool, ErasedComponent};
pub use system::{System, SystemGroup};
pub use template::{ComponentSpec, EntityTemplates};
pub use world::{SpawnedEntity, World};
