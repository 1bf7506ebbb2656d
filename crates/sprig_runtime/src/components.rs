//! Components used by the demo simulation.

use glam::Vec2;
use serde::{Deserialize, Serialize};
use sprig_core::define_component;
use sprig_core::ecs::{ComponentRegistry, RegistrationError};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub at: Vec2,
}
define_component!(Position, "Position", serde);

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Velocity {
    pub dir: Vec2,
    pub speed: f32,
}
define_component!(Velocity, "Velocity", serde);

/// Seconds left before the entity is removed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LifeTime {
    pub remaining: f32,
}
define_component!(LifeTime, "LifeTime", serde);

/// Spawns `burst` entities from `template` every `interval` seconds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Emitter {
    pub interval: f32,
    pub burst: u32,
    pub template: String,
    #[serde(skip)]
    pub timer: f32,
    #[serde(skip)]
    pub heading: f32,
}
define_component!(Emitter, "Emitter", serde);

pub fn registry() -> Result<ComponentRegistry, RegistrationError> {
    ComponentRegistry::new()
        .with::<Position>()?
        .with::<Velocity>()?
        .with::<LifeTime>()?
        .with::<Emitter>()
}
