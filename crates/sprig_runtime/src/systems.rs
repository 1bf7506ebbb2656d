//! Demo systems
//!
//! `SpawnSystem` turns emitters into short-lived sparks, `MoveSystem`
//! integrates velocities, `LifeTimeSystem` expires sparks and
//! `ReportSystem` logs a population summary from a throttled group.

use crate::components::{Emitter, LifeTime, Position, Velocity};
use glam::Vec2;
use sprig_core::ecs::{ComponentRef, Entity, QueryDescriptor, QueryHandle, System, World};

/// Golden angle in radians; successive headings never line up.
const HEADING_STEP: f32 = 2.399_963;
/// Shortest emitter interval honored, in seconds.
const MIN_INTERVAL: f32 = 0.001;

#[derive(Debug, Default)]
pub struct SpawnSystem;

impl System for SpawnSystem {
    fn name(&self) -> &str {
        "SpawnSystem"
    }

    fn describe(&self) -> QueryDescriptor {
        QueryDescriptor::new().with::<Emitter>().with::<Position>()
    }

    fn update(&mut self, world: &mut World, query: QueryHandle, dt: f32) {
        let Some(view) = world.query(query) else {
            return;
        };
        let emitters: Vec<(ComponentRef<Emitter>, Vec2)> = view
            .iter::<Emitter>()
            .zip(view.iter::<Position>())
            .map(|((_, emitter), (_, position))| (emitter.clone(), position.borrow().at))
            .collect();

        for (emitter, origin) in emitters {
            let mut emitter = emitter.borrow_mut();
            let interval = emitter.interval.max(MIN_INTERVAL);
            emitter.timer += dt;
            while emitter.timer >= interval {
                emitter.timer -= interval;
                for _ in 0..emitter.burst {
                    let spawned = match world.create_entity(&emitter.template) {
                        Ok(spawned) => spawned,
                        Err(err) => {
                            tracing::warn!(template = %emitter.template, error = %err, "emitter spawn failed");
                            return;
                        }
                    };
                    emitter.heading += HEADING_STEP;
                    if let Some(position) = spawned.component::<Position>() {
                        position.borrow_mut().at = origin;
                    }
                    if let Some(velocity) = spawned.component::<Velocity>() {
                        velocity.borrow_mut().dir = Vec2::from_angle(emitter.heading);
                    }
                }
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct MoveSystem;

impl System for MoveSystem {
    fn name(&self) -> &str {
        "MoveSystem"
    }

    fn describe(&self) -> QueryDescriptor {
        QueryDescriptor::new().with::<Position>().with::<Velocity>()
    }

    fn update(&mut self, world: &mut World, query: QueryHandle, dt: f32) {
        let Some(view) = world.query(query) else {
            return;
        };
        for ((_, position), (_, velocity)) in view.iter::<Position>().zip(view.iter::<Velocity>()) {
            let velocity = velocity.borrow();
            position.borrow_mut().at += velocity.dir * velocity.speed * dt;
        }
    }
}

#[derive(Debug, Default)]
pub struct LifeTimeSystem;

impl System for LifeTimeSystem {
    fn name(&self) -> &str {
        "LifeTimeSystem"
    }

    fn describe(&self) -> QueryDescriptor {
        QueryDescriptor::new().with::<LifeTime>()
    }

    fn update(&mut self, world: &mut World, query: QueryHandle, dt: f32) {
        let Some(view) = world.query(query) else {
            return;
        };
        let expired: Vec<Entity> = view
            .iter::<LifeTime>()
            .filter_map(|(entity, life)| {
                let mut life = life.borrow_mut();
                life.remaining -= dt;
                (life.remaining <= 0.0).then_some(entity)
            })
            .collect();

        for entity in expired {
            world.remove_entity(entity);
        }
    }
}

/// Logs how many positioned entities exist and how many are moving.
#[derive(Debug, Default)]
pub struct ReportSystem {
    reports: u64,
}

impl System for ReportSystem {
    fn name(&self) -> &str {
        "ReportSystem"
    }

    fn describe(&self) -> QueryDescriptor {
        QueryDescriptor::new().with::<Position>().optional::<Velocity>()
    }

    fn update(&mut self, world: &mut World, query: QueryHandle, dt: f32) {
        let total = world.entity_count();
        let pending = world.pending_commands();
        let Some(view) = world.query(query) else {
            return;
        };
        let moving = view
            .components::<Velocity>()
            .map_or(0, |column| column.iter().flatten().count());
        self.reports += 1;
        tracing::info!(
            report = self.reports,
            elapsed = dt,
            positioned = view.len(),
            moving,
            total,
            pending,
            "population"
        );
    }
}
