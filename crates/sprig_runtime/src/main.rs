//! Sprig Runtime
//!
//! Demo host: registers the demo components, loads entity templates,
//! builds the system tree and ticks the world at a fixed rate.
//!
//! Usage: `sprig [world-config.json]`

mod components;
mod systems;

use anyhow::{Context, Result};
use sprig_core::ecs::{EntityTemplates, SystemGroup, World};
use sprig_core::time::TickClock;
use sprig_core::WorldConfig;
use sprig_metrics::FrameTimer;
use systems::{LifeTimeSystem, MoveSystem, ReportSystem, SpawnSystem};
use tracing_subscriber::EnvFilter;

const TEMPLATES: &str = include_str!("../assets/templates.json");

/// Ten simulated seconds at the default tick rate.
const TICKS: u64 = 600;
/// Frames between population reports.
const REPORT_INTERVAL: u32 = 30;

fn load_config() -> Result<WorldConfig> {
    match std::env::args().nth(1) {
        Some(path) => {
            let json = std::fs::read_to_string(&path)
                .with_context(|| format!("reading world config {path}"))?;
            WorldConfig::from_json_str(&json).with_context(|| format!("parsing world config {path}"))
        }
        None => Ok(WorldConfig::named("demo")),
    }
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    tracing::info!("Sprig v{}", sprig_core::VERSION);

    let config = load_config()?;
    let registry = components::registry()?;
    let templates = EntityTemplates::from_json_str(TEMPLATES).context("parsing entity templates")?;
    let mut world = World::new(registry, config).with_templates(templates);

    world.add_group(
        SystemGroup::new("Simulation", 1)
            .with_system(SpawnSystem)
            .with_system(MoveSystem)
            .with_system(LifeTimeSystem),
    )?;
    world.add_group(SystemGroup::new("Reporting", REPORT_INTERVAL).with_system(ReportSystem::default()))?;
    world.initialize()?;

    world.create_entity("Fountain")?;
    for _ in 0..4 {
        world.create_entity("Drifter")?;
    }

    let mut clock = TickClock::default();
    let mut frames = FrameTimer::new(120);
    while clock.tick_count() < TICKS {
        frames.begin();
        let dt = clock.advance();
        world.update(dt);
        frames.end();
    }
    world.flush();

    tracing::info!(
        ticks = clock.tick_count(),
        simulated_secs = clock.total_time().as_secs_f32(),
        entities = world.entity_count(),
        frame_ms = frames.frame_time_ms(),
        "simulation finished"
    );
    for (name, value) in world.counters().snapshot() {
        tracing::info!(counter = name, value, "counter");
    }
    for (name, timing) in world.profiler().iter() {
        tracing::info!(
            system = name,
            calls = timing.calls,
            avg_us = timing.average().as_micros() as u64,
            "system timing"
        );
    }

    Ok(())
}
