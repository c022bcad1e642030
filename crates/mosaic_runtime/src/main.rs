//! Mosaic Runtime
//!
//! Headless binary that loads settings, builds the demo world and drives it
//! from a tick source until the configured tick budget runs out.
//!
//! Usage: `mosaic [settings.json]` (defaults to `mosaic.json`, falling back
//! to built-in settings when the file does not exist).

mod demo;

use anyhow::{Context, Result};
use mosaic_core::ecs::{counters, ComponentRegistry, World};
use mosaic_core::time::{FixedTickSource, RealtimeTickSource, TickSource};
use mosaic_services::{Settings, SimulationSettings};

const DEFAULT_SETTINGS_PATH: &str = "mosaic.json";

/// Log a progress line every this many frames.
const REPORT_EVERY: u64 = 120;

fn main() -> Result<()> {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_SETTINGS_PATH.to_string());
    let settings = Settings::load_or_default(&path)
        .with_context(|| format!("loading settings from {path}"))?;

    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(settings.level()?)
        .init();

    tracing::info!("Mosaic v{}", mosaic_core::VERSION);
    tracing::debug!(?settings, "settings");

    let mut world = demo::build_world(ComponentRegistry::global(), &settings.demo)?;
    let mut source = tick_source(&settings.simulation);

    let frames = world.run(source.as_mut(), |world, tick| {
        if tick.index > 0 && tick.index % REPORT_EVERY == 0 {
            tracing::info!(
                tick = tick.index,
                elapsed_ms = tick.elapsed.as_millis() as u64,
                entities = world.entity_count(),
                "simulating"
            );
        }
        Ok(())
    })?;

    report(&world, frames);
    Ok(())
}

fn tick_source(settings: &SimulationSettings) -> Box<dyn TickSource> {
    let mut fixed = FixedTickSource::from_rate_hz(settings.tick_rate_hz);
    if let Some(limit) = settings.max_ticks {
        fixed = fixed.with_limit(limit);
    }
    tracing::info!(
        step_us = fixed.step().as_micros() as u64,
        max_ticks = ?settings.max_ticks,
        realtime = settings.realtime,
        "tick source"
    );

    if settings.realtime {
        Box::new(RealtimeTickSource::new(fixed))
    } else {
        Box::new(fixed)
    }
}

fn report(world: &World, frames: u64) {
    let stats = world.stats();
    tracing::info!(frames, "simulation finished");
    if let Ok(render) = world.get_system::<demo::systems::RenderSystem>() {
        tracing::info!(frames = render.frames(), drawn = render.last_drawn(), "renderer");
    }

    if !mosaic_metrics::ENABLED {
        return;
    }

    let (min_ms, max_ms) = stats.tick_timer.tick_time_range_ms();
    tracing::info!(
        avg_ms = stats.tick_timer.tick_time_ms(),
        min_ms,
        max_ms,
        "tick time"
    );
    for name in world.system_names() {
        let timing = stats.profiler.timing(name);
        tracing::info!(system = name, calls = timing.calls, total = ?timing.total, "system time");
    }
    tracing::info!(
        created = stats.counter.get(counters::ENTITIES_CREATED),
        removed = stats.counter.get(counters::ENTITIES_REMOVED),
        notifications = stats.counter.get(counters::QUERY_NOTIFICATIONS),
        retired_systems = stats.counter.get(counters::SYSTEMS_RETIRED),
        "world counters"
    );
}
