//! Headless demo scene: a handful of actors wandering an arena.
//!
//! Query and system wiring:
//! - `sprite_sheets` (all: SpriteSheet) -> `PreRenderSystem`, once
//! - `moving` (all: Position | Velocity, none: Frozen) -> `MovementSystem`
//! - `drawable` (all: Position | Body | Renderable) -> `RenderSystem`

pub mod components;
pub mod systems;

use components::{Body, Frozen, Position, Renderable, SpriteSheet, Velocity, KNIGHT_SHEET};
use glam::Vec2;
use mosaic_core::ecs::{ComponentDeclaration, QueryFilter, SharedRegistry, World, WorldError};
use mosaic_core::spawn;
use mosaic_services::DemoSettings;
use systems::{MovementSystem, PreRenderSystem, RenderSystem};

pub const ARENA: Vec2 = Vec2::new(320.0, 180.0);

pub const SPRITE_SHEETS: &str = "sprite_sheets";
pub const MOVING: &str = "moving";
pub const DRAWABLE: &str = "drawable";

/// Build the demo world on top of `registry`, registering the demo
/// component types if they are not already known.
pub fn build_world(registry: SharedRegistry, settings: &DemoSettings) -> anyhow::Result<World> {
    let mut world = World::with_registry(registry);
    register_components(&world)?;
    create_queries(&mut world)?;

    world.create_system(SPRITE_SHEETS, PreRenderSystem)?;
    world.create_system(MOVING, MovementSystem::new(ARENA))?;
    world.create_system(DRAWABLE, RenderSystem::default())?;

    populate(&mut world, settings)?;
    tracing::info!(
        entities = world.entity_count(),
        systems = world.system_count(),
        "demo world ready"
    );
    Ok(world)
}

fn register_components(world: &World) -> Result<(), WorldError> {
    let declarations = [
        ComponentDeclaration::of::<Position>(),
        ComponentDeclaration::of::<Velocity>(),
        ComponentDeclaration::of::<Body>(),
        ComponentDeclaration::of::<SpriteSheet>(),
        ComponentDeclaration::of::<Renderable>(),
        ComponentDeclaration::of::<Frozen>(),
    ];
    let missing: Vec<ComponentDeclaration> = declarations
        .into_iter()
        .filter(|declaration| world.lookup_component(declaration.name()).is_err())
        .collect();
    world.register_components(missing)?;
    Ok(())
}

fn create_queries(world: &mut World) -> Result<(), WorldError> {
    let position = world.component_id::<Position>()?;
    let velocity = world.component_id::<Velocity>()?;
    let body = world.component_id::<Body>()?;
    let sheet = world.component_id::<SpriteSheet>()?;
    let renderable = world.component_id::<Renderable>()?;
    let frozen = world.component_id::<Frozen>()?;

    world.create_query(SPRITE_SHEETS, QueryFilter::new().all([sheet]))?;
    world.create_query(
        MOVING,
        QueryFilter::new().all([position, velocity]).none([frozen]),
    )?;
    world.create_query(DRAWABLE, QueryFilter::new().all([position, body, renderable]))?;
    Ok(())
}

fn populate(world: &mut World, settings: &DemoSettings) -> anyhow::Result<()> {
    let sheet = SpriteSheet::from_json(KNIGHT_SHEET)?;

    for index in 0..settings.actors {
        let angle = index as f32 * 0.7;
        let id = spawn!(
            world,
            format!("actor-{index}"),
            Position(ARENA * 0.5),
            Velocity(Vec2::from_angle(angle) * 40.0),
            Body { width: 16.0, height: 24.0 },
            sheet.clone(),
            Renderable
        )?;

        if settings.frozen_every > 0 && index % settings.frozen_every == 0 {
            world.add_component(id.as_str(), Frozen)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mosaic_core::ecs::ComponentRegistry;
    use mosaic_core::time::FixedTickSource;

    fn settings(actors: u32, frozen_every: u32) -> DemoSettings {
        DemoSettings {
            actors,
            frozen_every,
        }
    }

    #[test]
    fn queries_partition_the_actors() {
        let world = build_world(ComponentRegistry::shared(), &settings(6, 3)).unwrap();

        assert_eq!(world.get_query(DRAWABLE).unwrap().len(), 6);
        assert_eq!(world.get_query(SPRITE_SHEETS).unwrap().len(), 6);
        // actor-0 and actor-3 are frozen.
        let moving = world.get_query(MOVING).unwrap();
        assert_eq!(moving.len(), 4);
        assert!(!moving.contains("actor-0"));
        assert!(!moving.contains("actor-3"));
        assert!(world.has_component::<Frozen>("actor-3").unwrap());
        assert!(world.has_component::<Frozen>("ghost").is_err());
    }

    #[test]
    fn run_prepares_sheets_then_moves_unfrozen_actors() {
        let mut world = build_world(ComponentRegistry::shared(), &settings(4, 2)).unwrap();
        let mut source = FixedTickSource::from_rate_hz(10).with_limit(5);

        let frames = world.run(&mut source, |_, _| Ok(())).unwrap();
        assert_eq!(frames, 5);
        assert!(!world.has_system::<PreRenderSystem>());

        let sheet = world.get_component::<SpriteSheet>("actor-1").unwrap();
        assert_eq!(sheet.default_animation.as_deref(), Some("idle"));
        assert_eq!(sheet.animations.len(), 4);

        let start = ARENA * 0.5;
        assert_eq!(world.get_component::<Position>("actor-0").unwrap().0, start);
        assert_ne!(world.get_component::<Position>("actor-1").unwrap().0, start);

        let render = world.get_system::<RenderSystem>().unwrap();
        assert_eq!(render.frames(), 5);
        assert_eq!(render.last_drawn(), 4);
    }

    #[test]
    fn thawing_an_actor_lets_it_move() {
        let mut world = build_world(ComponentRegistry::shared(), &settings(1, 1)).unwrap();
        assert!(world.get_query(MOVING).unwrap().is_empty());

        world.remove_component::<Frozen>("actor-0").unwrap();
        assert!(world.get_query(MOVING).unwrap().contains("actor-0"));
    }

    #[test]
    fn rebuilding_on_a_shared_registry_reuses_registrations() {
        let registry = ComponentRegistry::shared();
        build_world(registry.clone(), &settings(1, 0)).unwrap();
        let world = build_world(registry, &settings(2, 0)).unwrap();
        assert_eq!(world.get_query(MOVING).unwrap().len(), 2);
    }
}
