//! Demo systems. Each one is bound to a query created in `demo::build_world`.

use super::components::{Body, Position, SpriteSheet, Velocity};
use glam::Vec2;
use mosaic_core::ecs::{System, SystemContext, SystemSettings, WorldError};

/// Precomputes sprite-sheet frame rectangles once, before the first frame.
#[derive(Debug, Default)]
pub struct PreRenderSystem;

impl System for PreRenderSystem {
    fn name(&self) -> &'static str {
        "pre_render"
    }

    fn settings(&self) -> SystemSettings {
        SystemSettings::run_once()
    }

    fn update(&mut self, ctx: &mut SystemContext<'_>) -> Result<(), WorldError> {
        for id in ctx.entities() {
            let sheet = ctx.get_mut::<SpriteSheet>(id.as_str())?;
            sheet.build_animations();
            tracing::debug!(
                entity = %id,
                sheet = %sheet.name,
                animations = sheet.animations.len(),
                "prepared sprite sheet"
            );
        }
        Ok(())
    }
}

/// Integrates velocity into position, wrapping around the arena edges.
#[derive(Debug)]
pub struct MovementSystem {
    arena: Vec2,
}

impl MovementSystem {
    pub fn new(arena: Vec2) -> Self {
        Self { arena }
    }
}

impl System for MovementSystem {
    fn name(&self) -> &'static str {
        "movement"
    }

    fn update(&mut self, ctx: &mut SystemContext<'_>) -> Result<(), WorldError> {
        let dt = ctx.tick().delta_seconds();
        for id in ctx.entities() {
            let Velocity(velocity) = *ctx.get::<Velocity>(id.as_str())?;
            let Position(position) = ctx.get_mut::<Position>(id.as_str())?;
            let moved = *position + velocity * dt;
            *position = moved.rem_euclid(self.arena);
        }
        Ok(())
    }
}

/// Headless renderer: resolves what would be drawn and logs it.
#[derive(Debug, Default)]
pub struct RenderSystem {
    frames: u64,
    last_drawn: usize,
}

impl RenderSystem {
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Entities drawn in the most recent frame.
    pub fn last_drawn(&self) -> usize {
        self.last_drawn
    }
}

impl System for RenderSystem {
    fn name(&self) -> &'static str {
        "render"
    }

    fn update(&mut self, ctx: &mut SystemContext<'_>) -> Result<(), WorldError> {
        let tick = ctx.tick();
        for id in ctx.entities() {
            let Position(position) = *ctx.get::<Position>(id.as_str())?;
            let body = ctx.get::<Body>(id.as_str())?;
            let frame = ctx
                .get::<SpriteSheet>(id.as_str())
                .ok()
                .and_then(SpriteSheet::default_animation)
                .and_then(|animation| animation.frame_at(tick.index));

            tracing::trace!(
                entity = %id,
                x = position.x,
                y = position.y,
                w = body.width,
                h = body.height,
                frame = ?frame,
                "draw"
            );
        }

        self.frames += 1;
        self.last_drawn = ctx.entities().len();
        Ok(())
    }
}
