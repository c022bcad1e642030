//! Components used by the demo scene.

use glam::Vec2;
use mosaic_core::define_component;
use serde::Deserialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position(pub Vec2);
define_component!(Position);

/// Units per second.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Velocity(pub Vec2);
define_component!(Velocity);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Body {
    pub width: f32,
    pub height: f32,
}
define_component!(Body);

/// Marks entities the renderer should draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Renderable;
define_component!(Renderable);

/// Excludes an entity from movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frozen;
define_component!(Frozen);

/// One animation row as authored in a sprite sheet file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AnimationDeclaration {
    pub name: String,
    pub width: u32,
    pub height: u32,
    /// Column indices of the frames in this row.
    pub frames: Vec<u32>,
    #[serde(default = "default_speed_ticks")]
    pub speed_ticks: u32,
    #[serde(default)]
    pub default_animation: bool,
    /// Animations with a parent share the parent's row instead of starting a new one.
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub hitbox_offset: Option<Vec2>,
}

fn default_speed_ticks() -> u32 {
    1
}

/// Source rectangle of one frame, in sheet pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnimationFrame {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Animation {
    pub frames: Vec<AnimationFrame>,
    pub speed_ticks: u32,
    pub hitbox_offset: Option<Vec2>,
}

impl Animation {
    /// Frame to show at `tick`, advancing every `speed_ticks` ticks.
    pub fn frame_at(&self, tick: u64) -> Option<&AnimationFrame> {
        if self.frames.is_empty() {
            return None;
        }
        let step = tick / u64::from(self.speed_ticks.max(1));
        let index = (step % self.frames.len() as u64) as usize;
        self.frames.get(index)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SpriteSheet {
    pub name: String,
    #[serde(default)]
    pub offset_x: u32,
    #[serde(default)]
    pub offset_y: u32,
    pub animations_declaration: Vec<AnimationDeclaration>,
    /// Filled by `build_animations`.
    #[serde(skip)]
    pub animations: HashMap<String, Animation>,
    #[serde(skip)]
    pub default_animation: Option<String>,
}
define_component!(SpriteSheet);

impl SpriteSheet {
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Compute every frame rectangle from the declarations.
    ///
    /// Rows are stacked top to bottom in declaration order: each animation
    /// without a parent starts below the previous declaration's row.
    pub fn build_animations(&mut self) {
        let mut row_y = 0;
        let mut animations = HashMap::with_capacity(self.animations_declaration.len());

        for (index, declaration) in self.animations_declaration.iter().enumerate() {
            if declaration.default_animation {
                self.default_animation = Some(declaration.name.clone());
            }
            if index > 0 && declaration.parent.is_none() {
                row_y += self.animations_declaration[index - 1].height;
            }

            let frames = declaration
                .frames
                .iter()
                .map(|&column| AnimationFrame {
                    x: self.offset_x + column * declaration.width,
                    y: self.offset_y + row_y,
                    width: declaration.width,
                    height: declaration.height,
                })
                .collect();

            animations.insert(
                declaration.name.clone(),
                Animation {
                    frames,
                    speed_ticks: declaration.speed_ticks,
                    hitbox_offset: declaration.hitbox_offset,
                },
            );
        }

        self.animations = animations;
    }

    pub fn default_animation(&self) -> Option<&Animation> {
        self.default_animation
            .as_deref()
            .and_then(|name| self.animations.get(name))
    }
}

/// The sheet every demo actor uses.
pub const KNIGHT_SHEET: &str = r#"{
    "name": "knight",
    "offset_x": 0,
    "offset_y": 16,
    "animations_declaration": [
        { "name": "idle", "width": 16, "height": 24, "frames": [0, 1, 2, 3], "speed_ticks": 8, "default_animation": true },
        { "name": "walk_right", "width": 16, "height": 24, "frames": [0, 1, 2, 3, 4, 5], "speed_ticks": 4 },
        { "name": "walk_left", "width": 16, "height": 24, "frames": [6, 7, 8, 9, 10, 11], "speed_ticks": 4, "parent": "walk_right" },
        { "name": "attack", "width": 32, "height": 32, "frames": [0, 1, 2], "speed_ticks": 3, "hitbox_offset": [8.0, 0.0] }
    ]
}"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_stack_by_previous_height() {
        let mut sheet = SpriteSheet::from_json(KNIGHT_SHEET).unwrap();
        sheet.build_animations();

        let idle = &sheet.animations["idle"];
        assert_eq!(idle.frames[0], AnimationFrame { x: 0, y: 16, width: 16, height: 24 });
        assert_eq!(idle.frames[3].x, 48);

        let walk_right = &sheet.animations["walk_right"];
        assert_eq!(walk_right.frames[0].y, 16 + 24);

        // Children share their parent's row.
        let walk_left = &sheet.animations["walk_left"];
        assert_eq!(walk_left.frames[0], AnimationFrame { x: 96, y: 16 + 24, width: 16, height: 24 });

        // The offset grows by the previous *declaration's* height, child or not.
        let attack = &sheet.animations["attack"];
        assert_eq!(attack.frames[2], AnimationFrame { x: 64, y: 16 + 24 + 24, width: 32, height: 32 });
        assert_eq!(attack.hitbox_offset, Some(Vec2::new(8.0, 0.0)));
    }

    #[test]
    fn default_animation_is_selected() {
        let mut sheet = SpriteSheet::from_json(KNIGHT_SHEET).unwrap();
        assert!(sheet.default_animation().is_none());
        sheet.build_animations();
        assert_eq!(sheet.default_animation.as_deref(), Some("idle"));
        assert_eq!(sheet.default_animation().map(|a| a.speed_ticks), Some(8));
    }

    #[test]
    fn frames_advance_with_speed() {
        let animation = Animation {
            frames: (0..3)
                .map(|i| AnimationFrame { x: i * 10, y: 0, width: 10, height: 10 })
                .collect(),
            speed_ticks: 2,
            hitbox_offset: None,
        };
        let xs: Vec<u32> = (0..8).filter_map(|t| animation.frame_at(t)).map(|f| f.x).collect();
        assert_eq!(xs, vec![0, 0, 10, 10, 20, 20, 0, 0]);

        let empty = Animation { frames: Vec::new(), speed_ticks: 0, hitbox_offset: None };
        assert!(empty.frame_at(5).is_none());
    }
}
