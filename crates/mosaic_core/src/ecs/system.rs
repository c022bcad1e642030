// system.rs - Query consumers ticked by the world
//
// A system is bound to exactly one query when it is registered and receives a
// snapshot of that query's members once per tick.

use crate::ecs::{Component, EntityId, World, WorldError};
use crate::time::Tick;
use std::any::Any;
use std::num::NonZeroU32;

/// Scheduling policy for a registered system.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct SystemSettings {
    /// Deregister the system after it has run this many ticks. `None` runs forever.
    pub ticks_to_run: Option<NonZeroU32>,
}

impl SystemSettings {
    /// Run every tick until removed.
    pub fn forever() -> Self {
        Self::default()
    }

    /// Run a single time. `World::run` executes these before its first frame.
    pub fn run_once() -> Self {
        Self {
            ticks_to_run: Some(NonZeroU32::MIN),
        }
    }

    /// Run for `ticks` ticks; zero is treated as one.
    pub fn ticks(ticks: u32) -> Self {
        Self {
            ticks_to_run: Some(NonZeroU32::new(ticks).unwrap_or(NonZeroU32::MIN)),
        }
    }

    pub fn is_run_once(&self) -> bool {
        self.ticks_to_run == Some(NonZeroU32::MIN)
    }
}

/// Per-tick processing unit.
pub trait System: Any + Send {
    /// Name used in logs, metrics and errors.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Read once, when the system is registered.
    fn settings(&self) -> SystemSettings {
        SystemSettings::default()
    }

    fn update(&mut self, ctx: &mut SystemContext<'_>) -> Result<(), WorldError>;
}

/// What a system sees during `update`.
///
/// `entities()` is the bound query's membership at the moment the system was
/// invoked. Structural changes made through `world_mut()` apply immediately,
/// but they never reshuffle the slice being iterated.
///
/// System bookkeeping is locked for the whole tick: `get_system`,
/// `create_system` and `remove_system` fail with `SystemsLocked`, and
/// `has_system` / `system_names` see an empty table.
pub struct SystemContext<'a> {
    world: &'a mut World,
    query: &'a str,
    entities: &'a [EntityId],
    tick: Tick,
}

impl<'a> SystemContext<'a> {
    pub(crate) fn new(
        world: &'a mut World,
        query: &'a str,
        entities: &'a [EntityId],
        tick: Tick,
    ) -> Self {
        Self {
            world,
            query,
            entities,
            tick,
        }
    }

    /// Members of the bound query.
    #[inline]
    pub fn entities(&self) -> &'a [EntityId] {
        self.entities
    }

    #[inline]
    pub fn query_id(&self) -> &str {
        self.query
    }

    #[inline]
    pub fn tick(&self) -> Tick {
        self.tick
    }

    pub fn world(&self) -> &World {
        &*self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut *self.world
    }

    pub fn get<T: Component>(&self, entity: &str) -> Result<&T, WorldError> {
        self.world.get_component::<T>(entity)
    }

    pub fn get_mut<T: Component>(&mut self, entity: &str) -> Result<&mut T, WorldError> {
        self.world.get_component_mut::<T>(entity)
    }
}

/// Object-safe view over a boxed system, so the world can both tick it and
/// hand it back as its concrete type.
pub(crate) trait SystemObject: Send {
    fn as_system_mut(&mut self) -> &mut dyn System;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

impl<S: System> SystemObject for S {
    fn as_system_mut(&mut self) -> &mut dyn System {
        self
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

/// Bookkeeping for one registered system.
pub(crate) struct RegisteredSystem {
    pub(crate) name: &'static str,
    pub(crate) query: String,
    pub(crate) settings: SystemSettings,
    pub(crate) ticks_run: u32,
    pub(crate) system: Box<dyn SystemObject>,
}

impl RegisteredSystem {
    pub(crate) fn new<S: System>(query: String, system: S) -> Self {
        Self {
            name: system.name(),
            query,
            settings: system.settings(),
            ticks_run: 0,
            system: Box::new(system),
        }
    }

    /// Whether the tick budget has been used up.
    pub(crate) fn is_finished(&self) -> bool {
        self.settings
            .ticks_to_run
            .is_some_and(|limit| self.ticks_run >= limit.get())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Noop;

    impl System for Noop {
        fn settings(&self) -> SystemSettings {
            SystemSettings::ticks(2)
        }

        fn update(&mut self, _ctx: &mut SystemContext<'_>) -> Result<(), WorldError> {
            Ok(())
        }
    }

    #[test]
    fn settings_constructors() {
        assert!(SystemSettings::run_once().is_run_once());
        assert!(SystemSettings::ticks(0).is_run_once());
        assert!(!SystemSettings::forever().is_run_once());
        assert_eq!(SystemSettings::ticks(5).ticks_to_run.map(NonZeroU32::get), Some(5));
    }

    #[test]
    fn registered_system_tracks_its_budget() {
        let mut entry = RegisteredSystem::new("q".to_string(), Noop);
        assert!(entry.name.ends_with("Noop"));
        assert!(!entry.is_finished());
        entry.ticks_run = 2;
        assert!(entry.is_finished());
        assert!(entry.system.as_any().is::<Noop>());
    }
}
