// world.rs - ECS World: entities, queries, systems and the routing between them
//
// The world is the only thing that mutates query membership. Every structural
// change (entity created/removed, component attached/detached) is routed to
// the affected queries before the call returns, so a query is never observed
// with a stale view of an entity's composition.

use crate::ecs::registry::{self, SharedRegistry};
use crate::ecs::system::RegisteredSystem;
use crate::ecs::{
    Component, ComponentDeclaration, ComponentDescriptor, ComponentId, ComponentInstance,
    ComponentRegistry, Entity, EntityId, Query, QueryFilter, System, SystemContext, WorldError,
};
use crate::time::{Tick, TickSource};
use indexmap::IndexMap;
use mosaic_metrics::{Counter, SystemProfiler, TickTimer};
use std::any::TypeId;
use std::collections::{hash_map::Entry, HashMap};
use std::fmt;

/// Names of the counters kept in `WorldStats::counter`.
pub mod counters {
    pub const ENTITIES_CREATED: &str = "entities.created";
    pub const ENTITIES_REMOVED: &str = "entities.removed";
    pub const QUERY_NOTIFICATIONS: &str = "query.notifications";
    pub const SYSTEMS_RETIRED: &str = "systems.retired";
}

/// Instrumentation collected while the world runs. No-ops without the
/// `metrics` feature.
#[derive(Debug, Default)]
pub struct WorldStats {
    pub tick_timer: TickTimer,
    pub profiler: SystemProfiler,
    pub counter: Counter,
}

/// The main ECS world containing all entities, queries and systems.
pub struct World {
    registry: SharedRegistry,
    entities: HashMap<EntityId, Entity>,
    queries: HashMap<String, Query>,
    /// Keyed by the system's Rust type; iteration order is registration order.
    systems: IndexMap<TypeId, RegisteredSystem>,
    updating: bool,
    stats: WorldStats,
}

impl World {
    /// Create a world backed by the process-wide component registry.
    pub fn new() -> Self {
        Self::with_registry(ComponentRegistry::global())
    }

    /// Create a world backed by a specific registry (tests, tools, isolated sims).
    pub fn with_registry(registry: SharedRegistry) -> Self {
        Self {
            registry,
            entities: HashMap::new(),
            queries: HashMap::new(),
            systems: IndexMap::new(),
            updating: false,
            stats: WorldStats::default(),
        }
    }

    pub fn registry(&self) -> &SharedRegistry {
        &self.registry
    }

    pub fn stats(&self) -> &WorldStats {
        &self.stats
    }

    // ------------------------------------------------------------------
    // Component types
    // ------------------------------------------------------------------

    pub fn register_component<T: Component>(&self) -> Result<ComponentId, WorldError> {
        Ok(registry::write(&self.registry).register::<T>()?)
    }

    /// Register several component types in order; see `ComponentRegistry::register_many`.
    pub fn register_components<I>(&self, declarations: I) -> Result<Vec<ComponentId>, WorldError>
    where
        I: IntoIterator<Item = ComponentDeclaration>,
    {
        Ok(registry::write(&self.registry).register_many(declarations)?)
    }

    pub fn component_id<T: Component>(&self) -> Result<ComponentId, WorldError> {
        Ok(registry::read(&self.registry).id_of::<T>()?)
    }

    pub fn lookup_component(&self, name: &str) -> Result<ComponentDescriptor, WorldError> {
        Ok(registry::read(&self.registry).lookup_by_name(name)?.clone())
    }

    // ------------------------------------------------------------------
    // Entities
    // ------------------------------------------------------------------

    /// Create an empty entity and offer it to every query.
    pub fn create_entity(&mut self, id: impl Into<EntityId>) -> Result<EntityMut<'_>, WorldError> {
        let id = id.into();
        let entity = match self.entities.entry(id.clone()) {
            Entry::Occupied(_) => return Err(WorldError::DuplicateEntity { id }),
            Entry::Vacant(slot) => slot.insert(Entity::new(id.clone())),
        };

        // An empty filter matches unconditionally, so even a bare entity is checked.
        for query in self.queries.values_mut() {
            query.candidate(entity);
        }
        self.stats.counter.increment(counters::ENTITIES_CREATED, 1);
        self.stats
            .counter
            .increment(counters::QUERY_NOTIFICATIONS, self.queries.len() as u64);
        tracing::trace!(entity = %id, "created entity");

        Ok(EntityMut { world: self, id })
    }

    /// Remove an entity, purging it from every query first. No-op if absent.
    pub fn remove_entity(&mut self, id: &str) -> Option<Entity> {
        let entity = self.entities.remove(id)?;
        for query in self.queries.values_mut() {
            query.remove(id);
        }
        self.stats.counter.increment(counters::ENTITIES_REMOVED, 1);
        self.stats
            .counter
            .increment(counters::QUERY_NOTIFICATIONS, self.queries.len() as u64);
        tracing::trace!(entity = id, "removed entity");
        Some(entity)
    }

    /// Look up an entity that may not exist.
    pub fn get_entity(&self, id: &str) -> Option<&Entity> {
        self.entities.get(id)
    }

    pub fn entity(&self, id: &str) -> Result<&Entity, WorldError> {
        self.entities
            .get(id)
            .ok_or_else(|| WorldError::EntityNotFound { id: id.to_string() })
    }

    pub fn entity_mut(&mut self, id: &str) -> Result<EntityMut<'_>, WorldError> {
        let id = self.entity(id)?.id().clone();
        Ok(EntityMut { world: self, id })
    }

    pub fn contains_entity(&self, id: &str) -> bool {
        self.entities.contains_key(id)
    }

    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    // ------------------------------------------------------------------
    // Components on entities
    // ------------------------------------------------------------------

    /// Attach a typed component value. The type must be registered.
    pub fn add_component<T: Component>(&mut self, entity: &str, value: T) -> Result<ComponentId, WorldError> {
        let instance = registry::read(&self.registry).instantiate(value)?;
        self.attach(entity, instance)
    }

    /// Attach a pre-tagged instance and notify the queries it can affect.
    pub fn attach(&mut self, entity: &str, instance: ComponentInstance) -> Result<ComponentId, WorldError> {
        let entity = self
            .entities
            .get_mut(entity)
            .ok_or_else(|| WorldError::EntityNotFound { id: entity.to_string() })?;
        let component = entity.attach(instance)?;
        let entity: &Entity = entity;
        let bit = component.mask();

        // Only queries mentioning this bit can change; the rest are skipped.
        let mut notified = 0;
        for query in self.queries.values_mut() {
            if query.filter().excludes(&bit) {
                query.remove(entity.id().as_str());
                notified += 1;
            } else if query.filter().wants(&bit) {
                query.add(entity);
                notified += 1;
            }
        }
        self.stats
            .counter
            .increment(counters::QUERY_NOTIFICATIONS, notified);
        tracing::trace!(entity = %entity.id(), component = %component, "attached component");
        Ok(component)
    }

    /// Detach a typed component, returning its value. `Ok(None)` if it was not attached.
    pub fn remove_component<T: Component>(&mut self, entity: &str) -> Result<Option<T>, WorldError> {
        let id = self.component_id::<T>()?;
        let Some(instance) = self.detach(entity, id)? else {
            return Ok(None);
        };
        match instance.into_inner::<T>() {
            Ok(value) => Ok(Some(value)),
            Err(_) => Err(WorldError::ComponentTypeMismatch {
                entity: EntityId::from(entity),
                component: id,
                expected: T::NAME,
            }),
        }
    }

    /// Detach by identifier and re-evaluate the queries that mention it.
    ///
    /// Losing a bit can drop an entity out of an `all`/`any` filter or let it
    /// into a `none` filter, so intersecting queries get `remove` followed by
    /// `candidate`.
    pub fn detach(&mut self, entity: &str, component: ComponentId) -> Result<Option<ComponentInstance>, WorldError> {
        let entity = self
            .entities
            .get_mut(entity)
            .ok_or_else(|| WorldError::EntityNotFound { id: entity.to_string() })?;
        let Some(instance) = entity.detach(component) else {
            return Ok(None);
        };
        let entity: &Entity = entity;
        let bit = component.mask();

        let mut notified = 0;
        for query in self.queries.values_mut() {
            if query.filter().mentions(&bit) {
                query.remove(entity.id().as_str());
                query.candidate(entity);
                notified += 1;
            }
        }
        self.stats
            .counter
            .increment(counters::QUERY_NOTIFICATIONS, notified);
        tracing::trace!(entity = %entity.id(), component = %component, "detached component");
        Ok(Some(instance))
    }

    pub fn has_component<T: Component>(&self, entity: &str) -> Result<bool, WorldError> {
        let id = self.component_id::<T>()?;
        Ok(self.entity(entity)?.has(id))
    }

    pub fn get_component<T: Component>(&self, entity: &str) -> Result<&T, WorldError> {
        let id = self.component_id::<T>()?;
        let entity = self.entity(entity)?;
        entity
            .get(id)?
            .downcast_ref::<T>()
            .ok_or_else(|| WorldError::ComponentTypeMismatch {
                entity: entity.id().clone(),
                component: id,
                expected: T::NAME,
            })
    }

    pub fn get_component_mut<T: Component>(&mut self, entity: &str) -> Result<&mut T, WorldError> {
        let id = self.component_id::<T>()?;
        let entity = self
            .entities
            .get_mut(entity)
            .ok_or_else(|| WorldError::EntityNotFound { id: entity.to_string() })?;
        let owner = entity.id().clone();
        entity
            .get_mut(id)?
            .downcast_mut::<T>()
            .ok_or(WorldError::ComponentTypeMismatch {
                entity: owner,
                component: id,
                expected: T::NAME,
            })
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Register a query and immediately collect every existing match.
    pub fn create_query(&mut self, id: impl Into<String>, filter: QueryFilter) -> Result<&Query, WorldError> {
        let id = id.into();
        let slot = match self.queries.entry(id.clone()) {
            Entry::Occupied(_) => return Err(WorldError::DuplicateQuery { id }),
            Entry::Vacant(slot) => slot,
        };

        let mut query = Query::new(id, filter);
        for entity in self.entities.values() {
            query.candidate(entity);
        }
        tracing::debug!(query = query.id(), matches = query.len(), "created query");
        Ok(&*slot.insert(query))
    }

    pub fn get_query(&self, id: &str) -> Result<&Query, WorldError> {
        self.queries
            .get(id)
            .ok_or_else(|| WorldError::QueryNotFound { id: id.to_string() })
    }

    /// Remove a query. Systems still bound to it fail on their next tick.
    pub fn remove_query(&mut self, id: &str) -> Option<Query> {
        self.queries.remove(id)
    }

    pub fn queries(&self) -> impl Iterator<Item = &Query> {
        self.queries.values()
    }

    // ------------------------------------------------------------------
    // Systems
    // ------------------------------------------------------------------

    /// Register a system bound to an existing query. One instance per system type.
    pub fn create_system<S: System>(&mut self, query: &str, system: S) -> Result<(), WorldError> {
        self.ensure_unlocked("register systems")?;
        self.get_query(query)?;

        let type_id = TypeId::of::<S>();
        if self.systems.contains_key(&type_id) {
            return Err(WorldError::DuplicateSystem { name: system.name() });
        }

        let entry = RegisteredSystem::new(query.to_string(), system);
        tracing::debug!(system = entry.name, query, "registered system");
        self.systems.insert(type_id, entry);
        Ok(())
    }

    /// Fails with `SystemsLocked` while systems are updating.
    pub fn get_system<S: System>(&self) -> Result<&S, WorldError> {
        self.ensure_unlocked("look up systems")?;
        self.systems
            .get(&TypeId::of::<S>())
            .and_then(|entry| entry.system.as_any().downcast_ref::<S>())
            .ok_or_else(Self::system_not_found::<S>)
    }

    /// Fails with `SystemsLocked` while systems are updating.
    pub fn get_system_mut<S: System>(&mut self) -> Result<&mut S, WorldError> {
        self.ensure_unlocked("look up systems")?;
        self.systems
            .get_mut(&TypeId::of::<S>())
            .and_then(|entry| entry.system.as_any_mut().downcast_mut::<S>())
            .ok_or_else(Self::system_not_found::<S>)
    }

    /// Deregister a system and hand it back. `Ok(None)` if it was not registered.
    pub fn remove_system<S: System>(&mut self) -> Result<Option<S>, WorldError> {
        self.ensure_unlocked("remove systems")?;
        let Some(entry) = self.systems.shift_remove(&TypeId::of::<S>()) else {
            return Ok(None);
        };
        self.stats.profiler.forget(entry.name);
        Ok(entry.system.into_any().downcast::<S>().ok().map(|boxed| *boxed))
    }

    /// Always `false` while systems are updating; the system table is
    /// detached from the world for the duration of the tick.
    pub fn has_system<S: System>(&self) -> bool {
        self.systems.contains_key(&TypeId::of::<S>())
    }

    /// Names of the registered systems, in tick order. Empty while systems
    /// are updating.
    pub fn system_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.systems.values().map(|entry| entry.name)
    }

    pub fn system_count(&self) -> usize {
        self.systems.len()
    }

    // ------------------------------------------------------------------
    // Frame driving
    // ------------------------------------------------------------------

    /// Tick every system once, in registration order.
    ///
    /// Each system sees its query's membership as of the moment it is invoked,
    /// including changes made by systems earlier in the same tick. Systems
    /// that exhaust their tick budget are deregistered afterwards.
    pub fn update(&mut self, tick: Tick) -> Result<(), WorldError> {
        self.ensure_unlocked("update")?;

        let mut systems = std::mem::take(&mut self.systems);
        self.stats.tick_timer.begin();
        let (finished, result) = self.dispatch(&mut systems, tick);
        self.stats.tick_timer.end();
        self.systems = systems;

        // Budgets used up before a failing system still count.
        for type_id in finished {
            if let Some(entry) = self.systems.shift_remove(&type_id) {
                self.retire(&entry);
            }
        }
        result
    }

    /// Drive the world from a tick source until it runs dry.
    ///
    /// Systems configured to run once are executed (and deregistered) before
    /// the first frame. `after_frame` runs after every frame's systems.
    /// Returns the number of frames run.
    pub fn run<S, F>(&mut self, source: &mut S, mut after_frame: F) -> Result<u64, WorldError>
    where
        S: TickSource + ?Sized,
        F: FnMut(&mut World, Tick) -> Result<(), WorldError>,
    {
        self.ensure_unlocked("run")?;
        let Some(first) = source.next_tick() else {
            return Ok(0);
        };
        self.run_startup_systems(first)?;

        let mut frames = 0;
        let mut next = Some(first);
        while let Some(tick) = next {
            self.update(tick)?;
            after_frame(self, tick)?;
            frames += 1;
            next = source.next_tick();
        }
        tracing::debug!(frames, "tick source exhausted");
        Ok(frames)
    }

    /// Run and retire the run-once systems. If one fails, it and every
    /// startup system after it go back to their original slots.
    fn run_startup_systems(&mut self, tick: Tick) -> Result<(), WorldError> {
        let once: Vec<(usize, TypeId)> = self
            .systems
            .iter()
            .enumerate()
            .filter(|(_, (_, entry))| entry.settings.is_run_once())
            .map(|(index, (type_id, _))| (index, *type_id))
            .collect();
        if once.is_empty() {
            return Ok(());
        }

        let mut startup = IndexMap::with_capacity(once.len());
        let mut slots = Vec::with_capacity(once.len());
        for (index, type_id) in once {
            if let Some(entry) = self.systems.shift_remove(&type_id) {
                startup.insert(type_id, entry);
                slots.push(index);
            }
        }

        let (_, result) = self.dispatch(&mut startup, tick);

        let mut retired = 0;
        for ((type_id, entry), slot) in startup.into_iter().zip(slots) {
            if entry.is_finished() {
                self.retire(&entry);
                retired += 1;
            } else {
                let index = (slot - retired).min(self.systems.len());
                self.systems.shift_insert(index, type_id, entry);
            }
        }
        result
    }

    /// Run `systems` against this world with system registration locked.
    ///
    /// Stops at the first failing system. The returned ids are the systems
    /// whose tick budget is used up, including those that ran before a failure.
    fn dispatch(
        &mut self,
        systems: &mut IndexMap<TypeId, RegisteredSystem>,
        tick: Tick,
    ) -> (Vec<TypeId>, Result<(), WorldError>) {
        let mut profiler = std::mem::take(&mut self.stats.profiler);
        let mut finished = Vec::new();
        self.updating = true;
        let result = self.run_systems(systems, &mut profiler, tick, &mut finished);
        self.updating = false;
        self.stats.profiler = profiler;
        (finished, result)
    }

    fn run_systems(
        &mut self,
        systems: &mut IndexMap<TypeId, RegisteredSystem>,
        profiler: &mut SystemProfiler,
        tick: Tick,
        finished: &mut Vec<TypeId>,
    ) -> Result<(), WorldError> {
        for (type_id, entry) in systems.iter_mut() {
            let members = self.get_query(&entry.query)?.snapshot();
            let mut ctx = SystemContext::new(self, &entry.query, &members, tick);
            let system = entry.system.as_system_mut();
            profiler.time_system(entry.name, || system.update(&mut ctx))?;

            entry.ticks_run += 1;
            if entry.is_finished() {
                finished.push(*type_id);
            }
        }
        Ok(())
    }

    fn retire(&mut self, entry: &RegisteredSystem) {
        self.stats.profiler.forget(entry.name);
        self.stats.counter.increment(counters::SYSTEMS_RETIRED, 1);
        tracing::debug!(system = entry.name, ticks = entry.ticks_run, "system finished its ticks");
    }

    fn ensure_unlocked(&self, operation: &'static str) -> Result<(), WorldError> {
        if self.updating {
            Err(WorldError::SystemsLocked { operation })
        } else {
            Ok(())
        }
    }

    fn system_not_found<S: System>() -> WorldError {
        WorldError::SystemNotFound {
            name: std::any::type_name::<S>(),
        }
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

/// Mutable handle to one entity. Every change goes through the world, so
/// queries are updated before each call returns.
pub struct EntityMut<'w> {
    world: &'w mut World,
    id: EntityId,
}

impl fmt::Debug for EntityMut<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("EntityMut").field(&self.id).finish()
    }
}

impl<'w> EntityMut<'w> {
    #[inline]
    pub fn id(&self) -> &EntityId {
        &self.id
    }

    pub fn entity(&self) -> Result<&Entity, WorldError> {
        self.world.entity(self.id.as_str())
    }

    /// Builder-style attach.
    pub fn with<T: Component>(mut self, value: T) -> Result<Self, WorldError> {
        self.attach(value)?;
        Ok(self)
    }

    pub fn attach<T: Component>(&mut self, value: T) -> Result<ComponentId, WorldError> {
        self.world.add_component(self.id.as_str(), value)
    }

    pub fn attach_instance(&mut self, instance: ComponentInstance) -> Result<ComponentId, WorldError> {
        self.world.attach(self.id.as_str(), instance)
    }

    pub fn detach<T: Component>(&mut self) -> Result<Option<T>, WorldError> {
        self.world.remove_component::<T>(self.id.as_str())
    }

    pub fn has<T: Component>(&self) -> Result<bool, WorldError> {
        self.world.has_component::<T>(self.id.as_str())
    }

    pub fn get<T: Component>(&self) -> Result<&T, WorldError> {
        self.world.get_component::<T>(self.id.as_str())
    }

    pub fn get_mut<T: Component>(&mut self) -> Result<&mut T, WorldError> {
        self.world.get_component_mut::<T>(self.id.as_str())
    }
}
