//! Entities: an identity, the components attached to it, and the
//! composition mask derived from them.
//!
//! The mask is updated incrementally on every attach/detach and always equals
//! the OR of the attached components' identifiers. Entities are only mutated
//! through `World` so every change reaches the queries before the call returns.

use crate::bitmask::{add_bit, remove_bit, Bitmask};
use crate::ecs::{ComponentId, ComponentInstance, WorldError};
use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Caller-supplied entity key, unique within one world.
///
/// Cheap to clone; query membership sets hold these.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(Arc<str>);

impl EntityId {
    pub fn new(id: impl Into<Arc<str>>) -> Self {
        Self(id.into())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for EntityId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for EntityId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for EntityId {
    fn from(id: String) -> Self {
        Self::new(id)
    }
}

impl From<&EntityId> for EntityId {
    fn from(id: &EntityId) -> Self {
        id.clone()
    }
}

impl PartialEq<str> for EntityId {
    fn eq(&self, other: &str) -> bool {
        &*self.0 == other
    }
}

impl PartialEq<&str> for EntityId {
    fn eq(&self, other: &&str) -> bool {
        &*self.0 == *other
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityId({:?})", &*self.0)
    }
}

/// A game object composed of at most one instance per component type.
#[derive(Debug)]
pub struct Entity {
    id: EntityId,
    mask: Bitmask,
    components: HashMap<ComponentId, ComponentInstance>,
}

impl Entity {
    pub(crate) fn new(id: EntityId) -> Self {
        Self {
            id,
            mask: Bitmask::new(),
            components: HashMap::new(),
        }
    }

    #[inline]
    pub fn id(&self) -> &EntityId {
        &self.id
    }

    /// Composition mask: OR of every attached component's identifier.
    #[inline]
    pub fn mask(&self) -> &Bitmask {
        &self.mask
    }

    #[inline]
    pub fn has(&self, component: ComponentId) -> bool {
        self.mask.test(component.bit_index())
    }

    pub fn get(&self, component: ComponentId) -> Result<&ComponentInstance, WorldError> {
        self.components
            .get(&component)
            .ok_or_else(|| self.not_attached(component))
    }

    pub fn get_mut(&mut self, component: ComponentId) -> Result<&mut ComponentInstance, WorldError> {
        match self.components.get_mut(&component) {
            Some(instance) => Ok(instance),
            None => Err(WorldError::ComponentNotAttached {
                entity: self.id.clone(),
                component,
            }),
        }
    }

    pub fn component_ids(&self) -> impl Iterator<Item = ComponentId> + '_ {
        self.components.keys().copied()
    }

    pub fn components(&self) -> impl Iterator<Item = &ComponentInstance> {
        self.components.values()
    }

    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    /// OR-reduction of the attached identifiers, recomputed from scratch.
    pub fn recompute_mask(&self) -> Bitmask {
        self.components
            .keys()
            .fold(Bitmask::new(), |mask, id| add_bit(&mask, &id.mask()))
    }

    pub(crate) fn attach(&mut self, instance: ComponentInstance) -> Result<ComponentId, WorldError> {
        let id = instance.id();
        if self.components.contains_key(&id) {
            return Err(WorldError::ComponentAlreadyAttached {
                entity: self.id.clone(),
                component: instance.name(),
            });
        }

        self.mask = add_bit(&self.mask, &id.mask());
        self.components.insert(id, instance);
        debug_assert_eq!(self.mask, self.recompute_mask());
        Ok(id)
    }

    /// `None` when nothing of that type is attached.
    pub(crate) fn detach(&mut self, component: ComponentId) -> Option<ComponentInstance> {
        let instance = self.components.remove(&component)?;
        self.mask = remove_bit(&self.mask, &component.mask());
        debug_assert_eq!(self.mask, self.recompute_mask());
        Some(instance)
    }

    fn not_attached(&self, component: ComponentId) -> WorldError {
        WorldError::ComponentNotAttached {
            entity: self.id.clone(),
            component,
        }
    }
}
