// registry.rs - Component type registry
//
// Hands out one bit per component type, in registration order, starting at
// bit 1. Bit 0 is the sentinel and is never assigned. Identifiers are never
// reused, so a registry only shrinks through an explicit `reset`.

use crate::bitmask::Bitmask;
use crate::ecs::{
    Component, ComponentDeclaration, ComponentDescriptor, ComponentId, ComponentInstance,
    ErrorKind,
};
use once_cell::sync::Lazy;
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use thiserror::Error;

/// Registry handle shared between worlds.
pub type SharedRegistry = Arc<RwLock<ComponentRegistry>>;

/// Process-wide registry used by `World::new()`.
static GLOBAL_REGISTRY: Lazy<SharedRegistry> = Lazy::new(ComponentRegistry::shared);

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("component type '{name}' is already registered as {id}")]
    AlreadyRegistered { name: &'static str, id: ComponentId },

    #[error("component name '{name}' is already bound to a different type")]
    NameTaken { name: &'static str },

    #[error("component type '{name}' is not registered")]
    NotRegistered { name: String },
}

impl RegistryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::AlreadyRegistered { .. } | Self::NameTaken { .. } => ErrorKind::DuplicateId,
            Self::NotRegistered { .. } => ErrorKind::NotFound,
        }
    }
}

/// Maps component types to their bit identifiers.
#[derive(Debug, Default)]
pub struct ComponentRegistry {
    /// Bit position of the last assigned identifier; 0 means only the sentinel.
    cursor: u32,
    by_type: HashMap<TypeId, ComponentDescriptor>,
    by_name: HashMap<&'static str, TypeId>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A fresh registry behind a shareable lock, for worlds that need isolation.
    pub fn shared() -> SharedRegistry {
        Arc::new(RwLock::new(Self::new()))
    }

    /// The process-wide registry, created on first access.
    pub fn global() -> SharedRegistry {
        Arc::clone(&GLOBAL_REGISTRY)
    }

    /// Register a Rust component type.
    pub fn register<T: Component>(&mut self) -> Result<ComponentId, RegistryError> {
        self.register_declaration(ComponentDeclaration::of::<T>())
    }

    /// Register a declared component type. Fails if the type or its name is
    /// already known; the cursor only advances on success.
    pub fn register_declaration(
        &mut self,
        declaration: ComponentDeclaration,
    ) -> Result<ComponentId, RegistryError> {
        if let Some(existing) = self.by_type.get(&declaration.type_id) {
            return Err(RegistryError::AlreadyRegistered {
                name: existing.name,
                id: existing.id,
            });
        }
        if self.by_name.contains_key(declaration.name) {
            return Err(RegistryError::NameTaken {
                name: declaration.name,
            });
        }

        self.cursor += 1;
        let id = ComponentId::from_bit_index(self.cursor);
        self.by_type.insert(
            declaration.type_id,
            ComponentDescriptor {
                id,
                name: declaration.name,
                type_id: declaration.type_id,
            },
        );
        self.by_name.insert(declaration.name, declaration.type_id);

        tracing::debug!(component = declaration.name, bit = id.bit_index(), "registered component type");
        Ok(id)
    }

    /// Register several types in order. Not transactional: on failure, the
    /// declarations before the failing one stay registered.
    pub fn register_many<I>(&mut self, declarations: I) -> Result<Vec<ComponentId>, RegistryError>
    where
        I: IntoIterator<Item = ComponentDeclaration>,
    {
        declarations
            .into_iter()
            .map(|declaration| self.register_declaration(declaration))
            .collect()
    }

    pub fn lookup_by_name(&self, name: &str) -> Result<&ComponentDescriptor, RegistryError> {
        self.by_name
            .get(name)
            .and_then(|type_id| self.by_type.get(type_id))
            .ok_or_else(|| RegistryError::NotRegistered {
                name: name.to_string(),
            })
    }

    pub fn descriptor_of<T: Component>(&self) -> Result<&ComponentDescriptor, RegistryError> {
        self.by_type
            .get(&TypeId::of::<T>())
            .ok_or_else(|| RegistryError::NotRegistered {
                name: T::NAME.to_string(),
            })
    }

    pub fn id_of<T: Component>(&self) -> Result<ComponentId, RegistryError> {
        self.descriptor_of::<T>().map(|descriptor| descriptor.id)
    }

    pub fn is_registered<T: Component>(&self) -> bool {
        self.by_type.contains_key(&TypeId::of::<T>())
    }

    /// Tag a value with its type's identifier.
    pub fn instantiate<T: Component>(&self, value: T) -> Result<ComponentInstance, RegistryError> {
        let id = self.id_of::<T>()?;
        Ok(ComponentInstance::new(id, value))
    }

    /// The most recently assigned identifier, or the sentinel (`0b1`) when
    /// nothing has been registered yet.
    pub fn last_assigned_bit(&self) -> Bitmask {
        Bitmask::from_bit(self.cursor)
    }

    pub fn len(&self) -> usize {
        self.by_type.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_type.is_empty()
    }

    /// Descriptors ordered by identifier.
    pub fn descriptors(&self) -> Vec<&ComponentDescriptor> {
        let mut list: Vec<_> = self.by_type.values().collect();
        list.sort_unstable_by_key(|descriptor| descriptor.id);
        list
    }

    /// Forget every registration and rewind the cursor to the sentinel.
    ///
    /// Worlds still holding entities tagged with old identifiers will not
    /// match anything registered afterwards; only use between test cases or
    /// before any world is populated.
    pub fn reset(&mut self) {
        self.cursor = 0;
        self.by_type.clear();
        self.by_name.clear();
        tracing::debug!("component registry reset");
    }

    /// Advance the cursor without registering anything.
    #[cfg(test)]
    pub(crate) fn skip_bits(&mut self, count: u32) {
        self.cursor += count;
    }
}

/// Shared read access. A poisoned lock still holds consistent data because
/// every mutation above completes before it can panic.
pub(crate) fn read(registry: &SharedRegistry) -> RwLockReadGuard<'_, ComponentRegistry> {
    registry.read().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn write(registry: &SharedRegistry) -> RwLockWriteGuard<'_, ComponentRegistry> {
    registry.write().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::define_component;

    struct Body;
    define_component!(Body);

    struct Position;
    define_component!(Position);

    struct Velocity;
    define_component!(Velocity);

    struct FakeBody;
    define_component!(FakeBody, "Body");

    #[test]
    fn identifiers_are_single_increasing_bits() {
        let mut registry = ComponentRegistry::new();
        assert_eq!(registry.last_assigned_bit(), Bitmask::from(1u64));

        let body = registry.register::<Body>().unwrap();
        let position = registry.register::<Position>().unwrap();
        let velocity = registry.register::<Velocity>().unwrap();

        assert_eq!(body.mask(), Bitmask::from(2u64));
        assert_eq!(position.mask(), Bitmask::from(4u64));
        assert_eq!(velocity.mask(), Bitmask::from(8u64));
        assert_eq!(registry.last_assigned_bit(), Bitmask::from(8u64));

        for id in [body, position, velocity] {
            assert_eq!(id.mask().count_ones(), 1);
            assert_ne!(id.mask(), Bitmask::from(1u64));
        }
        assert!(body < position && position < velocity);
    }

    #[test]
    fn duplicate_registration_fails_and_keeps_the_original_bit() {
        let mut registry = ComponentRegistry::new();
        let body = registry.register::<Body>().unwrap();

        let err = registry.register::<Body>().unwrap_err();
        assert_eq!(err, RegistryError::AlreadyRegistered { name: "Body", id: body });
        assert_eq!(err.kind(), ErrorKind::DuplicateId);
        assert_eq!(registry.id_of::<Body>().unwrap(), body);
        assert_eq!(registry.last_assigned_bit(), body.mask());
    }

    #[test]
    fn names_must_be_unique_across_types() {
        let mut registry = ComponentRegistry::new();
        registry.register::<Body>().unwrap();

        let err = registry.register::<FakeBody>().unwrap_err();
        assert_eq!(err, RegistryError::NameTaken { name: "Body" });
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn register_many_is_sequential_not_transactional() {
        let mut registry = ComponentRegistry::new();
        registry.register::<Velocity>().unwrap();

        let err = registry
            .register_many([
                ComponentDeclaration::of::<Body>(),
                ComponentDeclaration::of::<Velocity>(),
                ComponentDeclaration::of::<Position>(),
            ])
            .unwrap_err();

        assert!(matches!(err, RegistryError::AlreadyRegistered { name: "Velocity", .. }));
        assert!(registry.is_registered::<Body>());
        assert!(!registry.is_registered::<Position>());
    }

    #[test]
    fn lookup_by_name() {
        let mut registry = ComponentRegistry::new();
        let ids = registry
            .register_many([ComponentDeclaration::of::<Body>(), ComponentDeclaration::of::<Position>()])
            .unwrap();

        let body = registry.lookup_by_name("Body").unwrap();
        assert_eq!(body.id, ids[0]);
        assert!(body.is::<Body>());
        assert_eq!(registry.lookup_by_name("Position").unwrap().id, ids[1]);

        let err = registry.lookup_by_name("Sprite").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn instantiate_requires_registration() {
        let mut registry = ComponentRegistry::new();
        assert!(registry.instantiate(Body).is_err());

        let id = registry.register::<Body>().unwrap();
        let instance = registry.instantiate(Body).unwrap();
        assert_eq!(instance.id(), id);
    }

    #[test]
    fn descriptors_are_listed_by_bit() {
        let mut registry = ComponentRegistry::new();
        registry
            .register_many([
                ComponentDeclaration::of::<Velocity>(),
                ComponentDeclaration::of::<Body>(),
                ComponentDeclaration::of::<Position>(),
            ])
            .unwrap();

        let names: Vec<&str> = registry.descriptors().iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["Velocity", "Body", "Position"]);
        let bits: Vec<u32> = registry.descriptors().iter().map(|d| d.id.bit_index()).collect();
        assert_eq!(bits, vec![1, 2, 3]);
    }

    #[test]
    fn reset_rewinds_to_the_sentinel() {
        let mut registry = ComponentRegistry::new();
        registry.register::<Body>().unwrap();
        registry.register::<Position>().unwrap();

        registry.reset();
        assert!(registry.is_empty());
        assert_eq!(registry.last_assigned_bit(), Bitmask::from(1u64));
        assert_eq!(registry.register::<Position>().unwrap().mask(), Bitmask::from(2u64));
    }

    #[test]
    fn global_registry_is_a_single_instance() {
        let a = ComponentRegistry::global();
        let b = ComponentRegistry::global();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &ComponentRegistry::shared()));
    }
}
