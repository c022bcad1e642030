// component.rs - Component types and instances
//
// A component *type* is identified by a single bit handed out by the
// `ComponentRegistry`. Every *instance* carries that identifier by value, so
// nothing about the Rust type needs to be mutated after registration.

use crate::bitmask::Bitmask;
use std::any::{Any, TypeId};
use std::fmt;

/// Position of the single bit identifying a component type.
///
/// Bit 0 is the sentinel and is never handed out, so a valid id is always >= 1.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentId(u32);

impl ComponentId {
    pub(crate) const fn from_bit_index(index: u32) -> Self {
        Self(index)
    }

    /// Bit position backing this identifier.
    #[inline]
    pub fn bit_index(self) -> u32 {
        self.0
    }

    /// The identifier as a single-bit mask (`1 << bit_index`).
    #[inline]
    pub fn mask(self) -> Bitmask {
        Bitmask::from_bit(self.0)
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bit {} ({})", self.0, self.mask())
    }
}

/// Trait implemented by every Rust type that can be attached to an entity.
///
/// Use [`define_component!`](crate::define_component) instead of writing the
/// impl by hand.
pub trait Component: Any + Send + Sync {
    /// Unique, human-readable name. Used for lookup by name and diagnostics.
    const NAME: &'static str;
}

/// Type identity plus name, used for batch registration.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ComponentDeclaration {
    pub(crate) name: &'static str,
    pub(crate) type_id: TypeId,
}

impl ComponentDeclaration {
    pub fn of<T: Component>() -> Self {
        Self {
            name: T::NAME,
            type_id: TypeId::of::<T>(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

/// Registered component type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ComponentDescriptor {
    pub id: ComponentId,
    pub name: &'static str,
    pub type_id: TypeId,
}

impl ComponentDescriptor {
    #[inline]
    pub fn bit(&self) -> Bitmask {
        self.id.mask()
    }

    pub fn is<T: Component>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }
}

/// A component value tagged with its type's identifier.
///
/// Built through [`ComponentRegistry::instantiate`](crate::ecs::ComponentRegistry::instantiate),
/// which resolves the identifier once at construction.
pub struct ComponentInstance {
    id: ComponentId,
    name: &'static str,
    value: Box<dyn Any + Send + Sync>,
}

impl ComponentInstance {
    pub(crate) fn new<T: Component>(id: ComponentId, value: T) -> Self {
        Self {
            id,
            name: T::NAME,
            value: Box::new(value),
        }
    }

    #[inline]
    pub fn id(&self) -> ComponentId {
        self.id
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is<T: Component>(&self) -> bool {
        self.value.is::<T>()
    }

    pub fn downcast_ref<T: Component>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }

    pub fn downcast_mut<T: Component>(&mut self) -> Option<&mut T> {
        self.value.downcast_mut::<T>()
    }

    /// Unwrap the stored value, handing the instance back on a type mismatch.
    pub fn into_inner<T: Component>(self) -> Result<T, Self> {
        let Self { id, name, value } = self;
        match value.downcast::<T>() {
            Ok(boxed) => Ok(*boxed),
            Err(value) => Err(Self { id, name, value }),
        }
    }
}

impl fmt::Debug for ComponentInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentInstance")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Helper macro to implement the `Component` trait.
///
/// # Example
/// ```ignore
/// struct Position { x: f32, y: f32 }
///
/// define_component!(Position);              // NAME = "Position"
/// define_component!(Position, "Position");  // explicit name
/// ```
#[macro_export]
macro_rules! define_component {
    ($ty:ident) => {
        $crate::define_component!($ty, stringify!($ty));
    };
    ($ty:ty, $name:expr) => {
        impl $crate::ecs::Component for $ty {
            const NAME: &'static str = $name;
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Body {
        width: u32,
        height: u32,
    }
    crate::define_component!(Body);

    struct Position;
    crate::define_component!(Position, "Pos");

    #[test]
    fn macro_names_components() {
        assert_eq!(Body::NAME, "Body");
        assert_eq!(Position::NAME, "Pos");
        assert_eq!(ComponentDeclaration::of::<Body>().name(), "Body");
    }

    #[test]
    fn instances_carry_their_type_bit() {
        let id = ComponentId::from_bit_index(1);
        let mut body = ComponentInstance::new(id, Body { width: 10, height: 20 });

        assert_eq!(body.id().mask(), Bitmask::from(2u64));
        assert_eq!(body.name(), "Body");
        assert!(body.is::<Body>());
        assert!(!body.is::<Position>());

        if let Some(b) = body.downcast_mut::<Body>() {
            b.width = 30;
        }
        assert_eq!(body.downcast_ref::<Body>().map(|b| b.width), Some(30));

        let body = match body.into_inner::<Position>() {
            Ok(_) => panic!("a Body instance must not unwrap as Position"),
            Err(instance) => instance,
        };
        assert_eq!(body.into_inner::<Body>().ok(), Some(Body { width: 30, height: 20 }));
    }
}
