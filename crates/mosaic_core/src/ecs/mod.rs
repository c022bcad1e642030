//! Entity Component System core types.
//!
//! Component types are identified by single bits handed out by a
//! `ComponentRegistry`. Every entity carries the OR of its components' bits,
//! and every query keeps a live membership set that the `World` updates as
//! entities are created, destroyed or change composition. Systems are bound
//! to one query each and see its members once per tick.

mod component;
mod entity;
mod error;
mod query;
mod registry;
mod system;
mod world;

pub use component::{
    Component, ComponentDeclaration, ComponentDescriptor, ComponentId, ComponentInstance,
};
pub use entity::{Entity, EntityId};
pub use error::{ErrorKind, WorldError};
pub use query::{Query, QueryFilter};
pub use registry::{ComponentRegistry, RegistryError, SharedRegistry};
pub use system::{System, SystemContext, SystemSettings};
pub use world::{counters, EntityMut, World, WorldStats};

/// Create an entity and attach components in one expression.
///
/// Evaluates to `Result<EntityId, WorldError>`. Components attached before a
/// failing one stay attached.
///
/// # Example
/// ```ignore
/// let player = spawn!(world, "player",
///     Position { x: 1.0, y: 2.0 },
///     Body { width: 16, height: 16 },
/// )?;
/// ```
#[macro_export]
macro_rules! spawn {
    ($world:expr, $id:expr $(, $component:expr)* $(,)?) => {
        $world
            .create_entity($id)
            $(.and_then(|entity| entity.with($component)))*
            .map(|entity| entity.id().clone())
    };
}
