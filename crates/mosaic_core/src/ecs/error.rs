use crate::ecs::{ComponentId, EntityId, RegistryError};
use thiserror::Error;

/// Coarse classification shared by every ECS error.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// An id or type that must be unique is already in use.
    DuplicateId,
    /// The entity, query, system or component type does not exist.
    NotFound,
    /// The operation is not allowed in the current state.
    InvalidState,
}

/// Errors raised by `World` and the handles it hands out.
#[derive(Debug, Error)]
pub enum WorldError {
    #[error("entity '{id}' already exists")]
    DuplicateEntity { id: EntityId },

    #[error("a query with the id '{id}' already exists")]
    DuplicateQuery { id: String },

    #[error("system '{name}' is already registered")]
    DuplicateSystem { name: &'static str },

    #[error("entity '{id}' does not exist")]
    EntityNotFound { id: String },

    #[error("there is no query registered with the id '{id}'")]
    QueryNotFound { id: String },

    #[error("there is no system instance of type '{name}'")]
    SystemNotFound { name: &'static str },

    #[error("entity '{entity}' has no component with {component}")]
    ComponentNotAttached { entity: EntityId, component: ComponentId },

    #[error("entity '{entity}' already has a '{component}' component")]
    ComponentAlreadyAttached {
        entity: EntityId,
        component: &'static str,
    },

    #[error("component with {component} on entity '{entity}' is not a '{expected}'")]
    ComponentTypeMismatch {
        entity: EntityId,
        component: ComponentId,
        expected: &'static str,
    },

    #[error("cannot {operation} while systems are updating")]
    SystemsLocked { operation: &'static str },

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl WorldError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::DuplicateEntity { .. }
            | Self::DuplicateQuery { .. }
            | Self::DuplicateSystem { .. } => ErrorKind::DuplicateId,
            Self::EntityNotFound { .. }
            | Self::QueryNotFound { .. }
            | Self::SystemNotFound { .. }
            | Self::ComponentNotAttached { .. } => ErrorKind::NotFound,
            Self::ComponentAlreadyAttached { .. }
            | Self::ComponentTypeMismatch { .. }
            | Self::SystemsLocked { .. } => ErrorKind::InvalidState,
            Self::Registry(err) => err.kind(),
        }
    }
}
