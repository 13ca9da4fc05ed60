use thiserror::Error;

use crate::entity::Entity;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EcsError {
    #[error("entity {entity:?} is out of bounds (capacity {capacity})")]
    InvalidEntity { entity: Entity, capacity: usize },

    #[error(
        "component type limit exceeded: {type_name} would take index {index} but only {limit} component types are supported"
    )]
    ComponentTypeLimitExceeded {
        type_name: &'static str,
        index: usize,
        limit: usize,
    },
}
