use thiserror::Error;

use mud_core::EntityId;

#[derive(Debug, Error)]
pub enum WorldError {
    #[error("entity {0} not found")]
    EntityNotFound(EntityId),

    #[error("unknown item template key: {0}")]
    UnknownItemKey(String),

    #[error("invalid tile key: ({0}, {1})")]
    InvalidTileKey(i64, i64),

    #[error("containment cycle detected at entity {0}")]
    ContainmentCycle(EntityId),

    #[error("content load error: {0}")]
    ContentLoad(String),
}

pub type WorldResult<T> = Result<T, WorldError>;
