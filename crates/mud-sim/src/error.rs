//! Error types for `mud-sim`.

use thiserror::Error;

use mud_core::EntityId;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("entity {0} not found")]
    EntityNotFound(EntityId),

    #[error("unknown map key: {0}")]
    UnknownMap(String),

    #[error(transparent)]
    World(#[from] mud_world::WorldError),

    #[error(transparent)]
    Net(#[from] mud_net::NetError),
}

pub type SimResult<T> = Result<T, SimError>;
