//! Framework error type.
//!
//! Sub-crates define their own error enums for their domain and keep
//! `CoreError` as one variant rather than collapsing everything into a
//! single flat type — this mirrors the rest of the workspace's per-crate
//! error convention (`WorldError`, `TimeError`, `AiError`, ...).
//!
//! Per the propagation policy: only boot-time/load-time failures surface as
//! `Result`. In-tick validation and lookup-miss conditions are not errors —
//! they become `Outbound` signals or silent no-ops (see `mud-play`/`mud-world`).

use thiserror::Error;

use crate::EntityId;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("entity {0} not found")]
    EntityNotFound(EntityId),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type CoreResult<T> = Result<T, CoreError>;
