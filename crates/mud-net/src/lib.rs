//! `mud-net` — the TCP transport, connection table, outbox/framing, and
//! persistence boundary (§4.12, §6).
//!
//! # What lives here
//!
//! | Module        | Contents                                              |
//! |---------------|---------------------------------------------------------|
//! | [`transport`]  | TCP accept loop, per-connection reader/writer tasks     |
//! | [`admission`]  | First-line auth, lazy character load, entity creation   |
//! | [`auth`]       | `AuthPort` and the `allow_local_auth` stub               |
//! | [`connection`] | `ConnectionTable`, `Connected`/`Disconnected` handling   |
//! | [`wire`]       | The binary envelope entry set and its bincode codec     |
//! | [`outbox`]     | Per-tick mailbag scan over every `Outbound*` queue       |
//! | [`persistence`]| `PersistencePort`, in-memory adapter, optional SQLite    |

pub mod admission;
pub mod auth;
pub mod connection;
pub mod error;
pub mod outbox;
pub mod persistence;
pub mod transport;
pub mod wire;

#[cfg(test)]
mod tests;

pub use admission::Admission;
pub use auth::{AuthPort, LocalAuth};
pub use connection::ConnectionTable;
pub use error::{NetError, NetResult};
pub use outbox::Outbox;
pub use persistence::{CharacterBrief, InMemoryPersistence, InventoryRow, PersistencePort, SkillRow};
pub use transport::{serve, ConnId, InboundEvent, OutboundHandle};
pub use wire::{encode_packet, Packet, WireEntry};
