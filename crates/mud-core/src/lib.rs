//! `mud-core` — foundational types for the simulation core.
//!
//! This crate is a dependency of every other `mud-*` crate. It intentionally
//! has no `mud-*` dependencies and minimal external ones (only `rand` and
//! `thiserror`, plus optional `serde`).
//!
//! # What lives here
//!
//! | Module      | Contents                                              |
//! |-------------|--------------------------------------------------------|
//! | [`ids`]      | `EntityId`                                             |
//! | [`clock`]    | `TickClock`, jitter EMA, frame-budget bookkeeping       |
//! | [`rng`]      | `EntityRng` (per-entity), `SimRng` (global)             |
//! | [`bus`]      | Type-erased per-tick signal bus                         |
//! | [`error`]    | `CoreError`, `CoreResult`                               |
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                     |
//! |---------|-------------------------------------------------------------|
//! | `serde` | Adds `Serialize`/`Deserialize` to ID and clock types.       |

pub mod bus;
pub mod clock;
pub mod error;
pub mod ids;
pub mod rng;
pub mod signals;

#[cfg(test)]
mod tests;

// ── Re-exports ────────────────────────────────────────────────────────────────

pub use bus::SignalBus;
pub use clock::{TickClock, TickConfig};
pub use error::{CoreError, CoreResult};
pub use ids::EntityId;
pub use rng::{EntityRng, SimRng};
