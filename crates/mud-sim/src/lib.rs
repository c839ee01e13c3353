//! `mud-sim` — the real-time simulation core: world bootstrap, the
//! visibility-delta broadcaster, the systems with no other crate to live
//! in, and the `Simulation` struct that ties every other crate's systems
//! into one fixed per-tick phase order (§4.3, §4.13).
//!
//! # What lives here
//!
//! | Module        | Contents                                              |
//! |---------------|---------------------------------------------------------|
//! | [`bootstrap`]  | Starter map, den, item seeding, recurring world cues    |
//! | [`visibility`] | `PositionChanged` → `OutboundMove`/`OutboundTile` deltas |
//! | [`systems`]    | Act-effect dispatch, death, decay, anchors, gas, regen  |
//! | [`simulation`] | `Simulation`, the tick loop binding every other crate    |
//! | [`error`]      | `SimError`/`SimResult`                                   |

pub mod bootstrap;
pub mod error;
pub mod simulation;
pub mod systems;
pub mod visibility;

#[cfg(test)]
mod tests;

pub use bootstrap::{bootstrap_world, WorldHandle};
pub use error::{SimError, SimResult};
pub use simulation::Simulation;
