//! `mud-world` — entity storage, components, items, containment, and
//! terrain (§3 Data Model, §4.7, §4.9, §4.10).
//!
//! Depends only on `mud-core`; knows nothing about the tick loop, the
//! network layer, or AI — those live in `mud-sim`, `mud-net`, and `mud-ai`
//! respectively and depend on this crate instead.
//!
//! # What lives here
//!
//! | Module        | Contents                                              |
//! |---------------|--------------------------------------------------------|
//! | [`entity`]     | `EntityStore`, the sparse type-erased component registry |
//! | [`components`] | Transform, Health, Stats, Skills, Drives, Anchor, ...  |
//! | [`items`]      | Item component types: Weapon, Container, Food, ...     |
//! | [`inventory`]  | Item templates, containment save/load (§4.9)           |
//! | [`terrain`]    | Chips tile grids, decay, optional gas sim (§4.10)      |
//! | [`error`]      | `WorldError`, `WorldResult`                             |

pub mod components;
pub mod entity;
pub mod error;
pub mod inventory;
pub mod items;
pub mod terrain;

#[cfg(test)]
mod tests;

pub use entity::EntityStore;
pub use error::{WorldError, WorldResult};
