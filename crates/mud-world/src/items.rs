//! Item component types and the template table (§4.9).

use crate::components::Slot;

/// Names the template an item instance was created from.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct ItemKey(pub String);

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct Level(pub u32);

#[derive(Clone, Copy, PartialEq, Debug)]
pub struct Weapon {
    pub damage: f64,
    pub token_key: &'static str,
    pub story_key: &'static str,
    pub skill_key: &'static str,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct Container;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct Cookware;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Wearable {
    pub slot: Slot,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct ProvidesLight;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct ProvidesHeat;

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct ProvidesShelter {
    pub prompt: String,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Food {
    pub count: u32,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct Rotting;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct Ingredient;

/// Worn mitigation (§4.8 Armor): `required_skill` is the wearer's own skill
/// contesting the attack alongside the item's own `item_rank`; `*_immunity`
/// caps how much of each damage kind the piece can ever block.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct Armor {
    pub required_skill: &'static str,
    pub item_rank: f64,
    pub physical_immunity: f64,
    pub magical_immunity: f64,
}
