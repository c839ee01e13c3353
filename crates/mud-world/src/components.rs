//! Core component types (§3 Data Model).
//!
//! Components are plain `Eq`-comparable value types — the inventory save
//! path (§4.9) diffs a live entity's components against its item template
//! with structural equality, so every persisted component derives
//! `PartialEq`.

use mud_core::EntityId;

/// World position. An entity either has a `Transform` (world-space) or a
/// [`ContainedBy`] edge (held/worn), never both at once — enforced by the
/// movement and containment systems, not by storage itself.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Transform {
    pub map_id: EntityId,
    pub y: i32,
    pub x: i32,
}

impl Transform {
    pub const ORIGIN: Transform = Transform {
        map_id: EntityId(0),
        y: 0,
        x: 0,
    };
}

/// Containment edge: `self` is held/worn by `parent`. Acyclic by
/// construction — commands that would introduce a cycle are rejected
/// before this component is written (§4.9).
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct ContainedBy(pub EntityId);

impl ContainedBy {
    /// Sentinel meaning "not contained" (used transiently during moves).
    pub const NONE: ContainedBy = ContainedBy(EntityId(0));
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, serde::Serialize, serde::Deserialize)]
pub enum Slot {
    #[default]
    Any,
    LeftHand,
    RightHand,
    Back,
    Armor,
    Feet,
    Head,
}

impl Slot {
    /// Stable small-int encoding for persistence rows (§4.9).
    pub fn ordinal(self) -> u8 {
        match self {
            Slot::Any => 0,
            Slot::LeftHand => 1,
            Slot::RightHand => 2,
            Slot::Back => 3,
            Slot::Armor => 4,
            Slot::Feet => 5,
            Slot::Head => 6,
        }
    }

    /// Inverse of [`Slot::ordinal`]; unrecognized values fall back to `Any`.
    pub fn from_ordinal(ordinal: u8) -> Slot {
        match ordinal {
            1 => Slot::LeftHand,
            2 => Slot::RightHand,
            3 => Slot::Back,
            4 => Slot::Armor,
            5 => Slot::Feet,
            6 => Slot::Head,
            _ => Slot::Any,
        }
    }
}

/// A noun phrase driving the format mini-language (§9 Design Notes):
/// default → definite article; `s` → possessive; pronoun variants for
/// `they`/`them`/`their`/`theirs`; verb conjugation keyed on `num`.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Noun {
    pub value: String,
    pub adjective: Option<String>,
    pub num: u32,
}

impl Noun {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            adjective: None,
            num: 1,
        }
    }

    pub fn with_adjective(mut self, adjective: impl Into<String>) -> Self {
        self.adjective = Some(adjective.into());
        self
    }

    pub fn with_num(mut self, num: u32) -> Self {
        self.num = num;
        self
    }

    /// Bare noun phrase, e.g. "crude cookpot".
    pub fn phrase(&self) -> String {
        match &self.adjective {
            Some(adj) => format!("{adj} {}", self.value),
            None => self.value.clone(),
        }
    }

    /// Definite-article form, e.g. "the crude cookpot" (default specifier).
    pub fn definite(&self) -> String {
        format!("the {}", self.phrase())
    }

    /// Possessive form, e.g. "the crude cookpot's" (`s` specifier).
    pub fn possessive(&self) -> String {
        format!("{}'s", self.definite())
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Glyph {
    pub ch: char,
    /// Hue, saturation, value in `[0, 1]`, stored as fixed-point millis so
    /// the type stays `Eq` (floats are not).
    pub h_milli: u16,
    pub s_milli: u16,
    pub v_milli: u16,
}

impl Glyph {
    pub fn new(ch: char, h: f32, s: f32, v: f32) -> Self {
        Self {
            ch,
            h_milli: (h.clamp(0.0, 1.0) * 1000.0).round() as u16,
            s_milli: (s.clamp(0.0, 1.0) * 1000.0).round() as u16,
            v_milli: (v.clamp(0.0, 1.0) * 1000.0).round() as u16,
        }
    }

    pub fn hsv(&self) -> (f32, f32, f32) {
        (
            self.h_milli as f32 / 1000.0,
            self.s_milli as f32 / 1000.0,
            self.v_milli as f32 / 1000.0,
        )
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum Condition {
    #[default]
    Normal,
    Unconscious,
    InShock,
    Dead,
}

#[derive(Clone, Copy, PartialEq, Debug)]
pub struct Health {
    /// Current health, clamped to `[0, max]` by the combat system.
    pub cur: f64,
    pub max: f64,
    pub stress: f64,
    pub aggravated_stress: f64,
    pub condition: Condition,
}

impl Health {
    pub fn full(max: f64) -> Self {
        Self {
            cur: max,
            max,
            stress: 0.0,
            aggravated_stress: 0.0,
            condition: Condition::Normal,
        }
    }

    pub fn pct(&self) -> f64 {
        if self.max <= 0.0 {
            0.0
        } else {
            (self.cur / self.max).clamp(0.0, 1.0)
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum StanceKind {
    #[default]
    Standing,
    Kneeling,
    Sitting,
    LyingProne,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct Stance {
    pub cur: StanceKind,
    /// Prop entity (e.g. a bedroll) this stance is taken against, if any.
    pub prop: Option<EntityId>,
}

#[derive(Clone, Copy, PartialEq, Debug)]
pub struct Stats {
    pub grace: f64,
    pub grit: f64,
    pub wit: f64,
}

/// One named skill's progress. `tnl` ("to next level") is the fractional
/// progress in `[0, 1)` toward the next rank; `pending` is learning accrued
/// but not yet promoted, consumed by `AbsorbRestExp` (§4.8).
#[derive(Clone, PartialEq, Debug)]
pub struct Skill {
    pub name: String,
    pub rank: u32,
    pub tnl: f64,
    pub pending: f64,
    pub rest_bonus: f64,
}

impl Skill {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rank: 0,
            tnl: 0.0,
            pending: 0.0,
            rest_bonus: 1.0,
        }
    }
}

/// The named set of skills an entity tracks, plus a generation counter
/// bumped on character reset so stale in-flight `Learn` signals are
/// rejected (§4.8).
#[derive(Clone, PartialEq, Debug)]
pub struct Skills {
    pub generation: u32,
    pub by_name: std::collections::BTreeMap<String, Skill>,
}

impl Skills {
    pub fn starter() -> Self {
        let mut by_name = std::collections::BTreeMap::new();
        for name in ["martial_arts", "evasion", "survival", "cooking", "foraging"] {
            by_name.insert(name.to_string(), Skill::named(name));
        }
        Self {
            generation: 0,
            by_name,
        }
    }

    pub fn get(&self, name: &str) -> f64 {
        self.by_name.get(name).map(|s| s.rank as f64).unwrap_or(0.0)
    }
}

/// A lightweight handle into the network layer's connection table.
/// Presence of this component on an entity means "player controlled";
/// `mud-world` never interprets the id, `mud-net` owns the mapping.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Connection(pub u64);

/// While `deadline > now`, inbound text for this entity is queued rather
/// than parsed immediately (§4.11).
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct Lag {
    pub deadline_secs: f64,
}

/// A tagged prompt action — the Rust-native replacement for the duck-typed
/// `on_ok`/`on_err`/`on_expired_ok`/`on_expired_err` callbacks (§9 Design
/// Notes). Kept as a small closed set to avoid a closure soup.
#[derive(Clone, PartialEq, Debug)]
pub enum PromptAction {
    GrowAnchor { anchor: EntityId },
    EnterWyrd,
    Learn { skill: String, mult: f64 },
    Cancel,
}

#[derive(Clone, PartialEq, Debug)]
pub struct Prompt {
    pub text: String,
    pub on_ok: Option<PromptAction>,
    pub on_err: Option<PromptAction>,
    pub on_expired_ok: Option<PromptAction>,
    pub on_expired_err: Option<PromptAction>,
    /// Deadline in game seconds; `None` never expires.
    pub end_secs: Option<f64>,
}

/// Protects a manhattan-disk of radius `threshold` from terrain decay.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct Anchor {
    pub rank: u32,
    pub tnl: f64,
    pub threshold: i32,
    pub fuel: Option<f64>,
}

impl Anchor {
    pub fn protects(&self, from: Transform, y: i32, x: i32) -> bool {
        let dist = (from.y - y).abs() + (from.x - x).abs();
        dist < self.threshold
    }
}

/// Mob steering weights (§4.6). Effective aggression/fear scale with
/// current HP fraction via a monotone, continuous curve.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct Drives {
    pub aggression: f64,
    pub fear: f64,
    pub hunger: f64,
    pub anchor_hate: f64,
}

impl Drives {
    /// Low HP suppresses aggression and raises fear; linear ramp below a
    /// half-health threshold, unchanged above it.
    pub fn effective_aggression(&self, hp_pct: f64) -> f64 {
        let scale = (hp_pct / 0.5).clamp(0.0, 1.0);
        self.aggression * scale
    }

    pub fn effective_fear(&self, hp_pct: f64) -> f64 {
        let scale = 1.0 + (1.0 - hp_pct.clamp(0.0, 1.0));
        self.fear * scale
    }
}

/// At most one `Target` per entity; re-adding replaces it.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Target(pub EntityId);

/// One respawn slot in a [`Den`].
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct SpawnSlot {
    pub map_id: EntityId,
    pub y: i32,
    pub x: i32,
    pub mob_eid: Option<EntityId>,
    pub last_spawn_secs: f64,
}

impl SpawnSlot {
    pub fn is_ready(&self, now_secs: f64, respawn_delay_secs: f64, alive: bool) -> bool {
        !alive && now_secs - self.last_spawn_secs >= respawn_delay_secs
    }
}

/// A mob respawn point: wakes when a connected player moves within
/// `wake_distance` (Chebyshev) of it, filling any ready slot.
#[derive(Clone, PartialEq, Debug)]
pub struct Den {
    pub wake_distance: i32,
    pub respawn_delay_secs: f64,
    pub slots: Vec<SpawnSlot>,
}

/// Tags a mob as spawned from a particular den slot, so `DespawnMobs`
/// cleanup (§4.5 cue) can free the slot on removal.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct FromDen {
    pub den: EntityId,
    pub slot_index: usize,
}

/// Marks an entity for deletion on the daily `RestCheck` cue (§4.9).
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Junk;

/// Marks an entity as never persisted (e.g. corpses) — excluded from
/// inventory save traversal (§4.9).
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct DoNotSave;

/// The account id a connected player entity was admitted under, carried so
/// a later `Disconnected` can save that player's inventory under the same
/// key it was loaded from (§4.13).
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct PersistedOwner(pub String);

/// Gates `is_busy`/`being_attacked` readiness checks (§4.4) and blocks a
/// proc from double-stunning. Cleared once `end_secs` passes.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct Stunned {
    pub end_secs: f64,
}
