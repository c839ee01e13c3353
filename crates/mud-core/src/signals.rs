//! Concrete signal taxonomy (§4.2), grouped as transport / simulation /
//! time signals. These live in `mud-core` (rather than in the domain crate
//! that reacts to each one) purely to give every crate in the workspace a
//! shared, dependency-free vocabulary to pulse and iterate from a single
//! place.
//!
//! Each signal is a plain, `Clone`able value type so [`crate::SignalBus`]
//! can snapshot its queues freely.

use crate::EntityId;

/// Compass direction for `MoveCompass` (§4.7).
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Compass {
    N,
    Ne,
    E,
    Se,
    S,
    Sw,
    W,
    Nw,
}

impl Compass {
    pub fn to_vector(self) -> (i32, i32) {
        match self {
            Compass::N => (-1, 0),
            Compass::Ne => (-1, 1),
            Compass::E => (0, 1),
            Compass::Se => (1, 1),
            Compass::S => (1, 0),
            Compass::Sw => (1, -1),
            Compass::W => (0, -1),
            Compass::Nw => (-1, -1),
        }
    }

    pub fn from_vector(dy: i32, dx: i32) -> Option<Compass> {
        Some(match (dy.signum(), dx.signum()) {
            (-1, 0) => Compass::N,
            (-1, 1) => Compass::Ne,
            (0, 1) => Compass::E,
            (1, 1) => Compass::Se,
            (1, 0) => Compass::S,
            (1, -1) => Compass::Sw,
            (0, -1) => Compass::W,
            (-1, -1) => Compass::Nw,
            _ => return None,
        })
    }
}

/// Audience selector for [`Emit`]/[`Echo`] — a serializable stand-in for the
/// `Reach` predicate (§4.7) used when a signal itself must carry "who can
/// hear this", not just be filtered by a reach function at the call site.
#[derive(Copy, Clone, PartialEq, Debug)]
pub enum ReachKind {
    Adjacent,
    Visible { view_w: i32, view_h: i32 },
    World,
    Chebyshev { r_y: i32, r_x: i32 },
}

// ── Transport signals ──────────────────────────────────────────────────────

#[derive(Clone, Debug)]
pub struct Connected {
    pub entity: EntityId,
}

#[derive(Clone, Debug)]
pub struct Disconnected {
    pub entity: EntityId,
}

#[derive(Clone, Debug)]
pub struct Inbound {
    pub source: EntityId,
    pub text: String,
}

#[derive(Clone, Debug)]
pub struct InboundPrompt {
    pub source: EntityId,
    pub text: String,
}

#[derive(Clone, Debug)]
pub struct Outbound {
    pub to: EntityId,
    pub source: EntityId,
    pub text: String,
}

#[derive(Clone, Debug)]
pub struct OutboundTile {
    pub to: EntityId,
    pub map_id: EntityId,
    pub top: i32,
    pub left: i32,
}

#[derive(Clone, Copy, Debug)]
pub struct ChipRow {
    pub id: u16,
    pub map_id: EntityId,
    pub glyph: u32,
    pub h: f32,
    pub s: f32,
    pub v: f32,
    pub a: f32,
}

#[derive(Clone, Debug)]
pub struct OutboundChipSet {
    pub to: EntityId,
    pub rows: Vec<ChipRow>,
}

#[derive(Clone, Debug)]
pub struct OutboundMove {
    pub to: EntityId,
    pub source: EntityId,
    pub map_id: EntityId,
    pub x: i32,
    pub y: i32,
}

#[derive(Clone, Debug)]
pub struct OutboundGas {
    pub to: EntityId,
    pub gas_id: EntityId,
    pub map_id: EntityId,
    pub x: i32,
    pub y: i32,
    pub v: f32,
}

#[derive(Clone, Debug)]
pub struct OutboundSkill {
    pub to: EntityId,
    pub name: String,
    pub rank: u32,
    pub tnl: f64,
    pub pending: f64,
}

#[derive(Clone, Debug)]
pub struct OutboundPrompt {
    pub to: EntityId,
    pub text: String,
}

#[derive(Clone, Debug)]
pub struct OutboundGlyph {
    pub to: EntityId,
    pub source: EntityId,
    pub glyph: u32,
    pub h: f32,
    pub s: f32,
    pub v: f32,
}

#[derive(Clone, Debug)]
pub struct OutboundNoun {
    pub to: EntityId,
    pub source: EntityId,
    pub text: String,
}

#[derive(Clone, Debug)]
pub struct OutboundHealth {
    pub to: EntityId,
    pub source: EntityId,
    pub pct: f32,
    pub stress_pct: f32,
}

#[derive(Clone, Debug)]
pub struct OutboundStance {
    pub to: EntityId,
    pub source: EntityId,
    pub text: String,
}

#[derive(Clone, Debug)]
pub struct OutboundCondition {
    pub to: EntityId,
    pub source: EntityId,
    pub text: String,
}

#[derive(Clone, Debug)]
pub struct OutboundDatetime {
    pub to: EntityId,
    pub seconds: f64,
}

// ── Simulation signals ──────────────────────────────────────────────────────

#[derive(Clone, Debug)]
pub struct Parse {
    pub source: EntityId,
    pub text: String,
}

#[derive(Clone, Copy, Debug)]
pub struct MoveCompass {
    pub source: EntityId,
    pub dir: Compass,
}

#[derive(Clone, Copy, Debug)]
pub struct MovePosition {
    pub source: EntityId,
    pub to_map_id: EntityId,
    pub to_y: i32,
    pub to_x: i32,
    pub quiet: bool,
}

#[derive(Clone, Copy, Debug)]
pub struct MoveEntity {
    pub source: EntityId,
    pub container: EntityId,
    /// Ordinal of `mud_world::components::Slot`; kept as a primitive here
    /// so `mud-core` has no dependency on `mud-world`.
    pub slot_ordinal: u8,
}

#[derive(Clone, Copy, Debug)]
pub struct PositionChanged {
    pub source: EntityId,
    pub from_map_id: EntityId,
    pub from_y: i32,
    pub from_x: i32,
    pub to_map_id: EntityId,
    pub to_y: i32,
    pub to_x: i32,
    pub quiet: bool,
}

#[derive(Clone, Copy, Debug)]
pub struct StanceChanged {
    pub source: EntityId,
    pub to_ordinal: u8,
}

#[derive(Clone, Copy, Debug)]
pub struct ConditionChanged {
    pub source: EntityId,
    pub to_ordinal: u8,
}

#[derive(Clone, Copy, Debug)]
pub struct HealthChanged {
    pub source: EntityId,
}

#[derive(Clone, Debug)]
pub struct Melee {
    pub source: EntityId,
    pub target: EntityId,
    pub verb: String,
}

#[derive(Clone, Debug)]
pub struct Proc {
    pub verb: String,
    pub target: EntityId,
}

#[derive(Clone, Copy, Debug)]
pub struct Die {
    pub entity: EntityId,
}

#[derive(Clone, Debug)]
pub struct Learn {
    pub source: EntityId,
    pub skill: String,
    pub mult: f64,
    pub risk: f64,
    pub generation: u32,
}

#[derive(Clone, Copy, Debug)]
pub struct AbsorbRestExp {
    pub source: EntityId,
}

/// Followup payload for a delayed [`Act`] — a closed set, not an arbitrary
/// signal, so the act queue can hold it without type erasure.
#[derive(Clone, Debug)]
pub enum ActEffect {
    Melee(Melee),
    StanceChanged(StanceChanged),
}

#[derive(Clone, Debug)]
pub struct Act {
    pub source: EntityId,
    /// Who this act's effect resolves against; consulted by
    /// `is_busy`/`being_attacked`/`attacked_by_other` (§4.4).
    pub target: EntityId,
    pub delay_secs: f64,
    pub then: ActEffect,
    /// Monotonically increasing id, unique per `Act`; used by the
    /// `current[source]` busy discipline (§4.4).
    pub id: u64,
}

#[derive(Clone, Copy, Debug)]
pub struct Interrupt {
    pub source: EntityId,
}

#[derive(Clone, Copy, Debug)]
pub struct Cleanup {
    pub entity: EntityId,
}

#[derive(Clone, Debug)]
pub struct Echo {
    pub map_id: EntityId,
    pub origin_y: i32,
    pub origin_x: i32,
    pub reach: ReachKind,
    pub text: String,
}

#[derive(Clone, Debug)]
pub struct Emit {
    pub source: EntityId,
    pub reach: ReachKind,
    pub text: String,
    pub target: Option<EntityId>,
    pub target_text: Option<String>,
}

#[derive(Clone, Copy, Debug)]
pub struct ItemDropped {
    pub entity: EntityId,
    pub map_id: EntityId,
    pub y: i32,
    pub x: i32,
}

// ── Time signals ─────────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug)]
pub struct NightstormWarning;

#[derive(Clone, Copy, Debug)]
pub struct RestCheck;

#[derive(Clone, Copy, Debug)]
pub struct DespawnMobs;

#[derive(Clone, Copy, Debug)]
pub struct PhaseChanged {
    pub new_phase: u8,
}

#[derive(Clone, Copy, Debug)]
pub struct DecayCheck;

#[derive(Clone, Copy, Debug)]
pub struct TileDecay {
    pub map_id: EntityId,
    pub center_y: i32,
    pub center_x: i32,
}

#[derive(Clone, Copy, Debug)]
pub struct Rot {
    pub entity: EntityId,
}

#[derive(Clone, Copy, Debug)]
pub struct Cook {
    pub entity: EntityId,
    pub cookware: EntityId,
}

#[derive(Clone, Copy, Debug)]
pub struct Roast {
    pub entity: EntityId,
}

#[derive(Clone, Copy, Debug)]
pub struct GrowAnchor {
    pub anchor: EntityId,
}

#[derive(Clone, Copy, Debug)]
pub struct AnchorDestroyed {
    pub anchor: EntityId,
}

#[derive(Clone, Copy, Debug)]
pub struct WaveMobAttacksAnchor {
    pub anchor: EntityId,
    pub mob: EntityId,
}
