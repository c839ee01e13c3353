//! The binary envelope format sent to clients (§4.12, §6): a flat list of
//! typed entries, bincode-framed. `id` fields use entity id `0` to mean
//! "the recipient themself" — see [`rewrite_self`].

use serde::{Deserialize, Serialize};

use mud_core::EntityId;

/// One entry in an outbound packet. Order in [`Packet::entries`] is the
/// order entries were appended to the recipient's mailbag this tick.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum WireEntry {
    Msg { text: String },
    Pos { id: u64, map_id: u64, x: i32, y: i32 },
    Chip { id: u16, map_id: u64, glyph: u32, h: f32, s: f32, v: f32, a: f32 },
    Tile { map_id: u64, top: i32, left: i32, data: Vec<u8> },
    Glyph { id: u64, glyph: u32, h: f32, s: f32, v: f32 },
    Noun { id: u64, text: String },
    Health { id: u64, pct: f32, stress_pct: f32 },
    Stance { id: u64, text: String },
    Condition { id: u64, text: String },
    Skill { name: String, rank: u32, tnl: f64, pending: f64 },
    Datetime { seconds: f64 },
    Prompt { text: String },
    Gas { id: u64, map_id: u64, x: i32, y: i32, v: f32 },
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Packet {
    pub entries: Vec<WireEntry>,
}

/// `0` if `id == to` (the recipient talking about themself), else `id`
/// itself — the wire protocol's self-rewriting convention (§6).
pub fn rewrite_self(id: EntityId, to: EntityId) -> u64 {
    if id == to {
        EntityId::RECIPIENT.0
    } else {
        id.0
    }
}

pub fn encode_packet(packet: &Packet) -> crate::error::NetResult<Vec<u8>> {
    Ok(bincode::serialize(packet)?)
}

#[allow(dead_code)]
pub fn decode_packet(bytes: &[u8]) -> crate::error::NetResult<Packet> {
    Ok(bincode::deserialize(bytes)?)
}
