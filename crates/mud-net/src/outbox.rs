//! Per-tick mailbag: scan every `Outbound*` queue once, group entries by
//! recipient, and hand back one packet per connected recipient (§4.12).
//!
//! A tile entry that fails its lookup (map or tile absent) is skipped
//! without marking it sent, so a later retry can still succeed. Recipients
//! with no `Connection` component are dropped after the scan rather than
//! filtered per-signal, so every queue gets one combined pass.

use rustc_hash::FxHashMap;

use mud_core::signals::{
    Outbound, OutboundChipSet, OutboundCondition, OutboundDatetime, OutboundGas, OutboundGlyph,
    OutboundHealth, OutboundMove, OutboundNoun, OutboundPrompt, OutboundSkill, OutboundStance,
    OutboundTile,
};
use mud_core::{EntityId, SignalBus};
use mud_world::components::Connection;
use mud_world::entity::EntityStore;
use mud_world::terrain::{Chips, TileInstantiation};

use crate::wire::{rewrite_self, Packet, WireEntry};

/// Per-connection dedup state, keyed by the player entity rather than a
/// raw socket — entities outlive reconnects within a tick's lifetime, and
/// the table is pruned explicitly on disconnect via [`Outbox::forget`].
#[derive(Default)]
pub struct Outbox {
    sent_tiles: FxHashMap<EntityId, TileInstantiation>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn forget(&mut self, entity: EntityId) {
        self.sent_tiles.remove(&entity);
    }
}

/// Build this tick's mailbag. Entries are appended in the fixed type order
/// below, then in pulse order within each type — the same grouping the
/// envelope codec applies when serializing.
pub fn process(
    store: &EntityStore,
    bus: &SignalBus,
    chips_by_map: &FxHashMap<EntityId, Chips>,
    outbox: &mut Outbox,
    now_secs: f64,
) -> FxHashMap<EntityId, Packet> {
    let mut mailbag: FxHashMap<EntityId, Vec<WireEntry>> = FxHashMap::default();

    for sig in bus.iter::<Outbound>() {
        mailbag.entry(sig.to).or_default().push(WireEntry::Msg { text: sig.text });
    }

    for sig in bus.iter::<OutboundMove>() {
        mailbag.entry(sig.to).or_default().push(WireEntry::Pos {
            id: rewrite_self(sig.source, sig.to),
            map_id: sig.map_id.0,
            x: sig.x,
            y: sig.y,
        });
    }

    for sig in bus.iter::<OutboundChipSet>() {
        let entries = mailbag.entry(sig.to).or_default();
        for row in &sig.rows {
            entries.push(WireEntry::Chip {
                id: row.id,
                map_id: row.map_id.0,
                glyph: row.glyph,
                h: row.h,
                s: row.s,
                v: row.v,
                a: row.a,
            });
        }
    }

    for sig in bus.iter::<OutboundTile>() {
        let Some(chips) = chips_by_map.get(&sig.map_id) else { continue };
        let Some(data) = chips.get_tile(sig.top, sig.left) else { continue };
        let sent = outbox.sent_tiles.entry(sig.to).or_default();
        if sent.exists(sig.top, sig.left) {
            continue;
        }
        sent.mark_sent(sig.top, sig.left, now_secs);
        mailbag.entry(sig.to).or_default().push(WireEntry::Tile {
            map_id: sig.map_id.0,
            top: sig.top,
            left: sig.left,
            data: data.to_vec(),
        });
    }

    for sig in bus.iter::<OutboundGas>() {
        mailbag.entry(sig.to).or_default().push(WireEntry::Gas {
            id: sig.gas_id.0,
            map_id: sig.map_id.0,
            x: sig.x,
            y: sig.y,
            v: sig.v,
        });
    }

    for sig in bus.iter::<OutboundGlyph>() {
        mailbag.entry(sig.to).or_default().push(WireEntry::Glyph {
            id: rewrite_self(sig.source, sig.to),
            glyph: sig.glyph,
            h: sig.h,
            s: sig.s,
            v: sig.v,
        });
    }

    for sig in bus.iter::<OutboundNoun>() {
        mailbag.entry(sig.to).or_default().push(WireEntry::Noun {
            id: rewrite_self(sig.source, sig.to),
            text: sig.text,
        });
    }

    for sig in bus.iter::<OutboundHealth>() {
        mailbag.entry(sig.to).or_default().push(WireEntry::Health {
            id: rewrite_self(sig.source, sig.to),
            pct: sig.pct,
            stress_pct: sig.stress_pct,
        });
    }

    for sig in bus.iter::<OutboundStance>() {
        mailbag.entry(sig.to).or_default().push(WireEntry::Stance {
            id: rewrite_self(sig.source, sig.to),
            text: sig.text,
        });
    }

    for sig in bus.iter::<OutboundCondition>() {
        mailbag.entry(sig.to).or_default().push(WireEntry::Condition {
            id: rewrite_self(sig.source, sig.to),
            text: sig.text,
        });
    }

    for sig in bus.iter::<OutboundSkill>() {
        mailbag.entry(sig.to).or_default().push(WireEntry::Skill {
            name: sig.name,
            rank: sig.rank,
            tnl: sig.tnl,
            pending: sig.pending,
        });
    }

    for sig in bus.iter::<OutboundPrompt>() {
        mailbag.entry(sig.to).or_default().push(WireEntry::Prompt { text: sig.text });
    }

    for sig in bus.iter::<OutboundDatetime>() {
        mailbag.entry(sig.to).or_default().push(WireEntry::Datetime { seconds: sig.seconds });
    }

    mailbag.retain(|&to, _| store.has_component::<Connection>(to));

    mailbag
        .into_iter()
        .map(|(to, entries)| (to, Packet { entries }))
        .collect()
}
