//! Visibility deltas (§4.7): turn this tick's `PositionChanged` signals into
//! the `OutboundMove`/`OutboundTile`/`OutboundChipSet` packets each
//! connected viewer needs — the mover's own view window, plus every other
//! connected entity gaining or losing sight of the mover.

use mud_core::signals::{ChipRow, OutboundChipSet, OutboundMove, OutboundTile, PositionChanged};
use mud_core::{EntityId, SignalBus};
use mud_world::components::{Connection, Transform};
use mud_world::entity::EntityStore;
use mud_world::terrain::tile_key;

use mud_play::reach::{visible, VIEW_HEIGHT, VIEW_WIDTH};

const CORNERS: [(i32, i32); 4] = [
    (VIEW_WIDTH, VIEW_HEIGHT),
    (-VIEW_WIDTH, VIEW_HEIGHT),
    (VIEW_WIDTH, -VIEW_HEIGHT),
    (-VIEW_WIDTH, -VIEW_HEIGHT),
];

/// The client has no tileset registry in this workspace; a fixed default
/// palette is sent whenever a mover crosses maps so the client always has
/// *some* glyph to draw walkable/wall tiles with.
fn default_chip_rows(map_id: EntityId) -> Vec<ChipRow> {
    vec![
        ChipRow { id: 0, map_id, glyph: ' ' as u32, h: 0.0, s: 0.0, v: 0.0, a: 0.0 },
        ChipRow { id: 1, map_id, glyph: '.' as u32, h: 0.0, s: 0.0, v: 0.3, a: 1.0 },
        ChipRow { id: 2, map_id, glyph: '#' as u32, h: 0.0, s: 0.0, v: 0.1, a: 1.0 },
        ChipRow { id: 3, map_id, glyph: ',' as u32, h: 0.25, s: 0.4, v: 0.35, a: 1.0 },
    ]
}

fn send_self_view(bus: &mut SignalBus, source: EntityId, sig: &PositionChanged) {
    bus.pulse(OutboundMove {
        to: source,
        source,
        map_id: sig.to_map_id,
        x: sig.to_x,
        y: sig.to_y,
    });

    for (dy, dx) in CORNERS {
        let (top, left) = tile_key(sig.to_y + dy, sig.to_x + dx);
        bus.pulse(OutboundTile { to: source, map_id: sig.to_map_id, top, left });
    }

    if sig.to_map_id != sig.from_map_id {
        bus.pulse(OutboundChipSet { to: source, rows: default_chip_rows(sig.to_map_id) });
    }
}

/// Process every `PositionChanged` signal pulsed this tick. Must run after
/// the position mutation step so other viewers' own `Transform`s are
/// already current, but reads the signals themselves rather than diffing
/// state.
pub fn process(store: &EntityStore, bus: &mut SignalBus, signals: &[PositionChanged]) {
    for sig in signals {
        let to_loc = Transform { map_id: sig.to_map_id, y: sig.to_y, x: sig.to_x };
        let from_loc = Transform { map_id: sig.from_map_id, y: sig.from_y, x: sig.from_x };

        if store.has_component::<Connection>(sig.source) {
            send_self_view(bus, sig.source, sig);
        }

        if sig.quiet {
            continue;
        }

        for (other, _) in store.query::<Connection>() {
            if other == sig.source {
                continue;
            }
            let Some(&other_loc) = store.try_component::<Transform>(other) else { continue };

            let sees_now = other_loc.map_id == sig.to_map_id && visible(other_loc, to_loc);
            let saw_before = other_loc.map_id == sig.from_map_id && visible(other_loc, from_loc);

            if sees_now {
                bus.pulse(OutboundMove {
                    to: other,
                    source: sig.source,
                    map_id: sig.to_map_id,
                    x: sig.to_x,
                    y: sig.to_y,
                });
                if !saw_before && store.has_component::<Connection>(sig.source) {
                    // The mover is newly in range of this observer too —
                    // announce the observer back to the mover.
                    bus.pulse(OutboundMove {
                        to: sig.source,
                        source: other,
                        map_id: other_loc.map_id,
                        x: other_loc.x,
                        y: other_loc.y,
                    });
                }
            } else if saw_before {
                // Observer is losing sight of the mover: announce its last
                // known position so the client can drop it cleanly.
                bus.pulse(OutboundMove {
                    to: other,
                    source: sig.source,
                    map_id: sig.from_map_id,
                    x: sig.from_x,
                    y: sig.from_y,
                });
            }
        }
    }
}
