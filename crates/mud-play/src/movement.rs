//! `MoveCompass`/`MovePosition`/`MoveEntity` handling and the
//! `PositionChanged` mutation step (§4.7).

use rustc_hash::FxHashMap;

use mud_core::signals::{MoveCompass, MoveEntity, MovePosition, Outbound, PositionChanged};
use mud_core::{EntityId, SignalBus};
use mud_world::components::{
    ContainedBy, Connection, Den, Drives, Glyph, Health, Noun, Slot, Stance, Stats, Transform,
};
use mud_world::entity::EntityStore;
use mud_world::terrain::{can_enter, Chips};

use crate::reach::chebyshev;

/// A freshly spawned den mob: minimal components matching the den's
/// starter set, left for the AI/combat systems to pick up by component
/// presence rather than by any explicit registration.
fn spawn_den_mob(store: &mut EntityStore, map_id: EntityId, y: i32, x: i32, name: &str, glyph: Glyph) -> EntityId {
    let eid = store.create_entity();
    store.add_component(eid, Transform { map_id, y, x });
    store.add_component(eid, Noun::new(name));
    store.add_component(eid, Health::full(50.0));
    store.add_component(eid, Stance::default());
    store.add_component(eid, Stats { grace: 10.0, grit: 10.0, wit: 5.0 });
    store.add_component(eid, glyph);
    store.add_component(
        eid,
        Drives {
            aggression: 0.6,
            fear: 0.2,
            hunger: 0.1,
            anchor_hate: 0.3,
        },
    );
    eid
}

/// Process one tick's worth of `MoveCompass` signals: blocked moves echo
/// a refusal to the mover (if connected); successful moves pulse
/// `PositionChanged` and may wake nearby dens.
pub fn process_move_compass(
    store: &mut EntityStore,
    bus: &mut SignalBus,
    chips_by_map: &FxHashMap<EntityId, Chips>,
    now_secs: f64,
) {
    let signals: Vec<MoveCompass> = bus.iter::<MoveCompass>().collect();
    for sig in signals {
        let Some(&loc) = store.try_component::<Transform>(sig.source) else { continue };
        let (dy, dx) = sig.dir.to_vector();
        let (to_y, to_x) = (loc.y + dy, loc.x + dx);

        let enterable = chips_by_map
            .get(&loc.map_id)
            .map(|chips| can_enter(chips, to_y, to_x))
            .unwrap_or(false);

        if !enterable {
            if store.has_component::<Connection>(sig.source) {
                bus.pulse(Outbound {
                    to: sig.source,
                    source: sig.source,
                    text: "You can't go there.".into(),
                });
            }
            continue;
        }

        bus.pulse(PositionChanged {
            source: sig.source,
            from_map_id: loc.map_id,
            from_y: loc.y,
            from_x: loc.x,
            to_map_id: loc.map_id,
            to_y,
            to_x,
            quiet: false,
        });

        if !store.has_component::<Connection>(sig.source) {
            continue;
        }

        wake_dens(store, loc.map_id, to_y, to_x, now_secs);
    }
}

fn wake_dens(store: &mut EntityStore, map_id: EntityId, to_y: i32, to_x: i32, now_secs: f64) {
    let to_loc = Transform { map_id, y: to_y, x: to_x };
    let candidates: Vec<(EntityId, i32, f64)> = store
        .query::<Den>()
        .filter_map(|(den_eid, den)| {
            let &tf = store.try_component::<Transform>(den_eid)?;
            let within = chebyshev(den.wake_distance, den.wake_distance)(tf, to_loc);
            within.then_some((den_eid, den.wake_distance, den.respawn_delay_secs))
        })
        .collect();

    for (den_eid, _wake_distance, respawn_delay_secs) in candidates {
        let Some(den) = store.try_component::<Den>(den_eid).cloned() else { continue };
        let mut slots = den.slots;
        for slot in &mut slots {
            let alive = slot.mob_eid.is_some_and(|m| store.entity_exists(m));
            if !slot.is_ready(now_secs, respawn_delay_secs, alive) {
                continue;
            }
            let mob = spawn_den_mob(
                store,
                slot.map_id,
                slot.y,
                slot.x,
                "goblin",
                Glyph::new('g', 0.25, 0.7, 0.6),
            );
            slot.mob_eid = Some(mob);
            slot.last_spawn_secs = now_secs;
        }
        store.add_component(den_eid, Den { slots, ..den });
    }
}

/// Process `MovePosition` (direct teleport/step) and `MoveEntity`
/// (containment transfer) signals, then the `PositionChanged` mutation
/// step shared by every mover.
pub fn process_move_position_and_entity(store: &mut EntityStore, bus: &mut SignalBus) {
    let move_positions: Vec<MovePosition> = bus.iter::<MovePosition>().collect();
    for sig in move_positions {
        let loc = store
            .try_component::<Transform>(sig.source)
            .copied()
            .unwrap_or(Transform::ORIGIN);
        bus.pulse(PositionChanged {
            source: sig.source,
            from_map_id: loc.map_id,
            from_y: loc.y,
            from_x: loc.x,
            to_map_id: sig.to_map_id,
            to_y: sig.to_y,
            to_x: sig.to_x,
            quiet: sig.quiet,
        });
        if store.has_component::<ContainedBy>(sig.source) {
            store.remove_component::<ContainedBy>(sig.source);
        }
        if store.has_component::<Slot>(sig.source) {
            store.add_component(sig.source, Slot::Any);
        }
    }

    let move_entities: Vec<MoveEntity> = bus.iter::<MoveEntity>().collect();
    for sig in move_entities {
        store.add_component(sig.source, ContainedBy(sig.container));
        store.add_component(sig.source, slot_from_ordinal(sig.slot_ordinal));

        if let Some(&loc) = store.try_component::<Transform>(sig.source) {
            bus.pulse(PositionChanged {
                source: sig.source,
                from_map_id: loc.map_id,
                from_y: loc.y,
                from_x: loc.x,
                to_map_id: EntityId(0),
                to_y: 0,
                to_x: 0,
                quiet: true,
            });
        }
    }

    let position_changes: Vec<PositionChanged> = bus.iter::<PositionChanged>().collect();
    for sig in position_changes {
        store.add_component(
            sig.source,
            Transform {
                map_id: sig.to_map_id,
                y: sig.to_y,
                x: sig.to_x,
            },
        );
    }
}

fn slot_from_ordinal(ordinal: u8) -> Slot {
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
