//! Mob steering from weighted Dijkstra layers (§4.6). Movement emerges from
//! combining approach/avoid costs across the player, food, and anchor
//! layers rather than from any explicit path plan.

use rustc_hash::FxHashMap;

use mud_core::signals::{Inbound, MovePosition};
use mud_core::{EntityId, SignalBus};
use mud_time::ActQueue;
use mud_world::components::{Anchor, Condition, Connection, Drives, Health, Noun, Transform};
use mud_world::entity::EntityStore;
use mud_world::items::Food;
use mud_world::terrain::{can_enter, Chips};

use crate::dijkstra::DijkstraMap;

pub const TICK_RATE_HZ: f64 = 2.0;

fn manhattan(y1: i32, x1: i32, y2: i32, x2: i32) -> i32 {
    (y1 - y2).abs() + (x1 - x2).abs()
}

fn find_players(store: &EntityStore, map_id: EntityId) -> Vec<(i32, i32)> {
    store
        .query::<Connection>()
        .filter_map(|(e, _)| {
            let tf = store.try_component::<Transform>(e)?;
            if tf.map_id != map_id {
                return None;
            }
            let health = store.try_component::<Health>(e)?;
            if health.condition == Condition::Dead {
                return None;
            }
            Some((tf.y, tf.x))
        })
        .collect()
}

fn find_anchors(store: &EntityStore, map_id: EntityId) -> Vec<(i32, i32)> {
    store
        .query::<Anchor>()
        .filter_map(|(e, _)| {
            let tf = store.try_component::<Transform>(e)?;
            (tf.map_id == map_id).then_some((tf.y, tf.x))
        })
        .collect()
}

fn find_food(store: &EntityStore, map_id: EntityId) -> Vec<(i32, i32)> {
    store
        .query::<Food>()
        .filter_map(|(e, _)| {
            let tf = store.try_component::<Transform>(e)?;
            (tf.map_id == map_id).then_some((tf.y, tf.x))
        })
        .collect()
}

#[allow(clippy::too_many_arguments)]
fn best_direction(
    y: i32,
    x: i32,
    chips: &Chips,
    player_layer: &DijkstraMap,
    food_layer: &DijkstraMap,
    anchor_layer: &DijkstraMap,
    aggression: f64,
    fear: f64,
    hunger: f64,
    anchor_hate: f64,
    escape_local_minimum: bool,
) -> Option<(i32, i32)> {
    let score_at = |y: i32, x: i32| {
        player_layer.get_cost(y, x, false) * aggression
            + player_layer.get_cost(y, x, true) * fear
            + food_layer.get_cost(y, x, false) * hunger
            + anchor_layer.get_cost(y, x, true) * anchor_hate
    };

    let current_score = score_at(y, x);
    let mut best_score = current_score;
    let mut best_move = None;
    let mut fallback = None;

    const EIGHT_DIRS: [(i32, i32); 8] = [
        (-1, -1), (-1, 0), (-1, 1),
        (0, -1), (0, 1),
        (1, -1), (1, 0), (1, 1),
    ];

    for (dy, dx) in EIGHT_DIRS {
        let (ny, nx) = (y + dy, x + dx);
        if !can_enter(chips, ny, nx) {
            continue;
        }
        fallback = Some((dy, dx));
        let score = score_at(ny, nx);
        if score < best_score {
            best_score = score;
            best_move = Some((dy, dx));
        }
    }

    if escape_local_minimum {
        best_move.or(fallback)
    } else {
        best_move
    }
}

/// "React" short-circuit: a sufficiently aggressive, un-busy mob attacks
/// any live adjacent player directly, skipping the Dijkstra-driven move for
/// that tick.
fn react(
    store: &EntityStore,
    acts: &ActQueue,
    bus: &mut SignalBus,
    mob: EntityId,
    loc: Transform,
    aggression: f64,
    fear: f64,
) -> bool {
    if acts.is_busy(mob) {
        return true;
    }
    if aggression > 0.3 && aggression > fear {
        for (player, _) in store.query::<Connection>() {
            let Some(player_loc) = store.try_component::<Transform>(player) else { continue };
            if player_loc.map_id != loc.map_id {
                continue;
            }
            let Some(health) = store.try_component::<Health>(player) else { continue };
            if health.condition == Condition::Dead {
                continue;
            }
            if manhattan(player_loc.y, player_loc.x, loc.y, loc.x) <= 1 {
                let Some(noun) = store.try_component::<Noun>(player) else { continue };
                bus.pulse(Inbound {
                    source: mob,
                    text: format!("attack {}", noun.value),
                });
                return true;
            }
        }
    }
    false
}

/// Process every `Drives`-bearing mob, throttled to [`TICK_RATE_HZ`] per
/// simulation (not per mob). `now_secs` is the tick loop's elapsed time.
pub fn process(
    store: &EntityStore,
    acts: &ActQueue,
    bus: &mut SignalBus,
    chips_by_map: &FxHashMap<EntityId, Chips>,
    now_secs: f64,
    last_tick_secs: &mut f64,
) {
    if now_secs - *last_tick_secs < 1.0 / TICK_RATE_HZ {
        return;
    }
    *last_tick_secs = now_secs;

    let mut mobs_by_map: FxHashMap<EntityId, Vec<(EntityId, Drives, Transform, Health)>> = Default::default();
    for (eid, drives) in store.query::<Drives>() {
        let Some(loc) = store.try_component::<Transform>(eid) else { continue };
        let Some(health) = store.try_component::<Health>(eid) else { continue };
        mobs_by_map.entry(loc.map_id).or_default().push((eid, *drives, *loc, *health));
    }

    for (map_id, mobs) in mobs_by_map {
        let Some(chips) = chips_by_map.get(&map_id) else { continue };
        let enter = |y: i32, x: i32| can_enter(chips, y, x);

        let mut player_layer = DijkstraMap::new();
        let players = find_players(store, map_id);
        if !players.is_empty() {
            player_layer.compute(&players, enter);
        }

        let mut food_layer = DijkstraMap::new();
        let food = find_food(store, map_id);
        if !food.is_empty() {
            food_layer.compute(&food, enter);
        }

        let mut anchor_layer = DijkstraMap::new();
        let anchors = find_anchors(store, map_id);
        if !anchors.is_empty() {
            anchor_layer.compute(&anchors, enter);
        }

        for (eid, drives, loc, health) in mobs {
            let hp_pct = health.pct();
            let eff_aggression = drives.effective_aggression(hp_pct);
            let eff_fear = drives.effective_fear(hp_pct);

            if react(store, acts, bus, eid, loc, eff_aggression, eff_fear) {
                continue;
            }

            let move_dir = best_direction(
                loc.y,
                loc.x,
                chips,
                &player_layer,
                &food_layer,
                &anchor_layer,
                eff_aggression,
                eff_fear,
                drives.hunger,
                drives.anchor_hate,
                eff_fear > 0.0,
            );

            if let Some((dy, dx)) = move_dir {
                bus.pulse(MovePosition {
                    source: eid,
                    to_map_id: loc.map_id,
                    to_y: loc.y + dy,
                    to_x: loc.x + dx,
                    quiet: false,
                });
            }
        }
    }
}
