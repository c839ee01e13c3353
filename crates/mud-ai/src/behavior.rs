//! Behavior priority queues (§4.6): each mob tries its behaviors in order
//! until one both can and does execute; a data-table-of-closures table
//! would work too, but a closed enum of nine behaviors reads more
//! naturally as a Rust `enum` with `can_execute`/`execute` matches.

use mud_core::signals::{Melee, MovePosition};
use mud_core::{EntityId, SignalBus};
use mud_world::components::{Condition, Health, Target, Transform};
use mud_world::entity::EntityStore;
use mud_world::terrain::{can_enter, Chips};

use crate::dijkstra::DijkstraMap;

#[derive(Clone, PartialEq, Debug)]
pub enum Behavior {
    SelectNearestPlayer,
    SelectNearestAnchor,
    PathTowardEntity,
    PathTowardCoordinate { y: i32, x: i32 },
    Attack,
    FlankTarget,
    FleeFromEntity,
    Wait,
    UseAbility { ability: String },
}

/// A mob's prioritized behavior list, tried top-to-bottom each tick until
/// one succeeds.
#[derive(Clone, Default, Debug)]
pub struct BehaviorQueue {
    pub behaviors: Vec<Behavior>,
}

fn is_adjacent(a: Transform, b: Transform) -> bool {
    a.map_id == b.map_id && (a.y - b.y).abs() + (a.x - b.x).abs() <= 1
}

fn find_nearest<T: 'static + Send>(
    store: &EntityStore,
    eid: EntityId,
    loc: Transform,
) -> Option<EntityId> {
    store
        .query::<T>()
        .filter(|&(other, _)| other != eid)
        .filter_map(|(other, _)| {
            let other_loc = store.try_component::<Transform>(other)?;
            (other_loc.map_id == loc.map_id)
                .then(|| (other, (loc.y - other_loc.y).abs() + (loc.x - other_loc.x).abs()))
        })
        .min_by_key(|&(_, dist)| dist)
        .map(|(other, _)| other)
}

fn flank_positions(chips: &Chips, target_loc: Transform) -> Vec<(i32, i32)> {
    let mut diagonal = Vec::new();
    let mut orthogonal = Vec::new();
    for dy in [-1, 0, 1] {
        for dx in [-1, 0, 1] {
            if dy == 0 && dx == 0 {
                continue;
            }
            let (fy, fx) = (target_loc.y + dy, target_loc.x + dx);
            if !can_enter(chips, fy, fx) {
                continue;
            }
            if dy != 0 && dx != 0 {
                diagonal.push((fy, fx));
            } else {
                orthogonal.push((fy, fx));
            }
        }
    }
    diagonal.extend(orthogonal);
    diagonal
}

pub fn can_execute(store: &EntityStore, eid: EntityId, behavior: &Behavior) -> bool {
    let Some(&loc) = store.try_component::<Transform>(eid) else {
        return matches!(behavior, Behavior::Wait);
    };
    match behavior {
        Behavior::SelectNearestPlayer => {
            find_nearest::<mud_world::components::Connection>(store, eid, loc).is_some()
        }
        Behavior::SelectNearestAnchor => {
            find_nearest::<mud_world::components::Anchor>(store, eid, loc).is_some()
        }
        Behavior::PathTowardEntity => {
            let Some(target) = store.try_component::<Target>(eid) else { return false };
            if !store.entity_exists(target.0) {
                return false;
            }
            let Some(&target_loc) = store.try_component::<Transform>(target.0) else { return false };
            loc.map_id == target_loc.map_id && !(loc.y == target_loc.y && loc.x == target_loc.x)
        }
        Behavior::PathTowardCoordinate { y, x } => !(loc.y == *y && loc.x == *x),
        Behavior::Attack => {
            let Some(target) = store.try_component::<Target>(eid) else { return false };
            if !store.entity_exists(target.0) {
                return false;
            }
            let Some(&target_loc) = store.try_component::<Transform>(target.0) else { return false };
            is_adjacent(loc, target_loc)
        }
        Behavior::FlankTarget => {
            let Some(target) = store.try_component::<Target>(eid) else { return false };
            if !store.entity_exists(target.0) {
                return false;
            }
            let Some(&target_loc) = store.try_component::<Transform>(target.0) else { return false };
            loc.map_id == target_loc.map_id && !is_adjacent(loc, target_loc)
        }
        Behavior::FleeFromEntity => {
            let Some(target) = store.try_component::<Target>(eid) else { return false };
            store.entity_exists(target.0)
        }
        Behavior::Wait => true,
        Behavior::UseAbility { .. } => true,
    }
}

pub fn execute(
    store: &mut EntityStore,
    chips: &Chips,
    bus: &mut SignalBus,
    eid: EntityId,
    behavior: &Behavior,
) -> bool {
    let Some(&loc) = store.try_component::<Transform>(eid) else {
        return matches!(behavior, Behavior::Wait);
    };
    match behavior {
        Behavior::SelectNearestPlayer => {
            let Some(player) = find_nearest::<mud_world::components::Connection>(store, eid, loc) else {
                return false;
            };
            store.add_component(eid, Target(player));
            true
        }
        Behavior::SelectNearestAnchor => {
            let Some(anchor) = find_nearest::<mud_world::components::Anchor>(store, eid, loc) else {
                return false;
            };
            store.add_component(eid, Target(anchor));
            true
        }
        Behavior::PathTowardEntity => {
            let Some(target) = store.try_component::<Target>(eid).copied() else { return false };
            let Some(&target_loc) = store.try_component::<Transform>(target.0) else { return false };
            path_toward(store, chips, bus, eid, loc, &[(target_loc.y, target_loc.x)])
        }
        Behavior::PathTowardCoordinate { y, x } => path_toward(store, chips, bus, eid, loc, &[(*y, *x)]),
        Behavior::Attack => {
            let Some(target) = store.try_component::<Target>(eid).copied() else { return false };
            let Some(&target_loc) = store.try_component::<Transform>(target.0) else { return false };
            if !is_adjacent(loc, target_loc) {
                return false;
            }
            if let Some(health) = store.try_component::<Health>(target.0) {
                if health.condition == Condition::Dead {
                    return false;
                }
            }
            bus.pulse(Melee {
                source: eid,
                target: target.0,
                verb: "slash".into(),
            });
            true
        }
        Behavior::FlankTarget => {
            let Some(target) = store.try_component::<Target>(eid).copied() else { return false };
            let Some(&target_loc) = store.try_component::<Transform>(target.0) else { return false };
            let positions = flank_positions(chips, target_loc);
            if positions.is_empty() {
                return false;
            }
            path_toward(store, chips, bus, eid, loc, &positions)
        }
        Behavior::FleeFromEntity => {
            let Some(target) = store.try_component::<Target>(eid).copied() else { return false };
            let Some(&target_loc) = store.try_component::<Transform>(target.0) else { return false };
            let mut dm = DijkstraMap::new();
            dm.compute(&[(target_loc.y, target_loc.x)], |y, x| can_enter(chips, y, x));
            let Some(dir) = dm.climb_uphill(loc.y, loc.x, |y, x| can_enter(chips, y, x)) else {
                return false;
            };
            let (dy, dx) = dir.to_vector();
            let (ny, nx) = (loc.y + dy, loc.x + dx);
            if !can_enter(chips, ny, nx) {
                return false;
            }
            bus.pulse(MovePosition {
                source: eid,
                to_map_id: loc.map_id,
                to_y: ny,
                to_x: nx,
                quiet: false,
            });
            true
        }
        Behavior::Wait => true,
        Behavior::UseAbility { .. } => true,
    }
}

fn path_toward(
    _store: &mut EntityStore,
    chips: &Chips,
    bus: &mut SignalBus,
    eid: EntityId,
    loc: Transform,
    goals: &[(i32, i32)],
) -> bool {
    let mut dm = DijkstraMap::new();
    dm.compute(goals, |y, x| can_enter(chips, y, x));
    let Some(dir) = dm.roll_downhill(loc.y, loc.x) else {
        return false;
    };
    let (dy, dx) = dir.to_vector();
    let (ny, nx) = (loc.y + dy, loc.x + dx);
    if !can_enter(chips, ny, nx) {
        return false;
    }
    bus.pulse(MovePosition {
        source: eid,
        to_map_id: loc.map_id,
        to_y: ny,
        to_x: nx,
        quiet: false,
    });
    true
}

/// Try each behavior in order until one both can and does execute.
pub fn process_behavior_queue(
    store: &mut EntityStore,
    chips: &Chips,
    bus: &mut SignalBus,
    eid: EntityId,
    queue: &BehaviorQueue,
) -> bool {
    for behavior in &queue.behaviors {
        if can_execute(store, eid, behavior) && execute(store, chips, bus, eid, behavior) {
            return true;
        }
    }
    false
}
