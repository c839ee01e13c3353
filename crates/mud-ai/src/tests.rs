use rustc_hash::FxHashMap;

use mud_core::signals::{Melee, MovePosition};
use mud_core::{EntityId, SignalBus};
use mud_time::ActQueue;
use mud_world::components::{Connection, Drives, Health, Noun, Target, Transform};
use mud_world::entity::EntityStore;
use mud_world::terrain::Chips;

use crate::behavior::{can_execute, execute, Behavior, BehaviorQueue};
use crate::dijkstra::DijkstraMap;
use crate::drives;

fn open_chips(size: i32) -> Chips {
    let mut chips = Chips::new(size, size);
    let walkable = [1u8; 256];
    let mut y = 0;
    while y < size {
        let mut x = 0;
        while x < size {
            chips.set_tile(y, x, walkable);
            x += 16;
        }
        y += 16;
    }
    chips
}

mod dijkstra_map {
    use super::*;

    #[test]
    fn cost_grows_by_one_per_step_in_open_field() {
        let chips = open_chips(32);
        let mut dm = DijkstraMap::new();
        dm.compute(&[(0, 0)], |y, x| mud_world::terrain::can_enter(&chips, y, x));
        assert_eq!(dm.get_cost(0, 0, false), 0.0);
        assert_eq!(dm.get_cost(1, 0, false), 1.0);
        assert_eq!(dm.get_cost(1, 1, false), 1.0); // diagonal also costs 1
    }

    #[test]
    fn unreached_cell_returns_sentinel_by_inversion_flag() {
        let chips = Chips::new(32, 32); // nothing walkable
        let mut dm = DijkstraMap::new();
        dm.compute(&[(5, 5)], |y, x| mud_world::terrain::can_enter(&chips, y, x));
        assert_eq!(dm.get_cost(10, 10, false), dm.max_cost);
        assert_eq!(dm.get_cost(10, 10, true), 0.0);
    }

    #[test]
    fn roll_downhill_points_toward_the_goal() {
        let chips = open_chips(32);
        let mut dm = DijkstraMap::new();
        dm.compute(&[(0, 0)], |y, x| mud_world::terrain::can_enter(&chips, y, x));
        let dir = dm.roll_downhill(3, 3).expect("reachable cell has a downhill direction");
        let (dy, dx) = dir.to_vector();
        assert!(dy <= 0 && dx <= 0);
    }
}

mod drives_system {
    use super::*;

    #[test]
    fn aggressive_mob_reacts_and_attacks_adjacent_player() {
        let mut store = EntityStore::new();
        let mut bus = SignalBus::new();
        let acts = ActQueue::new();
        let map_id = EntityId(1);
        let chips = open_chips(32);
        let mut chips_by_map = FxHashMap::default();
        chips_by_map.insert(map_id, chips);

        let player = store.create_entity();
        store.add_component(player, Transform { map_id, y: 5, x: 5 });
        store.add_component(player, Connection(1));
        store.add_component(player, Health::full(100.0));
        store.add_component(player, Noun::new("wanderer"));

        let mob = store.create_entity();
        store.add_component(mob, Transform { map_id, y: 5, x: 6 });
        store.add_component(
            mob,
            Drives {
                aggression: 0.9,
                fear: 0.0,
                hunger: 0.0,
                anchor_hate: 0.0,
            },
        );
        store.add_component(mob, Health::full(100.0));

        let mut last_tick = -1.0;
        drives::process(&store, &acts, &mut bus, &chips_by_map, 0.0, &mut last_tick);

        assert_eq!(bus.iter::<mud_core::signals::Inbound>().count(), 1);
    }

    #[test]
    fn distant_mob_moves_toward_nearest_player() {
        let mut store = EntityStore::new();
        let mut bus = SignalBus::new();
        let acts = ActQueue::new();
        let map_id = EntityId(1);
        let chips = open_chips(32);
        let mut chips_by_map = FxHashMap::default();
        chips_by_map.insert(map_id, chips);

        let player = store.create_entity();
        store.add_component(player, Transform { map_id, y: 0, x: 0 });
        store.add_component(player, Connection(1));
        store.add_component(player, Health::full(100.0));
        store.add_component(player, Noun::new("wanderer"));

        let mob = store.create_entity();
        store.add_component(mob, Transform { map_id, y: 10, x: 10 });
        store.add_component(
            mob,
            Drives {
                aggression: 0.9,
                fear: 0.0,
                hunger: 0.0,
                anchor_hate: 0.0,
            },
        );
        store.add_component(mob, Health::full(100.0));

        let mut last_tick = -1.0;
        drives::process(&store, &acts, &mut bus, &chips_by_map, 0.0, &mut last_tick);

        let moves: Vec<_> = bus.iter::<MovePosition>().collect();
        assert_eq!(moves.len(), 1);
        let m = &moves[0];
        assert!(m.to_y <= 10 && m.to_x <= 10);
    }

    #[test]
    fn throttle_suppresses_processing_within_the_tick_window() {
        let store = EntityStore::new();
        let mut bus = SignalBus::new();
        let acts = ActQueue::new();
        let chips_by_map = FxHashMap::default();

        let mut last_tick = 0.0;
        drives::process(&store, &acts, &mut bus, &chips_by_map, 0.1, &mut last_tick);
        assert_eq!(last_tick, 0.0, "still within the 2Hz window, should not advance");
    }
}

mod behavior_queue {
    use super::*;

    #[test]
    fn select_nearest_player_sets_target() {
        let mut store = EntityStore::new();
        let map_id = EntityId(1);

        let player = store.create_entity();
        store.add_component(player, Transform { map_id, y: 0, x: 0 });
        store.add_component(player, Connection(1));

        let mob = store.create_entity();
        store.add_component(mob, Transform { map_id, y: 1, x: 1 });

        let behavior = Behavior::SelectNearestPlayer;
        assert!(can_execute(&store, mob, &behavior));
        let chips = open_chips(32);
        let mut bus = SignalBus::new();
        assert!(execute(&mut store, &chips, &mut bus, mob, &behavior));
        assert_eq!(store.try_component::<Target>(mob), Some(&Target(player)));
    }

    #[test]
    fn attack_requires_adjacency() {
        let mut store = EntityStore::new();
        let map_id = EntityId(1);

        let target = store.create_entity();
        store.add_component(target, Transform { map_id, y: 0, x: 5 });
        store.add_component(target, Health::full(50.0));

        let mob = store.create_entity();
        store.add_component(mob, Transform { map_id, y: 0, x: 0 });
        store.add_component(mob, Target(target));

        let chips = open_chips(32);
        assert!(!can_execute(&store, mob, &Behavior::Attack));

        store.add_component(mob, Transform { map_id, y: 0, x: 5 });
        assert!(can_execute(&store, mob, &Behavior::Attack));

        let mut bus = SignalBus::new();
        assert!(execute(&mut store, &chips, &mut bus, mob, &Behavior::Attack));
        assert_eq!(bus.iter::<Melee>().count(), 1);
    }

    #[test]
    fn behavior_queue_stops_at_first_success() {
        let mut store = EntityStore::new();
        let map_id = EntityId(1);
        let mob = store.create_entity();
        store.add_component(mob, Transform { map_id, y: 0, x: 0 });

        let queue = BehaviorQueue {
            behaviors: vec![Behavior::PathTowardCoordinate { y: 0, x: 0 }, Behavior::Wait],
        };
        let chips = open_chips(32);
        let mut bus = SignalBus::new();
        // Already at the coordinate, so PathTowardCoordinate can't execute;
        // Wait should be the one that succeeds.
        let ran = crate::behavior::process_behavior_queue(&mut store, &chips, &mut bus, mob, &queue);
        assert!(ran);
        assert!(bus.iter::<MovePosition>().next().is_none());
    }
}
