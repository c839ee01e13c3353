//! Seed-pinned end-to-end scenarios (§8): move blocked, attack at range 1,
//! interrupt cancels attack, Dijkstra flee, nightclock brightness at the
//! nightstorm boundary, containment save/load.

use rustc_hash::FxHashMap;

use mud_ai::dijkstra::DijkstraMap;
use mud_core::signals::{Act, ActEffect, Interrupt, Melee, MoveCompass, Outbound, PositionChanged};
use mud_core::SignalBus;
use mud_play::commands::{default_commands, Command, CommandContext};
use mud_play::combat::MELEE_DELAY_SECS;
use mud_time::clock::{NightClock, NightTime};
use mud_time::ActQueue;
use mud_world::components::{Health, Noun, Stats, Transform};
use mud_world::items::ItemKey;
use mud_world::entity::EntityStore;
use mud_world::inventory::{create_item, load_rows, save_player_inventory};
use mud_world::terrain::{Chips, TILE_STRIDE};

fn walkable_chips(width: i32, height: i32) -> Chips {
    let mut chips = Chips::new(width, height);
    let floor = [1u8; (TILE_STRIDE * TILE_STRIDE) as usize];
    let mut ty = 0;
    while ty < height {
        let mut tx = 0;
        while tx < width {
            chips.set_tile(ty, tx, floor);
            tx += TILE_STRIDE;
        }
        ty += TILE_STRIDE;
    }
    chips
}

#[test]
fn move_into_a_wall_is_blocked_and_refused() {
    let mut store = EntityStore::new();
    let map_id = store.create_entity();
    let chips = walkable_chips(TILE_STRIDE, TILE_STRIDE); // single open tile, no wall cells set, so beyond it is unmapped == blocked

    let mover = store.create_entity();
    store.add_component(mover, Transform { map_id, y: 0, x: TILE_STRIDE - 1 });
    store.add_component(mover, mud_world::components::Connection(1));

    let mut chips_by_map = FxHashMap::default();
    chips_by_map.insert(map_id, chips);

    let mut bus = SignalBus::new();
    bus.pulse(MoveCompass { source: mover, dir: mud_core::signals::Compass::East });
    mud_play::movement::process_move_compass(&mut store, &mut bus, &chips_by_map, 0.0);

    assert!(bus.is_empty::<PositionChanged>(), "stepping off the mapped tile must not move the entity");
    let refusals: Vec<_> = bus.iter::<Outbound>().collect();
    assert!(refusals.iter().any(|o| o.to == mover && o.text.contains("can't go")));
}

#[test]
fn attack_at_range_one_lands_a_hit() {
    let mut store = EntityStore::new();
    let map_id = store.create_entity();

    let attacker = store.create_entity();
    store.add_component(attacker, Transform { map_id, y: 0, x: 0 });
    store.add_component(attacker, Noun::new("fighter"));
    store.add_component(attacker, Health::full(100.0));
    store.add_component(attacker, Stats { grace: 10.0, grit: 10.0, wit: 10.0 });

    let target = store.create_entity();
    store.add_component(target, Transform { map_id, y: 0, x: 1 });
    store.add_component(target, Noun::new("goblin"));
    store.add_component(target, Health::full(50.0));
    store.add_component(target, Stats { grace: 8.0, grit: 8.0, wit: 4.0 });

    let acts = ActQueue::new();
    let mut bus = SignalBus::new();
    let commands = default_commands();
    let attack = commands.iter().find(|c| c.text() == "attack").expect("attack is a built-in command");
    {
        let mut ctx = CommandContext { store: &mut store, bus: &mut bus, acts: &acts };
        attack.trigger(&mut ctx, attacker, "attack goblin").expect("goblin is adjacent, attack should trigger");
    }

    let pulsed: Vec<Act> = bus.iter::<Act>().collect();
    assert_eq!(pulsed.len(), 1);
    assert_eq!(pulsed[0].target, target);
    assert_eq!(pulsed[0].delay_secs, MELEE_DELAY_SECS);
    assert!(matches!(pulsed[0].then, ActEffect::Melee(_)));
}

#[test]
fn attack_beyond_range_one_is_refused() {
    let mut store = EntityStore::new();
    let map_id = store.create_entity();

    let attacker = store.create_entity();
    store.add_component(attacker, Transform { map_id, y: 0, x: 0 });
    store.add_component(attacker, Noun::new("fighter"));

    let target = store.create_entity();
    store.add_component(target, Transform { map_id, y: 0, x: 5 });
    store.add_component(target, Noun::new("goblin"));

    let acts = ActQueue::new();
    let mut bus = SignalBus::new();
    let commands = default_commands();
    let attack = commands.iter().find(|c| c.text() == "attack").expect("attack is a built-in command");
    let mut ctx = CommandContext { store: &mut store, bus: &mut bus, acts: &acts };
    let result = attack.trigger(&mut ctx, attacker, "attack goblin");
    assert!(result.is_err(), "a goblin five tiles away is out of adjacent reach");
}

#[test]
fn interrupting_a_source_cancels_its_pending_attack() {
    let mut store = EntityStore::new();
    let attacker = store.create_entity();
    let target = store.create_entity();
    store.add_component(attacker, Health::full(100.0));

    let mut acts = ActQueue::new();
    let mut bus = SignalBus::new();

    let act = Act {
        source: attacker,
        target,
        delay_secs: 1.0,
        then: ActEffect::Melee(Melee { source: attacker, target, verb: "slash".into() }),
        id: 1,
    };
    acts.process(&store, &mut bus, 0.0, &[act]);
    assert!(acts.is_busy(attacker));

    bus.pulse(Interrupt { source: attacker });
    acts.process(&store, &mut bus, 0.5, &[]);
    assert!(!acts.is_busy(attacker), "the interrupt should clear the in-flight act before its deadline");

    acts.process(&store, &mut bus, 2.0, &[]);
    assert!(bus.is_empty::<Melee>(), "an interrupted act must never resolve its effect");
}

#[test]
fn an_uninterrupted_attack_resolves_its_melee_effect() {
    let mut store = EntityStore::new();
    let attacker = store.create_entity();
    let target = store.create_entity();
    store.add_component(attacker, Health::full(100.0));

    let mut acts = ActQueue::new();
    let mut bus = SignalBus::new();
    let act = Act {
        source: attacker,
        target,
        delay_secs: 1.0,
        then: ActEffect::Melee(Melee { source: attacker, target, verb: "slash".into() }),
        id: 1,
    };
    acts.process(&store, &mut bus, 0.0, &[act]);
    acts.process(&store, &mut bus, 2.0, &[]);

    assert!(bus.iter::<Melee>().any(|m| m.source == attacker && m.target == target));
}

#[test]
fn dijkstra_flee_climbs_away_from_the_goal() {
    let mut map = DijkstraMap::new();
    map.compute(&[(0, 0)], |_, _| true);

    let near = map.get_cost(1, 0, false);
    let far = map.get_cost(10, 0, false);
    assert!(far > near, "cost should grow monotonically with distance from the goal");

    let dir = map.climb_uphill(1, 0, |_, _| true);
    assert!(dir.is_some(), "a cell one step from the goal should have an uphill direction to flee along");
}

#[test]
fn brightness_drops_to_zero_exactly_at_the_nightstorm_boundary() {
    let before = NightClock::from_epoch_secs(1_054.0);
    let at_boundary = NightClock::from_epoch_secs(1_055.0);

    assert!(!before.in_nightstorm());
    assert!(at_boundary.in_nightstorm());
    assert_eq!(at_boundary.brightness_index(0.0, 0.0), 0);
    assert_ne!(before.brightness_index(0.0, 0.0), 0);
}

#[test]
fn night_time_round_trips_through_next_and_back() {
    let clock = NightClock::from_epoch_secs(200.0);
    let target = NightTime::new(6, 0);
    let delta = clock.next(target);
    let arrived = clock + delta;
    assert!((arrived.seconds() - target.total_seconds()).abs() < 1e-6);
}

#[test]
fn containment_save_then_load_reproduces_the_tree() {
    let mut store = EntityStore::new();
    let owner = store.create_entity();

    let backpack = create_item(
        &mut store,
        "backpack",
        &[],
        Transform::ORIGIN,
        1,
        Some(owner),
        mud_world::components::Slot::Back,
    )
    .expect("backpack is a known template");

    create_item(
        &mut store,
        "broadsword",
        &[],
        Transform::ORIGIN,
        1,
        Some(backpack),
        mud_world::components::Slot::Any,
    )
    .expect("broadsword is a known template");

    let rows = save_player_inventory(&store, 1, owner);
    assert_eq!(rows.len(), 2, "backpack plus its nested sword");

    let mut reloaded = EntityStore::new();
    let new_owner = reloaded.create_entity();
    let loaded = load_rows(&mut reloaded, &rows, Some(new_owner)).expect("rows were produced by save_player_inventory");
    assert_eq!(loaded.len(), 2);

    let keys: Vec<&str> = loaded
        .iter()
        .filter_map(|&e| reloaded.try_component::<mud_world::items::ItemKey>(e))
        .map(|k| k.0.as_str())
        .collect();
    assert!(keys.contains(&"backpack"));
    assert!(keys.contains(&"broadsword"));

    let reloaded_backpack = loaded
        .iter()
        .copied()
        .find(|&e| reloaded.try_component::<mud_world::items::ItemKey>(e).map(|k| k.0 == "backpack") == Some(true))
        .unwrap();
    let reloaded_sword = loaded
        .iter()
        .copied()
        .find(|&e| reloaded.try_component::<mud_world::items::ItemKey>(e).map(|k| k.0 == "broadsword") == Some(true))
        .unwrap();
    let sword_container = reloaded.try_component::<mud_world::components::ContainedBy>(reloaded_sword).unwrap();
    assert_eq!(sword_container.0, reloaded_backpack, "the sword must still be nested inside the backpack, not the owner");

    let backpack_container = reloaded.try_component::<mud_world::components::ContainedBy>(reloaded_backpack).unwrap();
    assert_eq!(backpack_container.0, new_owner);
}
