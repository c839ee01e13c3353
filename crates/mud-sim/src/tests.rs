use mud_core::signals::{
    AnchorDestroyed, ConditionChanged, Die, Echo, Emit, GrowAnchor, HealthChanged, PositionChanged,
    ReachKind, Rot,
};
use mud_core::EntityId;
use mud_core::SignalBus;
use mud_time::clock::{NightClock, NightTime};
use mud_world::components::{Anchor, Condition, Connection, Health, Noun, Transform};
use mud_world::entity::EntityStore;
use mud_net::InMemoryPersistence;
use mud_world::items::{Food, Rotting};
use mud_world::terrain::Chips;

use crate::bootstrap::bootstrap_world;
use crate::systems;
use crate::visibility;

fn open_map(store: &mut EntityStore) -> (EntityId, Chips) {
    let map_id = store.create_entity();
    let mut chips = Chips::new(32, 32);
    let walkable = [1u8; 256];
    chips.set_tile(0, 0, walkable);
    chips.set_tile(0, 16, walkable);
    chips.set_tile(16, 0, walkable);
    chips.set_tile(16, 16, walkable);
    (map_id, chips)
}

mod bootstrap_tests {
    use super::*;

    #[test]
    fn seeds_a_walkable_town_with_starter_items_and_cues() {
        let mut store = EntityStore::new();
        let start = NightClock::from_epoch_secs(0.0);
        let persistence = InMemoryPersistence::new();
        let handle = bootstrap_world(&mut store, start, &persistence).expect("bootstrap succeeds");

        let chips = handle.chips_by_map.get(&handle.map_id).expect("town chips exist");
        assert!(mud_world::terrain::can_enter(chips, 32, 32));

        let bonfires = store.query::<Anchor>().count();
        assert_eq!(bonfires, 1, "exactly one starter anchor (the bonfire)");

        let swords = store
            .query::<mud_world::items::Weapon>()
            .filter(|(_, w)| w.token_key == "broadsword")
            .count();
        assert_eq!(swords, 3);

        assert!(handle.cues.pending_count() >= 3, "nightstorm/rest/despawn cues all registered");
    }

    #[test]
    fn bootstrapping_twice_from_the_same_seed_is_deterministic() {
        let mut a = EntityStore::new();
        let mut b = EntityStore::new();
        let start = NightClock::from_epoch_secs(1_000.0);
        let persistence = InMemoryPersistence::new();

        let handle_a = bootstrap_world(&mut a, start, &persistence).unwrap();
        let handle_b = bootstrap_world(&mut b, start, &persistence).unwrap();

        assert_eq!(a.live_count(), b.live_count());
        assert_eq!(handle_a.cues.pending_count(), handle_b.cues.pending_count());
    }
}

mod visibility_tests {
    use super::*;

    #[test]
    fn a_mover_entering_view_announces_to_a_stationary_observer() {
        let mut store = EntityStore::new();
        let (map_id, _chips) = open_map(&mut store);

        let observer = store.create_entity();
        store.add_component(observer, Transform { map_id, y: 0, x: 0 });
        store.add_component(observer, Connection(1));

        let mover = store.create_entity();
        store.add_component(mover, Transform { map_id, y: 0, x: 3 });

        let mut bus = SignalBus::new();
        let sig = PositionChanged {
            source: mover,
            from_map_id: map_id,
            from_y: 20,
            from_x: 20,
            to_map_id: map_id,
            to_y: 0,
            to_x: 3,
            quiet: false,
        };
        visibility::process(&store, &mut bus, &[sig]);

        let moves: Vec<_> = bus.iter::<mud_core::signals::OutboundMove>().collect();
        assert!(moves.iter().any(|m| m.to == observer && m.source == mover));
    }

    #[test]
    fn a_quiet_move_never_broadcasts_to_others() {
        let mut store = EntityStore::new();
        let (map_id, _chips) = open_map(&mut store);

        let observer = store.create_entity();
        store.add_component(observer, Transform { map_id, y: 0, x: 0 });
        store.add_component(observer, Connection(1));

        let mover = store.create_entity();
        store.add_component(mover, Transform { map_id, y: 0, x: 1 });

        let mut bus = SignalBus::new();
        let sig = PositionChanged {
            source: mover,
            from_map_id: map_id,
            from_y: 0,
            from_x: 0,
            to_map_id: map_id,
            to_y: 0,
            to_x: 1,
            quiet: true,
        };
        visibility::process(&store, &mut bus, &[sig]);

        let moves: Vec<_> = bus.iter::<mud_core::signals::OutboundMove>().collect();
        assert!(moves.iter().all(|m| m.to != observer));
    }
}

mod systems_tests {
    use super::*;

    #[test]
    fn zero_health_transitions_to_dead_and_notifies() {
        let mut store = EntityStore::new();
        let victim = store.create_entity();
        store.add_component(victim, Health { cur: 0.0, max: 100.0, stress: 0.0, aggravated_stress: 0.0, condition: Condition::Normal });

        let mut bus = SignalBus::new();
        systems::process_death(&mut store, &mut bus);

        let health = store.try_component::<Health>(victim).unwrap();
        assert_eq!(health.condition, Condition::Dead);
        assert!(bus.iter::<Die>().any(|d| d.entity == victim));
        assert!(bus.iter::<ConditionChanged>().any(|c| c.source == victim && c.to_ordinal == 3));
    }

    #[test]
    fn healthy_entities_are_left_alone() {
        let mut store = EntityStore::new();
        let alive = store.create_entity();
        store.add_component(alive, Health::full(100.0));

        let mut bus = SignalBus::new();
        systems::process_death(&mut store, &mut bus);

        assert!(bus.is_empty::<Die>());
    }

    #[test]
    fn health_changed_broadcasts_only_within_view() {
        let mut store = EntityStore::new();
        let map_id = store.create_entity();

        let target = store.create_entity();
        store.add_component(target, Transform { map_id, y: 0, x: 0 });
        store.add_component(target, Health::full(50.0));

        let near = store.create_entity();
        store.add_component(near, Transform { map_id, y: 1, x: 1 });
        store.add_component(near, Connection(1));

        let far = store.create_entity();
        store.add_component(far, Transform { map_id, y: 50, x: 50 });
        store.add_component(far, Connection(2));

        let mut bus = SignalBus::new();
        bus.pulse(HealthChanged { source: target });
        systems::broadcast_health_and_condition(&store, &mut bus);

        let health_packets: Vec<_> = bus.iter::<mud_core::signals::OutboundHealth>().collect();
        assert!(health_packets.iter().any(|p| p.to == near));
        assert!(health_packets.iter().all(|p| p.to != far));
    }

    #[test]
    fn rot_decrements_a_food_stack_and_deletes_it_when_exhausted() {
        let mut store = EntityStore::new();
        let meal = store.create_entity();
        store.add_component(meal, Food { count: 1 });
        store.add_component(meal, Rotting);

        let mut bus = SignalBus::new();
        bus.pulse(Rot { entity: meal });
        systems::process_rot(&mut store, &bus);
        store.apply_pending();

        assert!(!store.entity_exists(meal));
    }

    #[test]
    fn grow_anchor_spills_rank_and_raises_threshold() {
        let mut store = EntityStore::new();
        let anchor = store.create_entity();
        store.add_component(anchor, Anchor { rank: 1, tnl: 0.5, threshold: 6, fuel: None });

        let mut bus = SignalBus::new();
        systems::process_anchor_growth(&mut store, &mut bus, 1.0, &[GrowAnchor { anchor }]);

        let a = store.try_component::<Anchor>(anchor).unwrap();
        assert_eq!(a.rank, 2);
        assert!(a.tnl < 0.5);
        assert_eq!(a.threshold, 8);
    }

    #[test]
    fn fuel_depletion_pulses_anchor_destroyed_and_cleanup_deletes_it() {
        let mut store = EntityStore::new();
        let anchor = store.create_entity();
        store.add_component(anchor, Anchor { rank: 1, tnl: 0.0, threshold: 6, fuel: Some(0.05) });

        let mut bus = SignalBus::new();
        systems::process_anchor_growth(&mut store, &mut bus, 1.0, &[]);
        assert!(bus.iter::<AnchorDestroyed>().any(|d| d.anchor == anchor));

        systems::process_anchor_destroyed_cleanup(&mut store, &bus);
        store.apply_pending();
        assert!(!store.entity_exists(anchor));
    }

    #[test]
    fn emit_reaches_adjacent_viewers_and_substitutes_target_text() {
        let mut store = EntityStore::new();
        let map_id = store.create_entity();

        let attacker = store.create_entity();
        store.add_component(attacker, Transform { map_id, y: 0, x: 0 });
        store.add_component(attacker, Noun::new("brute"));

        let target = store.create_entity();
        store.add_component(target, Transform { map_id, y: 0, x: 0 });
        store.add_component(target, Connection(1));

        let mut bus = SignalBus::new();
        let emit = Emit {
            source: attacker,
            reach: ReachKind::Adjacent,
            text: "the brute swings wildly!".into(),
            target: Some(target),
            target_text: Some("the brute swings at you!".into()),
        };
        systems::process_emit(&store, &mut bus, &[emit]);

        let out: Vec<_> = bus.iter::<mud_core::signals::Outbound>().collect();
        assert!(out.iter().any(|o| o.to == target && o.text.contains("at you")));
    }

    #[test]
    fn echo_reaches_viewers_within_its_reach_kind() {
        let mut store = EntityStore::new();
        let map_id = store.create_entity();

        let viewer = store.create_entity();
        store.add_component(viewer, Transform { map_id, y: 0, x: 0 });
        store.add_component(viewer, Connection(1));

        let mut bus = SignalBus::new();
        let echo = Echo { map_id, origin_y: 0, origin_x: 0, reach: ReachKind::Adjacent, text: "the ground trembles.".into() };
        systems::process_echo(&store, &mut bus, &[echo]);

        let out: Vec<_> = bus.iter::<mud_core::signals::Outbound>().collect();
        assert!(out.iter().any(|o| o.to == viewer));
    }

    #[test]
    fn phase_change_only_broadcasts_on_an_actual_band_change() {
        let mut store = EntityStore::new();
        let mut bus = SignalBus::new();
        let mut last = None;

        systems::process_phase_change(&store, &mut bus, &mut last, 4);
        assert!(bus.is_empty::<mud_core::signals::PhaseChanged>(), "first observation just primes `last`");

        systems::process_phase_change(&store, &mut bus, &mut last, 4);
        assert!(bus.is_empty::<mud_core::signals::PhaseChanged>());

        systems::process_phase_change(&store, &mut bus, &mut last, 2);
        assert!(!bus.is_empty::<mud_core::signals::PhaseChanged>());
    }
}

mod clock_tests {
    use super::*;

    #[test]
    fn next_occurrence_of_a_time_wraps_to_the_following_night() {
        let clock = NightClock::from_epoch_secs(1_079.0);
        let eta = clock.next(NightTime::new(6, 0));
        assert!(eta.total_seconds() > 0.0);
    }
}
