use std::time::Duration;

use crate::bus::SignalBus;
use crate::clock::{TickClock, TickConfig};
use crate::ids::EntityId;
use crate::rng::{EntityRng, SimRng};

mod ids {
    use super::*;

    #[test]
    fn invalid_is_default() {
        assert_eq!(EntityId::default(), EntityId::INVALID);
        assert!(!EntityId::INVALID.is_valid());
    }

    #[test]
    fn recipient_is_zero() {
        assert_eq!(EntityId::RECIPIENT, EntityId(0));
    }

    #[test]
    fn index_round_trips() {
        let id = EntityId(42);
        assert_eq!(id.index(), 42);
    }
}

mod bus {
    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    struct Ping(u32);

    #[derive(Clone, Debug, PartialEq)]
    struct Pong(u32);

    #[test]
    fn pulse_and_iter_preserve_order() {
        let mut bus = SignalBus::new();
        bus.pulse(Ping(1));
        bus.pulse(Ping(2));
        bus.pulse(Ping(3));

        let got: Vec<Ping> = bus.iter::<Ping>().collect();
        assert_eq!(got, vec![Ping(1), Ping(2), Ping(3)]);
    }

    #[test]
    fn iter_is_a_snapshot() {
        let mut bus = SignalBus::new();
        bus.pulse(Ping(1));
        let snapshot: Vec<Ping> = bus.iter::<Ping>().collect();
        bus.pulse(Ping(2));
        assert_eq!(snapshot, vec![Ping(1)]);
        assert_eq!(bus.iter::<Ping>().count(), 2);
    }

    #[test]
    fn clear_empties_every_queue() {
        let mut bus = SignalBus::new();
        bus.pulse(Ping(1));
        bus.pulse(Pong(2));
        bus.clear();
        assert!(bus.is_empty::<Ping>());
        assert!(bus.is_empty::<Pong>());
    }

    #[test]
    fn distinct_types_do_not_collide() {
        let mut bus = SignalBus::new();
        bus.pulse(Ping(1));
        assert!(bus.is_empty::<Pong>());
        assert_eq!(bus.iter::<Ping>().count(), 1);
    }

    #[test]
    fn pulse_in_fires_after_delay() {
        let mut bus = SignalBus::new();
        bus.pulse_in(Duration::from_millis(5), Ping(99));
        assert!(bus.is_empty::<Ping>());
        std::thread::sleep(Duration::from_millis(10));
        bus.drain_timers();
        assert_eq!(bus.iter::<Ping>().count(), 1);
    }
}

mod clock {
    use super::*;

    #[test]
    fn tick_advances_by_one_each_wait() {
        let mut clock = TickClock::new(TickConfig {
            step: Duration::from_millis(1),
            ..Default::default()
        });
        let start = clock.tick();
        clock.wait_for_deadline();
        assert_eq!(clock.tick(), start.next());
    }

    #[test]
    fn jitter_ema_stays_non_negative() {
        let mut clock = TickClock::new(TickConfig::default());
        for _ in 0..5 {
            clock.wait_for_deadline();
        }
        assert!(clock.jitter_ema() >= Duration::ZERO);
    }
}

mod rng {
    use super::*;

    #[test]
    fn same_seed_same_entity_is_deterministic() {
        let mut a = EntityRng::new(7, EntityId(1));
        let mut b = EntityRng::new(7, EntityId(1));
        let xa: u32 = a.gen_range(0..1_000_000);
        let xb: u32 = b.gen_range(0..1_000_000);
        assert_eq!(xa, xb);
    }

    #[test]
    fn different_entities_diverge() {
        let mut a = EntityRng::new(7, EntityId(1));
        let mut b = EntityRng::new(7, EntityId(2));
        let xa: u32 = a.gen_range(0..u32::MAX);
        let xb: u32 = b.gen_range(0..u32::MAX);
        assert_ne!(xa, xb);
    }

    #[test]
    fn sim_rng_derives_entity_rngs_deterministically() {
        let sim = SimRng::new(42);
        let mut a = sim.entity_rng(42, EntityId(5));
        let mut b = sim.entity_rng(42, EntityId(5));
        assert_eq!(a.gen_range::<u32, _>(0..1000), b.gen_range::<u32, _>(0..1000));
    }
}
