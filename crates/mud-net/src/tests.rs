use rustc_hash::FxHashMap;

use mud_core::signals::{
    Connected, Disconnected, Inbound, Outbound, OutboundHealth, OutboundMove, OutboundTile,
};
use mud_core::{EntityId, SignalBus};
use mud_world::components::{Connection, Health, Noun, Transform};
use mud_world::entity::EntityStore;
use mud_world::terrain::Chips;

use crate::admission::Admission;
use crate::auth::{AuthPort, LocalAuth};
use crate::connection::{self, ConnectionTable};
use crate::outbox::{self, Outbox};
use crate::persistence::{CharacterBrief, InMemoryPersistence, PersistencePort, SkillRow};
use crate::transport::{serve, ConnId, InboundEvent};
use crate::wire::{encode_packet, rewrite_self, WireEntry};

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

mod wire_codec {
    use super::*;

    #[test]
    fn self_rewrite_maps_to_zero_only_for_the_recipient() {
        let me = EntityId(7);
        let other = EntityId(8);
        assert_eq!(rewrite_self(me, me), 0);
        assert_eq!(rewrite_self(other, me), other.0);
    }

    #[test]
    fn packet_round_trips_through_bincode() {
        let packet = crate::wire::Packet {
            entries: vec![
                WireEntry::Msg { text: "hello".into() },
                WireEntry::Pos { id: 0, map_id: 1, x: 3, y: 4 },
                WireEntry::Tile { map_id: 1, top: 0, left: 0, data: vec![1, 2, 3] },
            ],
        };
        let bytes = encode_packet(&packet).expect("encode");
        let decoded = crate::wire::decode_packet(&bytes).expect("decode");
        assert_eq!(decoded, packet);
    }
}

mod outbox_mailbag {
    use super::*;

    #[test]
    fn drops_recipients_without_a_connection() {
        let mut store = EntityStore::new();
        let mut bus = SignalBus::new();
        let ghost = store.create_entity();
        bus.pulse(Outbound { to: ghost, source: ghost, text: "hi".into() });

        let chips_by_map = FxHashMap::default();
        let mut outbox = Outbox::new();
        let mailbag = outbox::process(&store, &bus, &chips_by_map, &mut outbox, 0.0);
        assert!(mailbag.is_empty());
    }

    #[test]
    fn mixes_entry_kinds_in_a_single_recipient_packet() {
        let mut store = EntityStore::new();
        let mut bus = SignalBus::new();
        let player = store.create_entity();
        store.add_component(player, Connection(1));

        bus.pulse(Outbound { to: player, source: player, text: "You feel fine.".into() });
        bus.pulse(OutboundMove { to: player, source: player, map_id: EntityId(1), x: 5, y: 5 });
        bus.pulse(OutboundHealth { to: player, source: player, pct: 1.0, stress_pct: 0.0 });

        let chips_by_map = FxHashMap::default();
        let mut outbox = Outbox::new();
        let mailbag = outbox::process(&store, &bus, &chips_by_map, &mut outbox, 0.0);

        let packet = mailbag.get(&player).expect("player has mail");
        assert_eq!(packet.entries.len(), 3);
        assert!(matches!(packet.entries[0], WireEntry::Msg { .. }));
        assert!(matches!(packet.entries[1], WireEntry::Pos { .. }));
        assert!(matches!(packet.entries[2], WireEntry::Health { .. }));
    }

    #[test]
    fn tile_entries_are_deduped_per_recipient_then_retried_on_eviction() {
        let mut store = EntityStore::new();
        let mut bus = SignalBus::new();
        let player = store.create_entity();
        store.add_component(player, Connection(1));

        let map_id = EntityId(1);
        let mut chips_by_map = FxHashMap::default();
        chips_by_map.insert(map_id, open_chips(32));

        bus.pulse(OutboundTile { to: player, map_id, top: 0, left: 0 });
        bus.pulse(OutboundTile { to: player, map_id, top: 0, left: 0 });

        let mut outbox = Outbox::new();
        let mailbag = outbox::process(&store, &bus, &chips_by_map, &mut outbox, 0.0);
        assert_eq!(mailbag.get(&player).unwrap().entries.len(), 1);

        outbox.forget(player);
        let mut bus2 = SignalBus::new();
        bus2.pulse(OutboundTile { to: player, map_id, top: 0, left: 0 });
        let mailbag2 = outbox::process(&store, &bus2, &chips_by_map, &mut outbox, 1.0);
        assert_eq!(mailbag2.get(&player).unwrap().entries.len(), 1);
    }

    #[test]
    fn missing_tile_lookup_is_skipped_without_marking_sent() {
        let mut store = EntityStore::new();
        let mut bus = SignalBus::new();
        let player = store.create_entity();
        store.add_component(player, Connection(1));

        let map_id = EntityId(1);
        let mut chips_by_map = FxHashMap::default();
        chips_by_map.insert(map_id, Chips::new(32, 32)); // no tiles loaded

        bus.pulse(OutboundTile { to: player, map_id, top: 0, left: 0 });
        let mut outbox = Outbox::new();
        let mailbag = outbox::process(&store, &bus, &chips_by_map, &mut outbox, 0.0);
        assert!(mailbag.get(&player).is_none());
    }
}

mod connection_table {
    use super::*;

    #[test]
    fn disconnect_detaches_the_component_and_forgets_dedup_state() {
        let mut store = EntityStore::new();
        let mut bus = SignalBus::new();
        let mut table = ConnectionTable::new();
        let mut outbox = Outbox::new();

        let persistence = InMemoryPersistence::new();
        let player = store.create_entity();
        let conn = ConnId(1);
        let mut pending = vec![(conn, player)];
        connection::process(&mut store, &bus, &mut table, &mut outbox, &mut pending, &persistence);
        assert!(store.has_component::<Connection>(player));
        assert_eq!(table.entity_for(conn), Some(player));

        let mut bus2 = SignalBus::new();
        bus2.pulse(Disconnected { entity: player });
        connection::process(&mut store, &bus2, &mut table, &mut outbox, &mut Vec::new(), &persistence);
        assert!(!store.has_component::<Connection>(player));
        assert_eq!(table.entity_for(conn), None);
    }
}

mod local_auth {
    use super::*;

    #[test]
    fn rejects_an_empty_first_line() {
        let auth = LocalAuth;
        assert!(auth.authenticate("   ").is_err());
    }

    #[test]
    fn accepts_the_trimmed_owner_id() {
        let auth = LocalAuth;
        assert_eq!(auth.authenticate("  alice  ").unwrap(), "alice");
    }
}

mod in_memory_persistence {
    use super::*;

    #[test]
    fn round_trips_a_character_brief() {
        let db = InMemoryPersistence::new();
        assert_eq!(db.get_character_brief("alice").unwrap(), None);

        let brief = CharacterBrief {
            entity_key: "alice".into(),
            name: "Alice".into(),
            map_key: "start".into(),
            y: 1,
            x: 2,
        };
        db.create_character("alice", &brief).unwrap();
        assert_eq!(db.get_character_brief("alice").unwrap(), Some(brief));
    }

    #[test]
    fn skills_are_replaced_wholesale_not_merged() {
        let db = InMemoryPersistence::new();
        let first = vec![SkillRow { name: "martial_arts".into(), rank: 3, tnl: 0.1, pending: 0.0, rest_bonus: 1.0 }];
        db.upsert_skills("alice", &first).unwrap();
        assert_eq!(db.get_skills_for_character("alice").unwrap(), first);

        let second = vec![SkillRow { name: "survival".into(), rank: 1, tnl: 0.0, pending: 0.0, rest_bonus: 1.0 }];
        db.upsert_skills("alice", &second).unwrap();
        assert_eq!(db.get_skills_for_character("alice").unwrap(), second);
    }
}

mod admission_flow {
    use super::*;

    #[tokio::test]
    async fn first_line_authenticates_and_spawns_a_player_entity() {
        let (mut events_rx, outbound) = serve("127.0.0.1:0".parse().unwrap()).await.unwrap();
        let _ = &outbound; // outbound only used to inspect rejects below

        let mut store = EntityStore::new();
        let mut bus = SignalBus::new();
        let table = ConnectionTable::new();
        let auth = LocalAuth;
        let persistence = InMemoryPersistence::new();
        let maps = FxHashMap::default();
        let mut admission = Admission::new();

        // Synthesize the events a real socket would have produced.
        drop(events_rx);
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let conn = ConnId(1);
        tx.send(InboundEvent::Accepted(conn)).unwrap();
        tx.send(InboundEvent::Line(conn, "alice".into())).unwrap();
        drop(tx);

        let admitted = admission.process(&mut store, &mut bus, &table, &mut rx, &auth, &persistence, &maps, &outbound);
        assert_eq!(admitted.len(), 1);
        let (_, entity) = admitted[0];
        assert!(store.try_component::<Noun>(entity).is_some());
        assert!(store.try_component::<Health>(entity).is_some());
        assert!(store.try_component::<Transform>(entity).is_some());
        assert_eq!(bus.iter::<Connected>().count(), 1);
    }

    #[tokio::test]
    async fn an_already_bound_connection_forwards_lines_as_inbound() {
        let (_events_rx, outbound) = serve("127.0.0.1:0".parse().unwrap()).await.unwrap();
        let mut store = EntityStore::new();
        let mut bus = SignalBus::new();
        let mut table = ConnectionTable::new();
        let mut outbox = Outbox::new();
        let auth = LocalAuth;
        let persistence = InMemoryPersistence::new();
        let maps = FxHashMap::default();
        let mut admission = Admission::new();

        let player = store.create_entity();
        let conn = ConnId(9);
        let mut pending = vec![(conn, player)];
        connection::process(&mut store, &bus, &mut table, &mut outbox, &mut pending, &persistence);

        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        tx.send(InboundEvent::Line(conn, "look".into())).unwrap();
        drop(tx);

        let admitted = admission.process(&mut store, &mut bus, &table, &mut rx, &auth, &persistence, &maps, &outbound);
        assert!(admitted.is_empty());
        let lines: Vec<Inbound> = bus.iter::<Inbound>().collect();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].source, player);
        assert_eq!(lines[0].text, "look");
    }
}

#[cfg(all(test, feature = "sqlite"))]
mod sqlite_persistence {
    use tempfile::TempDir;

    use crate::persistence::sqlite::SqlitePersistence;
    use crate::persistence::{CharacterBrief, PersistencePort, SkillRow};

    fn tmp() -> TempDir {
        tempfile::tempdir().expect("create temp dir")
    }

    #[test]
    fn sqlite_db_created() {
        let dir = tmp();
        let _db = SqlitePersistence::open(&dir.path().join("world.db")).unwrap();
        assert!(dir.path().join("world.db").exists());
    }

    #[test]
    fn round_trips_a_character_brief() {
        let dir = tmp();
        let db = SqlitePersistence::open(&dir.path().join("world.db")).unwrap();
        assert_eq!(db.get_character_brief("alice").unwrap(), None);

        let brief = CharacterBrief {
            entity_key: "alice".into(),
            name: "Alice".into(),
            map_key: "start".into(),
            y: 1,
            x: 2,
        };
        db.create_character("alice", &brief).unwrap();
        assert_eq!(db.get_character_brief("alice").unwrap(), Some(brief.clone()));

        let moved = CharacterBrief { y: 9, x: 9, ..brief };
        db.upsert_character("alice", &moved).unwrap();
        assert_eq!(db.get_character_brief("alice").unwrap(), Some(moved));
    }

    #[test]
    fn upserting_skills_replaces_rows_for_that_entity_only() {
        let dir = tmp();
        let db = SqlitePersistence::open(&dir.path().join("world.db")).unwrap();

        let alice_skills = vec![SkillRow {
            name: "martial_arts".into(),
            rank: 3,
            tnl: 0.1,
            pending: 0.0,
            rest_bonus: 1.0,
        }];
        db.upsert_skills("alice", &alice_skills).unwrap();

        let bob_skills = vec![SkillRow {
            name: "survival".into(),
            rank: 1,
            tnl: 0.0,
            pending: 0.0,
            rest_bonus: 1.0,
        }];
        db.upsert_skills("bob", &bob_skills).unwrap();

        assert_eq!(db.get_skills_for_character("alice").unwrap(), alice_skills);
        assert_eq!(db.get_skills_for_character("bob").unwrap(), bob_skills);

        let alice_retrained = vec![SkillRow {
            name: "martial_arts".into(),
            rank: 4,
            tnl: 0.2,
            pending: 0.0,
            rest_bonus: 1.0,
        }];
        db.upsert_skills("alice", &alice_retrained).unwrap();
        assert_eq!(db.get_skills_for_character("alice").unwrap(), alice_retrained);
        assert_eq!(db.get_skills_for_character("bob").unwrap(), bob_skills);
    }
}
