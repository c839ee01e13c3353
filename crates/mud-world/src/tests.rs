use mud_core::signals::{DecayCheck, TileDecay};
use mud_core::{EntityId, SignalBus};

use crate::components::{Anchor, Slot, Transform};
use crate::entity::EntityStore;
use crate::inventory::{
    create_item, load_rows, save_map_inventory, save_player_inventory, Override,
};
use crate::items::{Food, ItemKey};
use crate::terrain::{any_anchor_protects, can_enter, tile_key, Chips, Gas};

mod entity_store {
    use super::*;

    #[test]
    fn create_and_query_roundtrip() {
        let mut store = EntityStore::new();
        let e = store.create_entity();
        store.add_component(e, ItemKey("torch".into()));
        assert!(store.has_component::<ItemKey>(e));
        assert_eq!(store.query::<ItemKey>().count(), 1);
    }

    #[test]
    fn delete_is_buffered_until_apply_pending() {
        let mut store = EntityStore::new();
        let e = store.create_entity();
        store.add_component(e, ItemKey("torch".into()));

        store.delete_entity(e);
        // Still visible mid-phase: a query taken before apply_pending must
        // not observe the delete.
        assert_eq!(store.query::<ItemKey>().count(), 1);
        assert!(store.entity_exists(e));

        store.apply_pending();
        assert_eq!(store.query::<ItemKey>().count(), 0);
        assert!(!store.entity_exists(e));
    }

    #[test]
    fn new_ids_start_above_the_recipient_sentinel() {
        let mut store = EntityStore::new();
        let e = store.create_entity();
        assert_ne!(e, EntityId(0));
    }
}

mod items {
    use super::*;

    #[test]
    fn create_item_rejects_unknown_key() {
        let mut store = EntityStore::new();
        let result = create_item(&mut store, "nonexistent", &[], Transform::ORIGIN, 1, None, Slot::Any);
        assert!(result.is_err());
    }

    #[test]
    fn create_item_applies_template_components() {
        let mut store = EntityStore::new();
        let e = create_item(&mut store, "torch", &[], Transform::ORIGIN, 1, None, Slot::Any).unwrap();
        assert!(store.has_component::<crate::items::ProvidesLight>(e));
        assert_eq!(store.try_component::<ItemKey>(e).unwrap().0, "torch");
    }

    #[test]
    fn override_changes_food_count() {
        let mut store = EntityStore::new();
        let overrides = [Override::Food(Food { count: 3 })];
        let e = create_item(&mut store, "meal", &overrides, Transform::ORIGIN, 1, None, Slot::Any).unwrap();
        assert_eq!(store.try_component::<Food>(e).unwrap().count, 3);
    }
}

mod inventory_roundtrip {
    use super::*;

    #[test]
    fn player_inventory_saves_and_reloads_nested_container() {
        let mut store = EntityStore::new();
        let owner = store.create_entity();

        let backpack = create_item(
            &mut store,
            "backpack",
            &[],
            Transform::ORIGIN,
            1,
            Some(owner),
            Slot::Back,
        )
        .unwrap();
        let torch = create_item(
            &mut store,
            "torch",
            &[],
            Transform::ORIGIN,
            1,
            Some(backpack),
            Slot::Any,
        )
        .unwrap();
        assert_ne!(torch, EntityId(0));

        let rows = save_player_inventory(&store, 42, owner);
        assert_eq!(rows.len(), 2);

        let mut fresh = EntityStore::new();
        let new_owner = fresh.create_entity();
        let loaded = load_rows(&mut fresh, &rows, Some(new_owner)).unwrap();
        assert_eq!(loaded.len(), 2);

        let backpack_count = fresh.query::<crate::items::Container>().count();
        assert_eq!(backpack_count, 1);
        let torch_count = fresh.query::<crate::items::ProvidesLight>().count();
        assert_eq!(torch_count, 1);
    }

    #[test]
    fn map_inventory_only_saves_uncontained_roots_on_that_map() {
        let mut store = EntityStore::new();
        let map_a = EntityId(1);
        let map_b = EntityId(2);

        create_item(&mut store, "prop", &[], Transform { map_id: map_a, y: 0, x: 0 }, 1, None, Slot::Any).unwrap();
        create_item(&mut store, "prop", &[], Transform { map_id: map_b, y: 0, x: 0 }, 1, None, Slot::Any).unwrap();

        let owner = store.create_entity();
        create_item(
            &mut store,
            "prop",
            &[],
            Transform { map_id: map_a, y: 1, x: 1 },
            1,
            Some(owner),
            Slot::Any,
        )
        .unwrap();

        let rows = save_map_inventory(&store, map_a);
        assert_eq!(rows.len(), 1);
    }
}

mod terrain_lookup {
    use super::*;

    #[test]
    fn tile_key_floors_negative_coordinates() {
        assert_eq!(tile_key(-1, -1), (-16, -16));
        assert_eq!(tile_key(-16, 0), (-16, 0));
        assert_eq!(tile_key(15, 15), (0, 0));
        assert_eq!(tile_key(16, 16), (16, 16));
    }

    #[test]
    fn toroidal_wrap_resolves_negative_world_coordinates() {
        let mut chips = Chips::new(32, 32);
        let mut tile = [0u8; 256];
        tile[0] = 1;
        chips.set_tile(0, 0, tile);

        // y = -32 wraps to 0 on a 32-tall map.
        assert!(can_enter(&chips, -32, 0));
    }

    #[test]
    fn unset_tile_is_not_enterable() {
        let chips = Chips::new(32, 32);
        assert!(!can_enter(&chips, 5, 5));
    }
}

mod decay_and_anchors {
    use super::*;

    #[test]
    fn anchor_protects_within_threshold() {
        let mut store = EntityStore::new();
        let map_id = EntityId(1);
        let anchor_entity = store.create_entity();
        store.add_component(anchor_entity, Transform { map_id, y: 10, x: 10 });
        store.add_component(
            anchor_entity,
            Anchor {
                rank: 1,
                tnl: 0.0,
                threshold: 3,
                fuel: None,
            },
        );

        assert!(any_anchor_protects(&store, map_id, 11, 11));
        assert!(!any_anchor_protects(&store, map_id, 20, 20));
    }

    #[test]
    fn decay_check_skips_protected_tiles() {
        let mut store = EntityStore::new();
        let mut bus = SignalBus::new();
        let map_id = EntityId(1);

        let anchor_entity = store.create_entity();
        store.add_component(anchor_entity, Transform { map_id, y: 8, x: 8 });
        store.add_component(
            anchor_entity,
            Anchor {
                rank: 1,
                tnl: 0.0,
                threshold: 20,
                fuel: None,
            },
        );

        let mut chips = Chips::new(64, 64);
        chips.set_tile(0, 0, [1u8; 256]);

        bus.pulse(DecayCheck);
        crate::terrain::process_decay_check(&store, &mut bus, &[(map_id, &chips)]);

        assert!(bus.is_empty::<TileDecay>());
    }
}

mod gas_sim {
    use super::*;

    #[test]
    fn gas_spreads_to_walkable_neighbors_and_loses_potence() {
        let mut chips = Chips::new(32, 32);
        let mut tile = [1u8; 256];
        // Keep every cell in the origin tile walkable.
        for cell in tile.iter_mut() {
            *cell = 1;
        }
        chips.set_tile(0, 0, tile);

        let mut gas = Gas::new(EntityId(1));
        gas.set(5, 5, 8.0);
        gas.step(&chips, 0.1, 0.01);

        let total: f32 = gas.iter().map(|(_, v)| v).sum();
        assert!(total < 8.0, "total potence should drop after loss-rate subtraction");
        assert!(!gas.is_empty());
    }

    #[test]
    fn gas_below_epsilon_is_culled() {
        let chips = Chips::new(32, 32);
        let mut gas = Gas::new(EntityId(1));
        gas.set(0, 0, 0.05);
        gas.step(&chips, 0.1, 0.5);
        assert!(gas.is_empty());
    }
}
