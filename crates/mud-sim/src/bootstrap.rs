//! World bootstrap (§4.13): build the starter map, seed its dens and
//! scenery items, and register the three world-level recurring cues.

use rustc_hash::FxHashMap;

use mud_core::signals::{DespawnMobs, NightstormWarning, RestCheck};
use mud_core::EntityId;
use mud_net::persistence::from_persisted_row;
use mud_net::PersistencePort;
use mud_time::clock::{NightClock, NightDelta, NightTime};
use mud_time::cue::{recurring, CueScheduler};
use mud_world::components::{Den, SpawnSlot, Transform};
use mud_world::entity::EntityStore;
use mud_world::inventory::{create_item, load_rows};
use mud_world::terrain::{tile_key, Chips, TILE_STRIDE};
use mud_world::WorldResult;

/// Floor tile id walkable by `terrain::can_enter`.
const TILE_FLOOR: u8 = 1;
/// Wall tile id, impassable.
const TILE_WALL: u8 = 2;

/// Starter town's footprint, in tiles (one [`TILE_STRIDE`] square each).
const TOWN_TILES_WIDE: i32 = 4;
const TOWN_TILES_TALL: i32 = 4;

fn fill_floor_tile(chips: &mut Chips, top: i32, left: i32) {
    let mut data = [TILE_FLOOR; (TILE_STRIDE * TILE_STRIDE) as usize];
    for i in 0..TILE_STRIDE as usize {
        data[i] = TILE_WALL;
        data[(TILE_STRIDE as usize - 1) * TILE_STRIDE as usize + i] = TILE_WALL;
        data[i * TILE_STRIDE as usize] = TILE_WALL;
        data[i * TILE_STRIDE as usize + TILE_STRIDE as usize - 1] = TILE_WALL;
    }
    chips.set_tile(top, left, data);
}

/// Lay down a rectangular walkable town, bordered tile-by-tile.
fn build_starter_chips() -> Chips {
    let width = TOWN_TILES_WIDE * TILE_STRIDE;
    let height = TOWN_TILES_TALL * TILE_STRIDE;
    let mut chips = Chips::new(width, height);
    for ty in 0..TOWN_TILES_TALL {
        for tx in 0..TOWN_TILES_WIDE {
            let (top, left) = tile_key(ty * TILE_STRIDE, tx * TILE_STRIDE);
            fill_floor_tile(&mut chips, top, left);
        }
    }
    chips
}

/// Den just off the town center, with three mob slots.
fn build_starter_den(map_id: EntityId, center_y: i32, center_x: i32) -> Den {
    Den {
        wake_distance: 12,
        respawn_delay_secs: 180.0,
        slots: vec![
            SpawnSlot { map_id, y: center_y + 3, x: center_x + 3, mob_eid: None, last_spawn_secs: 0.0 },
            SpawnSlot { map_id, y: center_y + 3, x: center_x - 3, mob_eid: None, last_spawn_secs: 0.0 },
            SpawnSlot { map_id, y: center_y - 3, x: center_x + 3, mob_eid: None, last_spawn_secs: 0.0 },
        ],
    }
}

/// Everything the tick loop needs that doesn't live in `EntityStore`
/// components: the per-map tile grids and the night-time cue schedule.
pub struct WorldHandle {
    pub map_id: EntityId,
    pub chips_by_map: FxHashMap<EntityId, Chips>,
    pub cues: CueScheduler,
}

/// Build the starter town, its den, a scattering of starter items, and
/// register the three recurring world cues against a given starting clock
/// (injected so bootstrap stays deterministic under a fixed seed). Also
/// loads any world-space items a prior run persisted (§4.13: "load
/// persisted ... world inventories ... at boot").
pub fn bootstrap_world(
    store: &mut EntityStore,
    start: NightClock,
    persistence: &dyn PersistencePort,
) -> WorldResult<WorldHandle> {
    let map_id = store.create_entity();
    let chips = build_starter_chips();

    let center_y = (TOWN_TILES_TALL * TILE_STRIDE) / 2;
    let center_x = (TOWN_TILES_WIDE * TILE_STRIDE) / 2;

    create_item(
        store,
        "bonfire",
        &[],
        Transform { map_id, y: center_y, x: center_x },
        1,
        None,
        mud_world::components::Slot::Any,
    )?;

    for (dy, dx) in [(0, 2), (0, -2), (2, 0)] {
        create_item(
            store,
            "broadsword",
            &[],
            Transform { map_id, y: center_y + dy, x: center_x + dx },
            1,
            None,
            mud_world::components::Slot::Any,
        )?;
    }
    create_item(
        store,
        "backpack",
        &[],
        Transform { map_id, y: center_y + 1, x: center_x + 1 },
        1,
        None,
        mud_world::components::Slot::Any,
    )?;
    create_item(
        store,
        "cookpot",
        &[],
        Transform { map_id, y: center_y - 1, x: center_x },
        1,
        None,
        mud_world::components::Slot::Any,
    )?;

    let den_entity = store.create_entity();
    store.add_component(den_entity, build_starter_den(map_id, center_y, center_x));
    store.add_component(den_entity, Transform { map_id, y: center_y, x: center_x });

    let mut cues = CueScheduler::new();

    // Nightstorm approaches once per night cycle, a fixed lead time before
    // it actually begins. `cue_at` takes an absolute instant, so the delay
    // is computed against the injected `start` rather than the scheduler's
    // own (real-time) clock, to keep bootstrap deterministic under a fixed
    // seed.
    cues.cue_at(
        |bus| bus.pulse(NightstormWarning),
        start + NightDelta::nights(1.0) - NightDelta::seconds(60.0),
        Some(recurring(0, Some(NightDelta::nights(1.0)), true)),
    );

    // Daily rest-bonus/decay sweep, timed to the in-game dawn hour.
    let rest_eta = start.next(NightTime::new(6, 0));
    cues.cue_at(
        |bus| bus.pulse(RestCheck),
        start + rest_eta,
        Some(recurring(0, Some(NightDelta::nights(1.0)), true)),
    );

    // Den cleanup sweep: frees any `FromDen` slot whose mob has vanished
    // without going through `Die` (e.g. an admin deletion).
    let despawn_eta = start.next(NightTime::new(2, 0));
    cues.cue_at(
        |bus| bus.pulse(DespawnMobs),
        start + despawn_eta,
        Some(recurring(0, Some(NightDelta::nights(1.0)), true)),
    );

    let mut chips_by_map = FxHashMap::default();
    chips_by_map.insert(map_id, chips);

    load_world_inventory(store, persistence)?;

    Ok(WorldHandle { map_id, chips_by_map, cues })
}

/// Rebuild every world-space item a prior run saved via
/// `mud_world::inventory::save_map_inventory`. The persisted rows don't
/// carry map/position (the schema only indexes them by map key for
/// deletion), so reloaded roots land at [`Transform::ORIGIN`] rather than
/// back at their original tile.
fn load_world_inventory(store: &mut EntityStore, persistence: &dyn PersistencePort) -> WorldResult<()> {
    let rows = persistence
        .get_world_inventories()
        .map_err(|e| mud_world::WorldError::ContentLoad(e.to_string()))?;
    if rows.is_empty() {
        return Ok(());
    }
    let world_rows = rows
        .iter()
        .map(|row| from_persisted_row(row, 0))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| mud_world::WorldError::ContentLoad(e.to_string()))?;
    load_rows(store, &world_rows, None)?;
    Ok(())
}
