//! Chunked tile grids, toroidal lookup, decay, and the optional gas
//! simulation (§4.10).

use rustc_hash::FxHashMap;

use mud_core::signals::{AnchorDestroyed, DecayCheck, TileDecay};
use mud_core::{EntityId, SignalBus};

use crate::components::{Anchor, Transform};
use crate::entity::EntityStore;

pub const TILE_STRIDE: i32 = 16;
const TILE_CELLS: usize = (TILE_STRIDE * TILE_STRIDE) as usize;

/// Floored (not truncated) division — required so negative coordinates
/// wrap onto the correct tile boundary (§9 Design Notes).
#[inline]
fn floor_div(a: i32, b: i32) -> i32 {
    a.div_euclid(b)
}

/// Key a world coordinate into its owning tile's top-left corner.
#[inline]
pub fn tile_key(y: i32, x: i32) -> (i32, i32) {
    (floor_div(y, TILE_STRIDE) * TILE_STRIDE, floor_div(x, TILE_STRIDE) * TILE_STRIDE)
}

/// A map's sparse tile storage: `(tile_top, tile_left) -> 256-byte grid`.
/// Lookup wraps toroidally onto the map's declared size, then floors to the
/// tile boundary.
#[derive(Clone)]
pub struct Chips {
    pub width: i32,
    pub height: i32,
    tiles: FxHashMap<(i32, i32), [u8; TILE_CELLS]>,
}

impl Chips {
    pub fn new(width: i32, height: i32) -> Self {
        Self {
            width,
            height,
            tiles: FxHashMap::default(),
        }
    }

    fn wrap(&self, y: i32, x: i32) -> (i32, i32) {
        (y.rem_euclid(self.height.max(1)), x.rem_euclid(self.width.max(1)))
    }

    pub fn set_tile(&mut self, top: i32, left: i32, data: [u8; TILE_CELLS]) {
        self.tiles.insert((top, left), data);
    }

    pub fn remove_tile(&mut self, top: i32, left: i32) {
        self.tiles.remove(&(top, left));
    }

    pub fn has_tile(&self, top: i32, left: i32) -> bool {
        self.tiles.contains_key(&(top, left))
    }

    pub fn get_tile(&self, top: i32, left: i32) -> Option<&[u8; TILE_CELLS]> {
        self.tiles.get(&(top, left))
    }

    pub fn tile_keys(&self) -> impl Iterator<Item = (i32, i32)> + '_ {
        self.tiles.keys().copied()
    }

    /// Tile id at `(y, x)`, after toroidal wrap and floored division into
    /// the owning tile. Returns `None` if the tile doesn't exist.
    pub fn tile_id_at(&self, y: i32, x: i32) -> Option<u8> {
        let (wy, wx) = self.wrap(y, x);
        let (top, left) = tile_key(wy, wx);
        let tile = self.tiles.get(&(top, left))?;
        let local_y = (wy - top) as usize;
        let local_x = (wx - left) as usize;
        Some(tile[local_y * TILE_STRIDE as usize + local_x])
    }
}

/// The walkable tile id set (§4.7): ids 1 and 3 are passable.
pub fn can_enter(chips: &Chips, y: i32, x: i32) -> bool {
    matches!(chips.tile_id_at(y, x), Some(1) | Some(3))
}

/// Tracks, per map, the walltime a tile was first sent to any client — the
/// outbox consults this to decide whether a tile "exists" yet for dedup
/// purposes (owned by the world model; mutated by `mud-net`'s outbox).
#[derive(Default, Clone)]
pub struct TileInstantiation {
    first_sent: FxHashMap<(i32, i32), f64>,
}

impl TileInstantiation {
    pub fn mark_sent(&mut self, top: i32, left: i32, at_secs: f64) {
        self.first_sent.entry((top, left)).or_insert(at_secs);
    }

    pub fn exists(&self, top: i32, left: i32) -> bool {
        self.first_sent.contains_key(&(top, left))
    }
}

/// `true` if any `Anchor` on `map_id` protects `(y, x)` (manhattan-disk).
pub fn any_anchor_protects(store: &EntityStore, map_id: EntityId, y: i32, x: i32) -> bool {
    store.query::<Anchor>().any(|(e, anchor)| {
        store
            .try_component::<Transform>(e)
            .is_some_and(|t| t.map_id == map_id && anchor.protects(*t, y, x))
    })
}

/// React to `DecayCheck`: pulse `TileDecay` for every unprotected tile on
/// every map.
pub fn process_decay_check(store: &EntityStore, bus: &mut SignalBus, maps: &[(EntityId, &Chips)]) {
    if bus.is_empty::<DecayCheck>() {
        return;
    }
    for _ in bus.iter::<DecayCheck>() {
        for (map_id, chips) in maps {
            for (top, left) in chips.tile_keys().collect::<Vec<_>>() {
                let center_y = top + TILE_STRIDE / 2;
                let center_x = left + TILE_STRIDE / 2;
                if any_anchor_protects(store, *map_id, center_y, center_x) {
                    continue;
                }
                bus.pulse(TileDecay {
                    map_id: *map_id,
                    center_y,
                    center_x,
                });
            }
        }
    }
}

/// React to `TileDecay`: remove the tile unless protected or occupied by a
/// Transform-bearing entity.
pub fn process_tile_decay(store: &EntityStore, bus: &SignalBus, chips_by_map: &mut FxHashMap<EntityId, Chips>) {
    for sig in bus.iter::<TileDecay>() {
        if any_anchor_protects(store, sig.map_id, sig.center_y, sig.center_x) {
            continue;
        }
        let (top, left) = tile_key(sig.center_y, sig.center_x);
        let occupied = store.query::<Transform>().any(|(_, t)| {
            t.map_id == sig.map_id
                && t.y >= top
                && t.y < top + TILE_STRIDE
                && t.x >= left
                && t.x < left + TILE_STRIDE
        });
        if occupied {
            continue;
        }
        if let Some(chips) = chips_by_map.get_mut(&sig.map_id) {
            chips.remove_tile(top, left);
        }
    }
}

/// React to `AnchorDestroyed` cleanup hook (placeholder for world
/// bootstrap-registered reactions — kept as a pass-through so the signal
/// type is exercised even where no special handling is needed yet).
pub fn process_anchor_destroyed(bus: &SignalBus) -> Vec<EntityId> {
    bus.iter::<AnchorDestroyed>().map(|s| s.anchor).collect()
}

// ── Gas simulation (optional, §4.10) ────────────────────────────────────────

/// A sparse potence field plus its bounding box, attached to an entity that
/// represents one gas cloud.
#[derive(Clone, Default)]
pub struct Gas {
    pub map_id: EntityId,
    cells: FxHashMap<(i32, i32), f32>,
}

impl Gas {
    pub fn new(map_id: EntityId) -> Self {
        Self {
            map_id,
            cells: FxHashMap::default(),
        }
    }

    pub fn set(&mut self, y: i32, x: i32, potence: f32) {
        self.cells.insert((y, x), potence);
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = ((i32, i32), f32)> + '_ {
        self.cells.iter().map(|(&k, &v)| (k, v))
    }

    const EIGHT_DIRS: [(i32, i32); 8] = [
        (-1, -1), (-1, 0), (-1, 1),
        (0, -1), (0, 1),
        (1, -1), (1, 0), (1, 1),
    ];

    /// One spread step: each cell's potence diffuses to its walkable
    /// 8-neighbors (divided by `n+1`), minus a loss rate; cells below
    /// `epsilon` are dropped.
    pub fn step(&mut self, chips: &Chips, loss_rate: f32, epsilon: f32) {
        let mut next: FxHashMap<(i32, i32), f32> = FxHashMap::default();
        for (&(y, x), &potence) in self.cells.iter() {
            let walkable_neighbors: Vec<(i32, i32)> = Self::EIGHT_DIRS
                .iter()
                .map(|(dy, dx)| (y + dy, x + dx))
                .filter(|&(ny, nx)| can_enter(chips, ny, nx))
                .collect();
            let n = walkable_neighbors.len() as f32;
            let share = potence / (n + 1.0);
            *next.entry((y, x)).or_insert(0.0) += share;
            for neighbor in walkable_neighbors {
                *next.entry(neighbor).or_insert(0.0) += share;
            }
        }
        self.cells = next
            .into_iter()
            .map(|(k, v)| (k, (v - loss_rate).max(0.0)))
            .filter(|&(_, v)| v > epsilon)
            .collect();
    }
}
