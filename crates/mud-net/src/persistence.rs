//! The persistence boundary port (§6): a trait the simulation core talks
//! to, plus an in-memory adapter for tests/dev and an optional SQLite
//! adapter behind the `sqlite` feature — a feature-gated output-backend
//! split, in-memory always on, SQLite behind a Cargo feature.

use std::collections::BTreeMap;

use crate::error::{NetError, NetResult};

/// The minimal row a login needs before the player entity can be built.
#[derive(Clone, Debug, PartialEq)]
pub struct CharacterBrief {
    pub entity_key: String,
    pub name: String,
    pub map_key: String,
    pub y: i32,
    pub x: i32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SkillRow {
    pub name: String,
    pub rank: u32,
    pub tnl: f64,
    pub pending: f64,
    pub rest_bonus: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct InventoryRow {
    pub entity_key: String,
    pub container_key: Option<String>,
    pub slot_ordinal: u8,
    pub item_key: String,
    pub level: u32,
    pub state: Vec<u8>,
}

/// Convert a live [`mud_world::inventory::InventoryRow`] into the wire shape
/// a [`PersistencePort`] stores, bincode-encoding the item's diff state.
pub fn to_persisted_row(row: &mud_world::inventory::InventoryRow) -> NetResult<InventoryRow> {
    Ok(InventoryRow {
        entity_key: row.eid.to_string(),
        container_key: (row.container_eid != 0).then(|| row.container_eid.to_string()),
        slot_ordinal: row.slot.ordinal(),
        item_key: row.key.clone(),
        level: row.level,
        state: bincode::serialize(&row.state)?,
    })
}

/// Inverse of [`to_persisted_row`]; `owner_id` becomes the row's numeric
/// `owner_id` field (unused as a lookup key once loaded, only carried for
/// symmetry with [`mud_world::inventory::save_player_inventory`]'s output).
pub fn from_persisted_row(row: &InventoryRow, owner_id: u64) -> NetResult<mud_world::inventory::InventoryRow> {
    let eid: u64 = row.entity_key.parse().map_err(|_| NetError::ContentLoad(format!("bad entity_key {}", row.entity_key)))?;
    let container_eid = match &row.container_key {
        Some(key) => key.parse().map_err(|_| NetError::ContentLoad(format!("bad container_key {key}")))?,
        None => 0,
    };
    Ok(mud_world::inventory::InventoryRow {
        eid,
        key: row.item_key.clone(),
        slot: mud_world::components::Slot::from_ordinal(row.slot_ordinal),
        container_eid,
        map_id: None,
        x: -1,
        y: -1,
        state: bincode::deserialize(&row.state)?,
        level: row.level,
        owner_id,
    })
}

/// The port every persistence adapter implements. Method names follow a
/// plain repository surface (§6) so the boundary reads the same
/// regardless of backend.
pub trait PersistencePort: Send + Sync {
    fn get_character_brief(&self, owner_id: &str) -> NetResult<Option<CharacterBrief>>;
    fn upsert_character(&self, owner_id: &str, brief: &CharacterBrief) -> NetResult<()>;
    fn create_character(&self, owner_id: &str, brief: &CharacterBrief) -> NetResult<()>;

    fn get_skills_for_character(&self, entity_key: &str) -> NetResult<Vec<SkillRow>>;
    fn upsert_skills(&self, entity_key: &str, skills: &[SkillRow]) -> NetResult<()>;

    fn replace_inventories_for_owner(&self, owner_id: &str, rows: &[InventoryRow]) -> NetResult<()>;
    fn replace_inventories_for_map(&self, map_key: &str, rows: &[InventoryRow]) -> NetResult<()>;
    fn get_inventories_for_owner(&self, owner_id: &str) -> NetResult<Vec<InventoryRow>>;
    fn get_world_inventories(&self) -> NetResult<Vec<InventoryRow>>;
}

/// An in-process adapter backed by `BTreeMap`s — used by tests and by a
/// dev server run with no database configured.
#[derive(Default)]
pub struct InMemoryPersistence {
    characters: std::sync::Mutex<BTreeMap<String, CharacterBrief>>,
    skills: std::sync::Mutex<BTreeMap<String, Vec<SkillRow>>>,
    owner_inventories: std::sync::Mutex<BTreeMap<String, Vec<InventoryRow>>>,
    map_inventories: std::sync::Mutex<BTreeMap<String, Vec<InventoryRow>>>,
}

impl InMemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PersistencePort for InMemoryPersistence {
    fn get_character_brief(&self, owner_id: &str) -> NetResult<Option<CharacterBrief>> {
        Ok(self.characters.lock().unwrap().get(owner_id).cloned())
    }

    fn upsert_character(&self, owner_id: &str, brief: &CharacterBrief) -> NetResult<()> {
        self.characters.lock().unwrap().insert(owner_id.to_string(), brief.clone());
        Ok(())
    }

    fn create_character(&self, owner_id: &str, brief: &CharacterBrief) -> NetResult<()> {
        self.upsert_character(owner_id, brief)
    }

    fn get_skills_for_character(&self, entity_key: &str) -> NetResult<Vec<SkillRow>> {
        Ok(self.skills.lock().unwrap().get(entity_key).cloned().unwrap_or_default())
    }

    fn upsert_skills(&self, entity_key: &str, skills: &[SkillRow]) -> NetResult<()> {
        self.skills.lock().unwrap().insert(entity_key.to_string(), skills.to_vec());
        Ok(())
    }

    fn replace_inventories_for_owner(&self, owner_id: &str, rows: &[InventoryRow]) -> NetResult<()> {
        self.owner_inventories.lock().unwrap().insert(owner_id.to_string(), rows.to_vec());
        Ok(())
    }

    fn replace_inventories_for_map(&self, map_key: &str, rows: &[InventoryRow]) -> NetResult<()> {
        self.map_inventories.lock().unwrap().insert(map_key.to_string(), rows.to_vec());
        Ok(())
    }

    fn get_inventories_for_owner(&self, owner_id: &str) -> NetResult<Vec<InventoryRow>> {
        Ok(self.owner_inventories.lock().unwrap().get(owner_id).cloned().unwrap_or_default())
    }

    fn get_world_inventories(&self) -> NetResult<Vec<InventoryRow>> {
        Ok(self.map_inventories.lock().unwrap().values().flatten().cloned().collect())
    }
}

#[cfg(feature = "sqlite")]
pub mod sqlite {
    //! SQLite adapter (feature `sqlite`): opens a single file and
    //! initializes its schema with `PRAGMA`s suited to a long-running
    //! process rather than a one-shot batch dump.

    use rusqlite::{params, Connection};
    use std::path::Path;
    use std::sync::Mutex;

    use super::{CharacterBrief, InventoryRow, PersistencePort, SkillRow};
    use crate::error::{NetError, NetResult};

    pub struct SqlitePersistence {
        conn: Mutex<Connection>,
    }

    impl SqlitePersistence {
        pub fn open(path: &Path) -> NetResult<Self> {
            let conn = Connection::open(path)?;
            conn.execute_batch(
                "PRAGMA journal_mode = WAL;
                 PRAGMA synchronous  = NORMAL;
                 CREATE TABLE IF NOT EXISTS characters (
                     owner_id   TEXT PRIMARY KEY,
                     entity_key TEXT NOT NULL,
                     name       TEXT NOT NULL,
                     map_key    TEXT NOT NULL,
                     y          INTEGER NOT NULL,
                     x          INTEGER NOT NULL
                 );
                 CREATE TABLE IF NOT EXISTS skills (
                     entity_key TEXT NOT NULL,
                     name       TEXT NOT NULL,
                     rank       INTEGER NOT NULL,
                     tnl        REAL NOT NULL,
                     pending    REAL NOT NULL,
                     rest_bonus REAL NOT NULL,
                     PRIMARY KEY (entity_key, name)
                 );
                 CREATE TABLE IF NOT EXISTS inventories (
                     entity_key    TEXT NOT NULL,
                     owner_id      TEXT,
                     map_key       TEXT,
                     container_key TEXT,
                     slot_ordinal  INTEGER NOT NULL,
                     item_key      TEXT NOT NULL,
                     level         INTEGER NOT NULL DEFAULT 0,
                     state         BLOB NOT NULL DEFAULT x''
                 );",
            )?;
            Ok(Self { conn: Mutex::new(conn) })
        }
    }

    impl PersistencePort for SqlitePersistence {
        fn get_character_brief(&self, owner_id: &str) -> NetResult<Option<CharacterBrief>> {
            let conn = self.conn.lock().unwrap();
            let mut stmt = conn.prepare_cached(
                "SELECT entity_key, name, map_key, y, x FROM characters WHERE owner_id = ?1",
            )?;
            let row = stmt
                .query_row(params![owner_id], |r| {
                    Ok(CharacterBrief {
                        entity_key: r.get(0)?,
                        name: r.get(1)?,
                        map_key: r.get(2)?,
                        y: r.get(3)?,
                        x: r.get(4)?,
                    })
                })
                .map(Some)
                .or_else(|e| if e == rusqlite::Error::QueryReturnedNoRows { Ok(None) } else { Err(e) })?;
            Ok(row)
        }

        fn upsert_character(&self, owner_id: &str, brief: &CharacterBrief) -> NetResult<()> {
            self.conn.lock().unwrap().execute(
                "INSERT INTO characters (owner_id, entity_key, name, map_key, y, x)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(owner_id) DO UPDATE SET
                     entity_key = excluded.entity_key,
                     name       = excluded.name,
                     map_key    = excluded.map_key,
                     y          = excluded.y,
                     x          = excluded.x",
                params![owner_id, brief.entity_key, brief.name, brief.map_key, brief.y, brief.x],
            )?;
            Ok(())
        }

        fn create_character(&self, owner_id: &str, brief: &CharacterBrief) -> NetResult<()> {
            self.upsert_character(owner_id, brief)
        }

        fn get_skills_for_character(&self, entity_key: &str) -> NetResult<Vec<SkillRow>> {
            let conn = self.conn.lock().unwrap();
            let mut stmt = conn.prepare_cached(
                "SELECT name, rank, tnl, pending, rest_bonus FROM skills WHERE entity_key = ?1",
            )?;
            let rows = stmt
                .query_map(params![entity_key], |r| {
                    Ok(SkillRow {
                        name: r.get(0)?,
                        rank: r.get(1)?,
                        tnl: r.get(2)?,
                        pending: r.get(3)?,
                        rest_bonus: r.get(4)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()
                .map_err(NetError::from)?;
            Ok(rows)
        }

        fn upsert_skills(&self, entity_key: &str, skills: &[SkillRow]) -> NetResult<()> {
            let conn = self.conn.lock().unwrap();
            let tx = conn.unchecked_transaction()?;
            {
                let mut stmt = tx.prepare_cached(
                    "INSERT INTO skills (entity_key, name, rank, tnl, pending, rest_bonus)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                     ON CONFLICT(entity_key, name) DO UPDATE SET
                         rank = excluded.rank, tnl = excluded.tnl,
                         pending = excluded.pending, rest_bonus = excluded.rest_bonus",
                )?;
                for skill in skills {
                    stmt.execute(params![
                        entity_key,
                        skill.name,
                        skill.rank,
                        skill.tnl,
                        skill.pending,
                        skill.rest_bonus,
                    ])?;
                }
            }
            tx.commit()?;
            Ok(())
        }

        fn replace_inventories_for_owner(&self, owner_id: &str, rows: &[InventoryRow]) -> NetResult<()> {
            let conn = self.conn.lock().unwrap();
            let tx = conn.unchecked_transaction()?;
            tx.execute("DELETE FROM inventories WHERE owner_id = ?1", params![owner_id])?;
            {
                let mut stmt = tx.prepare_cached(
                    "INSERT INTO inventories (entity_key, owner_id, container_key, slot_ordinal, item_key, level, state)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                )?;
                for row in rows {
                    stmt.execute(params![
                        row.entity_key,
                        owner_id,
                        row.container_key,
                        row.slot_ordinal,
                        row.item_key,
                        row.level,
                        row.state,
                    ])?;
                }
            }
            tx.commit()?;
            Ok(())
        }

        fn replace_inventories_for_map(&self, map_key: &str, rows: &[InventoryRow]) -> NetResult<()> {
            let conn = self.conn.lock().unwrap();
            let tx = conn.unchecked_transaction()?;
            tx.execute("DELETE FROM inventories WHERE map_key = ?1", params![map_key])?;
            {
                let mut stmt = tx.prepare_cached(
                    "INSERT INTO inventories (entity_key, map_key, container_key, slot_ordinal, item_key, level, state)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                )?;
                for row in rows {
                    stmt.execute(params![
                        row.entity_key,
                        map_key,
                        row.container_key,
                        row.slot_ordinal,
                        row.item_key,
                        row.level,
                        row.state,
                    ])?;
                }
            }
            tx.commit()?;
            Ok(())
        }

        fn get_inventories_for_owner(&self, owner_id: &str) -> NetResult<Vec<InventoryRow>> {
            let conn = self.conn.lock().unwrap();
            let mut stmt = conn.prepare_cached(
                "SELECT entity_key, container_key, slot_ordinal, item_key, level, state FROM inventories WHERE owner_id = ?1",
            )?;
            let rows = stmt
                .query_map(params![owner_id], |r| {
                    Ok(InventoryRow {
                        entity_key: r.get(0)?,
                        container_key: r.get(1)?,
                        slot_ordinal: r.get(2)?,
                        item_key: r.get(3)?,
                        level: r.get(4)?,
                        state: r.get(5)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()
                .map_err(NetError::from)?;
            Ok(rows)
        }

        fn get_world_inventories(&self) -> NetResult<Vec<InventoryRow>> {
            let conn = self.conn.lock().unwrap();
            let mut stmt = conn.prepare_cached(
                "SELECT entity_key, container_key, slot_ordinal, item_key, level, state FROM inventories WHERE map_key IS NOT NULL",
            )?;
            let rows = stmt
                .query_map([], |r| {
                    Ok(InventoryRow {
                        entity_key: r.get(0)?,
                        container_key: r.get(1)?,
                        slot_ordinal: r.get(2)?,
                        item_key: r.get(3)?,
                        level: r.get(4)?,
                        state: r.get(5)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()
                .map_err(NetError::from)?;
            Ok(rows)
        }
    }
}
