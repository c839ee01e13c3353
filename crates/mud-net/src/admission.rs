//! Ties the transport layer's raw connection events to authentication,
//! lazy persisted-character loading, and player entity creation (§4.13:
//! "load persisted characters lazily per-connection, on `Connected`, not
//! eagerly at boot").

use std::collections::BTreeMap;

use rustc_hash::FxHashMap;
use tracing::warn;

use mud_core::signals::{Connected, Disconnected, Inbound};
use mud_core::{EntityId, SignalBus};
use mud_world::components::{Glyph, Health, Noun, PersistedOwner, Skill, Skills, Stance, Stats, Transform};
use mud_world::entity::EntityStore;

use crate::auth::AuthPort;
use crate::connection::ConnectionTable;
use crate::persistence::{from_persisted_row, CharacterBrief, PersistencePort};
use crate::transport::{ConnId, InboundEvent, OutboundHandle};

const STARTER_MAX_HEALTH: f64 = 100.0;
const STARTER_STATS: Stats = Stats { grace: 10.0, grit: 10.0, wit: 10.0 };

/// Per-connection admission state: which sockets are still waiting on
/// their first line before a player entity exists for them.
#[derive(Default)]
pub struct Admission {
    awaiting_auth: FxHashMap<ConnId, ()>,
}

impl Admission {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain every transport event queued since the last tick. Newly
    /// admitted `(conn, entity)` pairs still need to be handed to
    /// [`crate::connection::process`] so the `Connection` component and
    /// connection table stay in sync; this function returns them rather
    /// than binding directly so the two concerns stay separately testable.
    pub fn process(
        &mut self,
        store: &mut EntityStore,
        bus: &mut SignalBus,
        table: &ConnectionTable,
        events: &mut tokio::sync::mpsc::UnboundedReceiver<InboundEvent>,
        auth: &dyn AuthPort,
        persistence: &dyn PersistencePort,
        maps: &FxHashMap<String, EntityId>,
        outbound: &OutboundHandle,
    ) -> Vec<(ConnId, EntityId)> {
        let mut admitted = Vec::new();

        while let Ok(event) = events.try_recv() {
            match event {
                InboundEvent::Accepted(conn) => {
                    self.awaiting_auth.insert(conn, ());
                }
                InboundEvent::Line(conn, line) => {
                    if self.awaiting_auth.remove(&conn).is_some() {
                        match self.admit(store, bus, auth, persistence, maps, conn, &line) {
                            Some(entity) => admitted.push((conn, entity)),
                            None => outbound.close(conn),
                        }
                        continue;
                    }
                    if let Some(entity) = table.entity_for(conn) {
                        bus.pulse(Inbound { source: entity, text: line });
                    } else {
                        warn!(conn = conn.0, "line from unbound, non-pending connection");
                    }
                }
                InboundEvent::Disconnected(conn) => {
                    self.awaiting_auth.remove(&conn);
                    if let Some(entity) = table.entity_for(conn) {
                        bus.pulse(Disconnected { entity });
                    }
                }
            }
        }

        admitted
    }

    fn admit(
        &self,
        store: &mut EntityStore,
        bus: &mut SignalBus,
        auth: &dyn AuthPort,
        persistence: &dyn PersistencePort,
        maps: &FxHashMap<String, EntityId>,
        conn: ConnId,
        first_line: &str,
    ) -> Option<EntityId> {
        let owner_id = match auth.authenticate(first_line) {
            Ok(owner) => owner,
            Err(e) => {
                warn!(conn = conn.0, "auth rejected: {e}");
                return None;
            }
        };

        let brief = match persistence.get_character_brief(&owner_id) {
            Ok(Some(brief)) => brief,
            Ok(None) => {
                let brief = CharacterBrief {
                    entity_key: owner_id.clone(),
                    name: owner_id.clone(),
                    map_key: "start".to_string(),
                    y: 0,
                    x: 0,
                };
                if let Err(e) = persistence.create_character(&owner_id, &brief) {
                    warn!(conn = conn.0, "failed to create character: {e}");
                    return None;
                }
                brief
            }
            Err(e) => {
                warn!(conn = conn.0, "persistence lookup failed: {e}");
                return None;
            }
        };

        let map_id = maps.get(&brief.map_key).copied().unwrap_or(EntityId::INVALID);

        let entity = store.create_entity();
        store.add_component(entity, Transform { map_id, y: brief.y, x: brief.x });
        store.add_component(entity, Noun::new(brief.name.clone()));
        store.add_component(entity, Health::full(STARTER_MAX_HEALTH));
        store.add_component(entity, Stance::default());
        store.add_component(entity, STARTER_STATS);
        store.add_component(entity, Glyph::new('@', 0.0, 0.0, 1.0));
        store.add_component(entity, load_skills(persistence, &brief.entity_key));
        store.add_component(entity, PersistedOwner(owner_id.clone()));

        if let Err(e) = load_inventory(store, persistence, &owner_id, entity) {
            warn!(conn = conn.0, "failed to load inventory: {e}");
        }

        bus.pulse(Connected { entity });
        Some(entity)
    }
}

/// Load `owner_id`'s saved inventory rows and rebuild them as entities
/// contained by `entity` (§4.13 "load persisted ... inventories lazily
/// per-connection, on `Connected`").
fn load_inventory(
    store: &mut EntityStore,
    persistence: &dyn PersistencePort,
    owner_id: &str,
    entity: EntityId,
) -> Result<(), String> {
    let rows = persistence.get_inventories_for_owner(owner_id).map_err(|e| e.to_string())?;
    if rows.is_empty() {
        return Ok(());
    }
    let world_rows = rows
        .iter()
        .map(|row| from_persisted_row(row, 0))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| e.to_string())?;
    mud_world::inventory::load_rows(store, &world_rows, Some(entity)).map_err(|e| e.to_string())?;
    Ok(())
}

fn load_skills(persistence: &dyn PersistencePort, entity_key: &str) -> Skills {
    let rows = match persistence.get_skills_for_character(entity_key) {
        Ok(rows) if !rows.is_empty() => rows,
        _ => return Skills::starter(),
    };
    let mut by_name = BTreeMap::new();
    for row in rows {
        by_name.insert(
            row.name.clone(),
            Skill { name: row.name, rank: row.rank, tnl: row.tnl, pending: row.pending, rest_bonus: row.rest_bonus },
        );
    }
    Skills { generation: 0, by_name }
}
