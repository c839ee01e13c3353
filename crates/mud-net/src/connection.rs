//! The connection table: maps each live socket to the entity it controls
//! and reacts to `Connected`/`Disconnected` (the Rust-native replacement
//! for attaching/detaching a raw websocket handle as a component).

use rustc_hash::FxHashMap;
use tracing::{info, warn};

use mud_core::signals::{Connected, Disconnected};
use mud_core::{EntityId, SignalBus};
use mud_world::components::{Connection, PersistedOwner};
use mud_world::entity::EntityStore;

use crate::outbox::Outbox;
use crate::persistence::{to_persisted_row, PersistencePort};
use crate::transport::ConnId;

/// Bidirectional map between the opaque `Connection` handle carried on an
/// entity and the raw socket id the transport layer tracks.
#[derive(Default)]
pub struct ConnectionTable {
    entity_by_conn: FxHashMap<ConnId, EntityId>,
    conn_by_entity: FxHashMap<EntityId, ConnId>,
}

impl ConnectionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entity_for(&self, conn: ConnId) -> Option<EntityId> {
        self.entity_by_conn.get(&conn).copied()
    }

    pub fn conn_for(&self, entity: EntityId) -> Option<ConnId> {
        self.conn_by_entity.get(&entity).copied()
    }

    fn bind(&mut self, conn: ConnId, entity: EntityId) {
        self.entity_by_conn.insert(conn, entity);
        self.conn_by_entity.insert(entity, conn);
    }

    fn unbind(&mut self, conn: ConnId) -> Option<EntityId> {
        let entity = self.entity_by_conn.remove(&conn)?;
        self.conn_by_entity.remove(&entity);
        Some(entity)
    }
}

/// React to this tick's `Connected`/`Disconnected` signals: attach or
/// detach the `Connection` component and keep the connection table and
/// outbox dedup state in sync.
pub fn process(
    store: &mut EntityStore,
    bus: &SignalBus,
    table: &mut ConnectionTable,
    outbox: &mut Outbox,
    pending_binds: &mut Vec<(ConnId, EntityId)>,
    persistence: &dyn PersistencePort,
) {
    for (conn, entity) in pending_binds.drain(..) {
        table.bind(conn, entity);
        store.add_component(entity, Connection(conn.0));
        info!(entity = %entity, conn = conn.0, "connected");
    }

    for sig in bus.iter::<Connected>() {
        if !store.has_component::<Connection>(sig.entity) {
            continue;
        }
        info!(entity = %sig.entity, "entity marked connected");
    }

    for sig in bus.iter::<Disconnected>() {
        if let Err(e) = save_inventory(store, persistence, sig.entity) {
            warn!(entity = %sig.entity, "failed to save inventory: {e}");
        }
        store.remove_component::<Connection>(sig.entity);
        if let Some(conn) = table.conn_for(sig.entity) {
            table.unbind(conn);
        }
        outbox.forget(sig.entity);
        info!(entity = %sig.entity, "disconnected");
    }
}

/// Persist everything transitively contained by `entity` under the owner
/// id it was admitted with (§4.13 "... and save them on `Disconnected`").
fn save_inventory(store: &EntityStore, persistence: &dyn PersistencePort, entity: EntityId) -> Result<(), String> {
    let Some(PersistedOwner(owner_id)) = store.try_component::<PersistedOwner>(entity) else {
        return Ok(());
    };
    let rows = mud_world::inventory::save_player_inventory(store, 0, entity);
    let persisted = rows.iter().map(to_persisted_row).collect::<Result<Vec<_>, _>>().map_err(|e| e.to_string())?;
    persistence.replace_inventories_for_owner(owner_id, &persisted).map_err(|e| e.to_string())
}
