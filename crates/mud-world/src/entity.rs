//! The entity store: an append-only id allocator plus per-type sparse maps
//! from entity id to component.
//!
//! Entities in this world are created and destroyed continuously — mobs
//! spawn and despawn, items drop and rot, connections come and go — so
//! storage is a sparse `HashMap<EntityId, T>` per component type behind a
//! type-erased registry, not a dense push-only `Vec<T>` indexed by
//! contiguous id (which only works for a fixed population). The type-erasure
//! idiom (`HashMap<TypeId, Box<dyn ComponentColumn>>`) is kept the same
//! shape either way.
//!
//! Invariant: within a single tick phase, the set of ids returned by
//! [`EntityStore::query`]/[`EntityStore::query2`]/... is stable — systems
//! that create or delete entities buffer those requests and apply them
//! between phases via [`EntityStore::apply_pending`], rather than mutating
//! the store mid-query.

use std::any::{Any, TypeId};
use std::collections::HashMap;

use rustc_hash::FxHashMap;

use mud_core::EntityId;

trait ComponentColumn: Any + Send {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn remove_erased(&mut self, id: EntityId);
}

struct Column<T>(HashMap<EntityId, T>);

impl<T: 'static + Send> ComponentColumn for Column<T> {
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
    fn remove_erased(&mut self, id: EntityId) {
        self.0.remove(&id);
    }
}

/// Pending structural changes, applied between tick phases so that a
/// query's result set is stable for the duration of a phase.
#[derive(Default)]
struct Pending {
    deletes: Vec<EntityId>,
}

/// Owns every component column and the id allocator.
pub struct EntityStore {
    next_id: u64,
    alive: rustc_hash::FxHashSet<EntityId>,
    columns: FxHashMap<TypeId, Box<dyn ComponentColumn>>,
    pending: Pending,
}

impl Default for EntityStore {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityStore {
    pub fn new() -> Self {
        Self {
            next_id: 1, // id 0 is reserved as the wire "recipient" marker
            alive: Default::default(),
            columns: FxHashMap::default(),
            pending: Pending::default(),
        }
    }

    /// Allocate a fresh entity id and mark it alive. Does not attach any
    /// components; callers add them with [`EntityStore::add_component`].
    pub fn create_entity(&mut self) -> EntityId {
        let id = EntityId(self.next_id);
        self.next_id += 1;
        self.alive.insert(id);
        id
    }

    pub fn entity_exists(&self, id: EntityId) -> bool {
        self.alive.contains(&id)
    }

    fn column_mut<T: 'static + Send>(&mut self) -> &mut HashMap<EntityId, T> {
        &mut self
            .columns
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Box::new(Column::<T>(HashMap::new())))
            .as_any_mut()
            .downcast_mut::<Column<T>>()
            .expect("component column type mismatch")
            .0
    }

    fn column_ref<T: 'static + Send>(&self) -> Option<&HashMap<EntityId, T>> {
        self.columns
            .get(&TypeId::of::<T>())
            .and_then(|c| c.as_any().downcast_ref::<Column<T>>())
            .map(|c| &c.0)
    }

    pub fn add_component<T: 'static + Send>(&mut self, id: EntityId, component: T) {
        self.column_mut::<T>().insert(id, component);
    }

    pub fn remove_component<T: 'static + Send>(&mut self, id: EntityId) -> Option<T> {
        self.column_mut::<T>().remove(&id)
    }

    pub fn has_component<T: 'static + Send>(&self, id: EntityId) -> bool {
        self.column_ref::<T>()
            .map(|c| c.contains_key(&id))
            .unwrap_or(false)
    }

    pub fn try_component<T: 'static + Send>(&self, id: EntityId) -> Option<&T> {
        self.column_ref::<T>().and_then(|c| c.get(&id))
    }

    pub fn try_component_mut<T: 'static + Send>(&mut self, id: EntityId) -> Option<&mut T> {
        self.column_mut::<T>().get_mut(&id)
    }

    /// Iterate every entity owning a component of type `T`.
    pub fn query<T: 'static + Send>(&self) -> impl Iterator<Item = (EntityId, &T)> {
        self.column_ref::<T>()
            .into_iter()
            .flat_map(|c| c.iter().map(|(&id, v)| (id, v)))
    }

    /// Request an entity's deletion. Actually removed (all columns swept)
    /// at the next [`EntityStore::apply_pending`] call, matching the
    /// store's phase-stability invariant.
    pub fn delete_entity(&mut self, id: EntityId) {
        self.pending.deletes.push(id);
    }

    /// Apply buffered deletions: sweep every registered column and drop the
    /// entity from the alive set. Called once between tick phases.
    pub fn apply_pending(&mut self) {
        if self.pending.deletes.is_empty() {
            return;
        }
        let deletes = std::mem::take(&mut self.pending.deletes);
        for id in &deletes {
            self.alive.remove(id);
        }
        for column in self.columns.values_mut() {
            for id in &deletes {
                column.remove_erased(*id);
            }
        }
    }

    pub fn live_count(&self) -> usize {
        self.alive.len()
    }
}
