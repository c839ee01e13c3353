//! Act queue: one-effect-at-a-time discipline per source entity, with a
//! min-heap of pending delayed effects (§4.4).

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use rustc_hash::FxHashMap;

use mud_core::signals::{Act, Interrupt};
use mud_core::{EntityId, SignalBus};
use mud_world::components::{Condition, Health, Stunned};
use mud_world::entity::EntityStore;

struct PendingAct(Act);

impl PartialEq for PendingAct {
    fn eq(&self, other: &Self) -> bool {
        self.0.id == other.0.id
    }
}
impl Eq for PendingAct {}
impl PartialOrd for PendingAct {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for PendingAct {
    fn cmp(&self, other: &Self) -> Ordering {
        // Min-heap on `delay_secs`-derived end time, stored by the caller as
        // an absolute deadline at push time (see `ActQueue::push`).
        other.end_secs().partial_cmp(&self.end_secs()).unwrap_or(Ordering::Equal)
    }
}

impl PendingAct {
    fn end_secs(&self) -> f64 {
        self.0.delay_secs
    }
}

/// Tracks, per source entity, the one in-flight `Act` allowed at a time.
#[derive(Default)]
pub struct ActQueue {
    heap: BinaryHeap<PendingAct>,
    current: FxHashMap<EntityId, u64>,
}

fn act_ready(store: &EntityStore, source: EntityId) -> bool {
    if !store.entity_exists(source) {
        return false;
    }
    if let Some(health) = store.try_component::<Health>(source) {
        if health.condition != Condition::Normal {
            return false;
        }
    }
    !store.has_component::<Stunned>(source)
}

impl ActQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// `true` if `entity` currently has an in-flight act (is mid-action).
    pub fn is_busy(&self, entity: EntityId) -> bool {
        self.current.contains_key(&entity)
    }

    /// `true` if some act targeting `target` is in flight from a source
    /// that is alive, current, and not incapacitated.
    pub fn being_attacked(&self, store: &EntityStore, target: EntityId, incoming: &[Act]) -> bool {
        self.heap
            .iter()
            .map(|p| &p.0)
            .chain(incoming.iter())
            .any(|act| {
                act.target == target
                    && self.current.get(&act.source).copied().unwrap_or(act.id) == act.id
                    && act_ready(store, act.source)
            })
    }

    /// `true` if some act from a source other than `source` targets
    /// `target` — used to decide whether an interrupted action should be
    /// blamed on a third party.
    pub fn attacked_by_other(
        &self,
        store: &EntityStore,
        source: EntityId,
        target: EntityId,
        incoming: &[Act],
    ) -> bool {
        self.heap
            .iter()
            .map(|p| &p.0)
            .chain(incoming.iter())
            .any(|act| {
                act.source != source
                    && act.target == target
                    && self.current.get(&act.source).copied().unwrap_or(act.id) == act.id
                    && act_ready(store, act.source)
            })
    }

    /// Process one tick: apply `Interrupt`s, pop and fire every act whose
    /// deadline has passed, then admit newly pulsed acts. `now_secs` and
    /// every `Act::delay_secs` in `acts` must already be absolute deadlines
    /// in the same clock, not relative delays — the caller (the tick loop)
    /// resolves `delay_secs` into an absolute deadline at pulse time.
    pub fn process(&mut self, store: &EntityStore, bus: &mut SignalBus, now_secs: f64, acts: &[Act]) {
        for interrupt in bus.iter::<Interrupt>() {
            self.current.remove(&interrupt.source);
        }

        while matches!(self.heap.peek(), Some(p) if p.end_secs() < now_secs) {
            let pending = self.heap.pop().expect("peeked Some above");
            let act = pending.0;
            if self.current.get(&act.source) == Some(&act.id) {
                self.current.remove(&act.source);
                if store.entity_exists(act.source) {
                    bus.pulse(act.then);
                }
            }
        }

        for act in acts {
            self.current.insert(act.source, act.id);
            self.heap.push(PendingAct(act.clone()));
        }
    }

    pub fn pending_count(&self) -> usize {
        self.heap.len()
    }
}
