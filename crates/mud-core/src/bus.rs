//! Type-erased per-tick signal bus.
//!
//! For each signal type `T`, the bus keeps a `VecDeque<T>`. Operations:
//!
//! - [`SignalBus::pulse`] appends to `T`'s queue; never yields.
//! - [`SignalBus::iter`] returns a snapshot of `T`'s queue at call time —
//!   pulses of `T` made while iterating are not observed by that iterator,
//!   matching the "readers see a snapshot" contract.
//! - [`SignalBus::is_empty`] is a cheap precondition check.
//! - [`SignalBus::pulse_in`] schedules a pulse after a real-time delay.
//! - [`SignalBus::clear`] empties every queue; the tick loop calls this
//!   exactly once per tick, after every system has run.
//!
//! Signal types are not registered up front — the first `pulse::<T>` or
//! `iter::<T>` call lazily creates `T`'s queue via `TypeId`.

use std::any::{Any, TypeId};
use std::collections::{BinaryHeap, VecDeque};
use std::time::{Duration, Instant};

use rustc_hash::FxHashMap;

/// A delayed pulse, ordered by fire time (min-heap via reversed `Ord`).
struct DelayedPulse {
    fire_at: Instant,
    apply: Box<dyn FnOnce(&mut SignalBus) + Send>,
}

impl PartialEq for DelayedPulse {
    fn eq(&self, other: &Self) -> bool {
        self.fire_at == other.fire_at
    }
}
impl Eq for DelayedPulse {}
impl PartialOrd for DelayedPulse {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for DelayedPulse {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Reverse so `BinaryHeap` (a max-heap) pops the earliest deadline first.
        other.fire_at.cmp(&self.fire_at)
    }
}

/// A queue slot that knows how to clear itself without the caller naming
/// its element type — registered once, at the queue's first use.
type Clearer = Box<dyn Fn(&mut Box<dyn Any + Send>) + Send + Sync>;

/// Per-frame signal queues plus a timer-backed delayed-pulse heap.
#[derive(Default)]
pub struct SignalBus {
    queues: FxHashMap<TypeId, Box<dyn Any + Send>>,
    clearers: FxHashMap<TypeId, Clearer>,
    timers: BinaryHeap<DelayedPulse>,
}

impl SignalBus {
    pub fn new() -> Self {
        Self {
            queues: FxHashMap::default(),
            clearers: FxHashMap::default(),
            timers: BinaryHeap::new(),
        }
    }

    fn queue_mut<T: 'static + Send>(&mut self) -> &mut VecDeque<T> {
        let id = TypeId::of::<T>();
        self.clearers.entry(id).or_insert_with(|| {
            Box::new(|boxed: &mut Box<dyn Any + Send>| {
                if let Some(q) = boxed.downcast_mut::<VecDeque<T>>() {
                    q.clear();
                }
            })
        });
        self.queues
            .entry(id)
            .or_insert_with(|| Box::new(VecDeque::<T>::new()))
            .downcast_mut::<VecDeque<T>>()
            .expect("signal queue type mismatch")
    }

    /// Append a signal to its type's queue.
    pub fn pulse<T: 'static + Send>(&mut self, signal: T) {
        self.queue_mut::<T>().push_back(signal);
    }

    /// Append every signal in `signals` to its type's queue, in order.
    pub fn pulse_all<T: 'static + Send>(&mut self, signals: impl IntoIterator<Item = T>) {
        self.queue_mut::<T>().extend(signals);
    }

    /// Schedule a pulse of `signal` after `delay` real time has elapsed.
    /// Drained by [`SignalBus::drain_timers`], which the tick loop calls
    /// once at the start of each pass before the first system runs.
    pub fn pulse_in<T: 'static + Send>(&mut self, delay: Duration, signal: T) {
        self.timers.push(DelayedPulse {
            fire_at: Instant::now() + delay,
            apply: Box::new(move |bus| bus.pulse(signal)),
        });
    }

    /// Move any timer whose deadline has passed into its signal's queue.
    pub fn drain_timers(&mut self) {
        let now = Instant::now();
        while matches!(self.timers.peek(), Some(p) if p.fire_at <= now) {
            let due = self.timers.pop().expect("peeked Some above");
            (due.apply)(self);
        }
    }

    /// Snapshot of `T`'s queue at call time, in insertion order. Pulses of
    /// `T` made while this iterator is alive are not observed by it.
    pub fn iter<T: 'static + Send + Clone>(&self) -> impl Iterator<Item = T> {
        self.queues
            .get(&TypeId::of::<T>())
            .and_then(|q| q.downcast_ref::<VecDeque<T>>())
            .cloned()
            .unwrap_or_default()
            .into_iter()
    }

    /// Cheap precondition: is `T`'s queue currently empty?
    pub fn is_empty<T: 'static + Send>(&self) -> bool {
        self.queues
            .get(&TypeId::of::<T>())
            .and_then(|q| q.downcast_ref::<VecDeque<T>>())
            .map(VecDeque::is_empty)
            .unwrap_or(true)
    }

    /// Empty every signal queue. Does not affect pending timers.
    pub fn clear(&mut self) {
        for (id, queue) in self.queues.iter_mut() {
            if let Some(clearer) = self.clearers.get(id) {
                clearer(queue);
            }
        }
    }
}
