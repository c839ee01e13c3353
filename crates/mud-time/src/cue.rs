//! A single min-heap-backed cue scheduler (§4.5), used both for the three
//! world-level recurring cues (`NightstormWarning`, `RestCheck`,
//! `DespawnMobs`, registered by world bootstrap, §4.13) and for any other
//! scheduled signal a system wants to fire at a future night-clock time.
//! There is deliberately only one heap implementation in this crate — no
//! second copy embedded elsewhere.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use mud_core::SignalBus;

use crate::clock::{NightClock, NightDelta, NightTime};

/// An iterator of successive intervals; yielding `None` stops recurrence.
pub type Recur = Box<dyn Iterator<Item = NightDelta> + Send>;

/// `recurring(n_more_times=N)`, `recurring(forever=true)` equivalents.
struct RecurringRule {
    remaining: Option<u64>,
    interval: NightDelta,
}

impl Iterator for RecurringRule {
    type Item = NightDelta;
    fn next(&mut self) -> Option<NightDelta> {
        match &mut self.remaining {
            Some(0) => None,
            Some(n) => {
                *n -= 1;
                Some(self.interval)
            }
            None => Some(self.interval),
        }
    }
}

pub fn recurring(n_more_times: u64, interval: Option<NightDelta>, forever: bool) -> Recur {
    Box::new(RecurringRule {
        remaining: if forever { None } else { Some(n_more_times) },
        interval: interval.unwrap_or(NightDelta::nights(1.0)),
    })
}

/// A pending heap entry. The pulse closure carries the signal's concrete
/// type so the scheduler itself stays signal-agnostic.
struct CueEntry {
    due: NightClock,
    serial: u64,
    pulse: Box<dyn FnMut(&mut SignalBus) + Send>,
    recur: Option<Recur>,
}

impl PartialEq for CueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.serial == other.serial
    }
}
impl Eq for CueEntry {}
impl PartialOrd for CueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for CueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse so `BinaryHeap` (max-heap) pops the earliest-due entry,
        // breaking ties on insertion order.
        other
            .due
            .partial_cmp(&self.due)
            .unwrap_or(Ordering::Equal)
            .then_with(|| other.serial.cmp(&self.serial))
    }
}

pub struct CueScheduler {
    clock: NightClock,
    heap: BinaryHeap<CueEntry>,
    next_serial: u64,
}

impl Default for CueScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl CueScheduler {
    pub fn new() -> Self {
        Self {
            clock: NightClock::now(),
            heap: BinaryHeap::new(),
            next_serial: 0,
        }
    }

    pub fn clock(&self) -> NightClock {
        self.clock
    }

    fn next_serial(&mut self) -> u64 {
        let s = self.next_serial;
        self.next_serial += 1;
        s
    }

    /// Schedule `pulse` to fire at an absolute night-clock instant.
    pub fn cue_at(
        &mut self,
        pulse: impl FnMut(&mut SignalBus) + Send + 'static,
        at: NightClock,
        recur: Option<Recur>,
    ) {
        let serial = self.next_serial();
        self.heap.push(CueEntry {
            due: at,
            serial,
            pulse: Box::new(pulse),
            recur,
        });
    }

    /// Schedule `pulse` to fire at the next occurrence of `time` (today's
    /// instance if still ahead, tomorrow's otherwise).
    pub fn cue(
        &mut self,
        pulse: impl FnMut(&mut SignalBus) + Send + 'static,
        time: NightTime,
        recur: Option<Recur>,
    ) {
        let eta = self.clock.next(time);
        self.cue_at(pulse, self.clock + eta, recur);
    }

    /// Advance the scheduler's clock to real now and fire every due entry,
    /// in due-then-insertion order, re-queuing recurring ones.
    pub fn process(&mut self, bus: &mut SignalBus) {
        let now = NightClock::now();
        self.process_at(bus, now);
    }

    /// Same as [`CueScheduler::process`], but against an explicit clock
    /// instant instead of real wall time — used by tests, and by anything
    /// driving the scheduler from a simulated clock.
    pub fn process_at(&mut self, bus: &mut SignalBus, now: NightClock) {
        self.clock = now;
        while matches!(self.heap.peek(), Some(e) if e.due <= self.clock) {
            let mut entry = self.heap.pop().expect("peeked Some above");
            (entry.pulse)(bus);
            let Some(mut recur) = entry.recur else { continue };
            if let Some(eta) = recur.next() {
                let serial = self.next_serial();
                self.heap.push(CueEntry {
                    due: entry.due + eta,
                    serial,
                    pulse: entry.pulse,
                    recur: Some(recur),
                });
            }
        }
    }

    pub fn pending_count(&self) -> usize {
        self.heap.len()
    }
}
