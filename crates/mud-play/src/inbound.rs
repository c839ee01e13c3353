//! Prompt interception and the per-source lag buffer (§4.11). Plain
//! `Inbound` text either resolves a pending `Prompt` or is queued (if the
//! source is lagged) and re-emitted as `Parse` once its turn comes.

use std::collections::VecDeque;

use rustc_hash::FxHashMap;

use mud_core::signals::{GrowAnchor, Inbound, InboundPrompt, Learn, Parse};
use mud_core::{EntityId, SignalBus};
use mud_world::components::{Lag, Prompt, PromptAction, Skills};
use mud_world::entity::EntityStore;

/// Reapplied to a source's `Lag` every time a queued message drains, so a
/// spammer's own backlog keeps throttling them.
pub const SPAM_PENALTY_SECS: f64 = 0.275;
pub const PENDING_MAXLEN: usize = 20;

/// A resolved prompt action the rest of the simulation couldn't already
/// dispatch directly (currently just `EnterWyrd`) — any crate that wants
/// to react to it reads this signal.
#[derive(Clone, Debug)]
pub struct PromptResolved {
    pub source: EntityId,
    pub action: PromptAction,
}

fn dispatch_prompt_action(store: &EntityStore, bus: &mut SignalBus, source: EntityId, action: PromptAction) {
    match action {
        PromptAction::GrowAnchor { anchor } => bus.pulse(GrowAnchor { anchor }),
        PromptAction::Learn { skill, mult } => {
            let generation = store.try_component::<Skills>(source).map(|s| s.generation).unwrap_or(0);
            bus.pulse(Learn { source, skill, mult, risk: 1.0, generation });
        }
        PromptAction::Cancel => {}
        PromptAction::EnterWyrd => bus.pulse(PromptResolved { source, action: PromptAction::EnterWyrd }),
    }
}

/// Resolve every `InboundPrompt` this tick: matched/expired routing picks
/// one of the prompt's four handlers, falling back to a plain `Inbound`
/// re-pulse when the prompt carries no handler for that outcome (or the
/// source had no pending prompt at all).
pub fn process_prompts(store: &mut EntityStore, bus: &mut SignalBus, now_secs: f64, signals: &[InboundPrompt]) {
    for sig in signals {
        let Some(prompt) = store.remove_component::<Prompt>(sig.source) else {
            bus.pulse(Inbound { source: sig.source, text: sig.text.clone() });
            continue;
        };

        let matched = prompt.text == sig.text;
        let expired = prompt.end_secs.is_some_and(|end| end < now_secs);
        let handler = match (matched, expired) {
            (true, false) => prompt.on_ok,
            (false, false) => prompt.on_err,
            (true, true) => prompt.on_expired_ok,
            (false, true) => prompt.on_expired_err,
        };

        match handler {
            Some(action) => dispatch_prompt_action(store, bus, sig.source, action),
            None => bus.pulse(Inbound { source: sig.source, text: sig.text.clone() }),
        }
    }
}

/// Per-source backlog of `Inbound` text held back while that source is
/// lagged, drained one message per tick.
#[derive(Default)]
pub struct PendingQueue {
    by_source: FxHashMap<EntityId, VecDeque<Inbound>>,
}

impl PendingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending_count(&self, source: EntityId) -> usize {
        self.by_source.get(&source).map(|q| q.len()).unwrap_or(0)
    }
}

fn is_lagged(store: &EntityStore, source: EntityId, now_secs: f64) -> bool {
    store
        .try_component::<Lag>(source)
        .is_some_and(|lag| now_secs < lag.deadline_secs)
}

/// Queue freshly arrived `Inbound` signals for lagged sources, re-pulse
/// unlagged ones immediately as `Parse`, then drain one backlog entry per
/// unlagged source — reapplying the spam penalty on every drain, not only
/// on overflow.
pub fn process(store: &mut EntityStore, bus: &mut SignalBus, queue: &mut PendingQueue, now_secs: f64, inbound: &[Inbound]) {
    for sig in inbound {
        if is_lagged(store, sig.source, now_secs) {
            let backlog = queue.by_source.entry(sig.source).or_default();
            if backlog.len() < PENDING_MAXLEN {
                backlog.push_back(sig.clone());
            }
            continue;
        }
        bus.pulse(Parse { source: sig.source, text: sig.text.clone() });
    }

    let mut gone = Vec::new();
    let mut drained_empty = Vec::new();
    for (&entity, backlog) in queue.by_source.iter_mut() {
        if !store.entity_exists(entity) {
            gone.push(entity);
            continue;
        }
        if is_lagged(store, entity, now_secs) {
            continue;
        }
        if let Some(sig) = backlog.pop_front() {
            bus.pulse(Parse { source: sig.source, text: sig.text });
            store.add_component(entity, Lag { deadline_secs: now_secs + SPAM_PENALTY_SECS });
        }
        if backlog.is_empty() {
            drained_empty.push(entity);
        }
    }

    for entity in drained_empty {
        queue.by_source.remove(&entity);
    }
    for entity in gone {
        queue.by_source.remove(&entity);
        store.remove_component::<Lag>(entity);
    }
}
