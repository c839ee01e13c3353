//! The built-in command table (§4.11): one [`Command`] implementor per
//! verb, dispatched by [`crate::parser`].

use mud_core::signals::{Act, ActEffect, Compass, Emit, Melee, MoveCompass, Outbound, ReachKind, StanceChanged};
use mud_core::{EntityId, SignalBus};
use mud_time::ActQueue;
use mud_world::components::{Condition, Health, Noun, Stance, StanceKind};
use mud_world::entity::EntityStore;

use crate::combat::MELEE_DELAY_SECS;
use crate::reach::{self, adjacent};

pub struct CommandContext<'a> {
    pub store: &'a mut EntityStore,
    pub bus: &'a mut SignalBus,
    pub acts: &'a ActQueue,
}

pub type Out = Result<(), String>;
pub const OK: Out = Ok(());

/// One dispatchable verb. `text()` is the canonical command name the typed
/// prefix is matched against; `requires_healthy`/`requires_not_busy` are
/// dispatch-level gates the parser checks before calling `trigger`.
pub trait Command: Send + Sync {
    fn text(&self) -> &str;
    fn requires_healthy(&self) -> bool {
        true
    }
    fn requires_not_busy(&self) -> bool {
        true
    }
    fn trigger(&self, ctx: &mut CommandContext, source: EntityId, rest: &str) -> Out;
}

pub(crate) fn condition_text(condition: Condition) -> &'static str {
    match condition {
        Condition::Normal => "fine",
        Condition::Unconscious => "unconscious",
        Condition::InShock => "in shock",
        Condition::Dead => "dead",
    }
}

fn stance_ordinal(stance: StanceKind) -> u8 {
    match stance {
        StanceKind::Standing => 0,
        StanceKind::Kneeling => 1,
        StanceKind::Sitting => 2,
        StanceKind::LyingProne => 3,
    }
}

pub fn stance_from_ordinal(ordinal: u8) -> StanceKind {
    match ordinal {
        1 => StanceKind::Kneeling,
        2 => StanceKind::Sitting,
        3 => StanceKind::LyingProne,
        _ => StanceKind::Standing,
    }
}

fn noun_phrase(store: &EntityStore, entity: EntityId) -> String {
    store.try_component::<Noun>(entity).map(|n| n.phrase()).unwrap_or_else(|| "someone".into())
}

struct Look;

impl Command for Look {
    fn text(&self) -> &str {
        "look"
    }
    fn trigger(&self, _ctx: &mut CommandContext, _source: EntityId, _rest: &str) -> Out {
        Err("Look at what?".into())
    }
}

struct Move {
    text: &'static str,
    dir: Compass,
}

impl Command for Move {
    fn text(&self) -> &str {
        self.text
    }
    fn trigger(&self, ctx: &mut CommandContext, source: EntityId, _rest: &str) -> Out {
        if let Some(stance) = ctx.store.try_component::<Stance>(source) {
            if stance.cur != StanceKind::Standing {
                return Err("You must stand first.".into());
            }
        }
        ctx.bus.pulse(MoveCompass { source, dir: self.dir });
        OK
    }
}

struct Say;

impl Command for Say {
    fn text(&self) -> &str {
        "say"
    }
    fn trigger(&self, ctx: &mut CommandContext, source: EntityId, rest: &str) -> Out {
        let (_, message) = rest.split_once(' ').unwrap_or((rest, ""));
        if message.is_empty() {
            return Err("You open your mouth, as if to speak.".into());
        }
        let speaker = noun_phrase(ctx.store, source);
        ctx.bus.pulse(Outbound {
            to: source,
            source,
            text: format!("You say, \"{message}\""),
        });
        ctx.bus.pulse(Emit {
            source,
            reach: ReachKind::Adjacent,
            text: format!("{speaker} says, \"{message}\""),
            target: None,
            target_text: None,
        });
        OK
    }
}

struct Attack;

impl Command for Attack {
    fn text(&self) -> &str {
        "attack"
    }
    fn trigger(&self, ctx: &mut CommandContext, source: EntityId, rest: &str) -> Out {
        let (_, prefix) = rest.split_once(' ').unwrap_or((rest, ""));
        if prefix.is_empty() {
            return Err("Attack whom?".into());
        }
        let target = reach::find(ctx.store, source, prefix, adjacent).next().map(|(eid, ..)| eid);
        let Some(target) = target else {
            return Err("Attack whom?".into());
        };

        if let Some(health) = ctx.store.try_component::<Health>(target) {
            if health.condition != Condition::Normal {
                return Err(format!("They're {}!", condition_text(health.condition)));
            }
        }

        let attacker = noun_phrase(ctx.store, source);
        ctx.bus.pulse(Emit {
            source,
            reach: ReachKind::Adjacent,
            text: format!("{attacker} draws back their fist..."),
            target: None,
            target_text: None,
        });
        ctx.bus.pulse(Act {
            source,
            target,
            delay_secs: MELEE_DELAY_SECS,
            then: ActEffect::Melee(Melee { source, target, verb: "slash".into() }),
            id: 0,
        });
        OK
    }
}

struct SetStance {
    text: &'static str,
    target: StanceKind,
    self_msg: &'static str,
    other_verb: &'static str,
    already: &'static str,
}

impl Command for SetStance {
    fn text(&self) -> &str {
        self.text
    }
    fn trigger(&self, ctx: &mut CommandContext, source: EntityId, _rest: &str) -> Out {
        let current = ctx.store.try_component::<Stance>(source).map(|s| s.cur).unwrap_or_default();
        if current == self.target {
            return Err(self.already.into());
        }
        let mover = noun_phrase(ctx.store, source);
        ctx.bus.pulse(Outbound {
            to: source,
            source,
            text: self.self_msg.into(),
        });
        ctx.bus.pulse(Emit {
            source,
            reach: ReachKind::Adjacent,
            text: format!("{mover} {}", self.other_verb),
            target: None,
            target_text: None,
        });
        ctx.bus.pulse(StanceChanged { source, to_ordinal: stance_ordinal(self.target) });
        OK
    }
}

/// Apply a `StanceChanged` signal's mutation: write the new `Stance.cur`,
/// leaving any prop reference untouched.
pub fn process_stance_changed(store: &mut EntityStore, signals: &[StanceChanged]) {
    for sig in signals {
        let mut stance = store.try_component::<Stance>(sig.source).copied().unwrap_or_default();
        stance.cur = stance_from_ordinal(sig.to_ordinal);
        store.add_component(sig.source, stance);
    }
}

/// The canonical built-in command table, in dispatch-priority order:
/// compass directions and their shortcuts first (shorter, more common),
/// then the remaining verbs.
pub fn default_commands() -> Vec<Box<dyn Command>> {
    let compass = [
        ("north", Compass::N),
        ("northeast", Compass::Ne),
        ("east", Compass::E),
        ("southeast", Compass::Se),
        ("south", Compass::S),
        ("southwest", Compass::Sw),
        ("west", Compass::W),
        ("northwest", Compass::Nw),
    ];
    let shortcuts = [("ne", Compass::Ne), ("se", Compass::Se), ("sw", Compass::Sw), ("nw", Compass::Nw)];

    let mut commands: Vec<Box<dyn Command>> = Vec::new();
    for (text, dir) in compass {
        commands.push(Box::new(Move { text, dir }));
    }
    for (text, dir) in shortcuts {
        commands.push(Box::new(Move { text, dir }));
    }
    commands.push(Box::new(Look));
    commands.push(Box::new(Say));
    commands.push(Box::new(Attack));
    commands.push(Box::new(SetStance {
        text: "stand",
        target: StanceKind::Standing,
        self_msg: "You stand up.",
        other_verb: "stands up.",
        already: "You're already standing.",
    }));
    commands.push(Box::new(SetStance {
        text: "sit",
        target: StanceKind::Sitting,
        self_msg: "You sit down.",
        other_verb: "sits down.",
        already: "You're already sitting.",
    }));
    commands.push(Box::new(SetStance {
        text: "lie",
        target: StanceKind::LyingProne,
        self_msg: "You lie down.",
        other_verb: "lies down.",
        already: "You're already lying prone.",
    }));
    commands.push(Box::new(SetStance {
        text: "kneel",
        target: StanceKind::Kneeling,
        self_msg: "You kneel.",
        other_verb: "kneels.",
        already: "You're already kneeling.",
    }));
    commands
}
