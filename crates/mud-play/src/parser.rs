//! Command dispatch (§4.11): rewrite a leading apostrophe into `say`, then
//! try each command in table order, first whose canonical text starts
//! with the typed token wins.

use mud_core::signals::{Outbound, Parse};
use mud_core::EntityId;

use crate::commands::{condition_text, Command, CommandContext};

fn rewrite_apostrophe(text: &str) -> String {
    match text.strip_prefix('\'') {
        Some(rest) => format!("say {rest}"),
        None => text.to_string(),
    }
}

fn dispatch(ctx: &mut CommandContext, commands: &[Box<dyn Command>], source: EntityId, text: &str) {
    let text = rewrite_apostrophe(text);
    if text.is_empty() {
        return;
    }
    let first = text.split_whitespace().next().unwrap_or("");

    for cmd in commands {
        if !cmd.text().starts_with(first) {
            continue;
        }
        if cmd.requires_healthy() {
            if let Some(health) = ctx.store.try_component::<mud_world::components::Health>(source) {
                if health.condition != mud_world::components::Condition::Normal {
                    let text = format!("You're {}!", condition_text(health.condition));
                    ctx.bus.pulse(Outbound { to: source, source, text });
                    return;
                }
            }
        }
        if cmd.requires_not_busy() && ctx.acts.is_busy(source) {
            ctx.bus.pulse(Outbound { to: source, source, text: "You're busy.".into() });
            return;
        }
        if let Err(err) = cmd.trigger(ctx, source, &text) {
            ctx.bus.pulse(Outbound { to: source, source, text: err });
        }
        return;
    }

    ctx.bus.pulse(Outbound { to: source, source, text: "Huh?".into() });
}

/// Dispatch every `Parse` signal pulsed this tick against the command
/// table.
pub fn process(ctx: &mut CommandContext, commands: &[Box<dyn Command>], signals: &[Parse]) {
    for sig in signals {
        dispatch(ctx, commands, sig.source, &sig.text);
    }
}
