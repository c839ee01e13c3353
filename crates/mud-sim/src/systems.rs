//! The systems with no home in any other crate: act-effect dispatch, death
//! transitions, the cook/rot/anchor-growth/gas/regen/rest/phase ticks
//! (§4.3, §4.8, §4.9, §4.10, §4.13).
//!
//! Several of these are deliberately thinner than the system they are
//! grounded on — `cook`/`rot` here only touch the components that already
//! exist in `mud_world::items` (`Food`, `Rotting`, `Cookware`,
//! `ProvidesHeat`, `Ingredient`); a fuller `Ate`/`Hostility`/biome-table
//! rendition would need new component surface this crate doesn't carry.

use rustc_hash::FxHashMap;

use mud_core::signals::{
    ActEffect, AnchorDestroyed, Cook, ConditionChanged, Die, Echo, Emit, GrowAnchor, HealthChanged,
    Outbound, OutboundCondition, OutboundHealth, PhaseChanged, ReachKind, RestCheck, Roast, Rot,
};
use mud_core::{EntityId, SignalBus};
use mud_world::components::{Anchor, Condition, Connection, Health, Skills, Transform};
use mud_world::entity::EntityStore;
use mud_world::items::{Cookware, Food, Ingredient, ProvidesHeat, Rotting};
use mud_world::terrain::Chips;

use mud_play::experience::{absorb_rest_exp, grow_rest_bonus};
use mud_play::reach::{adjacent, chebyshev, visible, world};

fn reach_matches(reach: ReachKind, origin: Transform, other: Transform) -> bool {
    match reach {
        ReachKind::Adjacent => adjacent(origin, other),
        ReachKind::Visible { .. } => visible(origin, other),
        ReachKind::World => world(origin, other),
        ReachKind::Chebyshev { r_y, r_x } => chebyshev(r_y, r_x)(origin, other),
    }
}

/// Turn combat/narration `Emit` signals into `Outbound` lines for every
/// connected entity within reach, substituting the target's own phrasing
/// when one was supplied.
pub fn process_emit(store: &EntityStore, bus: &mut SignalBus, signals: &[Emit]) {
    for sig in signals {
        let Some(&origin) = store.try_component::<Transform>(sig.source) else { continue };
        for (viewer, _) in store.query::<Connection>() {
            let Some(&viewer_loc) = store.try_component::<Transform>(viewer) else { continue };
            if viewer_loc.map_id != origin.map_id {
                continue;
            }
            let text = if Some(viewer) == sig.target {
                sig.target_text.clone().unwrap_or_else(|| sig.text.clone())
            } else if viewer == sig.source {
                continue;
            } else if reach_matches(sig.reach, origin, viewer_loc) {
                sig.text.clone()
            } else {
                continue;
            };
            bus.pulse(Outbound { to: viewer, source: sig.source, text });
        }
    }
}

/// Turn an ambient world `Echo` (no single source entity — e.g. terrain
/// events) into `Outbound` lines for connected entities within reach of
/// its origin tile.
pub fn process_echo(store: &EntityStore, bus: &mut SignalBus, signals: &[Echo]) {
    for sig in signals {
        let origin = Transform { map_id: sig.map_id, y: sig.origin_y, x: sig.origin_x };
        for (viewer, _) in store.query::<Connection>() {
            let Some(&viewer_loc) = store.try_component::<Transform>(viewer) else { continue };
            if viewer_loc.map_id != sig.map_id || !reach_matches(sig.reach, origin, viewer_loc) {
                continue;
            }
            bus.pulse(Outbound { to: viewer, source: viewer, text: sig.text.clone() });
        }
    }
}

/// Re-pulse the concrete signal carried by a fired `Act`'s `ActEffect`
/// payload — the act queue itself stays signal-agnostic (§4.4).
pub fn dispatch_act_effects(bus: &mut SignalBus) {
    let effects: Vec<ActEffect> = bus.iter::<ActEffect>().collect();
    for effect in effects {
        match effect {
            ActEffect::Melee(m) => bus.pulse(m),
            ActEffect::StanceChanged(s) => bus.pulse(s),
        }
    }
}

fn condition_ordinal(condition: Condition) -> u8 {
    match condition {
        Condition::Normal => 0,
        Condition::Unconscious => 1,
        Condition::InShock => 2,
        Condition::Dead => 3,
    }
}

/// Scan for entities whose health has dropped to zero and aren't already
/// marked dead; transition them and notify.
pub fn process_death(store: &mut EntityStore, bus: &mut SignalBus) {
    let dying: Vec<EntityId> = store
        .query::<Health>()
        .filter(|&(_, h)| h.cur <= 0.0 && h.condition != Condition::Dead)
        .map(|(e, _)| e)
        .collect();

    for entity in dying {
        if let Some(health) = store.try_component_mut::<Health>(entity) {
            health.condition = Condition::Dead;
        }
        bus.pulse(Die { entity });
        bus.pulse(ConditionChanged { source: entity, to_ordinal: condition_ordinal(Condition::Dead) });
    }
}

fn for_each_viewer(store: &EntityStore, subject: EntityId, mut f: impl FnMut(EntityId)) {
    let Some(&loc) = store.try_component::<Transform>(subject) else { return };
    for (viewer, _) in store.query::<Connection>() {
        let Some(&viewer_loc) = store.try_component::<Transform>(viewer) else { continue };
        if viewer == subject || visible(viewer_loc, loc) {
            f(viewer);
        }
    }
}

/// Broadcast `OutboundHealth`/`OutboundCondition` to every viewer in reach
/// whenever `HealthChanged`/`ConditionChanged` fires this tick.
pub fn broadcast_health_and_condition(store: &EntityStore, bus: &mut SignalBus) {
    let health_changes: Vec<HealthChanged> = bus.iter::<HealthChanged>().collect();
    for sig in health_changes {
        let Some(&health) = store.try_component::<Health>(sig.source) else { continue };
        let pct = health.pct() as f32;
        let stress_pct = if health.max > 0.0 { (health.stress / health.max).clamp(0.0, 1.0) as f32 } else { 0.0 };
        let viewers: Vec<EntityId> = {
            let mut v = Vec::new();
            for_each_viewer(store, sig.source, |to| v.push(to));
            v
        };
        for to in viewers {
            bus.pulse(OutboundHealth { to, source: sig.source, pct, stress_pct });
        }
    }

    let condition_changes: Vec<ConditionChanged> = bus.iter::<ConditionChanged>().collect();
    for sig in condition_changes {
        let text = match sig.to_ordinal {
            1 => "unconscious",
            2 => "in shock",
            3 => "dead",
            _ => "fine",
        };
        let viewers: Vec<EntityId> = {
            let mut v = Vec::new();
            for_each_viewer(store, sig.source, |to| v.push(to));
            v
        };
        for to in viewers {
            bus.pulse(OutboundCondition { to, source: sig.source, text: text.to_string() });
        }
    }
}

/// `AbsorbRestExp`/`RestCheck` wiring: the experience curve's rest-bonus
/// mechanic already lives in `mud_play::experience`; this just drives it
/// from the signals those systems react to.
pub fn process_rest(store: &mut EntityStore, bus: &mut SignalBus) {
    let absorbs: Vec<mud_core::signals::AbsorbRestExp> = bus.iter::<mud_core::signals::AbsorbRestExp>().collect();
    for sig in absorbs {
        if let Some(skills) = store.try_component_mut::<Skills>(sig.source) {
            absorb_rest_exp(skills);
        }
    }

    if bus.is_empty::<RestCheck>() {
        return;
    }
    for _ in bus.iter::<RestCheck>() {
        let ids: Vec<EntityId> = store.query::<Skills>().map(|(e, _)| e).collect();
        for e in ids {
            if let Some(skills) = store.try_component_mut::<Skills>(e) {
                grow_rest_bonus(skills);
            }
        }
    }
}

fn holder_of(store: &EntityStore, entity: EntityId) -> Option<EntityId> {
    store.try_component::<mud_world::components::ContainedBy>(entity).map(|c| c.0)
}

/// One unit of a rotting stack decays per `Rot` signal; the stack's entity
/// is removed once its count reaches zero.
pub fn process_rot(store: &mut EntityStore, bus: &SignalBus) {
    for sig in bus.iter::<Rot>() {
        if !store.has_component::<Rotting>(sig.entity) {
            continue;
        }
        let Some(food) = store.try_component_mut::<Food>(sig.entity) else { continue };
        if food.count == 0 {
            continue;
        }
        food.count -= 1;
        if food.count == 0 {
            store.delete_entity(sig.entity);
        }
    }
}

/// Cooking over a `Cookware`-tagged container turns an `Ingredient` into
/// `Food`; no heat-source table exists yet, so presence of `Cookware` is
/// the only gate.
pub fn process_cook(store: &mut EntityStore, bus: &mut SignalBus, signals: &[Cook]) {
    for sig in signals {
        if !store.has_component::<Cookware>(sig.cookware) {
            continue;
        }
        if !store.has_component::<Ingredient>(sig.entity) {
            continue;
        }
        store.remove_component::<Ingredient>(sig.entity);
        store.add_component(sig.entity, Food { count: 1 });
        store.add_component(sig.entity, Rotting);
        if let Some(holder) = holder_of(store, sig.entity) {
            bus.pulse(Outbound { to: holder, source: holder, text: "Your meal is cooked.".into() });
        }
    }
}

/// Roasting is `Cook` without a container: any nearby `ProvidesHeat`
/// entity on the same tile suffices.
pub fn process_roast(store: &mut EntityStore, bus: &mut SignalBus, signals: &[Roast]) {
    for sig in signals {
        let Some(&loc) = store.try_component::<Transform>(sig.entity) else { continue };
        let near_heat = store.query::<ProvidesHeat>().any(|(e, _)| {
            store.try_component::<Transform>(e).is_some_and(|t| *t == loc)
        });
        if !near_heat || !store.has_component::<Ingredient>(sig.entity) {
            continue;
        }
        store.remove_component::<Ingredient>(sig.entity);
        store.add_component(sig.entity, Food { count: 1 });
        store.add_component(sig.entity, Rotting);
        if let Some(holder) = holder_of(store, sig.entity) {
            bus.pulse(Outbound { to: holder, source: holder, text: "Your roast is done.".into() });
        }
    }
}

/// Fuel consumed per second by a fueled (non-eternal) anchor: 100 fuel
/// lasts roughly 16 minutes at this rate.
const ANCHOR_FUEL_CONSUMPTION_RATE: f64 = 0.1;

/// `GrowAnchor` rank spillover, plus ambient fuel consumption for every
/// fueled anchor this tick.
pub fn process_anchor_growth(store: &mut EntityStore, bus: &mut SignalBus, dt_secs: f64, signals: &[GrowAnchor]) {
    for sig in signals {
        let Some(anchor) = store.try_component_mut::<Anchor>(sig.anchor) else { continue };
        anchor.tnl += 1.0;
        while anchor.tnl >= 1.0 {
            anchor.rank += 1;
            anchor.tnl -= 1.0;
            anchor.threshold += 2;
        }
    }

    let ids: Vec<EntityId> = store.query::<Anchor>().map(|(e, _)| e).collect();
    for entity in ids {
        let Some(anchor) = store.try_component_mut::<Anchor>(entity) else { continue };
        let Some(fuel) = anchor.fuel else { continue };
        let remaining = (fuel - ANCHOR_FUEL_CONSUMPTION_RATE * dt_secs).max(0.0);
        anchor.fuel = Some(remaining);
        if remaining <= 0.0 {
            bus.pulse(AnchorDestroyed { anchor: entity });
        }
    }
}

/// Actually remove anchors the terrain crate's pass-through collected —
/// `mud_world::terrain::process_anchor_destroyed` only gathers the ids.
pub fn process_anchor_destroyed_cleanup(store: &mut EntityStore, bus: &SignalBus) {
    for anchor in mud_world::terrain::process_anchor_destroyed(bus) {
        store.delete_entity(anchor);
    }
}

const GAS_STEP_INTERVAL_SECS: f64 = 0.5;
const GAS_LOSS_RATE: f32 = 0.02;
const GAS_EPSILON: f32 = 0.01;

/// Step every gas cloud at a throttled rate and broadcast its cells to
/// connected entities who can see them.
pub fn process_gas(
    store: &mut EntityStore,
    chips_by_map: &FxHashMap<EntityId, Chips>,
    bus: &mut SignalBus,
    now_secs: f64,
    next_call: &mut f64,
) {
    if now_secs < *next_call {
        return;
    }
    *next_call = now_secs + GAS_STEP_INTERVAL_SECS;

    let gas_ids: Vec<EntityId> = store.query::<mud_world::terrain::Gas>().map(|(e, _)| e).collect();
    for gas_id in gas_ids {
        let Some(map_id) = store.try_component::<mud_world::terrain::Gas>(gas_id).map(|g| g.map_id) else { continue };
        let Some(chips) = chips_by_map.get(&map_id) else { continue };
        let chips = chips.clone();
        if let Some(gas) = store.try_component_mut::<mud_world::terrain::Gas>(gas_id) {
            gas.step(&chips, GAS_LOSS_RATE, GAS_EPSILON);
        }
        let Some(gas) = store.try_component::<mud_world::terrain::Gas>(gas_id) else { continue };
        if gas.is_empty() {
            store.delete_entity(gas_id);
            continue;
        }
        let cells: Vec<((i32, i32), f32)> = gas.iter().collect();
        for ((y, x), v) in cells {
            let cell = Transform { map_id, y, x };
            for (viewer, _) in store.query::<Connection>() {
                let Some(&viewer_loc) = store.try_component::<Transform>(viewer) else { continue };
                if viewer_loc.map_id != map_id || !visible(viewer_loc, cell) {
                    continue;
                }
                bus.pulse(mud_core::signals::OutboundGas { to: viewer, gas_id, map_id, x, y, v });
            }
        }
    }
}

/// Watermarked regen tick (§4.3): entities lying prone in normal condition
/// heal over time, standing back up once fully recovered.
pub struct RegenState {
    pub next_call: f64,
}

impl Default for RegenState {
    fn default() -> Self {
        Self { next_call: 0.0 }
    }
}

const REGEN_HEALTH_PER_TICK: f64 = 6.0;
const REGEN_STRESS_PER_TICK: f64 = 3.0;
/// Ordinal matching `mud_play::commands::stance_from_ordinal`'s `Sitting` arm.
const SITTING_ORDINAL: u8 = 2;

pub fn process_regen(store: &mut EntityStore, bus: &mut SignalBus, now_secs: f64, state: &mut RegenState, tick_rate_secs: f64) {
    while now_secs >= state.next_call {
        let candidates: Vec<EntityId> = store
            .query::<Health>()
            .filter(|&(_, h)| h.condition == Condition::Normal)
            .filter_map(|(e, _)| {
                let stance = store.try_component::<mud_world::components::Stance>(e)?;
                (stance.cur == mud_world::components::StanceKind::LyingProne).then_some(e)
            })
            .collect();

        for entity in candidates {
            if let Some(health) = store.try_component_mut::<Health>(entity) {
                health.cur = (health.cur + REGEN_HEALTH_PER_TICK).min(health.max);
                health.stress = (health.stress - REGEN_STRESS_PER_TICK).max(0.0);
            }
            bus.pulse(HealthChanged { source: entity });

            if let Some(health) = store.try_component::<Health>(entity) {
                if health.cur >= health.max && health.stress <= health.aggravated_stress {
                    bus.pulse(mud_core::signals::StanceChanged { source: entity, to_ordinal: SITTING_ORDINAL });
                }
            }
        }

        state.next_call += tick_rate_secs;
    }
}

fn phase_message(brightness: u8) -> &'static str {
    match brightness {
        0 => "The nightstorm rages.",
        1..=2 => "Darkness deepens.",
        3..=5 => "Twilight settles.",
        _ => "Daylight returns.",
    }
}

/// Broadcast a `PhaseChanged` signal and a narrative line whenever the
/// computed brightness band changes from the last tick's.
pub fn process_phase_change(store: &EntityStore, bus: &mut SignalBus, last: &mut Option<u8>, brightness: u8) {
    if *last == Some(brightness) {
        return;
    }
    if last.is_some() {
        bus.pulse(PhaseChanged { new_phase: brightness });
        let viewers: Vec<EntityId> = store.query::<Connection>().map(|(e, _)| e).collect();
        for to in viewers {
            bus.pulse(Outbound { to, source: to, text: phase_message(brightness).to_string() });
        }
    }
    *last = Some(brightness);
}
