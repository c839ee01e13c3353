//! Contests, melee resolution, and skill experience awards (§4.8).

use rand::Rng;

use mud_core::signals::{ActEffect, Emit, Learn, Melee, Outbound, ReachKind};
use mud_core::{EntityId, SignalBus};
use mud_world::components::{Condition, ContainedBy, Health, Noun, Skills, Slot};
use mud_world::entity::EntityStore;
use mud_world::items::{Armor, Weapon};

/// Delay before a triggered `Act::Melee` resolves. Standing placeholder
/// pending a real weapon-speed table.
pub const MELEE_DELAY_SECS: f64 = 1.5;

pub struct ContestParams {
    pub jitter_pct: f64,
    pub dilute: f64,
    pub flat_ranks_per_tier: f64,
    pub pct_ranks_per_tier: f64,
    pub pct_ranks_per_tier_amplify: f64,
    pub min_mult: f64,
    pub max_mult: f64,
}

impl Default for ContestParams {
    fn default() -> Self {
        Self {
            jitter_pct: 0.05,
            dilute: 20.0,
            flat_ranks_per_tier: 25.0,
            pct_ranks_per_tier: 0.185,
            pct_ranks_per_tier_amplify: 7.0,
            min_mult: 0.10,
            max_mult: 10.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ContestResult {
    pub mult: f64,
    pub attack_roll: f64,
    pub defend_roll: f64,
}

/// Contest two ranks, returning a multiplicative factor and the (diluted)
/// attack/defend rolls, jittered by `rng`.
pub fn contest(attack_rank: f64, defend_rank: f64, rng: &mut impl Rng, params: &ContestParams) -> ContestResult {
    let mut jitter = || 1.0 + rng.gen_range(-params.jitter_pct..=params.jitter_pct);
    let roll = |ranks: f64, jitter: f64| {
        let raw = ranks * jitter + params.dilute + 0.5;
        (raw.trunc() as i64).max(0) as f64
    };

    let attack_jitter = jitter();
    let defend_jitter = jitter();
    let attack = roll(attack_rank, attack_jitter);
    let defend = roll(defend_rank, defend_jitter);

    let ranks_per_tier = params
        .flat_ranks_per_tier
        .max(params.pct_ranks_per_tier * attack.min(defend) + params.pct_ranks_per_tier_amplify);
    let tier_delta = (attack - defend) / ranks_per_tier;

    let mut mult = 1.0 + tier_delta.abs();
    if tier_delta < 0.0 {
        mult = 1.0 / mult;
    }
    let mult = mult.clamp(params.min_mult, params.max_mult);

    ContestResult {
        mult,
        attack_roll: attack - params.dilute,
        defend_roll: defend - params.dilute,
    }
}

/// `max(cur/max, 0.005)` — a nearly-dead attacker still swings, just
/// weakly.
pub fn pain_mult(health: &Health) -> f64 {
    (health.cur / health.max).max(0.005)
}

fn equipped_weapon(store: &EntityStore, holder: EntityId) -> Option<(EntityId, Weapon)> {
    store
        .query::<Weapon>()
        .find(|&(item, _)| {
            matches!(store.try_component::<ContainedBy>(item), Some(&ContainedBy(c)) if c == holder)
                && matches!(
                    store.try_component::<Slot>(item),
                    Some(Slot::LeftHand) | Some(Slot::RightHand)
                )
        })
        .map(|(item, weapon)| (item, *weapon))
}

fn equipped_armor(store: &EntityStore, holder: EntityId) -> Option<Armor> {
    store
        .query::<Armor>()
        .find(|&(item, _)| {
            matches!(store.try_component::<ContainedBy>(item), Some(&ContainedBy(c)) if c == holder)
                && matches!(store.try_component::<Slot>(item), Some(Slot::Armor))
        })
        .map(|(_, armor)| *armor)
}

fn clamp01(x: f64) -> f64 {
    x.clamp(0.0, 1.0)
}

/// Linear remap of `x` from `[in_lo, in_hi]` onto `[out_lo, out_hi]`.
fn remap(x: f64, in_lo: f64, in_hi: f64, out_lo: f64, out_hi: f64) -> f64 {
    let t = (x - in_lo) / (in_hi - in_lo);
    out_lo + t * (out_hi - out_lo)
}

/// Fraction of damage that passes through a worn [`Armor`] (§4.8 Armor): a
/// double contest — the item's own rank, and the wearer's rank in the
/// armor's `required_skill` — each remapped onto a block fraction and
/// combined, capped by the piece's `physical_immunity`.
pub fn mitigate(defend_ranks: f64, attack_ranks: f64, armor: &Armor, rng: &mut impl Rng, params: &ContestParams) -> f64 {
    let item_mult = contest(armor.item_rank, attack_ranks, rng, params).mult;
    let defend_mult = contest(defend_ranks, attack_ranks, rng, params).mult;

    let item_block = clamp01(remap(item_mult, 1.0, params.min_mult, 0.0, 1.0));
    let user_block = clamp01(remap(defend_mult, 1.0, params.min_mult, 0.0, 1.0));
    let effective_immunity = armor.physical_immunity * (1.0 - (1.0 - item_block) * (1.0 - user_block));

    1.0 - effective_immunity
}

/// Resolve a `Melee` signal: contest the attacker's weapon skill against
/// the defender's evasion, apply damage, echo to both sides and nearby
/// onlookers, and award experience to every participating skill.
pub fn process_melee(
    store: &mut EntityStore,
    bus: &mut SignalBus,
    rng: &mut impl Rng,
    melees: &[Melee],
) {
    for sig in melees {
        let Some(&defend_health) = store.try_component::<Health>(sig.target) else { continue };
        if defend_health.condition != Condition::Normal {
            continue;
        }

        let weapon = equipped_weapon(store, sig.source);
        let (base_damage, skill_key) = match &weapon {
            Some((_, w)) => (w.damage, w.skill_key.to_string()),
            None => (10.0, "martial_arts".to_string()),
        };

        let attack_rank = store
            .try_component::<Skills>(sig.source)
            .map(|s| s.get(&skill_key))
            .unwrap_or(0.0);
        let defend_rank = store
            .try_component::<Skills>(sig.target)
            .map(|s| s.get("evasion"))
            .unwrap_or(0.0);

        let Some(&attack_health) = store.try_component::<Health>(sig.source) else { continue };
        let params = ContestParams::default();
        let result = contest(attack_rank, defend_rank, rng, &params);
        let mut damage = result.mult * pain_mult(&attack_health) * base_damage;

        if let Some(armor) = equipped_armor(store, sig.target) {
            let armor_defend_rank = store
                .try_component::<Skills>(sig.target)
                .map(|s| s.get(armor.required_skill))
                .unwrap_or(0.0);
            damage *= mitigate(armor_defend_rank, attack_rank, &armor, rng, &params);
        }

        if let Some(health) = store.try_component_mut::<Health>(sig.target) {
            health.cur = (health.cur - damage).clamp(0.0, health.max);
        }

        let attacker_name = store
            .try_component::<Noun>(sig.source)
            .map(|n| n.phrase())
            .unwrap_or_else(|| "something".into());
        let target_name = store
            .try_component::<Noun>(sig.target)
            .map(|n| n.phrase())
            .unwrap_or_else(|| "something".into());

        bus.pulse(Outbound {
            to: sig.source,
            source: sig.source,
            text: format!("You hit {target_name} for {damage:.1} damage!"),
        });
        bus.pulse(Emit {
            source: sig.source,
            reach: ReachKind::Adjacent,
            text: format!("{attacker_name} hits {target_name} for {damage:.1} damage!"),
            target: Some(sig.target),
            target_text: Some(format!("{attacker_name} hits you for {damage:.1} damage!")),
        });

        let attacker_generation = store.try_component::<Skills>(sig.source).map(|s| s.generation).unwrap_or(0);
        let defender_generation = store.try_component::<Skills>(sig.target).map(|s| s.generation).unwrap_or(0);

        bus.pulse(Learn {
            source: sig.source,
            skill: skill_key,
            mult: result.mult,
            risk: 1.0,
            generation: attacker_generation,
        });
        bus.pulse(Learn {
            source: sig.target,
            skill: "evasion".into(),
            mult: result.mult,
            risk: 1.0,
            generation: defender_generation,
        });
    }
}

/// Build the delayed `Act` payload a `Melee` command schedules, rather
/// than pulsing `Melee` immediately (§4.4, §4.8).
pub fn melee_act_effect(source: EntityId, target: EntityId, verb: impl Into<String>) -> ActEffect {
    ActEffect::Melee(Melee { source, target, verb: verb.into() })
}
