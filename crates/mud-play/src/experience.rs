//! Skill experience: the `Learn` award curve, rank spillover, and the
//! rest-bonus mechanic (§4.8).

use mud_core::rng::EntityRng;
use mud_core::signals::{Learn, Outbound, OutboundSkill};
use mud_core::SignalBus;
use mud_world::components::Skills;
use mud_world::entity::EntityStore;

pub struct AwardCurve {
    pub lo: f64,
    pub hi: f64,
    pub mn: f64,
    pub mx: f64,
    pub sigma: f64,
}

impl Default for AwardCurve {
    fn default() -> Self {
        Self {
            lo: 0.0,
            hi: 0.025,
            mn: 0.33,
            mx: 1.88,
            sigma: 0.4,
        }
    }
}

fn ease_in_out_expo(t: f64) -> f64 {
    if t <= 0.0 {
        0.0
    } else if t >= 1.0 {
        1.0
    } else if t < 0.5 {
        2f64.powf(20.0 * t - 10.0) / 2.0
    } else {
        (2.0 - 2f64.powf(-20.0 * t + 10.0)) / 2.0
    }
}

/// Fraction of TNL to award: zero outside `[mn, mx]`, peaking at `hi` when
/// `mult == 1.0`, log-normal jittered.
pub fn get_award(mult: f64, curve: &AwardCurve, rng: &mut EntityRng) -> f64 {
    if mult <= 0.0 || mult < curve.mn || mult > curve.mx {
        return curve.lo;
    }
    let a = mult.log2();
    let denom = curve.mn.log2().abs().max(curve.mx.log2().abs()).max(f64::EPSILON);
    let t = (a.abs() / denom).min(1.0);
    let w = 1.0 - ease_in_out_expo(t);
    (curve.lo + (curve.hi - curve.lo) * w) * rng.log_normal(0.0, curve.sigma)
}

/// Resolve a `Learn` signal: reject stale generations, fold the award into
/// `tnl`, spill over into ranks, and notify the entity of both the rank-up
/// and the refreshed skill readout.
pub fn process_learn(store: &mut EntityStore, bus: &mut SignalBus, rng: &mut EntityRng, signals: &[Learn]) {
    for sig in signals {
        if !store.entity_exists(sig.source) {
            continue;
        }
        let Some(skills) = store.try_component_mut::<Skills>(sig.source) else { continue };
        if skills.generation != sig.generation {
            continue;
        }
        let Some(skill) = skills.by_name.get_mut(&sig.skill) else { continue };

        let risk = sig.risk.clamp(0.0, 1.0);
        skill.tnl += get_award(sig.mult * risk, &AwardCurve::default(), rng);

        let mut ranks_gained = 0u32;
        while skill.tnl >= 1.0 {
            ranks_gained += 1;
            skill.tnl -= 1.0;
            skill.tnl *= 0.68;
        }
        if ranks_gained > 0 {
            skill.rank += ranks_gained;
            bus.pulse(Outbound {
                to: sig.source,
                source: sig.source,
                text: format!(
                    "You gain {ranks_gained} rank{} in {}.",
                    if ranks_gained == 1 { "" } else { "s" },
                    skill.name
                ),
            });
        }

        bus.pulse(OutboundSkill {
            to: sig.source,
            name: skill.name.clone(),
            rank: skill.rank,
            tnl: skill.tnl,
            pending: skill.pending,
        });
    }
}

/// Growth factor applied to `rest_bonus` per idle check, capped so rest
/// never multiplies learning beyond a 10x bonus.
const REST_BONUS_GROWTH: f64 = 1.8;
const REST_BONUS_CAP: f64 = 10.0;

/// Idle-time rest tick: every tracked skill's `rest_bonus` ramps up
/// multiplicatively, capped at [`REST_BONUS_CAP`].
pub fn grow_rest_bonus(skills: &mut Skills) {
    for skill in skills.by_name.values_mut() {
        skill.rest_bonus = (skill.rest_bonus * REST_BONUS_GROWTH).min(REST_BONUS_CAP);
    }
}

/// `AbsorbRestExp`: fold each skill's accrued `pending` experience into
/// `tnl`, scaled by its current rest bonus, then reset the bonus.
pub fn absorb_rest_exp(skills: &mut Skills) {
    for skill in skills.by_name.values_mut() {
        if skill.pending <= 0.0 {
            continue;
        }
        skill.tnl += skill.pending * skill.rest_bonus;
        skill.pending = 0.0;
        skill.rest_bonus = 1.0;
    }
}
