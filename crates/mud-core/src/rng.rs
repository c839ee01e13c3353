//! Deterministic per-entity and simulation-level RNG wrappers.
//!
//! # Determinism strategy
//!
//! Each entity that needs private randomness (contest jitter, experience
//! log-normal award noise) derives its RNG from:
//!
//!   seed = global_seed XOR (entity_id * MIXING_CONSTANT)
//!
//! The mixing constant is the 64-bit fractional part of the golden ratio,
//! which spreads consecutive entity ids uniformly across the seed space.
//! Entities never share RNG state, and creating/destroying unrelated
//! entities never disturbs another entity's seed.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::EntityId;

const MIXING_CONSTANT: u64 = 0x9e37_79b9_7f4a_7c15;

/// Per-entity deterministic RNG, derived on demand from the simulation seed.
pub struct EntityRng(SmallRng);

impl EntityRng {
    pub fn new(global_seed: u64, entity: EntityId) -> Self {
        let seed = global_seed ^ entity.0.wrapping_mul(MIXING_CONSTANT);
        EntityRng(SmallRng::seed_from_u64(seed))
    }

    #[inline]
    pub fn inner(&mut self) -> &mut SmallRng {
        &mut self.0
    }

    #[inline]
    pub fn gen_range<T, R>(&mut self, range: R) -> T
    where
        T: rand::distributions::uniform::SampleUniform,
        R: rand::distributions::uniform::SampleRange<T>,
    {
        self.0.gen_range(range)
    }

    #[inline]
    pub fn gen_bool(&mut self, p: f64) -> bool {
        self.0.gen_bool(p.clamp(0.0, 1.0))
    }

    /// Sample a log-normal variate with the given `mu`/`sigma` (used by the
    /// experience award curve, §4.8).
    #[inline]
    pub fn log_normal(&mut self, mu: f64, sigma: f64) -> f64 {
        let z: f64 = rand_distr_standard_normal(&mut self.0);
        (mu + sigma * z).exp()
    }
}

/// Simulation-level RNG for global, non-per-entity randomness (world
/// bootstrap placement, cue tiebreak jitter, etc.).
pub struct SimRng(SmallRng);

impl SimRng {
    pub fn new(seed: u64) -> Self {
        SimRng(SmallRng::seed_from_u64(seed))
    }

    /// Derive a child `EntityRng` deterministically from this generator's
    /// seed and an entity id.
    pub fn entity_rng(&self, global_seed: u64, entity: EntityId) -> EntityRng {
        EntityRng::new(global_seed, entity)
    }

    #[inline]
    pub fn inner(&mut self) -> &mut SmallRng {
        &mut self.0
    }

    #[inline]
    pub fn gen_range<T, R>(&mut self, range: R) -> T
    where
        T: rand::distributions::uniform::SampleUniform,
        R: rand::distributions::uniform::SampleRange<T>,
    {
        self.0.gen_range(range)
    }
}

/// Box-Muller standard normal sample, avoiding a dependency on `rand_distr`
/// for a single distribution.
fn rand_distr_standard_normal(rng: &mut SmallRng) -> f64 {
    let u1: f64 = rng.gen_range(f64::EPSILON..1.0);
    let u2: f64 = rng.gen_range(0.0..1.0);
    (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()
}
