//! Real-time tick clock: fixed-step scheduling with jitter accounting and
//! frame-budget bookkeeping.
//!
//! # Design
//!
//! Unlike a simulated-time clock that maps an integer tick to an arbitrary
//! wall-clock stride, this clock *is* wall-clock: the target step is 1 ms
//! (`TPS = 1000`) and the loop must track how far behind its deadline it has
//! fallen so it can recover gracefully instead of death-spiraling.
//!
//! `jitter = now - deadline` after each pass is folded into an exponential
//! moving average with a 30 s half-life:
//!
//!   α = 1 - 2^(-1 / ticks_per_half_life)
//!   ema ← (1-α)·ema + α·jitter
//!
//! If accumulated lag exceeds `MAX_LAG_RESET` the deadline snaps to `now`
//! rather than trying to catch up tick-by-tick — the one ordering guarantee
//! this breaks (catching up acts/cues instantly) is explicitly not a goal;
//! they drain naturally as their heaps are processed.

use std::time::{Duration, Instant};

/// Target ticks per second.
pub const TPS: u64 = 1000;

/// Nominal step duration (1 ms).
pub const STEP: Duration = Duration::from_millis(1);

/// Deadline reset threshold: beyond this much lag, stop trying to catch up.
pub const MAX_LAG_RESET: Duration = Duration::from_millis(250);

/// EMA half-life for jitter smoothing.
const JITTER_HALF_LIFE_SECS: f64 = 30.0;

/// Monotonically increasing tick counter.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Tick(pub u64);

impl Tick {
    pub const ZERO: Tick = Tick(0);

    #[inline]
    pub fn next(self) -> Tick {
        Tick(self.0 + 1)
    }
}

impl std::fmt::Display for Tick {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "t{}", self.0)
    }
}

/// Static configuration for the tick loop.
#[derive(Clone, Debug)]
pub struct TickConfig {
    /// Step duration. Defaults to 1 ms (`TPS = 1000`); configurable for
    /// tests that want a coarser, more inspectable step.
    pub step: Duration,
    /// Lag beyond which the deadline is reset instead of chased.
    pub max_lag_reset: Duration,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            step: STEP,
            max_lag_reset: MAX_LAG_RESET,
        }
    }
}

/// Drives the fixed-step loop: tracks the current tick, the next deadline,
/// and a jitter EMA for observability.
pub struct TickClock {
    config: TickConfig,
    tick: Tick,
    deadline: Instant,
    jitter_ema: Duration,
    ema_alpha: f64,
    /// True for the one pass following a death-spiral reset.
    pub reset_last_tick: bool,
}

impl TickClock {
    pub fn new(config: TickConfig) -> Self {
        let ticks_per_half_life = JITTER_HALF_LIFE_SECS / config.step.as_secs_f64();
        let ema_alpha = 1.0 - 2f64.powf(-1.0 / ticks_per_half_life);
        Self {
            deadline: Instant::now() + config.step,
            config,
            tick: Tick::ZERO,
            jitter_ema: Duration::ZERO,
            ema_alpha,
            reset_last_tick: false,
        }
    }

    #[inline]
    pub fn tick(&self) -> Tick {
        self.tick
    }

    #[inline]
    pub fn jitter_ema(&self) -> Duration {
        self.jitter_ema
    }

    /// Sleep (then spin-yield) until the current deadline, fold the
    /// overshoot into the jitter EMA, advance the tick counter, and set the
    /// next deadline. Returns the observed jitter for this pass.
    pub fn wait_for_deadline(&mut self) -> Duration {
        let now = Instant::now();
        if now < self.deadline {
            std::thread::sleep(self.deadline - now);
            while Instant::now() < self.deadline {
                std::hint::spin_loop();
            }
        }

        let now = Instant::now();
        let jitter = now.saturating_duration_since(self.deadline);
        self.fold_jitter(jitter);

        self.tick = self.tick.next();
        self.reset_last_tick = jitter > self.config.max_lag_reset;
        self.deadline = if self.reset_last_tick {
            now + self.config.step
        } else {
            self.deadline + self.config.step
        };

        jitter
    }

    fn fold_jitter(&mut self, jitter: Duration) {
        let ema_secs = self.jitter_ema.as_secs_f64();
        let jitter_secs = jitter.as_secs_f64();
        let next = (1.0 - self.ema_alpha) * ema_secs + self.ema_alpha * jitter_secs;
        self.jitter_ema = Duration::from_secs_f64(next.max(0.0));
    }
}
