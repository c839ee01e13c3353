//! The night clock: an injective mapping from real wall-clock time to game
//! time (§4.5). Every constant and curve here is load-bearing — clients and
//! cue schedules both depend on the exact banding edges.

use std::time::{SystemTime, UNIX_EPOCH};

pub const HOURS_PER_NIGHT: u32 = 20;
pub const SECONDS_PER_NIGHT: f64 = 1080.0;
pub const SECONDS_PER_NIGHTSTORM: f64 = 25.0;
const SECONDS_PER_NIGHTSTORM_HOUR: f64 = SECONDS_PER_NIGHTSTORM / (24.0 - HOURS_PER_NIGHT as f64);
const SECONDS_PER_NIGHT_ACTIVE: f64 = SECONDS_PER_NIGHT - SECONDS_PER_NIGHTSTORM;
const SECONDS_PER_NIGHT_HOUR: f64 = SECONDS_PER_NIGHT_ACTIVE / HOURS_PER_NIGHT as f64;

pub const BASE_NIGHTYEAR: i64 = 200;
const SECONDS_PER_DAY: f64 = 86400.0;
const NIGHTS_PER_DAY: i64 = (SECONDS_PER_DAY / SECONDS_PER_NIGHT) as i64;

/// A clock-face time within one night cycle (`hour` in `0..24`).
#[derive(Clone, Copy, PartialEq, PartialOrd, Debug)]
pub struct NightTime {
    pub hour: u32,
    pub minute: u32,
}

impl NightTime {
    pub fn new(hour: u32, minute: u32) -> Self {
        assert!(hour < 24 && minute < 60);
        Self { hour, minute }
    }

    /// Inverse of [`NightTime::total_seconds`]: decode a cycle-relative
    /// offset back into a clock face, normalizing `t` into
    /// `[0, SECONDS_PER_NIGHT)` first.
    pub fn from_seconds(t: f64) -> Self {
        let t = t.rem_euclid(SECONDS_PER_NIGHT);
        let (base_hour, hour_start, hour_len) = if t < SECONDS_PER_NIGHT_ACTIVE {
            let offset_hour = (t / SECONDS_PER_NIGHT_HOUR).trunc();
            let base_hour = if offset_hour < 18.0 { offset_hour + 6.0 } else { offset_hour - 18.0 };
            (base_hour, offset_hour * SECONDS_PER_NIGHT_HOUR, SECONDS_PER_NIGHT_HOUR)
        } else {
            let offset = t - SECONDS_PER_NIGHT_ACTIVE;
            let offset_hour = (offset / SECONDS_PER_NIGHTSTORM_HOUR).trunc();
            (2.0 + offset_hour, SECONDS_PER_NIGHT_ACTIVE + offset_hour * SECONDS_PER_NIGHTSTORM_HOUR, SECONDS_PER_NIGHTSTORM_HOUR)
        };
        let minute = ((t - hour_start) / hour_len * 60.0).trunc().clamp(0.0, 59.0);
        Self { hour: base_hour as u32, minute: minute as u32 }
    }

    /// Seconds into the 1080s cycle this clock-face time represents.
    pub fn total_seconds(&self) -> f64 {
        let hour = if (6..24).contains(&self.hour) {
            Some((self.hour - 6) as f64)
        } else if self.hour < 2 {
            Some((self.hour + 18) as f64)
        } else {
            None
        };

        match hour {
            Some(hour) => hour * SECONDS_PER_NIGHT_HOUR + self.minute as f64 * SECONDS_PER_NIGHT_HOUR / 60.0,
            None => {
                let offset = (self.hour as f64 - 2.0) * SECONDS_PER_NIGHTSTORM_HOUR
                    + self.minute as f64 * SECONDS_PER_NIGHTSTORM_HOUR / 60.0;
                SECONDS_PER_NIGHT_ACTIVE + offset
            }
        }
    }
}

impl Default for NightTime {
    fn default() -> Self {
        Self { hour: 0, minute: 0 }
    }
}

/// A signed offset in game-time seconds, constructed from mixed units.
#[derive(Clone, Copy, PartialEq, PartialOrd, Debug, Default)]
pub struct NightDelta {
    seconds: f64,
}

impl NightDelta {
    pub fn zero() -> Self {
        Self { seconds: 0.0 }
    }

    pub fn nights(n: f64) -> Self {
        Self { seconds: n * SECONDS_PER_NIGHT }
    }

    pub fn hours(h: f64) -> Self {
        Self { seconds: h * SECONDS_PER_NIGHT_HOUR }
    }

    pub fn minutes(m: f64) -> Self {
        Self { seconds: m * SECONDS_PER_NIGHT_HOUR / 60.0 }
    }

    pub fn seconds(s: f64) -> Self {
        Self { seconds: s }
    }

    pub fn total_seconds(&self) -> f64 {
        self.seconds
    }
}

impl std::ops::Add for NightDelta {
    type Output = NightDelta;
    fn add(self, rhs: NightDelta) -> NightDelta {
        NightDelta { seconds: self.seconds + rhs.seconds }
    }
}

/// Real wall-clock seconds since the Unix epoch, wrapped so the clock's
/// arithmetic never depends on a particular timezone representation.
#[derive(Clone, Copy, PartialEq, PartialOrd, Debug)]
pub struct NightClock {
    epoch_secs: f64,
}

impl NightClock {
    pub fn from_epoch_secs(epoch_secs: f64) -> Self {
        Self { epoch_secs }
    }

    pub fn now() -> Self {
        let dur = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
        Self::from_epoch_secs(dur.as_secs_f64())
    }

    pub fn to_now(&mut self) {
        *self = Self::now();
    }

    pub fn epoch_secs(&self) -> f64 {
        self.epoch_secs
    }

    /// Seconds elapsed into the current 1080s night cycle.
    pub fn seconds(&self) -> f64 {
        self.epoch_secs.rem_euclid(SECONDS_PER_NIGHT)
    }

    pub fn in_nightstorm(&self) -> bool {
        self.seconds() >= SECONDS_PER_NIGHT_ACTIVE
    }

    pub fn nightstorm_eta(&self) -> f64 {
        (SECONDS_PER_NIGHT - SECONDS_PER_NIGHTSTORM) - self.seconds()
    }

    pub fn elapsed_pct(&self) -> f64 {
        (self.seconds() / SECONDS_PER_NIGHT_ACTIVE).min(1.0)
    }

    pub fn hours_float(&self) -> f64 {
        let s = self.seconds();
        if s < SECONDS_PER_NIGHT_ACTIVE {
            (s / SECONDS_PER_NIGHT_HOUR + 6.0).rem_euclid(24.0)
        } else {
            2.0 + (s - SECONDS_PER_NIGHT_ACTIVE) / SECONDS_PER_NIGHTSTORM_HOUR
        }
    }

    pub fn hour(&self) -> u32 {
        let s = self.seconds();
        if s < SECONDS_PER_NIGHT_ACTIVE {
            let idx = (s / SECONDS_PER_NIGHT_HOUR) as u32;
            (6 + idx) % 24
        } else {
            let storm_elapsed = s - SECONDS_PER_NIGHT_ACTIVE;
            2 + (storm_elapsed / SECONDS_PER_NIGHTSTORM_HOUR) as u32
        }
    }

    /// Fraction of a real calendar month elapsed, used to derive seasonal
    /// `dawn`/`dusk` drift; `month_len_secs` must be the caller's real month
    /// length and `elapsed_in_month_secs` the wall-clock offset into it.
    fn nightyear_elapsed_pct(month_len_secs: f64, elapsed_in_month_secs: f64) -> f64 {
        if month_len_secs <= 0.0 {
            0.0
        } else {
            (elapsed_in_month_secs / month_len_secs).clamp(0.0, 1.0)
        }
    }

    /// Seasonal sunrise, in 24h hours, given how far through the real month
    /// this instant falls.
    pub fn dawn(&self, month_len_secs: f64, elapsed_in_month_secs: f64) -> f64 {
        let (sunrise, _) = Self::season_curve(month_len_secs, elapsed_in_month_secs);
        sunrise
    }

    pub fn dusk(&self, month_len_secs: f64, elapsed_in_month_secs: f64) -> f64 {
        let (_, sunset) = Self::season_curve(month_len_secs, elapsed_in_month_secs);
        sunset
    }

    fn season_curve(month_len_secs: f64, elapsed_in_month_secs: f64) -> (f64, f64) {
        let pct = Self::nightyear_elapsed_pct(month_len_secs, elapsed_in_month_secs);
        let angle = 2.0 * std::f64::consts::PI * pct;

        let avg_daylen = 13.25;
        let amp_daylen = 2.75;
        let avg_center = 13.125;
        let amp_center = 0.875;

        let daylen = avg_daylen - amp_daylen * angle.cos();
        let center = avg_center - amp_center * angle.cos();

        let sunrise = (center - daylen / 2.0).clamp(0.0, 24.0);
        let sunset = (center + daylen / 2.0).clamp(0.0, 24.0);
        (sunrise, sunset)
    }

    /// 0–7 brightness band. `0` exclusively means nightstorm; otherwise an
    /// asymmetric day/night falloff curve (steeper descent into nightstorm
    /// than the climb out of it) quantized into bands `1..=7`.
    pub fn brightness_index(&self, month_len_secs: f64, elapsed_in_month_secs: f64) -> u8 {
        if self.in_nightstorm() {
            return 0;
        }

        let h = self.hours_float();
        let (sunrise, sunset) = Self::season_curve(month_len_secs, elapsed_in_month_secs);

        let brightness_norm = if sunrise <= h && h <= sunset {
            let t = ((h - sunrise) / (sunset - sunrise)).clamp(0.0, 1.0);
            0.5 + 0.5 * (std::f64::consts::PI * t).sin()
        } else {
            let d = if h < sunrise { (24.0 - sunset) + h } else { h - sunset };
            let d_max = 6.0;
            let falloff = (1.0 - d / d_max).max(0.0);
            0.5 * falloff
        };

        let band = 1 + (6.0 * brightness_norm).round() as i32;
        band.clamp(1, 7) as u8
    }

    /// Nightyear index: one real calendar month is one in-game nightyear,
    /// anchored so December 2025 (`months_since_epoch == 0`) is
    /// `BASE_NIGHTYEAR`.
    pub fn nightyear(&self, months_since_epoch: i64) -> i64 {
        BASE_NIGHTYEAR + months_since_epoch
    }

    pub fn nights_since_epoch(&self, epoch_secs_anchor: f64) -> i64 {
        let elapsed = (self.epoch_secs - epoch_secs_anchor).max(0.0);
        (elapsed / SECONDS_PER_NIGHT) as i64
    }

    /// Delta to the next occurrence of `time`, wrapping forward if `time`
    /// has already passed this cycle.
    pub fn next(&self, time: NightTime) -> NightDelta {
        let target = time.total_seconds();
        let cur = self.seconds();
        let delta = if target > cur {
            target - cur
        } else {
            (SECONDS_PER_NIGHT - cur) + target
        };
        NightDelta::seconds(delta)
    }

    pub fn replace(&self, time: NightTime) -> NightClock {
        let delta = time.total_seconds() - self.seconds();
        NightClock::from_epoch_secs(self.epoch_secs + delta)
    }
}

impl std::ops::Add<NightDelta> for NightClock {
    type Output = NightClock;
    fn add(self, rhs: NightDelta) -> NightClock {
        NightClock::from_epoch_secs(self.epoch_secs + rhs.total_seconds())
    }
}

impl std::ops::Sub<NightDelta> for NightClock {
    type Output = NightClock;
    fn sub(self, rhs: NightDelta) -> NightClock {
        NightClock::from_epoch_secs(self.epoch_secs - rhs.total_seconds())
    }
}

impl std::ops::Sub<NightClock> for NightClock {
    type Output = NightDelta;
    fn sub(self, rhs: NightClock) -> NightDelta {
        NightDelta::seconds(self.epoch_secs - rhs.epoch_secs)
    }
}

pub fn nights_per_day() -> i64 {
    NIGHTS_PER_DAY
}
