//! Reel timing: start stagger and the deceleration phase table.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Virtual time in milliseconds since the machine was created.
pub type Millis = u64;

/// Upper bound for any single timing value in a config (one hour).
pub const MAX_TIMING_MS: Millis = 60 * 60 * 1000;

/// One step of the spin: sample every `interval_ms` for `duration_ms`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Phase {
    pub duration_ms: Millis,
    pub interval_ms: Millis,
}

impl Phase {
    pub const fn new(duration_ms: Millis, interval_ms: Millis) -> Self {
        Self {
            duration_ms,
            interval_ms,
        }
    }
}

/// Ordered phases of a single reel's spin. Phase 0 is the fast spin, the
/// rest are deceleration steps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseTable(pub Vec<Phase>);

impl PhaseTable {
    pub fn total_ms(&self) -> Millis {
        self.0
            .iter()
            .fold(0, |acc: Millis, p| acc.saturating_add(p.duration_ms))
    }

    /// Phase index and phase covering `elapsed`, or `None` once the table has run out.
    pub fn phase_at(&self, elapsed: Millis) -> Option<(usize, Phase)> {
        let mut end: Millis = 0;
        for (idx, phase) in self.0.iter().enumerate() {
            end = end.saturating_add(phase.duration_ms);
            if elapsed < end {
                return Some((idx, *phase));
            }
        }
        None
    }

    pub fn interval_at(&self, elapsed: Millis) -> Option<Millis> {
        self.phase_at(elapsed).map(|(_, p)| p.interval_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Hold before reel 0 starts (ms)
    pub base_delay_ms: Millis,
    /// Extra hold per reel index so reels start left to right (ms)
    pub per_reel_stagger_ms: Millis,
    /// Spin length of reel 0, begin to settle (ms)
    pub spin_duration_ms: Millis,
    /// Additional spin length per reel index (ms)
    pub per_reel_extra_ms: Millis,
    /// Pause after the last reel settles before the payout is evaluated (ms)
    pub settle_grace_ms: Millis,
    /// Sampling interval of the fast phase (ms)
    pub fast_interval_ms: Millis,
    /// Deceleration steps after the fast phase
    pub deceleration: Vec<Phase>,
}

impl TimingConfig {
    pub fn classic() -> Self {
        Self {
            base_delay_ms: 0,
            per_reel_stagger_ms: 250,
            spin_duration_ms: 1800,
            per_reel_extra_ms: 500,
            settle_grace_ms: 500,
            fast_interval_ms: 30,
            deceleration: vec![Phase::new(600, 50), Phase::new(500, 80), Phase::new(400, 120)],
        }
    }

    pub fn turbo() -> Self {
        Self::classic().scaled(0.5)
    }

    /// Scale every duration and interval by `factor` (< 1.0 = faster).
    /// Intervals never drop below 1ms.
    pub fn scaled(&self, factor: f64) -> Self {
        let ms = |v: Millis| (v as f64 * factor).round() as Millis;
        Self {
            base_delay_ms: ms(self.base_delay_ms),
            per_reel_stagger_ms: ms(self.per_reel_stagger_ms),
            spin_duration_ms: ms(self.spin_duration_ms),
            per_reel_extra_ms: ms(self.per_reel_extra_ms),
            settle_grace_ms: ms(self.settle_grace_ms),
            fast_interval_ms: ms(self.fast_interval_ms).max(1),
            deceleration: self
                .deceleration
                .iter()
                .map(|p| Phase::new(ms(p.duration_ms), ms(p.interval_ms).max(1)))
                .collect(),
        }
    }

    pub fn start_delay(&self, reel: usize) -> Millis {
        self.base_delay_ms
            .saturating_add((reel as Millis).saturating_mul(self.per_reel_stagger_ms))
    }

    pub fn spin_duration(&self, reel: usize) -> Millis {
        self.spin_duration_ms
            .saturating_add((reel as Millis).saturating_mul(self.per_reel_extra_ms))
    }

    /// The fast phase fills whatever the deceleration steps leave of the
    /// reel's spin duration.
    pub fn phase_table(&self, reel: usize) -> PhaseTable {
        let decel = self
            .deceleration
            .iter()
            .fold(0, |acc: Millis, p| acc.saturating_add(p.duration_ms));
        let fast = self.spin_duration(reel).saturating_sub(decel);
        let mut phases = Vec::with_capacity(self.deceleration.len() + 1);
        phases.push(Phase::new(fast, self.fast_interval_ms));
        phases.extend(self.deceleration.iter().copied());
        PhaseTable(phases)
    }

    /// Time from spin start until the last of `reels` reels settles.
    pub fn total_spin_duration(&self, reels: usize) -> Millis {
        (0..reels)
            .map(|r| self.start_delay(r).saturating_add(self.phase_table(r).total_ms()))
            .max()
            .unwrap_or(0)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fast_interval_ms == 0 || self.deceleration.iter().any(|p| p.interval_ms == 0) {
            return Err(ConfigError::ZeroInterval);
        }
        let fields = [
            ("base_delay_ms", self.base_delay_ms),
            ("per_reel_stagger_ms", self.per_reel_stagger_ms),
            ("spin_duration_ms", self.spin_duration_ms),
            ("per_reel_extra_ms", self.per_reel_extra_ms),
            ("settle_grace_ms", self.settle_grace_ms),
            ("fast_interval_ms", self.fast_interval_ms),
        ];
        let phases = self
            .deceleration
            .iter()
            .flat_map(|p| [("deceleration", p.duration_ms), ("deceleration", p.interval_ms)]);
        for (field, value) in fields.into_iter().chain(phases) {
            if value > MAX_TIMING_MS {
                return Err(ConfigError::TimingOutOfRange {
                    field,
                    value,
                    max: MAX_TIMING_MS,
                });
            }
        }
        Ok(())
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self::classic()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reels_start_left_to_right() {
        let t = TimingConfig::classic();
        assert_eq!(t.start_delay(0), 0);
        assert_eq!(t.start_delay(1), 250);
        assert_eq!(t.start_delay(2), 500);
    }

    #[test]
    fn classic_phase_table() {
        let t = TimingConfig::classic();
        let table = t.phase_table(0);
        assert_eq!(
            table.0,
            vec![
                Phase::new(300, 30),
                Phase::new(600, 50),
                Phase::new(500, 80),
                Phase::new(400, 120)
            ]
        );
        assert_eq!(table.total_ms(), 1800);
        assert_eq!(t.phase_table(2).total_ms(), 2800);
    }

    #[test]
    fn interval_slows_by_phase() {
        let table = TimingConfig::classic().phase_table(0);
        assert_eq!(table.interval_at(0), Some(30));
        assert_eq!(table.interval_at(299), Some(30));
        assert_eq!(table.interval_at(300), Some(50));
        assert_eq!(table.interval_at(1399), Some(80));
        assert_eq!(table.interval_at(1400), Some(120));
        assert_eq!(table.interval_at(1799), Some(120));
        assert_eq!(table.interval_at(1800), None);
    }

    #[test]
    fn short_spin_drops_fast_phase() {
        let mut t = TimingConfig::classic();
        t.spin_duration_ms = 1000;
        let table = t.phase_table(0);
        assert_eq!(table.0[0].duration_ms, 0);
        assert_eq!(table.phase_at(0), Some((1, Phase::new(600, 50))));
    }

    #[test]
    fn turbo_halves_and_keeps_intervals_positive() {
        let t = TimingConfig::turbo();
        assert_eq!(t.per_reel_stagger_ms, 125);
        assert_eq!(t.fast_interval_ms, 15);
        let tiny = TimingConfig::classic().scaled(0.001);
        assert!(tiny.validate().is_ok());
        assert_eq!(TimingConfig::classic().total_spin_duration(3), 500 + 2800);
    }

    #[test]
    fn oversized_values_are_rejected() {
        let mut t = TimingConfig::classic();
        t.per_reel_stagger_ms = u64::MAX / 2 + 1;
        assert!(matches!(
            t.validate(),
            Err(ConfigError::TimingOutOfRange {
                field: "per_reel_stagger_ms",
                ..
            })
        ));
        let mut t = TimingConfig::classic();
        t.deceleration.push(Phase::new(MAX_TIMING_MS + 1, 200));
        assert!(t.validate().is_err());
    }

    #[test]
    fn huge_values_saturate_instead_of_overflowing() {
        let mut t = TimingConfig::classic();
        t.per_reel_stagger_ms = u64::MAX / 2 + 1;
        t.per_reel_extra_ms = u64::MAX;
        assert_eq!(t.start_delay(2), Millis::MAX);
        assert_eq!(t.spin_duration(1), Millis::MAX);
        assert_eq!(t.total_spin_duration(3), Millis::MAX);
    }
}
