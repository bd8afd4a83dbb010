//! Per-reel spin sequencer.
//!
//! Idle -> DelayedStart -> FastSpin -> Decelerating(n) -> Settling -> Idle.
//! Each transition is driven by a timer popped from the shared
//! [`TimerQueue`]; the reel schedules its own follow-up timers under
//! `TimerOwner::Reel(index)`.

use std::fmt;

use goldspin_shared::ReelView;
use tracing::{debug, trace};

use crate::error::{ConfigError, ReelError};
use crate::rng::SymbolRng;
use crate::scheduler::{TimerOwner, TimerQueue};
use crate::symbols::{Strip, Symbol};
use crate::timing::{Millis, PhaseTable, TimingConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReelPhase {
    Idle,
    DelayedStart,
    FastSpin,
    /// Deceleration step, 1-based.
    Decelerating(u8),
    Settling,
}

impl fmt::Display for ReelPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReelPhase::Idle => f.write_str("idle"),
            ReelPhase::DelayedStart => f.write_str("delayed-start"),
            ReelPhase::FastSpin => f.write_str("fast-spin"),
            ReelPhase::Decelerating(n) => write!(f, "decelerating-{n}"),
            ReelPhase::Settling => f.write_str("settling"),
        }
    }
}

/// Timers a reel schedules for itself. `generation` ties a timer to the spin
/// that scheduled it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReelTimer {
    Begin { generation: u64 },
    Sample { generation: u64 },
}

impl ReelTimer {
    pub fn generation(self) -> u64 {
        match self {
            ReelTimer::Begin { generation } | ReelTimer::Sample { generation } => generation,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReelSequencer {
    index: usize,
    playable: Vec<Symbol>,
    visible: [Symbol; 3],
    phase: ReelPhase,
    interval: Millis,
    generation: u64,
    began_at: Millis,
    table: PhaseTable,
    samples: u64,
    last_result: Option<Symbol>,
}

impl ReelSequencer {
    /// A reel showing a random playable triple.
    pub fn new<R: SymbolRng + ?Sized>(
        index: usize,
        strip: &Strip,
        rng: &mut R,
    ) -> Result<Self, ConfigError> {
        let playable = strip.playable();
        if playable.is_empty() {
            return Err(ConfigError::NoPlayableSymbols { reel: index });
        }
        let mut reel = Self {
            index,
            visible: [playable[0]; 3],
            playable,
            phase: ReelPhase::Idle,
            interval: 0,
            generation: 0,
            began_at: 0,
            table: PhaseTable(Vec::new()),
            samples: 0,
            last_result: None,
        };
        reel.visible = [reel.sample(rng), reel.sample(rng), reel.sample(rng)];
        Ok(reel)
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn owner(&self) -> TimerOwner {
        TimerOwner::Reel(self.index)
    }

    pub fn phase(&self) -> ReelPhase {
        self.phase
    }

    pub fn is_spinning(&self) -> bool {
        self.phase != ReelPhase::Idle
    }

    /// Top, centre and bottom symbols currently shown.
    pub fn visible(&self) -> [Symbol; 3] {
        self.visible
    }

    pub fn interval(&self) -> Millis {
        self.interval
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn samples(&self) -> u64 {
        self.samples
    }

    pub fn last_result(&self) -> Option<Symbol> {
        self.last_result
    }

    pub fn playable(&self) -> &[Symbol] {
        &self.playable
    }

    fn sample<R: SymbolRng + ?Sized>(&self, rng: &mut R) -> Symbol {
        self.playable[rng.pick(self.playable.len())]
    }

    /// Arms the delayed start. Refused while timers of an earlier spin are
    /// still pending for this reel.
    pub fn start<T: From<ReelTimer>>(
        &mut self,
        now: Millis,
        timing: &TimingConfig,
        queue: &mut TimerQueue<T>,
    ) -> Result<(), ReelError> {
        let pending = queue.pending_for(self.owner());
        if pending > 0 {
            return Err(ReelError::Busy {
                reel: self.index,
                pending,
            });
        }
        self.generation += 1;
        self.phase = ReelPhase::DelayedStart;
        self.table = timing.phase_table(self.index);
        self.samples = 0;
        let due = now.saturating_add(timing.start_delay(self.index));
        queue.schedule(
            due,
            self.owner(),
            ReelTimer::Begin {
                generation: self.generation,
            }
            .into(),
        );
        debug!(reel = self.index, generation = self.generation, due, "reel armed");
        Ok(())
    }

    /// Handles one of this reel's timers. Returns the resolved symbol when
    /// the reel settles, which happens once per spin.
    pub fn on_timer<R, T>(
        &mut self,
        now: Millis,
        timer: ReelTimer,
        rng: &mut R,
        queue: &mut TimerQueue<T>,
    ) -> Option<Symbol>
    where
        R: SymbolRng + ?Sized,
        T: From<ReelTimer>,
    {
        if timer.generation() != self.generation {
            debug!(
                reel = self.index,
                stale = timer.generation(),
                current = self.generation,
                "ignoring timer from an earlier spin"
            );
            return None;
        }
        match (timer, self.phase) {
            (ReelTimer::Begin { .. }, ReelPhase::DelayedStart) => {
                self.began_at = now;
                self.visible = [self.sample(rng), self.sample(rng), self.sample(rng)];
                self.advance(now, rng, queue)
            }
            (ReelTimer::Sample { .. }, ReelPhase::FastSpin | ReelPhase::Decelerating(_)) => {
                self.advance(now, rng, queue)
            }
            (timer, phase) => {
                debug!(reel = self.index, ?timer, %phase, "timer does not apply to phase");
                None
            }
        }
    }

    // One step of the phase table: settle if it has run out, otherwise
    // shift in a sample and schedule the next one.
    fn advance<R, T>(&mut self, now: Millis, rng: &mut R, queue: &mut TimerQueue<T>) -> Option<Symbol>
    where
        R: SymbolRng + ?Sized,
        T: From<ReelTimer>,
    {
        let elapsed = now.saturating_sub(self.began_at);
        let Some((idx, phase)) = self.table.phase_at(elapsed) else {
            return Some(self.settle(rng));
        };
        if self.phase != ReelPhase::DelayedStart {
            let next = self.sample(rng);
            self.visible = [self.visible[1], self.visible[2], next];
            self.samples += 1;
        }
        self.phase = if idx == 0 {
            ReelPhase::FastSpin
        } else {
            ReelPhase::Decelerating(idx.min(u8::MAX as usize) as u8)
        };
        self.interval = phase.interval_ms;
        let end = self.began_at.saturating_add(self.table.total_ms());
        let due = now.saturating_add(phase.interval_ms).min(end);
        queue.schedule(
            due,
            self.owner(),
            ReelTimer::Sample {
                generation: self.generation,
            }
            .into(),
        );
        trace!(reel = self.index, phase = %self.phase, due, "sample");
        None
    }

    fn settle<R: SymbolRng + ?Sized>(&mut self, rng: &mut R) -> Symbol {
        self.phase = ReelPhase::Settling;
        let len = self.playable.len();
        let at = rng.pick(len);
        let result = self.playable[at];
        let prev = self.playable[(at + len - 1) % len];
        let next = self.playable[(at + 1) % len];
        self.visible = [prev, result, next];
        self.phase = ReelPhase::Idle;
        self.interval = 0;
        self.last_result = Some(result);
        debug!(reel = self.index, %result, samples = self.samples, "reel settled");
        result
    }

    /// Cancels this reel's pending timers and leaves it idle with its
    /// current window. Returns the number of timers dropped.
    pub fn stop<T>(&mut self, queue: &mut TimerQueue<T>) -> usize {
        let dropped = queue.cancel_owner(self.owner());
        if dropped > 0 || self.is_spinning() {
            // anything still in flight for the old generation is now stale
            self.generation += 1;
            debug!(reel = self.index, dropped, "reel stopped");
        }
        self.phase = ReelPhase::Idle;
        self.interval = 0;
        dropped
    }

    pub fn view(&self) -> ReelView {
        ReelView {
            index: self.index,
            visible: self.visible.map(|s| s.as_str().to_string()),
            phase: self.phase.to_string(),
            spinning: self.is_spinning(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::{ScriptedRng, SeededStream};
    use crate::symbols::ReelsConfig;

    fn drive(reel: &mut ReelSequencer, rng: &mut impl SymbolRng, q: &mut TimerQueue<ReelTimer>) -> Option<(Millis, Symbol)> {
        while let Some(due) = q.next_due() {
            let timer = q.pop_due(due)?;
            if let Some(sym) = reel.on_timer(due, timer.payload, rng, q) {
                return Some((due, sym));
            }
        }
        None
    }

    #[test]
    fn settles_after_delay_plus_phase_table() {
        let strip = &ReelsConfig::classic().strips[1];
        let mut rng = SeededStream::new("reel");
        let mut q: TimerQueue<ReelTimer> = TimerQueue::new();
        let timing = TimingConfig::classic();
        let mut reel = ReelSequencer::new(1, strip, &mut rng).unwrap();
        reel.start(0, &timing, &mut q).unwrap();
        assert_eq!(reel.phase(), ReelPhase::DelayedStart);
        assert_eq!(q.next_due(), Some(250));
        let (at, sym) = drive(&mut reel, &mut rng, &mut q).unwrap();
        assert_eq!(at, 250 + 2300);
        assert!(!sym.is_placeholder());
        assert_eq!(reel.phase(), ReelPhase::Idle);
        assert!(q.is_empty());
        assert!(reel.samples() > 20);
    }

    #[test]
    fn settled_window_is_circular_neighbours() {
        let strip = &ReelsConfig::classic().strips[0];
        let playable = strip.playable();
        let last = playable.len() - 1;
        let mut rng = ScriptedRng::always(last, playable.len());
        let mut q: TimerQueue<ReelTimer> = TimerQueue::new();
        let mut reel = ReelSequencer::new(0, strip, &mut rng).unwrap();
        reel.start(0, &TimingConfig::classic(), &mut q).unwrap();
        let (_, sym) = drive(&mut reel, &mut rng, &mut q).unwrap();
        assert_eq!(sym, playable[last]);
        assert_eq!(reel.visible(), [playable[last - 1], playable[last], playable[0]]);
    }

    #[test]
    fn intervals_grow_through_phases() {
        let strip = &ReelsConfig::classic().strips[0];
        let mut rng = SeededStream::new("phases");
        let mut q: TimerQueue<ReelTimer> = TimerQueue::new();
        let mut reel = ReelSequencer::new(0, strip, &mut rng).unwrap();
        reel.start(0, &TimingConfig::classic(), &mut q).unwrap();
        let mut seen = Vec::new();
        while let Some(due) = q.next_due() {
            let timer = q.pop_due(due).unwrap();
            if reel.on_timer(due, timer.payload, &mut rng, &mut q).is_some() {
                break;
            }
            if seen.last() != Some(&reel.interval()) {
                seen.push(reel.interval());
            }
        }
        assert_eq!(seen, vec![30, 50, 80, 120]);
    }

    #[test]
    fn restart_refused_while_pending() {
        let strip = &ReelsConfig::classic().strips[0];
        let mut rng = SeededStream::new("busy");
        let mut q: TimerQueue<ReelTimer> = TimerQueue::new();
        let timing = TimingConfig::classic();
        let mut reel = ReelSequencer::new(0, strip, &mut rng).unwrap();
        reel.start(0, &timing, &mut q).unwrap();
        assert_eq!(
            reel.start(10, &timing, &mut q),
            Err(ReelError::Busy { reel: 0, pending: 1 })
        );
    }

    #[test]
    fn stop_freezes_window() {
        let strip = &ReelsConfig::classic().strips[2];
        let mut rng = SeededStream::new("stop");
        let mut q: TimerQueue<ReelTimer> = TimerQueue::new();
        let mut reel = ReelSequencer::new(2, strip, &mut rng).unwrap();
        reel.start(0, &TimingConfig::classic(), &mut q).unwrap();
        // run into the fast phase
        for _ in 0..5 {
            let due = q.next_due().unwrap();
            let timer = q.pop_due(due).unwrap();
            reel.on_timer(due, timer.payload, &mut rng, &mut q);
        }
        let frozen = reel.visible();
        assert_eq!(reel.stop(&mut q), 1);
        assert!(q.is_empty());
        assert_eq!(reel.phase(), ReelPhase::Idle);
        // a timer from the stopped spin is ignored even if delivered by hand
        let stale = ReelTimer::Sample {
            generation: reel.generation() - 1,
        };
        assert_eq!(reel.on_timer(10_000, stale, &mut rng, &mut q), None);
        assert_eq!(reel.visible(), frozen);
        assert!(q.is_empty());
    }
}
