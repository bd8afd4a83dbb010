//! The slot machine: reels, game state and the timer loop that drives both.
//!
//! Time is virtual. A front-end calls [`SlotMachine::advance_to`] with its
//! own clock (or [`SlotMachine::run_until_idle`] to jump straight to the
//! result); every due timer fires in order on the calling thread.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use goldspin_shared::{format_amount, MachineView, SpinRecord};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{ConfigError, GameError};
use crate::notify::Notifier;
use crate::paytable::Paytable;
use crate::reel::{ReelSequencer, ReelTimer};
use crate::rng::SymbolRng;
use crate::scheduler::{TimerOwner, TimerQueue};
use crate::state::{Action, BetLadder, Effect, GameState};
use crate::symbols::{ReelsConfig, Symbol};
use crate::timing::{Millis, TimingConfig};

pub const INSUFFICIENT_BALANCE: &str = "Insufficient balance!";

/// Spin records kept by a machine; older ones are dropped first.
pub const HISTORY_LIMIT: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineParams {
    pub reels: ReelsConfig,
    pub paytable: Paytable,
    pub timing: TimingConfig,
    pub ladder: BetLadder,
    pub starting_balance: u64,
}

impl MachineParams {
    pub fn classic() -> Self {
        Self {
            reels: ReelsConfig::classic(),
            paytable: Paytable::classic(),
            timing: TimingConfig::classic(),
            ladder: BetLadder::classic(),
            starting_balance: 10_000,
        }
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let params: Self = serde_json::from_str(json)?;
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.reels.validate()?;
        self.paytable.validate(self.reels.reel_count())?;
        self.timing.validate()?;
        self.ladder.validate()
    }
}

impl Default for MachineParams {
    fn default() -> Self {
        Self::classic()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MachineTimer {
    Reel(ReelTimer),
    Evaluate { spin_id: u64 },
}

impl From<ReelTimer> for MachineTimer {
    fn from(timer: ReelTimer) -> Self {
        MachineTimer::Reel(timer)
    }
}

/// What happened to a spin request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpinStart {
    Started { spin_id: u64, bet: u64 },
    /// A spin is already running, or the machine was torn down.
    Ignored,
    Rejected(GameError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpinOutcome {
    pub spin_id: u64,
    /// Wall-clock time the spin was evaluated
    pub ts: DateTime<Utc>,
    pub bet: u64,
    pub result: Vec<Symbol>,
    pub key: String,
    pub multiplier: Option<u64>,
    pub win: u64,
    pub balance_after: u64,
}

pub struct SlotMachine<R, N> {
    params: MachineParams,
    state: GameState,
    reels: Vec<ReelSequencer>,
    queue: TimerQueue<MachineTimer>,
    now: Millis,
    rng: R,
    notifier: N,
    history: VecDeque<SpinRecord>,
    last_outcome: Option<SpinOutcome>,
    torn_down: bool,
}

impl<R: SymbolRng, N: Notifier> SlotMachine<R, N> {
    pub fn new(params: MachineParams, mut rng: R, notifier: N) -> Result<Self, ConfigError> {
        params.validate()?;
        let reels = params
            .reels
            .strips
            .iter()
            .enumerate()
            .map(|(i, strip)| ReelSequencer::new(i, strip, &mut rng))
            .collect::<Result<Vec<_>, _>>()?;
        let state = GameState::new(
            params.starting_balance,
            params.ladder.initial_index()?,
            reels.len(),
        );
        info!(
            reels = reels.len(),
            balance = params.starting_balance,
            bet = params.ladder.initial_bet,
            "slot machine ready"
        );
        Ok(Self {
            params,
            state,
            reels,
            queue: TimerQueue::new(),
            now: 0,
            rng,
            notifier,
            history: VecDeque::with_capacity(HISTORY_LIMIT),
            last_outcome: None,
            torn_down: false,
        })
    }

    /// Moves the bet to `bet`, which must be on the ladder. Idle machines only.
    pub fn with_bet(mut self, bet: u64) -> Result<Self, ConfigError> {
        if self.state.spinning {
            return Err(ConfigError::SpinInProgress);
        }
        let index = self
            .params
            .ladder
            .index_of(bet)
            .ok_or(ConfigError::InitialBetNotOnLadder(bet))?;
        self.state.bet_index = index;
        Ok(self)
    }

    pub fn params(&self) -> &MachineParams {
        &self.params
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn reels(&self) -> &[ReelSequencer] {
        &self.reels
    }

    pub fn now(&self) -> Millis {
        self.now
    }

    pub fn balance(&self) -> u64 {
        self.state.balance
    }

    pub fn bet(&self) -> u64 {
        self.state.bet(&self.params.ladder)
    }

    pub fn is_spinning(&self) -> bool {
        self.state.spinning
    }

    /// The last [`HISTORY_LIMIT`] spins, oldest first.
    pub fn history(&self) -> &VecDeque<SpinRecord> {
        &self.history
    }

    pub fn last_outcome(&self) -> Option<&SpinOutcome> {
        self.last_outcome.as_ref()
    }

    pub fn pending_timers(&self) -> usize {
        self.queue.len()
    }

    pub fn rng(&self) -> &R {
        &self.rng
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    // The only place `state` is replaced.
    fn dispatch(&mut self, action: Action) -> Result<Effect, GameError> {
        let transition = self
            .state
            .apply(action, &self.params.ladder, &self.params.paytable)?;
        self.state = transition.state;
        Ok(transition.effect)
    }

    pub fn increase_bet(&mut self) -> u64 {
        self.change_bet(Action::IncreaseBet)
    }

    pub fn decrease_bet(&mut self) -> u64 {
        self.change_bet(Action::DecreaseBet)
    }

    fn change_bet(&mut self, action: Action) -> u64 {
        if self.torn_down {
            return self.bet();
        }
        match self.dispatch(action) {
            Ok(Effect::BetChanged { bet }) => debug!(bet, "bet changed"),
            Ok(_) => debug!(bet = self.bet(), "bet already at limit"),
            Err(err) => debug!(%err, "bet change ignored"),
        }
        self.bet()
    }

    /// Debits the bet and starts every reel. Rejections leave state untouched.
    pub fn spin(&mut self) -> SpinStart {
        if self.torn_down {
            return SpinStart::Ignored;
        }
        let (spin_id, bet) = match self.dispatch(Action::Spin) {
            Ok(Effect::SpinStarted { spin_id, bet }) => (spin_id, bet),
            Ok(effect) => {
                warn!(?effect, "unexpected effect for spin");
                return SpinStart::Ignored;
            }
            Err(GameError::SpinInProgress) => {
                debug!(spin_id = self.state.spin_id, "spin already running");
                return SpinStart::Ignored;
            }
            Err(err) => {
                warn!(%err, balance = self.state.balance, bet = self.bet(), "spin rejected");
                if matches!(err, GameError::InsufficientBalance { .. }) {
                    self.notifier.error(INSUFFICIENT_BALANCE);
                }
                return SpinStart::Rejected(err);
            }
        };
        self.queue.cancel_owner(TimerOwner::Machine);
        for reel in &mut self.reels {
            reel.stop(&mut self.queue);
            if let Err(err) = reel.start(self.now, &self.params.timing, &mut self.queue) {
                warn!(%err, "reel did not start");
            }
        }
        info!(spin_id, bet, balance = self.state.balance, "spin started");
        SpinStart::Started { spin_id, bet }
    }

    pub fn next_deadline(&self) -> Option<Millis> {
        if self.torn_down {
            return None;
        }
        self.queue.next_due()
    }

    /// Fires every timer due at or before `target`, in order, then sets the
    /// clock to `target`. Earlier targets are ignored.
    pub fn advance_to(&mut self, target: Millis) {
        if self.torn_down {
            return;
        }
        while let Some(timer) = self.queue.pop_due(target) {
            self.now = self.now.max(timer.due);
            match (timer.owner, timer.payload) {
                (TimerOwner::Reel(index), MachineTimer::Reel(reel_timer)) => {
                    self.on_reel_timer(index, reel_timer)
                }
                (TimerOwner::Machine, MachineTimer::Evaluate { spin_id }) => self.evaluate(spin_id),
                (owner, payload) => warn!(?owner, ?payload, "timer with mismatched owner dropped"),
            }
        }
        self.now = self.now.max(target);
    }

    pub fn advance_by(&mut self, ms: Millis) {
        self.advance_to(self.now.saturating_add(ms));
    }

    /// Runs the clock forward until no timers remain and returns the outcome
    /// of the spin that finished, if one did.
    pub fn run_until_idle(&mut self) -> Option<SpinOutcome> {
        while let Some(due) = self.next_deadline() {
            self.advance_to(due);
        }
        if self.state.spinning {
            return None;
        }
        self.last_outcome
            .clone()
            .filter(|o| o.spin_id == self.state.spin_id)
    }

    fn on_reel_timer(&mut self, index: usize, timer: ReelTimer) {
        let Some(reel) = self.reels.get_mut(index) else {
            warn!(reel = index, "timer for unknown reel");
            return;
        };
        let Some(symbol) = reel.on_timer(self.now, timer, &mut self.rng, &mut self.queue) else {
            return;
        };
        let spin_id = self.state.spin_id;
        match self.dispatch(Action::ReelSettled {
            reel: index,
            symbol,
            spin_id,
        }) {
            Ok(Effect::AllReelsSettled { spin_id }) => {
                let due = self.now.saturating_add(self.params.timing.settle_grace_ms);
                self.queue
                    .schedule(due, TimerOwner::Machine, MachineTimer::Evaluate { spin_id });
                debug!(spin_id, due, "all reels settled");
            }
            Ok(_) => {}
            Err(err) => warn!(%err, reel = index, "reel report dropped"),
        }
    }

    fn evaluate(&mut self, spin_id: u64) {
        let stake = self.state.stake;
        let result = self.state.settled_results().unwrap_or_default();
        let (key, multiplier, win) = match self.dispatch(Action::Evaluate { spin_id }) {
            Ok(Effect::Won {
                amount,
                multiplier,
                key,
            }) => {
                self.notifier
                    .success(&format!("You won {}!", format_amount(amount)));
                (key, Some(multiplier), amount)
            }
            Ok(Effect::Lost { key }) => (key, None, 0),
            Ok(effect) => {
                warn!(?effect, "unexpected effect for evaluation");
                return;
            }
            Err(err) => {
                warn!(%err, spin_id, "evaluation dropped");
                return;
            }
        };
        info!(spin_id, %key, win, balance = self.state.balance, "spin resolved");
        let ts = Utc::now();
        if self.history.len() == HISTORY_LIMIT {
            self.history.pop_front();
        }
        self.history.push_back(SpinRecord {
            spin_id,
            ts,
            bet: stake,
            result: result.iter().map(|s| s.to_string()).collect(),
            key: key.clone(),
            win,
            balance_after: self.state.balance,
        });
        self.last_outcome = Some(SpinOutcome {
            spin_id,
            ts,
            bet: stake,
            result,
            key,
            multiplier,
            win,
            balance_after: self.state.balance,
        });
    }

    /// Cancels every pending timer and stops all reels. The machine ignores
    /// further input afterwards.
    pub fn teardown(&mut self) -> usize {
        let mut dropped = 0;
        for reel in &mut self.reels {
            dropped += reel.stop(&mut self.queue);
        }
        dropped += self.queue.cancel_owner(TimerOwner::Machine);
        self.queue.clear();
        self.torn_down = true;
        info!(dropped, "slot machine torn down");
        dropped
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    pub fn view(&self) -> MachineView {
        MachineView {
            balance: self.state.balance,
            bet: self.bet(),
            win: self.state.win,
            winning_line: self.state.winning_line,
            spinning: self.state.spinning,
            can_increase_bet: self.state.can_increase_bet(&self.params.ladder),
            can_decrease_bet: self.state.can_decrease_bet(),
            reels: self.reels.iter().map(ReelSequencer::view).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::{NullNotifier, RecordingNotifier};
    use crate::rng::{ScriptedRng, SeededStream};
    use goldspin_shared::Notice;

    fn machine(seed: &str) -> SlotMachine<SeededStream, RecordingNotifier> {
        SlotMachine::new(
            MachineParams::classic(),
            SeededStream::new(seed),
            RecordingNotifier::new(),
        )
        .unwrap()
    }

    #[test]
    fn reels_start_staggered() {
        let mut m = machine("stagger");
        assert!(matches!(m.spin(), SpinStart::Started { spin_id: 1, bet: 100 }));
        assert_eq!(m.next_deadline(), Some(0));
        m.advance_to(0);
        assert!(m.reels()[0].phase() != crate::reel::ReelPhase::DelayedStart);
        assert_eq!(m.reels()[1].phase(), crate::reel::ReelPhase::DelayedStart);
        m.advance_to(250);
        assert_ne!(m.reels()[1].phase(), crate::reel::ReelPhase::DelayedStart);
        assert_eq!(m.reels()[2].phase(), crate::reel::ReelPhase::DelayedStart);
    }

    #[test]
    fn evaluation_waits_for_grace() {
        let mut m = machine("grace");
        m.spin();
        // reel 2 settles at 500 + 2800
        m.advance_to(3300);
        assert!(m.state().all_settled());
        assert!(m.is_spinning());
        assert_eq!(m.next_deadline(), Some(3800));
        m.advance_to(3799);
        assert!(m.is_spinning());
        m.advance_to(3800);
        assert!(!m.is_spinning());
        assert_eq!(m.history().len(), 1);
    }

    #[test]
    fn win_notifies_with_grouped_amount() {
        // every draw lands on the first playable symbol
        let params = MachineParams::classic();
        let notices = RecordingNotifier::new();
        let mut m = SlotMachine::new(params, ScriptedRng::new(vec![0.0]), notices.clone()).unwrap();
        m.spin();
        let out = m.run_until_idle().unwrap();
        // first playable: BAR, BAR, SEVEN
        assert_eq!(out.key, "BAR-BAR-SEVEN");
        assert_eq!(out.win, 2_000);
        assert_eq!(notices.notices(), vec![Notice::success("You won 2,000!")]);
        assert!(m.view().winning_line);
    }

    #[test]
    fn teardown_silences_everything() {
        let mut m = machine("teardown");
        m.spin();
        m.advance_to(400);
        let before = m.view();
        assert!(m.teardown() > 0);
        assert_eq!(m.pending_timers(), 0);
        assert_eq!(m.next_deadline(), None);
        m.advance_to(100_000);
        let after = m.view();
        assert_eq!(
            before.reels.iter().map(|r| r.visible.clone()).collect::<Vec<_>>(),
            after.reels.iter().map(|r| r.visible.clone()).collect::<Vec<_>>()
        );
        assert_eq!(m.spin(), SpinStart::Ignored);
    }

    #[test]
    fn spin_after_idle_gap_keeps_its_timings() {
        // a real-time front-end catches the clock up before dispatching input
        let mut m = machine("idle-gap");
        m.advance_to(10_000);
        m.spin();
        m.advance_to(10_000);
        assert!(m.is_spinning());
        assert_eq!(m.reels()[0].phase(), crate::reel::ReelPhase::FastSpin);
        assert_eq!(m.reels()[1].phase(), crate::reel::ReelPhase::DelayedStart);
        assert_eq!(m.next_deadline(), Some(10_030));
        m.advance_to(13_799);
        assert!(m.is_spinning());
        assert!(m.history().is_empty());
        m.advance_to(13_800);
        assert!(!m.is_spinning());
        assert_eq!(m.history().len(), 1);
    }

    #[test]
    fn history_keeps_only_recent_spins() {
        let mut params = MachineParams::classic();
        params.starting_balance = 1_000_000;
        let mut m = SlotMachine::new(params, SeededStream::new("history"), NullNotifier).unwrap();
        for _ in 0..HISTORY_LIMIT + 5 {
            m.spin();
            m.run_until_idle().unwrap();
        }
        assert_eq!(m.history().len(), HISTORY_LIMIT);
        assert_eq!(m.history().front().unwrap().spin_id, 6);
        let last = m.history().back().unwrap();
        assert_eq!(last.spin_id, HISTORY_LIMIT as u64 + 5);
        assert_eq!(last.ts, m.last_outcome().unwrap().ts);
    }

    #[test]
    fn bet_cannot_be_set_mid_spin() {
        let mut m = machine("with-bet");
        m.spin();
        assert!(matches!(m.with_bet(500), Err(ConfigError::SpinInProgress)));
        let m = machine("with-bet").with_bet(500).unwrap();
        assert_eq!(m.bet(), 500);
    }

    #[test]
    fn overflowing_timing_is_rejected() {
        let mut params = MachineParams::classic();
        params.timing.per_reel_stagger_ms = u64::MAX / 2 + 1;
        let json = serde_json::to_string(&params).unwrap();
        assert!(matches!(
            MachineParams::from_json(&json),
            Err(ConfigError::TimingOutOfRange { .. })
        ));
        assert!(SlotMachine::new(params, SeededStream::new("big"), NullNotifier).is_err());
    }

    #[test]
    fn params_round_trip_through_json() {
        let json = serde_json::to_string(&MachineParams::classic()).unwrap();
        assert_eq!(MachineParams::from_json(&json).unwrap(), MachineParams::classic());
        assert!(MachineParams::from_json("{").is_err());
    }
}
