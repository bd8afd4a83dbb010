//! Balance, bet and spin bookkeeping.
//!
//! [`GameState`] is a plain value. Every change goes through
//! [`GameState::apply`], which either returns the next state or rejects the
//! action and leaves the caller's state untouched.

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, GameError};
use crate::paytable::{combination_key, Paytable};
use crate::symbols::Symbol;

/// Ordered allowed bets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BetLadder {
    pub steps: Vec<u64>,
    pub initial_bet: u64,
}

impl BetLadder {
    pub fn classic() -> Self {
        Self {
            steps: vec![50, 100, 250, 500, 1000],
            initial_bet: 100,
        }
    }

    pub fn index_of(&self, bet: u64) -> Option<usize> {
        self.steps.iter().position(|&b| b == bet)
    }

    pub fn bet_at(&self, index: usize) -> u64 {
        let last = self.steps.len().saturating_sub(1);
        self.steps.get(index.min(last)).copied().unwrap_or(0)
    }

    pub fn min(&self) -> u64 {
        self.steps.first().copied().unwrap_or(0)
    }

    pub fn max(&self) -> u64 {
        self.steps.last().copied().unwrap_or(0)
    }

    pub fn initial_index(&self) -> Result<usize, ConfigError> {
        self.index_of(self.initial_bet)
            .ok_or(ConfigError::InitialBetNotOnLadder(self.initial_bet))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.steps.is_empty() || self.steps.windows(2).any(|w| w[0] >= w[1]) {
            return Err(ConfigError::BadBetLadder);
        }
        self.initial_index().map(|_| ())
    }
}

impl Default for BetLadder {
    fn default() -> Self {
        Self::classic()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    IncreaseBet,
    DecreaseBet,
    Spin,
    ReelSettled {
        reel: usize,
        symbol: Symbol,
        spin_id: u64,
    },
    Evaluate {
        spin_id: u64,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    None,
    BetChanged { bet: u64 },
    SpinStarted { spin_id: u64, bet: u64 },
    AllReelsSettled { spin_id: u64 },
    Won { amount: u64, multiplier: u64, key: String },
    Lost { key: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub state: GameState,
    pub effect: Effect,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameState {
    pub balance: u64,
    pub bet_index: usize,
    /// Bet debited for the current (or last) spin.
    pub stake: u64,
    pub win: u64,
    pub winning_line: bool,
    pub spinning: bool,
    pub spin_id: u64,
    pub results: Vec<Option<Symbol>>,
}

impl GameState {
    pub fn new(balance: u64, bet_index: usize, reels: usize) -> Self {
        Self {
            balance,
            bet_index,
            stake: 0,
            win: 0,
            winning_line: false,
            spinning: false,
            spin_id: 0,
            results: vec![None; reels],
        }
    }

    pub fn bet(&self, ladder: &BetLadder) -> u64 {
        ladder.bet_at(self.bet_index)
    }

    pub fn all_settled(&self) -> bool {
        self.results.iter().all(Option::is_some)
    }

    /// Results of the current spin, once every reel has reported.
    pub fn settled_results(&self) -> Option<Vec<Symbol>> {
        self.results.iter().copied().collect()
    }

    pub fn can_increase_bet(&self, ladder: &BetLadder) -> bool {
        !self.spinning && self.bet_index + 1 < ladder.steps.len()
    }

    pub fn can_decrease_bet(&self) -> bool {
        !self.spinning && self.bet_index > 0
    }

    pub fn apply(
        &self,
        action: Action,
        ladder: &BetLadder,
        paytable: &Paytable,
    ) -> Result<Transition, GameError> {
        let mut next = self.clone();
        let effect = match action {
            Action::IncreaseBet | Action::DecreaseBet => {
                if self.spinning {
                    return Err(GameError::BetLocked);
                }
                let last = ladder.steps.len().saturating_sub(1);
                next.bet_index = match action {
                    Action::IncreaseBet => (self.bet_index + 1).min(last),
                    _ => self.bet_index.saturating_sub(1),
                };
                if next.bet_index == self.bet_index {
                    Effect::None
                } else {
                    Effect::BetChanged {
                        bet: next.bet(ladder),
                    }
                }
            }
            Action::Spin => {
                if self.spinning {
                    return Err(GameError::SpinInProgress);
                }
                let bet = self.bet(ladder);
                if bet > self.balance {
                    return Err(GameError::InsufficientBalance {
                        balance: self.balance,
                        bet,
                    });
                }
                next.balance = self.balance - bet;
                next.stake = bet;
                next.win = 0;
                next.winning_line = false;
                next.spinning = true;
                next.spin_id = self.spin_id + 1;
                next.results = vec![None; self.results.len()];
                Effect::SpinStarted {
                    spin_id: next.spin_id,
                    bet,
                }
            }
            Action::ReelSettled {
                reel,
                symbol,
                spin_id,
            } => {
                self.check_current(spin_id)?;
                if reel >= self.results.len() {
                    return Err(GameError::UnknownReel(reel));
                }
                if symbol.is_placeholder() {
                    return Err(GameError::PlaceholderResult { reel });
                }
                let was_complete = self.all_settled();
                next.results[reel] = Some(symbol);
                if !was_complete && next.all_settled() {
                    Effect::AllReelsSettled { spin_id }
                } else {
                    Effect::None
                }
            }
            Action::Evaluate { spin_id } => {
                self.check_current(spin_id)?;
                let result = self.settled_results().ok_or(GameError::NotSettled)?;
                let key = combination_key(&result);
                next.spinning = false;
                match paytable.multiplier_for_key(&key) {
                    Some(multiplier) => {
                        let amount = self.stake.saturating_mul(multiplier);
                        next.win = amount;
                        next.balance = self.balance.saturating_add(amount);
                        next.winning_line = true;
                        Effect::Won {
                            amount,
                            multiplier,
                            key,
                        }
                    }
                    None => Effect::Lost { key },
                }
            }
        };
        Ok(Transition {
            state: next,
            effect,
        })
    }

    fn check_current(&self, spin_id: u64) -> Result<(), GameError> {
        if !self.spinning || spin_id != self.spin_id {
            return Err(GameError::StaleSpin {
                got: spin_id,
                current: self.spin_id,
            });
        }
        Ok(())
    }
}
