#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("machine needs at least one reel")]
    NoReels,
    #[error("reel {reel} has no playable symbols")]
    NoPlayableSymbols { reel: usize },
    #[error("unknown symbol: {0}")]
    UnknownSymbol(String),
    #[error("paytable key {key:?} does not name {expected} symbols")]
    BadPaytableKey { key: String, expected: usize },
    #[error("bet ladder must be non-empty and strictly increasing")]
    BadBetLadder,
    #[error("initial bet {0} is not on the bet ladder")]
    InitialBetNotOnLadder(u64),
    #[error("timing interval must be positive")]
    ZeroInterval,
    #[error("timing value {field} = {value}ms exceeds {max}ms")]
    TimingOutOfRange {
        field: &'static str,
        value: u64,
        max: u64,
    },
    #[error("bet cannot change while a spin is running")]
    SpinInProgress,
    #[error("invalid machine params: {0}")]
    Json(#[from] serde_json::Error),
}

/// Rejections of a player action. None of these change state.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum GameError {
    #[error("Insufficient balance!")]
    InsufficientBalance { balance: u64, bet: u64 },
    #[error("a spin is already in progress")]
    SpinInProgress,
    #[error("bet cannot change while the reels are spinning")]
    BetLocked,
    #[error("report for spin {got} but spin {current} is current")]
    StaleSpin { got: u64, current: u64 },
    #[error("no reel with index {0}")]
    UnknownReel(usize),
    #[error("not every reel has reported for this spin")]
    NotSettled,
    #[error("reel {reel} reported the placeholder symbol")]
    PlaceholderResult { reel: usize },
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ReelError {
    #[error("reel {reel} still has {pending} pending timers")]
    Busy { reel: usize, pending: usize },
}
