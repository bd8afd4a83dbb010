pub mod engine;
pub mod error;
pub mod machine;
pub mod notify;
pub mod paytable;
pub mod reel;
pub mod rng;
pub mod scheduler;
pub mod state;
pub mod symbols;
pub mod timing;

pub use crate::engine::{simulate, spin_once, SimulationReport};
pub use crate::error::{ConfigError, GameError, ReelError};
pub use crate::machine::{
    MachineParams, MachineTimer, SlotMachine, SpinOutcome, SpinStart, HISTORY_LIMIT,
};
pub use crate::notify::{Notifier, NullNotifier, RecordingNotifier, TracingNotifier};
pub use crate::paytable::{combination_key, Paytable};
pub use crate::reel::{ReelPhase, ReelSequencer, ReelTimer};
pub use crate::rng::{derive_floats, derive_hash_hex, ScriptedRng, SeededStream, SymbolRng, ThreadRandom};
pub use crate::scheduler::{TimerId, TimerOwner, TimerQueue};
pub use crate::state::{Action, BetLadder, Effect, GameState, Transition};
pub use crate::symbols::{ReelsConfig, Strip, Symbol};
pub use crate::timing::{Millis, Phase, PhaseTable, TimingConfig, MAX_TIMING_MS};
