use std::collections::BTreeMap;

use serde::Serialize;

use crate::{
    error::ConfigError,
    machine::{MachineParams, SlotMachine, SpinOutcome, SpinStart},
    notify::NullNotifier,
    rng::SymbolRng,
};

#[derive(Debug, Clone, Default, Serialize)]
pub struct SimulationReport {
    pub spins: u64,
    pub total_bet: u64,
    pub total_won: u64,
    pub hits: u64,
    pub by_key: BTreeMap<String, u64>, // winning key -> count
    pub outcomes: Vec<SpinOutcome>,
}

impl SimulationReport {
    /// Return-to-player over the run, 0.0 when nothing was bet.
    pub fn rtp(&self) -> f64 {
        if self.total_bet == 0 {
            return 0.0;
        }
        self.total_won as f64 / self.total_bet as f64
    }

    pub fn hit_rate(&self) -> f64 {
        if self.spins == 0 {
            return 0.0;
        }
        self.hits as f64 / self.spins as f64
    }
}

/// One complete spin on a fresh machine, timers run to completion.
pub fn spin_once<R: SymbolRng>(
    params: &MachineParams,
    rng: R,
    bet: u64,
) -> Result<Option<SpinOutcome>, ConfigError> {
    let mut machine = SlotMachine::new(params.clone(), rng, NullNotifier)?.with_bet(bet)?;
    match machine.spin() {
        SpinStart::Started { .. } => Ok(machine.run_until_idle()),
        _ => Ok(None),
    }
}

/// Runs `spins` back-to-back spins at `bet` on one machine. The starting
/// balance is raised to cover every bet so no spin is rejected.
pub fn simulate<R: SymbolRng>(
    params: &MachineParams,
    rng: R,
    spins: u64,
    bet: u64,
) -> Result<SimulationReport, ConfigError> {
    let mut params = params.clone();
    params.starting_balance = params.starting_balance.max(bet.saturating_mul(spins));
    let mut machine = SlotMachine::new(params, rng, NullNotifier)?.with_bet(bet)?;
    let mut report = SimulationReport::default();
    for _ in 0..spins {
        if !matches!(machine.spin(), SpinStart::Started { .. }) {
            break;
        }
        let Some(outcome) = machine.run_until_idle() else {
            break;
        };
        report.spins += 1;
        report.total_bet += outcome.bet;
        report.total_won += outcome.win;
        if outcome.win > 0 {
            report.hits += 1;
            *report.by_key.entry(outcome.key.clone()).or_default() += 1;
        }
        report.outcomes.push(outcome);
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::SeededStream;

    #[test]
    fn test_spin_deterministic() {
        let params = MachineParams::classic();
        let out1 = spin_once(&params, SeededStream::new("seed"), 100).unwrap().unwrap();
        let out2 = spin_once(&params, SeededStream::new("seed"), 100).unwrap().unwrap();
        assert_eq!(out1.result, out2.result);
        assert_eq!((out1.key, out1.win), (out2.key, out2.win));
    }

    #[test]
    fn bet_off_ladder_is_config_error() {
        let params = MachineParams::classic();
        assert!(matches!(
            spin_once(&params, SeededStream::new("x"), 75),
            Err(ConfigError::InitialBetNotOnLadder(75))
        ));
    }

    #[test]
    fn simulation_adds_up() {
        let report = simulate(&MachineParams::classic(), SeededStream::new("sim"), 50, 50).unwrap();
        assert_eq!(report.spins, 50);
        assert_eq!(report.total_bet, 2_500);
        assert_eq!(
            report.total_won,
            report.outcomes.iter().map(|o| o.win).sum::<u64>()
        );
        assert_eq!(report.hits, report.by_key.values().sum::<u64>());
    }
}
