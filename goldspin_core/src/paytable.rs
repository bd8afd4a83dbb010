use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::symbols::Symbol;

/// Joins a result into the lookup key, e.g. `SEVEN-SEVEN-BAR`.
pub fn combination_key(result: &[Symbol]) -> String {
    result
        .iter()
        .map(|s| s.as_str())
        .collect::<Vec<_>>()
        .join("-")
}

/// Exact-combination payouts. A missing key pays nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Paytable(pub BTreeMap<String, u64>);

impl Paytable {
    pub fn classic() -> Self {
        let entries = [
            ("BAR-BAR-BAR", 50),
            ("SEVEN-SEVEN-SEVEN", 100),
            ("TRIPLE-TRIPLE-TRIPLE", 300),
            ("SPIN-SPIN-SPIN", 75),
            ("BAR-BAR-SEVEN", 20),
            ("SEVEN-SEVEN-BAR", 20),
            ("TRIPLE-TRIPLE-BAR", 25),
            ("TRIPLE-TRIPLE-SEVEN", 30),
            ("SPIN-SPIN-BAR", 15),
            ("SPIN-SPIN-SEVEN", 20),
            ("SPIN-SPIN-TRIPLE", 25),
        ];
        Self(
            entries
                .into_iter()
                .map(|(k, m)| (k.to_string(), m))
                .collect(),
        )
    }

    pub fn multiplier_for_key(&self, key: &str) -> Option<u64> {
        self.0.get(key).copied()
    }

    pub fn multiplier(&self, result: &[Symbol]) -> Option<u64> {
        self.multiplier_for_key(&combination_key(result))
    }

    /// Win for `result` at `bet`; zero when the combination is not listed.
    pub fn payout(&self, result: &[Symbol], bet: u64) -> u64 {
        self.multiplier(result)
            .map(|m| bet.saturating_mul(m))
            .unwrap_or(0)
    }

    /// Entries by multiplier, highest first.
    pub fn entries(&self) -> Vec<(&str, u64)> {
        let mut out: Vec<(&str, u64)> = self.0.iter().map(|(k, m)| (k.as_str(), *m)).collect();
        out.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
        out
    }

    /// Every key must name `reels` known symbols.
    pub fn validate(&self, reels: usize) -> Result<(), ConfigError> {
        for key in self.0.keys() {
            let parts: Vec<&str> = key.split('-').collect();
            if parts.len() != reels {
                return Err(ConfigError::BadPaytableKey {
                    key: key.clone(),
                    expected: reels,
                });
            }
            for part in parts {
                part.parse::<Symbol>()?;
            }
        }
        Ok(())
    }
}

impl Default for Paytable {
    fn default() -> Self {
        Self::classic()
    }
}
