use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "UPPERCASE")]
pub enum Symbol {
    Bar,
    Seven,
    Triple,
    Spin,
    Blank,
}

impl Symbol {
    pub const ALL: [Symbol; 5] = [
        Symbol::Bar,
        Symbol::Seven,
        Symbol::Triple,
        Symbol::Spin,
        Symbol::Blank,
    ];

    pub fn from_index(i: u8) -> Self {
        match i % 5 {
            0 => Symbol::Bar,
            1 => Symbol::Seven,
            2 => Symbol::Triple,
            3 => Symbol::Spin,
            _ => Symbol::Blank,
        }
    }

    pub fn to_index(self) -> u8 {
        match self {
            Symbol::Bar => 0,
            Symbol::Seven => 1,
            Symbol::Triple => 2,
            Symbol::Spin => 3,
            Symbol::Blank => 4,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Symbol::Bar => "BAR",
            Symbol::Seven => "SEVEN",
            Symbol::Triple => "TRIPLE",
            Symbol::Spin => "SPIN",
            Symbol::Blank => "BLANK",
        }
    }

    /// The placeholder may sit on a strip but is never a spin result.
    pub fn is_placeholder(self) -> bool {
        self == Symbol::Blank
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Symbol {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Symbol::ALL
            .into_iter()
            .find(|sym| sym.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ConfigError::UnknownSymbol(s.to_string()))
    }
}

/// Ordered population a reel samples from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Strip(pub Vec<Symbol>);

impl Strip {
    /// The strip with placeholders removed, order preserved.
    pub fn playable(&self) -> Vec<Symbol> {
        self.0.iter().copied().filter(|s| !s.is_placeholder()).collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<Symbol>> for Strip {
    fn from(symbols: Vec<Symbol>) -> Self {
        Self(symbols)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReelsConfig {
    pub strips: Vec<Strip>, // one per reel, left to right
}

impl ReelsConfig {
    pub fn classic() -> Self {
        use Symbol::*;
        Self {
            strips: vec![
                Strip(vec![Bar, Bar, Seven, Seven, Triple, Spin, Blank, Bar, Seven, Blank]),
                Strip(vec![Bar, Seven, Seven, Triple, Triple, Spin, Blank, Blank, Bar, Seven]),
                Strip(vec![Seven, Seven, Triple, Bar, Spin, Spin, Blank, Blank, Triple, Bar]),
            ],
        }
    }

    pub fn reel_count(&self) -> usize {
        self.strips.len()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.strips.is_empty() {
            return Err(ConfigError::NoReels);
        }
        for (index, strip) in self.strips.iter().enumerate() {
            if strip.playable().is_empty() {
                return Err(ConfigError::NoPlayableSymbols { reel: index });
            }
        }
        Ok(())
    }
}

impl Default for ReelsConfig {
    fn default() -> Self {
        Self::classic()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn playable_drops_blanks_in_order() {
        let strip = &ReelsConfig::classic().strips[0];
        assert_eq!(
            strip.playable(),
            vec![
                Symbol::Bar,
                Symbol::Bar,
                Symbol::Seven,
                Symbol::Seven,
                Symbol::Triple,
                Symbol::Spin,
                Symbol::Bar,
                Symbol::Seven
            ]
        );
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!("seven".parse::<Symbol>().unwrap(), Symbol::Seven);
        assert_eq!(" TRIPLE ".parse::<Symbol>().unwrap(), Symbol::Triple);
        assert!("cherry".parse::<Symbol>().is_err());
    }

    #[test]
    fn all_blank_strip_is_rejected() {
        let reels = ReelsConfig {
            strips: vec![Strip(vec![Symbol::Blank, Symbol::Blank])],
        };
        assert!(matches!(
            reels.validate(),
            Err(ConfigError::NoPlayableSymbols { reel: 0 })
        ));
        assert!(matches!(
            ReelsConfig { strips: vec![] }.validate(),
            Err(ConfigError::NoReels)
        ));
    }

    #[test]
    fn serde_uses_display_names() {
        let json = serde_json::to_string(&Symbol::Triple).unwrap();
        assert_eq!(json, "\"TRIPLE\"");
        for sym in Symbol::ALL {
            assert_eq!(Symbol::from_index(sym.to_index()), sym);
        }
    }
}
