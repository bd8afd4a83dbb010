use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What a front-end needs to draw one reel.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ReelView {
    pub index: usize,
    pub visible: [String; 3], // top, centre, bottom
    pub phase: String,
    pub spinning: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct MachineView {
    pub balance: u64,
    pub bet: u64,
    pub win: u64,
    pub winning_line: bool,
    pub spinning: bool,
    pub can_increase_bet: bool,
    pub can_decrease_bet: bool,
    pub reels: Vec<ReelView>,
}

impl MachineView {
    /// Centre-row symbols, left to right.
    pub fn centre_line(&self) -> Vec<&str> {
        self.reels.iter().map(|r| r.visible[1].as_str()).collect()
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Success,
    Error,
}

/// Transient message shown to the player.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct SpinRecord {
    pub spin_id: u64,
    pub ts: DateTime<Utc>,
    pub bet: u64,
    pub result: Vec<String>,
    pub key: String,
    pub win: u64,
    pub balance_after: u64,
}

#[derive(thiserror::Error, Debug)]
pub enum ViewError {
    #[error("reel {0} is out of range")]
    UnknownReel(usize),
}

pub type ViewResult<T> = Result<T, ViewError>;

/// Formats an amount with `,` thousands separators.
pub fn format_amount(amount: u64) -> String {
    let digits = amount.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

impl MachineView {
    pub fn reel(&self, index: usize) -> ViewResult<&ReelView> {
        self.reels.get(index).ok_or(ViewError::UnknownReel(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amounts_are_grouped() {
        assert_eq!(format_amount(0), "0");
        assert_eq!(format_amount(999), "999");
        assert_eq!(format_amount(1000), "1,000");
        assert_eq!(format_amount(30000), "30,000");
        assert_eq!(format_amount(1234567), "1,234,567");
    }

    #[test]
    fn notice_level_serializes_lowercase() {
        let json = serde_json::to_string(&Notice::error("Insufficient balance!")).unwrap();
        assert_eq!(json, r#"{"level":"error","message":"Insufficient balance!"}"#);
    }

    #[test]
    fn unknown_reel_is_an_error() {
        let view = MachineView {
            balance: 0,
            bet: 50,
            win: 0,
            winning_line: false,
            spinning: false,
            can_increase_bet: true,
            can_decrease_bet: false,
            reels: vec![],
        };
        assert!(matches!(view.reel(2), Err(ViewError::UnknownReel(2))));
    }
}
