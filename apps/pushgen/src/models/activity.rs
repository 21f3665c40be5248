use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::models::client::ClientId;

/// A card transaction (spend) attributed to a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub client_id: ClientId,
    pub date: NaiveDateTime,
    pub category: String,
    pub amount: f64,
    pub currency: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    In,
    Out,
}

impl Direction {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "in" | "incoming" | "входящий" => Some(Self::In),
            "out" | "outgoing" | "исходящий" => Some(Self::Out),
            _ => None,
        }
    }
}

/// A money movement in or out of the client's account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transfer {
    pub client_id: ClientId,
    pub date: NaiveDateTime,
    /// Transfer type code, lowercased (`p2p_out`, `atm_withdrawal`, `fx_buy`, ...).
    pub kind: String,
    pub direction: Direction,
    pub amount: f64,
    pub currency: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_parse() {
        assert_eq!(Direction::parse("IN"), Some(Direction::In));
        assert_eq!(Direction::parse(" out "), Some(Direction::Out));
        assert_eq!(Direction::parse("outgoing"), Some(Direction::Out));
        assert_eq!(Direction::parse("sideways"), None);
    }
}
