//! Price history and period-over-period comparison models.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::PieceZonePrice;

/// Direction of a price change.
///
/// # Example
///
/// ```
/// use precast_pricing::models::Trend;
/// use rust_decimal::Decimal;
///
/// assert_eq!(Trend::from_delta(Some(Decimal::new(5, 0))), Trend::Up);
/// assert_eq!(Trend::from_delta(Some(Decimal::new(-5, 0))), Trend::Down);
/// assert_eq!(Trend::from_delta(None), Trend::Equal);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    /// The price went up.
    Up,
    /// The price went down.
    Down,
    /// No change, or nothing to compare against.
    Equal,
}

impl Trend {
    /// Classifies a delta: up iff positive, down iff negative, otherwise equal.
    pub fn from_delta(delta: Option<Decimal>) -> Self {
        match delta {
            Some(d) if d > Decimal::ZERO => Trend::Up,
            Some(d) if d < Decimal::ZERO => Trend::Down,
            _ => Trend::Equal,
        }
    }
}

/// A published price annotated with the change from the previous one in the
/// same zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// The stored price row.
    #[serde(flatten)]
    pub price: PieceZonePrice,
    /// `base_price + adjustment`.
    pub unit_price: Decimal,
    /// Unit price of the preceding row in the same zone.
    pub previous_price: Option<Decimal>,
    /// `unit_price − previous_price`.
    pub delta: Option<Decimal>,
    /// `delta / previous_price × 100`, two decimals; absent when the previous
    /// price is zero.
    pub delta_percent: Option<Decimal>,
    /// Direction of the change.
    pub trend: Trend,
}

/// Published price on a date compared with the one a calendar month earlier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceComparison {
    /// The piece.
    pub piece_id: String,
    /// The zone.
    pub zone_id: String,
    /// The date compared.
    pub date: NaiveDate,
    /// Unit price in effect on `date`.
    pub current_price: Option<Decimal>,
    /// Effective date of the current price row.
    pub current_effective_date: Option<NaiveDate>,
    /// `date` moved back one calendar month.
    pub previous_date: NaiveDate,
    /// Unit price in effect on `previous_date`.
    pub previous_price: Option<Decimal>,
    /// Effective date of the previous price row.
    pub previous_effective_date: Option<NaiveDate>,
    /// `current_price − previous_price` when both exist.
    pub delta: Option<Decimal>,
    /// Percentage change, two decimals.
    pub delta_percent: Option<Decimal>,
    /// Direction of the change.
    pub trend: Trend,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_delta_is_equal() {
        assert_eq!(Trend::from_delta(Some(Decimal::ZERO)), Trend::Equal);
    }

    #[test]
    fn test_trend_serializes_snake_case() {
        assert_eq!(serde_json::to_string(&Trend::Up).unwrap(), "\"up\"");
        assert_eq!(serde_json::to_string(&Trend::Down).unwrap(), "\"down\"");
        assert_eq!(serde_json::to_string(&Trend::Equal).unwrap(), "\"equal\"");
    }
}
