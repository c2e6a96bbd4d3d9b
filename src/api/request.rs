//! Request types for the pricing API.
//!
//! JSON bodies and query strings use snake_case fields, decimals as strings
//! and dates as `YYYY-MM-DD`.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::{BomLineInput, PriceLine};

/// Request body for `POST /prices/publish`.
///
/// Without `price` the breakdown total as of `effective_date` is published.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishRequest {
    /// The piece to price.
    pub piece_id: String,
    /// The zone the price applies in.
    pub zone_id: String,
    /// The date the price takes effect from.
    pub effective_date: NaiveDate,
    /// Base price to publish instead of the computed total.
    #[serde(default)]
    pub price: Option<Decimal>,
    /// Commercial adjustment added on top of the base price.
    #[serde(default)]
    pub adjustment: Option<Decimal>,
}

impl PublishRequest {
    /// The tagged price line this request describes.
    pub fn price_line(&self) -> PriceLine {
        PriceLine::from_optional(self.price, self.adjustment)
    }
}

/// Request body carrying formula lines (replace and validate).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormulaRequest {
    /// The formula lines.
    pub lines: Vec<BomLineInput>,
}

/// Request body for `POST /pieces/{piece}/formula/copy`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CopyFormulaRequest {
    /// The piece whose formula is copied.
    pub source_piece_id: String,
    /// Replace an existing formula on the target piece.
    #[serde(default)]
    pub overwrite: bool,
}

/// Request body for `POST /zones/{zone}/material-prices/import`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportRequest {
    /// Any day of the month the prices take effect from.
    pub month: NaiveDate,
    /// CSV text with a `material_id,price[,valid_until]` header.
    pub csv: String,
}

/// Query string of the breakdown endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct BreakdownQuery {
    /// The zone to price in.
    pub zone_id: String,
    /// Resolution date; today when absent.
    #[serde(default)]
    pub as_of: Option<NaiveDate>,
    /// Attach a one-month price comparison.
    #[serde(default)]
    pub compare: bool,
    /// Publish the computed total at `as_of` before answering.
    #[serde(default)]
    pub publish: bool,
}

/// Query string of the history endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct HistoryQuery {
    /// Restrict to one zone.
    #[serde(default)]
    pub zone_id: Option<String>,
    /// Maximum number of rows.
    #[serde(default)]
    pub limit: Option<usize>,
}

/// Query string of the compare endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct CompareQuery {
    /// The zone to compare in.
    pub zone_id: String,
    /// Comparison date; today when absent.
    #[serde(default)]
    pub date: Option<NaiveDate>,
}

/// Query string of the export endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ExportQuery {
    /// Resolution date; today when absent.
    #[serde(default)]
    pub as_of: Option<NaiveDate>,
}

/// Parses a month path segment, `YYYY-MM` or a full `YYYY-MM-DD` date.
pub(crate) fn parse_month(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(&format!("{}-01", raw), "%Y-%m-%d"))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_publish_request_without_price_is_computed() {
        let json = r#"{
            "piece_id": "P1",
            "zone_id": "Z1",
            "effective_date": "2024-03-01",
            "adjustment": "5.00"
        }"#;

        let request: PublishRequest = serde_json::from_str(json).unwrap();
        assert_eq!(
            request.price_line(),
            PriceLine::Computed {
                adjustment: Decimal::from_str("5.00").unwrap()
            }
        );
    }

    #[test]
    fn test_publish_request_with_price_is_supplied() {
        let json = r#"{"piece_id": "P1", "zone_id": "Z1", "effective_date": "2024-03-01", "price": "410"}"#;

        let request: PublishRequest = serde_json::from_str(json).unwrap();
        assert!(matches!(request.price_line(), PriceLine::Supplied { .. }));
        assert_eq!(request.price_line().adjustment(), Decimal::ZERO);
    }

    #[test]
    fn test_copy_request_defaults_to_no_overwrite() {
        let request: CopyFormulaRequest =
            serde_json::from_str(r#"{"source_piece_id": "P1"}"#).unwrap();
        assert!(!request.overwrite);
    }

    #[test]
    fn test_formula_request_lines() {
        let json = r#"{"lines": [{"material_id": "A", "quantity_per_unit": "350", "waste_factor": "0.02"}]}"#;
        let request: FormulaRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.lines[0].material_id, "A");
    }

    #[test]
    fn test_parse_month_accepts_both_forms() {
        let march = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert_eq!(parse_month("2024-03"), Some(march));
        assert_eq!(
            parse_month("2024-03-17"),
            NaiveDate::from_ymd_opt(2024, 3, 17)
        );
        assert_eq!(parse_month("March"), None);
    }
}
