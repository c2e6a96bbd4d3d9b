//! Price history and comparison.

use chrono::NaiveDate;

use crate::calculation::{annotate_history, compare_prices};
use crate::error::{EngineError, EngineResult};
use crate::models::{HistoryEntry, PriceComparison};

use super::PricingEngine;

impl PricingEngine {
    /// Published prices of a piece, newest first, each compared with the
    /// previous price of its zone.
    ///
    /// `limit` defaults to the configured history limit and must lie between
    /// 1 and the configured maximum.
    pub fn get_history(
        &self,
        piece_id: &str,
        zone_id: Option<&str>,
        limit: Option<usize>,
    ) -> EngineResult<Vec<HistoryEntry>> {
        let pricing = self.config.pricing();
        let limit = limit.unwrap_or(pricing.history_limit);
        if limit == 0 || limit > pricing.max_history_limit {
            return Err(EngineError::validation(
                "INVALID_LIMIT",
                format!(
                    "limit must be between 1 and {}, got {}",
                    pricing.max_history_limit, limit
                ),
            ));
        }

        self.require_piece(piece_id)?;
        if let Some(zone_id) = zone_id {
            self.require_zone(zone_id)?;
        }

        let rows = self.store.piece_prices(piece_id, zone_id)?;
        Ok(annotate_history(rows, limit))
    }

    /// The unit price on `date` against the one a calendar month earlier.
    pub fn compare(
        &self,
        piece_id: &str,
        zone_id: &str,
        date: NaiveDate,
    ) -> EngineResult<PriceComparison> {
        self.require_piece(piece_id)?;
        self.require_zone(zone_id)?;
        let rows = self.store.piece_prices(piece_id, Some(zone_id))?;
        Ok(compare_prices(piece_id, zone_id, date, &rows))
    }
}
