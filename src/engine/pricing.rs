//! Cost breakdown and price publishing.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::calculation::{BreakdownInputs, calculate_breakdown, month_start, one_month_back};
use crate::error::{EngineError, EngineResult};
use crate::models::{CostBreakdown, NewPieceZonePrice, PieceZonePrice, PriceLine};

use super::{AuditAction, AuditEvent, PricingEngine};

impl PricingEngine {
    /// Calculates the cost breakdown of one unit of `piece_id` produced in
    /// `zone_id`, with every ledger resolved as of `as_of`.
    ///
    /// Read-only. Missing prices, parameters or geometry are reported on the
    /// breakdown, not as errors.
    pub fn breakdown(
        &self,
        piece_id: &str,
        zone_id: &str,
        as_of: NaiveDate,
    ) -> EngineResult<CostBreakdown> {
        let piece = self.require_piece(piece_id)?;
        self.require_zone(zone_id)?;

        let bom = self.store.list_bom_lines(piece_id)?;
        let mut material_ids: Vec<String> = Vec::new();
        for line in &bom {
            if !material_ids.contains(&line.material_id) {
                material_ids.push(line.material_id.clone());
            }
        }
        let material_prices = self.store.material_prices_for(zone_id, &material_ids)?;
        let process_parameters = self.store.process_parameters_between(
            zone_id,
            one_month_back(month_start(as_of)),
            as_of,
        )?;
        let published_prices = self.store.piece_prices(piece_id, Some(zone_id))?;

        let breakdown = calculate_breakdown(
            BreakdownInputs {
                piece: &piece,
                zone_id,
                as_of,
                bom: &bom,
                material_prices: &material_prices,
                process_parameters: &process_parameters,
                published_prices: &published_prices,
            },
            self.config.cost_model_for(zone_id),
        );

        debug!(
            piece_id = %piece_id,
            zone_id = %zone_id,
            as_of = %as_of,
            total = %breakdown.total,
            warnings = breakdown.warnings.len(),
            "Breakdown calculated"
        );
        Ok(breakdown)
    }

    /// Publishes a unit sale price for (piece, zone) from `effective_date`.
    ///
    /// The breakdown is always recalculated so a price cannot be published
    /// while any formula material is unpriced. A second publish on the same
    /// date overwrites the first.
    pub fn publish(
        &self,
        piece_id: &str,
        zone_id: &str,
        effective_date: NaiveDate,
        price_line: &PriceLine,
        actor: &str,
    ) -> EngineResult<PieceZonePrice> {
        if let PriceLine::Supplied { base_price, .. } = price_line
            && *base_price < Decimal::ZERO
        {
            return Err(EngineError::validation(
                "INVALID_PRICE",
                format!("Price must not be negative, got {}", base_price),
            ));
        }

        let breakdown = self.breakdown(piece_id, zone_id, effective_date)?;

        if self.store.is_month_closed(zone_id, effective_date)? {
            return Err(EngineError::conflict(
                "PERIOD_CLOSED",
                format!(
                    "Period {} is closed for zone {}",
                    effective_date.format("%Y-%m"),
                    zone_id
                ),
            ));
        }

        if !breakdown.is_publishable() {
            warn!(
                piece_id = %piece_id,
                zone_id = %zone_id,
                missing = ?breakdown.missing_prices,
                "Publish blocked by missing material prices"
            );
            return Err(EngineError::validation_with_details(
                "MISSING_MATERIAL_PRICES",
                format!(
                    "Cannot publish: no price as of {} for material(s) {}",
                    effective_date,
                    breakdown.missing_prices.join(", ")
                ),
                json!({ "missing_prices": breakdown.missing_prices }),
            ));
        }

        if breakdown.overflow {
            return Err(EngineError::validation(
                "COST_OVERFLOW",
                format!(
                    "Cannot publish: the cost of piece {} as of {} is too large to represent",
                    piece_id, effective_date
                ),
            ));
        }

        let base_price = match price_line {
            PriceLine::Supplied { base_price, .. } => *base_price,
            PriceLine::Computed { .. } => breakdown.total,
        };
        if base_price.checked_add(price_line.adjustment()).is_none() {
            return Err(EngineError::validation(
                "INVALID_PRICE",
                format!(
                    "Price {} plus adjustment {} is too large to represent",
                    base_price,
                    price_line.adjustment()
                ),
            ));
        }

        let stored = self.store.upsert_piece_price(&NewPieceZonePrice {
            piece_id: piece_id.to_string(),
            zone_id: zone_id.to_string(),
            effective_date,
            base_price,
            adjustment: price_line.adjustment(),
            created_by: actor.to_string(),
        })?;

        info!(
            piece_id = %piece_id,
            zone_id = %zone_id,
            effective_date = %effective_date,
            unit_price = %stored.unit_price(),
            "Price published"
        );
        self.audit(AuditEvent::new(
            AuditAction::PricePublished,
            actor,
            piece_id,
            Some(zone_id),
            format!("{} from {}", stored.unit_price(), effective_date),
        ));

        Ok(stored)
    }
}
