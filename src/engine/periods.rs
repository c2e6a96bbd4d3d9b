//! Process parameters and month closing.

use chrono::{NaiveDate, Utc};
use serde_json::json;
use tracing::info;

use crate::calculation::{month_start, one_month_back, resolve_process_parameters};
use crate::error::{EngineError, EngineResult};
use crate::models::{PeriodClosing, ProcessParameters, ProcessRates, ResolvedProcessParameters};

use super::{AuditAction, AuditEvent, PricingEngine};

impl PricingEngine {
    /// The parameters that apply to `month` in a zone, falling back to the
    /// month before.
    pub fn get_process_parameters(
        &self,
        zone_id: &str,
        month: NaiveDate,
    ) -> EngineResult<ResolvedProcessParameters> {
        self.require_zone(zone_id)?;
        let month = month_start(month);
        let rows = self
            .store
            .process_parameters_between(zone_id, one_month_back(month), month)?;

        resolve_process_parameters(&rows, month).ok_or_else(|| {
            EngineError::not_found(
                "process params",
                format!("{}/{}", zone_id, month.format("%Y-%m")),
            )
        })
    }

    /// Sets the parameters of (zone, month). Every rate must be non-negative.
    pub fn set_process_parameters(
        &self,
        zone_id: &str,
        month: NaiveDate,
        rates: &ProcessRates,
        actor: &str,
    ) -> EngineResult<ProcessParameters> {
        self.require_zone(zone_id)?;

        let negative = rates.negative_fields();
        if !negative.is_empty() {
            return Err(EngineError::validation_with_details(
                "INVALID_PARAMETER",
                format!("Parameters must not be negative: {}", negative.join(", ")),
                json!({ "fields": negative }),
            ));
        }

        let stored = self.store.upsert_process_parameters(&ProcessParameters {
            zone_id: zone_id.to_string(),
            month: month_start(month),
            rates: rates.clone(),
            updated_by: actor.to_string(),
            updated_at: Utc::now(),
        })?;

        info!(zone_id = %zone_id, month = %stored.month, "Process parameters set");
        self.audit(AuditEvent::new(
            AuditAction::ProcessParametersSet,
            actor,
            zone_id,
            Some(zone_id),
            format!("parameters for {}", stored.month.format("%Y-%m")),
        ));
        Ok(stored)
    }

    /// Freezes (zone, month) against further edits.
    ///
    /// The month must have its own process parameters; a fallback does not
    /// count.
    pub fn close_month(
        &self,
        zone_id: &str,
        month: NaiveDate,
        actor: &str,
    ) -> EngineResult<PeriodClosing> {
        self.require_zone(zone_id)?;
        let month = month_start(month);

        if self.store.get_process_parameters(zone_id, month)?.is_none() {
            return Err(EngineError::validation(
                "PROCESS_PARAMS_MISSING",
                format!(
                    "Cannot close {} for zone {}: no process parameters for the month",
                    month.format("%Y-%m"),
                    zone_id
                ),
            ));
        }

        let closing = self.store.insert_period_closing(&PeriodClosing {
            zone_id: zone_id.to_string(),
            month,
            closed_by: actor.to_string(),
            closed_at: Utc::now(),
        })?;

        info!(zone_id = %zone_id, month = %month, closed_by = %actor, "Month closed");
        self.audit(AuditEvent::new(
            AuditAction::MonthClosed,
            actor,
            zone_id,
            Some(zone_id),
            format!("closed {}", month.format("%Y-%m")),
        ));
        Ok(closing)
    }

    /// Whether the month containing `month` is closed in the zone.
    pub fn is_month_closed(&self, zone_id: &str, month: NaiveDate) -> EngineResult<bool> {
        self.require_zone(zone_id)?;
        self.store.is_month_closed(zone_id, month)
    }

    /// Closed months of a zone, most recent first.
    pub fn list_closed_months(&self, zone_id: &str) -> EngineResult<Vec<PeriodClosing>> {
        self.require_zone(zone_id)?;
        self.store.list_period_closings(zone_id)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{date, dec, rates, seeded_engine};
    use super::*;

    #[test]
    fn test_get_exact_month() {
        let (engine, _) = seeded_engine();
        engine
            .set_process_parameters("Z1", date(2024, 2, 14), &rates(), "ana")
            .unwrap();

        let resolved = engine.get_process_parameters("Z1", date(2024, 2, 1)).unwrap();
        assert!(!resolved.fallback);
        assert_eq!(resolved.parameters.month, date(2024, 2, 1));
        assert_eq!(resolved.parameters.updated_by, "ana");
    }

    #[test]
    fn test_get_falls_back_one_month_only() {
        let (engine, _) = seeded_engine();
        engine
            .set_process_parameters("Z1", date(2024, 1, 1), &rates(), "ana")
            .unwrap();

        let feb = engine.get_process_parameters("Z1", date(2024, 2, 1)).unwrap();
        assert!(feb.fallback);
        assert_eq!(feb.requested_month, date(2024, 2, 1));
        assert_eq!(feb.parameters.month, date(2024, 1, 1));

        let err = engine
            .get_process_parameters("Z1", date(2024, 3, 1))
            .unwrap_err();
        assert_eq!(err.code(), "PROCESS_PARAMS_NOT_FOUND");
    }

    #[test]
    fn test_negative_rate_is_invalid_parameter() {
        let (engine, _) = seeded_engine();
        let bad = ProcessRates {
            profit_per_ton: dec("-1"),
            ..rates()
        };
        match engine.set_process_parameters("Z1", date(2024, 1, 1), &bad, "ana") {
            Err(EngineError::Validation { code, details, .. }) => {
                assert_eq!(code, "INVALID_PARAMETER");
                assert_eq!(details.unwrap()["fields"][0], "profit_per_ton");
            }
            other => panic!("Expected INVALID_PARAMETER, got {:?}", other),
        }
    }

    #[test]
    fn test_close_month_requires_own_parameters() {
        let (engine, _) = seeded_engine();
        engine
            .set_process_parameters("Z1", date(2024, 1, 1), &rates(), "ana")
            .unwrap();

        let err = engine.close_month("Z1", date(2024, 2, 1), "ana").unwrap_err();
        assert_eq!(err.code(), "PROCESS_PARAMS_MISSING");
    }

    #[test]
    fn test_close_month_twice_conflicts_and_blocks_writes() {
        let (engine, sink) = seeded_engine();
        engine
            .set_process_parameters("Z1", date(2024, 1, 1), &rates(), "ana")
            .unwrap();

        let closing = engine.close_month("Z1", date(2024, 1, 20), "ana").unwrap();
        assert_eq!(closing.month, date(2024, 1, 1));
        assert!(engine.is_month_closed("Z1", date(2024, 1, 5)).unwrap());

        let err = engine.close_month("Z1", date(2024, 1, 1), "ana").unwrap_err();
        assert_eq!(err.code(), "PERIOD_ALREADY_CLOSED");

        let err = engine
            .set_process_parameters("Z1", date(2024, 1, 1), &rates(), "ana")
            .unwrap_err();
        assert_eq!(err.code(), "PERIOD_CLOSED");

        // Reads ignore the closed state.
        assert!(engine.get_process_parameters("Z1", date(2024, 1, 1)).is_ok());
        assert_eq!(engine.list_closed_months("Z1").unwrap().len(), 1);
        assert!(sink.events().iter().any(|e| e.action == AuditAction::MonthClosed));
    }

    #[test]
    fn test_closing_is_per_zone() {
        let (engine, _) = seeded_engine();
        engine
            .set_process_parameters("Z1", date(2024, 1, 1), &rates(), "ana")
            .unwrap();
        engine.close_month("Z1", date(2024, 1, 1), "ana").unwrap();

        assert!(engine
            .set_process_parameters("Z2", date(2024, 1, 1), &rates(), "ana")
            .is_ok());
        assert!(engine.list_closed_months("Z2").unwrap().is_empty());
    }

    #[test]
    fn test_close_unknown_zone() {
        let (engine, _) = seeded_engine();
        let err = engine.close_month("NOPE", date(2024, 1, 1), "ana").unwrap_err();
        assert_eq!(err.code(), "ZONE_NOT_FOUND");
    }
}
