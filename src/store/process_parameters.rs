//! Process parameters, one row per (zone, month).

use chrono::NaiveDate;
use rusqlite::{OptionalExtension, Row, params};

use crate::calculation::month_start;
use crate::error::EngineResult;
use crate::models::{ProcessParameters, ProcessRates};

use super::{LedgerStore, decimal_at, ensure_period_open};

const COLUMNS: &str = "zone_id, month, energy_per_ton, overhead_factory_per_ton, \
     overhead_company_per_ton, profit_per_ton, engineering_per_ton, labor_rate_per_hour, \
     hours_per_ton_steel, hours_per_m3_concrete, updated_by, updated_at";

fn map_parameters(row: &Row<'_>) -> rusqlite::Result<ProcessParameters> {
    Ok(ProcessParameters {
        zone_id: row.get(0)?,
        month: row.get(1)?,
        rates: ProcessRates {
            energy_per_ton: decimal_at(row, 2)?,
            overhead_factory_per_ton: decimal_at(row, 3)?,
            overhead_company_per_ton: decimal_at(row, 4)?,
            profit_per_ton: decimal_at(row, 5)?,
            engineering_per_ton: decimal_at(row, 6)?,
            labor_rate_per_hour: decimal_at(row, 7)?,
            hours_per_ton_steel: decimal_at(row, 8)?,
            hours_per_m3_concrete: decimal_at(row, 9)?,
        },
        updated_by: row.get(10)?,
        updated_at: row.get(11)?,
    })
}

impl LedgerStore {
    /// Inserts or replaces the parameters of (zone, month).
    ///
    /// `params.month` is normalised to the first day of its month.
    pub fn upsert_process_parameters(
        &self,
        parameters: &ProcessParameters,
    ) -> EngineResult<ProcessParameters> {
        let month = month_start(parameters.month);
        let rates = &parameters.rates;

        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        ensure_period_open(&tx, &parameters.zone_id, month)?;
        tx.execute(
            &format!(
                "INSERT INTO process_parameters ({COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
                 ON CONFLICT(zone_id, month) DO UPDATE SET
                    energy_per_ton = excluded.energy_per_ton,
                    overhead_factory_per_ton = excluded.overhead_factory_per_ton,
                    overhead_company_per_ton = excluded.overhead_company_per_ton,
                    profit_per_ton = excluded.profit_per_ton,
                    engineering_per_ton = excluded.engineering_per_ton,
                    labor_rate_per_hour = excluded.labor_rate_per_hour,
                    hours_per_ton_steel = excluded.hours_per_ton_steel,
                    hours_per_m3_concrete = excluded.hours_per_m3_concrete,
                    updated_by = excluded.updated_by,
                    updated_at = excluded.updated_at"
            ),
            params![
                parameters.zone_id,
                month,
                rates.energy_per_ton.to_string(),
                rates.overhead_factory_per_ton.to_string(),
                rates.overhead_company_per_ton.to_string(),
                rates.profit_per_ton.to_string(),
                rates.engineering_per_ton.to_string(),
                rates.labor_rate_per_hour.to_string(),
                rates.hours_per_ton_steel.to_string(),
                rates.hours_per_m3_concrete.to_string(),
                parameters.updated_by,
                parameters.updated_at,
            ],
        )?;
        tx.commit()?;

        Ok(ProcessParameters {
            month,
            ..parameters.clone()
        })
    }

    /// The row stored for exactly (zone, month), without fallback.
    pub fn get_process_parameters(
        &self,
        zone_id: &str,
        month: NaiveDate,
    ) -> EngineResult<Option<ProcessParameters>> {
        let conn = self.get_conn()?;
        let row = conn
            .query_row(
                &format!("SELECT {COLUMNS} FROM process_parameters WHERE zone_id = ?1 AND month = ?2"),
                params![zone_id, month_start(month)],
                map_parameters,
            )
            .optional()?;
        Ok(row)
    }

    /// Rows of a zone whose month lies in `[from, to]`, oldest first.
    pub fn process_parameters_between(
        &self,
        zone_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> EngineResult<Vec<ProcessParameters>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {COLUMNS} FROM process_parameters
             WHERE zone_id = ?1 AND month BETWEEN ?2 AND ?3
             ORDER BY month"
        ))?;
        let rows = stmt
            .query_map(
                params![zone_id, month_start(from), month_start(to)],
                map_parameters,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{date, dec, seeded_store};
    use super::*;
    use chrono::Utc;

    fn parameters(month: NaiveDate, energy: &str) -> ProcessParameters {
        ProcessParameters {
            zone_id: "Z1".to_string(),
            month,
            rates: ProcessRates {
                energy_per_ton: dec(energy),
                labor_rate_per_hour: dec("25.50"),
                ..ProcessRates::default()
            },
            updated_by: "ana".to_string(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_upsert_normalises_month_and_replaces() {
        let store = seeded_store();
        let stored = store
            .upsert_process_parameters(&parameters(date(2024, 1, 17), "50"))
            .unwrap();
        assert_eq!(stored.month, date(2024, 1, 1));

        store
            .upsert_process_parameters(&parameters(date(2024, 1, 1), "55"))
            .unwrap();

        let row = store
            .get_process_parameters("Z1", date(2024, 1, 31))
            .unwrap()
            .unwrap();
        assert_eq!(row.rates.energy_per_ton, dec("55"));
        assert_eq!(row.rates.labor_rate_per_hour, dec("25.50"));
    }

    #[test]
    fn test_between_returns_months_in_range() {
        let store = seeded_store();
        for (month, energy) in [(1, "50"), (2, "51"), (3, "52")] {
            store
                .upsert_process_parameters(&parameters(date(2024, month, 1), energy))
                .unwrap();
        }

        let rows = store
            .process_parameters_between("Z1", date(2024, 1, 1), date(2024, 2, 15))
            .unwrap();
        let months: Vec<_> = rows.iter().map(|r| r.month).collect();
        assert_eq!(months, vec![date(2024, 1, 1), date(2024, 2, 1)]);
    }

    #[test]
    fn test_missing_month_is_none() {
        let store = seeded_store();
        assert!(store
            .get_process_parameters("Z1", date(2024, 5, 1))
            .unwrap()
            .is_none());
    }
}
