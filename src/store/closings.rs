//! Period closings.

use chrono::NaiveDate;
use rusqlite::{Connection, ErrorCode, params};

use crate::calculation::month_start;
use crate::error::{EngineError, EngineResult};
use crate::models::PeriodClosing;

use super::LedgerStore;

pub(super) fn is_closed(conn: &Connection, zone_id: &str, month: NaiveDate) -> EngineResult<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM period_closings WHERE zone_id = ?1 AND month = ?2",
        params![zone_id, month_start(month)],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

impl LedgerStore {
    /// Records a closing. The primary key makes a second closing of the same
    /// (zone, month) fail with `PERIOD_ALREADY_CLOSED`.
    pub fn insert_period_closing(&self, closing: &PeriodClosing) -> EngineResult<PeriodClosing> {
        let month = month_start(closing.month);
        let conn = self.get_conn()?;
        let result = conn.execute(
            "INSERT INTO period_closings (zone_id, month, closed_by, closed_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![closing.zone_id, month, closing.closed_by, closing.closed_at],
        );

        match result {
            Ok(_) => Ok(PeriodClosing {
                month,
                ..closing.clone()
            }),
            Err(rusqlite::Error::SqliteFailure(err, message))
                if err.code == ErrorCode::ConstraintViolation =>
            {
                if is_closed(&conn, &closing.zone_id, month)? {
                    Err(EngineError::conflict(
                        "PERIOD_ALREADY_CLOSED",
                        format!(
                            "Period {} is already closed for zone {}",
                            month.format("%Y-%m"),
                            closing.zone_id
                        ),
                    ))
                } else {
                    Err(rusqlite::Error::SqliteFailure(err, message).into())
                }
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Whether (zone, month) has a closing row; `month` may be any day of it.
    pub fn is_month_closed(&self, zone_id: &str, month: NaiveDate) -> EngineResult<bool> {
        let conn = self.get_conn()?;
        is_closed(&conn, zone_id, month)
    }

    /// Closings of a zone, most recent month first.
    pub fn list_period_closings(&self, zone_id: &str) -> EngineResult<Vec<PeriodClosing>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT zone_id, month, closed_by, closed_at FROM period_closings
             WHERE zone_id = ?1 ORDER BY month DESC",
        )?;
        let rows = stmt
            .query_map(params![zone_id], |row| {
                Ok(PeriodClosing {
                    zone_id: row.get(0)?,
                    month: row.get(1)?,
                    closed_by: row.get(2)?,
                    closed_at: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{date, seeded_store};
    use super::*;
    use chrono::Utc;

    fn closing(month: NaiveDate) -> PeriodClosing {
        PeriodClosing {
            zone_id: "Z1".to_string(),
            month,
            closed_by: "ana".to_string(),
            closed_at: Utc::now(),
        }
    }

    #[test]
    fn test_second_closing_conflicts() {
        let store = seeded_store();
        let stored = store.insert_period_closing(&closing(date(2024, 1, 9))).unwrap();
        assert_eq!(stored.month, date(2024, 1, 1));

        match store.insert_period_closing(&closing(date(2024, 1, 1))) {
            Err(EngineError::Conflict { code, .. }) => assert_eq!(code, "PERIOD_ALREADY_CLOSED"),
            other => panic!("Expected PERIOD_ALREADY_CLOSED, got {:?}", other),
        }
    }

    #[test]
    fn test_closed_state_and_listing() {
        let store = seeded_store();
        store.insert_period_closing(&closing(date(2024, 1, 1))).unwrap();
        store.insert_period_closing(&closing(date(2024, 2, 1))).unwrap();

        assert!(store.is_month_closed("Z1", date(2024, 1, 31)).unwrap());
        assert!(!store.is_month_closed("Z1", date(2024, 3, 1)).unwrap());

        let months: Vec<_> = store
            .list_period_closings("Z1")
            .unwrap()
            .into_iter()
            .map(|c| c.month)
            .collect();
        assert_eq!(months, vec![date(2024, 2, 1), date(2024, 1, 1)]);
    }
}
