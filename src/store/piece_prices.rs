//! Published piece prices.

use chrono::Utc;
use rusqlite::{Row, params};

use crate::error::EngineResult;
use crate::models::{NewPieceZonePrice, PieceZonePrice};

use super::{LedgerStore, decimal_at, ensure_period_open};

const COLUMNS: &str =
    "id, piece_id, zone_id, effective_date, base_price, adjustment, created_by, updated_at";

fn map_price(row: &Row<'_>) -> rusqlite::Result<PieceZonePrice> {
    Ok(PieceZonePrice {
        id: row.get(0)?,
        piece_id: row.get(1)?,
        zone_id: row.get(2)?,
        effective_date: row.get(3)?,
        base_price: decimal_at(row, 4)?,
        adjustment: decimal_at(row, 5)?,
        created_by: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

impl LedgerStore {
    /// Inserts the price or overwrites the one already stored for
    /// (piece, zone, effective_date), atomically.
    pub fn upsert_piece_price(&self, new: &NewPieceZonePrice) -> EngineResult<PieceZonePrice> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        ensure_period_open(&tx, &new.zone_id, new.effective_date)?;

        let stored = tx.query_row(
            &format!(
                "INSERT INTO piece_zone_prices
                    (piece_id, zone_id, effective_date, base_price, adjustment, created_by, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT(piece_id, zone_id, effective_date) DO UPDATE SET
                    base_price = excluded.base_price,
                    adjustment = excluded.adjustment,
                    created_by = excluded.created_by,
                    updated_at = excluded.updated_at
                 RETURNING {COLUMNS}"
            ),
            params![
                new.piece_id,
                new.zone_id,
                new.effective_date,
                new.base_price.to_string(),
                new.adjustment.to_string(),
                new.created_by,
                Utc::now(),
            ],
            map_price,
        )?;
        tx.commit()?;
        Ok(stored)
    }

    /// Published prices of a piece, optionally restricted to one zone,
    /// ordered by effective date then zone.
    pub fn piece_prices(
        &self,
        piece_id: &str,
        zone_id: Option<&str>,
    ) -> EngineResult<Vec<PieceZonePrice>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {COLUMNS} FROM piece_zone_prices
             WHERE piece_id = ?1 AND (?2 IS NULL OR zone_id = ?2)
             ORDER BY effective_date, zone_id"
        ))?;
        let rows = stmt
            .query_map(params![piece_id, zone_id], map_price)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}
