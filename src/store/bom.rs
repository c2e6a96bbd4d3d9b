//! Formula lines.

use rusqlite::{Connection, Row, params};

use crate::error::EngineResult;
use crate::models::{BomLine, BomLineInput};

use super::{LedgerStore, decimal_at};

const SELECT_LINES: &str = "SELECT id, piece_id, material_id, quantity_per_unit, waste_factor
     FROM bom_lines WHERE piece_id = ?1 ORDER BY id";

fn map_line(row: &Row<'_>) -> rusqlite::Result<BomLine> {
    Ok(BomLine {
        id: row.get(0)?,
        piece_id: row.get(1)?,
        material_id: row.get(2)?,
        quantity_per_unit: decimal_at(row, 3)?,
        waste_factor: decimal_at(row, 4)?,
    })
}

fn insert_line(conn: &Connection, piece_id: &str, line: &BomLineInput) -> EngineResult<BomLine> {
    conn.execute(
        "INSERT INTO bom_lines (piece_id, material_id, quantity_per_unit, waste_factor)
         VALUES (?1, ?2, ?3, ?4)",
        params![
            piece_id,
            line.material_id,
            line.quantity_per_unit.to_string(),
            line.waste_factor.to_string(),
        ],
    )?;
    Ok(BomLine {
        id: conn.last_insert_rowid(),
        piece_id: piece_id.to_string(),
        material_id: line.material_id.clone(),
        quantity_per_unit: line.quantity_per_unit,
        waste_factor: line.waste_factor,
    })
}

impl LedgerStore {
    /// The current formula lines of a piece, in insertion order.
    pub fn list_bom_lines(&self, piece_id: &str) -> EngineResult<Vec<BomLine>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(SELECT_LINES)?;
        let lines = stmt
            .query_map(params![piece_id], map_line)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(lines)
    }

    /// Replaces every line of a piece in one transaction.
    pub fn replace_bom_lines(
        &self,
        piece_id: &str,
        lines: &[BomLineInput],
    ) -> EngineResult<Vec<BomLine>> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM bom_lines WHERE piece_id = ?1", params![piece_id])?;
        let stored = lines
            .iter()
            .map(|line| insert_line(&tx, piece_id, line))
            .collect::<EngineResult<Vec<_>>>()?;
        tx.commit()?;
        Ok(stored)
    }

    /// Appends one line to a piece's formula.
    pub fn insert_bom_line(&self, piece_id: &str, line: &BomLineInput) -> EngineResult<BomLine> {
        let conn = self.get_conn()?;
        insert_line(&conn, piece_id, line)
    }

    /// Deletes a line; returns false when the line is not on the piece.
    pub fn delete_bom_line(&self, piece_id: &str, line_id: i64) -> EngineResult<bool> {
        let conn = self.get_conn()?;
        let changed = conn.execute(
            "DELETE FROM bom_lines WHERE id = ?1 AND piece_id = ?2",
            params![line_id, piece_id],
        )?;
        Ok(changed > 0)
    }
}
