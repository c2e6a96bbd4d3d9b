//! SQLite-backed ledger store.
//!
//! One [`LedgerStore`] owns the connection and exposes the reads and writes
//! the engine needs, grouped by ledger:
//!
//! - reference data: pieces, materials, zones
//! - formulas (BOM lines)
//! - material prices, including the listing query builder and batch import
//! - process parameters
//! - published piece prices
//! - period closings
//!
//! Writes that must not interleave (formula replace, price supersede, CSV
//! import) run inside one transaction. Writes into a (zone, month) check the
//! closing inside the same transaction.

mod bom;
mod closings;
mod material_prices;
mod piece_prices;
mod process_parameters;
mod reference;
mod schema;

use std::path::Path;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::NaiveDate;
use rusqlite::types::Type;
use rusqlite::{Connection, Row};
use rust_decimal::Decimal;

use crate::error::{EngineError, EngineResult};

pub use material_prices::build_material_price_query;

/// Handle to the ledger database.
///
/// Cloning is cheap; clones share the same connection.
#[derive(Clone)]
pub struct LedgerStore {
    conn: Arc<Mutex<Connection>>,
}

impl std::fmt::Debug for LedgerStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerStore").finish_non_exhaustive()
    }
}

impl LedgerStore {
    /// Opens (or creates) the database file at `path` and ensures the schema.
    pub fn open<P: AsRef<Path>>(path: P) -> EngineResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| EngineError::Persistence {
                message: format!("Failed to create {}: {}", parent.display(), e),
            })?;
        }
        Self::from_connection(Connection::open(path)?)
    }

    /// Opens a private in-memory database.
    pub fn open_in_memory() -> EngineResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> EngineResult<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.ensure_schema()?;
        Ok(store)
    }

    fn get_conn(&self) -> EngineResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| EngineError::Persistence {
            message: format!("Connection lock poisoned: {}", e),
        })
    }

    fn ensure_schema(&self) -> EngineResult<()> {
        let conn = self.get_conn()?;
        conn.execute_batch(schema::SCHEMA)?;
        Ok(())
    }
}

/// Reads a decimal stored as TEXT.
fn decimal_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Decimal> {
    let text: String = row.get(idx)?;
    Decimal::from_str(&text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Reads a nullable decimal stored as TEXT.
fn optional_decimal_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<Decimal>> {
    let text: Option<String> = row.get(idx)?;
    text.map(|t| {
        Decimal::from_str(&t)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    })
    .transpose()
}

/// Fails with `PERIOD_CLOSED` when (zone, month of `date`) is closed.
///
/// Called from inside write transactions so the check and the write see the
/// same state.
fn ensure_period_open(conn: &Connection, zone_id: &str, date: NaiveDate) -> EngineResult<()> {
    let month = crate::calculation::month_start(date);
    if closings::is_closed(conn, zone_id, month)? {
        return Err(EngineError::conflict(
            "PERIOD_CLOSED",
            format!(
                "Period {} is closed for zone {}",
                month.format("%Y-%m"),
                zone_id
            ),
        ));
    }
    Ok(())
}
