//! Material price ledger.
//!
//! Rows are never deleted. A new open-ended price closes the earlier
//! open-ended row of the same (material, zone) the day before it starts.

use chrono::{NaiveDate, Utc};
use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter};

use crate::error::EngineResult;
use crate::models::{MaterialPriceListing, MaterialPriceQuery, MaterialZonePrice, NewMaterialPrice};

use super::{LedgerStore, decimal_at, ensure_period_open};

const PRICE_COLUMNS: &str = "p.id, p.material_id, p.zone_id, p.price, p.valid_from, p.valid_until, \
     p.active, p.created_by, p.created_at";

fn map_price(row: &Row<'_>) -> rusqlite::Result<MaterialZonePrice> {
    Ok(MaterialZonePrice {
        id: row.get(0)?,
        material_id: row.get(1)?,
        zone_id: row.get(2)?,
        price: decimal_at(row, 3)?,
        valid_from: row.get(4)?,
        valid_until: row.get(5)?,
        active: row.get::<_, i64>(6)? != 0,
        created_by: row.get(7)?,
        created_at: row.get(8)?,
    })
}

fn map_listing(row: &Row<'_>) -> rusqlite::Result<MaterialPriceListing> {
    Ok(MaterialPriceListing {
        price: map_price(row)?,
        material_name: row.get(9)?,
        unit: row.get(10)?,
        category: row.get(11)?,
    })
}

fn date_value(date: NaiveDate) -> Value {
    Value::from(date.format("%Y-%m-%d").to_string())
}

/// Builds the listing SQL and its positional parameters for a query.
///
/// Every filter of [`MaterialPriceQuery`] is interpreted here and nowhere
/// else. `as_of` keeps only rows whose validity window contains the date;
/// picking one row per (material, zone) is left to the resolver.
///
/// # Example
///
/// ```
/// use precast_pricing::models::MaterialPriceQuery;
/// use precast_pricing::store::build_material_price_query;
///
/// let query = MaterialPriceQuery {
///     zone_id: Some("NORTH".to_string()),
///     ..MaterialPriceQuery::default()
/// };
/// let (sql, params) = build_material_price_query(&query);
/// assert!(sql.contains("p.zone_id = ?1"));
/// assert_eq!(params.len(), 1);
/// ```
pub fn build_material_price_query(query: &MaterialPriceQuery) -> (String, Vec<Value>) {
    let mut sql = format!(
        "SELECT {PRICE_COLUMNS}, m.name, m.unit, m.category \
         FROM material_zone_prices p JOIN materials m ON m.id = p.material_id"
    );
    let mut clauses: Vec<String> = Vec::new();
    let mut values: Vec<Value> = Vec::new();

    if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        values.push(Value::from(format!("%{}%", search)));
        let idx = values.len();
        clauses.push(format!("(m.name LIKE ?{idx} OR m.id LIKE ?{idx})"));
    }
    if let Some(category) = &query.category {
        values.push(Value::from(category.clone()));
        clauses.push(format!("m.category = ?{}", values.len()));
    }
    if let Some(zone_id) = &query.zone_id {
        values.push(Value::from(zone_id.clone()));
        clauses.push(format!("p.zone_id = ?{}", values.len()));
    }
    if let Some(material_id) = &query.material_id {
        values.push(Value::from(material_id.clone()));
        clauses.push(format!("p.material_id = ?{}", values.len()));
    }
    if query.active_only || query.as_of.is_some() {
        clauses.push("p.active = 1".to_string());
    }
    if let Some(as_of) = query.as_of {
        values.push(date_value(as_of));
        let idx = values.len();
        clauses.push(format!(
            "p.valid_from <= ?{idx} AND (p.valid_until IS NULL OR p.valid_until >= ?{idx})"
        ));
    }

    if !clauses.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }
    sql.push_str(" ORDER BY p.material_id, p.zone_id, p.valid_from, p.id");

    (sql, values)
}

/// Closes open-ended active rows that started before `new.valid_from`.
///
/// Only an open-ended row supersedes. A bounded row overlays the standing
/// price, which applies again once the bounded window ends.
fn supersede_open_rows(conn: &Connection, new: &NewMaterialPrice) -> EngineResult<usize> {
    if new.valid_until.is_some() {
        return Ok(0);
    }
    let Some(closed_until) = new.valid_from.pred_opt() else {
        return Ok(0);
    };
    let changed = conn.execute(
        "UPDATE material_zone_prices SET valid_until = ?1
         WHERE material_id = ?2 AND zone_id = ?3 AND active = 1
           AND valid_until IS NULL AND valid_from < ?4",
        params![closed_until, new.material_id, new.zone_id, new.valid_from],
    )?;
    Ok(changed)
}

fn insert_price(
    conn: &Connection,
    new: &NewMaterialPrice,
    actor: &str,
) -> EngineResult<MaterialZonePrice> {
    ensure_period_open(conn, &new.zone_id, new.valid_from)?;
    supersede_open_rows(conn, new)?;

    let created_at = Utc::now();
    conn.execute(
        "INSERT INTO material_zone_prices
            (material_id, zone_id, price, valid_from, valid_until, active, created_by, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6, ?7)",
        params![
            new.material_id,
            new.zone_id,
            new.price.to_string(),
            new.valid_from,
            new.valid_until,
            actor,
            created_at,
        ],
    )?;

    Ok(MaterialZonePrice {
        id: conn.last_insert_rowid(),
        material_id: new.material_id.clone(),
        zone_id: new.zone_id.clone(),
        price: new.price,
        valid_from: new.valid_from,
        valid_until: new.valid_until,
        active: true,
        created_by: actor.to_string(),
        created_at,
    })
}

impl LedgerStore {
    /// Records a price, superseding earlier open-ended rows, in one
    /// transaction.
    pub fn insert_material_price(
        &self,
        new: &NewMaterialPrice,
        actor: &str,
    ) -> EngineResult<MaterialZonePrice> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        let stored = insert_price(&tx, new, actor)?;
        tx.commit()?;
        Ok(stored)
    }

    /// Records a batch of prices all-or-nothing.
    pub fn insert_material_prices(
        &self,
        batch: &[NewMaterialPrice],
        actor: &str,
    ) -> EngineResult<Vec<MaterialZonePrice>> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        let stored = batch
            .iter()
            .map(|new| insert_price(&tx, new, actor))
            .collect::<EngineResult<Vec<_>>>()?;
        tx.commit()?;
        Ok(stored)
    }

    /// Looks up a price row by id.
    pub fn get_material_price(&self, id: i64) -> EngineResult<Option<MaterialZonePrice>> {
        let conn = self.get_conn()?;
        let price = conn
            .query_row(
                &format!("SELECT {PRICE_COLUMNS} FROM material_zone_prices p WHERE p.id = ?1"),
                params![id],
                map_price,
            )
            .optional()?;
        Ok(price)
    }

    /// Marks a price inactive; returns the updated row, or `None` if unknown.
    pub fn deactivate_material_price(&self, id: i64) -> EngineResult<Option<MaterialZonePrice>> {
        {
            let conn = self.get_conn()?;
            let changed = conn.execute(
                "UPDATE material_zone_prices SET active = 0 WHERE id = ?1",
                params![id],
            )?;
            if changed == 0 {
                return Ok(None);
            }
        }
        self.get_material_price(id)
    }

    /// Every price row of the given materials in a zone, active or not.
    pub fn material_prices_for(
        &self,
        zone_id: &str,
        material_ids: &[String],
    ) -> EngineResult<Vec<MaterialZonePrice>> {
        if material_ids.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = (0..material_ids.len())
            .map(|i| format!("?{}", i + 2))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "SELECT {PRICE_COLUMNS} FROM material_zone_prices p
             WHERE p.zone_id = ?1 AND p.material_id IN ({placeholders})
             ORDER BY p.material_id, p.valid_from, p.id"
        );

        let mut values = vec![Value::from(zone_id.to_string())];
        values.extend(material_ids.iter().map(|id| Value::from(id.clone())));

        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(values), map_price)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Runs a listing query. With `as_of` the rows are window-filtered but
    /// not yet resolved to one per (material, zone).
    pub fn list_material_prices(
        &self,
        query: &MaterialPriceQuery,
    ) -> EngineResult<Vec<MaterialPriceListing>> {
        let (sql, values) = build_material_price_query(query);
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(values), map_listing)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{date, dec, seeded_store};
    use super::*;
    use crate::error::EngineError;
    use crate::models::PeriodClosing;

    fn new_price(material: &str, price: &str, from: NaiveDate) -> NewMaterialPrice {
        NewMaterialPrice {
            material_id: material.to_string(),
            zone_id: "Z1".to_string(),
            price: dec(price),
            valid_from: from,
            valid_until: None,
        }
    }

    #[test]
    fn test_query_builder_without_filters() {
        let query = MaterialPriceQuery {
            active_only: false,
            ..MaterialPriceQuery::default()
        };
        let (sql, values) = build_material_price_query(&query);
        assert!(!sql.contains("WHERE"));
        assert!(sql.ends_with("ORDER BY p.material_id, p.zone_id, p.valid_from, p.id"));
        assert!(values.is_empty());
    }

    #[test]
    fn test_query_builder_numbers_parameters_in_order() {
        let query = MaterialPriceQuery {
            search: Some("  cem ".to_string()),
            category: Some("binders".to_string()),
            zone_id: Some("Z1".to_string()),
            material_id: Some("A".to_string()),
            as_of: Some(date(2024, 2, 1)),
            active_only: false,
        };
        let (sql, values) = build_material_price_query(&query);

        assert!(sql.contains("(m.name LIKE ?1 OR m.id LIKE ?1)"));
        assert!(sql.contains("m.category = ?2"));
        assert!(sql.contains("p.zone_id = ?3"));
        assert!(sql.contains("p.material_id = ?4"));
        assert!(sql.contains("p.active = 1"));
        assert!(sql.contains("p.valid_from <= ?5 AND (p.valid_until IS NULL OR p.valid_until >= ?5)"));
        assert_eq!(
            values,
            vec![
                Value::from("%cem%".to_string()),
                Value::from("binders".to_string()),
                Value::from("Z1".to_string()),
                Value::from("A".to_string()),
                Value::from("2024-02-01".to_string()),
            ]
        );
    }

    #[test]
    fn test_query_builder_ignores_blank_search() {
        let query = MaterialPriceQuery {
            search: Some("   ".to_string()),
            ..MaterialPriceQuery::default()
        };
        let (sql, values) = build_material_price_query(&query);
        assert!(!sql.contains("LIKE"));
        assert!(sql.contains("WHERE p.active = 1"));
        assert!(values.is_empty());
    }

    #[test]
    fn test_new_price_supersedes_open_row() {
        let store = seeded_store();
        let first = store
            .insert_material_price(&new_price("A", "10", date(2024, 1, 1)), "ana")
            .unwrap();
        store
            .insert_material_price(&new_price("A", "12", date(2024, 3, 1)), "ana")
            .unwrap();

        let first = store.get_material_price(first.id).unwrap().unwrap();
        assert_eq!(first.valid_until, Some(date(2024, 2, 29)));
        assert_eq!(first.created_by, "ana");
    }

    #[test]
    fn test_bounded_row_is_not_superseded() {
        let store = seeded_store();
        let mut bounded = new_price("A", "10", date(2024, 1, 1));
        bounded.valid_until = Some(date(2024, 1, 31));
        let bounded = store.insert_material_price(&bounded, "ana").unwrap();
        store
            .insert_material_price(&new_price("A", "12", date(2024, 3, 1)), "ana")
            .unwrap();

        let bounded = store.get_material_price(bounded.id).unwrap().unwrap();
        assert_eq!(bounded.valid_until, Some(date(2024, 1, 31)));
    }

    #[test]
    fn test_bounded_new_row_leaves_open_row_in_place() {
        let store = seeded_store();
        let standing = store
            .insert_material_price(&new_price("A", "10", date(2024, 1, 1)), "ana")
            .unwrap();
        let mut promo = new_price("A", "8", date(2024, 3, 1));
        promo.valid_until = Some(date(2024, 3, 15));
        store.insert_material_price(&promo, "ana").unwrap();

        let standing = store.get_material_price(standing.id).unwrap().unwrap();
        assert_eq!(standing.valid_until, None);
    }

    #[test]
    fn test_batch_is_all_or_nothing() {
        let store = seeded_store();
        let batch = vec![
            new_price("A", "10", date(2024, 1, 1)),
            new_price("UNKNOWN", "5", date(2024, 1, 1)),
        ];
        assert!(store.insert_material_prices(&batch, "ana").is_err());

        let rows = store
            .material_prices_for("Z1", &["A".to_string()])
            .unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_insert_into_closed_period_conflicts() {
        let store = seeded_store();
        store
            .insert_period_closing(&PeriodClosing {
                zone_id: "Z1".to_string(),
                month: date(2024, 1, 1),
                closed_by: "ana".to_string(),
                closed_at: Utc::now(),
            })
            .unwrap();

        let result = store.insert_material_price(&new_price("A", "10", date(2024, 1, 20)), "ana");
        match result {
            Err(EngineError::Conflict { code, .. }) => assert_eq!(code, "PERIOD_CLOSED"),
            other => panic!("Expected PERIOD_CLOSED, got {:?}", other),
        }
    }

    #[test]
    fn test_deactivate_and_listing_filters() {
        let store = seeded_store();
        let a = store
            .insert_material_price(&new_price("A", "10", date(2024, 1, 1)), "ana")
            .unwrap();
        store
            .insert_material_price(&new_price("B", "5", date(2024, 1, 1)), "ana")
            .unwrap();

        let deactivated = store.deactivate_material_price(a.id).unwrap().unwrap();
        assert!(!deactivated.active);
        assert!(store.deactivate_material_price(999).unwrap().is_none());

        let active = store
            .list_material_prices(&MaterialPriceQuery::default())
            .unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].price.material_id, "B");
        assert_eq!(active[0].material_name, "Sand");

        let all = store
            .list_material_prices(&MaterialPriceQuery {
                active_only: false,
                ..MaterialPriceQuery::default()
            })
            .unwrap();
        assert_eq!(all.len(), 2);

        let searched = store
            .list_material_prices(&MaterialPriceQuery {
                search: Some("san".to_string()),
                ..MaterialPriceQuery::default()
            })
            .unwrap();
        assert_eq!(searched.len(), 1);
    }

    #[test]
    fn test_listing_as_of_filters_window() {
        let store = seeded_store();
        store
            .insert_material_price(&new_price("A", "10", date(2024, 1, 1)), "ana")
            .unwrap();
        store
            .insert_material_price(&new_price("A", "12", date(2024, 3, 1)), "ana")
            .unwrap();

        let feb = store
            .list_material_prices(&MaterialPriceQuery {
                as_of: Some(date(2024, 2, 15)),
                ..MaterialPriceQuery::default()
            })
            .unwrap();
        assert_eq!(feb.len(), 1);
        assert_eq!(feb[0].price.price, dec("10"));
    }
}
