//! Material price ledger operations, CSV import and export.

use std::collections::{BTreeMap, HashSet};
use std::str::FromStr;

use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord, Trim, WriterBuilder};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{info, warn};

use crate::calculation::{month_start, resolve_as_of};
use crate::error::{EngineError, EngineResult};
use crate::models::{
    ImportRowOutcome, ImportRowStatus, ImportSummary, MaterialPriceListing, MaterialPriceQuery,
    MaterialZonePrice, NewMaterialPrice,
};

use super::{AuditAction, AuditEvent, PricingEngine};

/// One line of the export file.
#[derive(Debug, Serialize)]
struct ExportRecord<'a> {
    material_id: &'a str,
    material_name: &'a str,
    unit: &'a str,
    category: &'a str,
    price: Decimal,
    valid_from: NaiveDate,
    valid_until: Option<NaiveDate>,
}

/// Column positions of an import file.
struct ImportColumns {
    material_id: usize,
    price: usize,
    valid_until: Option<usize>,
}

impl ImportColumns {
    fn from_headers(headers: &StringRecord) -> EngineResult<Self> {
        let position = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
        };
        match (position("material_id"), position("price")) {
            (Some(material_id), Some(price)) => Ok(Self {
                material_id,
                price,
                valid_until: position("valid_until"),
            }),
            _ => Err(EngineError::validation(
                "MALFORMED_CSV",
                "CSV header must contain material_id and price columns",
            )),
        }
    }
}

/// A parsed import row that passed every check.
struct ValidRow {
    material_id: String,
    price: Decimal,
    valid_until: Option<NaiveDate>,
}

fn parse_import_row(
    record: &StringRecord,
    columns: &ImportColumns,
    month: NaiveDate,
    known: &HashSet<String>,
    seen: &mut HashSet<String>,
) -> Result<ValidRow, String> {
    let material_id = record.get(columns.material_id).unwrap_or("").to_string();
    if material_id.is_empty() {
        return Err("material_id is empty".to_string());
    }
    if !known.contains(&material_id) {
        return Err(format!("Unknown material {}", material_id));
    }

    let raw_price = record.get(columns.price).unwrap_or("");
    let price = Decimal::from_str(raw_price)
        .map_err(|_| format!("Price '{}' is not a number", raw_price))?;
    if price < Decimal::ZERO {
        return Err(format!("Price must not be negative, got {}", price));
    }

    let valid_until = match columns
        .valid_until
        .and_then(|idx| record.get(idx))
        .filter(|s| !s.is_empty())
    {
        Some(raw) => {
            let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .map_err(|_| format!("valid_until '{}' is not a YYYY-MM-DD date", raw))?;
            if date < month {
                return Err(format!(
                    "valid_until {} is before the month start {}",
                    date, month
                ));
            }
            Some(date)
        }
        None => None,
    };

    if !seen.insert(material_id.clone()) {
        return Err(format!("Material {} appears more than once", material_id));
    }

    Ok(ValidRow {
        material_id,
        price,
        valid_until,
    })
}

impl PricingEngine {
    /// Records a material price from `valid_from`, closing the previous
    /// open-ended price of the same (material, zone).
    pub fn set_material_price(
        &self,
        new: &NewMaterialPrice,
        actor: &str,
    ) -> EngineResult<MaterialZonePrice> {
        self.require_material(&new.material_id)?;
        self.require_zone(&new.zone_id)?;

        if new.price < Decimal::ZERO {
            return Err(EngineError::validation(
                "INVALID_PRICE",
                format!("Price must not be negative, got {}", new.price),
            ));
        }
        if let Some(until) = new.valid_until
            && until < new.valid_from
        {
            return Err(EngineError::validation(
                "INVALID_VALIDITY",
                format!(
                    "valid_until {} is before valid_from {}",
                    until, new.valid_from
                ),
            ));
        }

        let stored = self.store.insert_material_price(new, actor)?;
        info!(
            material_id = %stored.material_id,
            zone_id = %stored.zone_id,
            price = %stored.price,
            valid_from = %stored.valid_from,
            "Material price set"
        );
        self.audit(AuditEvent::new(
            AuditAction::MaterialPriceSet,
            actor,
            stored.id.to_string(),
            Some(&stored.zone_id),
            format!(
                "{} = {} from {}",
                stored.material_id, stored.price, stored.valid_from
            ),
        ));
        Ok(stored)
    }

    /// Marks a price row inactive. The row is kept but never resolved again.
    pub fn deactivate_material_price(&self, id: i64, actor: &str) -> EngineResult<MaterialZonePrice> {
        let price = self
            .store
            .deactivate_material_price(id)?
            .ok_or_else(|| EngineError::not_found("material price", id.to_string()))?;
        self.audit(AuditEvent::new(
            AuditAction::MaterialPriceDeactivated,
            actor,
            id.to_string(),
            Some(&price.zone_id),
            format!("{} from {}", price.material_id, price.valid_from),
        ));
        Ok(price)
    }

    /// Lists material prices. With `as_of`, one resolved row per
    /// (material, zone) is returned.
    pub fn list_material_prices(
        &self,
        query: &MaterialPriceQuery,
    ) -> EngineResult<Vec<MaterialPriceListing>> {
        let rows = self.store.list_material_prices(query)?;
        let Some(as_of) = query.as_of else {
            return Ok(rows);
        };

        let mut groups: BTreeMap<(String, String), Vec<MaterialPriceListing>> = BTreeMap::new();
        for row in rows {
            groups
                .entry((row.price.material_id.clone(), row.price.zone_id.clone()))
                .or_default()
                .push(row);
        }

        Ok(groups
            .into_values()
            .filter_map(|group| {
                let winner = resolve_as_of(group.iter().map(|listing| &listing.price), as_of)?.id;
                group.into_iter().find(|listing| listing.price.id == winner)
            })
            .collect())
    }

    /// Imports a month of prices for a zone from CSV
    /// (`material_id,price[,valid_until]`).
    ///
    /// All-or-nothing: when any row fails, nothing is written and the
    /// summary reports every row.
    pub fn import_material_prices(
        &self,
        zone_id: &str,
        month: NaiveDate,
        csv_text: &str,
        actor: &str,
    ) -> EngineResult<ImportSummary> {
        self.require_zone(zone_id)?;
        let month = month_start(month);
        if self.store.is_month_closed(zone_id, month)? {
            return Err(EngineError::conflict(
                "PERIOD_CLOSED",
                format!(
                    "Period {} is closed for zone {}",
                    month.format("%Y-%m"),
                    zone_id
                ),
            ));
        }

        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(csv_text.as_bytes());
        let columns = ImportColumns::from_headers(reader.headers()?)?;
        let known = self.known_material_ids()?;

        let mut seen = HashSet::new();
        let mut outcomes = Vec::new();
        let mut batch = Vec::new();
        for (idx, record) in reader.records().enumerate() {
            let record = record?;
            if record.iter().all(str::is_empty) {
                continue;
            }
            let row = idx + 1;
            match parse_import_row(&record, &columns, month, &known, &mut seen) {
                Ok(valid) => {
                    outcomes.push(ImportRowOutcome {
                        row,
                        material_id: valid.material_id.clone(),
                        price: Some(valid.price),
                        status: ImportRowStatus::Ok,
                        error: None,
                    });
                    batch.push(NewMaterialPrice {
                        material_id: valid.material_id,
                        zone_id: zone_id.to_string(),
                        price: valid.price,
                        valid_from: month,
                        valid_until: valid.valid_until,
                    });
                }
                Err(message) => outcomes.push(ImportRowOutcome {
                    row,
                    material_id: record.get(columns.material_id).unwrap_or("").to_string(),
                    price: record
                        .get(columns.price)
                        .and_then(|raw| Decimal::from_str(raw).ok()),
                    status: ImportRowStatus::Failed,
                    error: Some(message),
                }),
            }
        }

        if outcomes.is_empty() {
            return Err(EngineError::validation(
                "MALFORMED_CSV",
                "CSV contains no data rows",
            ));
        }

        let failed = outcomes
            .iter()
            .filter(|o| o.status == ImportRowStatus::Failed)
            .count();
        let applied = failed == 0;
        if applied {
            self.store.insert_material_prices(&batch, actor)?;
            info!(zone_id = %zone_id, month = %month, rows = batch.len(), "Material prices imported");
            self.audit(AuditEvent::new(
                AuditAction::MaterialPricesImported,
                actor,
                zone_id,
                Some(zone_id),
                format!("{} price(s) for {}", batch.len(), month.format("%Y-%m")),
            ));
        } else {
            warn!(zone_id = %zone_id, month = %month, failed, "Material price import rejected");
        }

        Ok(ImportSummary {
            zone_id: zone_id.to_string(),
            month,
            applied,
            total_rows: outcomes.len(),
            succeeded: outcomes.len() - failed,
            failed,
            rows: outcomes,
        })
    }

    /// Exports the price of every material priced in the zone as of a date,
    /// ordered by material id, as CSV.
    pub fn export_material_prices(&self, zone_id: &str, as_of: NaiveDate) -> EngineResult<String> {
        self.require_zone(zone_id)?;
        let listings = self.list_material_prices(&MaterialPriceQuery {
            zone_id: Some(zone_id.to_string()),
            as_of: Some(as_of),
            ..MaterialPriceQuery::default()
        })?;

        let mut writer = WriterBuilder::new().from_writer(Vec::new());
        for listing in &listings {
            writer.serialize(ExportRecord {
                material_id: &listing.price.material_id,
                material_name: &listing.material_name,
                unit: &listing.unit,
                category: &listing.category,
                price: listing.price.price,
                valid_from: listing.price.valid_from,
                valid_until: listing.price.valid_until,
            })?;
        }
        if listings.is_empty() {
            writer.write_record([
                "material_id",
                "material_name",
                "unit",
                "category",
                "price",
                "valid_from",
                "valid_until",
            ])?;
        }

        let bytes = writer.into_inner().map_err(|e| EngineError::Persistence {
            message: format!("Failed to write CSV export: {}", e),
        })?;
        String::from_utf8(bytes).map_err(|e| EngineError::Persistence {
            message: format!("CSV export is not UTF-8: {}", e),
        })
    }
}
