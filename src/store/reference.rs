//! Reference data: zones, materials and pieces.

use rusqlite::{OptionalExtension, Row, params};

use crate::error::EngineResult;
use crate::models::{Material, Piece, Zone};

use super::{LedgerStore, optional_decimal_at};

fn map_piece(row: &Row<'_>) -> rusqlite::Result<Piece> {
    Ok(Piece {
        id: row.get(0)?,
        name: row.get(1)?,
        kg_steel_per_unit: optional_decimal_at(row, 2)?,
        m3_concrete_per_unit: optional_decimal_at(row, 3)?,
        ton_weight_per_unit: optional_decimal_at(row, 4)?,
    })
}

fn map_material(row: &Row<'_>) -> rusqlite::Result<Material> {
    Ok(Material {
        id: row.get(0)?,
        name: row.get(1)?,
        unit: row.get(2)?,
        category: row.get(3)?,
    })
}

impl LedgerStore {
    /// Inserts or renames a zone.
    pub fn upsert_zone(&self, zone: &Zone) -> EngineResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO zones (id, name) VALUES (?1, ?2)
             ON CONFLICT(id) DO UPDATE SET name = excluded.name",
            params![zone.id, zone.name],
        )?;
        Ok(())
    }

    /// Looks up a zone.
    pub fn get_zone(&self, zone_id: &str) -> EngineResult<Option<Zone>> {
        let conn = self.get_conn()?;
        let zone = conn
            .query_row(
                "SELECT id, name FROM zones WHERE id = ?1",
                params![zone_id],
                |row| {
                    Ok(Zone {
                        id: row.get(0)?,
                        name: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(zone)
    }

    /// Inserts or updates a material.
    pub fn upsert_material(&self, material: &Material) -> EngineResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO materials (id, name, unit, category) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                unit = excluded.unit,
                category = excluded.category",
            params![material.id, material.name, material.unit, material.category],
        )?;
        Ok(())
    }

    /// Looks up a material.
    pub fn get_material(&self, material_id: &str) -> EngineResult<Option<Material>> {
        let conn = self.get_conn()?;
        let material = conn
            .query_row(
                "SELECT id, name, unit, category FROM materials WHERE id = ?1",
                params![material_id],
                map_material,
            )
            .optional()?;
        Ok(material)
    }

    /// All materials, ordered by id.
    pub fn list_materials(&self) -> EngineResult<Vec<Material>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare("SELECT id, name, unit, category FROM materials ORDER BY id")?;
        let materials = stmt
            .query_map([], map_material)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(materials)
    }

    /// Inserts or updates a piece and its geometry.
    pub fn upsert_piece(&self, piece: &Piece) -> EngineResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO pieces (id, name, kg_steel_per_unit, m3_concrete_per_unit, ton_weight_per_unit)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                kg_steel_per_unit = excluded.kg_steel_per_unit,
                m3_concrete_per_unit = excluded.m3_concrete_per_unit,
                ton_weight_per_unit = excluded.ton_weight_per_unit",
            params![
                piece.id,
                piece.name,
                piece.kg_steel_per_unit.map(|d| d.to_string()),
                piece.m3_concrete_per_unit.map(|d| d.to_string()),
                piece.ton_weight_per_unit.map(|d| d.to_string()),
            ],
        )?;
        Ok(())
    }

    /// Looks up a piece.
    pub fn get_piece(&self, piece_id: &str) -> EngineResult<Option<Piece>> {
        let conn = self.get_conn()?;
        let piece = conn
            .query_row(
                "SELECT id, name, kg_steel_per_unit, m3_concrete_per_unit, ton_weight_per_unit
                 FROM pieces WHERE id = ?1",
                params![piece_id],
                map_piece,
            )
            .optional()?;
        Ok(piece)
    }
}
