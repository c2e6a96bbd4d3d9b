//! Table definitions. Applied on every open; every statement is idempotent.
//!
//! Decimals are TEXT so values round-trip exactly. Dates are ISO-8601 TEXT.

pub(super) const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS zones (
    id   TEXT PRIMARY KEY,
    name TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS materials (
    id       TEXT PRIMARY KEY,
    name     TEXT NOT NULL,
    unit     TEXT NOT NULL,
    category TEXT NOT NULL DEFAULT ''
);

CREATE TABLE IF NOT EXISTS pieces (
    id                   TEXT PRIMARY KEY,
    name                 TEXT NOT NULL,
    kg_steel_per_unit    TEXT,
    m3_concrete_per_unit TEXT,
    ton_weight_per_unit  TEXT
);

CREATE TABLE IF NOT EXISTS bom_lines (
    id                INTEGER PRIMARY KEY AUTOINCREMENT,
    piece_id          TEXT NOT NULL REFERENCES pieces(id),
    material_id       TEXT NOT NULL REFERENCES materials(id),
    quantity_per_unit TEXT NOT NULL,
    waste_factor      TEXT NOT NULL DEFAULT '0'
);

CREATE INDEX IF NOT EXISTS idx_bom_lines_piece ON bom_lines(piece_id);

CREATE TABLE IF NOT EXISTS material_zone_prices (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    material_id TEXT NOT NULL REFERENCES materials(id),
    zone_id     TEXT NOT NULL REFERENCES zones(id),
    price       TEXT NOT NULL,
    valid_from  TEXT NOT NULL,
    valid_until TEXT,
    active      INTEGER NOT NULL DEFAULT 1,
    created_by  TEXT NOT NULL,
    created_at  TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_material_zone_prices_lookup
    ON material_zone_prices(zone_id, material_id, valid_from);

CREATE TABLE IF NOT EXISTS process_parameters (
    zone_id                  TEXT NOT NULL REFERENCES zones(id),
    month                    TEXT NOT NULL,
    energy_per_ton           TEXT NOT NULL,
    overhead_factory_per_ton TEXT NOT NULL,
    overhead_company_per_ton TEXT NOT NULL,
    profit_per_ton           TEXT NOT NULL,
    engineering_per_ton      TEXT NOT NULL,
    labor_rate_per_hour      TEXT NOT NULL,
    hours_per_ton_steel      TEXT NOT NULL,
    hours_per_m3_concrete    TEXT NOT NULL,
    updated_by               TEXT NOT NULL,
    updated_at               TEXT NOT NULL,
    PRIMARY KEY (zone_id, month)
);

CREATE TABLE IF NOT EXISTS piece_zone_prices (
    id             INTEGER PRIMARY KEY AUTOINCREMENT,
    piece_id       TEXT NOT NULL REFERENCES pieces(id),
    zone_id        TEXT NOT NULL REFERENCES zones(id),
    effective_date TEXT NOT NULL,
    base_price     TEXT NOT NULL,
    adjustment     TEXT NOT NULL DEFAULT '0',
    created_by     TEXT NOT NULL,
    updated_at     TEXT NOT NULL,
    UNIQUE (piece_id, zone_id, effective_date)
);

CREATE TABLE IF NOT EXISTS period_closings (
    zone_id   TEXT NOT NULL REFERENCES zones(id),
    month     TEXT NOT NULL,
    closed_by TEXT NOT NULL,
    closed_at TEXT NOT NULL,
    PRIMARY KEY (zone_id, month)
);
"#;
