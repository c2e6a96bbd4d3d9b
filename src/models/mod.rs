//! Core data models for the precast pricing engine.
//!
//! This module contains all the domain models used throughout the engine.

mod bom;
mod breakdown;
mod history;
mod ledger;
mod query;
mod reference;

pub use bom::{BomLine, BomLineInput, Formula, FormulaIssue, FormulaValidation};
pub use breakdown::{
    BreakdownWarning, CostBreakdown, MaterialCostLine, ProcessCostTerms, WARN_COST_OVERFLOW,
    WARN_EMPTY_FORMULA,
    WARN_MISSING_GEOMETRY, WARN_MISSING_MATERIAL_PRICE, WARN_MISSING_PROCESS_PARAMS,
    WARN_PROCESS_PARAMS_FALLBACK,
};
pub use history::{HistoryEntry, PriceComparison, Trend};
pub use ledger::{
    MaterialZonePrice, NewMaterialPrice, NewPieceZonePrice, PeriodClosing, PieceZonePrice,
    PriceLine, ProcessParameters, ProcessRates, ResolvedProcessParameters,
};
pub use query::{
    ImportRowOutcome, ImportRowStatus, ImportSummary, MaterialPriceListing, MaterialPriceQuery,
};
pub use reference::{Material, Piece, Zone};
