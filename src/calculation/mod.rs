//! Calculation logic for the precast pricing engine.
//!
//! Everything in this module is a pure function over rows already loaded
//! from the ledgers: as-of-date resolution, materials cost, process and
//! labor cost, breakdown assembly, formula validation and price history.
//! Nothing here reads or writes the store.

mod cost_breakdown;
mod formula_validation;
mod materials_cost;
mod price_history;
mod process_cost;
mod temporal;

pub use cost_breakdown::{BreakdownInputs, calculate_breakdown, round_total};
pub use formula_validation::{
    ISSUE_DUPLICATE_MATERIAL, ISSUE_EMPTY_FORMULA, ISSUE_HIGH_WASTE_FACTOR,
    ISSUE_NEGATIVE_WASTE, ISSUE_NON_POSITIVE_QUANTITY, ISSUE_UNKNOWN_MATERIAL,
    validate_formula_lines,
};
pub use materials_cost::{MaterialsCostResult, calculate_materials_cost};
pub use price_history::{annotate_history, compare_prices, delta_percent};
pub use process_cost::{KG_PER_TON, LaborCost, calculate_labor_cost, calculate_process_terms};
pub use temporal::{
    Versioned, in_month, month_end, month_start, one_month_back, resolve_as_of,
    resolve_process_parameters,
};
