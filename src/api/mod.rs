//! HTTP API for the precast pricing engine.
//!
//! This module exposes the engine operations as JSON endpoints: breakdowns,
//! publishing, history, formula management, process parameters, month
//! closing and the material price ledger.

mod handlers;
mod request;
mod response;
mod state;

pub use handlers::{USER_HEADER, create_router};
pub use request::{
    BreakdownQuery, CompareQuery, CopyFormulaRequest, ExportQuery, FormulaRequest, HistoryQuery,
    ImportRequest, PublishRequest,
};
pub use response::{
    ApiError, ApiErrorResponse, BreakdownResponse, HealthResponse, MonthStatusResponse,
};
pub use state::AppState;
