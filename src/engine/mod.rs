//! The pricing engine.
//!
//! [`PricingEngine`] loads rows from the [`LedgerStore`], hands them to the
//! pure functions in [`crate::calculation`], and writes results back. It owns
//! every business rule that needs the store: existence checks, closed
//! periods, publish validation, import validation.
//!
//! Operations are grouped by area:
//!
//! - `formula`: BOM management
//! - `pricing`: cost breakdown and price publishing
//! - `periods`: process parameters and month closing
//! - `material_prices`: material price ledger, CSV import and export
//! - `history`: price history and comparison
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use precast_pricing::config::EngineConfig;
//! use precast_pricing::engine::PricingEngine;
//! use precast_pricing::store::LedgerStore;
//!
//! let store = LedgerStore::open_in_memory().unwrap();
//! let engine = PricingEngine::new(store, Arc::new(EngineConfig::default()));
//! assert!(engine.list_closed_months("NOWHERE").is_err());
//! ```

mod audit;
mod formula;
mod history;
mod material_prices;
mod periods;
mod pricing;

use std::collections::HashSet;
use std::sync::Arc;

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::models::{Material, Piece, Zone};
use crate::store::LedgerStore;

pub use audit::{AuditAction, AuditEvent, AuditSink, RecordingAuditSink, TracingAuditSink};

/// Orchestrates the ledgers and the calculator.
///
/// Cheap to clone; clones share the store, configuration and audit sink.
#[derive(Clone)]
pub struct PricingEngine {
    store: LedgerStore,
    config: Arc<EngineConfig>,
    audit: Arc<dyn AuditSink>,
}

impl std::fmt::Debug for PricingEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PricingEngine")
            .field("store", &self.store)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl PricingEngine {
    /// Creates an engine that audits through `tracing`.
    pub fn new(store: LedgerStore, config: Arc<EngineConfig>) -> Self {
        Self::with_audit_sink(store, config, Arc::new(TracingAuditSink))
    }

    /// Creates an engine that sends audit events to `audit`.
    pub fn with_audit_sink(
        store: LedgerStore,
        config: Arc<EngineConfig>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            store,
            config,
            audit,
        }
    }

    /// The underlying ledger store.
    pub fn store(&self) -> &LedgerStore {
        &self.store
    }

    /// The engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn audit(&self, event: AuditEvent) {
        self.audit.record(event);
    }

    fn require_piece(&self, piece_id: &str) -> EngineResult<Piece> {
        self.store
            .get_piece(piece_id)?
            .ok_or_else(|| EngineError::not_found("piece", piece_id))
    }

    fn require_zone(&self, zone_id: &str) -> EngineResult<Zone> {
        self.store
            .get_zone(zone_id)?
            .ok_or_else(|| EngineError::not_found("zone", zone_id))
    }

    fn require_material(&self, material_id: &str) -> EngineResult<Material> {
        self.store
            .get_material(material_id)?
            .ok_or_else(|| EngineError::not_found("material", material_id))
    }

    fn known_material_ids(&self) -> EngineResult<HashSet<String>> {
        Ok(self
            .store
            .list_materials()?
            .into_iter()
            .map(|m| m.id)
            .collect())
    }
}
