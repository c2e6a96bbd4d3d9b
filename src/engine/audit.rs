//! Audit notifications for mutating operations.
//!
//! The engine emits one [`AuditEvent`] per successful write. Delivery is
//! fire-and-forget: a sink cannot fail the operation that produced the event.

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

/// What was changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// A formula was replaced as a whole.
    FormulaReplaced,
    /// A formula line was added.
    FormulaLineAdded,
    /// A formula line was removed.
    FormulaLineRemoved,
    /// A formula was copied from another piece.
    FormulaCopied,
    /// A piece price was published.
    PricePublished,
    /// A month was closed.
    MonthClosed,
    /// Process parameters were written.
    ProcessParametersSet,
    /// A material price was recorded.
    MaterialPriceSet,
    /// A material price was deactivated.
    MaterialPriceDeactivated,
    /// A CSV batch of material prices was applied.
    MaterialPricesImported,
}

impl AuditAction {
    /// The snake_case name used in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::FormulaReplaced => "formula_replaced",
            AuditAction::FormulaLineAdded => "formula_line_added",
            AuditAction::FormulaLineRemoved => "formula_line_removed",
            AuditAction::FormulaCopied => "formula_copied",
            AuditAction::PricePublished => "price_published",
            AuditAction::MonthClosed => "month_closed",
            AuditAction::ProcessParametersSet => "process_parameters_set",
            AuditAction::MaterialPriceSet => "material_price_set",
            AuditAction::MaterialPriceDeactivated => "material_price_deactivated",
            AuditAction::MaterialPricesImported => "material_prices_imported",
        }
    }
}

/// One audited change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    /// The kind of change.
    pub action: AuditAction,
    /// The user who made the change.
    pub actor: String,
    /// The entity changed (piece id, material price id, ...).
    pub subject: String,
    /// The zone affected, for zone-scoped changes.
    pub zone_id: Option<String>,
    /// Short human-readable description.
    pub summary: String,
    /// When the change happened.
    pub at: DateTime<Utc>,
}

impl AuditEvent {
    /// Creates an event stamped with the current time.
    pub fn new(
        action: AuditAction,
        actor: &str,
        subject: impl Into<String>,
        zone_id: Option<&str>,
        summary: impl Into<String>,
    ) -> Self {
        Self {
            action,
            actor: actor.to_string(),
            subject: subject.into(),
            zone_id: zone_id.map(str::to_string),
            summary: summary.into(),
            at: Utc::now(),
        }
    }
}

/// Receives audit events.
pub trait AuditSink: Send + Sync {
    fn record(&self, event: AuditEvent);
}

/// Writes every event as a structured `tracing` record on the `audit` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, event: AuditEvent) {
        info!(
            target: "audit",
            action = event.action.as_str(),
            actor = %event.actor,
            subject = %event.subject,
            zone_id = event.zone_id.as_deref().unwrap_or("-"),
            at = %event.at,
            "{}",
            event.summary
        );
    }
}

/// Keeps events in memory, for tests and diagnostics.
#[derive(Debug, Default)]
pub struct RecordingAuditSink {
    events: Mutex<Vec<AuditEvent>>,
}

impl RecordingAuditSink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// A copy of the events recorded so far.
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

impl AuditSink for RecordingAuditSink {
    fn record(&self, event: AuditEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_sink_keeps_order() {
        let sink = RecordingAuditSink::new();
        sink.record(AuditEvent::new(
            AuditAction::MonthClosed,
            "ana",
            "Z1",
            Some("Z1"),
            "closed 2024-01",
        ));
        sink.record(AuditEvent::new(
            AuditAction::PricePublished,
            "ana",
            "P1",
            Some("Z1"),
            "published 400",
        ));

        let actions: Vec<_> = sink.events().iter().map(|e| e.action).collect();
        assert_eq!(actions, vec![AuditAction::MonthClosed, AuditAction::PricePublished]);
    }

    #[test]
    fn test_action_serializes_like_as_str() {
        let json = serde_json::to_string(&AuditAction::MaterialPricesImported).unwrap();
        assert_eq!(json, format!("\"{}\"", AuditAction::MaterialPricesImported.as_str()));
    }

    #[test]
    fn test_tracing_sink_accepts_events() {
        crate::logging::init_test();
        TracingAuditSink.record(AuditEvent::new(
            AuditAction::FormulaReplaced,
            "system",
            "P1",
            None,
            "2 lines",
        ));
    }
}
