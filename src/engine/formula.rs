//! BOM management.

use tracing::{debug, info};

use crate::calculation::validate_formula_lines;
use crate::error::{EngineError, EngineResult};
use crate::models::{BomLine, BomLineInput, Formula, FormulaValidation};

use super::{AuditAction, AuditEvent, PricingEngine};

impl PricingEngine {
    fn check_lines(&self, lines: &[BomLineInput]) -> EngineResult<FormulaValidation> {
        let known = self.known_material_ids()?;
        Ok(validate_formula_lines(
            lines,
            |id| known.contains(id),
            self.config.pricing().high_waste_factor,
        ))
    }

    fn formula_from(&self, piece_id: &str, lines: Vec<BomLine>) -> EngineResult<Formula> {
        let inputs: Vec<BomLineInput> = lines.iter().map(BomLineInput::from).collect();
        let warnings = self.check_lines(&inputs)?.warnings;
        Ok(Formula {
            piece_id: piece_id.to_string(),
            lines,
            warnings,
        })
    }

    fn reject_invalid(piece_id: &str, validation: &FormulaValidation) -> EngineResult<()> {
        if validation.valid {
            return Ok(());
        }
        let details = serde_json::to_value(&validation.errors).unwrap_or_default();
        Err(EngineError::validation_with_details(
            "INVALID_FORMULA",
            format!(
                "Formula for piece {} has {} error(s)",
                piece_id,
                validation.errors.len()
            ),
            details,
        ))
    }

    /// The piece's current formula with its soft warnings.
    pub fn get_formula(&self, piece_id: &str) -> EngineResult<Formula> {
        self.require_piece(piece_id)?;
        let lines = self.store.list_bom_lines(piece_id)?;
        self.formula_from(piece_id, lines)
    }

    /// Validates lines for a piece without saving them.
    pub fn validate_formula(
        &self,
        piece_id: &str,
        lines: &[BomLineInput],
    ) -> EngineResult<FormulaValidation> {
        self.require_piece(piece_id)?;
        self.check_lines(lines)
    }

    /// Replaces the whole formula in one transaction.
    pub fn update_formula(
        &self,
        piece_id: &str,
        lines: &[BomLineInput],
        actor: &str,
    ) -> EngineResult<Formula> {
        self.require_piece(piece_id)?;
        let validation = self.check_lines(lines)?;
        Self::reject_invalid(piece_id, &validation)?;

        let stored = self.store.replace_bom_lines(piece_id, lines)?;
        info!(piece_id = %piece_id, lines = stored.len(), "Formula replaced");
        self.audit(AuditEvent::new(
            AuditAction::FormulaReplaced,
            actor,
            piece_id,
            None,
            format!("{} line(s)", stored.len()),
        ));

        Ok(Formula {
            piece_id: piece_id.to_string(),
            lines: stored,
            warnings: validation.warnings,
        })
    }

    /// Appends one line. The resulting formula is validated as a whole so
    /// duplicate materials are reported.
    pub fn add_line(&self, piece_id: &str, line: &BomLineInput, actor: &str) -> EngineResult<Formula> {
        self.require_piece(piece_id)?;
        let mut candidate: Vec<BomLineInput> = self
            .store
            .list_bom_lines(piece_id)?
            .iter()
            .map(BomLineInput::from)
            .collect();
        candidate.push(line.clone());

        let validation = self.check_lines(&candidate)?;
        Self::reject_invalid(piece_id, &validation)?;

        let stored = self.store.insert_bom_line(piece_id, line)?;
        debug!(piece_id = %piece_id, line_id = stored.id, material_id = %stored.material_id, "Formula line added");
        self.audit(AuditEvent::new(
            AuditAction::FormulaLineAdded,
            actor,
            piece_id,
            None,
            format!("line {} ({})", stored.id, stored.material_id),
        ));

        Ok(Formula {
            piece_id: piece_id.to_string(),
            lines: self.store.list_bom_lines(piece_id)?,
            warnings: validation.warnings,
        })
    }

    /// Removes one line of the piece and returns the remaining formula.
    pub fn remove_line(&self, piece_id: &str, line_id: i64, actor: &str) -> EngineResult<Formula> {
        self.require_piece(piece_id)?;
        if !self.store.delete_bom_line(piece_id, line_id)? {
            return Err(EngineError::not_found("bom line", line_id.to_string()));
        }
        self.audit(AuditEvent::new(
            AuditAction::FormulaLineRemoved,
            actor,
            piece_id,
            None,
            format!("line {}", line_id),
        ));
        self.get_formula(piece_id)
    }

    /// Copies the source piece's lines onto the target piece.
    pub fn copy_formula(
        &self,
        source_id: &str,
        target_id: &str,
        overwrite: bool,
        actor: &str,
    ) -> EngineResult<Formula> {
        if source_id == target_id {
            return Err(EngineError::validation(
                "SAME_PIECE",
                "Source and target piece must differ",
            ));
        }
        self.require_piece(source_id)?;
        self.require_piece(target_id)?;

        let source_lines = self.store.list_bom_lines(source_id)?;
        if source_lines.is_empty() {
            return Err(EngineError::validation(
                "EMPTY_SOURCE_FORMULA",
                format!("Piece {} has no formula to copy", source_id),
            ));
        }
        if !overwrite && !self.store.list_bom_lines(target_id)?.is_empty() {
            return Err(EngineError::validation(
                "TARGET_HAS_FORMULA",
                format!(
                    "Piece {} already has a formula; set overwrite to replace it",
                    target_id
                ),
            ));
        }

        let inputs: Vec<BomLineInput> = source_lines.iter().map(BomLineInput::from).collect();
        let stored = self.store.replace_bom_lines(target_id, &inputs)?;
        info!(source = %source_id, target = %target_id, lines = stored.len(), "Formula copied");
        self.audit(AuditEvent::new(
            AuditAction::FormulaCopied,
            actor,
            target_id,
            None,
            format!("copied {} line(s) from {}", stored.len(), source_id),
        ));

        self.formula_from(target_id, stored)
    }
}
