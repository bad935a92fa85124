// Progression engine: pure computation of the next cursor position from the
// catalog and the current position. No knowledge of trackers or alerts.

use crate::catalog::{Position, WorkflowCatalog};
use crate::error::WorkflowError;

/// Outcome of advancing past the current line item. The boundary flags are
/// observability signals for the caller; correctness never depends on them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NextPosition {
    /// New cursor, or None when the workflow is finished.
    pub position: Option<Position>,
    pub completed_section: bool,
    pub completed_phase: bool,
    pub is_complete: bool,
}

/// Compute the position that follows `current`, in order of preference:
/// the next active item of the same section; the first item of the next
/// populated section of the same phase; the first item of the next populated
/// phase; otherwise workflow complete.
pub fn compute_next(
    catalog: &WorkflowCatalog,
    current: &Position,
) -> Result<NextPosition, WorkflowError> {
    let item = catalog
        .line_item(current.line_item_id)
        .ok_or_else(|| WorkflowError::NotFound {
            what: "line item",
            id: current.line_item_id.to_string(),
        })?;
    if item.section_id != current.section_id {
        return Err(WorkflowError::CatalogIntegrity(format!(
            "line item {} does not belong to section {}",
            current.line_item_id, current.section_id
        )));
    }

    if let Some(next) = catalog.next_item_in_section(current.section_id, item.display_order) {
        return Ok(NextPosition {
            position: Some(Position {
                phase_id: current.phase_id,
                section_id: current.section_id,
                line_item_id: next.id,
            }),
            completed_section: false,
            completed_phase: false,
            is_complete: false,
        });
    }

    let section = catalog
        .section(current.section_id)
        .ok_or_else(|| WorkflowError::NotFound {
            what: "section",
            id: current.section_id.to_string(),
        })?;
    if let Some(position) = catalog.first_of_next_section(current.phase_id, section.display_order) {
        return Ok(NextPosition {
            position: Some(position),
            completed_section: true,
            completed_phase: false,
            is_complete: false,
        });
    }

    let phase = catalog
        .phase(current.phase_id)
        .ok_or_else(|| WorkflowError::NotFound {
            what: "phase",
            id: current.phase_id.to_string(),
        })?;
    if let Some(position) = catalog.first_of_next_phase(phase.display_order) {
        return Ok(NextPosition {
            position: Some(position),
            completed_section: true,
            completed_phase: true,
            is_complete: false,
        });
    }

    Ok(NextPosition {
        position: None,
        completed_section: true,
        completed_phase: true,
        is_complete: true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{LineItem, Phase, Section};

    fn phase(id: i64, order: i64) -> Phase {
        Phase {
            id,
            name: format!("phase-{id}"),
            display_order: order,
            responsible_role: "office".to_string(),
        }
    }

    fn section(id: i64, phase_id: i64, order: i64) -> Section {
        Section {
            id,
            phase_id,
            name: format!("section-{id}"),
            display_order: order,
            responsible_role: "office".to_string(),
        }
    }

    fn item(id: i64, section_id: i64, order: i64) -> LineItem {
        LineItem {
            id,
            section_id,
            name: format!("item-{id}"),
            display_order: order,
            responsible_role: "field".to_string(),
            alert_lead_days: 1,
            is_active: true,
        }
    }

    /// Phase 1 {section 11: [111, 112], section 12: [121]}, phase 2 {section 21: [211]}
    fn catalog() -> WorkflowCatalog {
        WorkflowCatalog::from_parts(
            vec![phase(1, 10), phase(2, 20)],
            vec![section(11, 1, 10), section(12, 1, 20), section(21, 2, 10)],
            vec![
                item(111, 11, 10),
                item(112, 11, 20),
                item(121, 12, 10),
                item(211, 21, 10),
            ],
        )
        .expect("valid catalog")
    }

    fn at(phase_id: i64, section_id: i64, line_item_id: i64) -> Position {
        Position {
            phase_id,
            section_id,
            line_item_id,
        }
    }

    #[test]
    fn test_advances_within_section_without_boundary_flags() {
        let next = compute_next(&catalog(), &at(1, 11, 111)).unwrap();
        assert_eq!(next.position, Some(at(1, 11, 112)));
        assert!(!next.completed_section);
        assert!(!next.completed_phase);
        assert!(!next.is_complete);
    }

    #[test]
    fn test_section_boundary_moves_to_next_section_same_phase() {
        let next = compute_next(&catalog(), &at(1, 11, 112)).unwrap();
        assert_eq!(next.position, Some(at(1, 12, 121)));
        assert!(next.completed_section);
        assert!(!next.completed_phase);
        assert!(!next.is_complete);
    }

    #[test]
    fn test_phase_boundary_jumps_to_first_item_of_next_phase() {
        let next = compute_next(&catalog(), &at(1, 12, 121)).unwrap();
        assert_eq!(next.position, Some(at(2, 21, 211)));
        assert!(next.completed_section);
        assert!(next.completed_phase);
        assert!(!next.is_complete);
    }

    #[test]
    fn test_last_item_of_catalog_completes_the_workflow() {
        let next = compute_next(&catalog(), &at(2, 21, 211)).unwrap();
        assert_eq!(next.position, None);
        assert!(next.completed_section);
        assert!(next.completed_phase);
        assert!(next.is_complete);
    }

    #[test]
    fn test_skips_sections_and_phases_with_no_active_items() {
        // Section 12's only item is inactive, phase 2 keeps one active item.
        let mut dormant = item(121, 12, 10);
        dormant.is_active = false;
        let catalog = WorkflowCatalog::from_parts(
            vec![phase(1, 10), phase(2, 20)],
            vec![section(11, 1, 10), section(12, 1, 20), section(21, 2, 10)],
            vec![item(111, 11, 10), item(112, 11, 20), dormant, item(211, 21, 10)],
        )
        .unwrap();

        let next = compute_next(&catalog, &at(1, 11, 112)).unwrap();
        assert_eq!(next.position, Some(at(2, 21, 211)));
        assert!(next.completed_section);
        assert!(next.completed_phase);
    }

    #[test]
    fn test_inactive_items_are_stepped_over_within_a_section() {
        let mut dormant = item(112, 11, 20);
        dormant.is_active = false;
        let catalog = WorkflowCatalog::from_parts(
            vec![phase(1, 10)],
            vec![section(11, 1, 10)],
            vec![item(111, 11, 10), dormant, item(113, 11, 30)],
        )
        .unwrap();

        let next = compute_next(&catalog, &at(1, 11, 111)).unwrap();
        assert_eq!(next.position, Some(at(1, 11, 113)));
    }

    #[test]
    fn test_unknown_line_item_is_not_found() {
        let result = compute_next(&catalog(), &at(1, 11, 999));
        assert!(matches!(result, Err(WorkflowError::NotFound { .. })));
    }

    #[test]
    fn test_mismatched_section_pointer_is_an_integrity_error() {
        // Item 211 lives in section 21, not section 11.
        let result = compute_next(&catalog(), &at(1, 11, 211));
        assert!(matches!(result, Err(WorkflowError::CatalogIntegrity(_))));
    }
}
