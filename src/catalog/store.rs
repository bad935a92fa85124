use std::collections::{HashMap, HashSet};

use sqlx::{Row, SqlitePool};
use tracing::{error, info};

use crate::catalog::types::{LineItem, Phase, Position, Section};
use crate::error::WorkflowError;

/// In-memory snapshot of the workflow catalog, ordered by `display_order`
/// at every level. Built once at startup and shared read-only; ordering
/// violations are rejected here rather than guessed around later.
pub struct WorkflowCatalog {
    phases: Vec<Phase>,
    sections: HashMap<i64, Vec<Section>>,
    items: HashMap<i64, Vec<LineItem>>,
    section_phase: HashMap<i64, i64>,
    item_section: HashMap<i64, i64>,
}

impl WorkflowCatalog {
    /// Load the catalog tables and build the validated snapshot.
    pub async fn load(pool: &SqlitePool) -> Result<Self, WorkflowError> {
        let phase_rows = sqlx::query(
            "SELECT id, name, display_order, responsible_role FROM phases ORDER BY display_order",
        )
        .fetch_all(pool)
        .await?;
        let phases = phase_rows
            .iter()
            .map(|row| Phase {
                id: row.get("id"),
                name: row.get("name"),
                display_order: row.get("display_order"),
                responsible_role: row.get("responsible_role"),
            })
            .collect();

        let section_rows = sqlx::query(
            "SELECT id, phase_id, name, display_order, responsible_role FROM sections ORDER BY display_order",
        )
        .fetch_all(pool)
        .await?;
        let sections = section_rows
            .iter()
            .map(|row| Section {
                id: row.get("id"),
                phase_id: row.get("phase_id"),
                name: row.get("name"),
                display_order: row.get("display_order"),
                responsible_role: row.get("responsible_role"),
            })
            .collect();

        let item_rows = sqlx::query(
            "SELECT id, section_id, name, display_order, responsible_role, alert_lead_days, is_active \
             FROM line_items ORDER BY display_order",
        )
        .fetch_all(pool)
        .await?;
        let items = item_rows
            .iter()
            .map(|row| LineItem {
                id: row.get("id"),
                section_id: row.get("section_id"),
                name: row.get("name"),
                display_order: row.get("display_order"),
                responsible_role: row.get("responsible_role"),
                alert_lead_days: row.get("alert_lead_days"),
                is_active: row.get("is_active"),
            })
            .collect();

        let catalog = Self::from_parts(phases, sections, items)?;
        info!(
            phases = catalog.phases.len(),
            total_active_items = catalog.total_active_items(),
            "Workflow catalog loaded"
        );
        Ok(catalog)
    }

    /// Build and validate a catalog from already-materialized rows.
    pub fn from_parts(
        mut phases: Vec<Phase>,
        mut sections: Vec<Section>,
        mut items: Vec<LineItem>,
    ) -> Result<Self, WorkflowError> {
        phases.sort_by_key(|p| p.display_order);
        if let Some(pair) = phases.windows(2).find(|w| w[0].display_order == w[1].display_order) {
            return Err(integrity_error(format!(
                "phases {:?} and {:?} share display_order {}",
                pair[0].name, pair[1].name, pair[0].display_order
            )));
        }

        let phase_ids: HashSet<i64> = phases.iter().map(|p| p.id).collect();

        sections.sort_by_key(|s| (s.phase_id, s.display_order));
        if let Some(pair) = sections
            .windows(2)
            .find(|w| w[0].phase_id == w[1].phase_id && w[0].display_order == w[1].display_order)
        {
            return Err(integrity_error(format!(
                "sections {:?} and {:?} share display_order {} within phase {}",
                pair[0].name, pair[1].name, pair[0].display_order, pair[0].phase_id
            )));
        }

        let mut section_phase = HashMap::new();
        let mut sections_by_phase: HashMap<i64, Vec<Section>> = HashMap::new();
        for section in sections {
            if !phase_ids.contains(&section.phase_id) {
                return Err(integrity_error(format!(
                    "section {} references unknown phase {}",
                    section.id, section.phase_id
                )));
            }
            section_phase.insert(section.id, section.phase_id);
            sections_by_phase
                .entry(section.phase_id)
                .or_default()
                .push(section);
        }

        items.sort_by_key(|i| (i.section_id, i.display_order));
        if let Some(pair) = items
            .windows(2)
            .find(|w| w[0].section_id == w[1].section_id && w[0].display_order == w[1].display_order)
        {
            return Err(integrity_error(format!(
                "line items {:?} and {:?} share display_order {} within section {}",
                pair[0].name, pair[1].name, pair[0].display_order, pair[0].section_id
            )));
        }

        let mut item_section = HashMap::new();
        let mut items_by_section: HashMap<i64, Vec<LineItem>> = HashMap::new();
        for item in items {
            if !section_phase.contains_key(&item.section_id) {
                return Err(integrity_error(format!(
                    "line item {} references unknown section {}",
                    item.id, item.section_id
                )));
            }
            item_section.insert(item.id, item.section_id);
            items_by_section.entry(item.section_id).or_default().push(item);
        }

        Ok(Self {
            phases,
            sections: sections_by_phase,
            items: items_by_section,
            section_phase,
            item_section,
        })
    }

    pub fn phase(&self, id: i64) -> Option<&Phase> {
        self.phases.iter().find(|p| p.id == id)
    }

    pub fn section(&self, id: i64) -> Option<&Section> {
        let phase_id = self.section_phase.get(&id)?;
        self.sections.get(phase_id)?.iter().find(|s| s.id == id)
    }

    pub fn line_item(&self, id: i64) -> Option<&LineItem> {
        let section_id = self.item_section.get(&id)?;
        self.items.get(section_id)?.iter().find(|i| i.id == id)
    }

    /// Fully-qualified position of a line item, or None if unknown.
    pub fn position_of(&self, line_item_id: i64) -> Option<Position> {
        let section_id = *self.item_section.get(&line_item_id)?;
        let phase_id = *self.section_phase.get(&section_id)?;
        Some(Position {
            phase_id,
            section_id,
            line_item_id,
        })
    }

    /// Human-facing step name for a line item (the alert key).
    pub fn step_name(&self, line_item_id: i64) -> Option<&str> {
        self.line_item(line_item_id).map(|i| i.name.as_str())
    }

    /// Lowest-order phase/section/active-item triple, or None when the
    /// catalog has no active work at all.
    pub fn first_position(&self) -> Option<Position> {
        self.phases.iter().find_map(|p| self.first_position_in_phase(p.id))
    }

    fn first_position_in_phase(&self, phase_id: i64) -> Option<Position> {
        self.sections.get(&phase_id)?.iter().find_map(|section| {
            self.first_active_item(section.id).map(|item| Position {
                phase_id,
                section_id: section.id,
                line_item_id: item.id,
            })
        })
    }

    fn first_active_item(&self, section_id: i64) -> Option<&LineItem> {
        self.items.get(&section_id)?.iter().find(|i| i.is_active)
    }

    /// Next active item within the same section, strictly after `after_order`.
    pub fn next_item_in_section(&self, section_id: i64, after_order: i64) -> Option<&LineItem> {
        self.items
            .get(&section_id)?
            .iter()
            .find(|i| i.is_active && i.display_order > after_order)
    }

    /// First item of the next populated section of the same phase.
    pub fn first_of_next_section(&self, phase_id: i64, after_order: i64) -> Option<Position> {
        self.sections.get(&phase_id)?.iter().find_map(|section| {
            if section.display_order <= after_order {
                return None;
            }
            self.first_active_item(section.id).map(|item| Position {
                phase_id,
                section_id: section.id,
                line_item_id: item.id,
            })
        })
    }

    /// First position within the next populated phase.
    pub fn first_of_next_phase(&self, after_order: i64) -> Option<Position> {
        self.phases.iter().find_map(|phase| {
            if phase.display_order <= after_order {
                return None;
            }
            self.first_position_in_phase(phase.id)
        })
    }

    pub fn total_active_items(&self) -> u64 {
        self.items
            .values()
            .map(|items| items.iter().filter(|i| i.is_active).count() as u64)
            .sum()
    }

    /// Count of active items belonging to the given phases, for override
    /// progress accounting.
    pub fn active_items_in_phases(&self, phase_ids: &[i64]) -> u64 {
        phase_ids
            .iter()
            .filter_map(|phase_id| self.sections.get(phase_id))
            .flatten()
            .map(|section| {
                self.items
                    .get(&section.id)
                    .map(|items| items.iter().filter(|i| i.is_active).count() as u64)
                    .unwrap_or(0)
            })
            .sum()
    }
}

fn integrity_error(detail: String) -> WorkflowError {
    error!(detail = %detail, "Workflow catalog failed validation");
    WorkflowError::CatalogIntegrity(detail)
}
