use serde::{Deserialize, Serialize};

/// Top ordering level of the catalog (e.g. "Prospect", "Approved", "Execution").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Phase {
    pub id: i64,
    pub name: String,
    pub display_order: i64,
    pub responsible_role: String,
}

/// Middle ordering level, scoped to a phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub id: i64,
    pub phase_id: i64,
    pub name: String,
    pub display_order: i64,
    pub responsible_role: String,
}

/// Leaf ordering level: the unit of work that gets completed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineItem {
    pub id: i64,
    pub section_id: i64,
    pub name: String,
    pub display_order: i64,
    pub responsible_role: String,
    /// How far ahead of "now" the step's alert is due.
    pub alert_lead_days: i64,
    /// Inactive items are invisible to progression and progress totals.
    pub is_active: bool,
}

/// A tracker's position in the catalog. The three ids are mutually
/// consistent: the item belongs to the section, the section to the phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub phase_id: i64,
    pub section_id: i64,
    pub line_item_id: i64,
}
