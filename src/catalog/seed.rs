// Catalog seeding: inserts a pre-authored catalog definition into the three
// catalog tables. Run once at provisioning time (or in tests); the catalog is
// read-only afterwards.

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::info;

use crate::error::WorkflowError;

/// A full catalog definition, deserializable from TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogSpec {
    pub phases: Vec<PhaseSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseSpec {
    pub name: String,
    pub display_order: i64,
    #[serde(default = "default_role")]
    pub responsible_role: String,
    pub sections: Vec<SectionSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionSpec {
    pub name: String,
    pub display_order: i64,
    #[serde(default = "default_role")]
    pub responsible_role: String,
    pub items: Vec<LineItemSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineItemSpec {
    pub name: String,
    pub display_order: i64,
    #[serde(default = "default_role")]
    pub responsible_role: String,
    #[serde(default = "default_lead_days")]
    pub alert_lead_days: i64,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_role() -> String {
    "office".to_string()
}

fn default_lead_days() -> i64 {
    1
}

fn default_active() -> bool {
    true
}

impl CatalogSpec {
    pub fn from_toml_str(text: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(text)?)
    }
}

/// Insert the catalog definition. The schema's unique ordering keys reject a
/// definition with duplicate display orders before it can ever be traversed.
pub async fn seed_catalog(pool: &SqlitePool, spec: &CatalogSpec) -> Result<(), WorkflowError> {
    let mut tx = pool.begin().await?;

    for phase in &spec.phases {
        let phase_id = sqlx::query(
            "INSERT INTO phases (name, display_order, responsible_role) VALUES (?1, ?2, ?3)",
        )
        .bind(&phase.name)
        .bind(phase.display_order)
        .bind(&phase.responsible_role)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        for section in &phase.sections {
            let section_id = sqlx::query(
                "INSERT INTO sections (phase_id, name, display_order, responsible_role) \
                 VALUES (?1, ?2, ?3, ?4)",
            )
            .bind(phase_id)
            .bind(&section.name)
            .bind(section.display_order)
            .bind(&section.responsible_role)
            .execute(&mut *tx)
            .await?
            .last_insert_rowid();

            for item in &section.items {
                sqlx::query(
                    "INSERT INTO line_items \
                     (section_id, name, display_order, responsible_role, alert_lead_days, is_active) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                )
                .bind(section_id)
                .bind(&item.name)
                .bind(item.display_order)
                .bind(&item.responsible_role)
                .bind(item.alert_lead_days)
                .bind(item.is_active)
                .execute(&mut *tx)
                .await?;
            }
        }
    }

    tx.commit().await?;
    info!(phases = spec.phases.len(), "Workflow catalog seeded");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_spec_parses_from_toml_with_defaults() {
        let text = r#"
            [[phases]]
            name = "Pre-Construction"
            display_order = 10

            [[phases.sections]]
            name = "Contract"
            display_order = 10

            [[phases.sections.items]]
            name = "Sign contract"
            display_order = 10

            [[phases.sections.items]]
            name = "Collect deposit"
            display_order = 20
            responsible_role = "accounting"
            alert_lead_days = 3
        "#;

        let spec = CatalogSpec::from_toml_str(text).expect("parse");
        assert_eq!(spec.phases.len(), 1);
        let items = &spec.phases[0].sections[0].items;
        assert_eq!(items[0].responsible_role, "office");
        assert_eq!(items[0].alert_lead_days, 1);
        assert!(items[0].is_active);
        assert_eq!(items[1].responsible_role, "accounting");
        assert_eq!(items[1].alert_lead_days, 3);
    }
}
