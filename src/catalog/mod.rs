// Workflow catalog: the immutable, totally-ordered definition of
// phases -> sections -> line items. Loaded once, validated, then shared
// read-only across the process.

pub mod seed;
pub mod store;
pub mod types;

pub use seed::{seed_catalog, CatalogSpec, LineItemSpec, PhaseSpec, SectionSpec};
pub use store::WorkflowCatalog;
pub use types::{LineItem, Phase, Position, Section};
