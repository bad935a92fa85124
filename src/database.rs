use anyhow::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use tracing::info;

/// Schema for the workflow store: three catalog tables with unique ordering
/// keys, one tracker row per workflow instance, the append-only completion
/// and override tables, and the derived alerts table.
const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS phases (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    display_order INTEGER NOT NULL,
    responsible_role TEXT NOT NULL DEFAULT 'office',
    UNIQUE (display_order)
);

CREATE TABLE IF NOT EXISTS sections (
    id INTEGER PRIMARY KEY,
    phase_id INTEGER NOT NULL REFERENCES phases(id),
    name TEXT NOT NULL,
    display_order INTEGER NOT NULL,
    responsible_role TEXT NOT NULL DEFAULT 'office',
    UNIQUE (phase_id, display_order)
);

CREATE TABLE IF NOT EXISTS line_items (
    id INTEGER PRIMARY KEY,
    section_id INTEGER NOT NULL REFERENCES sections(id),
    name TEXT NOT NULL,
    display_order INTEGER NOT NULL,
    responsible_role TEXT NOT NULL DEFAULT 'office',
    alert_lead_days INTEGER NOT NULL DEFAULT 1,
    is_active INTEGER NOT NULL DEFAULT 1,
    UNIQUE (section_id, display_order)
);

CREATE TABLE IF NOT EXISTS trackers (
    id TEXT PRIMARY KEY,
    project_id TEXT NOT NULL,
    workflow_type TEXT NOT NULL,
    is_main_workflow INTEGER NOT NULL DEFAULT 1,
    current_phase_id INTEGER,
    current_section_id INTEGER,
    current_line_item_id INTEGER,
    phase_started_at TEXT,
    section_started_at TEXT,
    item_started_at TEXT,
    last_completed_item_id INTEGER,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS completed_items (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    tracker_id TEXT NOT NULL REFERENCES trackers(id),
    phase_id INTEGER NOT NULL,
    section_id INTEGER NOT NULL,
    line_item_id INTEGER NOT NULL,
    completed_by TEXT NOT NULL,
    completed_at TEXT NOT NULL,
    notes TEXT,
    UNIQUE (tracker_id, line_item_id)
);

CREATE TABLE IF NOT EXISTS phase_overrides (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    project_id TEXT NOT NULL,
    from_phase_id INTEGER NOT NULL,
    to_phase_id INTEGER NOT NULL,
    skipped_phase_ids TEXT NOT NULL,
    reason TEXT NOT NULL,
    created_by TEXT NOT NULL,
    created_at TEXT NOT NULL,
    is_active INTEGER NOT NULL DEFAULT 1
);

CREATE INDEX IF NOT EXISTS idx_overrides_active
    ON phase_overrides (project_id, is_active);

CREATE TABLE IF NOT EXISTS alerts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    project_id TEXT NOT NULL,
    step_name TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'active',
    assigned_to TEXT NOT NULL,
    due_at TEXT NOT NULL,
    created_at TEXT NOT NULL,
    resolved_at TEXT
);

CREATE INDEX IF NOT EXISTS idx_alerts_active
    ON alerts (project_id, step_name, status);
"#;

/// Database manager for the workflow store
pub struct DatabaseManager {
    pool: SqlitePool,
}

impl DatabaseManager {
    /// Open (creating if missing) the database and bootstrap the schema.
    pub async fn new(database_url: &str, max_connections: u32, auto_migrate: bool) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        if auto_migrate {
            info!("Bootstrapping workflow schema...");
            sqlx::raw_sql(SCHEMA).execute(&pool).await?;
            info!("Workflow schema ready");
        }

        Ok(Self { pool })
    }

    /// In-memory database for tests. Pinned to a single connection so every
    /// query sees the same memory database.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        sqlx::raw_sql(SCHEMA).execute(&pool).await?;
        Ok(Self { pool })
    }

    /// Get database pool for queries
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close database connections gracefully
    pub async fn shutdown(&self) {
        info!("Shutting down database connections...");
        self.pool.close().await;
        info!("Database connections closed");
    }
}

static DB_MANAGER: std::sync::LazyLock<
    std::sync::Arc<tokio::sync::RwLock<Option<DatabaseManager>>>,
> = std::sync::LazyLock::new(|| std::sync::Arc::new(tokio::sync::RwLock::new(None)));

/// Initialize the global database manager from configuration
pub async fn init_database() -> Result<()> {
    let config = crate::config::config()?;
    let db = &config.database;
    info!("Initializing database at {}", db.url);

    let manager = DatabaseManager::new(&db.url, db.max_connections, db.auto_migrate).await?;

    let mut db_guard = DB_MANAGER.write().await;
    *db_guard = Some(manager);

    info!("Database manager initialized successfully");
    Ok(())
}

/// Get the global database manager
pub fn database() -> std::sync::Arc<tokio::sync::RwLock<Option<DatabaseManager>>> {
    DB_MANAGER.clone()
}

/// Shutdown the global database connections
pub async fn shutdown_database() {
    let db_guard = DB_MANAGER.read().await;
    if let Some(ref manager) = *db_guard {
        manager.shutdown().await;
    }
}
