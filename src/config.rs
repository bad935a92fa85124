use anyhow::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure for sitetrack
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SitetrackConfig {
    /// Database settings
    pub database: DatabaseConfig,
    /// Observability settings
    pub observability: ObservabilityConfig,
    /// Alert coordinator settings
    pub alerts: AlertConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// Database URL (SQLite file path or connection string)
    pub url: String,
    /// Maximum connections in pool
    pub max_connections: u32,
    /// Bootstrap the schema automatically on startup
    pub auto_migrate: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Enable structured tracing output
    pub tracing_enabled: bool,
    /// Log level
    pub log_level: String,
    /// Enable metrics collection
    pub metrics_enabled: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AlertConfig {
    /// Lead time applied when a line item has no usable lead time of its own
    pub default_lead_days: i64,
}

impl Default for SitetrackConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: ".sitetrack/sitetrack.db".to_string(),
                max_connections: 10,
                auto_migrate: true,
            },
            observability: ObservabilityConfig {
                tracing_enabled: true,
                log_level: "info".to_string(),
                metrics_enabled: true,
            },
            alerts: AlertConfig {
                default_lead_days: 1,
            },
        }
    }
}

impl SitetrackConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Default values
    /// 2. Configuration files (sitetrack.toml, .sitetrack-rc)
    /// 3. Environment variables (prefixed with SITETRACK_)
    pub fn load() -> Result<Self> {
        let defaults = Self::default();
        let mut builder = Config::builder()
            .set_default("database.url", defaults.database.url.clone())?
            .set_default("database.max_connections", defaults.database.max_connections)?
            .set_default("database.auto_migrate", defaults.database.auto_migrate)?
            .set_default(
                "observability.tracing_enabled",
                defaults.observability.tracing_enabled,
            )?
            .set_default("observability.log_level", defaults.observability.log_level.clone())?
            .set_default(
                "observability.metrics_enabled",
                defaults.observability.metrics_enabled,
            )?
            .set_default("alerts.default_lead_days", defaults.alerts.default_lead_days)?;

        if Path::new("sitetrack.toml").exists() {
            builder = builder.add_source(File::with_name("sitetrack"));
        }

        if Path::new(".sitetrack-rc").exists() {
            builder = builder.add_source(File::with_name(".sitetrack-rc"));
        }

        builder = builder.add_source(
            Environment::with_prefix("SITETRACK")
                .separator("_")
                .try_parsing(true),
        );

        let config = builder.build()?;
        Ok(config.try_deserialize()?)
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let toml_content = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_content)?;
        Ok(())
    }

    /// Load .env file if it exists
    pub fn load_env_file() -> Result<()> {
        if Path::new(".env").exists() {
            dotenvy::dotenv()?;
            tracing::info!("Loaded environment variables from .env file");
        }
        Ok(())
    }
}

/// Global configuration instance
static CONFIG: std::sync::LazyLock<Result<SitetrackConfig, anyhow::Error>> =
    std::sync::LazyLock::new(|| {
        let _ = SitetrackConfig::load_env_file();
        SitetrackConfig::load()
    });

/// Get the global configuration
pub fn config() -> Result<&'static SitetrackConfig> {
    CONFIG
        .as_ref()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))
}

/// Initialize configuration (called at startup)
pub fn init_config() -> Result<()> {
    let _config = config()?;
    tracing::info!("Configuration loaded successfully");
    Ok(())
}
