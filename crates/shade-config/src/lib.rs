//! # shade-config
//!
//! Layered configuration loading for shade using figment.
//!
//! Configuration sources (in priority order, highest wins):
//! 1. Environment variables (`SHADE_*` prefix, `__` as separator)
//! 2. Project-level `.shade/config.toml`
//! 3. User-level `~/.config/shade/config.toml`
//! 4. Built-in defaults
//!
//! # Environment Variable Mapping
//!
//! Figment maps `SHADE_DATABASE__PATH` -> `database.path`,
//! `SHADE_AUDIT__TABLE_PREFIX` -> `audit.table_prefix`, etc.
//!
//! # Usage
//!
//! ```no_run
//! use shade_config::ShadeConfig;
//!
//! let config = ShadeConfig::load_with_dotenv().expect("config");
//! println!("store: {}", config.database.path);
//! ```

mod audit;
mod database;
mod error;
mod general;

pub use audit::AuditConfig;
pub use database::DatabaseConfig;
pub use error::ConfigError;
pub use general::GeneralConfig;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ShadeConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub audit: AuditConfig,
    #[serde(default)]
    pub general: GeneralConfig,
}

impl ShadeConfig {
    /// Load configuration from all sources (TOML files + environment variables).
    ///
    /// Does NOT call `dotenvy` -- use [`Self::load_with_dotenv`] for `.env` support.
    pub fn load() -> Result<Self, ConfigError> {
        let config: Self = Self::figment().extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration with `.env` file support.
    pub fn load_with_dotenv() -> Result<Self, ConfigError> {
        Self::load_dotenv_from_workspace();
        Self::load()
    }

    /// Load configuration using `{project_dir}/.shade/config.toml` as the
    /// project layer, for callers running outside the project root.
    pub fn load_in(project_dir: &Path) -> Result<Self, ConfigError> {
        let config: Self = Self::figment_in(project_dir).extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Build the figment provider chain.
    ///
    /// Public so callers can layer extra providers (e.g. CLI flags) on top.
    pub fn figment() -> Figment {
        Self::figment_in(Path::new("."))
    }

    /// Provider chain with the project layer read from `project_dir`.
    pub fn figment_in(project_dir: &Path) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Layer 1: User-global config
        if let Some(global_path) = Self::global_config_path() {
            if global_path.exists() {
                figment = figment.merge(Toml::file(global_path));
            }
        }

        // Layer 2: Project-local config
        let local_path = project_dir.join(".shade").join("config.toml");
        if local_path.exists() {
            figment = figment.merge(Toml::file(local_path));
        }

        // Layer 3: Environment variables (highest priority)
        figment = figment.merge(Env::prefixed("SHADE_").split("__"));

        figment
    }

    /// Check values figment cannot type-check.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.audit.validate()
    }

    /// Path to the user-global config file.
    fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("shade").join("config.toml"))
    }

    /// Load `.env` from the workspace root, falling back to the current dir.
    fn load_dotenv_from_workspace() {
        if let Ok(manifest_dir) = std::env::var("CARGO_MANIFEST_DIR") {
            let mut dir = PathBuf::from(manifest_dir);
            // crate -> crates/ -> workspace root
            for _ in 0..3 {
                let env_path = dir.join(".env");
                if env_path.exists() {
                    let _ = dotenvy::from_path(&env_path);
                    return;
                }
                if !dir.pop() {
                    break;
                }
            }
        }

        let _ = dotenvy::dotenv();
    }
}
