use std::path::{Path, PathBuf};

use anyhow::Context;
use shade_config::ShadeConfig;
use shade_db::service::AuditService;

/// Shared application resources initialized once at startup.
pub struct AppContext {
    pub service: AuditService,
    pub config: ShadeConfig,
}

impl AppContext {
    /// Open the audit store named by `config.database.path`.
    ///
    /// A relative path resolves against the project root (the directory
    /// holding `.shade/`), or the current directory outside a project.
    pub async fn init(project_root: Option<&Path>, config: ShadeConfig) -> anyhow::Result<Self> {
        let db_path = resolve_db_path(project_root, &config);
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if !config.database.is_in_memory() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("failed to create database directory {}", parent.display())
                })?;
            }
        }

        let db_path = db_path.to_string_lossy();
        tracing::debug!(path = %db_path, prefix = %config.audit.table_prefix, "opening audit store");
        let service = AuditService::open_local(&db_path, &config.audit.table_prefix)
            .await
            .with_context(|| format!("failed to open audit store at {db_path}"))?;

        Ok(Self { service, config })
    }
}

fn resolve_db_path(project_root: Option<&Path>, config: &ShadeConfig) -> PathBuf {
    let configured = PathBuf::from(&config.database.path);
    if config.database.is_in_memory() || configured.is_absolute() {
        return configured;
    }
    project_root.map_or(configured.clone(), |root| root.join(&configured))
}
