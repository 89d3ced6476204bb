use std::path::PathBuf;

use anyhow::{Context, bail};
use serde::Serialize;
use shade_config::ShadeConfig;

use crate::bootstrap;
use crate::cli::GlobalFlags;
use crate::cli::root_commands::InitArgs;
use crate::context::{AppContext, SHADE_DIR};
use crate::output::output;

#[derive(Debug, Serialize)]
struct InitResponse {
    config: PathBuf,
    database: String,
    table_prefix: String,
}

/// Handle `shade init`: write `.shade/config.toml` with defaults and create
/// the audit store with its base schema.
pub async fn handle(args: &InitArgs, flags: &GlobalFlags) -> anyhow::Result<()> {
    let cwd = std::env::current_dir().context("failed to determine current directory")?;
    let shade_dir = cwd.join(SHADE_DIR);
    let config_path = shade_dir.join("config.toml");

    if config_path.exists() && !args.force {
        bail!(
            "{} already exists (use --force to overwrite)",
            config_path.display()
        );
    }

    std::fs::create_dir_all(&shade_dir)
        .with_context(|| format!("failed to create {}", shade_dir.display()))?;
    let rendered =
        toml::to_string_pretty(&ShadeConfig::default()).context("failed to render config")?;
    std::fs::write(&config_path, rendered)
        .with_context(|| format!("failed to write {}", config_path.display()))?;
    tracing::info!(path = %config_path.display(), "wrote config");

    let (project_root, config) = bootstrap::load_config(flags)?;
    let ctx = AppContext::init(project_root.as_deref(), config).await?;

    output(
        &InitResponse {
            config: config_path,
            database: ctx.config.database.path.clone(),
            table_prefix: ctx.service.table_prefix().to_string(),
        },
        flags.format,
    )
}
