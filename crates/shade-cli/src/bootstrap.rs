use std::path::{Path, PathBuf};

use anyhow::Context;
use shade_config::ShadeConfig;

use crate::cli::GlobalFlags;
use crate::context::find_project_root;

/// Locate the project, load `.env`, then the layered config, then apply
/// CLI overrides.
pub fn load_config(flags: &GlobalFlags) -> anyhow::Result<(Option<PathBuf>, ShadeConfig)> {
    let cwd = std::env::current_dir().context("failed to determine current directory")?;
    let project_root = find_project_root(&cwd);

    load_project_dotenv(project_root.as_deref())?;

    let mut config = ShadeConfig::load_in(project_root.as_deref().unwrap_or(&cwd))
        .context("failed to load shade configuration")?;
    if let Some(db) = &flags.db {
        config.database.path.clone_from(db);
    }

    Ok((project_root, config))
}

fn load_project_dotenv(project_root: Option<&Path>) -> anyhow::Result<()> {
    if let Some(root) = project_root {
        let env_path = root.join(".env");
        if env_path.exists() {
            dotenvy::from_path(&env_path)
                .with_context(|| format!("failed to load dotenv file at {}", env_path.display()))?;
            return Ok(());
        }
    }

    dotenvy::dotenv().ok();
    Ok(())
}
