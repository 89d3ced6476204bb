use std::path::Path;

use anyhow::Context;
use shade_core::TrackedEntity;
use shade_db::generator::TableChange;

use crate::cli::root_commands::AlterArgs;

/// Read and validate an entity manifest.
pub fn load_manifest(path: &Path) -> anyhow::Result<TrackedEntity> {
    TrackedEntity::from_toml_file(path)
        .with_context(|| format!("failed to load manifest {}", path.display()))
}

/// Read `--alter-up` / `--alter-down` into a `TableChange`. Clap guarantees
/// both or neither are set.
pub fn load_change(args: &AlterArgs) -> anyhow::Result<Option<TableChange>> {
    let (Some(up), Some(down)) = (&args.alter_up, &args.alter_down) else {
        return Ok(None);
    };
    let read = |path: &Path| {
        std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))
    };
    Ok(Some(TableChange {
        up: read(up)?,
        down: read(down)?,
    }))
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn change_reads_both_files() {
        let dir = TempDir::new().expect("tempdir should create");
        let up = dir.path().join("up.sql");
        let down = dir.path().join("down.sql");
        std::fs::write(&up, "ALTER TABLE widgets ADD COLUMN color TEXT;").expect("write up");
        std::fs::write(&down, "ALTER TABLE widgets DROP COLUMN color;").expect("write down");

        let change = load_change(&AlterArgs {
            alter_up: Some(up),
            alter_down: Some(down),
        })
        .expect("change should load")
        .expect("change should be present");
        assert!(change.up.contains("ADD COLUMN"));
        assert!(change.down.contains("DROP COLUMN"));
    }

    #[test]
    fn no_flags_means_no_change() {
        assert!(load_change(&AlterArgs::default()).expect("ok").is_none());
    }

    #[test]
    fn manifest_errors_name_the_file() {
        let err = load_manifest(Path::new("/nonexistent/widget.toml")).expect_err("should fail");
        assert!(format!("{err:#}").contains("widget.toml"));
    }
}
