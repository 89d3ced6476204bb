use std::path::PathBuf;

use clap::{Args, Subcommand};

/// Top-level command tree.
#[derive(Clone, Debug, Subcommand)]
pub enum Commands {
    /// Create `.shade/` with a config file and the audit store.
    Init(InitArgs),
    /// Print the migration `track` or `cutover` would apply, without applying it.
    Plan(PlanArgs),
    /// Start capturing an entity described by a TOML manifest.
    Track(ChangeArgs),
    /// Retire the current audit table of an entity and start a new one.
    Cutover(ChangeArgs),
    /// Stop capturing an entity; its audit tables are kept.
    Untrack(UntrackArgs),
    /// Revert the most recently applied migration.
    Revert,
    /// List applied migrations.
    Migrations,
    /// List audit table versions.
    Versions(VersionsArgs),
    /// Read rows from one audit table of an entity.
    Records(RecordsArgs),
    /// History of one business key across every audit table of an entity.
    History(HistoryArgs),
    /// Print the JSON Schema of entity manifests.
    Schema,
}

#[derive(Clone, Debug, Args)]
pub struct InitArgs {
    /// Overwrite an existing `.shade/config.toml`.
    #[arg(long)]
    pub force: bool,
}

#[derive(Clone, Debug, Args)]
pub struct PlanArgs {
    #[command(flatten)]
    pub target: ChangeArgs,
    /// Print only the backward SQL.
    #[arg(long, conflicts_with = "up_only")]
    pub down_only: bool,
    /// Print only the forward SQL.
    #[arg(long)]
    pub up_only: bool,
}

/// Manifest, effective date and optional live-table DDL.
#[derive(Clone, Debug, Args)]
pub struct ChangeArgs {
    /// Path to the entity manifest (TOML).
    pub manifest: PathBuf,
    /// Effective date (YYYY-MM-DD); defaults to today (UTC).
    #[arg(long)]
    pub date: Option<String>,
    #[command(flatten)]
    pub change: AlterArgs,
}

/// Live-table DDL bundled into the generated migration.
#[derive(Clone, Debug, Default, Args)]
pub struct AlterArgs {
    /// SQL file applied to the live table in the forward migration.
    #[arg(long, requires = "alter_down")]
    pub alter_up: Option<PathBuf>,
    /// SQL file that undoes `--alter-up`.
    #[arg(long, requires = "alter_up")]
    pub alter_down: Option<PathBuf>,
}

#[derive(Clone, Debug, Args)]
pub struct UntrackArgs {
    /// Entity name.
    pub entity: String,
    /// Retirement date (YYYY-MM-DD); defaults to today (UTC).
    #[arg(long)]
    pub date: Option<String>,
}

#[derive(Clone, Debug, Args)]
pub struct VersionsArgs {
    /// Entity name; all entities when omitted.
    pub entity: Option<String>,
    /// Only the version active on this date (YYYY-MM-DD).
    #[arg(long, requires = "entity")]
    pub at: Option<String>,
}

#[derive(Clone, Debug, Args)]
pub struct RecordsArgs {
    /// Entity name.
    pub entity: String,
    /// Audit table to read; the newest version when omitted.
    #[arg(long)]
    pub table: Option<String>,
}

#[derive(Clone, Debug, Args)]
pub struct HistoryArgs {
    /// Entity name.
    pub entity: String,
    /// Business key column, as `column=value`. Repeat for composite keys.
    #[arg(long, required = true)]
    pub key: Vec<String>,
}
