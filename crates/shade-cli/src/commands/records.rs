use crate::cli::GlobalFlags;
use crate::cli::root_commands::RecordsArgs;
use crate::commands::shared::limit::{effective_limit, keep_tail};
use crate::context::AppContext;
use crate::output::output;

/// Handle `shade records`: the newest rows of one audit table, oldest first.
pub async fn handle(args: &RecordsArgs, ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    let (version, mut records) = ctx
        .service
        .records(&args.entity, args.table.as_deref())
        .await?;
    tracing::debug!(audit_table = %version.audit_table, rows = records.len(), "read audit records");

    let limit = effective_limit(None, flags.limit, ctx.config.general.default_limit);
    keep_tail(&mut records, limit);
    output(&records, flags.format)
}
