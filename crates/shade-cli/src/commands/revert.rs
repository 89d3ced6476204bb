use crate::cli::GlobalFlags;
use crate::context::AppContext;
use crate::output::output;

/// Handle `shade revert`.
pub async fn handle(ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    let reverted = ctx.service.revert_last().await?;
    output(&reverted, flags.format)
}
