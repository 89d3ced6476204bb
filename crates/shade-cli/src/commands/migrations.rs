use crate::cli::GlobalFlags;
use crate::context::AppContext;
use crate::output::output;

/// Handle `shade migrations`.
pub async fn handle(ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    let applied = ctx.service.migrations().await?;
    output(&applied, flags.format)
}
