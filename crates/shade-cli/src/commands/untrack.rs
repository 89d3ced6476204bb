use crate::cli::GlobalFlags;
use crate::cli::root_commands::UntrackArgs;
use crate::commands::shared::parse::parse_date;
use crate::context::AppContext;
use crate::output::output;

/// Handle `shade untrack`.
pub async fn handle(args: &UntrackArgs, ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    let date = parse_date(args.date.as_deref(), "date")?;
    let retired = ctx.service.untrack(&args.entity, date).await?;
    output(&retired, flags.format)
}
