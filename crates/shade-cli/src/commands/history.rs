use crate::cli::GlobalFlags;
use crate::cli::root_commands::HistoryArgs;
use crate::commands::shared::parse::parse_key;
use crate::context::AppContext;
use crate::output::output;

/// Handle `shade history`.
pub async fn handle(args: &HistoryArgs, ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    let key = args
        .key
        .iter()
        .map(|raw| parse_key(raw))
        .collect::<anyhow::Result<Vec<_>>>()?;

    let history = ctx.service.history(&args.entity, &key).await?;
    output(&history, flags.format)
}
