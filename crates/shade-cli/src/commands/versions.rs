use anyhow::Context;

use crate::cli::GlobalFlags;
use crate::cli::root_commands::VersionsArgs;
use crate::commands::shared::parse::parse_date;
use crate::context::AppContext;
use crate::output::output;

/// Handle `shade versions`.
pub async fn handle(args: &VersionsArgs, ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    if let (Some(entity), Some(at)) = (&args.entity, &args.at) {
        let date = parse_date(Some(at), "at")?;
        let registry = ctx.service.registry().await?;
        let version = registry
            .version_at(entity, date)
            .with_context(|| format!("no audit table of '{entity}' covers {date}"))?;
        return output(version, flags.format);
    }

    let versions = ctx.service.versions(args.entity.as_deref()).await?;
    output(&versions, flags.format)
}
