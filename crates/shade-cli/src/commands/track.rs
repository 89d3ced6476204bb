use crate::cli::GlobalFlags;
use crate::cli::root_commands::ChangeArgs;
use crate::commands::shared::manifest::{load_change, load_manifest};
use crate::commands::shared::parse::parse_date;
use crate::context::AppContext;
use crate::output::output;

/// Handle `shade track`.
pub async fn handle(args: &ChangeArgs, ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    let entity = load_manifest(&args.manifest)?;
    let date = parse_date(args.date.as_deref(), "date")?;
    let change = load_change(&args.change)?;

    let version = ctx.service.track(&entity, date, change.as_ref()).await?;
    output(&version, flags.format)
}
