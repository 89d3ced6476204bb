use crate::cli::GlobalFlags;
use crate::cli::root_commands::Commands;
use crate::commands;
use crate::context::AppContext;

/// Dispatch a parsed command to the corresponding handler module.
pub async fn dispatch(
    command: Commands,
    ctx: &AppContext,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    match command {
        Commands::Plan(args) => commands::plan::handle(&args, ctx, flags).await,
        Commands::Track(args) => commands::track::handle(&args, ctx, flags).await,
        Commands::Cutover(args) => commands::cutover::handle(&args, ctx, flags).await,
        Commands::Untrack(args) => commands::untrack::handle(&args, ctx, flags).await,
        Commands::Revert => commands::revert::handle(ctx, flags).await,
        Commands::Migrations => commands::migrations::handle(ctx, flags).await,
        Commands::Versions(args) => commands::versions::handle(&args, ctx, flags).await,
        Commands::Records(args) => commands::records::handle(&args, ctx, flags).await,
        Commands::History(args) => commands::history::handle(&args, ctx, flags).await,
        Commands::Init(_) | Commands::Schema => {
            unreachable!("init/schema are pre-dispatched in main")
        }
    }
}
