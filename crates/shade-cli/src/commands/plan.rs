use serde::Serialize;
use shade_core::AuditTableVersion;
use shade_core::diff::ShapeDiff;

use crate::cli::GlobalFlags;
use crate::cli::root_commands::PlanArgs;
use crate::commands::shared::manifest::{load_change, load_manifest};
use crate::commands::shared::parse::parse_date;
use crate::context::AppContext;
use crate::output::output;

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
enum PlanKind {
    Track,
    Cutover,
}

#[derive(Debug, Serialize)]
struct PlanResponse<'a> {
    kind: PlanKind,
    name: &'a str,
    version: &'a AuditTableVersion,
    #[serde(skip_serializing_if = "Option::is_none")]
    diff: Option<&'a ShapeDiff>,
    up: &'a str,
    down: &'a str,
}

/// Handle `shade plan`: a cutover when the entity is already tracked,
/// otherwise initial tracking. Nothing is applied.
pub async fn handle(args: &PlanArgs, ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    let entity = load_manifest(&args.target.manifest)?;
    let date = parse_date(args.target.date.as_deref(), "date")?;
    let change = load_change(&args.target.change)?;

    let tracked = ctx.service.registry().await?.current(&entity.name).is_some();
    let (kind, plan) = if tracked {
        let plan = ctx
            .service
            .plan_cutover(&entity, date, change.as_ref())
            .await?;
        (PlanKind::Cutover, plan)
    } else {
        let plan = ctx
            .service
            .plan_track(&entity, date, change.as_ref())
            .await?;
        (PlanKind::Track, plan)
    };

    if args.up_only {
        println!("{}", plan.migration.up());
        return Ok(());
    }
    if args.down_only {
        println!("{}", plan.migration.down());
        return Ok(());
    }

    output(
        &PlanResponse {
            kind,
            name: plan.migration.name(),
            version: &plan.version,
            diff: (!plan.diff.is_empty()).then_some(&plan.diff),
            up: plan.migration.up(),
            down: plan.migration.down(),
        },
        flags.format,
    )
}
