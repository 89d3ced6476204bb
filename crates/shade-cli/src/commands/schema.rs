use shade_core::TrackedEntity;

use crate::cli::GlobalFlags;
use crate::output::output;

/// Handle `shade schema`: JSON Schema of entity manifests.
pub fn handle(flags: &GlobalFlags) -> anyhow::Result<()> {
    let schema = schemars::schema_for!(TrackedEntity);
    output(&schema, flags.format)
}
