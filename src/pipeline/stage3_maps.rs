use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use crate::ctx::Ctx;
use crate::error::RunError;
use crate::maps::ImportanceMapSet;
use crate::pipeline::Stage;

/// Load the per-emotion importance maps once and hand them to the
/// scoring workers read-only.
pub struct Stage3Maps;

impl Stage3Maps {
    pub fn new() -> Self {
        Self
    }
}

impl Stage for Stage3Maps {
    fn name(&self) -> &'static str {
        "stage3_maps"
    }

    fn run(&self, ctx: &mut Ctx) -> Result<()> {
        let mask = ctx.valid_mask.as_ref().context("valid mask missing")?;
        let set = ImportanceMapSet::load(
            &ctx.maps_dir,
            &ctx.key.model,
            &ctx.key.task,
            &ctx.key.contrast,
            ctx.mask_sig,
            &ctx.emotions,
        )?;
        if set.dims() != mask.dims() {
            return Err(RunError::shape(
                "importance maps vs mask",
                format!("{:?}", set.dims()),
                format!("{:?}", mask.dims()),
            )
            .into());
        }
        info!(n_maps = set.len(), "importance maps loaded");
        ctx.maps = Some(Arc::new(set));
        Ok(())
    }
}
