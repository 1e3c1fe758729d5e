use anyhow::{Context, Result};
use tracing::info;

use crate::ctx::Ctx;
use crate::norm::normalize_series;
use crate::pipeline::Stage;
use crate::score::score_pairs;

/// Z-score every volume, then fan the (volume, emotion) dot products
/// across the worker pool. The normalized volumes are transient; only
/// the score grid survives this stage.
pub struct Stage4Score;

impl Stage4Score {
    pub fn new() -> Self {
        Self
    }
}

impl Stage for Stage4Score {
    fn name(&self) -> &'static str {
        "stage4_score"
    }

    fn run(&self, ctx: &mut Ctx) -> Result<()> {
        let reader = ctx.series_reader()?;
        let mask = ctx.valid_mask.as_ref().context("valid mask missing")?;
        let maps = ctx.maps.as_ref().context("importance maps missing")?.clone();

        let volumes = normalize_series(&reader, mask, ctx.threads)?;
        let grid = score_pairs(&volumes, &maps, mask, ctx.mask_sig, ctx.threads)?;
        info!(
            n_vols = grid.n_vols(),
            n_emotions = grid.n_emotions(),
            "score grid filled"
        );
        ctx.grid = Some(grid);
        Ok(())
    }
}
