use anyhow::{Context, Result};
use tracing::info;

use crate::ctx::{Ctx, UnitState};
use crate::label::label_volumes;
use crate::pipeline::Stage;

/// Aggregate the score grid into the ordered results table and assign
/// each volume its maximizing emotion.
pub struct Stage5Label;

impl Stage5Label {
    pub fn new() -> Self {
        Self
    }
}

impl Stage for Stage5Label {
    fn name(&self) -> &'static str {
        "stage5_label"
    }

    fn run(&self, ctx: &mut Ctx) -> Result<()> {
        ctx.state = UnitState::Aggregating;
        let grid = ctx.grid.as_ref().context("score grid missing")?;
        let table = label_volumes(grid, &ctx.emotions)?;
        info!(n_rows = table.len(), "volumes labeled");
        ctx.table = Some(table);
        Ok(())
    }
}
