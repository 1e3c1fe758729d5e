use anyhow::Result;
use tracing::info;

use crate::ctx::{Ctx, UnitState};
use crate::pipeline::Stage;

/// Advisory duplication check against the backing store. A hit marks
/// the unit skipped before any scoring work starts; the insert's
/// uniqueness constraint covers the remaining race window.
pub struct Stage1Guard;

impl Stage1Guard {
    pub fn new() -> Self {
        Self
    }
}

impl Stage for Stage1Guard {
    fn name(&self) -> &'static str {
        "stage1_guard"
    }

    fn run(&self, ctx: &mut Ctx) -> Result<()> {
        let recorded = ctx.store.exists(
            &ctx.key.project,
            &ctx.key.subj,
            &ctx.key.sess,
            &ctx.key.task,
        )?;
        if recorded {
            ctx.state = UnitState::Skipped;
            info!(key = %ctx.key, "results already recorded");
        }
        Ok(())
    }
}
