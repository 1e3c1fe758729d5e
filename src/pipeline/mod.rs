use anyhow::Result;
use std::time::Instant;
use tracing::{info, warn};

use crate::ctx::{Ctx, UnitState};

pub mod stage0_scaffold;
pub mod stage1_guard;
pub mod stage2_fetch;
pub mod stage3_maps;
pub mod stage4_score;
pub mod stage5_label;
pub mod stage6_persist;

pub trait Stage {
    fn name(&self) -> &'static str;
    fn run(&self, ctx: &mut Ctx) -> Result<()>;
}

pub struct Pipeline {
    stages: Vec<Box<dyn Stage>>,
}

impl Pipeline {
    pub fn new(stages: Vec<Box<dyn Stage>>) -> Self {
        Self { stages }
    }

    /// Drive one unit of work through the stages. A stage error marks
    /// the unit failed and stops the pipeline; a stage that marks the
    /// unit skipped stops it cleanly.
    pub fn run(&self, ctx: &mut Ctx) -> Result<()> {
        for stage in &self.stages {
            let start = Instant::now();
            info!(stage = stage.name(), key = %ctx.key, "stage started");
            if let Err(err) = stage.run(ctx) {
                let elapsed_ms = start.elapsed().as_millis();
                ctx.state = UnitState::Failed;
                warn!(
                    stage = stage.name(),
                    elapsed_ms = elapsed_ms as u64,
                    "stage failed"
                );
                return Err(err);
            }
            let elapsed_ms = start.elapsed().as_millis();
            info!(
                stage = stage.name(),
                elapsed_ms = elapsed_ms as u64,
                "stage finished"
            );
            if ctx.state == UnitState::Skipped {
                info!(key = %ctx.key, "unit already recorded, remaining stages skipped");
                break;
            }
        }
        Ok(())
    }
}
