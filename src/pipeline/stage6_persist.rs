use anyhow::Result;

use crate::ctx::Ctx;
use crate::pipeline::Stage;
use crate::sink;

pub struct Stage6Persist;

impl Stage6Persist {
    pub fn new() -> Self {
        Self
    }
}

impl Stage for Stage6Persist {
    fn name(&self) -> &'static str {
        "stage6_persist"
    }

    fn run(&self, ctx: &mut Ctx) -> Result<()> {
        sink::persist(ctx)
    }
}
