use anyhow::Result;
use tracing::info;

use crate::ctx::{Ctx, UnitState};
use crate::error::RunError;
use crate::fetch::Fetch;
use crate::mask::BinaryMask;
use crate::pipeline::Stage;
use crate::series::reader;

/// Fetch the unit's 4-D series and the valid-voxel mask, then check
/// that their spatial shapes agree before any scoring work.
pub struct Stage2Fetch {
    fetch: Box<dyn Fetch>,
}

impl Stage2Fetch {
    pub fn new(fetch: Box<dyn Fetch>) -> Self {
        Self { fetch }
    }
}

impl Stage for Stage2Fetch {
    fn name(&self) -> &'static str {
        "stage2_fetch"
    }

    fn run(&self, ctx: &mut Ctx) -> Result<()> {
        ctx.state = UnitState::Running;

        let series_path = self.fetch.fetch_series(&ctx.key, &ctx.output.unit_dir)?;
        let mask_path = self.fetch.fetch_mask(&ctx.mask_name, &ctx.maps_dir)?;

        let (header, mmap) = reader::open_mmap(&series_path)?;
        let mask = BinaryMask::load(&mask_path)?;
        if header.dims() != mask.dims() {
            return Err(RunError::shape(
                "series vs mask",
                format!("{:?}", header.dims()),
                format!("{:?}", mask.dims()),
            )
            .into());
        }

        info!(
            n_vols = header.nt,
            in_mask = mask.n_include(),
            "series ready"
        );
        ctx.series_path = Some(series_path);
        ctx.series_header = Some(header);
        ctx.series_mmap = Some(mmap);
        ctx.valid_mask = Some(mask);
        Ok(())
    }
}
