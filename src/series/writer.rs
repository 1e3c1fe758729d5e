use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result, bail};

use crate::series::layout::{VolHeaderV1, write_header};

/// Write `data` as a volume file at `path`. The number of volumes is
/// derived from `data.len()` and the spatial dims.
pub fn write_volumes(path: &Path, dims: [u32; 3], data: &[f32]) -> Result<()> {
    let vol_len = dims[0] as usize * dims[1] as usize * dims[2] as usize;
    if vol_len == 0 {
        bail!("cannot write volume with a zero dimension");
    }
    if data.is_empty() || data.len() % vol_len != 0 {
        bail!(
            "voxel buffer length {} is not a positive multiple of volume length {}",
            data.len(),
            vol_len
        );
    }
    let header = VolHeaderV1::new(dims, (data.len() / vol_len) as u32);

    let file = File::create(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    let mut w = BufWriter::new(file);
    write_header(&mut w, &header)?;
    for v in data {
        w.write_all(&v.to_le_bytes())?;
    }
    w.flush()?;
    Ok(())
}
