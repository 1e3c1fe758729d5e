use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result, bail};
use memmap2::Mmap;

use crate::series::layout::{HEADER_SIZE, VolHeaderV1, read_header};

/// Read-only view over a memory-mapped volume series.
pub struct SeriesReader<'a> {
    header: &'a VolHeaderV1,
    mmap: &'a Mmap,
}

impl<'a> SeriesReader<'a> {
    pub fn new(header: &'a VolHeaderV1, mmap: &'a Mmap) -> Self {
        Self { header, mmap }
    }

    pub fn n_vols(&self) -> usize {
        self.header.nt as usize
    }

    pub fn dims(&self) -> [u32; 3] {
        self.header.dims()
    }

    pub fn vol_len(&self) -> usize {
        self.header.vol_len()
    }

    /// Voxels of the 3-D volume at time index `t`.
    pub fn volume(&self, t: usize) -> Result<&'a [f32]> {
        if t >= self.n_vols() {
            bail!("volume index {} out of range ({} volumes)", t, self.n_vols());
        }
        let len = self.vol_len();
        let voxels = voxels_slice(self.mmap, self.header);
        Ok(&voxels[t * len..(t + 1) * len])
    }
}

pub fn open_mmap(path: &Path) -> Result<(VolHeaderV1, Mmap)> {
    let file =
        File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let mmap = unsafe {
        Mmap::map(&file).with_context(|| format!("failed to mmap {}", path.display()))?
    };
    if mmap.len() < HEADER_SIZE {
        bail!("{} too small for volume header", path.display());
    }
    let header = read_header(&mmap[..HEADER_SIZE])?;
    let expected = header.expected_len();
    if mmap.len() != expected {
        bail!(
            "{} size mismatch: expected {}, got {}",
            path.display(),
            expected,
            mmap.len()
        );
    }
    Ok((header, mmap))
}

/// Load a single-volume file (map or mask) into memory.
pub fn read_volume(path: &Path) -> Result<([u32; 3], Vec<f32>)> {
    let (header, mmap) = open_mmap(path)?;
    if header.nt != 1 {
        bail!(
            "{} holds {} volumes, expected a single 3-D volume",
            path.display(),
            header.nt
        );
    }
    Ok((header.dims(), voxels_slice(&mmap, &header).to_vec()))
}

pub fn voxels_slice<'a>(mmap: &'a Mmap, header: &VolHeaderV1) -> &'a [f32] {
    let start = header.voxels_offset();
    let bytes = &mmap[start..];
    unsafe { std::slice::from_raw_parts(bytes.as_ptr() as *const f32, bytes.len() / 4) }
}
