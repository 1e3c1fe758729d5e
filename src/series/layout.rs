use std::io::{Read, Write};

use anyhow::{Context, Result, bail};

pub const MAGIC: [u8; 8] = *b"RESTVOL1";
pub const VERSION: u32 = 1;
pub const HEADER_SIZE: usize = 32;

/// Header of a `.bin` volume file: `nt` consecutive 3-D volumes of
/// `nx * ny * nz` little-endian f32 voxels, x fastest. Maps and masks
/// carry `nt == 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VolHeaderV1 {
    pub version: u32,
    pub nx: u32,
    pub ny: u32,
    pub nz: u32,
    pub nt: u32,
}

impl VolHeaderV1 {
    pub fn new(dims: [u32; 3], nt: u32) -> Self {
        Self {
            version: VERSION,
            nx: dims[0],
            ny: dims[1],
            nz: dims[2],
            nt,
        }
    }

    pub fn dims(&self) -> [u32; 3] {
        [self.nx, self.ny, self.nz]
    }

    /// Voxels per single 3-D volume.
    pub fn vol_len(&self) -> usize {
        self.nx as usize * self.ny as usize * self.nz as usize
    }

    pub fn expected_len(&self) -> usize {
        HEADER_SIZE + self.vol_len() * self.nt as usize * 4
    }

    pub fn voxels_offset(&self) -> usize {
        HEADER_SIZE
    }
}

pub fn write_header<W: Write>(mut w: W, header: &VolHeaderV1) -> Result<()> {
    w.write_all(&MAGIC)?;
    w.write_all(&header.version.to_le_bytes())?;
    w.write_all(&header.nx.to_le_bytes())?;
    w.write_all(&header.ny.to_le_bytes())?;
    w.write_all(&header.nz.to_le_bytes())?;
    w.write_all(&header.nt.to_le_bytes())?;
    w.write_all(&0u32.to_le_bytes())?;
    Ok(())
}

pub fn read_header<R: Read>(mut r: R) -> Result<VolHeaderV1> {
    let mut magic = [0u8; 8];
    r.read_exact(&mut magic)?;
    if magic != MAGIC {
        bail!("volume file magic mismatch");
    }
    let version = read_u32(&mut r)?;
    if version != VERSION {
        bail!("unsupported volume file version {}", version);
    }
    let nx = read_u32(&mut r)?;
    let ny = read_u32(&mut r)?;
    let nz = read_u32(&mut r)?;
    let nt = read_u32(&mut r)?;
    let _reserved = read_u32(&mut r)?;
    if nx == 0 || ny == 0 || nz == 0 || nt == 0 {
        bail!("volume file declares a zero dimension");
    }
    Ok(VolHeaderV1 {
        version,
        nx,
        ny,
        nz,
        nt,
    })
}

fn read_u32<R: Read>(mut r: R) -> Result<u32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf).context("failed to read u32")?;
    Ok(u32::from_le_bytes(buf))
}
