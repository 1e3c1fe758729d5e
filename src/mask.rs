use std::path::Path;

use anyhow::Result;

use crate::series::reader;

/// Voxel inclusion mask. Nonzero voxels in the source volume are included.
#[derive(Debug, Clone)]
pub struct BinaryMask {
    dims: [u32; 3],
    include: Vec<bool>,
    n_include: usize,
}

impl BinaryMask {
    pub fn from_voxels(dims: [u32; 3], voxels: &[f32]) -> Self {
        let include: Vec<bool> = voxels.iter().map(|v| *v != 0.0).collect();
        let n_include = include.iter().filter(|b| **b).count();
        Self {
            dims,
            include,
            n_include,
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let (dims, voxels) = reader::read_volume(path)?;
        Ok(Self::from_voxels(dims, &voxels))
    }

    pub fn dims(&self) -> [u32; 3] {
        self.dims
    }

    /// Total voxel count, included or not.
    pub fn len(&self) -> usize {
        self.include.len()
    }

    pub fn is_empty(&self) -> bool {
        self.include.is_empty()
    }

    /// Count of included voxels.
    pub fn n_include(&self) -> usize {
        self.n_include
    }

    #[inline]
    pub fn includes(&self, voxel: usize) -> bool {
        self.include[voxel]
    }
}
