use anyhow::Result;

use crate::error::RunError;
use crate::mask::BinaryMask;
use crate::series::reader::SeriesReader;

#[cfg(feature = "mt")]
use rayon::prelude::*;

/// Z-score one volume over the in-mask voxels. Statistics use the
/// population variance. A constant in-mask volume yields all-zero
/// z-scores; out-of-mask voxels are zeroed and never enter the stats.
pub fn zscore_volume(vol: &[f32], mask: &BinaryMask) -> Result<Vec<f32>, RunError> {
    if vol.len() != mask.len() {
        return Err(RunError::shape("volume vs mask", vol.len(), mask.len()));
    }
    let n = mask.n_include();
    let mut out = vec![0.0f32; vol.len()];
    if n == 0 {
        return Ok(out);
    }

    let mut sum = 0.0f64;
    for (i, v) in vol.iter().enumerate() {
        if mask.includes(i) {
            sum += *v as f64;
        }
    }
    let mean = sum / n as f64;

    let mut sq = 0.0f64;
    for (i, v) in vol.iter().enumerate() {
        if mask.includes(i) {
            let d = *v as f64 - mean;
            sq += d * d;
        }
    }
    let sd = (sq / n as f64).sqrt();
    if sd == 0.0 {
        return Ok(out);
    }

    for (i, v) in vol.iter().enumerate() {
        if mask.includes(i) {
            out[i] = ((*v as f64 - mean) / sd) as f32;
        }
    }
    Ok(out)
}

/// Normalize every volume of the series, order preserved. Parallel
/// across volumes under a bounded pool; `threads == 0` leaves the pool
/// size to rayon.
pub fn normalize_series(
    reader: &SeriesReader<'_>,
    mask: &BinaryMask,
    threads: usize,
) -> Result<Vec<Vec<f32>>> {
    #[cfg(feature = "mt")]
    {
        let mut builder = rayon::ThreadPoolBuilder::new();
        if threads > 0 {
            builder = builder.num_threads(threads);
        }
        let pool = builder
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build thread pool: {}", e))?;
        pool.install(|| {
            (0..reader.n_vols())
                .into_par_iter()
                .map(|t| Ok(zscore_volume(reader.volume(t)?, mask)?))
                .collect::<Result<Vec<Vec<f32>>>>()
        })
    }

    #[cfg(not(feature = "mt"))]
    {
        let _ = threads;
        let mut out = Vec::with_capacity(reader.n_vols());
        for t in 0..reader.n_vols() {
            out.push(zscore_volume(reader.volume(t)?, mask)?);
        }
        Ok(out)
    }
}
