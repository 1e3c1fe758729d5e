use anyhow::Result;

use crate::error::RunError;
use crate::maps::{ImportanceMap, ImportanceMapSet};
use crate::mask::BinaryMask;

#[cfg(feature = "mt")]
use rayon::prelude::*;

/// Dot product between a normalized volume and one importance map over
/// the effective mask (valid-voxel mask, intersected with the map's
/// significance mask when `mask_sig`). Accumulates in f64 in fixed
/// voxel-index order, so repeated invocation is bit-identical.
pub fn dot_score(
    norm: &[f32],
    map: &ImportanceMap,
    valid: &BinaryMask,
    mask_sig: bool,
) -> Result<f64, RunError> {
    if norm.len() != valid.len() {
        return Err(RunError::shape("volume vs mask", norm.len(), valid.len()));
    }
    if map.weights.len() != valid.len() {
        return Err(RunError::shape(
            "importance map vs mask",
            map.weights.len(),
            valid.len(),
        ));
    }
    let sig = if mask_sig { map.sig.as_ref() } else { None };

    let mut acc = 0.0f64;
    for i in 0..norm.len() {
        if !valid.includes(i) {
            continue;
        }
        if let Some(sig) = sig {
            if !sig.includes(i) {
                continue;
            }
        }
        acc += norm[i] as f64 * map.weights[i] as f64;
    }
    Ok(acc)
}

/// Per-(volume, emotion) score collection for one unit of work. Cells
/// start empty; aggregation refuses to run until every cell is filled.
#[derive(Debug, Clone)]
pub struct ScoreGrid {
    n_vols: usize,
    n_emotions: usize,
    cells: Vec<Option<f64>>,
}

impl ScoreGrid {
    pub fn new(n_vols: usize, n_emotions: usize) -> Self {
        Self {
            n_vols,
            n_emotions,
            cells: vec![None; n_vols * n_emotions],
        }
    }

    pub fn n_vols(&self) -> usize {
        self.n_vols
    }

    pub fn n_emotions(&self) -> usize {
        self.n_emotions
    }

    pub fn set(&mut self, vol: usize, emotion: usize, score: f64) {
        self.cells[vol * self.n_emotions + emotion] = Some(score);
    }

    pub fn get(&self, vol: usize, emotion: usize) -> Option<f64> {
        self.cells[vol * self.n_emotions + emotion]
    }

    pub fn missing(&self) -> usize {
        self.cells.iter().filter(|c| c.is_none()).count()
    }
}

/// Fan the (volume, emotion) work items across the bounded pool and
/// collect the grid. A failed item fails the unit; remaining items
/// drain, their results are discarded.
pub fn score_pairs(
    volumes: &[Vec<f32>],
    maps: &ImportanceMapSet,
    valid: &BinaryMask,
    mask_sig: bool,
    threads: usize,
) -> Result<ScoreGrid> {
    let n_vols = volumes.len();
    let n_emotions = maps.len();
    let pairs: Vec<(usize, usize)> = (0..n_vols)
        .flat_map(|t| (0..n_emotions).map(move |e| (t, e)))
        .collect();

    #[cfg(feature = "mt")]
    let results: Vec<(usize, usize, Result<f64, RunError>)> = {
        let mut builder = rayon::ThreadPoolBuilder::new();
        if threads > 0 {
            builder = builder.num_threads(threads);
        }
        let pool = builder
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build thread pool: {}", e))?;
        pool.install(|| {
            pairs
                .par_iter()
                .map(|&(t, e)| (t, e, dot_score(&volumes[t], maps.get(e), valid, mask_sig)))
                .collect()
        })
    };

    #[cfg(not(feature = "mt"))]
    let results: Vec<(usize, usize, Result<f64, RunError>)> = {
        let _ = threads;
        pairs
            .iter()
            .map(|&(t, e)| (t, e, dot_score(&volumes[t], maps.get(e), valid, mask_sig)))
            .collect()
    };

    let mut grid = ScoreGrid::new(n_vols, n_emotions);
    let mut first_err: Option<RunError> = None;
    for (t, e, res) in results {
        match res {
            Ok(score) => grid.set(t, e, score),
            Err(err) => {
                if first_err.is_none() {
                    first_err = Some(err);
                }
            }
        }
    }
    if let Some(err) = first_err {
        return Err(err.into());
    }
    Ok(grid)
}
