use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{Context, Result, bail};
use tracing::info;

use crate::error::RunError;
use crate::fetch::Fetch;
use crate::maps::{MapKind, map_file_name};
use crate::mask::BinaryMask;
use crate::series::writer::write_volumes;

/// Materialize per-emotion importance and significance-mask volumes
/// from the classifier's weighted-importance table. Each table row
/// lists one emotion's weights for the in-mask voxels in scan order;
/// the weights are scattered back into the mask's voxel grid. The
/// significance mask marks the nonzero-weight voxels.
///
/// Returns false without touching anything when the first roster
/// emotion's map is already present.
pub fn ensure_maps(
    fetch: &dyn Fetch,
    work_dir: &Path,
    mask_name: &str,
    model: &str,
    task: &str,
    contrast: &str,
    emotions: &[String],
) -> Result<bool> {
    let first = emotions.first().context("empty emotion roster")?;
    let marker = work_dir.join(map_file_name(MapKind::Importance, model, task, contrast, first));
    if marker.exists() {
        info!(task, "importance maps present, setup skipped");
        return Ok(false);
    }

    let mask_path = fetch.fetch_mask(mask_name, work_dir)?;
    let mask = BinaryMask::load(&mask_path)?;
    let weights_path = fetch.fetch_weights(model, task, contrast, work_dir)?;
    let rows = read_weight_table(&weights_path)?;

    for emotion in emotions {
        let weights = rows.get(emotion).ok_or_else(|| RunError::MissingMap {
            emotion: emotion.clone(),
            path: weights_path.clone(),
        })?;
        if weights.len() != mask.n_include() {
            bail!(
                "weight row for '{}' has {} values, mask includes {} voxels",
                emotion,
                weights.len(),
                mask.n_include()
            );
        }

        let mut vol = vec![0.0f32; mask.len()];
        let mut sig = vec![0.0f32; mask.len()];
        let mut k = 0usize;
        for i in 0..mask.len() {
            if mask.includes(i) {
                let w = weights[k];
                k += 1;
                vol[i] = w;
                if w != 0.0 {
                    sig[i] = 1.0;
                }
            }
        }

        let map_path =
            work_dir.join(map_file_name(MapKind::Importance, model, task, contrast, emotion));
        write_volumes(&map_path, mask.dims(), &vol)?;
        let sig_path =
            work_dir.join(map_file_name(MapKind::Binary, model, task, contrast, emotion));
        write_volumes(&sig_path, mask.dims(), &sig)?;
        info!(emotion, map = %map_path.display(), "importance map written");
    }
    Ok(true)
}

/// Parse the weighted-importance TSV: header `emo_id<TAB>...`, one row
/// per emotion with tab-separated voxel weights.
fn read_weight_table(path: &Path) -> Result<HashMap<String, Vec<f32>>> {
    let file =
        File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let mut lines = BufReader::new(file).lines();
    let header = lines.next().context("weight table is empty")??;
    if !header.starts_with("emo_id") {
        bail!("weight table missing emo_id header");
    }

    let mut rows = HashMap::new();
    for line in lines {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let mut fields = line.split('\t');
        let emotion = fields
            .next()
            .context("weight row missing emo_id field")?
            .to_string();
        let mut weights = Vec::new();
        for field in fields {
            weights.push(
                field
                    .parse::<f32>()
                    .with_context(|| format!("bad weight '{}' for '{}'", field, emotion))?,
            );
        }
        rows.insert(emotion, weights);
    }
    Ok(rows)
}
