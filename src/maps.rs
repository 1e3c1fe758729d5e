use std::path::Path;

use anyhow::Result;

use crate::error::RunError;
use crate::mask::BinaryMask;
use crate::series::reader;

/// Classifier emotion roster. The order is the tie-break priority used
/// when labeling volumes: on equal scores the earlier label wins.
pub const EMOTIONS: [&str; 15] = [
    "amusement",
    "anger",
    "anxiety",
    "awe",
    "calmness",
    "craving",
    "disgust",
    "excitement",
    "fear",
    "horror",
    "joy",
    "neutral",
    "romance",
    "sadness",
    "surprise",
];

pub fn default_emotions() -> Vec<String> {
    EMOTIONS.iter().map(|e| e.to_string()).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapKind {
    Importance,
    Binary,
}

impl MapKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Importance => "importance",
            Self::Binary => "binary",
        }
    }
}

/// File name for a per-emotion map under the fixed naming convention.
pub fn map_file_name(
    kind: MapKind,
    model: &str,
    task: &str,
    contrast: &str,
    emotion: &str,
) -> String {
    format!(
        "{}_{}_{}_{}_{}_map.bin",
        kind.as_str(),
        model,
        task,
        contrast,
        emotion
    )
}

/// One emotion's weight volume, optionally paired with a significance mask.
#[derive(Debug, Clone)]
pub struct ImportanceMap {
    pub emotion: String,
    pub weights: Vec<f32>,
    pub sig: Option<BinaryMask>,
}

/// Immutable per-emotion weight volumes for one (model, task, contrast)
/// identity. Loaded once per unit of work and shared read-only across
/// workers; no mutation path exists after construction.
#[derive(Debug)]
pub struct ImportanceMapSet {
    dims: [u32; 3],
    maps: Vec<ImportanceMap>,
}

impl ImportanceMapSet {
    /// Load one importance map per roster emotion from `dir`. With
    /// `mask_sig`, the paired binary significance mask is required too.
    pub fn load(
        dir: &Path,
        model: &str,
        task: &str,
        contrast: &str,
        mask_sig: bool,
        emotions: &[String],
    ) -> Result<Self> {
        let mut dims: Option<[u32; 3]> = None;
        let mut maps = Vec::with_capacity(emotions.len());
        for emotion in emotions {
            let path = dir.join(map_file_name(
                MapKind::Importance,
                model,
                task,
                contrast,
                emotion,
            ));
            if !path.exists() {
                return Err(RunError::MissingMap {
                    emotion: emotion.clone(),
                    path,
                }
                .into());
            }
            let (map_dims, weights) = reader::read_volume(&path)?;
            match dims {
                None => dims = Some(map_dims),
                Some(want) if want != map_dims => {
                    return Err(RunError::shape(
                        "importance map set",
                        format!("{:?}", map_dims),
                        format!("{:?}", want),
                    )
                    .into());
                }
                Some(_) => {}
            }

            let sig = if mask_sig {
                let sig_path = dir.join(map_file_name(
                    MapKind::Binary,
                    model,
                    task,
                    contrast,
                    emotion,
                ));
                if !sig_path.exists() {
                    return Err(RunError::MissingMap {
                        emotion: emotion.clone(),
                        path: sig_path,
                    }
                    .into());
                }
                let mask = BinaryMask::load(&sig_path)?;
                if mask.dims() != map_dims {
                    return Err(RunError::shape(
                        "significance mask",
                        format!("{:?}", mask.dims()),
                        format!("{:?}", map_dims),
                    )
                    .into());
                }
                Some(mask)
            } else {
                None
            };

            maps.push(ImportanceMap {
                emotion: emotion.clone(),
                weights,
                sig,
            });
        }

        let dims = dims.ok_or_else(|| anyhow::anyhow!("empty emotion roster"))?;
        Ok(Self { dims, maps })
    }

    pub fn dims(&self) -> [u32; 3] {
        self.dims
    }

    pub fn len(&self) -> usize {
        self.maps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.maps.is_empty()
    }

    pub fn get(&self, idx: usize) -> &ImportanceMap {
        &self.maps[idx]
    }

    pub fn maps(&self) -> &[ImportanceMap] {
        &self.maps
    }
}
