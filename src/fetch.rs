use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use anyhow::Result;
use flate2::read::GzDecoder;
use tracing::info;

use crate::ctx::RunKey;
use crate::error::RunError;

/// Retrieval of run inputs into the local working tree. Failures are
/// reported, never retried here.
pub trait Fetch {
    /// Fetch the cleaned 4-D series for one unit, return the local path.
    fn fetch_series(&self, key: &RunKey, dest_dir: &Path) -> Result<PathBuf>;

    /// Fetch the valid-voxel mask, return the local path.
    fn fetch_mask(&self, mask_name: &str, dest_dir: &Path) -> Result<PathBuf>;

    /// Fetch the classifier's weighted-importance table.
    fn fetch_weights(
        &self,
        model: &str,
        task: &str,
        contrast: &str,
        dest_dir: &Path,
    ) -> Result<PathBuf>;
}

/// Copies inputs from a mounted data root, gunzipping `.gz` sources
/// transparently. Files already present in the destination are not
/// fetched again.
#[derive(Debug, Clone)]
pub struct LocalSync {
    root: PathBuf,
}

impl LocalSync {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    fn sync(&self, rel: &Path, dest_dir: &Path, what: &str) -> Result<PathBuf> {
        let name = rel
            .file_name()
            .ok_or_else(|| RunError::FetchFailure {
                what: what.to_string(),
                reason: format!("bad source path {}", rel.display()),
            })?
            .to_owned();
        let dest = dest_dir.join(&name);
        if dest.exists() {
            return Ok(dest);
        }

        fs::create_dir_all(dest_dir).map_err(|e| RunError::FetchFailure {
            what: what.to_string(),
            reason: format!("create {}: {}", dest_dir.display(), e),
        })?;

        let plain = self.root.join(rel);
        let mut gz = plain.clone().into_os_string();
        gz.push(".gz");
        let gz = PathBuf::from(gz);

        if plain.exists() {
            fs::copy(&plain, &dest).map_err(|e| RunError::FetchFailure {
                what: what.to_string(),
                reason: format!("copy {}: {}", plain.display(), e),
            })?;
        } else if gz.exists() {
            gunzip(&gz, &dest).map_err(|e| RunError::FetchFailure {
                what: what.to_string(),
                reason: format!("gunzip {}: {}", gz.display(), e),
            })?;
        } else {
            return Err(RunError::FetchFailure {
                what: what.to_string(),
                reason: format!("{} not found", plain.display()),
            }
            .into());
        }
        info!(what, dest = %dest.display(), "fetched");
        Ok(dest)
    }
}

impl Fetch for LocalSync {
    fn fetch_series(&self, key: &RunKey, dest_dir: &Path) -> Result<PathBuf> {
        let rel = Path::new(&key.subj).join(&key.sess).join("rest_series.bin");
        self.sync(&rel, dest_dir, "series")
    }

    fn fetch_mask(&self, mask_name: &str, dest_dir: &Path) -> Result<PathBuf> {
        let rel = Path::new("masks").join(mask_name);
        self.sync(&rel, dest_dir, "mask")
    }

    fn fetch_weights(
        &self,
        model: &str,
        task: &str,
        contrast: &str,
        dest_dir: &Path,
    ) -> Result<PathBuf> {
        let rel = Path::new("classifier").join(format!("weights_{model}_{task}_{contrast}.tsv"));
        self.sync(&rel, dest_dir, "weights")
    }
}

fn gunzip(src: &Path, dest: &Path) -> io::Result<()> {
    let mut decoder = GzDecoder::new(File::open(src)?);
    let mut out = File::create(dest)?;
    io::copy(&mut decoder, &mut out)?;
    Ok(())
}
