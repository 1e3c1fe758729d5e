use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use memmap2::Mmap;

use crate::db::Store;
use crate::label::ResultsTable;
use crate::maps::ImportanceMapSet;
use crate::mask::BinaryMask;
use crate::schema::v1::{DotProdV1, RunMeta};
use crate::score::ScoreGrid;
use crate::series::layout::VolHeaderV1;
use crate::series::reader::SeriesReader;

/// Identity of one unit of work. Two runs sharing a key must never
/// both write results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunKey {
    pub project: String,
    pub subj: String,
    pub sess: String,
    pub task: String,
    pub model: String,
    pub contrast: String,
}

impl fmt::Display for RunKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} task-{} model-{} con-{}",
            self.project, self.subj, self.sess, self.task, self.model, self.contrast
        )
    }
}

/// Per-unit state machine. Terminal states are Skipped, Persisted, and
/// Failed; a failed unit is retried only by external re-invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitState {
    Pending,
    Skipped,
    Running,
    Aggregating,
    Persisted,
    Failed,
}

impl UnitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Skipped => "skipped",
            Self::Running => "running",
            Self::Aggregating => "aggregating",
            Self::Persisted => "persisted",
            Self::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone)]
pub struct OutputPaths {
    pub unit_dir: PathBuf,
    pub tsv_path: PathBuf,
    pub report_path: PathBuf,
}

/// Mutable state for one unit of work, threaded through the pipeline
/// stages. The importance map set is the only structure shared with
/// worker threads and is handed out read-only behind an Arc.
pub struct Ctx {
    pub key: RunKey,
    pub mask_name: String,
    pub mask_sig: bool,
    pub threads: usize,
    pub emotions: Vec<String>,
    pub maps_dir: PathBuf,
    pub state: UnitState,
    pub store: Store,
    pub output: OutputPaths,
    pub series_path: Option<PathBuf>,
    pub series_header: Option<VolHeaderV1>,
    pub series_mmap: Option<Mmap>,
    pub valid_mask: Option<BinaryMask>,
    pub maps: Option<Arc<ImportanceMapSet>>,
    pub grid: Option<ScoreGrid>,
    pub table: Option<ResultsTable>,
    pub report: DotProdV1,
}

impl Ctx {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        key: RunKey,
        work_dir: &Path,
        mask_name: String,
        mask_sig: bool,
        threads: usize,
        emotions: Vec<String>,
        store: Store,
        tool_version: &str,
    ) -> Self {
        let unit_dir = work_dir.join(&key.subj).join(&key.sess);
        let stem = format!("model-{}_con-{}_task-{}", key.model, key.contrast, key.task);
        let tsv_path = unit_dir.join(format!("dotprod_{stem}.tsv"));
        let report_path = unit_dir.join(format!("report_{stem}.json"));
        let report = DotProdV1::empty(
            tool_version,
            RunMeta {
                project: key.project.clone(),
                subj: key.subj.clone(),
                sess: key.sess.clone(),
                task: key.task.clone(),
                model: key.model.clone(),
                contrast: key.contrast.clone(),
                mask: mask_name.clone(),
                mask_sig,
            },
            emotions.clone(),
        );
        Self {
            key,
            mask_name,
            mask_sig,
            threads,
            emotions,
            maps_dir: work_dir.to_path_buf(),
            state: UnitState::Pending,
            store,
            output: OutputPaths {
                unit_dir,
                tsv_path,
                report_path,
            },
            series_path: None,
            series_header: None,
            series_mmap: None,
            valid_mask: None,
            maps: None,
            grid: None,
            table: None,
            report,
        }
    }

    pub fn series_reader(&self) -> anyhow::Result<SeriesReader<'_>> {
        let header = self
            .series_header
            .as_ref()
            .context("series header missing")?;
        let mmap = self.series_mmap.as_ref().context("series mmap missing")?;
        Ok(SeriesReader::new(header, mmap))
    }
}
