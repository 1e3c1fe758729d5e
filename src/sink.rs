use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::ctx::{Ctx, UnitState};
use crate::error::RunError;
use crate::label::ResultsTable;
use crate::schema::v1::{DotProdV1, LabelCount};

/// Persist one unit's results: TSV artifact first, then the JSON run
/// report, then the authoritative store insert. A store failure leaves
/// the local artifact behind as a recovery point and fails the unit.
/// A successful persist triggers removal of the unit's transient files.
pub fn persist(ctx: &mut Ctx) -> Result<()> {
    let table = ctx.table.as_ref().context("results table missing")?;

    write_table(&ctx.output.tsv_path, &ctx.emotions, table).map_err(|e| {
        RunError::PersistFailure {
            reason: format!("artifact write: {e:#}"),
        }
    })?;

    ctx.report.n_vols = Some(table.len() as u64);
    ctx.report.label_counts = label_counts(&ctx.emotions, table);
    ctx.report.outputs.tsv_path = Some(
        ctx.output
            .tsv_path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string(),
    );
    write_report(&ctx.output.report_path, &ctx.report).map_err(|e| {
        RunError::PersistFailure {
            reason: format!("report write: {e:#}"),
        }
    })?;

    let inserted = ctx
        .store
        .insert_rows(&ctx.key, &ctx.mask_name, ctx.mask_sig, &ctx.emotions, table)
        .map_err(|e| RunError::PersistFailure {
            reason: format!("store insert: {e:#}"),
        })?;

    if inserted == 0 {
        // Lost the race to another process between guard and insert.
        ctx.state = UnitState::Skipped;
        info!(key = %ctx.key, "rows already recorded, unit skipped");
    } else {
        ctx.state = UnitState::Persisted;
        info!(key = %ctx.key, rows = inserted, "results persisted");
    }

    clean_unit(&ctx.output.unit_dir);
    Ok(())
}

fn write_table(path: &Path, emotions: &[String], table: &ResultsTable) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    let mut w = BufWriter::new(file);

    write!(w, "volume")?;
    for emotion in emotions {
        write!(w, "\temo_{}", emotion)?;
    }
    writeln!(w, "\tlabel_max")?;

    for row in table.rows() {
        write!(w, "{}", row.volume)?;
        for score in &row.scores {
            write!(w, "\t{:.6}", score)?;
        }
        writeln!(w, "\t{}", row.label_max)?;
    }
    w.flush()?;
    Ok(())
}

pub fn write_report(path: &Path, report: &DotProdV1) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, report)?;
    Ok(())
}

fn label_counts(emotions: &[String], table: &ResultsTable) -> Vec<LabelCount> {
    emotions
        .iter()
        .map(|emotion| LabelCount {
            label: emotion.clone(),
            count: table
                .rows()
                .iter()
                .filter(|r| &r.label_max == emotion)
                .count() as u64,
        })
        .collect()
}

/// Remove transient per-unit files (the fetched series and anything
/// else that is not an artifact or report). The unit has already
/// persisted, so cleanup problems are logged rather than fatal.
fn clean_unit(unit_dir: &Path) {
    let entries = match fs::read_dir(unit_dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(dir = %unit_dir.display(), error = %e, "cleanup skipped");
            return;
        }
    };
    for entry in entries.flatten() {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.starts_with("dotprod_") || name.starts_with("report_") {
            continue;
        }
        if let Err(e) = fs::remove_file(entry.path()) {
            warn!(file = %entry.path().display(), error = %e, "cleanup failed");
        }
    }
}
