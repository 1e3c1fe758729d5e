use crate::error::RunError;
use crate::score::ScoreGrid;

/// Scores for one volume, in roster order, plus the winning label.
/// Volume indices are 1-based in time order. Rows are never mutated
/// after creation.
#[derive(Debug, Clone)]
pub struct ScoreRow {
    pub volume: usize,
    pub scores: Vec<f64>,
    pub label_max: String,
}

#[derive(Debug, Clone)]
pub struct ResultsTable {
    rows: Vec<ScoreRow>,
}

impl ResultsTable {
    pub fn rows(&self) -> &[ScoreRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Assemble the ordered results table for one unit of work. Every
/// (volume, emotion) cell must be present. The winner per volume is the
/// strictly greatest score; ties go to the earlier roster label, so the
/// output is identical across runs and worker completion orders.
pub fn label_volumes(grid: &ScoreGrid, emotions: &[String]) -> Result<ResultsTable, RunError> {
    let want = grid.n_vols() * grid.n_emotions();
    let missing = grid.missing();
    if missing > 0 {
        return Err(RunError::IncompleteScores {
            got: want - missing,
            want,
        });
    }
    if emotions.is_empty() || emotions.len() != grid.n_emotions() {
        return Err(RunError::shape(
            "emotion roster vs score grid",
            emotions.len(),
            grid.n_emotions(),
        ));
    }

    let mut rows = Vec::with_capacity(grid.n_vols());
    for t in 0..grid.n_vols() {
        let scores: Vec<f64> = (0..grid.n_emotions())
            .map(|e| grid.get(t, e).unwrap_or_default())
            .collect();
        let mut best = 0usize;
        for e in 1..scores.len() {
            if scores[e] > scores[best] {
                best = e;
            }
        }
        rows.push(ScoreRow {
            volume: t + 1,
            scores,
            label_max: emotions[best].clone(),
        });
    }
    Ok(ResultsTable { rows })
}
