use std::path::Path;

use anyhow::{Context, Result, bail};
use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension, params, params_from_iter};

use crate::ctx::RunKey;
use crate::label::ResultsTable;

/// SQLite backing store. One wide table per project holds the
/// dot-product rows; `ref_subj` and `ref_sess_task` carry the batch
/// roster and the session-to-task mapping.
pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database {}", path.display()))?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("failed to open in-memory database")?;
        Ok(Self { conn })
    }

    /// Idempotent schema creation. The UNIQUE constraint over the run
    /// identity plus volume index makes duplicate persists no-ops even
    /// if two processes race past the advisory guard.
    pub fn ensure_schema(&self, project: &str, emotions: &[String]) -> Result<()> {
        let table = table_name(project)?;
        let mut emo_cols = String::new();
        for emotion in emotions {
            emo_cols.push_str(&format!("    {} REAL NOT NULL,\n", emo_column(emotion)?));
        }
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {table} (\n\
             \x20   subj TEXT NOT NULL,\n\
             \x20   sess TEXT NOT NULL,\n\
             \x20   task TEXT NOT NULL,\n\
             \x20   model TEXT NOT NULL,\n\
             \x20   contrast TEXT NOT NULL,\n\
             \x20   mask TEXT NOT NULL,\n\
             \x20   mask_sig INTEGER NOT NULL,\n\
             \x20   vol_idx INTEGER NOT NULL,\n\
             {emo_cols}\
             \x20   label_max TEXT NOT NULL,\n\
             \x20   UNIQUE (subj, sess, task, model, contrast, vol_idx)\n\
             );\n\
             CREATE TABLE IF NOT EXISTS ref_subj (\n\
             \x20   subj TEXT PRIMARY KEY\n\
             );\n\
             CREATE TABLE IF NOT EXISTS ref_sess_task (\n\
             \x20   subj TEXT NOT NULL,\n\
             \x20   sess TEXT NOT NULL,\n\
             \x20   task TEXT NOT NULL,\n\
             \x20   PRIMARY KEY (subj, sess)\n\
             );\n"
        );
        self.conn
            .execute_batch(&sql)
            .context("failed to create schema")?;
        Ok(())
    }

    /// Read-only duplication check, scoped to (project, subj, sess, task).
    pub fn exists(&self, project: &str, subj: &str, sess: &str, task: &str) -> Result<bool> {
        let table = table_name(project)?;
        let sql = format!("SELECT 1 FROM {table} WHERE subj = ?1 AND sess = ?2 AND task = ?3 LIMIT 1");
        let row: Option<i64> = self
            .conn
            .query_row(&sql, params![subj, sess, task], |r| r.get(0))
            .optional()
            .context("duplication query failed")?;
        Ok(row.is_some())
    }

    /// Insert the full results table for one RunKey. Returns the number
    /// of rows actually inserted; rows already present are ignored.
    pub fn insert_rows(
        &mut self,
        key: &RunKey,
        mask_name: &str,
        mask_sig: bool,
        emotions: &[String],
        table: &ResultsTable,
    ) -> Result<usize> {
        let tbl = table_name(&key.project)?;
        let mut cols: Vec<String> = vec![
            "subj".into(),
            "sess".into(),
            "task".into(),
            "model".into(),
            "contrast".into(),
            "mask".into(),
            "mask_sig".into(),
            "vol_idx".into(),
        ];
        for emotion in emotions {
            cols.push(emo_column(emotion)?);
        }
        cols.push("label_max".into());
        let placeholders: Vec<String> = (1..=cols.len()).map(|i| format!("?{i}")).collect();
        let sql = format!(
            "INSERT OR IGNORE INTO {tbl} ({}) VALUES ({})",
            cols.join(", "),
            placeholders.join(", ")
        );

        let tx = self.conn.transaction().context("failed to begin transaction")?;
        let mut inserted = 0usize;
        {
            let mut stmt = tx.prepare(&sql).context("failed to prepare insert")?;
            for row in table.rows() {
                let mut values: Vec<Value> = vec![
                    Value::Text(key.subj.clone()),
                    Value::Text(key.sess.clone()),
                    Value::Text(key.task.clone()),
                    Value::Text(key.model.clone()),
                    Value::Text(key.contrast.clone()),
                    Value::Text(mask_name.to_string()),
                    Value::Integer(mask_sig as i64),
                    Value::Integer(row.volume as i64),
                ];
                for score in &row.scores {
                    values.push(Value::Real(*score));
                }
                values.push(Value::Text(row.label_max.clone()));
                inserted += stmt
                    .execute(params_from_iter(values))
                    .context("insert failed")?;
            }
        }
        tx.commit().context("failed to commit insert")?;
        Ok(inserted)
    }

    /// Row count for one (project, subj, sess, task) result set.
    pub fn count_rows(&self, project: &str, subj: &str, sess: &str, task: &str) -> Result<i64> {
        let table = table_name(project)?;
        let sql =
            format!("SELECT COUNT(*) FROM {table} WHERE subj = ?1 AND sess = ?2 AND task = ?3");
        let count = self
            .conn
            .query_row(&sql, params![subj, sess, task], |r| r.get(0))
            .context("count query failed")?;
        Ok(count)
    }

    /// Batch roster, sorted for stable array indexing.
    pub fn subjects(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT subj FROM ref_subj ORDER BY subj")
            .context("failed to prepare roster query")?;
        let rows = stmt
            .query_map([], |r| r.get::<_, String>(0))
            .context("roster query failed")?;
        let mut subjects = Vec::new();
        for row in rows {
            subjects.push(row?);
        }
        Ok(subjects)
    }

    pub fn add_subject(&self, subj: &str) -> Result<()> {
        self.conn
            .execute("INSERT OR IGNORE INTO ref_subj (subj) VALUES (?1)", params![subj])
            .context("failed to register subject")?;
        Ok(())
    }

    /// Task recorded for a subject's session, if any.
    pub fn session_task(&self, subj: &str, sess: &str) -> Result<Option<String>> {
        let task = self
            .conn
            .query_row(
                "SELECT task FROM ref_sess_task WHERE subj = ?1 AND sess = ?2",
                params![subj, sess],
                |r| r.get(0),
            )
            .optional()
            .context("session task query failed")?;
        Ok(task)
    }

    pub fn set_session_task(&self, subj: &str, sess: &str, task: &str) -> Result<()> {
        self.conn
            .execute(
                "INSERT OR REPLACE INTO ref_sess_task (subj, sess, task) VALUES (?1, ?2, ?3)",
                params![subj, sess, task],
            )
            .context("failed to record session task")?;
        Ok(())
    }
}

/// Table names and emotion columns are built from caller input; restrict
/// them to identifier characters before splicing into SQL.
fn ident(value: &str, what: &str) -> Result<()> {
    if value.is_empty()
        || !value
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
    {
        bail!("invalid {} identifier '{}'", what, value);
    }
    Ok(())
}

fn table_name(project: &str) -> Result<String> {
    ident(project, "project")?;
    Ok(format!("dotprod_{project}"))
}

fn emo_column(emotion: &str) -> Result<String> {
    ident(emotion, "emotion")?;
    Ok(format!("emo_{emotion}"))
}
