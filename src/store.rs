// 🗄️ Run Store - Per-month results persisted as each month completes
// SQLite + WAL, so a failure in month 9 keeps months 1-8

use crate::aggregate::{CategoryResult, MonthAnalysis, Perk};
use crate::comments::Traversal;
use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

// ============================================================================
// RUN
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct RunInfo {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub traversal: String,
}

impl RunInfo {
    pub fn is_finished(&self) -> bool {
        self.finished_at.is_some()
    }
}

/// One stored month row: every perk, not only the charted ones
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMonth {
    pub month: u32,
    pub thread_id: u64,
    pub perk: Perk,
    pub count: u64,
    pub comments_count: u64,
    pub snapshot_sha256: Option<String>,
}

// ============================================================================
// SCHEMA
// ============================================================================

pub fn setup_database(conn: &Connection) -> Result<()> {
    // Enable WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS runs (
            run_id TEXT PRIMARY KEY,
            started_at TEXT NOT NULL,
            finished_at TEXT,
            traversal TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS month_results (
            run_id TEXT NOT NULL REFERENCES runs(run_id),
            month INTEGER NOT NULL,
            thread_id INTEGER NOT NULL,
            perk TEXT NOT NULL,
            count INTEGER NOT NULL,
            comments_count INTEGER NOT NULL,
            snapshot_sha256 TEXT,
            recorded_at TEXT NOT NULL,
            PRIMARY KEY (run_id, month, perk)
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_month_results_run ON month_results(run_id, month)",
        [],
    )?;

    Ok(())
}

// ============================================================================
// WRITES
// ============================================================================

/// Start a run and return its id
pub fn begin_run(conn: &Connection, traversal: Traversal) -> Result<String> {
    let run_id = uuid::Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO runs (run_id, started_at, traversal) VALUES (?1, ?2, ?3)",
        params![run_id, Utc::now().to_rfc3339(), traversal.as_str()],
    )
    .context("Failed to record run start")?;
    Ok(run_id)
}

/// Store every perk count of one analyzed month, all or nothing.
///
/// Re-recording the same month replaces its rows.
pub fn record_month(
    conn: &Connection,
    run_id: &str,
    thread_id: u64,
    analysis: &MonthAnalysis,
    snapshot_sha256: Option<&str>,
) -> Result<()> {
    let recorded_at = Utc::now().to_rfc3339();
    let tx = conn.unchecked_transaction()?;

    for perk in Perk::ALL {
        tx.execute(
            "INSERT OR REPLACE INTO month_results (
                run_id, month, thread_id, perk, count, comments_count, snapshot_sha256, recorded_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                run_id,
                analysis.month,
                thread_id as i64,
                perk.as_str(),
                analysis.perks.get(perk) as i64,
                analysis.items_processed as i64,
                snapshot_sha256,
                recorded_at,
            ],
        )
        .with_context(|| format!("Failed to store month {} of run {}", analysis.month, run_id))?;
    }

    tx.commit()
        .with_context(|| format!("Failed to commit month {} of run {}", analysis.month, run_id))?;
    Ok(())
}

pub fn finish_run(conn: &Connection, run_id: &str) -> Result<()> {
    let updated = conn.execute(
        "UPDATE runs SET finished_at = ?1 WHERE run_id = ?2",
        params![Utc::now().to_rfc3339(), run_id],
    )?;
    if updated == 0 {
        return Err(anyhow!("Unknown run: {}", run_id));
    }
    Ok(())
}

// ============================================================================
// READS
// ============================================================================

fn parse_time(s: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e)))
}

/// Most recently started run, if any
pub fn latest_run(conn: &Connection) -> Result<Option<RunInfo>> {
    let run = conn
        .query_row(
            "SELECT run_id, started_at, finished_at, traversal
             FROM runs
             ORDER BY started_at DESC
             LIMIT 1",
            [],
            |row| {
                let started_at: String = row.get(1)?;
                let finished_at: Option<String> = row.get(2)?;
                Ok(RunInfo {
                    run_id: row.get(0)?,
                    started_at: parse_time(&started_at)?,
                    finished_at: finished_at.as_deref().map(parse_time).transpose()?,
                    traversal: row.get(3)?,
                })
            },
        )
        .optional()?;

    Ok(run)
}

/// All stored rows of a run, ordered by month then perk name
pub fn month_results_for_run(conn: &Connection, run_id: &str) -> Result<Vec<StoredMonth>> {
    let mut stmt = conn.prepare(
        "SELECT month, thread_id, perk, count, comments_count, snapshot_sha256
         FROM month_results
         WHERE run_id = ?1
         ORDER BY month, perk",
    )?;

    let rows = stmt
        .query_map(params![run_id], |row| {
            let perk_name: String = row.get(2)?;
            let thread_id: i64 = row.get(1)?;
            let count: i64 = row.get(3)?;
            let comments_count: i64 = row.get(4)?;
            Ok((
                row.get::<_, u32>(0)?,
                thread_id as u64,
                perk_name,
                count as u64,
                comments_count as u64,
                row.get::<_, Option<String>>(5)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|(month, thread_id, perk_name, count, comments_count, snapshot_sha256)| {
            let perk = Perk::from_name(&perk_name)
                .ok_or_else(|| anyhow!("Unknown perk {:?} stored for month {}", perk_name, month))?;
            Ok(StoredMonth {
                month,
                thread_id,
                perk,
                count,
                comments_count,
                snapshot_sha256,
            })
        })
        .collect()
}

/// Charted category rows of a run, in the exported shape
pub fn category_results_for_run(conn: &Connection, run_id: &str) -> Result<Vec<CategoryResult>> {
    Ok(month_results_for_run(conn, run_id)?
        .into_iter()
        .filter(|row| Perk::CHARTED.contains(&row.perk))
        .map(|row| CategoryResult {
            category: row.perk,
            count: row.count,
            month: row.month,
            comments_count: row.comments_count,
        })
        .collect())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::PerkCounts;

    fn analysis(month: u32, remote: u64, visa: u64, total: u64) -> MonthAnalysis {
        MonthAnalysis {
            month,
            items_processed: total,
            perks: PerkCounts {
                remote,
                visa,
                contractor: 1,
                ..PerkCounts::default()
            },
        }
    }

    #[test]
    fn test_months_recorded_incrementally() {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();

        let run_id = begin_run(&conn, Traversal::TopLevel).unwrap();
        record_month(&conn, &run_id, 16052538, &analysis(1, 10, 2, 50), Some("abc")).unwrap();
        record_month(&conn, &run_id, 16282819, &analysis(2, 12, 3, 60), None).unwrap();

        // Run not finished yet, rows already there
        let run = latest_run(&conn).unwrap().unwrap();
        assert_eq!(run.run_id, run_id);
        assert!(!run.is_finished());

        let rows = month_results_for_run(&conn, &run_id).unwrap();
        assert_eq!(rows.len(), 2 * Perk::ALL.len());

        let contractor = rows
            .iter()
            .find(|r| r.month == 1 && r.perk == Perk::Contractor)
            .unwrap();
        assert_eq!(contractor.count, 1);
        assert_eq!(contractor.thread_id, 16052538);
        assert_eq!(contractor.snapshot_sha256.as_deref(), Some("abc"));

        finish_run(&conn, &run_id).unwrap();
        assert!(latest_run(&conn).unwrap().unwrap().is_finished());
    }

    #[test]
    fn test_category_results_for_run() {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        let run_id = begin_run(&conn, Traversal::FullTree).unwrap();

        record_month(&conn, &run_id, 1, &analysis(3, 7, 1, 20), None).unwrap();
        let results = category_results_for_run(&conn, &run_id).unwrap();

        assert_eq!(results.len(), 3);
        let remote = results.iter().find(|r| r.category == Perk::Remote).unwrap();
        assert_eq!(remote.count, 7);
        assert_eq!(remote.comments_count, 20);
        assert_eq!(remote.month, 3);
        assert_eq!(latest_run(&conn).unwrap().unwrap().traversal, "full_tree");
    }

    #[test]
    fn test_rerecording_month_replaces_rows() {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        let run_id = begin_run(&conn, Traversal::TopLevel).unwrap();

        record_month(&conn, &run_id, 1, &analysis(1, 1, 0, 5), None).unwrap();
        record_month(&conn, &run_id, 1, &analysis(1, 4, 0, 9), None).unwrap();

        let rows = month_results_for_run(&conn, &run_id).unwrap();
        assert_eq!(rows.len(), Perk::ALL.len());
        let remote = rows.iter().find(|r| r.perk == Perk::Remote).unwrap();
        assert_eq!(remote.count, 4);
    }

    #[test]
    fn test_failed_month_leaves_no_rows() {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        conn.execute_batch(
            "CREATE TRIGGER reject_full_time BEFORE INSERT ON month_results
             WHEN NEW.perk = 'full_time'
             BEGIN SELECT RAISE(ABORT, 'rejected'); END;",
        )
        .unwrap();
        let run_id = begin_run(&conn, Traversal::TopLevel).unwrap();

        assert!(record_month(&conn, &run_id, 1, &analysis(1, 3, 1, 9), None).is_err());
        assert!(month_results_for_run(&conn, &run_id).unwrap().is_empty());

        // The connection is still usable afterwards
        conn.execute_batch("DROP TRIGGER reject_full_time").unwrap();
        record_month(&conn, &run_id, 1, &analysis(1, 3, 1, 9), None).unwrap();
        assert_eq!(month_results_for_run(&conn, &run_id).unwrap().len(), Perk::ALL.len());
    }

    #[test]
    fn test_finish_unknown_run_fails() {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        assert!(finish_run(&conn, "nope").is_err());
        assert!(latest_run(&conn).unwrap().is_none());
    }
}
