//! Run ledger: one row per generation attempt.

use super::query::{where_clause, RunPredicate};
use super::{encode_ts, ts_column, Store};
use crate::error::{AppError, Result};
use crate::model::{GenerationInput, NewRun, Run, RunStatus};
use chrono::Utc;
use rusqlite::types::{Type, Value};
use rusqlite::{params, params_from_iter, Row};

use super::catalog::DEFAULT_PAGE_SIZE;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunFilter {
    pub tool_id: Option<i64>,
    pub limit: u32,
    pub offset: u32,
}

impl Default for RunFilter {
    fn default() -> Self {
        Self {
            tool_id: None,
            limit: DEFAULT_PAGE_SIZE,
            offset: 0,
        }
    }
}

impl RunFilter {
    pub fn predicates(&self) -> Vec<RunPredicate> {
        self.tool_id.map(RunPredicate::ForTool).into_iter().collect()
    }
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<Run> {
    let input_json: String = row.get(3)?;
    let input: GenerationInput = serde_json::from_str(&input_json)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(e)))?;

    let status_raw: String = row.get(5)?;
    let status = RunStatus::parse(&status_raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            5,
            Type::Text,
            format!("unknown run status {:?}", status_raw).into(),
        )
    })?;

    Ok(Run {
        id: row.get(0)?,
        tool_id: row.get(1)?,
        tool_name: row.get(2)?,
        input,
        output_text: row.get(4)?,
        status,
        error_message: row.get(6)?,
        created_at: ts_column(row, 7)?,
    })
}

impl Store {
    /// Append a run. A successful run also bumps the tool's usage count; both
    /// writes commit together or not at all.
    pub fn record_run(&self, run: &NewRun) -> Result<i64> {
        let input_json = serde_json::to_string(&run.input)?;
        let now = encode_ts(&Utc::now());

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let tool_exists: bool = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM tools WHERE id = ?1)",
            params![run.tool_id],
            |r| r.get(0),
        )?;
        if !tool_exists {
            return Err(AppError::not_found("tool", run.tool_id));
        }

        tx.execute(
            "INSERT INTO generation_runs (tool_id, input_json, output_text, status, error_message, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                run.tool_id,
                input_json,
                run.output_text,
                run.status.as_str(),
                run.error_message,
                now,
            ],
        )?;
        let run_id = tx.last_insert_rowid();

        if run.status == RunStatus::Success {
            tx.execute(
                "UPDATE tools SET usage_count = usage_count + 1 WHERE id = ?1",
                params![run.tool_id],
            )?;
        }

        tx.commit()?;

        tracing::debug!(
            run_id = run_id,
            tool_id = run.tool_id,
            status = run.status.as_str(),
            "Recorded run"
        );
        Ok(run_id)
    }

    /// Runs newest first, each joined with its tool's name.
    pub fn list_runs(&self, filter: &RunFilter) -> Result<Vec<Run>> {
        let clause = where_clause(&filter.predicates());
        let sql = format!(
            "SELECT r.id, r.tool_id, t.name, r.input_json, r.output_text, r.status, r.error_message, r.created_at
             FROM generation_runs r
             LEFT JOIN tools t ON t.id = r.tool_id{}
             ORDER BY r.created_at DESC, r.id DESC
             LIMIT ? OFFSET ?",
            clause.to_sql()
        );
        let mut params: Vec<Value> = clause.params().to_vec();
        params.push(Value::Integer(i64::from(filter.limit)));
        params.push(Value::Integer(i64::from(filter.offset)));

        let conn = self.lock()?;
        let mut stmt = conn.prepare(&sql)?;
        let runs = stmt
            .query_map(params_from_iter(params.iter()), run_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(runs)
    }

    pub fn delete_run(&self, id: i64) -> Result<()> {
        let conn = self.lock()?;
        let removed = conn.execute("DELETE FROM generation_runs WHERE id = ?1", params![id])?;
        if removed == 0 {
            return Err(AppError::not_found("run", id));
        }
        tracing::info!(run_id = id, "Deleted run");
        Ok(())
    }

    /// Remove every run. Returns how many were removed.
    pub fn delete_all_runs(&self) -> Result<usize> {
        let conn = self.lock()?;
        let removed = conn.execute("DELETE FROM generation_runs", [])?;
        tracing::info!(removed = removed, "Deleted all runs");
        Ok(removed)
    }

    pub fn count_runs(&self) -> Result<i64> {
        let conn = self.lock()?;
        Ok(conn.query_row("SELECT COUNT(*) FROM generation_runs", [], |r| r.get(0))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NewTool;
    use crate::store::catalog::insert_category;
    use std::sync::Arc;

    fn setup() -> (Store, i64) {
        let store = Store::open_in_memory().unwrap();
        {
            let conn = store.lock().unwrap();
            insert_category(&conn, "Email", 1).unwrap();
        }
        let tool = store
            .create_tool(&NewTool {
                name: "Mailer".into(),
                description: "Writes mail".into(),
                category_id: 1,
                ..Default::default()
            })
            .unwrap();
        (store, tool.id)
    }

    fn success(tool_id: i64, text: &str) -> NewRun {
        NewRun {
            tool_id,
            input: GenerationInput::new(text),
            output_text: format!("out: {}", text),
            status: RunStatus::Success,
            error_message: None,
        }
    }

    #[test]
    fn test_record_run_increments_usage_once() {
        let (store, tool_id) = setup();
        let run_id = store.record_run(&success(tool_id, "hi")).unwrap();
        assert!(run_id > 0);
        assert_eq!(store.get_tool(tool_id).unwrap().usage_count, 1);

        let runs = store.list_runs(&RunFilter::default()).unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].id, run_id);
        assert_eq!(runs[0].tool_name.as_deref(), Some("Mailer"));
        assert_eq!(runs[0].input.text, "hi");
        assert_eq!(runs[0].status, RunStatus::Success);
    }

    #[test]
    fn test_error_run_does_not_increment() {
        let (store, tool_id) = setup();
        store
            .record_run(&NewRun {
                status: RunStatus::Error,
                error_message: Some("boom".into()),
                ..success(tool_id, "hi")
            })
            .unwrap();
        assert_eq!(store.get_tool(tool_id).unwrap().usage_count, 0);
        let runs = store.list_runs(&RunFilter::default()).unwrap();
        assert_eq!(runs[0].error_message.as_deref(), Some("boom"));
    }

    #[test]
    fn test_record_run_for_missing_tool_writes_nothing() {
        let (store, _) = setup();
        let err = store.record_run(&success(999, "hi")).unwrap_err();
        assert!(matches!(err, AppError::NotFound { entity: "tool", .. }));
        assert_eq!(store.count_runs().unwrap(), 0);
    }

    #[test]
    fn test_concurrent_runs_have_no_lost_updates() {
        let (store, tool_id) = setup();
        let store = Arc::new(store);

        std::thread::scope(|s| {
            for i in 0..16 {
                let store = Arc::clone(&store);
                s.spawn(move || {
                    store.record_run(&success(tool_id, &format!("run {i}"))).unwrap();
                });
            }
        });

        assert_eq!(store.get_tool(tool_id).unwrap().usage_count, 16);
        assert_eq!(store.count_runs().unwrap(), 16);
    }

    #[test]
    fn test_list_runs_newest_first_and_filtered() {
        let (store, tool_id) = setup();
        let other = store
            .create_tool(&NewTool {
                name: "Other".into(),
                description: "d".into(),
                category_id: 1,
                ..Default::default()
            })
            .unwrap()
            .id;

        let first = store.record_run(&success(tool_id, "1")).unwrap();
        let second = store.record_run(&success(other, "2")).unwrap();
        let third = store.record_run(&success(tool_id, "3")).unwrap();

        let all: Vec<i64> = store
            .list_runs(&RunFilter::default())
            .unwrap()
            .iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(all, vec![third, second, first]);

        let mine: Vec<i64> = store
            .list_runs(&RunFilter {
                tool_id: Some(tool_id),
                ..Default::default()
            })
            .unwrap()
            .iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(mine, vec![third, first]);

        let paged = store
            .list_runs(&RunFilter {
                limit: 1,
                offset: 1,
                ..Default::default()
            })
            .unwrap();
        assert_eq!(paged.len(), 1);
        assert_eq!(paged[0].id, second);
    }

    #[test]
    fn test_delete_run() {
        let (store, tool_id) = setup();
        let id = store.record_run(&success(tool_id, "x")).unwrap();

        store.delete_run(id).unwrap();
        assert!(matches!(
            store.delete_run(id),
            Err(AppError::NotFound { entity: "run", .. })
        ));
        // usage is never decremented
        assert_eq!(store.get_tool(tool_id).unwrap().usage_count, 1);
    }

    #[test]
    fn test_delete_all_runs() {
        let (store, tool_id) = setup();
        assert_eq!(store.delete_all_runs().unwrap(), 0);

        store.record_run(&success(tool_id, "a")).unwrap();
        store.record_run(&success(tool_id, "b")).unwrap();
        assert_eq!(store.delete_all_runs().unwrap(), 2);
        assert!(store.list_runs(&RunFilter::default()).unwrap().is_empty());
        assert_eq!(store.delete_all_runs().unwrap(), 0);
    }
}
