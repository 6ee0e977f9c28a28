//! Catalog queries: categories and tools.

use super::query::{where_clause, ToolPredicate, ToolSort};
use super::{encode_ts, ts_column, Store};
use crate::error::{AppError, Result};
use crate::model::{CategorySummary, NewTool, Tool};
use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use serde::Serialize;

const TOOL_COLUMNS: &str = "id, category_id, name, description, sub_category, is_premium, \
                            custom_prompt, usage_count, created_at, updated_at";

pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Filter, ordering and page window for [`Store::list_tools`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolFilter {
    pub category_id: Option<i64>,
    pub search: Option<String>,
    pub sort: ToolSort,
    pub limit: u32,
    pub offset: u32,
}

impl Default for ToolFilter {
    fn default() -> Self {
        Self {
            category_id: None,
            search: None,
            sort: ToolSort::Popular,
            limit: DEFAULT_PAGE_SIZE,
            offset: 0,
        }
    }
}

impl ToolFilter {
    pub fn predicates(&self) -> Vec<ToolPredicate> {
        let mut preds = Vec::new();
        if let Some(id) = self.category_id {
            preds.push(ToolPredicate::InCategory(id));
        }
        if let Some(term) = self.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            preds.push(ToolPredicate::Matches(term.to_string()));
        }
        preds
    }
}

/// One page of tools plus the size of the full result set.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolPage {
    pub tools: Vec<Tool>,
    pub total: i64,
    pub has_more: bool,
}

fn tool_from_row(row: &Row<'_>) -> rusqlite::Result<Tool> {
    Ok(Tool {
        id: row.get(0)?,
        category_id: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        sub_category: row.get(4)?,
        is_premium: row.get(5)?,
        custom_prompt: row.get(6)?,
        usage_count: row.get(7)?,
        created_at: ts_column(row, 8)?,
        updated_at: ts_column(row, 9)?,
    })
}

impl Store {
    /// All categories in display order, each with its live tool count.
    pub fn list_categories(&self) -> Result<Vec<CategorySummary>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT c.id, c.name, c.sort_order, COUNT(t.id)
             FROM categories c
             LEFT JOIN tools t ON t.category_id = c.id
             GROUP BY c.id
             ORDER BY c.sort_order ASC, c.id ASC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(CategorySummary {
                id: row.get(0)?,
                name: row.get(1)?,
                sort_order: row.get(2)?,
                tool_count: row.get(3)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Filtered, ordered page of tools.
    pub fn list_tools(&self, filter: &ToolFilter) -> Result<ToolPage> {
        let clause = where_clause(&filter.predicates());
        let where_sql = clause.to_sql();

        let conn = self.lock()?;

        let total: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM tools{}", where_sql),
            params_from_iter(clause.params()),
            |r| r.get(0),
        )?;

        let sql = format!(
            "SELECT {} FROM tools{} ORDER BY {} LIMIT ? OFFSET ?",
            TOOL_COLUMNS,
            where_sql,
            filter.sort.order_by()
        );
        let mut params: Vec<Value> = clause.params().to_vec();
        params.push(Value::Integer(i64::from(filter.limit)));
        params.push(Value::Integer(i64::from(filter.offset)));

        let mut stmt = conn.prepare(&sql)?;
        let tools = stmt
            .query_map(params_from_iter(params.iter()), tool_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let has_more = i64::from(filter.offset) + (tools.len() as i64) < total;

        tracing::debug!(
            total = total,
            returned = tools.len(),
            offset = filter.offset,
            "Listed tools"
        );

        Ok(ToolPage {
            tools,
            total,
            has_more,
        })
    }

    pub fn find_tool(&self, id: i64) -> Result<Option<Tool>> {
        let conn = self.lock()?;
        Ok(select_tool(&conn, id)?)
    }

    pub fn get_tool(&self, id: i64) -> Result<Tool> {
        self.find_tool(id)?
            .ok_or_else(|| AppError::not_found("tool", id))
    }

    /// Validate and insert a new tool with a zero usage count.
    pub fn create_tool(&self, new: &NewTool) -> Result<Tool> {
        validate_new_tool(new)?;

        let conn = self.lock()?;
        if !category_exists(&conn, new.category_id)? {
            return Err(AppError::validation(format!(
                "category {} does not exist",
                new.category_id
            )));
        }

        let id = insert_tool(&conn, new, 0, &Utc::now())?;
        tracing::info!(tool_id = id, name = %new.name.trim(), "Created tool");

        select_tool(&conn, id)?.ok_or_else(|| AppError::not_found("tool", id))
    }

    pub fn count_tools(&self) -> Result<i64> {
        let conn = self.lock()?;
        Ok(conn.query_row("SELECT COUNT(*) FROM tools", [], |r| r.get(0))?)
    }

    pub fn count_categories(&self) -> Result<i64> {
        let conn = self.lock()?;
        Ok(count_categories(&conn)?)
    }
}

fn validate_new_tool(new: &NewTool) -> Result<()> {
    let mut missing = Vec::new();
    if new.name.trim().is_empty() {
        missing.push("name");
    }
    if new.description.trim().is_empty() {
        missing.push("description");
    }
    if new.category_id <= 0 {
        missing.push("categoryId");
    }
    if missing.is_empty() {
        Ok(())
    } else {
        Err(AppError::validation(format!(
            "{} required",
            missing.join(", ")
        )))
    }
}

fn select_tool(conn: &Connection, id: i64) -> rusqlite::Result<Option<Tool>> {
    conn.query_row(
        &format!("SELECT {} FROM tools WHERE id = ?1", TOOL_COLUMNS),
        params![id],
        tool_from_row,
    )
    .optional()
}

pub(crate) fn category_exists(conn: &Connection, id: i64) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM categories WHERE id = ?1)",
        params![id],
        |r| r.get(0),
    )
}

pub(crate) fn count_categories(conn: &Connection) -> rusqlite::Result<i64> {
    conn.query_row("SELECT COUNT(*) FROM categories", [], |r| r.get(0))
}

pub(crate) fn insert_category(conn: &Connection, name: &str, sort_order: i64) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO categories (name, sort_order) VALUES (?1, ?2)",
        params![name, sort_order],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Insert a tool row. Optional blank strings are stored as NULL.
pub(crate) fn insert_tool(
    conn: &Connection,
    new: &NewTool,
    usage_count: i64,
    created_at: &DateTime<Utc>,
) -> rusqlite::Result<i64> {
    let ts = encode_ts(created_at);
    let blank_to_none = |v: &Option<String>| {
        v.as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };
    conn.execute(
        "INSERT INTO tools (category_id, name, description, sub_category, is_premium, custom_prompt, usage_count, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
        params![
            new.category_id,
            new.name.trim(),
            new.description.trim(),
            blank_to_none(&new.sub_category),
            new.is_premium,
            // Templates keep their exact text; only all-blank ones are dropped.
            new.custom_prompt.as_deref().filter(|s| !s.trim().is_empty()),
            usage_count,
            ts,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn store_with_category() -> Store {
        let store = Store::open_in_memory().unwrap();
        {
            let conn = store.lock().unwrap();
            insert_category(&conn, "Email", 2).unwrap();
            insert_category(&conn, "Blog", 1).unwrap();
        }
        store
    }

    fn new_tool(name: &str, category_id: i64) -> NewTool {
        NewTool {
            name: name.into(),
            description: format!("{} description", name),
            category_id,
            ..Default::default()
        }
    }

    fn insert_at(store: &Store, tool: &NewTool, usage: i64, at: DateTime<Utc>) -> i64 {
        let conn = store.lock().unwrap();
        insert_tool(&conn, tool, usage, &at).unwrap()
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_create_and_get_tool() {
        let store = store_with_category();
        let created = store
            .create_tool(&NewTool {
                sub_category: Some("  ".into()),
                custom_prompt: Some("Write about {{text}}".into()),
                is_premium: true,
                ..new_tool("Newsletter", 1)
            })
            .unwrap();

        assert_eq!(created.usage_count, 0);
        assert_eq!(created.sub_category, None);
        assert!(created.is_premium);
        assert_eq!(created.template(), Some("Write about {{text}}"));
        assert_eq!(store.get_tool(created.id).unwrap(), created);
    }

    #[test]
    fn test_create_tool_validation() {
        let store = store_with_category();

        let err = store.create_tool(&NewTool::default()).unwrap_err();
        match err {
            AppError::Validation(msg) => {
                assert!(msg.contains("name"));
                assert!(msg.contains("description"));
                assert!(msg.contains("categoryId"));
            }
            other => panic!("expected validation error, got {other:?}"),
        }

        let err = store.create_tool(&new_tool("X", 99)).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(store.count_tools().unwrap(), 0);
    }

    #[test]
    fn test_get_missing_tool() {
        let store = store_with_category();
        assert!(matches!(
            store.get_tool(42),
            Err(AppError::NotFound { entity: "tool", id: 42 })
        ));
        assert!(store.find_tool(42).unwrap().is_none());
    }

    #[test]
    fn test_list_categories_with_counts() {
        let store = store_with_category();
        store.create_tool(&new_tool("A", 1)).unwrap();
        store.create_tool(&new_tool("B", 1)).unwrap();

        let cats = store.list_categories().unwrap();
        assert_eq!(cats.len(), 2);
        assert_eq!(cats[0].name, "Blog");
        assert_eq!(cats[0].tool_count, 0);
        assert_eq!(cats[1].name, "Email");
        assert_eq!(cats[1].tool_count, 2);
    }

    #[test]
    fn test_popular_sort_breaks_ties_by_recency() {
        let store = store_with_category();
        let a = insert_at(&store, &new_tool("A", 1), 5, t0());
        let b = insert_at(&store, &new_tool("B", 1), 5, t0() + Duration::hours(1));
        let c = insert_at(&store, &new_tool("C", 1), 1, t0() + Duration::hours(2));

        let page = store.list_tools(&ToolFilter::default()).unwrap();
        let ids: Vec<i64> = page.tools.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![b, a, c]);
    }

    #[test]
    fn test_new_sort() {
        let store = store_with_category();
        let a = insert_at(&store, &new_tool("A", 1), 100, t0());
        let b = insert_at(&store, &new_tool("B", 1), 0, t0() + Duration::hours(1));

        let page = store
            .list_tools(&ToolFilter {
                sort: ToolSort::New,
                ..Default::default()
            })
            .unwrap();
        let ids: Vec<i64> = page.tools.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![b, a]);
    }

    #[test]
    fn test_filter_by_category_and_search() {
        let store = store_with_category();
        store.create_tool(&new_tool("Thank-you Email", 1)).unwrap();
        store.create_tool(&new_tool("Follow-up", 1)).unwrap();
        store.create_tool(&new_tool("Blog Titles", 2)).unwrap();
        store
            .create_tool(&NewTool {
                custom_prompt: Some("Draft an EMAIL reply".into()),
                ..new_tool("Reply Helper", 2)
            })
            .unwrap();

        let by_cat = store
            .list_tools(&ToolFilter {
                category_id: Some(1),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(by_cat.total, 2);

        let by_term = store
            .list_tools(&ToolFilter {
                search: Some("email".into()),
                ..Default::default()
            })
            .unwrap();
        let mut names: Vec<_> = by_term.tools.iter().map(|t| t.name.as_str()).collect();
        names.sort();
        assert_eq!(names, vec!["Reply Helper", "Thank-you Email"]);

        let both = store
            .list_tools(&ToolFilter {
                category_id: Some(2),
                search: Some("email".into()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(both.total, 1);
        assert_eq!(both.tools[0].name, "Reply Helper");

        let blank = store
            .list_tools(&ToolFilter {
                search: Some("   ".into()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(blank.total, 4);
    }

    #[test]
    fn test_search_folds_ascii_case_only() {
        let store = store_with_category();
        store.create_tool(&new_tool("MAILER", 1)).unwrap();
        store.create_tool(&new_tool("ÉCOLE notes", 1)).unwrap();

        let search = |term: &str| {
            store
                .list_tools(&ToolFilter {
                    search: Some(term.into()),
                    ..Default::default()
                })
                .unwrap()
                .total
        };
        assert_eq!(search("mailer"), 1);
        assert_eq!(search("école"), 0);
        assert_eq!(search("ÉCOLE"), 1);
    }

    #[test]
    fn test_search_wildcards_are_literal() {
        let store = store_with_category();
        store.create_tool(&new_tool("50% off", 1)).unwrap();
        store.create_tool(&new_tool("Plain", 1)).unwrap();

        let page = store
            .list_tools(&ToolFilter {
                search: Some("%".into()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.tools[0].name, "50% off");
    }

    #[test]
    fn test_pagination_walk_has_no_gaps_or_duplicates() {
        let store = store_with_category();
        for i in 0..23 {
            insert_at(&store, &new_tool(&format!("T{i}"), 1), i % 4, t0());
        }

        let mut seen = Vec::new();
        let mut offset = 0;
        loop {
            let page = store
                .list_tools(&ToolFilter {
                    limit: 5,
                    offset,
                    ..Default::default()
                })
                .unwrap();
            assert_eq!(page.total, 23);
            seen.extend(page.tools.iter().map(|t| t.id));
            offset += page.tools.len() as u32;
            if !page.has_more {
                break;
            }
        }

        let mut unique = seen.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(seen.len(), 23);
        assert_eq!(unique.len(), 23);
    }

    #[test]
    fn test_limit_zero_and_offset_past_end() {
        let store = store_with_category();
        for i in 0..3 {
            store.create_tool(&new_tool(&format!("T{i}"), 1)).unwrap();
        }

        let zero = store
            .list_tools(&ToolFilter {
                limit: 0,
                ..Default::default()
            })
            .unwrap();
        assert!(zero.tools.is_empty());
        assert_eq!(zero.total, 3);
        assert!(zero.has_more);

        let past = store
            .list_tools(&ToolFilter {
                offset: 10,
                ..Default::default()
            })
            .unwrap();
        assert!(past.tools.is_empty());
        assert!(!past.has_more);
    }
}
