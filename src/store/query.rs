//! Composable WHERE-clause building with bound parameters.
//!
//! Listing filters are expressed as predicate values which append a condition
//! and its parameters to a [`WhereClause`]. User text only ever travels as a
//! bound parameter.

use rusqlite::types::Value;
use serde::{Deserialize, Serialize};

/// Conjunction of conditions plus the parameters they bind, in order.
#[derive(Debug, Default, Clone)]
pub struct WhereClause {
    conditions: Vec<String>,
    params: Vec<Value>,
}

impl WhereClause {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `condition` (using `?` placeholders) and its parameters.
    pub fn and(
        &mut self,
        condition: impl Into<String>,
        params: impl IntoIterator<Item = Value>,
    ) -> &mut Self {
        self.conditions.push(condition.into());
        self.params.extend(params);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Render as ` WHERE (a) AND (b)`, or the empty string.
    pub fn to_sql(&self) -> String {
        if self.conditions.is_empty() {
            return String::new();
        }
        let joined = self
            .conditions
            .iter()
            .map(|c| format!("({})", c))
            .collect::<Vec<_>>()
            .join(" AND ");
        format!(" WHERE {}", joined)
    }

    pub fn params(&self) -> &[Value] {
        &self.params
    }
}

/// Something that can narrow a query.
pub trait Predicate {
    fn apply(&self, clause: &mut WhereClause);
}

/// Build a clause from a list of predicates.
pub fn where_clause<P: Predicate>(predicates: &[P]) -> WhereClause {
    let mut clause = WhereClause::new();
    for p in predicates {
        p.apply(&mut clause);
    }
    clause
}

// ---------------------------------------------------------------------------
// Tool listing
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolPredicate {
    InCategory(i64),
    /// Substring of name, description or custom prompt. SQLite's `LIKE`
    /// folds case for ASCII letters only: `mail` finds `MAIL`, but `é` does
    /// not find `É`.
    Matches(String),
}

impl Predicate for ToolPredicate {
    fn apply(&self, clause: &mut WhereClause) {
        match self {
            ToolPredicate::InCategory(id) => {
                clause.and("category_id = ?", [Value::Integer(*id)]);
            }
            ToolPredicate::Matches(term) => {
                let pattern = Value::Text(format!("%{}%", escape_like(term)));
                clause.and(
                    "name LIKE ? ESCAPE '\\' OR description LIKE ? ESCAPE '\\' OR custom_prompt LIKE ? ESCAPE '\\'",
                    [pattern.clone(), pattern.clone(), pattern],
                );
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolSort {
    /// Most used first, newest first among equals.
    #[default]
    Popular,
    /// Newest first.
    New,
}

impl ToolSort {
    /// Parse a sort name; anything unrecognised means `Popular`.
    pub fn parse_lenient(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "new" | "newest" => ToolSort::New,
            "popular" | "" => ToolSort::Popular,
            other => {
                tracing::debug!(sort = %other, "Unknown sort order, using popular");
                ToolSort::Popular
            }
        }
    }

    pub fn order_by(&self) -> &'static str {
        match self {
            ToolSort::Popular => "usage_count DESC, created_at DESC, id DESC",
            ToolSort::New => "created_at DESC, id DESC",
        }
    }
}

// ---------------------------------------------------------------------------
// Run listing
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunPredicate {
    ForTool(i64),
}

impl Predicate for RunPredicate {
    fn apply(&self, clause: &mut WhereClause) {
        match self {
            RunPredicate::ForTool(id) => {
                clause.and("r.tool_id = ?", [Value::Integer(*id)]);
            }
        }
    }
}

/// Escape `%`, `_` and the escape character itself for `LIKE ... ESCAPE '\'`.
pub fn escape_like(term: &str) -> String {
    let mut out = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_clause() {
        let clause = where_clause::<ToolPredicate>(&[]);
        assert!(clause.is_empty());
        assert_eq!(clause.to_sql(), "");
        assert!(clause.params().is_empty());
    }

    #[test]
    fn test_category_and_search() {
        let clause = where_clause(&[
            ToolPredicate::InCategory(4),
            ToolPredicate::Matches("mail".into()),
        ]);
        let sql = clause.to_sql();
        assert!(sql.starts_with(" WHERE (category_id = ?) AND (name LIKE ?"));
        assert_eq!(sql.matches('?').count(), clause.params().len());
        assert_eq!(clause.params()[0], Value::Integer(4));
        assert_eq!(clause.params()[1], Value::Text("%mail%".into()));
        assert_eq!(clause.params()[3], Value::Text("%mail%".into()));
    }

    #[test]
    fn test_search_term_never_reaches_sql_text() {
        let clause = where_clause(&[ToolPredicate::Matches("'; DROP TABLE tools; --".into())]);
        assert!(!clause.to_sql().contains("DROP"));
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
        assert_eq!(escape_like("plain"), "plain");
    }

    #[test]
    fn test_sort_parsing() {
        assert_eq!(ToolSort::parse_lenient("new"), ToolSort::New);
        assert_eq!(ToolSort::parse_lenient("Popular"), ToolSort::Popular);
        assert_eq!(ToolSort::parse_lenient("random"), ToolSort::Popular);
        assert!(ToolSort::New.order_by().starts_with("created_at DESC"));
        assert!(ToolSort::Popular.order_by().starts_with("usage_count DESC"));
    }

    #[test]
    fn test_run_predicate() {
        let clause = where_clause(&[RunPredicate::ForTool(9)]);
        assert_eq!(clause.to_sql(), " WHERE (r.tool_id = ?)");
        assert_eq!(clause.params(), &[Value::Integer(9)]);
    }
}
