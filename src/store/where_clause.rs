//! Typed filter builder for the candidate-set queries (§4.4/§9). Keeps parameter binding
//! out of the SQL-construction call sites so a filter can never leave a dangling `?`.

use rusqlite::types::Value;

/// A conjunction of simple `column OP ?` predicates over `files`, rendered into SQL text
/// plus its positional parameters. Predicates are combined with `AND`; an empty clause
/// renders as `1=1` so callers can always splice it into a `WHERE` without special-casing.
#[derive(Debug, Default, Clone)]
pub struct WhereClause {
    predicates: Vec<String>,
    params: Vec<Value>,
}

impl WhereClause {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.predicates.push(format!("{column} = ?"));
        self.params.push(value.into());
        self
    }

    pub fn ge(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.predicates.push(format!("{column} >= ?"));
        self.params.push(value.into());
        self
    }

    pub fn le(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.predicates.push(format!("{column} <= ?"));
        self.params.push(value.into());
        self
    }

    /// `column LIKE ?` with the caller supplying any `%`/`_` wildcards already escaped.
    pub fn like(mut self, column: &str, pattern: impl Into<String>) -> Self {
        self.predicates.push(format!("{column} LIKE ?"));
        self.params.push(Value::Text(pattern.into()));
        self
    }

    pub fn is_not_null(mut self, column: &str) -> Self {
        self.predicates.push(format!("{column} IS NOT NULL"));
        self
    }

    /// Glue for COALESCE-backed extension filters (§9 decision): `COALESCE(a, b) = ?`.
    pub fn coalesce_eq(mut self, columns: &[&str], value: impl Into<Value>) -> Self {
        self.predicates
            .push(format!("COALESCE({}) = ?", columns.join(", ")));
        self.params.push(value.into());
        self
    }

    /// `(path LIKE p1% OR path LIKE p2% ...) AND NOT (path LIKE x1% OR ...)` (§4.4), with
    /// the trailing separator stripped from each prefix before the wildcard is appended.
    /// A side with no prefixes contributes no predicate at all.
    pub fn path_prefixes(mut self, column: &str, include: &[String], exclude: &[String]) -> Self {
        if !include.is_empty() {
            let ors = include.iter().map(|_| format!("{column} LIKE ?")).collect::<Vec<_>>().join(" OR ");
            self.predicates.push(format!("({ors})"));
            for p in include {
                self.params.push(Value::Text(format!("{}%", p.trim_end_matches('/'))));
            }
        }
        if !exclude.is_empty() {
            let ors = exclude.iter().map(|_| format!("{column} LIKE ?")).collect::<Vec<_>>().join(" OR ");
            self.predicates.push(format!("NOT ({ors})"));
            for p in exclude {
                self.params.push(Value::Text(format!("{}%", p.trim_end_matches('/'))));
            }
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    /// Render as SQL text (without the leading `WHERE`) and the bound parameters in order.
    pub fn render(&self) -> (String, &[Value]) {
        if self.predicates.is_empty() {
            ("1=1".to_string(), &self.params)
        } else {
            (self.predicates.join(" AND "), &self.params)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_clause_renders_tautology() {
        let w = WhereClause::new();
        let (sql, params) = w.render();
        assert_eq!(sql, "1=1");
        assert!(params.is_empty());
    }

    #[test]
    fn combines_predicates_with_and() {
        let w = WhereClause::new().ge("size_bytes", 10_i64).eq("ext", "log".to_string());
        let (sql, params) = w.render();
        assert_eq!(sql, "size_bytes >= ? AND ext = ?");
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn coalesce_eq_joins_columns() {
        let w = WhereClause::new().coalesce_eq(&["sha256", "blake3"], "abc".to_string());
        let (sql, _) = w.render();
        assert_eq!(sql, "COALESCE(sha256, blake3) = ?");
    }
}
