//! In-memory table store
//!
//! Holds tables as vectors of JSON objects. Used for tests and for exports from
//! a JSON dump of the hosted tables:
//!
//! ```json
//! { "attendance": [ { "student_id": "...", "date": "2025-03-01", ... } ],
//!   "students":   [ { "student_id": "...", "full_name": "...", ... } ] }
//! ```

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::path::Path;

use rekap_core::FetchError;
use serde_json::Value;

use crate::{Filter, FilterOp, FilterValue, Query, Row, TableStore};

#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    tables: BTreeMap<String, Vec<Row>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a row; non-object values are skipped
    pub fn insert(&mut self, table: &str, row: Value) {
        match row {
            Value::Object(map) => self.tables.entry(table.to_string()).or_default().push(map),
            other => tracing::warn!(table, value = %other, "skipping non-object row"),
        }
    }

    pub fn len(&self, table: &str) -> usize {
        self.tables.get(table).map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.tables.values().all(Vec::is_empty)
    }

    /// Parse a JSON dump mapping table names to row arrays
    pub fn from_json_str(json: &str) -> Result<Self, FetchError> {
        let decode = |message: String| FetchError::Decode {
            table: "<dump>".into(),
            message,
        };
        let value: Value = serde_json::from_str(json).map_err(|e| decode(e.to_string()))?;
        let Value::Object(tables) = value else {
            return Err(decode("expected an object of tables".into()));
        };

        let mut store = Self::new();
        for (table, rows) in tables {
            let Value::Array(rows) = rows else {
                return Err(decode(format!("table '{table}' is not an array")));
            };
            // empty tables still exist
            store.tables.entry(table.clone()).or_default();
            for row in rows {
                store.insert(&table, row);
            }
        }
        Ok(store)
    }

    pub fn from_json_file(path: &Path) -> Result<Self, FetchError> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| FetchError::Query(format!("cannot read {}: {e}", path.display())))?;
        Self::from_json_str(&json)
    }
}

impl TableStore for MemoryStore {
    fn select(&self, query: &Query) -> Result<Vec<Row>, FetchError> {
        query.validate()?;
        let Some(rows) = self.tables.get(&query.table) else {
            return Err(FetchError::Query(format!(
                "relation \"{}\" does not exist",
                query.table
            )));
        };

        let mut matched: Vec<&Row> = rows
            .iter()
            .filter(|row| query.filters.iter().all(|f| matches_filter(row, f)))
            .collect();

        if !query.order.is_empty() {
            matched.sort_by(|a, b| {
                query
                    .order
                    .iter()
                    .map(|o| {
                        let ord = compare_json(a.get(&o.column), b.get(&o.column));
                        if o.ascending {
                            ord
                        } else {
                            ord.reverse()
                        }
                    })
                    .find(|ord| *ord != Ordering::Equal)
                    .unwrap_or(Ordering::Equal)
            });
        }

        let (skip, take) = match query.range {
            Some((from, to)) => (from, to - from + 1),
            None => (0, usize::MAX),
        };
        Ok(matched.into_iter().skip(skip).take(take).cloned().collect())
    }
}

fn matches_filter(row: &Row, filter: &Filter) -> bool {
    let Some(ord) = row.get(&filter.column).and_then(|v| compare_operand(v, &filter.value)) else {
        return false;
    };
    match filter.op {
        FilterOp::Eq => ord == Ordering::Equal,
        FilterOp::Gte => ord != Ordering::Less,
        FilterOp::Lte => ord != Ordering::Greater,
    }
}

/// Compare a stored value against a filter operand; `None` when incomparable
fn compare_operand(value: &Value, operand: &FilterValue) -> Option<Ordering> {
    match (value, operand) {
        (Value::String(s), FilterValue::Text(t)) => Some(s.as_str().cmp(t.as_str())),
        (Value::Number(n), FilterValue::Int(i)) => n.as_i64().map(|n| n.cmp(i)),
        (Value::Bool(b), FilterValue::Bool(c)) => Some(b.cmp(c)),
        (Value::Number(n), FilterValue::Bool(c)) => n.as_i64().map(|n| (n != 0).cmp(c)),
        (Value::Bool(b), FilterValue::Int(i)) => Some(i64::from(*b).cmp(i)),
        _ => None,
    }
}

/// Total order for sorting: missing/null first, then bools, numbers, strings
fn compare_json(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(v: Option<&Value>) -> u8 {
        match v {
            None | Some(Value::Null) => 0,
            Some(Value::Bool(_)) => 1,
            Some(Value::Number(_)) => 2,
            Some(Value::String(_)) => 3,
            Some(_) => 4,
        }
    }

    match (a, b) {
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn sample() -> MemoryStore {
        MemoryStore::from_json_str(
            r#"{
                "attendance": [
                    {"student_id": "2", "class_id": "7A", "date": "2025-03-02", "status": "H"},
                    {"student_id": "1", "class_id": "7A", "date": "2025-03-01", "status": "S"},
                    {"student_id": "1", "class_id": "7B", "date": "2025-03-01", "status": "H"},
                    {"student_id": "1", "class_id": "7A", "date": "2025-04-01", "status": "A"}
                ],
                "students": [
                    {"student_id": "1", "full_name": "Ayu", "class_id": "7A", "active": 1}
                ]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn load_dump() {
        let store = sample();
        assert_eq!(store.len("attendance"), 4);
        assert_eq!(store.len("students"), 1);
        assert_eq!(store.len("missing"), 0);
    }

    #[test]
    fn filter_order_and_range() {
        let store = sample();
        let q = Query::table("attendance")
            .eq("class_id", "7A")
            .gte("date", "2025-03-01")
            .lte("date", "2025-03-31")
            .order("date", true);
        let rows = store.select(&q).unwrap();
        let dates: Vec<&str> = rows.iter().map(|r| r["date"].as_str().unwrap()).collect();
        assert_eq!(dates, vec!["2025-03-01", "2025-03-02"]);

        let rows = store.select(&q.clone().range(1, 1)).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["student_id"], "2");

        let rows = store.select(&q.range(5, 9)).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn descending_order() {
        let store = sample();
        let rows = store
            .select(&Query::table("attendance").order("date", false).order("class_id", false))
            .unwrap();
        assert_eq!(rows[0]["date"], "2025-04-01");
        assert_eq!(rows[1]["class_id"], "7B");
    }

    #[test]
    fn bool_filter_matches_integer_flag() {
        let store = sample();
        let rows = store.select(&Query::table("students").eq("active", true)).unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn unknown_table_is_query_error() {
        let err = MemoryStore::new().select(&Query::table("attendance")).unwrap_err();
        assert!(matches!(err, FetchError::Query(_)));
    }

    #[test]
    fn rejects_malformed_dump() {
        assert!(MemoryStore::from_json_str("[1, 2]").is_err());
        assert!(MemoryStore::from_json_str(r#"{"attendance": 3}"#).is_err());
        assert!(MemoryStore::from_json_str("not json").is_err());
    }

    #[test]
    fn insert_skips_scalars() {
        let mut store = MemoryStore::new();
        store.insert("attendance", json!(42));
        assert!(store.is_empty());
    }
}
