//! # rekap-store
//!
//! Narrow query interface over the attendance and roster tables, plus the
//! paginated record fetcher built on it.
//!
//! The interface mirrors what hosted table backends expose:
//! `select(table) → filter(eq | gte | lte) → order → range(from, to)`.
//! Anything implementing [`TableStore`] can feed the recap pipeline.
//!
//! ## Example
//!
//! ```rust
//! use rekap_store::{MemoryStore, Query, TableStore};
//! use serde_json::json;
//!
//! let mut store = MemoryStore::new();
//! store.insert("students", json!({"student_id": "1", "full_name": "Ayu", "class_id": "7A"}));
//!
//! let rows = store.select(&Query::table("students").eq("class_id", "7A")).unwrap();
//! assert_eq!(rows.len(), 1);
//! ```

pub mod fetch;
pub mod memory;
pub mod sqlite;

pub use fetch::{collect_pages, FetchResult, Pages, RecordFetcher};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use rekap_core::FetchError;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Attendance table name
pub const ATTENDANCE_TABLE: &str = "attendance";

/// Roster table name
pub const STUDENTS_TABLE: &str = "students";

/// A row as returned by the store
pub type Row = serde_json::Map<String, Value>;

// ============================================================================
// Query
// ============================================================================

/// Comparison applied by a filter
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Gte,
    Lte,
}

impl FilterOp {
    pub fn sql(&self) -> &'static str {
        match self {
            FilterOp::Eq => "=",
            FilterOp::Gte => ">=",
            FilterOp::Lte => "<=",
        }
    }
}

/// Filter operand
#[derive(Clone, Debug, PartialEq)]
pub enum FilterValue {
    Text(String),
    Int(i64),
    Bool(bool),
}

impl From<&str> for FilterValue {
    fn from(s: &str) -> Self {
        FilterValue::Text(s.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(s: String) -> Self {
        FilterValue::Text(s)
    }
}

impl From<i64> for FilterValue {
    fn from(i: i64) -> Self {
        FilterValue::Int(i)
    }
}

impl From<bool> for FilterValue {
    fn from(b: bool) -> Self {
        FilterValue::Bool(b)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Filter {
    pub column: String,
    pub op: FilterOp,
    pub value: FilterValue,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Order {
    pub column: String,
    pub ascending: bool,
}

/// Declarative select query
#[derive(Clone, Debug, PartialEq)]
pub struct Query {
    pub table: String,
    pub filters: Vec<Filter>,
    pub order: Vec<Order>,
    /// Inclusive row range `(from, to)`, zero-based
    pub range: Option<(usize, usize)>,
}

impl Query {
    pub fn table(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            filters: Vec::new(),
            order: Vec::new(),
            range: None,
        }
    }

    fn filter(mut self, column: &str, op: FilterOp, value: impl Into<FilterValue>) -> Self {
        self.filters.push(Filter {
            column: column.to_string(),
            op,
            value: value.into(),
        });
        self
    }

    pub fn eq(self, column: &str, value: impl Into<FilterValue>) -> Self {
        self.filter(column, FilterOp::Eq, value)
    }

    pub fn gte(self, column: &str, value: impl Into<FilterValue>) -> Self {
        self.filter(column, FilterOp::Gte, value)
    }

    pub fn lte(self, column: &str, value: impl Into<FilterValue>) -> Self {
        self.filter(column, FilterOp::Lte, value)
    }

    pub fn order(mut self, column: &str, ascending: bool) -> Self {
        self.order.push(Order {
            column: column.to_string(),
            ascending,
        });
        self
    }

    /// Restrict to rows `from..=to`
    pub fn range(mut self, from: usize, to: usize) -> Self {
        self.range = Some((from, to));
        self
    }

    /// Reject table/column names that are not plain identifiers.
    ///
    /// Backends interpolate these names into SQL, so this runs before every select.
    pub fn validate(&self) -> Result<(), FetchError> {
        let names = std::iter::once(self.table.as_str())
            .chain(self.filters.iter().map(|f| f.column.as_str()))
            .chain(self.order.iter().map(|o| o.column.as_str()));
        for name in names {
            if !is_identifier(name) {
                return Err(FetchError::InvalidQuery(format!("bad identifier '{name}'")));
            }
        }
        if let Some((from, to)) = self.range {
            if to < from {
                return Err(FetchError::InvalidQuery(format!("empty range {from}..={to}")));
            }
        }
        Ok(())
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

// ============================================================================
// Store
// ============================================================================

/// Read-only access to a table backend
pub trait TableStore {
    /// Run a select query
    fn select(&self, query: &Query) -> Result<Vec<Row>, FetchError>;
}

impl<S: TableStore + ?Sized> TableStore for &S {
    fn select(&self, query: &Query) -> Result<Vec<Row>, FetchError> {
        (**self).select(query)
    }
}

impl<S: TableStore + ?Sized> TableStore for Box<S> {
    fn select(&self, query: &Query) -> Result<Vec<Row>, FetchError> {
        (**self).select(query)
    }
}

/// Decode store rows into typed records
pub fn decode_rows<T: DeserializeOwned>(table: &str, rows: Vec<Row>) -> Result<Vec<T>, FetchError> {
    rows.into_iter()
        .map(|row| {
            serde_json::from_value(Value::Object(row)).map_err(|e| FetchError::Decode {
                table: table.to_string(),
                message: e.to_string(),
            })
        })
        .collect()
}
