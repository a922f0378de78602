//! Paginated record fetcher
//!
//! Hosted backends cap the number of rows a single select returns. The fetcher
//! walks the result set with successive `range(from, to)` queries of a fixed page
//! size and stops at the first page shorter than the page size.
//!
//! Paging is exposed as [`Pages`], a lazy iterator over page results. It holds no
//! rows of its own; [`collect_pages`] is the single place pages are accumulated.
//! A fresh `Pages` (from [`RecordFetcher::pages`]) restarts from offset zero.

use chrono::NaiveDate;
use rekap_core::config::DEFAULT_PAGE_SIZE;
use rekap_core::{AttendanceRecord, FetchError, PeriodSelector, RosterEntry};
use tracing::{debug, info};

use crate::{decode_rows, Query, Row, TableStore, ATTENDANCE_TABLE, STUDENTS_TABLE};

/// Outcome of a successful fetch
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FetchResult {
    /// At least one record, date ascending
    Records(Vec<AttendanceRecord>),
    /// The query succeeded but matched nothing
    NoData,
}

impl FetchResult {
    pub fn into_records(self) -> Vec<AttendanceRecord> {
        match self {
            FetchResult::Records(records) => records,
            FetchResult::NoData => Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, FetchResult::NoData)
    }
}

// ============================================================================
// Pages
// ============================================================================

/// Lazy, finite sequence of result pages for one query
pub struct Pages<'a, S: ?Sized> {
    store: &'a S,
    query: Query,
    page_size: usize,
    offset: usize,
    requests: usize,
    done: bool,
}

impl<'a, S: TableStore + ?Sized> Pages<'a, S> {
    pub fn new(store: &'a S, query: Query, page_size: usize) -> Self {
        Self {
            store,
            query,
            page_size: page_size.max(1),
            offset: 0,
            requests: 0,
            done: false,
        }
    }

    /// Same query from the first page
    pub fn restart(&self) -> Self {
        Self::new(self.store, self.query.clone(), self.page_size)
    }

    /// Page requests issued so far
    pub fn requests(&self) -> usize {
        self.requests
    }
}

impl<S: TableStore + ?Sized> Iterator for Pages<'_, S> {
    type Item = Result<Vec<Row>, FetchError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let to = self.offset + self.page_size - 1;
        let page_query = self.query.clone().range(self.offset, to);
        self.requests += 1;

        match self.store.select(&page_query) {
            Ok(rows) => {
                debug!(
                    table = %self.query.table,
                    offset = self.offset,
                    rows = rows.len(),
                    "fetched page"
                );
                if rows.len() < self.page_size {
                    self.done = true;
                }
                self.offset += rows.len();
                Some(Ok(rows))
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Concatenate pages in order, stopping at the first error
pub fn collect_pages<I>(pages: I) -> Result<Vec<Row>, FetchError>
where
    I: IntoIterator<Item = Result<Vec<Row>, FetchError>>,
{
    pages.into_iter().try_fold(Vec::new(), |mut all, page| {
        all.extend(page?);
        Ok(all)
    })
}

// ============================================================================
// Fetcher
// ============================================================================

/// Fetches attendance records and rosters through a [`TableStore`]
pub struct RecordFetcher<S> {
    store: S,
    page_size: usize,
}

impl<S: TableStore> RecordFetcher<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Set rows per page (minimum 1)
    pub fn page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Page iterator for an arbitrary query
    pub fn pages(&self, query: Query) -> Pages<'_, S> {
        Pages::new(&self.store, query, self.page_size)
    }

    /// Attendance query for a class and period, date ascending
    pub fn attendance_query(&self, class_id: &str, period: &PeriodSelector) -> Result<Query, FetchError> {
        let range = period
            .date_range()
            .map_err(|e| FetchError::InvalidQuery(e.to_string()))?;

        let mut query = Query::table(ATTENDANCE_TABLE).eq("class_id", class_id);
        if let PeriodSelector::Semester { academic_year, .. } = period {
            query = query.eq("academic_year", academic_year.label());
        }
        Ok(query
            .gte("date", range.start.format("%Y-%m-%d").to_string())
            .lte("date", range.end.format("%Y-%m-%d").to_string())
            .order("date", true)
            .order("student_id", true))
    }

    /// All attendance records for a class and period.
    ///
    /// Semester periods are additionally filtered by calendar month, since the
    /// store only filters on the academic-year label and date bounds. Records
    /// with unparseable dates are passed through for the pivot to reject.
    pub fn fetch_records(&self, class_id: &str, period: &PeriodSelector) -> Result<FetchResult, FetchError> {
        let query = self.attendance_query(class_id, period)?;
        let mut pages = self.pages(query);
        let rows = collect_pages(pages.by_ref())?;
        let fetched = rows.len();

        let mut records: Vec<AttendanceRecord> = decode_rows(ATTENDANCE_TABLE, rows)?;
        if matches!(period, PeriodSelector::Semester { .. }) {
            records.retain(|r| match NaiveDate::parse_from_str(r.date.trim(), "%Y-%m-%d") {
                Ok(date) => period.covers_month(date),
                Err(_) => true,
            });
        }

        info!(
            class = class_id,
            fetched,
            kept = records.len(),
            requests = pages.requests(),
            "fetched attendance"
        );

        if records.is_empty() {
            Ok(FetchResult::NoData)
        } else {
            Ok(FetchResult::Records(records))
        }
    }

    /// Active students of a class, ordered by name
    pub fn fetch_roster(&self, class_id: &str) -> Result<Vec<RosterEntry>, FetchError> {
        let query = Query::table(STUDENTS_TABLE)
            .eq("class_id", class_id)
            .eq("active", true)
            .order("full_name", true);
        let rows = collect_pages(self.pages(query))?;
        let roster: Vec<RosterEntry> = decode_rows(STUDENTS_TABLE, rows)?;
        debug!(class = class_id, students = roster.len(), "fetched roster");
        Ok(roster)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FilterValue, MemoryStore};
    use pretty_assertions::assert_eq;
    use rekap_core::{AcademicYear, Semester};
    use serde_json::json;

    fn store_with(records: &[(&str, &str, &str, &str)]) -> MemoryStore {
        let mut store = MemoryStore::new();
        for (id, date, status, year) in records {
            store.insert(
                ATTENDANCE_TABLE,
                json!({
                    "student_id": id,
                    "class_id": "7A",
                    "date": date,
                    "status": status,
                    "academic_year": year,
                }),
            );
        }
        store
    }

    #[test]
    fn month_query_bounds() {
        let fetcher = RecordFetcher::new(MemoryStore::new());
        let q = fetcher
            .attendance_query("7A", &PeriodSelector::month(2025, 2).unwrap())
            .unwrap();
        assert_eq!(q.filters.len(), 3);
        assert_eq!(q.filters[1].value, FilterValue::from("2025-02-01"));
        assert_eq!(q.filters[2].value, FilterValue::from("2025-02-28"));
    }

    #[test]
    fn semester_query_filters_academic_year() {
        let fetcher = RecordFetcher::new(MemoryStore::new());
        let period = PeriodSelector::semester(AcademicYear::new(2024), Semester::Even);
        let q = fetcher.attendance_query("7A", &period).unwrap();
        assert_eq!(q.filters[1].column, "academic_year");
        assert_eq!(q.filters[1].value, FilterValue::from("2024/2025"));
        assert_eq!(q.filters[2].value, FilterValue::from("2025-01-01"));
        assert_eq!(q.filters[3].value, FilterValue::from("2025-06-30"));
    }

    #[test]
    fn empty_result_is_no_data() {
        let store = store_with(&[("A", "2025-04-01", "H", "")]);
        let fetcher = RecordFetcher::new(store);
        let result = fetcher
            .fetch_records("7A", &PeriodSelector::month(2025, 3).unwrap())
            .unwrap();
        assert_eq!(result, FetchResult::NoData);
    }

    #[test]
    fn semester_keeps_only_its_months() {
        let store = store_with(&[
            ("A", "2024-07-15", "H", "2024/2025"),
            ("A", "2024-12-02", "S", "2024/2025"),
            ("A", "2025-01-06", "H", "2024/2025"),
        ]);
        let fetcher = RecordFetcher::new(store);
        let period = PeriodSelector::semester(AcademicYear::new(2024), Semester::Odd);
        let records = fetcher.fetch_records("7A", &period).unwrap().into_records();
        let dates: Vec<&str> = records.iter().map(|r| r.date.as_str()).collect();
        assert_eq!(dates, vec!["2024-07-15", "2024-12-02"]);
    }

    #[test]
    fn semester_with_wrong_label_is_no_data() {
        let store = store_with(&[("A", "2024-09-01", "H", "2023/2024")]);
        let fetcher = RecordFetcher::new(store);
        let period = PeriodSelector::semester(AcademicYear::new(2024), Semester::Odd);
        assert!(fetcher.fetch_records("7A", &period).unwrap().is_empty());
    }

    #[test]
    fn roster_only_active_students_sorted() {
        let mut store = MemoryStore::new();
        store.insert(STUDENTS_TABLE, json!({"student_id": "2", "full_name": "Budi", "class_id": "7A", "active": true}));
        store.insert(STUDENTS_TABLE, json!({"student_id": "1", "full_name": "Ayu", "class_id": "7A", "active": true}));
        store.insert(STUDENTS_TABLE, json!({"student_id": "3", "full_name": "Citra", "class_id": "7A", "active": false}));
        store.insert(STUDENTS_TABLE, json!({"student_id": "4", "full_name": "Dodi", "class_id": "7B", "active": true}));

        let roster = RecordFetcher::new(store).fetch_roster("7A").unwrap();
        let names: Vec<&str> = roster.iter().map(|r| r.full_name.as_str()).collect();
        assert_eq!(names, vec!["Ayu", "Budi"]);
    }

    #[test]
    fn pages_restart_from_zero() {
        let store = store_with(&[
            ("A", "2025-03-01", "H", ""),
            ("A", "2025-03-02", "H", ""),
            ("A", "2025-03-03", "H", ""),
        ]);
        let fetcher = RecordFetcher::new(store).page_size(2);
        let mut pages = fetcher.pages(Query::table(ATTENDANCE_TABLE).order("date", true));
        let first = pages.next().unwrap().unwrap();
        assert_eq!(first.len(), 2);

        let all = collect_pages(pages.restart()).unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0]["date"], "2025-03-01");
    }
}
