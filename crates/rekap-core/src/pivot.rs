//! Pivot builder
//!
//! Cross-tabulates flat per-student-per-day attendance records against the class
//! roster. Every roster student gets exactly one row, in roster order, even when
//! no record mentions them. Records for students missing from the roster are
//! orphaned and ignored.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{
    AttendanceRecord, AttendanceStatus, Category, RosterEntry, StatusCounts, StudentId,
    ValidationError,
};

/// What to do with a status value outside the closed enumeration
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownStatus {
    /// Fail the pivot with `ValidationError::UnknownStatus`
    #[default]
    Reject,
    /// Count the record as present (legacy behaviour)
    #[serde(alias = "present")]
    TreatAsPresent,
}

/// Per-student aggregate
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PivotRow {
    pub student_id: StudentId,
    pub student_name: String,
    /// Status per date, only for dates with a record
    pub daily_status: BTreeMap<NaiveDate, AttendanceStatus>,
    pub counts: StatusCounts,
    pub total: u32,
    /// 0-100; 100 when the student has no records
    pub percentage: u8,
}

impl PivotRow {
    fn empty(entry: &RosterEntry) -> Self {
        Self {
            student_id: entry.student_id.clone(),
            student_name: entry.full_name.clone(),
            daily_status: BTreeMap::new(),
            counts: StatusCounts::default(),
            total: 0,
            percentage: 100,
        }
    }

    pub fn status_on(&self, date: NaiveDate) -> Option<AttendanceStatus> {
        self.daily_status.get(&date).copied()
    }

    pub fn category(&self) -> Category {
        Category::from_percentage(self.percentage)
    }

    fn finish(&mut self) {
        self.total = self.counts.total();
        self.percentage = attendance_percentage(self.counts.present, self.total);
    }
}

/// `round(present * 100 / total)` with halves rounded up, or 100 for an empty total
pub fn attendance_percentage(present: u32, total: u32) -> u8 {
    if total == 0 {
        return 100;
    }
    let present = u64::from(present.min(total));
    let total = u64::from(total);
    ((present * 200 + total) / (total * 2)) as u8
}

/// Result of pivoting one class/period
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pivot {
    /// One row per roster entry, roster order
    pub rows: Vec<PivotRow>,
    /// Distinct dates across all input records, ascending
    pub dates: Vec<NaiveDate>,
    /// Records whose student was not on the roster
    pub orphaned: usize,
}

impl Pivot {
    pub fn row(&self, student_id: &str) -> Option<&PivotRow> {
        self.rows.iter().find(|r| r.student_id == student_id)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Configurable pivot builder
#[derive(Clone, Debug, Default)]
pub struct PivotBuilder {
    pub unknown_status: UnknownStatus,
}

impl PivotBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Choose the policy for unrecognised status values
    pub fn unknown_status(mut self, policy: UnknownStatus) -> Self {
        self.unknown_status = policy;
        self
    }

    /// Build the pivot. Any malformed record aborts the whole build.
    pub fn build(
        &self,
        roster: &[RosterEntry],
        records: &[AttendanceRecord],
    ) -> Result<Pivot, ValidationError> {
        let mut rows: Vec<PivotRow> = Vec::with_capacity(roster.len());
        let mut index: HashMap<&str, usize> = HashMap::with_capacity(roster.len());

        for entry in roster {
            if index.insert(&entry.student_id, rows.len()).is_some() {
                return Err(ValidationError::DuplicateStudent(entry.student_id.clone()));
            }
            rows.push(PivotRow::empty(entry));
        }

        let mut dates = BTreeSet::new();
        let mut orphaned = 0;

        for record in records {
            let date = parse_date(record)?;
            let status = self.parse_status(record)?;
            dates.insert(date);

            match index.get(record.student_id.as_str()) {
                Some(&i) => {
                    let row = &mut rows[i];
                    row.daily_status.insert(date, status);
                    row.counts.record(status);
                }
                None => orphaned += 1,
            }
        }

        for row in &mut rows {
            row.finish();
        }

        Ok(Pivot {
            rows,
            dates: dates.into_iter().collect(),
            orphaned,
        })
    }

    fn parse_status(&self, record: &AttendanceRecord) -> Result<AttendanceStatus, ValidationError> {
        match AttendanceStatus::parse(&record.status) {
            Some(status) => Ok(status),
            None => match self.unknown_status {
                UnknownStatus::TreatAsPresent => Ok(AttendanceStatus::Present),
                UnknownStatus::Reject => Err(ValidationError::UnknownStatus {
                    student_id: record.student_id.clone(),
                    date: record.date.clone(),
                    value: record.status.clone(),
                }),
            },
        }
    }
}

fn parse_date(record: &AttendanceRecord) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(record.date.trim(), "%Y-%m-%d").map_err(|_| {
        ValidationError::InvalidDate {
            student_id: record.student_id.clone(),
            value: record.date.clone(),
        }
    })
}

/// Pivot with the default (strict) status policy
pub fn build_pivot(
    roster: &[RosterEntry],
    records: &[AttendanceRecord],
) -> Result<Pivot, ValidationError> {
    PivotBuilder::new().build(roster, records)
}
