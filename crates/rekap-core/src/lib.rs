//! # rekap-core
//!
//! Core domain model for the rekap attendance recap pipeline.
//!
//! This crate provides:
//! - Domain types: `AttendanceRecord`, `RosterEntry`, `AttendanceStatus`, `Category`
//! - Period selection: `PeriodSelector`, `AcademicYear`, `Semester`
//! - The pivot builder turning raw records into per-student aggregates
//! - Configuration loaded from `rekap.toml`
//! - Error types shared by the store, render and cli crates
//!
//! ## Example
//!
//! ```rust
//! use rekap_core::{build_pivot, AttendanceRecord, RosterEntry};
//!
//! let roster = vec![RosterEntry::new("0051", "Ayu Lestari", "7A")];
//! let records = vec![
//!     AttendanceRecord::new("0051", "7A", "2025-03-03", "Hadir"),
//!     AttendanceRecord::new("0051", "7A", "2025-03-04", "Sakit"),
//! ];
//!
//! let pivot = build_pivot(&roster, &records).unwrap();
//! assert_eq!(pivot.rows[0].total, 2);
//! assert_eq!(pivot.rows[0].percentage, 50);
//! ```

pub mod config;
pub mod period;
pub mod pivot;

pub use config::{PivotConfig, RecapConfig, SchoolConfig, StoreConfig};
pub use period::{AcademicYear, DateRange, PeriodSelector, Semester};
pub use pivot::{build_pivot, Pivot, PivotBuilder, PivotRow, UnknownStatus};

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

// ============================================================================
// Type Aliases
// ============================================================================

/// Stable student identifier (national student number)
pub type StudentId = String;

/// Class identifier, e.g. "7A"
pub type ClassId = String;

// ============================================================================
// Records
// ============================================================================

/// One attendance entry for a student on a given day, as stored.
///
/// `date` and `status` are kept as the raw strings returned by the store.
/// They are validated when the pivot is built, so a single malformed row
/// aborts the recap instead of being silently dropped during fetch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub student_id: StudentId,
    #[serde(default)]
    pub student_name: String,
    pub class_id: ClassId,
    /// ISO `YYYY-MM-DD`
    pub date: String,
    pub status: String,
    /// Academic year label, e.g. "2024/2025"
    #[serde(default)]
    pub academic_year: String,
    /// Staff member who entered the record
    #[serde(default)]
    pub recorded_by: String,
}

impl AttendanceRecord {
    pub fn new(
        student_id: impl Into<String>,
        class_id: impl Into<String>,
        date: impl Into<String>,
        status: impl Into<String>,
    ) -> Self {
        Self {
            student_id: student_id.into(),
            student_name: String::new(),
            class_id: class_id.into(),
            date: date.into(),
            status: status.into(),
            academic_year: String::new(),
            recorded_by: String::new(),
        }
    }

    pub fn student_name(mut self, name: impl Into<String>) -> Self {
        self.student_name = name.into();
        self
    }

    pub fn academic_year(mut self, label: impl Into<String>) -> Self {
        self.academic_year = label.into();
        self
    }

    pub fn recorded_by(mut self, staff: impl Into<String>) -> Self {
        self.recorded_by = staff.into();
        self
    }
}

/// One enrolled student of a class
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub student_id: StudentId,
    pub full_name: String,
    pub class_id: ClassId,
    #[serde(default = "default_active", deserialize_with = "flag")]
    pub active: bool,
}

impl RosterEntry {
    pub fn new(
        student_id: impl Into<String>,
        full_name: impl Into<String>,
        class_id: impl Into<String>,
    ) -> Self {
        Self {
            student_id: student_id.into(),
            full_name: full_name.into(),
            class_id: class_id.into(),
            active: true,
        }
    }
}

fn default_active() -> bool {
    true
}

/// Accepts `true`/`false` as well as the `1`/`0` integers SQLite hands back.
fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Int(i64),
    }

    match Flag::deserialize(deserializer)? {
        Flag::Bool(b) => Ok(b),
        Flag::Int(i) => Ok(i != 0),
    }
}

// ============================================================================
// Status
// ============================================================================

/// Closed set of attendance categories
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AttendanceStatus {
    Present,
    Sick,
    Excused,
    Absent,
}

impl AttendanceStatus {
    pub const ALL: [AttendanceStatus; 4] = [
        AttendanceStatus::Present,
        AttendanceStatus::Sick,
        AttendanceStatus::Excused,
        AttendanceStatus::Absent,
    ];

    /// Single-letter code printed in the recap grid
    pub fn code(&self) -> &'static str {
        match self {
            AttendanceStatus::Present => "H",
            AttendanceStatus::Sick => "S",
            AttendanceStatus::Excused => "I",
            AttendanceStatus::Absent => "A",
        }
    }

    /// Parse a stored status value.
    ///
    /// Accepts English names, Indonesian names and the single-letter codes,
    /// ignoring case and surrounding whitespace. Returns `None` for anything else.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "present" | "hadir" | "h" => Some(AttendanceStatus::Present),
            "sick" | "sakit" | "s" => Some(AttendanceStatus::Sick),
            "excused" | "izin" | "ijin" | "i" => Some(AttendanceStatus::Excused),
            "absent" | "alpa" | "alpha" | "alfa" | "a" => Some(AttendanceStatus::Absent),
            _ => None,
        }
    }
}

impl std::fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Per-category counters for one student
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub present: u32,
    pub sick: u32,
    pub excused: u32,
    pub absent: u32,
}

impl StatusCounts {
    pub fn record(&mut self, status: AttendanceStatus) {
        match status {
            AttendanceStatus::Present => self.present += 1,
            AttendanceStatus::Sick => self.sick += 1,
            AttendanceStatus::Excused => self.excused += 1,
            AttendanceStatus::Absent => self.absent += 1,
        }
    }

    pub fn get(&self, status: AttendanceStatus) -> u32 {
        match status {
            AttendanceStatus::Present => self.present,
            AttendanceStatus::Sick => self.sick,
            AttendanceStatus::Excused => self.excused,
            AttendanceStatus::Absent => self.absent,
        }
    }

    pub fn total(&self) -> u32 {
        self.present + self.sick + self.excused + self.absent
    }
}

// ============================================================================
// Category
// ============================================================================

/// Qualitative attendance tier used by semester recaps
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Category {
    /// 90% and above
    VeryGood,
    /// 80% to 89%
    Good,
    /// 70% to 79%
    Fair,
    /// Below 70%
    Poor,
}

impl Category {
    /// Classify an attendance percentage. Lower bounds are inclusive.
    pub fn from_percentage(percentage: u8) -> Self {
        match percentage {
            90.. => Category::VeryGood,
            80..=89 => Category::Good,
            70..=79 => Category::Fair,
            _ => Category::Poor,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::VeryGood => "Very Good",
            Category::Good => "Good",
            Category::Fair => "Fair",
            Category::Poor => "Poor",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Failure while querying the attendance or roster store
#[derive(Debug, Error)]
pub enum FetchError {
    /// The backend reported an error; the message is passed through verbatim
    #[error("{0}")]
    Query(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Malformed row in {table}: {message}")]
    Decode { table: String, message: String },
}

/// Malformed source data or selector input
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid date '{value}' for student {student_id}")]
    InvalidDate { student_id: StudentId, value: String },

    #[error("Unknown attendance status '{value}' for student {student_id} on {date}")]
    UnknownStatus {
        student_id: StudentId,
        date: String,
        value: String,
    },

    #[error("Student {0} appears more than once in the roster")]
    DuplicateStudent(StudentId),

    #[error("Invalid academic year '{0}' (expected e.g. 2024/2025)")]
    InvalidAcademicYear(String),

    #[error("Invalid semester '{0}' (expected 1 or 2)")]
    InvalidSemester(String),

    #[error("Invalid month '{0}' (expected YYYY-MM)")]
    InvalidMonth(String),
}

/// Spreadsheet generation or saving failure
#[derive(Debug, Error)]
pub enum SerializationError {
    #[error("Failed to create spreadsheet: {0}")]
    Workbook(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration file failure
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config {path}: {message}")]
    Parse { path: String, message: String },
}

// ============================================================================
// Tests
// ============================================================================
