//! Recap periods: calendar months and academic-year semesters
//!
//! An academic year runs from July to June and is labelled with both calendar
//! years, e.g. `2024/2025`. The odd (first) semester covers July–December of the
//! starting year, the even (second) semester January–June of the following year.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::ValidationError;

const MONTH_NAMES: [&str; 12] = [
    "Januari",
    "Februari",
    "Maret",
    "April",
    "Mei",
    "Juni",
    "Juli",
    "Agustus",
    "September",
    "Oktober",
    "November",
    "Desember",
];

/// Indonesian month name for a 1-based month number
pub fn month_name(month: u32) -> &'static str {
    MONTH_NAMES
        .get(month.wrapping_sub(1) as usize)
        .copied()
        .unwrap_or("?")
}

// ============================================================================
// Academic Year
// ============================================================================

/// School year spanning two calendar years
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AcademicYear {
    /// Calendar year the school year starts in (July)
    pub start_year: i32,
}

impl AcademicYear {
    pub const fn new(start_year: i32) -> Self {
        Self { start_year }
    }

    pub const fn end_year(&self) -> i32 {
        self.start_year + 1
    }

    /// Stored label, e.g. `2024/2025`
    pub fn label(&self) -> String {
        format!("{}/{}", self.start_year, self.end_year())
    }

    /// Parse `2024/2025` (a `-` separator is accepted too).
    /// The second year must follow the first.
    pub fn parse(label: &str) -> Result<Self, ValidationError> {
        let invalid = || ValidationError::InvalidAcademicYear(label.to_string());
        let (first, second) = label
            .trim()
            .split_once(['/', '-'])
            .ok_or_else(invalid)?;
        let start: i32 = first.trim().parse().map_err(|_| invalid())?;
        let end: i32 = second.trim().parse().map_err(|_| invalid())?;
        if end != start + 1 || !(1900..=9998).contains(&start) {
            return Err(invalid());
        }
        Ok(Self::new(start))
    }
}

impl std::fmt::Display for AcademicYear {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

// ============================================================================
// Semester
// ============================================================================

/// One of the two fixed halves of an academic year
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Semester {
    /// First semester, July–December
    Odd,
    /// Second semester, January–June
    Even,
}

impl Semester {
    /// 1 for the odd semester, 2 for the even one
    pub fn number(&self) -> u8 {
        match self {
            Semester::Odd => 1,
            Semester::Even => 2,
        }
    }

    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "1" | "odd" | "ganjil" => Ok(Semester::Odd),
            "2" | "even" | "genap" => Ok(Semester::Even),
            _ => Err(ValidationError::InvalidSemester(value.to_string())),
        }
    }

    /// Indonesian name printed on the recap
    pub fn label(&self) -> &'static str {
        match self {
            Semester::Odd => "Ganjil",
            Semester::Even => "Genap",
        }
    }

    /// Calendar months covered, in order
    pub fn months(&self) -> std::ops::RangeInclusive<u32> {
        match self {
            Semester::Odd => 7..=12,
            Semester::Even => 1..=6,
        }
    }

    /// `Juli - Desember` / `Januari - Juni`
    pub fn month_range_label(&self) -> String {
        let months = self.months();
        format!("{} - {}", month_name(*months.start()), month_name(*months.end()))
    }

    /// Calendar year the semester falls in
    pub fn calendar_year(&self, academic_year: AcademicYear) -> i32 {
        match self {
            Semester::Odd => academic_year.start_year,
            Semester::Even => academic_year.end_year(),
        }
    }
}

// ============================================================================
// Date Range
// ============================================================================

/// Inclusive calendar date range
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Whole calendar month. `None` if year/month do not form a valid date.
    pub fn month(year: i32, month: u32) -> Option<Self> {
        let start = NaiveDate::from_ymd_opt(year, month, 1)?;
        let next = if month == 12 {
            NaiveDate::from_ymd_opt(year + 1, 1, 1)?
        } else {
            NaiveDate::from_ymd_opt(year, month + 1, 1)?
        };
        Some(Self {
            start,
            end: next.pred_opt()?,
        })
    }
}

// ============================================================================
// Period Selector
// ============================================================================

/// Which slice of attendance a recap covers
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PeriodSelector {
    Month { year: i32, month: u32 },
    Semester {
        academic_year: AcademicYear,
        semester: Semester,
    },
}

impl PeriodSelector {
    pub fn month(year: i32, month: u32) -> Result<Self, ValidationError> {
        if DateRange::month(year, month).is_none() {
            return Err(ValidationError::InvalidMonth(format!("{year}-{month:02}")));
        }
        Ok(PeriodSelector::Month { year, month })
    }

    pub fn semester(academic_year: AcademicYear, semester: Semester) -> Self {
        PeriodSelector::Semester {
            academic_year,
            semester,
        }
    }

    /// Parse `YYYY-MM` into a month selector
    pub fn parse_month(value: &str) -> Result<Self, ValidationError> {
        let invalid = || ValidationError::InvalidMonth(value.to_string());
        let (y, m) = value.trim().split_once('-').ok_or_else(invalid)?;
        let year: i32 = y.parse().map_err(|_| invalid())?;
        let month: u32 = m.parse().map_err(|_| invalid())?;
        if DateRange::month(year, month).is_none() {
            return Err(invalid());
        }
        Ok(PeriodSelector::Month { year, month })
    }

    /// Inclusive date range covered by the period
    pub fn date_range(&self) -> Result<DateRange, ValidationError> {
        match *self {
            PeriodSelector::Month { year, month } => DateRange::month(year, month)
                .ok_or_else(|| ValidationError::InvalidMonth(format!("{year}-{month:02}"))),
            PeriodSelector::Semester {
                academic_year,
                semester,
            } => {
                let year = semester.calendar_year(academic_year);
                let months = semester.months();
                let first = DateRange::month(year, *months.start());
                let last = DateRange::month(year, *months.end());
                match (first, last) {
                    (Some(first), Some(last)) => Ok(DateRange {
                        start: first.start,
                        end: last.end,
                    }),
                    _ => Err(ValidationError::InvalidAcademicYear(academic_year.label())),
                }
            }
        }
    }

    /// Whether a date belongs to one of the period's calendar months
    pub fn covers_month(&self, date: NaiveDate) -> bool {
        match *self {
            PeriodSelector::Month { year, month } => date.year() == year && date.month() == month,
            PeriodSelector::Semester {
                academic_year,
                semester,
            } => {
                date.year() == semester.calendar_year(academic_year)
                    && semester.months().contains(&date.month())
            }
        }
    }

    /// Human-readable period heading, e.g. `Maret 2025`
    pub fn describe(&self) -> String {
        match *self {
            PeriodSelector::Month { year, month } => format!("{} {}", month_name(month), year),
            PeriodSelector::Semester {
                academic_year,
                semester,
            } => format!(
                "Semester {} ({}) {}",
                semester.label(),
                semester.month_range_label(),
                semester.calendar_year(academic_year)
            ),
        }
    }
}
