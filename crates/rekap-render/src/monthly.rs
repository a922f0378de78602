//! Monthly recap layout
//!
//! ```text
//! |                 SCHOOL NAME                          |
//! |           REKAP ABSENSI KELAS 7A                     |
//! |             BULAN: Maret 2025                        |
//!
//! | No | Nama Siswa | 03-03 | 04-03 | ... | H | I | S | A | Jumlah | % |
//! | 1  | Ayu        |   H   |   S   | ... | 1 | 0 | 1 | 0 |   2    | 50|
//! ```
//!
//! One column per date that has at least one record; days nobody was recorded
//! on (weekends, holidays) get no column.

use rekap_core::period::month_name;
use rekap_core::{AttendanceStatus, Pivot, PeriodSelector};

use crate::{clean_sheet_name, signature_block, CellStyle, RecapMeta, SheetLayout};

const TITLE_ROWS: u32 = 3;
const HEADER_ROW: u32 = TITLE_ROWS + 1;

/// Summary columns after the dates, in order
const SUMMARY: [(&str, Option<AttendanceStatus>); 6] = [
    ("H", Some(AttendanceStatus::Present)),
    ("I", Some(AttendanceStatus::Excused)),
    ("S", Some(AttendanceStatus::Sick)),
    ("A", Some(AttendanceStatus::Absent)),
    ("Jumlah", None),
    ("%", None),
];

/// Period line under the report title
fn period_heading(period: &PeriodSelector) -> String {
    match *period {
        PeriodSelector::Month { year, month } => format!("BULAN: {} {}", month_name(month), year),
        other => other.describe(),
    }
}

fn sheet_name(meta: &RecapMeta) -> String {
    match meta.period {
        PeriodSelector::Month { year, month } => {
            clean_sheet_name(&format!("Rekap {} {} {}", meta.class_id, month_name(month), year))
        }
        _ => clean_sheet_name(&format!("Rekap {}", meta.class_id)),
    }
}

/// Lay out a monthly recap with one column per recorded date
pub fn layout_monthly(pivot: &Pivot, meta: &RecapMeta) -> SheetLayout {
    let mut layout = SheetLayout::new(sheet_name(meta));
    let date_cols = pivot.dates.len() as u16;
    let first_summary = 2 + date_cols;
    let last_col = first_summary + SUMMARY.len() as u16 - 1;

    // Title block
    layout.merge_row(0, 0, last_col, meta.school_name.clone(), CellStyle::Title);
    layout.merge_row(1, 0, last_col, meta.report_title(), CellStyle::Subtitle);
    layout.merge_row(2, 0, last_col, period_heading(&meta.period), CellStyle::Subtitle);

    // Column header
    layout.header_row = Some(HEADER_ROW);
    layout.write(HEADER_ROW, 0, "No", CellStyle::Header);
    layout.write(HEADER_ROW, 1, "Nama Siswa", CellStyle::Header);
    for (i, date) in pivot.dates.iter().enumerate() {
        layout.write(HEADER_ROW, 2 + i as u16, date.format("%d-%m").to_string(), CellStyle::Header);
    }
    for (i, (label, _)) in SUMMARY.iter().enumerate() {
        layout.write(HEADER_ROW, first_summary + i as u16, *label, CellStyle::Header);
    }

    // One row per student
    for (n, student) in pivot.rows.iter().enumerate() {
        let row = HEADER_ROW + 1 + n as u32;
        layout.write(row, 0, (n + 1) as u32, CellStyle::Centered);
        layout.write(row, 1, student.student_name.clone(), CellStyle::Text);

        for (i, date) in pivot.dates.iter().enumerate() {
            let col = 2 + i as u16;
            match student.status_on(*date) {
                Some(status) => layout.write(row, col, status.code(), CellStyle::Status(Some(status))),
                None => layout.blank(row, col, CellStyle::Status(None)),
            }
        }

        for (i, (_, status)) in SUMMARY.iter().enumerate() {
            let col = first_summary + i as u16;
            match (status, i) {
                (Some(status), _) => layout.write(row, col, student.counts.get(*status), CellStyle::Centered),
                (None, 4) => layout.write(row, col, student.total, CellStyle::Centered),
                (None, _) => layout.write(row, col, student.percentage, CellStyle::Percentage),
            }
        }
    }

    // Footer sits two rows under the last student (or the header when empty)
    let last_data_row = HEADER_ROW + pivot.rows.len() as u32;
    signature_block(&mut layout, last_data_row + 2, last_col - 2, last_col, meta);

    // Widths
    layout.column_width(0, 5.0);
    layout.column_width(1, 32.0);
    for i in 0..date_cols {
        layout.column_width(2 + i, 6.0);
    }
    for i in 0..SUMMARY.len() as u16 {
        layout.column_width(first_summary + i, if i < 4 { 6.0 } else { 9.0 });
    }
    layout.row_height(HEADER_ROW, 20.0);

    layout
}
