//! Semester recap layout
//!
//! Fixed ten columns, no per-date detail:
//!
//! ```text
//! | No | NISN | Nama Siswa | Hadir | Sakit | Izin | Alpa | Jumlah | Persentase | Kategori |
//! ```

use rekap_core::{Pivot, PeriodSelector};

use crate::{clean_sheet_name, signature_block, CellStyle, RecapMeta, SheetLayout};

const HEADER_ROW: u32 = 4;
const LAST_COL: u16 = 9;

const HEADERS: [&str; 10] = [
    "No",
    "NISN",
    "Nama Siswa",
    "Hadir",
    "Sakit",
    "Izin",
    "Alpa",
    "Jumlah",
    "Persentase",
    "Kategori",
];

const WIDTHS: [f64; 10] = [5.0, 14.0, 32.0, 8.0, 8.0, 8.0, 8.0, 9.0, 12.0, 13.0];

fn sheet_name(meta: &RecapMeta) -> String {
    match meta.period {
        PeriodSelector::Semester { semester, .. } => {
            clean_sheet_name(&format!("Rekap {} Semester {}", meta.class_id, semester.number()))
        }
        _ => clean_sheet_name(&format!("Rekap {}", meta.class_id)),
    }
}

/// Lay out a semester recap with fixed summary columns and a category label
pub fn layout_semester(pivot: &Pivot, meta: &RecapMeta) -> SheetLayout {
    let mut layout = SheetLayout::new(sheet_name(meta));

    layout.merge_row(0, 0, LAST_COL, meta.school_name.clone(), CellStyle::Title);
    layout.merge_row(1, 0, LAST_COL, meta.report_title(), CellStyle::Subtitle);
    layout.merge_row(2, 0, LAST_COL, meta.period.describe(), CellStyle::Subtitle);

    layout.header_row = Some(HEADER_ROW);
    for (col, label) in HEADERS.iter().enumerate() {
        layout.write(HEADER_ROW, col as u16, *label, CellStyle::AccentHeader);
    }

    for (n, student) in pivot.rows.iter().enumerate() {
        let row = HEADER_ROW + 1 + n as u32;
        let counts = student.counts;
        let category = student.category();

        layout.write(row, 0, (n + 1) as u32, CellStyle::Centered);
        layout.write(row, 1, student.student_id.clone(), CellStyle::Centered);
        layout.write(row, 2, student.student_name.clone(), CellStyle::Text);
        layout.write(row, 3, counts.present, CellStyle::Centered);
        layout.write(row, 4, counts.sick, CellStyle::Centered);
        layout.write(row, 5, counts.excused, CellStyle::Centered);
        layout.write(row, 6, counts.absent, CellStyle::Centered);
        layout.write(row, 7, student.total, CellStyle::Centered);
        layout.write(row, 8, student.percentage, CellStyle::Percentage);
        layout.write(row, 9, category.as_str(), CellStyle::Category(category));
    }

    let last_data_row = HEADER_ROW + pivot.rows.len() as u32;
    signature_block(&mut layout, last_data_row + 2, 7, LAST_COL, meta);

    for (col, width) in WIDTHS.iter().enumerate() {
        layout.column_width(col as u16, *width);
    }
    layout.row_height(HEADER_ROW, 22.0);

    layout
}
