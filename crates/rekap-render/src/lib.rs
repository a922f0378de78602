//! # rekap-render
//!
//! Turns a [`Pivot`](rekap_core::Pivot) into a recap sheet and serializes it.
//!
//! Layout and serialization are separate steps:
//! - `monthly` / `semester` build a [`SheetLayout`]: cell positions, values,
//!   merged title rows, column widths and semantic [`CellStyle`] keys. They know
//!   nothing about any spreadsheet library.
//! - An [`Emitter`] turns the layout into output. [`XlsxEmitter`] produces an
//!   `.xlsx` workbook, [`TextEmitter`] a plain-text grid for the terminal.
//!
//! ## Example
//!
//! ```rust,ignore
//! use rekap_render::{layout_monthly, Emitter, RecapMeta, XlsxEmitter};
//!
//! let layout = layout_monthly(&pivot, &meta);
//! let bytes = XlsxEmitter::new().emit(&layout)?;
//! rekap_render::save_as(&bytes, &out_dir.join(rekap_render::recap_filename(&meta)))?;
//! ```

pub mod emit;
pub mod monthly;
pub mod semester;

pub use emit::{recap_filename, save_as, TextEmitter, XlsxEmitter};
pub use monthly::layout_monthly;
pub use semester::layout_semester;

use rekap_core::{AttendanceStatus, Category, PeriodSelector, SerializationError};
use serde::Serialize;

/// Heading of the signature block above the teacher's name
pub const SIGNATURE_HEADING: &str = "Mengetahui";

/// Longest worksheet name Excel accepts
pub const MAX_SHEET_NAME: usize = 31;

/// Make `name` usable as a worksheet name: `[ ] : * ? / \` become `_`,
/// leading and trailing apostrophes are dropped and the result is cut to
/// [`MAX_SHEET_NAME`] characters.
pub fn clean_sheet_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '[' | ']' | ':' | '*' | '?' | '/' | '\\' => '_',
            c => c,
        })
        .collect();
    let trimmed: String = cleaned
        .trim_matches('\'')
        .chars()
        .take(MAX_SHEET_NAME)
        .collect();
    let trimmed = trimmed.trim_end_matches('\'').trim_end();
    if trimmed.is_empty() {
        "Rekap".to_string()
    } else {
        trimmed.to_string()
    }
}

// ============================================================================
// Metadata
// ============================================================================

/// Everything printed on a recap besides the pivot itself
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RecapMeta {
    pub school_name: String,
    pub class_id: String,
    pub teacher_name: String,
    pub period: PeriodSelector,
}

impl RecapMeta {
    pub fn new(
        school_name: impl Into<String>,
        class_id: impl Into<String>,
        teacher_name: impl Into<String>,
        period: PeriodSelector,
    ) -> Self {
        Self {
            school_name: school_name.into(),
            class_id: class_id.into(),
            teacher_name: teacher_name.into(),
            period,
        }
    }

    pub fn report_title(&self) -> String {
        format!("REKAP ABSENSI KELAS {}", self.class_id)
    }
}

// ============================================================================
// Layout
// ============================================================================

/// Semantic cell style. The emitter decides what each one looks like.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum CellStyle {
    /// School name
    Title,
    /// Report title and period line
    Subtitle,
    /// Column header, shaded fill
    Header,
    /// Column header, white text on solid accent fill
    AccentHeader,
    /// Bordered left-aligned text
    Text,
    /// Bordered centered text or number
    Centered,
    /// Bordered percentage number
    Percentage,
    /// Per-date status cell; `None` is a bordered blank
    Status(Option<AttendanceStatus>),
    /// Qualitative tier with its own fill
    Category(Category),
    /// Right-aligned signature text
    Signature,
    /// Teacher name in the signature block
    SignatureName,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum CellValue {
    Text(String),
    Number(f64),
    Blank,
}

impl CellValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn display(&self) -> String {
        match self {
            CellValue::Text(s) => s.clone(),
            CellValue::Number(n) if n.fract() == 0.0 => format!("{}", *n as i64),
            CellValue::Number(n) => format!("{n}"),
            CellValue::Blank => String::new(),
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

impl From<u32> for CellValue {
    fn from(n: u32) -> Self {
        CellValue::Number(f64::from(n))
    }
}

impl From<u8> for CellValue {
    fn from(n: u8) -> Self {
        CellValue::Number(f64::from(n))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Cell {
    pub row: u32,
    pub col: u16,
    pub value: CellValue,
    pub style: CellStyle,
}

/// Rectangular merged region carrying one text value
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MergedCell {
    pub first_row: u32,
    pub first_col: u16,
    pub last_row: u32,
    pub last_col: u16,
    pub value: String,
    pub style: CellStyle,
}

impl MergedCell {
    pub fn contains(&self, row: u32, col: u16) -> bool {
        (self.first_row..=self.last_row).contains(&row) && (self.first_col..=self.last_col).contains(&col)
    }
}

/// A single worksheet described declaratively
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct SheetLayout {
    pub sheet_name: String,
    pub cells: Vec<Cell>,
    pub merges: Vec<MergedCell>,
    /// Column index → width in characters
    pub column_widths: Vec<(u16, f64)>,
    /// Row index → height in points
    pub row_heights: Vec<(u32, f64)>,
    /// Row index of the column header, frozen when emitted
    pub header_row: Option<u32>,
}

impl SheetLayout {
    pub fn new(sheet_name: impl Into<String>) -> Self {
        Self {
            sheet_name: sheet_name.into(),
            ..Self::default()
        }
    }

    pub fn write(&mut self, row: u32, col: u16, value: impl Into<CellValue>, style: CellStyle) {
        self.cells.push(Cell {
            row,
            col,
            value: value.into(),
            style,
        });
    }

    pub fn blank(&mut self, row: u32, col: u16, style: CellStyle) {
        self.write(row, col, CellValue::Blank, style);
    }

    /// Merge `first_col..=last_col` on one row
    pub fn merge_row(&mut self, row: u32, first_col: u16, last_col: u16, value: impl Into<String>, style: CellStyle) {
        self.merges.push(MergedCell {
            first_row: row,
            first_col,
            last_row: row,
            last_col,
            value: value.into(),
            style,
        });
    }

    pub fn column_width(&mut self, col: u16, width: f64) {
        self.column_widths.push((col, width));
    }

    pub fn row_height(&mut self, row: u32, height: f64) {
        self.row_heights.push((row, height));
    }

    pub fn cell(&self, row: u32, col: u16) -> Option<&Cell> {
        self.cells.iter().rev().find(|c| c.row == row && c.col == col)
    }

    /// Text shown at a position: a plain cell or the top-left of a merge
    pub fn text_at(&self, row: u32, col: u16) -> Option<String> {
        if let Some(m) = self
            .merges
            .iter()
            .find(|m| m.first_row == row && m.first_col == col)
        {
            return Some(m.value.clone());
        }
        self.cell(row, col).map(|c| c.value.display())
    }

    /// Header row values, left to right
    pub fn header(&self) -> Vec<String> {
        let Some(row) = self.header_row else {
            return Vec::new();
        };
        let mut cells: Vec<&Cell> = self.cells.iter().filter(|c| c.row == row).collect();
        cells.sort_by_key(|c| c.col);
        cells.iter().map(|c| c.value.display()).collect()
    }

    pub fn last_row(&self) -> u32 {
        let cells = self.cells.iter().map(|c| c.row);
        let merges = self.merges.iter().map(|m| m.last_row);
        cells.chain(merges).max().unwrap_or(0)
    }

    pub fn last_col(&self) -> u16 {
        let cells = self.cells.iter().map(|c| c.col);
        let merges = self.merges.iter().map(|m| m.last_col);
        cells.chain(merges).max().unwrap_or(0)
    }
}

/// Appends the signature block: heading, role line, blank space, name, line.
///
/// `row` is the first row of the block; it spans `first_col..=last_col`.
pub(crate) fn signature_block(layout: &mut SheetLayout, row: u32, first_col: u16, last_col: u16, meta: &RecapMeta) {
    layout.merge_row(row, first_col, last_col, SIGNATURE_HEADING, CellStyle::Signature);
    layout.merge_row(
        row + 1,
        first_col,
        last_col,
        format!("Wali Kelas {}", meta.class_id),
        CellStyle::Signature,
    );
    layout.row_height(row + 2, 36.0);
    layout.merge_row(row + 3, first_col, last_col, meta.teacher_name.clone(), CellStyle::SignatureName);
    layout.merge_row(row + 4, first_col, last_col, "________________________", CellStyle::Signature);
}

// ============================================================================
// Emitter
// ============================================================================

/// Serializes a layout into some output representation
pub trait Emitter {
    type Output;

    fn emit(&self, layout: &SheetLayout) -> Result<Self::Output, SerializationError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn text_at_prefers_merge_origin() {
        let mut layout = SheetLayout::new("x");
        layout.merge_row(0, 0, 3, "SCHOOL", CellStyle::Title);
        layout.write(1, 2, 5u32, CellStyle::Centered);
        assert_eq!(layout.text_at(0, 0).as_deref(), Some("SCHOOL"));
        assert_eq!(layout.text_at(0, 1), None);
        assert_eq!(layout.text_at(1, 2).as_deref(), Some("5"));
        assert_eq!(layout.last_col(), 3);
        assert_eq!(layout.last_row(), 1);
    }

    #[test]
    fn number_display_drops_integer_fraction() {
        assert_eq!(CellValue::Number(50.0).display(), "50");
        assert_eq!(CellValue::Number(2.5).display(), "2.5");
        assert_eq!(CellValue::Blank.display(), "");
    }

    #[test]
    fn sheet_names_lose_forbidden_characters() {
        assert_eq!(clean_sheet_name("Rekap VII/B Maret 2025"), "Rekap VII_B Maret 2025");
        assert_eq!(clean_sheet_name("a[b]:c*d?e\\f"), "a_b__c_d_e_f");
        assert_eq!(clean_sheet_name("'quoted'"), "quoted");
        assert_eq!(clean_sheet_name("''"), "Rekap");
    }

    #[test]
    fn sheet_names_are_cut_to_excel_limit() {
        let name = clean_sheet_name("Rekap XII IPS Unggulan 2 September 2024");
        assert_eq!(name.chars().count(), MAX_SHEET_NAME);
        assert_eq!(name, "Rekap XII IPS Unggulan 2 Septem");
    }

    #[test]
    fn merged_cell_contains() {
        let m = MergedCell {
            first_row: 2,
            first_col: 1,
            last_row: 2,
            last_col: 4,
            value: String::new(),
            style: CellStyle::Signature,
        };
        assert!(m.contains(2, 1));
        assert!(m.contains(2, 4));
        assert!(!m.contains(3, 2));
        assert!(!m.contains(2, 5));
    }
}
