//! Layout emitters and file output
//!
//! [`XlsxEmitter`] owns the only mapping from [`CellStyle`] to spreadsheet
//! formatting. Layout code never touches `rust_xlsxwriter`.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

use rekap_core::period::month_name;
use rekap_core::{AttendanceStatus, Category, PeriodSelector, SerializationError};
use rust_xlsxwriter::{Format, FormatAlign, FormatBorder, FormatUnderline, Workbook, Worksheet, XlsxError};

use crate::{CellStyle, CellValue, Emitter, RecapMeta, SheetLayout};

fn xlsx_err(e: XlsxError) -> SerializationError {
    SerializationError::Workbook(e.to_string())
}

// ============================================================================
// XLSX
// ============================================================================

/// Fill colors used by the XLSX emitter
#[derive(Clone, Debug)]
pub struct Palette {
    pub header: u32,
    pub accent: u32,
    pub present: u32,
    pub sick: u32,
    pub excused: u32,
    pub absent: u32,
    pub very_good: u32,
    pub good: u32,
    pub fair: u32,
    pub poor: u32,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            header: 0xD9D9D9,
            accent: 0x4472C4,
            present: 0xC6EFCE,   // light green
            sick: 0xFFEB9C,      // light yellow
            excused: 0xDDEBF7,   // light blue
            absent: 0xFFC7CE,    // light red
            very_good: 0x00B050,
            good: 0x92D050,
            fair: 0xFFC000,
            poor: 0xFF0000,
        }
    }
}

/// Writes a layout as a single-sheet `.xlsx` workbook
#[derive(Clone, Debug)]
pub struct XlsxEmitter {
    pub palette: Palette,
    pub font_name: String,
    /// Freeze panes below the header row
    pub freeze_header: bool,
}

impl Default for XlsxEmitter {
    fn default() -> Self {
        Self {
            palette: Palette::default(),
            font_name: "Calibri".into(),
            freeze_header: true,
        }
    }
}

/// Formats built once per emit
struct Formats {
    title: Format,
    subtitle: Format,
    header: Format,
    accent_header: Format,
    text: Format,
    centered: Format,
    percentage: Format,
    blank_status: Format,
    status: [Format; 4],
    category: [Format; 4],
    signature: Format,
    signature_name: Format,
}

impl Formats {
    fn get(&self, style: CellStyle) -> &Format {
        match style {
            CellStyle::Title => &self.title,
            CellStyle::Subtitle => &self.subtitle,
            CellStyle::Header => &self.header,
            CellStyle::AccentHeader => &self.accent_header,
            CellStyle::Text => &self.text,
            CellStyle::Centered => &self.centered,
            CellStyle::Percentage => &self.percentage,
            CellStyle::Status(None) => &self.blank_status,
            CellStyle::Status(Some(status)) => &self.status[status_index(status)],
            CellStyle::Category(category) => &self.category[category_index(category)],
            CellStyle::Signature => &self.signature,
            CellStyle::SignatureName => &self.signature_name,
        }
    }
}

fn status_index(status: AttendanceStatus) -> usize {
    match status {
        AttendanceStatus::Present => 0,
        AttendanceStatus::Sick => 1,
        AttendanceStatus::Excused => 2,
        AttendanceStatus::Absent => 3,
    }
}

fn category_index(category: Category) -> usize {
    match category {
        Category::VeryGood => 0,
        Category::Good => 1,
        Category::Fair => 2,
        Category::Poor => 3,
    }
}

impl XlsxEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn palette(mut self, palette: Palette) -> Self {
        self.palette = palette;
        self
    }

    pub fn font_name(mut self, name: impl Into<String>) -> Self {
        self.font_name = name.into();
        self
    }

    pub fn no_freeze(mut self) -> Self {
        self.freeze_header = false;
        self
    }

    fn create_formats(&self) -> Formats {
        let p = &self.palette;
        let base = Format::new().set_font_name(&self.font_name);
        let cell = base
            .clone()
            .set_border(FormatBorder::Thin)
            .set_align(FormatAlign::VerticalCenter);
        let centered = cell.clone().set_align(FormatAlign::Center);
        let fill = |color: u32| centered.clone().set_background_color(color);

        Formats {
            title: base
                .clone()
                .set_bold()
                .set_font_size(14)
                .set_align(FormatAlign::Center),
            subtitle: base.clone().set_bold().set_font_size(12).set_align(FormatAlign::Center),
            header: centered.clone().set_bold().set_background_color(p.header),
            accent_header: centered
                .clone()
                .set_bold()
                .set_background_color(p.accent)
                .set_font_color(0xFFFFFF),
            text: cell.clone(),
            centered: centered.clone(),
            percentage: centered.clone().set_num_format("0\"%\""),
            blank_status: centered.clone(),
            status: [fill(p.present), fill(p.sick), fill(p.excused), fill(p.absent)],
            category: [
                fill(p.very_good).set_bold(),
                fill(p.good).set_bold(),
                fill(p.fair).set_bold(),
                fill(p.poor).set_bold().set_font_color(0xFFFFFF),
            ],
            signature: base.clone().set_align(FormatAlign::Right),
            signature_name: base
                .set_bold()
                .set_underline(FormatUnderline::Single)
                .set_align(FormatAlign::Right),
        }
    }

    fn write_sheet(&self, sheet: &mut Worksheet, layout: &SheetLayout, formats: &Formats) -> Result<(), SerializationError> {
        sheet.set_name(&layout.sheet_name).map_err(xlsx_err)?;

        for (col, width) in &layout.column_widths {
            sheet.set_column_width(*col, *width).map_err(xlsx_err)?;
        }
        for (row, height) in &layout.row_heights {
            sheet.set_row_height(*row, *height).map_err(xlsx_err)?;
        }

        for merge in &layout.merges {
            sheet
                .merge_range(
                    merge.first_row,
                    merge.first_col,
                    merge.last_row,
                    merge.last_col,
                    &merge.value,
                    formats.get(merge.style),
                )
                .map_err(xlsx_err)?;
        }

        for cell in &layout.cells {
            let format = formats.get(cell.style);
            match &cell.value {
                CellValue::Text(s) => sheet.write_string_with_format(cell.row, cell.col, s, format),
                CellValue::Number(n) => sheet.write_number_with_format(cell.row, cell.col, *n, format),
                CellValue::Blank => sheet.write_blank(cell.row, cell.col, format),
            }
            .map_err(xlsx_err)?;
        }

        if self.freeze_header {
            if let Some(row) = layout.header_row {
                sheet.set_freeze_panes(row + 1, 0).map_err(xlsx_err)?;
            }
        }
        sheet.set_landscape();

        Ok(())
    }
}

impl Emitter for XlsxEmitter {
    type Output = Vec<u8>;

    fn emit(&self, layout: &SheetLayout) -> Result<Vec<u8>, SerializationError> {
        let mut workbook = Workbook::new();
        let formats = self.create_formats();
        let sheet = workbook.add_worksheet();
        self.write_sheet(sheet, layout, &formats)?;
        workbook.save_to_buffer().map_err(xlsx_err)
    }
}

// ============================================================================
// Text
// ============================================================================

/// Renders a layout as an aligned plain-text grid
#[derive(Clone, Debug, Default)]
pub struct TextEmitter {
    /// Skip the signature footer
    pub omit_footer: bool,
}

impl TextEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn omit_footer(mut self) -> Self {
        self.omit_footer = true;
        self
    }
}

impl Emitter for TextEmitter {
    type Output = String;

    fn emit(&self, layout: &SheetLayout) -> Result<String, SerializationError> {
        let mut grid: BTreeMap<u32, BTreeMap<u16, String>> = BTreeMap::new();
        for cell in &layout.cells {
            grid.entry(cell.row).or_default().insert(cell.col, cell.value.display());
        }

        let mut widths: BTreeMap<u16, usize> = BTreeMap::new();
        for row in grid.values() {
            for (col, text) in row {
                let w = widths.entry(*col).or_default();
                *w = (*w).max(text.chars().count());
            }
        }

        let footer_start = layout
            .header_row
            .and_then(|h| layout.merges.iter().filter(|m| m.first_row > h).map(|m| m.first_row).min());

        let mut lines: BTreeMap<u32, String> = BTreeMap::new();
        for merge in &layout.merges {
            if self.omit_footer && footer_start.is_some_and(|f| merge.first_row >= f) {
                continue;
            }
            lines.insert(merge.first_row, merge.value.clone());
        }
        for (row, cells) in &grid {
            let line = widths
                .iter()
                .map(|(col, w)| {
                    let text = cells.get(col).map_or("", String::as_str);
                    format!("{text:<w$}", w = *w)
                })
                .collect::<Vec<_>>()
                .join(" | ");
            lines.insert(*row, line.trim_end().to_string());
        }

        let mut out = String::new();
        for line in lines.values() {
            out.push_str(line);
            out.push('\n');
        }
        Ok(out)
    }
}

// ============================================================================
// Output files
// ============================================================================

fn sanitize(part: &str) -> String {
    part.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect()
}

/// `Recap_Attendance_Class_<class>_<Month>_<Year>.xlsx` or
/// `Recap_Attendance_Semester_<n>_Class_<class>_<YYYY-YYYY>.xlsx`
pub fn recap_filename(meta: &RecapMeta) -> String {
    let class = sanitize(&meta.class_id);
    match meta.period {
        PeriodSelector::Month { year, month } => {
            format!("Recap_Attendance_Class_{class}_{}_{year}.xlsx", month_name(month))
        }
        PeriodSelector::Semester {
            academic_year,
            semester,
        } => format!(
            "Recap_Attendance_Semester_{}_Class_{class}_{}-{}.xlsx",
            semester.number(),
            academic_year.start_year,
            academic_year.end_year()
        ),
    }
}

/// Write `bytes` to `path` atomically.
///
/// The data goes to a temporary file in the destination directory first and is
/// renamed into place only after a complete write; on failure nothing appears
/// at `path`.
pub fn save_as(bytes: &[u8], path: &Path) -> Result<(), SerializationError> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| SerializationError::Io(e.error))?;
    Ok(())
}
