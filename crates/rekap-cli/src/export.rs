//! Export pipeline: fetch → pivot → layout → emit → save
//!
//! One [`ExportSession`] runs at most one export at a time. The busy flag is
//! held by a guard and cleared when the guard drops, on success, failure or
//! panic alike.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use rekap_core::{
    ConfigError, FetchError, Pivot, PivotBuilder, PeriodSelector, RecapConfig, SerializationError, ValidationError,
};
use rekap_render::{layout_monthly, layout_semester, recap_filename, save_as, Emitter, RecapMeta, SheetLayout, XlsxEmitter};
use rekap_store::{FetchResult, MemoryStore, RecordFetcher, SqliteStore, TableStore};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("An export is already in progress")]
    Busy,

    #[error("No class teacher configured for class {0}; add it under [teachers] or pass --teacher")]
    MissingTeacher(String),

    #[error("Failed to query the store")]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Serialization(#[from] SerializationError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExportOutcome {
    /// File written; `rows` is the number of students on the sheet
    Saved { path: PathBuf, rows: usize },
    /// Nothing recorded for the class in the period; no file written
    NoData,
}

/// What to export and where
#[derive(Clone, Debug)]
pub struct ExportRequest {
    pub class_id: String,
    pub period: PeriodSelector,
    pub output_dir: PathBuf,
    /// Overrides the configured class teacher
    pub teacher: Option<String>,
}

/// Open a JSON dump (`.json`) or an SQLite database (anything else)
pub fn open_source(path: &Path) -> Result<Box<dyn TableStore>, FetchError> {
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    if is_json {
        debug!(path = %path.display(), "opening JSON dump");
        Ok(Box::new(MemoryStore::from_json_file(path)?))
    } else {
        debug!(path = %path.display(), "opening SQLite database");
        Ok(Box::new(SqliteStore::open(path)?))
    }
}

/// Fetch and pivot one class/period. `None` when nothing was recorded.
pub fn build_recap<S: TableStore>(
    fetcher: &RecordFetcher<S>,
    config: &RecapConfig,
    class_id: &str,
    period: &PeriodSelector,
) -> Result<Option<Pivot>, ExportError> {
    let records = match fetcher.fetch_records(class_id, period)? {
        FetchResult::Records(records) => records,
        FetchResult::NoData => return Ok(None),
    };
    let roster = fetcher.fetch_roster(class_id)?;
    let pivot = PivotBuilder::new()
        .unknown_status(config.pivot.unknown_status)
        .build(&roster, &records)?;
    if pivot.orphaned > 0 {
        debug!(class = class_id, orphaned = pivot.orphaned, "records without a roster entry ignored");
    }
    Ok(Some(pivot))
}

/// Layout for the selector kind
pub fn layout_for(pivot: &Pivot, meta: &RecapMeta) -> SheetLayout {
    match meta.period {
        PeriodSelector::Month { .. } => layout_monthly(pivot, meta),
        PeriodSelector::Semester { .. } => layout_semester(pivot, meta),
    }
}

// ============================================================================
// Session
// ============================================================================

#[derive(Debug, Default)]
pub struct ExportSession {
    busy: AtomicBool,
}

/// Clears the session's busy flag on drop
#[derive(Debug)]
pub struct BusyGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

impl ExportSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Mark the session busy, or fail if an export is already running
    pub fn begin(&self) -> Result<BusyGuard<'_>, ExportError> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| ExportError::Busy)?;
        Ok(BusyGuard { flag: &self.busy })
    }

    /// Run one export end to end
    pub fn export<S: TableStore>(
        &self,
        fetcher: &RecordFetcher<S>,
        config: &RecapConfig,
        request: &ExportRequest,
    ) -> Result<ExportOutcome, ExportError> {
        let _guard = self.begin()?;

        let teacher = request
            .teacher
            .clone()
            .or_else(|| config.teacher_for(&request.class_id).map(str::to_string))
            .ok_or_else(|| ExportError::MissingTeacher(request.class_id.clone()))?;

        let Some(pivot) = build_recap(fetcher, config, &request.class_id, &request.period)? else {
            info!(class = %request.class_id, period = %request.period.describe(), "no attendance data");
            return Ok(ExportOutcome::NoData);
        };

        let meta = RecapMeta::new(config.school.name.clone(), request.class_id.clone(), teacher, request.period);
        let bytes = XlsxEmitter::new().emit(&layout_for(&pivot, &meta))?;

        let path = request.output_dir.join(recap_filename(&meta));
        save_as(&bytes, &path)?;
        info!(path = %path.display(), rows = pivot.rows.len(), bytes = bytes.len(), "recap saved");

        Ok(ExportOutcome::Saved {
            path,
            rows: pivot.rows.len(),
        })
    }
}
